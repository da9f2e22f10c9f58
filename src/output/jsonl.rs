use crate::output::traits::{OutputResult, PostSink};
use crate::state::PostRecord;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends accepted posts to a JSON lines file
///
/// The file is opened in append mode so a resumed run continues the output
/// of the interrupted one.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Opens (or creates) the records file, creating parent directories
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!("Writing records to {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl PostSink for JsonLinesSink {
    fn emit(&mut self, record: &PostRecord) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
