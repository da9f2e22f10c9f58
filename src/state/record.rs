use serde::{Deserialize, Serialize};

/// A single post extracted from a search result page
///
/// `content_id` is the endpoint's own post identifier (the `mid` attribute),
/// so the same post found under two date windows carries the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub content_id: String,

    /// Keyword of the task that first surfaced this post
    pub keyword: String,

    pub author: String,

    /// Publish time as rendered by the endpoint ("2024-01-03 12:00", "5分钟前", ...)
    pub timestamp: String,

    pub text: String,

    /// Image and video links, in page order
    pub media_links: Vec<String>,

    pub raw_type_flags: TypeFlags,
}

/// Type markers read from the post markup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFlags {
    /// False for reposts carrying forwarded content
    pub original: bool,
    pub has_images: bool,
    pub has_video: bool,
}
