//! Task enumeration and date-window splitting
//!
//! This module turns a search configuration into the ordered queue of atomic
//! search tasks and bisects tasks that turn out to exceed the endpoint's
//! page-depth ceiling.

use crate::config::SearchConfig;
use crate::query::SearchTask;
use crate::ConfigError;
use chrono::Duration;

/// Expands a search configuration into the initial task queue
///
/// The queue is the cartesian product of keywords and regions, keywords
/// outer and regions inner, each pair covering the whole date interval as a
/// single task. Saturation is detected later while paging, so no task is
/// split up front.
///
/// # Arguments
///
/// * `search` - The search scope (keywords, dates, regions, filters)
///
/// # Returns
///
/// * `Ok(Vec<SearchTask>)` - Tasks in execution order
/// * `Err(ConfigError)` - The keyword set is empty or the dates are reversed
///
/// # Example
///
/// ```
/// use weibo_search::config::SearchConfig;
/// use weibo_search::crawler::expand;
///
/// let mut search = SearchConfig::default();
/// search.keywords = vec!["a".to_string(), "b".to_string()];
/// search.region = vec!["北京".to_string(), "上海".to_string()];
///
/// let tasks = expand(&search).unwrap();
/// assert_eq!(tasks.len(), 4);
/// assert_eq!(tasks[1].keyword, "a");
/// assert_eq!(tasks[1].region.as_deref(), Some("上海"));
/// ```
pub fn expand(search: &SearchConfig) -> Result<Vec<SearchTask>, ConfigError> {
    let keywords = search.unique_keywords();
    if keywords.is_empty() {
        return Err(ConfigError::Validation(
            "at least one keyword is required".to_string(),
        ));
    }

    if search.start_date > search.end_date {
        return Err(ConfigError::Validation(format!(
            "start-date {} is later than end-date {}",
            search.start_date, search.end_date
        )));
    }

    let regions = search.region_list();
    let mut tasks = Vec::with_capacity(keywords.len() * regions.len());

    for keyword in &keywords {
        for region in &regions {
            tasks.push(SearchTask {
                keyword: keyword.clone(),
                date_start: search.start_date,
                date_end: search.end_date,
                region: region.clone(),
                weibo_type: search.weibo_type,
                contain_type: search.contain_type,
            });
        }
    }

    tracing::debug!(
        "Expanded {} keyword(s) x {} region(s) into {} task(s)",
        keywords.len(),
        regions.len(),
        tasks.len()
    );

    Ok(tasks)
}

/// Bisects a task's date interval at its midpoint day
///
/// The halves are disjoint and together cover exactly the original days;
/// the earlier half gets the extra day when the span is odd. Returns `None`
/// for a single-day task.
pub fn split(task: &SearchTask) -> Option<(SearchTask, SearchTask)> {
    if !task.is_splittable() {
        return None;
    }

    let mid = task.date_start + Duration::days((task.span_days() - 1) / 2);
    let left = task.with_dates(task.date_start, mid);
    let right = task.with_dates(mid + Duration::days(1), task.date_end);

    tracing::debug!("Split {} into {} and {}", task, left, right);
    Some((left, right))
}
