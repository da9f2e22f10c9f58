use crate::query::{province_code, SearchTask};
use ::url::Url;

/// Builds the search URL for one page of a task
///
/// # Query Parameters
///
/// | Parameter   | Value                                          |
/// |-------------|------------------------------------------------|
/// | `q`         | the keyword (percent-encoded, `#topic#` safe)  |
/// | `region`    | `custom:<province code>:1000`, omitted for all |
/// | type filter | e.g. `scope=ori`, `typeall=1`                  |
/// | content     | e.g. `haspic=1`, `suball=1`                    |
/// | `timescope` | `custom:<start>-0:<end + 1 day>-0`             |
/// | `page`      | 1-based page number                            |
///
/// The endpoint treats the end of `timescope` as exclusive, so the inclusive
/// task end is shifted forward one day.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use url::Url;
/// use weibo_search::query::build_search_url;
/// use weibo_search::{ContainType, SearchTask, WeiboType};
///
/// let task = SearchTask {
///     keyword: "rust".to_string(),
///     date_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     date_end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
///     region: None,
///     weibo_type: WeiboType::All,
///     contain_type: ContainType::Any,
/// };
/// let base = Url::parse("https://s.weibo.com/weibo").unwrap();
/// let url = build_search_url(&base, &task, 1);
/// assert!(url.as_str().contains("timescope=custom%3A2024-01-01-0%3A2024-01-03-0"));
/// ```
pub fn build_search_url(base: &Url, task: &SearchTask, page: u32) -> Url {
    let mut url = base.clone();
    let timescope_end = task.date_end.succ_opt().unwrap_or(task.date_end);

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", &task.keyword);

        if let Some(code) = task.region.as_deref().and_then(province_code) {
            pairs.append_pair("region", &format!("custom:{}:1000", code));
        }

        let (key, value) = task.weibo_type.query_param();
        pairs.append_pair(key, value);

        let (key, value) = task.contain_type.query_param();
        pairs.append_pair(key, value);

        pairs.append_pair(
            "timescope",
            &format!(
                "custom:{}-0:{}-0",
                task.date_start.format("%Y-%m-%d"),
                timescope_end.format("%Y-%m-%d")
            ),
        );
        pairs.append_pair("page", &page.to_string());
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ContainType, WeiboType};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn base() -> Url {
        Url::parse("https://s.weibo.com/weibo").unwrap()
    }

    fn task(region: Option<&str>) -> SearchTask {
        SearchTask {
            keyword: "#话题#".to_string(),
            date_start: NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            region: region.map(str::to_string),
            weibo_type: WeiboType::Original,
            contain_type: ContainType::Images,
        }
    }

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_basic_params() {
        let url = build_search_url(&base(), &task(None), 3);
        let params = params(&url);

        assert_eq!(params.get("q").unwrap(), "#话题#");
        assert_eq!(params.get("scope").unwrap(), "ori");
        assert_eq!(params.get("haspic").unwrap(), "1");
        assert_eq!(params.get("page").unwrap(), "3");
        assert!(!params.contains_key("region"));
    }

    #[test]
    fn test_keyword_hash_is_encoded() {
        let url = build_search_url(&base(), &task(None), 1);
        assert!(url.as_str().contains("q=%23"));
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_timescope_end_is_exclusive() {
        let url = build_search_url(&base(), &task(None), 1);
        let params = params(&url);
        assert_eq!(
            params.get("timescope").unwrap(),
            "custom:2024-01-30-0:2024-02-01-0"
        );
    }

    #[test]
    fn test_region_param() {
        let url = build_search_url(&base(), &task(Some("北京")), 1);
        let params = params(&url);
        assert_eq!(params.get("region").unwrap(), "custom:11:1000");
    }

    #[test]
    fn test_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:8080/weibo").unwrap();
        let url = build_search_url(&base, &task(None), 1);
        assert_eq!(url.path(), "/weibo");
        assert_eq!(url.host_str(), Some("127.0.0.1"));
    }
}
