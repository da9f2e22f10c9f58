//! Search result page extraction
//!
//! This module turns one raw result page into post records:
//! - Post identity from the `mid` attribute of each feed item
//! - Author, publish time, text and media links
//! - Original/forward and media type flags
//! - The number of result pages the endpoint advertises

use crate::state::{PostRecord, TypeFlags};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

const CONTAINER: &str = "#pl_feedlist_index";
const FEED_ITEM: &str = r#"div[action-type="feed_list_item"]"#;
const AUTHOR: &str = "a.name";
const FULL_TEXT: &str = r#"p[node-type="feed_list_content_full"]"#;
const SUMMARY_TEXT: &str = r#"p[node-type="feed_list_content"]"#;
const PUBLISHED: &str = ".from a";
const MEDIA_IMAGE: &str = r#"[node-type="feed_list_media_prev"] img"#;
const MEDIA_VIDEO: &str = r#"[node-type="feed_list_media_prev"] video"#;
const FORWARDED: &str = r#"[node-type="feed_list_forwardContent"]"#;
const PAGER_ITEM: &str = r#"[node-type="feed_list_page_morelist"] li"#;

/// The page does not have the structure of a search result page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("result container {0} not found")]
    MissingContainer(&'static str),

    #[error("feed item {0} has no mid attribute")]
    MissingContentId(usize),

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Posts and pagination hints extracted from one result page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Candidate records in page order, not yet deduplicated
    pub posts: Vec<PostRecord>,

    /// Page count shown by the pager, if the page has one
    pub advertised_pages: Option<u32>,
}

/// Extracts post records from a raw result page
///
/// A page without the result container (a login wall, a captcha, an error
/// page) is a [`ParseError`], as is a feed item without its `mid`. A page
/// with the container but no items is a valid empty page.
///
/// # Arguments
///
/// * `raw_page` - The HTML body returned by the endpoint
/// * `keyword` - Keyword of the task the page belongs to
///
/// # Example
///
/// ```
/// use weibo_search::crawler::extract;
///
/// let html = r#"<div id="pl_feedlist_index">
///   <div action-type="feed_list_item" mid="4990000000000001">
///     <a class="name">作者</a>
///     <p node-type="feed_list_content">你好</p>
///   </div>
/// </div>"#;
///
/// let page = extract(html, "问候").unwrap();
/// assert_eq!(page.posts[0].content_id, "4990000000000001");
/// assert_eq!(page.posts[0].text, "你好");
/// ```
pub fn extract(raw_page: &str, keyword: &str) -> Result<ParsedPage, ParseError> {
    let document = Html::parse_document(raw_page);

    let container_selector = selector(CONTAINER)?;
    let container = document
        .select(&container_selector)
        .next()
        .ok_or(ParseError::MissingContainer(CONTAINER))?;

    let item_selector = selector(FEED_ITEM)?;
    let mut posts = Vec::new();
    for (index, item) in container.select(&item_selector).enumerate() {
        posts.push(extract_post(item, index, keyword)?);
    }

    let pager_selector = selector(PAGER_ITEM)?;
    let pager_len = document.select(&pager_selector).count();
    let advertised_pages = (pager_len > 0).then_some(pager_len as u32);

    Ok(ParsedPage {
        posts,
        advertised_pages,
    })
}

fn extract_post(item: ElementRef<'_>, index: usize, keyword: &str) -> Result<PostRecord, ParseError> {
    let content_id = item
        .value()
        .attr("mid")
        .map(str::trim)
        .filter(|mid| !mid.is_empty())
        .ok_or(ParseError::MissingContentId(index))?
        .to_string();

    let author = first_text(item, AUTHOR)?.unwrap_or_default();
    let text = match first_text(item, FULL_TEXT)? {
        Some(text) => text,
        None => first_text(item, SUMMARY_TEXT)?.unwrap_or_default(),
    };
    let timestamp = first_text(item, PUBLISHED)?.unwrap_or_default();

    let mut media_links = Vec::new();
    let image_selector = selector(MEDIA_IMAGE)?;
    let images: Vec<String> = item
        .select(&image_selector)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(absolute_link)
        .collect();
    let video_selector = selector(MEDIA_VIDEO)?;
    let videos: Vec<String> = item
        .select(&video_selector)
        .filter_map(|video| video.value().attr("src"))
        .filter_map(absolute_link)
        .collect();

    let has_images = !images.is_empty();
    let has_video = !videos.is_empty();
    media_links.extend(images);
    media_links.extend(videos);

    let forwarded_selector = selector(FORWARDED)?;
    let original = item.select(&forwarded_selector).next().is_none();

    Ok(PostRecord {
        content_id,
        keyword: keyword.to_string(),
        author,
        timestamp,
        text,
        media_links,
        raw_type_flags: TypeFlags {
            original,
            has_images,
            has_video,
        },
    })
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {}", css, e)))
}

/// Whitespace-collapsed text of the first match, `None` if absent or blank
fn first_text(item: ElementRef<'_>, css: &str) -> Result<Option<String>, ParseError> {
    let selector = selector(css)?;
    Ok(item
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Makes protocol-relative links absolute and drops empty or inline ones
fn absolute_link(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    Some(src.to_string())
}

/// Renders a minimal result page for tests
#[cfg(test)]
pub(crate) fn render_page(mids: &[&str], advertised_pages: Option<u32>) -> String {
    let items: String = mids
        .iter()
        .map(|mid| {
            format!(
                r#"<div class="card-wrap" action-type="feed_list_item" mid="{mid}">
                     <a class="name">user-{mid}</a>
                     <p class="txt" node-type="feed_list_content">post {mid}</p>
                     <p class="from"><a href="//weibo.com/1/{mid}">2024-01-01 10:00</a></p>
                   </div>"#
            )
        })
        .collect();

    let pager = advertised_pages
        .map(|n| {
            let lis: String = (1..=n)
                .map(|p| format!(r#"<li><a href="?page={p}">第{p}页</a></li>"#))
                .collect();
            format!(r#"<ul node-type="feed_list_page_morelist">{lis}</ul>"#)
        })
        .unwrap_or_default();

    format!(
        r#"<html><body><div id="pl_feedlist_index">{items}<div class="m-page">{pager}</div></div></body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ITEM: &str = r#"
<html><body>
<div id="pl_feedlist_index">
  <div class="card-wrap" action-type="feed_list_item" mid="4991234567890123">
    <div class="card"><div class="card-feed"><div class="content">
      <div class="info"><a class="name" href="//weibo.com/1001" nick-name="小明">小明</a></div>
      <p class="txt" node-type="feed_list_content">今天天气   不错 ...展开</p>
      <p class="txt" node-type="feed_list_content_full" style="display: none">
        今天天气
        不错，出去走走
      </p>
      <div class="media media-piclist" node-type="feed_list_media_prev">
        <ul>
          <li><img src="//wx1.sinaimg.cn/orj360/a.jpg"></li>
          <li><img src="https://wx2.sinaimg.cn/orj360/b.jpg"></li>
        </ul>
        <video src="//f.video.weibocdn.com/c.mp4"></video>
      </div>
      <p class="from"><a href="//weibo.com/1001/Nabc" target="_blank">01月03日 12:00</a> 来自 <a>iPhone</a></p>
    </div></div></div>
  </div>
  <div class="card-wrap" action-type="feed_list_item" mid="4991234567890124">
    <div class="content">
      <a class="name">转发者</a>
      <p class="txt" node-type="feed_list_content">转发微博</p>
      <div class="card-comment" node-type="feed_list_forwardContent">
        <a class="name">@原作者</a>
        <p class="txt" node-type="feed_list_content">原文</p>
      </div>
      <p class="from"><a>5分钟前</a></p>
    </div>
  </div>
  <div class="m-page">
    <ul class="s-scroll" node-type="feed_list_page_morelist">
      <li><a href="?page=1">第1页</a></li>
      <li><a href="?page=2">第2页</a></li>
      <li><a href="?page=3">第3页</a></li>
    </ul>
  </div>
</div>
</body></html>
"#;

    #[test]
    fn test_extract_full_item() {
        let page = extract(FULL_ITEM, "天气").unwrap();
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.advertised_pages, Some(3));

        let post = &page.posts[0];
        assert_eq!(post.content_id, "4991234567890123");
        assert_eq!(post.keyword, "天气");
        assert_eq!(post.author, "小明");
        assert_eq!(post.text, "今天天气 不错，出去走走");
        assert_eq!(post.timestamp, "01月03日 12:00");
        assert_eq!(
            post.media_links,
            vec![
                "https://wx1.sinaimg.cn/orj360/a.jpg",
                "https://wx2.sinaimg.cn/orj360/b.jpg",
                "https://f.video.weibocdn.com/c.mp4",
            ]
        );
        assert_eq!(
            post.raw_type_flags,
            TypeFlags {
                original: true,
                has_images: true,
                has_video: true
            }
        );
    }

    #[test]
    fn test_extract_forwarded_item() {
        let page = extract(FULL_ITEM, "天气").unwrap();
        let post = &page.posts[1];

        assert_eq!(post.author, "转发者");
        assert_eq!(post.text, "转发微博");
        assert_eq!(post.timestamp, "5分钟前");
        assert!(post.media_links.is_empty());
        assert!(!post.raw_type_flags.original);
        assert!(!post.raw_type_flags.has_images);
    }

    #[test]
    fn test_empty_result_page() {
        let html = r#"<div id="pl_feedlist_index"><div class="card card-no-result">抱歉，未找到结果</div></div>"#;
        let page = extract(html, "kw").unwrap();
        assert!(page.posts.is_empty());
        assert_eq!(page.advertised_pages, None);
    }

    #[test]
    fn test_missing_container_is_parse_error() {
        let html = r#"<html><body><div class="login-box">请登录</div></body></html>"#;
        assert_eq!(
            extract(html, "kw"),
            Err(ParseError::MissingContainer(CONTAINER))
        );
    }

    #[test]
    fn test_missing_mid_is_parse_error() {
        let html = r#"<div id="pl_feedlist_index">
            <div action-type="feed_list_item" mid="1"><p node-type="feed_list_content">a</p></div>
            <div action-type="feed_list_item"><p node-type="feed_list_content">b</p></div>
        </div>"#;
        assert_eq!(extract(html, "kw"), Err(ParseError::MissingContentId(1)));
    }

    #[test]
    fn test_rendered_fixture_parses() {
        let page = extract(&render_page(&["1", "2", "3"], Some(7)), "kw").unwrap();
        let ids: Vec<&str> = page.posts.iter().map(|p| p.content_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(page.advertised_pages, Some(7));
        assert_eq!(page.posts[2].text, "post 3");
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(
            absolute_link("//a.com/x.jpg"),
            Some("https://a.com/x.jpg".to_string())
        );
        assert_eq!(
            absolute_link(" http://a.com/y.jpg "),
            Some("http://a.com/y.jpg".to_string())
        );
        assert_eq!(absolute_link(""), None);
        assert_eq!(absolute_link("data:image/png;base64,AAAA"), None);
    }
}
