//! Search query model
//!
//! This module defines the atomic unit of crawl work and the filters that
//! shape each request to the search endpoint:
//! - `SearchTask`: one keyword, one region, one inclusive date interval
//! - `WeiboType` / `ContainType`: result type and content filters
//! - Region name to province code lookup
//! - Search URL construction

mod region;
mod url;

pub use self::url::build_search_url;
pub use region::{is_all_regions, province_code, ALL_REGIONS};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type filter for a search (`weibo-type`, 0..=6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WeiboType {
    /// Every post
    #[default]
    All,
    /// Original posts only (no reposts)
    Original,
    /// Posts ranked as hot
    Hot,
    /// Posts from followed accounts
    Following,
    /// Posts from verified accounts
    Verified,
    /// Posts from media accounts
    Media,
    /// Opinion posts
    Viewpoint,
}

impl WeiboType {
    pub fn code(&self) -> u8 {
        match self {
            Self::All => 0,
            Self::Original => 1,
            Self::Hot => 2,
            Self::Following => 3,
            Self::Verified => 4,
            Self::Media => 5,
            Self::Viewpoint => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::All),
            1 => Some(Self::Original),
            2 => Some(Self::Hot),
            3 => Some(Self::Following),
            4 => Some(Self::Verified),
            5 => Some(Self::Media),
            6 => Some(Self::Viewpoint),
            _ => None,
        }
    }

    /// The query parameter the endpoint expects for this filter
    pub fn query_param(&self) -> (&'static str, &'static str) {
        match self {
            Self::All => ("typeall", "1"),
            Self::Original => ("scope", "ori"),
            Self::Hot => ("xsort", "hot"),
            Self::Following => ("atten", "1"),
            Self::Verified => ("vip", "1"),
            Self::Media => ("category", "4"),
            Self::Viewpoint => ("viewpoint", "1"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all posts",
            Self::Original => "original posts",
            Self::Hot => "hot posts",
            Self::Following => "followed accounts",
            Self::Verified => "verified accounts",
            Self::Media => "media accounts",
            Self::Viewpoint => "viewpoint posts",
        }
    }
}

impl TryFrom<u8> for WeiboType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("weibo-type must be 0..=6, got {}", code))
    }
}

impl From<WeiboType> for u8 {
    fn from(value: WeiboType) -> Self {
        value.code()
    }
}

/// Content filter for a search (`contain-type`, 0..=4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ContainType {
    /// No content filter
    #[default]
    Any,
    Images,
    Video,
    Music,
    ShortLink,
}

impl ContainType {
    pub fn code(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Images => 1,
            Self::Video => 2,
            Self::Music => 3,
            Self::ShortLink => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Any),
            1 => Some(Self::Images),
            2 => Some(Self::Video),
            3 => Some(Self::Music),
            4 => Some(Self::ShortLink),
            _ => None,
        }
    }

    /// The query parameter the endpoint expects for this filter
    pub fn query_param(&self) -> (&'static str, &'static str) {
        match self {
            Self::Any => ("suball", "1"),
            Self::Images => ("haspic", "1"),
            Self::Video => ("hasvideo", "1"),
            Self::Music => ("hasmusic", "1"),
            Self::ShortLink => ("haslink", "1"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Any => "no filter",
            Self::Images => "contains images",
            Self::Video => "contains video",
            Self::Music => "contains music",
            Self::ShortLink => "contains short link",
        }
    }
}

impl TryFrom<u8> for ContainType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("contain-type must be 0..=4, got {}", code))
    }
}

impl From<ContainType> for u8 {
    fn from(value: ContainType) -> Self {
        value.code()
    }
}

/// An immutable unit of crawl work
///
/// The date interval is inclusive on both ends and counted in calendar days.
/// A task is assumed, not guaranteed, to stay under the endpoint's page-depth
/// ceiling; the coordinator checks that assumption while paging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTask {
    pub keyword: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// Region name, `None` meaning all regions
    pub region: Option<String>,
    pub weibo_type: WeiboType,
    pub contain_type: ContainType,
}

impl SearchTask {
    /// Number of calendar days covered by this task
    pub fn span_days(&self) -> i64 {
        (self.date_end - self.date_start).num_days() + 1
    }

    /// Whether the date interval can still be bisected
    pub fn is_splittable(&self) -> bool {
        self.date_start < self.date_end
    }

    /// Iterates over every calendar day covered by this task
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.span_days()).map(move |offset| self.date_start + Duration::days(offset))
    }

    /// Returns a copy of this task restricted to another date interval
    pub fn with_dates(&self, date_start: NaiveDate, date_end: NaiveDate) -> Self {
        Self {
            date_start,
            date_end,
            ..self.clone()
        }
    }
}

impl fmt::Display for SearchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' [{}..{}] region={}",
            self.keyword,
            self.date_start,
            self.date_end,
            self.region.as_deref().unwrap_or(ALL_REGIONS)
        )
    }
}
