use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::listing::UnknownValue;

/// How much each event list row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListDetail {
    /// Title and period only.
    Compact,
    /// Title, period, tags and unofficial links.
    Full,
}

/// Parameters that distinguish the page variants of the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub manifest: String,
    /// Path of the supplementary link file; `None` when the variant has no such links.
    pub unofficial_links: Option<String>,
    /// Earliest date the calendar may show.
    pub date_floor: NaiveDate,
    pub list_detail: ListDetail,
    /// Number of upcoming events kept in the event list.
    pub future_cap: usize,
}

/// Earliest month the calendar can be paged back to.
pub const DATE_FLOOR: NaiveDate = match NaiveDate::from_ymd_opt(2023, 7, 1) {
    Some(date) => date,
    None => panic!("invalid date floor"),
};

impl Default for PageConfig {
    fn default() -> Self {
        Variant::Main.config()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Main,
    Legacy,
}

impl Variant {
    #[must_use]
    pub fn config(self) -> PageConfig {
        let date_floor = DATE_FLOOR;

        match self {
            Self::Main => PageConfig {
                manifest: "data/eventFiles.json".into(),
                unofficial_links: Some("data/unofficialLinks.json".into()),
                date_floor,
                list_detail: ListDetail::Full,
                future_cap: 2,
            },
            Self::Legacy => PageConfig {
                manifest: "data/eventFiles.json".into(),
                unofficial_links: None,
                date_floor,
                list_detail: ListDetail::Compact,
                future_cap: 2,
            },
        }
    }
}

impl FromStr for Variant {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Self::Main),
            "legacy" => Ok(Self::Legacy),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}
