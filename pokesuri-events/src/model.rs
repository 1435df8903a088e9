use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Bar color used when a record does not bring its own.
pub const DEFAULT_COLOR: &str = "#5a9b8e";

/// Offset of the site's own zone (Asia/Tokyo, no DST). Times written
/// without an offset are read in it.
pub const SITE_OFFSET: FixedOffset = match FixedOffset::east_opt(9 * 3600) {
    Some(offset) => offset,
    None => panic!("site offset out of range"),
};

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Start or end of an event as written in the data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    Local(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl EventTime {
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Self::Date(date));
        }

        if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Zoned(datetime));
        }

        LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(Self::Local)
    }

    /// Calendar day in the site zone.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::Local(datetime) => datetime.date(),
            Self::Zoned(datetime) => datetime.with_timezone(&SITE_OFFSET).date_naive(),
        }
    }

    /// Wall-clock time in the site zone.
    #[must_use]
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Self::Date(_) => None,
            Self::Local(datetime) => Some(datetime.time()),
            Self::Zoned(datetime) => Some(datetime.with_timezone(&SITE_OFFSET).time()),
        }
    }

    /// The instant, as UTC, used to order events. Dates sort as midnight in
    /// the site zone.
    #[must_use]
    pub fn sort_key(&self) -> NaiveDateTime {
        let site_to_utc =
            |local: NaiveDateTime| local - Duration::seconds(i64::from(SITE_OFFSET.local_minus_utc()));

        match self {
            Self::Date(date) => site_to_utc(date.and_time(NaiveTime::MIN)),
            Self::Local(datetime) => site_to_utc(*datetime),
            Self::Zoned(datetime) => datetime.naive_utc(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Local(datetime) => write!(f, "{}", datetime.format(LOCAL_FORMATS[0])),
            Self::Zoned(datetime) => f.write_str(&datetime.to_rfc3339()),
        }
    }
}

impl FromStr for EventTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid event time `{s}`"))
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnofficialLink {
    pub name: String,
    pub url: String,
}

/// Supplementary links keyed by event id.
pub type UnofficialLinks = HashMap<String, Vec<UnofficialLink>>;

/// Normalized, UI-ready event. Serializes back into the display shape it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEvent {
    pub id: String,
    pub title: String,
    pub start: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    pub all_day: bool,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color2: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unofficial_links: Vec<UnofficialLink>,
}

impl DisplayEvent {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A loaded record: either normalized or handed on untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalendarEntry {
    Display(DisplayEvent),
    Passthrough(Value),
}

impl CalendarEntry {
    #[must_use]
    pub fn as_display(&self) -> Option<&DisplayEvent> {
        match self {
            Self::Display(event) => Some(event),
            Self::Passthrough(_) => None,
        }
    }
}

/// The merged event collection. Display event ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventSet {
    entries: Vec<CalendarEntry>,
}

impl EventSet {
    pub(crate) fn from_entries(entries: Vec<CalendarEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &DisplayEvent> {
        self.entries.iter().filter_map(CalendarEntry::as_display)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DisplayEvent> {
        self.events().find(|event| event.id == id)
    }

    /// Number of entries, passthrough records included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of normalized display events.
    #[must_use]
    pub fn display_len(&self) -> usize {
        self.events().count()
    }

    /// Whether `url` is the link or an unofficial link of some event.
    #[must_use]
    pub fn knows_link(&self, url: &str) -> bool {
        self.events().any(|event| {
            event.link.as_deref() == Some(url)
                || event.unofficial_links.iter().any(|link| link.url == url)
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_time_shapes() {
        assert_eq!(
            EventTime::parse("2024-05-01"),
            Some(EventTime::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
        );

        let local = EventTime::parse("2024-05-01T15:00").unwrap();
        assert!(matches!(local, EventTime::Local(_)));
        assert_eq!(local.time(), NaiveTime::from_hms_opt(15, 0, 0));

        let zoned = EventTime::parse("2024-05-01T23:30:00+09:00").unwrap();
        assert!(matches!(zoned, EventTime::Zoned(_)));
        assert_eq!(zoned.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        assert_eq!(EventTime::parse("next tuesday"), None);
    }

    #[test]
    fn formatted_times_parse_back() {
        for raw in ["2024-05-01", "2024-05-01T04:00:00", "2024-05-01T04:00:00+09:00"] {
            let time = EventTime::parse(raw).unwrap();
            assert_eq!(time.to_string(), raw);
            assert_eq!(EventTime::parse(&time.to_string()), Some(time));
        }
    }

    #[test]
    fn dates_sort_as_midnight() {
        let date = EventTime::parse("2024-05-01").unwrap();
        let morning = EventTime::parse("2024-05-01T04:00").unwrap();
        assert!(date.sort_key() < morning.sort_key());
    }

    #[test]
    fn zoned_times_sort_by_instant() {
        let late_jst = EventTime::parse("2030-06-20T01:00:00+09:00").unwrap();
        let utc_evening = EventTime::parse("2030-06-19T20:00:00Z").unwrap();
        assert!(late_jst.sort_key() < utc_evening.sort_key());

        let floating = EventTime::parse("2030-06-20T04:00").unwrap();
        assert!(floating.sort_key() < utc_evening.sort_key());
    }

    #[test]
    fn knows_event_and_unofficial_links() {
        let mut set = crate::listing::tests::event_set(vec![serde_json::json!({
            "id": "a",
            "title": "A",
            "start": "2024-05-01",
            "link": "https://official.example/a",
        })]);
        if let Some(CalendarEntry::Display(event)) = set.entries.first_mut() {
            event.unofficial_links.push(UnofficialLink {
                name: "wiki".into(),
                url: "https://wiki.example/a".into(),
            });
        }

        assert!(set.knows_link("https://official.example/a"));
        assert!(set.knows_link("https://wiki.example/a"));
        assert!(!set.knows_link("http://127.0.0.1/"));
    }

    #[test]
    fn zoned_times_read_in_site_zone() {
        let utc_evening = EventTime::parse("2030-06-19T20:00:00Z").unwrap();
        assert_eq!(utc_evening.date(), NaiveDate::from_ymd_opt(2030, 6, 20).unwrap());
        assert_eq!(utc_evening.time(), NaiveTime::from_hms_opt(5, 0, 0));
    }
}
