//! View models handed to the calendar widget and the page's DOM layer.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{ListDetail, PageConfig},
    model::{CalendarEntry, DisplayEvent, EventTime, UnofficialLink},
};

const WEEKDAYS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];
const ALL_DAY_LABEL: &str = "終日";
const NO_DESCRIPTION: &str = "説明なし";
const TEXT_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub initial_view: &'static str,
    pub locale: &'static str,
    pub first_day: u8,
    pub valid_range: ValidRange,
    pub day_max_events: u8,
    pub event_max_stack: u8,
    pub fixed_week_count: bool,
    pub show_non_current_dates: bool,
    pub events: Vec<WidgetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidRange {
    pub start: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetEntry {
    Event(WidgetEvent),
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetEvent {
    pub id: String,
    pub title: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub all_day: bool,
    pub background_color: String,
    pub border_color: String,
    pub text_color: &'static str,
    pub extended_props: ExtendedProps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProps {
    pub description: String,
    pub tags: Vec<String>,
    pub link: String,
    pub color: String,
    pub color2: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unofficial_links: Vec<UnofficialLink>,
}

/// Initialization options for the month grid.
#[must_use]
pub fn widget_options<'a, I>(entries: I, config: &PageConfig) -> WidgetOptions
where
    I: IntoIterator<Item = &'a CalendarEntry>,
{
    WidgetOptions {
        initial_view: "dayGridMonth",
        locale: "ja",
        first_day: 1,
        valid_range: ValidRange {
            start: config.date_floor,
        },
        day_max_events: 4,
        event_max_stack: 4,
        fixed_week_count: false,
        show_non_current_dates: true,
        events: entries
            .into_iter()
            .map(|entry| match entry {
                CalendarEntry::Display(event) => WidgetEntry::Event(widget_event(event)),
                CalendarEntry::Passthrough(raw) => WidgetEntry::Raw(raw.clone()),
            })
            .collect(),
    }
}

#[must_use]
pub fn widget_event(event: &DisplayEvent) -> WidgetEvent {
    WidgetEvent {
        id: event.id.clone(),
        title: event.title.clone(),
        start: event.start,
        end: widget_end(event),
        all_day: event.all_day,
        background_color: event.color.clone(),
        border_color: event.color.clone(),
        text_color: TEXT_COLOR,
        extended_props: ExtendedProps {
            description: event.description.clone(),
            tags: event.tags.clone(),
            link: event.link.clone().unwrap_or_default(),
            color: event.color.clone(),
            color2: event.color2.clone(),
            unofficial_links: event.unofficial_links.clone(),
        },
    }
}

/// The end handed to the widget. Data files give the last day of a
/// multi-day all-day event; the widget expects the day after it.
#[must_use]
pub fn widget_end(event: &DisplayEvent) -> Option<EventTime> {
    let end = event.end?;

    if event.all_day && end.date() > event.start.date() {
        return Some(EventTime::Date(end.date() + Duration::days(1)));
    }

    Some(end)
}

/// Year and month shown by a month grid whose visible range starts at
/// `range_start`. Grids open on the trailing week of the previous month
/// unless the month starts the week.
#[must_use]
pub fn displayed_month(range_start: NaiveDate) -> (i32, u32) {
    if range_start.day() == 1 {
        return (range_start.year(), range_start.month());
    }

    match range_start.month() {
        12 => (range_start.year() + 1, 1),
        month => (range_start.year(), month + 1),
    }
}

#[must_use]
pub fn month_label(year: i32, month: u32) -> String {
    format!("{year}年{month}月")
}

fn weekday(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_sunday() as usize]
}

/// `2024年05月01日（水）`
#[must_use]
pub fn list_date(date: NaiveDate) -> String {
    format!(
        "{}年{:02}月{:02}日（{}）",
        date.year(),
        date.month(),
        date.day(),
        weekday(date)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,
    pub title: String,
    pub period: String,
    pub start: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unofficial_links: Vec<UnofficialLink>,
}

impl ListItem {
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        crate::listing::matches_search(&self.title, &self.tags, term)
    }
}

#[must_use]
pub fn list_item(event: &DisplayEvent, detail: ListDetail) -> ListItem {
    let start = list_date(event.start.date());
    let period = match event.end.map(|end| list_date(end.date())) {
        Some(end) if end != start => format!("{start}〜{end}"),
        _ => start,
    };

    let (tags, unofficial_links) = match detail {
        ListDetail::Full => (event.tags.clone(), event.unofficial_links.clone()),
        ListDetail::Compact => (Vec::new(), Vec::new()),
    };

    ListItem {
        id: event.id.clone(),
        title: event.title.clone(),
        period,
        start: event.start,
        tags,
        unofficial_links,
    }
}

/// Contents of the event detail modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    pub id: String,
    pub title: String,
    pub date_label: String,
    pub time_label: String,
    pub description: String,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub accent_color: String,
    pub start: EventTime,
    pub unofficial_links: Vec<UnofficialLink>,
}

#[must_use]
pub fn detail_view(event: &DisplayEvent) -> DetailView {
    let date = event.start.date();

    DetailView {
        id: event.id.clone(),
        title: event.title.clone(),
        date_label: format!(
            "{}年{}月{}日{}曜日",
            date.year(),
            date.month(),
            date.day(),
            weekday(date)
        ),
        time_label: time_label(event),
        description: if event.description.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            event.description.clone()
        },
        tags: event.tags.clone(),
        link: event.link.clone(),
        accent_color: event.color.clone(),
        start: event.start,
        unofficial_links: event.unofficial_links.clone(),
    }
}

fn time_label(event: &DisplayEvent) -> String {
    if event.all_day {
        return ALL_DAY_LABEL.to_string();
    }

    let clock = |time: EventTime| time.time().unwrap_or(NaiveTime::MIN).format("%H:%M").to_string();
    let start = clock(event.start);

    match event.end {
        Some(end) => format!("{start} 〜 {}", clock(end)),
        None => format!("{start}〜"),
    }
}
