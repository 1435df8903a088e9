//! Event list derivation and calendar filters.
//!
//! Everything here is a pure function of the event set and the current day,
//! so the list a page shows can be computed without a browser.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::DisplayEvent;

const NEW_POKEMON: &str = "新ポケモン";
const NEW_FIELD: &str = "新フィールド";
const EVENT: &str = "イベント";
const CAMPAIGN: &str = "キャンペーン";
const FULL_MOON: &str = "満月";
const NEW_MOON: &str = "新月";
const NEW_MOON_DAY: &str = "NMD";
const GOOD_SLEEP_DAY: &str = "GSD";

const HIDDEN_CLASS: &str = "hidden-event";
const TRANSPARENT: &str = "transparent";
const TEXT_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value `{0}`")]
pub struct UnknownValue(pub String);

/// Category choices of the event list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    All,
    Pokemon,
    Field,
    Events,
    Regular,
}

impl EventCategory {
    #[must_use]
    pub fn matches(self, event: &DisplayEvent) -> bool {
        match self {
            Self::All => true,
            Self::Pokemon => event.has_tag(NEW_POKEMON) && !event.has_tag(NEW_FIELD),
            Self::Field => event.has_tag(NEW_FIELD),
            Self::Events => {
                (event.has_tag(EVENT) || event.has_tag(CAMPAIGN))
                    && !event.has_tag(FULL_MOON)
                    && !event.has_tag(NEW_MOON)
            }
            Self::Regular => is_regular(event),
        }
    }
}

impl FromStr for EventCategory {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pokemon" => Ok(Self::Pokemon),
            "field" => Ok(Self::Field),
            "events" => Ok(Self::Events),
            "regular" => Ok(Self::Regular),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Choices of the coarse calendar filter, which only changes visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityFilter {
    #[default]
    All,
    NewPokemon,
    Events,
    Regular,
}

impl VisibilityFilter {
    #[must_use]
    pub fn shows(self, event: &DisplayEvent) -> bool {
        match self {
            Self::All => true,
            Self::NewPokemon => event.has_tag(NEW_POKEMON) || event.has_tag(NEW_FIELD),
            Self::Events => event.has_tag(EVENT) || event.has_tag(CAMPAIGN),
            Self::Regular => is_regular(event),
        }
    }
}

impl FromStr for VisibilityFilter {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "new-pokemon" => Ok(Self::NewPokemon),
            "events" => Ok(Self::Events),
            "regular" => Ok(Self::Regular),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

fn is_regular(event: &DisplayEvent) -> bool {
    event.has_tag(NEW_MOON_DAY) || event.has_tag(GOOD_SLEEP_DAY)
}

/// Style override the calendar applies to one rendered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStyle {
    pub background_color: String,
    pub border_color: String,
    pub text_color: String,
    pub class_names: Vec<String>,
}

impl DisplayStyle {
    fn shown(color: &str) -> Self {
        Self {
            background_color: color.to_string(),
            border_color: color.to_string(),
            text_color: TEXT_COLOR.to_string(),
            class_names: Vec::new(),
        }
    }

    fn hidden() -> Self {
        Self {
            background_color: TRANSPARENT.to_string(),
            border_color: TRANSPARENT.to_string(),
            text_color: TRANSPARENT.to_string(),
            class_names: vec![HIDDEN_CLASS.to_string()],
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.class_names.iter().any(|class| class == HIDDEN_CLASS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStyle {
    pub id: String,
    pub style: DisplayStyle,
}

/// One style per event, in event order. Filtered-out events stay in the
/// calendar, transparent and not clickable.
pub fn visibility_styles<'a, I>(events: I, filter: VisibilityFilter) -> Vec<EventStyle>
where
    I: IntoIterator<Item = &'a DisplayEvent>,
{
    events
        .into_iter()
        .map(|event| EventStyle {
            id: event.id.clone(),
            style: if filter.shows(event) {
                DisplayStyle::shown(&event.color)
            } else {
                DisplayStyle::hidden()
            },
        })
        .collect()
}

/// Whether an event starts before `today`.
#[must_use]
pub fn is_past(event: &DisplayEvent, today: NaiveDate) -> bool {
    event.start.date() < today
}

/// Splits events into `(past, future)`, keeping source order.
pub fn partition<'a, I>(events: I, today: NaiveDate) -> (Vec<&'a DisplayEvent>, Vec<&'a DisplayEvent>)
where
    I: IntoIterator<Item = &'a DisplayEvent>,
{
    events.into_iter().partition(|event| is_past(event, today))
}

/// Derives the event list: the first `future_cap` upcoming events (by source
/// order) matching `category`, ascending, followed by the matching past
/// events, newest first.
///
/// For [`EventCategory::Regular`] the past side is taken from the whole set
/// so every recurring event ever held is listed.
pub fn build_event_list<'a>(
    events: &[&'a DisplayEvent],
    category: EventCategory,
    today: NaiveDate,
    future_cap: usize,
) -> Vec<&'a DisplayEvent> {
    let (past, future) = partition(events.iter().copied(), today);

    let mut future: Vec<_> = future
        .into_iter()
        .take(future_cap)
        .filter(|event| category.matches(event))
        .collect();

    let mut past: Vec<_> = if category == EventCategory::Regular {
        events
            .iter()
            .copied()
            .filter(|event| category.matches(event))
            .filter(|event| is_past(event, today))
            .collect()
    } else {
        past.into_iter()
            .filter(|event| category.matches(event))
            .collect()
    };

    future.sort_by_key(|event| event.start.sort_key());
    past.sort_by(|a, b| b.start.sort_key().cmp(&a.start.sort_key()));

    future.extend(past);
    future
}

/// Case-insensitive match of the list search box against title or tags.
#[must_use]
pub fn matches_search(title: &str, tags: &[String], term: &str) -> bool {
    let term = term.to_lowercase();
    title.to_lowercase().contains(&term) || tags.iter().any(|tag| tag.to_lowercase().contains(&term))
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::{model::UnofficialLinks, normalize::normalize_records, EventSet};

    pub(crate) fn event_set(records: Vec<Value>) -> EventSet {
        normalize_records(records, &UnofficialLinks::new())
    }

    fn ids(events: &[&DisplayEvent]) -> Vec<String> {
        events.iter().map(|event| event.id.clone()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn splits_at_midnight() {
        let set = event_set(vec![
            json!({ "id": "yesterday-late", "title": "t", "start": "2024-06-14T23:59:00" }),
            json!({ "id": "today-early", "title": "t", "start": "2024-06-15T00:00:00" }),
            json!({ "id": "today", "title": "t", "start": "2024-06-15" }),
            json!({ "id": "tomorrow", "title": "t", "start": "2024-06-16" }),
        ]);

        let (past, future) = partition(set.events(), today());
        assert_eq!(ids(&past), ["yesterday-late"]);
        assert_eq!(ids(&future), ["today-early", "today", "tomorrow"]);
    }

    #[test]
    fn future_is_capped_before_filtering() {
        let set = event_set(vec![
            json!({ "id": "f1", "title": "t", "start": "2024-07-01", "tags": ["イベント"] }),
            json!({ "id": "f2", "title": "t", "start": "2024-06-20", "tags": ["GSD"] }),
            json!({ "id": "f3", "title": "t", "start": "2024-06-16", "tags": ["イベント"] }),
            json!({ "id": "p1", "title": "t", "start": "2024-06-01", "tags": ["イベント"] }),
            json!({ "id": "p2", "title": "t", "start": "2024-06-10", "tags": ["イベント"] }),
        ]);
        let events: Vec<_> = set.events().collect();

        let all = build_event_list(&events, EventCategory::All, today(), 2);
        assert_eq!(ids(&all), ["f2", "f1", "p2", "p1"]);

        let only_events = build_event_list(&events, EventCategory::Events, today(), 2);
        assert_eq!(ids(&only_events), ["f1", "p2", "p1"]);
    }

    #[test]
    fn regular_lists_every_past_occurrence() {
        let mut records = vec![
            json!({ "id": "f1", "title": "t", "start": "2024-06-16", "tags": ["イベント"] }),
            json!({ "id": "f2", "title": "t", "start": "2024-06-17", "tags": ["イベント"] }),
            json!({ "id": "f3", "title": "t", "start": "2024-06-18", "tags": ["NMD"] }),
        ];
        for month in 1..=5 {
            records.push(json!({
                "id": format!("nmd-{month}"),
                "title": "New Moon Day",
                "start": format!("2024-{month:02}-06"),
                "tags": ["NMD"],
            }));
        }
        records.push(json!({ "id": "gsd", "title": "t", "start": "2024-05-22", "tags": ["GSD"] }));
        records.push(json!({ "id": "other", "title": "t", "start": "2024-05-23", "tags": ["イベント"] }));

        let set = event_set(records);
        let events: Vec<_> = set.events().collect();
        let list = build_event_list(&events, EventCategory::Regular, today(), 2);

        // f3 is beyond the future cap; every past NMD/GSD event is listed.
        assert_eq!(
            ids(&list),
            ["gsd", "nmd-5", "nmd-4", "nmd-3", "nmd-2", "nmd-1"]
        );
    }

    #[test]
    fn pokemon_excludes_new_field() {
        let set = event_set(vec![
            json!({ "id": "both", "title": "t", "start": "2024-06-01", "tags": ["新ポケモン", "新フィールド"] }),
            json!({ "id": "mon", "title": "t", "start": "2024-06-02", "tags": ["新ポケモン"] }),
        ]);
        let events: Vec<_> = set.events().collect();

        let pokemon = build_event_list(&events, EventCategory::Pokemon, today(), 2);
        assert_eq!(ids(&pokemon), ["mon"]);

        let field = build_event_list(&events, EventCategory::Field, today(), 2);
        assert_eq!(ids(&field), ["both"]);
    }

    #[test]
    fn events_category_skips_moon_events() {
        let set = event_set(vec![
            json!({ "id": "moon", "title": "t", "start": "2024-06-01", "tags": ["イベント", "満月"] }),
            json!({ "id": "camp", "title": "t", "start": "2024-06-02", "tags": ["キャンペーン"] }),
        ]);
        let events: Vec<_> = set.events().collect();

        let list = build_event_list(&events, EventCategory::Events, today(), 2);
        assert_eq!(ids(&list), ["camp"]);
    }

    #[test]
    fn visibility_keeps_every_event() {
        let set = event_set(vec![
            json!({ "id": "gsd", "title": "t", "start": "2024-06-01", "tags": ["GSD"], "color": "#112233" }),
            json!({ "id": "plain", "title": "t", "start": "2024-06-02" }),
        ]);

        let styles = visibility_styles(set.events(), VisibilityFilter::Regular);
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0].style.background_color, "#112233");
        assert!(!styles[0].style.is_hidden());
        assert_eq!(styles[1].style.text_color, "transparent");
        assert!(styles[1].style.is_hidden());

        let styles = visibility_styles(set.events(), VisibilityFilter::All);
        assert!(styles.iter().all(|s| !s.style.is_hidden()));
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("regular".parse(), Ok(EventCategory::Regular));
        assert_eq!("new-pokemon".parse(), Ok(VisibilityFilter::NewPokemon));
        assert_eq!(
            "pokemon".parse::<VisibilityFilter>(),
            Err(UnknownValue("pokemon".into()))
        );
    }

    #[test]
    fn search_is_case_insensitive() {
        let tags = vec!["GSD".to_string()];
        assert!(matches_search("Good Sleep Day", &tags, "sleep"));
        assert!(matches_search("Good Sleep Day", &tags, "gsd"));
        assert!(matches_search("Good Sleep Day", &tags, ""));
        assert!(!matches_search("Good Sleep Day", &tags, "moon"));
    }

    #[test]
    fn upcoming_events_order_by_instant() {
        let set = event_set(vec![
            json!({ "id": "utc-evening", "title": "t", "start": "2030-06-19T20:00:00Z" }),
            json!({ "id": "late-jst", "title": "t", "start": "2030-06-20T01:00:00+09:00" }),
        ]);
        let events: Vec<_> = set.events().collect();

        let list = build_event_list(&events, EventCategory::All, today(), 2);
        assert_eq!(ids(&list), ["late-jst", "utc-evening"]);
    }
}
