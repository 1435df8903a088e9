use std::collections::HashSet;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::model::{
    CalendarEntry, DisplayEvent, EventSet, EventTime, UnofficialLink, UnofficialLinks,
    DEFAULT_COLOR,
};

/// Normalizes one raw record. Records lacking `id`, `title` or a readable
/// `start` are not in display shape and pass through unchanged.
pub fn normalize_record(record: Value, links: &UnofficialLinks) -> CalendarEntry {
    match record.as_object().and_then(|object| display_event(object, links)) {
        Some(event) => CalendarEntry::Display(event),
        None => CalendarEntry::Passthrough(record),
    }
}

/// Normalizes a flattened record list into an [`EventSet`], keeping the
/// first record for any repeated id.
pub fn normalize_records(records: Vec<Value>, links: &UnofficialLinks) -> EventSet {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(records.len());

    for record in records {
        let entry = normalize_record(record, links);

        if let CalendarEntry::Display(event) = &entry {
            if !seen.insert(event.id.clone()) {
                warn!("Dropping record with duplicate id `{}`", event.id);
                continue;
            }
        }

        entries.push(entry);
    }

    EventSet::from_entries(entries)
}

fn display_event(object: &Map<String, Value>, links: &UnofficialLinks) -> Option<DisplayEvent> {
    let id = match object.get("id")? {
        Value::String(id) if !id.is_empty() => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };

    let title = non_empty_str(object, "title")?.to_string();
    let start = EventTime::parse(object.get("start")?.as_str()?)?;

    let end = non_empty_str(object, "end").and_then(|raw| {
        let end = EventTime::parse(raw);
        if end.is_none() {
            debug!("Ignoring unreadable end `{raw}` of event `{id}`");
        }
        end
    });

    let mut tags: Vec<String> = Vec::new();
    for tag in object
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    let unofficial_links = match links.get(&id) {
        Some(links) => links.clone(),
        None => object
            .get("unofficialLinks")
            .cloned()
            .and_then(|links| serde_json::from_value::<Vec<UnofficialLink>>(links).ok())
            .unwrap_or_default(),
    };

    Some(DisplayEvent {
        title,
        start,
        end,
        all_day: object.get("allDay") != Some(&Value::Bool(false)),
        color: non_empty_str(object, "color")
            .unwrap_or(DEFAULT_COLOR)
            .to_string(),
        color2: non_empty_str(object, "color2").map(str::to_string),
        tags,
        description: non_empty_str(object, "description")
            .unwrap_or_default()
            .to_string(),
        link: non_empty_str(object, "link").map(str::to_string),
        unofficial_links,
        id,
    })
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn display(record: Value) -> DisplayEvent {
        match normalize_record(record, &UnofficialLinks::new()) {
            CalendarEntry::Display(event) => event,
            CalendarEntry::Passthrough(raw) => panic!("not normalized: {raw}"),
        }
    }

    #[test]
    fn fills_defaults() {
        let event = display(json!({
            "id": "gsd-2024-05",
            "title": "Good Sleep Day",
            "start": "2024-05-22",
        }));

        assert!(event.all_day);
        assert_eq!(event.end, None);
        assert_eq!(event.color, DEFAULT_COLOR);
        assert_eq!(event.color2, None);
        assert!(event.tags.is_empty());
        assert_eq!(event.description, "");
        assert_eq!(event.link, None);
        assert!(event.unofficial_links.is_empty());
    }

    #[test]
    fn keeps_explicit_fields() {
        let event = display(json!({
            "id": "ev-1",
            "title": "Cresselia week",
            "start": "2024-05-20T04:00:00",
            "end": "2024-05-27T03:59:00",
            "allDay": false,
            "color": "#c0a0ff",
            "color2": "#ffe08a",
            "tags": ["イベント", "新ポケモン", "イベント"],
            "description": "Full moon event",
            "link": "https://example.com/news/1",
        }));

        assert!(!event.all_day);
        assert_eq!(event.color, "#c0a0ff");
        assert_eq!(event.color2.as_deref(), Some("#ffe08a"));
        assert_eq!(event.tags, ["イベント", "新ポケモン"]);
        assert_eq!(event.link.as_deref(), Some("https://example.com/news/1"));
        assert!(event.end.is_some());
    }

    #[test]
    fn malformed_fields_degrade() {
        let event = display(json!({
            "id": 42,
            "title": "Odd record",
            "start": "2024-05-01",
            "end": "soon",
            "allDay": "no",
            "color": 7,
            "tags": "NMD",
        }));

        assert_eq!(event.id, "42");
        assert_eq!(event.end, None);
        assert!(event.all_day);
        assert_eq!(event.color, DEFAULT_COLOR);
        assert!(event.tags.is_empty());
    }

    #[test]
    fn unrecognized_shapes_pass_through() {
        for record in [
            json!({ "title": "no id", "start": "2024-05-01" }),
            json!({ "id": "x", "start": "2024-05-01" }),
            json!({ "id": "x", "title": "bad start", "start": "someday" }),
            json!("just a string"),
        ] {
            assert_eq!(
                normalize_record(record.clone(), &UnofficialLinks::new()),
                CalendarEntry::Passthrough(record)
            );
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let links = UnofficialLinks::from([(
            "ev-1".to_string(),
            vec![UnofficialLink {
                name: "wiki".into(),
                url: "https://wiki.example/ev-1".into(),
            }],
        )]);

        let records = [
            json!({ "id": "ev-1", "title": "One", "start": "2024-05-01" }),
            json!({
                "id": "ev-2",
                "title": "Two",
                "start": "2024-05-01T04:00:00+09:00",
                "end": "2024-05-03T04:00:00+09:00",
                "allDay": false,
                "tags": ["GSD"],
                "color2": "#123456",
            }),
        ];

        for record in records {
            let CalendarEntry::Display(once) = normalize_record(record, &links) else {
                panic!("expected display event");
            };
            let again = normalize_record(serde_json::to_value(&once).unwrap(), &links);
            assert_eq!(again, CalendarEntry::Display(once.clone()));

            // Without the mapping the serialized links are picked up again.
            let again = normalize_record(serde_json::to_value(&once).unwrap(), &UnofficialLinks::new());
            assert_eq!(again, CalendarEntry::Display(once));
        }
    }

    #[test]
    fn attaches_unofficial_links_by_id() {
        let links = UnofficialLinks::from([(
            "ev-1".to_string(),
            vec![UnofficialLink {
                name: "wiki".into(),
                url: "https://wiki.example/ev-1".into(),
            }],
        )]);

        let CalendarEntry::Display(event) = normalize_record(
            json!({ "id": "ev-1", "title": "One", "start": "2024-05-01" }),
            &links,
        ) else {
            panic!("expected display event");
        };

        assert_eq!(event.unofficial_links.len(), 1);
        assert_eq!(event.unofficial_links[0].name, "wiki");
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let set = normalize_records(
            vec![
                json!({ "id": "a", "title": "first", "start": "2024-05-01" }),
                json!({ "id": "a", "title": "second", "start": "2024-05-02" }),
                json!({ "note": "raw" }),
            ],
            &UnofficialLinks::new(),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.display_len(), 1);
        assert_eq!(set.get("a").unwrap().title, "first");
    }
}
