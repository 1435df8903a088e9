use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::{
    config::PageConfig,
    listing::{build_event_list, visibility_styles, EventCategory, EventStyle, VisibilityFilter},
    model::EventSet,
    render::{self, DetailView, ListItem, WidgetOptions},
};

/// Page state the DOM layer renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub visibility: VisibilityFilter,
    pub category: EventCategory,
    pub search: String,
    pub list_open: bool,
    /// Id of the event whose detail modal is open.
    pub detail: Option<String>,
    /// Event list scroll offset saved when a detail is opened from the list.
    pub list_scroll: u32,
    pub month: (i32, u32),
}

/// What the page shows again once the detail modal closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    EventList { scroll: u32 },
    Calendar,
}

pub struct CalendarController {
    events: Arc<EventSet>,
    config: PageConfig,
    state: UiState,
}

impl CalendarController {
    #[must_use]
    pub fn new(events: Arc<EventSet>, config: PageConfig, today: NaiveDate) -> Self {
        Self {
            events,
            config,
            state: UiState {
                visibility: VisibilityFilter::All,
                category: EventCategory::All,
                search: String::new(),
                list_open: false,
                detail: None,
                list_scroll: 0,
                month: (today.year(), today.month()),
            },
        }
    }

    #[must_use]
    pub fn state(&self) -> &UiState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    #[must_use]
    pub fn widget_options(&self) -> WidgetOptions {
        render::widget_options(self.events.entries(), &self.config)
    }

    pub fn apply_visibility_filter(&mut self, filter: VisibilityFilter) -> Vec<EventStyle> {
        self.state.visibility = filter;
        visibility_styles(self.events.events(), filter)
    }

    pub fn open_event_list(&mut self, today: NaiveDate) -> Vec<ListItem> {
        self.state.list_open = true;
        self.event_list(today)
    }

    pub fn close_event_list(&mut self) {
        self.state.list_open = false;
    }

    pub fn set_category(&mut self, category: EventCategory) {
        self.state.category = category;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.state.search = term.into();
    }

    /// The event list for the current category, narrowed by the search term.
    #[must_use]
    pub fn event_list(&self, today: NaiveDate) -> Vec<ListItem> {
        let events: Vec<_> = self.events.events().collect();

        build_event_list(&events, self.state.category, today, self.config.future_cap)
            .into_iter()
            .map(|event| render::list_item(event, self.config.list_detail))
            .filter(|item| item.matches(&self.state.search))
            .collect()
    }

    /// Opens the detail modal. `list_scroll` is set when the detail is opened
    /// from the event list, which is hidden but stays logically open.
    pub fn open_detail(&mut self, id: &str, list_scroll: Option<u32>) -> Option<DetailView> {
        let view = render::detail_view(self.events.get(id)?);

        if let Some(scroll) = list_scroll.filter(|_| self.state.list_open) {
            self.state.list_scroll = scroll;
        }
        self.state.detail = Some(id.to_string());

        Some(view)
    }

    pub fn close_detail(&mut self) -> Restore {
        self.state.detail = None;

        if self.state.list_open {
            Restore::EventList {
                scroll: self.state.list_scroll,
            }
        } else {
            Restore::Calendar
        }
    }

    /// Moves the grid to the month of `date`, closing any open modal.
    pub fn go_to_month(&mut self, date: NaiveDate) -> String {
        self.state.detail = None;
        self.state.list_open = false;
        self.state.month = (date.year(), date.month());
        self.month_label()
    }

    /// Steps back one month unless the grid already shows the earliest allowed month.
    pub fn prev_month(&mut self) -> bool {
        let floor = (self.config.date_floor.year(), self.config.date_floor.month());
        if self.state.month <= floor {
            return false;
        }

        self.state.month = match self.state.month {
            (year, 1) => (year - 1, 12),
            (year, month) => (year, month - 1),
        };
        true
    }

    pub fn next_month(&mut self) {
        self.state.month = match self.state.month {
            (year, 12) => (year + 1, 1),
            (year, month) => (year, month + 1),
        };
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.state.month = (today.year(), today.month());
    }

    /// Widget `datesSet` callback.
    pub fn dates_set(&mut self, range_start: NaiveDate) {
        self.state.month = render::displayed_month(range_start);
    }

    #[must_use]
    pub fn month_label(&self) -> String {
        render::month_label(self.state.month.0, self.state.month.1)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{config::ListDetail, listing::tests::event_set};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controller(today: NaiveDate) -> CalendarController {
        let events = event_set(vec![
            json!({ "id": "nmd", "title": "New Moon Day", "start": "2024-06-06", "tags": ["NMD"] }),
            json!({ "id": "gsd", "title": "Good Sleep Day", "start": "2024-05-22", "tags": ["GSD"] }),
            json!({ "id": "ev", "title": "Summer event", "start": "2024-07-01", "tags": ["イベント"] }),
        ]);

        CalendarController::new(Arc::new(events), PageConfig::default(), today)
    }

    #[test]
    fn list_follows_category_and_search() {
        let mut controller = controller(date(2024, 6, 15));

        let all = controller.open_event_list(date(2024, 6, 15));
        assert!(controller.state().list_open);
        assert_eq!(all.len(), 3);

        controller.set_category(EventCategory::Regular);
        let ids: Vec<_> = controller
            .event_list(date(2024, 6, 15))
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, ["nmd", "gsd"]);

        controller.set_search("good");
        let ids: Vec<_> = controller
            .event_list(date(2024, 6, 15))
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, ["gsd"]);
    }

    #[test]
    fn compact_lists_search_titles_only() {
        let mut config = PageConfig::default();
        config.list_detail = ListDetail::Compact;
        let events = event_set(vec![
            json!({ "id": "gsd", "title": "Good Sleep Day", "start": "2024-05-22", "tags": ["GSD"] }),
        ]);
        let mut controller = CalendarController::new(Arc::new(events), config, date(2024, 6, 15));

        controller.set_search("gsd");
        assert!(controller.event_list(date(2024, 6, 15)).is_empty());
    }

    #[test]
    fn detail_from_list_restores_scroll() {
        let mut controller = controller(date(2024, 6, 15));
        controller.open_event_list(date(2024, 6, 15));

        let view = controller.open_detail("gsd", Some(240)).unwrap();
        assert_eq!(view.title, "Good Sleep Day");
        assert_eq!(controller.close_detail(), Restore::EventList { scroll: 240 });

        controller.close_event_list();
        controller.open_detail("nmd", None).unwrap();
        assert_eq!(controller.close_detail(), Restore::Calendar);

        assert!(controller.open_detail("missing", None).is_none());
    }

    #[test]
    fn go_to_month_closes_modals() {
        let mut controller = controller(date(2024, 6, 15));
        controller.open_event_list(date(2024, 6, 15));
        controller.open_detail("ev", Some(10));

        assert_eq!(controller.go_to_month(date(2024, 7, 1)), "2024年7月");
        assert!(!controller.state().list_open);
        assert_eq!(controller.state().detail, None);
    }

    #[test]
    fn navigation_stops_at_floor() {
        let mut controller = controller(date(2023, 8, 10));

        assert!(controller.prev_month());
        assert_eq!(controller.month_label(), "2023年7月");
        assert!(!controller.prev_month());

        controller.next_month();
        controller.dates_set(date(2023, 12, 25));
        assert_eq!(controller.month_label(), "2024年1月");

        controller.today(date(2024, 6, 15));
        assert_eq!(controller.month_label(), "2024年6月");
    }

    #[test]
    fn visibility_filter_is_remembered() {
        let mut controller = controller(date(2024, 6, 15));
        let styles = controller.apply_visibility_filter(VisibilityFilter::Events);

        assert_eq!(controller.state().visibility, VisibilityFilter::Events);
        assert_eq!(styles.iter().filter(|s| !s.style.is_hidden()).count(), 1);
    }
}
