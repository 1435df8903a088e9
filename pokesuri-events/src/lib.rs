mod config;
mod controller;
mod loader;
mod model;
mod normalize;

pub mod listing;
pub mod render;

#[cfg(feature = "ics")]
mod ics;

pub use config::{ListDetail, PageConfig, Variant, DATE_FLOOR};
pub use controller::{CalendarController, Restore, UiState};
pub use listing::{EventCategory, UnknownValue, VisibilityFilter};
pub use loader::{
    load_event_set, load_records, load_unofficial_links, try_load_records, LoadError, Source,
};
pub use model::{
    CalendarEntry, DisplayEvent, EventSet, EventTime, UnofficialLink, UnofficialLinks,
    DEFAULT_COLOR, SITE_OFFSET,
};
pub use normalize::{normalize_record, normalize_records};
