use chrono::{Duration, Utc};
use ics::{
    components::Parameter,
    escape_text,
    properties::{Categories, Description, DtEnd, DtStart, Summary, TzName, URL},
    Standard, TimeZone,
};

use crate::{
    model::{DisplayEvent, EventSet, EventTime},
    render::widget_end,
};

const TZID: &str = "Asia/Tokyo";

impl EventSet {
    /// Exports the display events as an iCalendar document.
    #[must_use]
    pub fn to_ics<'a>(&'a self, name: &'a str) -> ics::ICalendar<'a> {
        let mut jst = Standard::new("19700101T000000", "+0900", "+0900");
        jst.push(TzName::new("JST"));

        let mut icalendar = ics::ICalendar::new("2.0", name);
        icalendar.add_timezone(TimeZone::standard(TZID, jst));

        for event in self.events() {
            icalendar.add_event(event.to_ics());
        }

        icalendar
    }
}

impl DisplayEvent {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let mut dtstart = if self.all_day {
            let mut dtstart = DtStart::new(self.start.date().format("%Y%m%d").to_string());
            dtstart.add(Parameter::new("VALUE", "DATE"));
            dtstart
        } else {
            DtStart::new(ics_time(&self.start))
        };

        let end = if self.all_day {
            let end = widget_end(self)
                .map(|end| end.date())
                .unwrap_or_else(|| self.start.date() + Duration::days(1));
            let mut dtend = DtEnd::new(end.format("%Y%m%d").to_string());
            dtend.add(Parameter::new("VALUE", "DATE"));
            Some(dtend)
        } else {
            self.end.map(|end| {
                let mut dtend = DtEnd::new(ics_time(&end));
                if matches!(end, EventTime::Local(_)) {
                    dtend.add(Parameter::new("TZID", TZID));
                }
                dtend
            })
        };

        if matches!(self.start, EventTime::Local(_)) && !self.all_day {
            dtstart.add(Parameter::new("TZID", TZID));
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let mut ics_event = ics::Event::new(self.id.as_str(), stamp);

        ics_event.push(dtstart);
        if let Some(dtend) = end {
            ics_event.push(dtend);
        }
        ics_event.push(Summary::new(escape_text(self.title.as_str())));

        if !self.description.is_empty() {
            ics_event.push(Description::new(escape_text(self.description.as_str())));
        }

        if !self.tags.is_empty() {
            let tags: Vec<_> = self.tags.iter().map(|tag| escape_text(tag.as_str())).collect();
            ics_event.push(Categories::new(tags.join(",")));
        }

        if let Some(link) = &self.link {
            ics_event.push(URL::new(link.as_str()));
        }

        ics_event
    }
}

/// Local times are written floating with a TZID, zoned times in UTC.
fn ics_time(time: &EventTime) -> String {
    match time {
        EventTime::Date(date) => date.format("%Y%m%dT000000").to_string(),
        EventTime::Local(datetime) => datetime.format("%Y%m%dT%H%M%S").to_string(),
        EventTime::Zoned(datetime) => datetime
            .with_timezone(&Utc)
            .format("%Y%m%dT%H%M%SZ")
            .to_string(),
    }
}
