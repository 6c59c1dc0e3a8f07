use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::Duration;
use crate::tag::TagKey;

pub const FREE_TIME_NAME: &str = "Free Time";
pub const NOT_WORKING_NAME: &str = "Not Working";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Id shared by every synthesized slot; never stored in the calendar.
    pub fn synthesized() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_synthesized(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tag: TagKey,
}

/// User input for a new dated event; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tag: TagKey,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, start: NaiveTime, end: NaiveTime, tag: TagKey) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            tag,
        }
    }

    pub fn start_minutes(&self) -> u32 {
        minutes_of_day(self.start)
    }

    pub fn end_minutes(&self) -> u32 {
        minutes_of_day(self.end)
    }

    pub fn into_event(self) -> CalendarEvent {
        CalendarEvent {
            id: EventId::new(),
            name: self.name,
            start: self.start,
            end: self.end,
            tag: self.tag,
        }
    }
}

impl CalendarEvent {
    pub fn new(name: impl Into<String>, start: NaiveTime, end: NaiveTime, tag: TagKey) -> Self {
        EventDraft::new(name, start, end, tag).into_event()
    }

    pub fn free_time(start_minutes: u32, end_minutes: u32) -> Self {
        Self {
            id: EventId::synthesized(),
            name: FREE_TIME_NAME.to_string(),
            start: time_from_minutes(start_minutes),
            end: time_from_minutes(end_minutes),
            tag: TagKey::free(),
        }
    }

    pub fn not_working(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            id: EventId::synthesized(),
            name: NOT_WORKING_NAME.to_string(),
            start,
            end,
            tag: TagKey::off(),
        }
    }

    pub fn start_minutes(&self) -> u32 {
        minutes_of_day(self.start)
    }

    pub fn end_minutes(&self) -> u32 {
        minutes_of_day(self.end)
    }

    pub fn duration(&self) -> Duration {
        Duration::nearest_minute(self.end, self.start)
    }
}

/// Minutes since midnight, seconds truncated.
pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Inverse of [`minutes_of_day`]; values past the end of the day saturate to 23:59:59.
pub fn time_from_minutes(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or_else(end_of_day)
}

pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}
