//! Schedule derivation for a single day.
//!
//! A day's schedule is built from two event sources: recurring daily events,
//! which apply to every day, and dated events, which belong to exactly one
//! calendar date. The working window (`work_start..work_end`, whole hours) is
//! swept from start to end; every stretch not claimed by an event becomes a
//! synthesized "Free Time" slot tagged `free`.
//!
//! Per-tag totals look at the whole day instead of the working window. The
//! `off` tag contributes synthesized "Not Working" events covering the hours
//! outside the window (or the whole day on weekends), and free time is what is
//! left of 24 hours once every other tag has been accounted for.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::datetime::is_weekend;
use crate::duration::Duration;
use crate::event::{CalendarEvent, EventDraft, EventId, end_of_day, time_from_minutes};
use crate::tag::{TagKey, TagSet};

pub const DEFAULT_WORK_START: u32 = 8;
pub const DEFAULT_WORK_END: u32 = 18;

/// Working window in whole hours, `start < end <= 23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkHours {
    start: u32,
    end: u32,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_WORK_START,
            end: DEFAULT_WORK_END,
        }
    }
}

impl WorkHours {
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start < end && end <= 23).then_some(Self { start, end })
    }

    pub fn start_hour(&self) -> u32 {
        self.start
    }

    pub fn end_hour(&self) -> u32 {
        self.end
    }

    pub fn start_minutes(&self) -> u32 {
        self.start * 60
    }

    pub fn end_minutes(&self) -> u32 {
        self.end * 60
    }

    pub fn start_time(&self) -> NaiveTime {
        time_from_minutes(self.start_minutes())
    }

    pub fn end_time(&self) -> NaiveTime {
        time_from_minutes(self.end_minutes())
    }
}

/// `[start_minutes, end_minutes)` of the working window and what occupies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSlot {
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub event: CalendarEvent,
}

impl ScheduleSlot {
    pub fn is_free(&self) -> bool {
        self.event.tag.is_free()
    }

    pub fn contains(&self, start_minutes: u32, end_minutes: u32) -> bool {
        self.start_minutes <= start_minutes && self.end_minutes >= end_minutes
    }

    pub fn duration(&self) -> Duration {
        Duration::from_minutes(i64::from(self.end_minutes) - i64::from(self.start_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateEventError {
    #[error("Start time must be before end time.")]
    StartNotBeforeEnd,
    #[error("Free time is derived and cannot be created.")]
    ReservedTag,
    #[error("Unknown tag: {0}")]
    UnknownTag(TagKey),
    #[error("Cannot create overlapping events.")]
    Overlapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteEventError {
    #[error("Cannot delete free time")]
    FreeTime,
    #[error("Cannot delete recurring event: {name}")]
    Recurring { name: String },
    #[error("No schedule slot at index {index}")]
    NoSuchSlot { index: usize },
}

#[derive(Debug, Clone)]
pub struct Calendar {
    tags: TagSet,
    hours: WorkHours,
    recurring: Vec<CalendarEvent>,
    dated: BTreeMap<NaiveDate, Vec<CalendarEvent>>,
}

impl Default for Calendar {
    fn default() -> Self {
        let standup = NaiveTime::from_hms_opt(8, 0, 0)
            .zip(NaiveTime::from_hms_opt(9, 0, 0))
            .map(|(start, end)| CalendarEvent::new("Standup", start, end, TagKey::new("meeting")));
        Self::new(TagSet::default(), WorkHours::default(), standup.into_iter().collect())
    }
}

impl Calendar {
    pub fn new(tags: TagSet, hours: WorkHours, recurring: Vec<CalendarEvent>) -> Self {
        Self {
            tags,
            hours,
            recurring,
            dated: BTreeMap::new(),
        }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn hours(&self) -> WorkHours {
        self.hours
    }

    pub fn recurring_events(&self) -> &[CalendarEvent] {
        &self.recurring
    }

    pub fn events_on(&self, day: NaiveDate) -> &[CalendarEvent] {
        self.dated.get(&day).map(Vec::as_slice).unwrap_or_default()
    }

    /// Days that hold at least one dated event, ascending.
    pub fn dated_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dated.keys().copied()
    }

    /// Recurring and synthesized events of `tag` that apply on `day`.
    #[instrument(skip(self), fields(day = %day, tag = %tag))]
    pub fn daily_events(&self, day: NaiveDate, tag: &TagKey) -> Vec<CalendarEvent> {
        let weekend = is_weekend(day);
        let mut events = Vec::new();

        if tag.is_off() {
            if weekend {
                events.push(CalendarEvent::not_working(NaiveTime::MIN, end_of_day()));
            } else {
                events.push(CalendarEvent::not_working(NaiveTime::MIN, self.hours.start_time()));
                events.push(CalendarEvent::not_working(self.hours.end_time(), end_of_day()));
            }
        }

        if !weekend {
            events.extend(
                self.recurring
                    .iter()
                    .filter(|event| &event.tag == tag)
                    .cloned(),
            );
        }

        debug!(count = events.len(), weekend, "derived daily events");
        events
    }

    /// Time spent on `tag` over the whole of `date`.
    #[instrument(skip(self), fields(date = %date, tag = %tag))]
    pub fn total_time_for_day(&self, date: NaiveDate, tag: &TagKey) -> Duration {
        if tag.is_free() {
            return self.free_time(date);
        }

        let dated = self
            .events_on(date)
            .iter()
            .filter(|event| &event.tag == tag)
            .map(CalendarEvent::duration);
        let daily = self
            .daily_events(date, tag)
            .into_iter()
            .map(|event| event.duration());

        dated.chain(daily).sum()
    }

    /// Whatever is left of 24 hours after every non-free tag.
    #[instrument(skip(self), fields(date = %date))]
    pub fn free_time(&self, date: NaiveDate) -> Duration {
        let claimed: Duration = self
            .tags
            .keys()
            .filter(|key| !key.is_free())
            .map(|key| self.total_time_for_day(date, key))
            .sum();
        Duration::hours(24) - claimed
    }

    /// Working-window schedule for `day`: contiguous, non-overlapping slots
    /// covering exactly `[work_start, work_end)`.
    ///
    /// Events are ordered by start time before the sweep. An event that
    /// starts before the cursor (overlap) or reaches outside the window is
    /// clipped; one that clips to nothing is left out.
    #[instrument(skip(self), fields(day = %day))]
    pub fn schedule(&self, day: NaiveDate) -> Vec<ScheduleSlot> {
        let mut events: Vec<&CalendarEvent> =
            self.recurring.iter().chain(self.events_on(day)).collect();
        events.sort_by_key(|event| event.start_minutes());

        let window_start = self.hours.start_minutes();
        let window_end = self.hours.end_minutes();
        let mut cursor = window_start;
        let mut slots = Vec::with_capacity(events.len() * 2 + 1);

        for event in events {
            let start = event.start_minutes().max(cursor);
            let end = event.end_minutes().min(window_end);

            if end <= start {
                debug!(event = %event.name, "event falls outside the remaining window");
                continue;
            }
            if event.start_minutes() < cursor && cursor > window_start {
                warn!(
                    event = %event.name,
                    start = event.start_minutes(),
                    cursor,
                    "overlapping event clipped"
                );
            }

            if start > cursor {
                slots.push(ScheduleSlot {
                    start_minutes: cursor,
                    end_minutes: start,
                    event: CalendarEvent::free_time(cursor, start),
                });
            }

            slots.push(ScheduleSlot {
                start_minutes: start,
                end_minutes: end,
                event: event.clone(),
            });
            cursor = end;
        }

        if cursor < window_end {
            slots.push(ScheduleSlot {
                start_minutes: cursor,
                end_minutes: window_end,
                event: CalendarEvent::free_time(cursor, window_end),
            });
        }

        debug!(slots = slots.len(), "derived schedule");
        slots
    }

    /// Adds a dated event on `day` if it fits inside one free slot.
    #[instrument(skip(self, draft), fields(day = %day, name = %draft.name, tag = %draft.tag))]
    pub fn create_event(
        &mut self,
        day: NaiveDate,
        draft: EventDraft,
    ) -> Result<EventId, CreateEventError> {
        let start = draft.start_minutes();
        let end = draft.end_minutes();

        if end <= start {
            return Err(CreateEventError::StartNotBeforeEnd);
        }
        if draft.tag.is_free() {
            return Err(CreateEventError::ReservedTag);
        }
        if !self.tags.contains(&draft.tag) {
            return Err(CreateEventError::UnknownTag(draft.tag));
        }

        let fits = self
            .schedule(day)
            .iter()
            .any(|slot| slot.is_free() && slot.contains(start, end));
        if !fits {
            return Err(CreateEventError::Overlapping);
        }

        let event = draft.into_event();
        let id = event.id;
        debug!(id = %id, start, end, "inserting dated event");
        self.dated.entry(day).or_default().push(event);
        Ok(id)
    }

    /// Removes the dated event shown at `slot_index` of `day`'s schedule.
    #[instrument(skip(self), fields(day = %day))]
    pub fn delete_event(
        &mut self,
        day: NaiveDate,
        slot_index: usize,
    ) -> Result<CalendarEvent, DeleteEventError> {
        let schedule = self.schedule(day);
        let slot = schedule
            .get(slot_index)
            .ok_or(DeleteEventError::NoSuchSlot { index: slot_index })?;

        if slot.is_free() {
            return Err(DeleteEventError::FreeTime);
        }

        let id = slot.event.id;
        let Some(events) = self.dated.get_mut(&day) else {
            return Err(DeleteEventError::Recurring {
                name: slot.event.name.clone(),
            });
        };
        let Some(pos) = events.iter().position(|event| event.id == id) else {
            return Err(DeleteEventError::Recurring {
                name: slot.event.name.clone(),
            });
        };

        let removed = events.remove(pos);
        if events.is_empty() {
            self.dated.remove(&day);
        }
        debug!(id = %removed.id, name = %removed.name, "removed dated event");
        Ok(removed)
    }
}
