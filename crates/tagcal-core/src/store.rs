use anyhow::anyhow;
use chrono::{NaiveDate, TimeDelta};
use tracing::{debug, info, instrument};

use crate::duration::Duration;
use crate::event::{CalendarEvent, EventDraft, EventId};
use crate::notify::{DELETE_ICON, Notice, Notifier, Severity};
use crate::schedule::{Calendar, CreateEventError, DeleteEventError, ScheduleSlot};
use crate::tag::{Tag, TagKey};

/// What the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub day: NaiveDate,
    pub tag: TagKey,
    pub slot: usize,
}

/// Holds the calendar plus UI selection and threads the selection through
/// the calendar's operations.
#[derive(Debug)]
pub struct CalendarStore<N: Notifier> {
    calendar: Calendar,
    today: NaiveDate,
    selection: Selection,
    notifier: N,
}

impl<N: Notifier> CalendarStore<N> {
    pub fn new(calendar: Calendar, today: NaiveDate, notifier: N) -> Self {
        Self {
            calendar,
            today,
            selection: Selection {
                day: today,
                tag: TagKey::free(),
                slot: 0,
            },
            notifier,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    #[instrument(skip(self), fields(day = %day))]
    pub fn select_day(&mut self, day: NaiveDate) {
        self.selection.day = day;
        self.clamp_slot();
    }

    pub fn shift_day(&mut self, days: i64) -> anyhow::Result<()> {
        let day = self
            .selection
            .day
            .checked_add_signed(TimeDelta::days(days))
            .ok_or_else(|| anyhow!("date out of range: {} {days:+} days", self.selection.day))?;
        self.select_day(day);
        Ok(())
    }

    #[instrument(skip(self), fields(tag = %tag))]
    pub fn select_tag(&mut self, tag: TagKey) -> anyhow::Result<()> {
        if !self.calendar.tags().contains(&tag) {
            return Err(anyhow!("unknown tag: {tag}"));
        }
        self.selection.tag = tag;
        Ok(())
    }

    /// Selects `index`, clamped to the current schedule. Returns the index in effect.
    pub fn select_slot(&mut self, index: usize) -> usize {
        self.selection.slot = index;
        self.clamp_slot();
        self.selection.slot
    }

    pub fn enabled_tag(&self) -> Tag {
        self.calendar.tags().get_or_unknown(&self.selection.tag)
    }

    pub fn schedule(&self) -> Vec<ScheduleSlot> {
        self.calendar.schedule(self.selection.day)
    }

    pub fn selected_item(&self) -> Option<ScheduleSlot> {
        self.schedule().into_iter().nth(self.selection.slot)
    }

    pub fn daily_events(&self) -> Vec<CalendarEvent> {
        self.calendar
            .daily_events(self.selection.day, &self.selection.tag)
    }

    pub fn total_time(&self) -> Duration {
        self.calendar
            .total_time_for_day(self.selection.day, &self.selection.tag)
    }

    pub fn total_time_for(&self, tag: &TagKey) -> Duration {
        self.calendar.total_time_for_day(self.selection.day, tag)
    }

    pub fn free_time(&self) -> Duration {
        self.calendar.free_time(self.selection.day)
    }

    #[instrument(skip(self, draft), fields(day = %self.selection.day, name = %draft.name))]
    pub fn create_event(&mut self, draft: EventDraft) -> Result<EventId, CreateEventError> {
        let result = self.calendar.create_event(self.selection.day, draft);
        match &result {
            Ok(id) => info!(id = %id, "created event"),
            Err(err) => debug!(error = %err, "create rejected"),
        }
        result
    }

    /// Deletes the selected slot's event and reports the outcome to the notifier.
    #[instrument(skip(self), fields(day = %self.selection.day, slot = self.selection.slot))]
    pub fn delete_selected(&mut self) -> Result<CalendarEvent, DeleteEventError> {
        let result = self
            .calendar
            .delete_event(self.selection.day, self.selection.slot);

        let notice = match &result {
            Ok(removed) => {
                if self.selection.slot >= self.schedule().len() {
                    self.selection.slot = self.selection.slot.saturating_sub(1);
                }
                Notice::new(
                    "Deleted event",
                    format!("Deleted event {}", removed.name),
                    Severity::Success,
                    DELETE_ICON,
                )
            }
            Err(err) => Notice::new(
                "Cannot delete event",
                err.to_string(),
                Severity::Error,
                DELETE_ICON,
            ),
        };
        self.notifier.notify(notice);
        result
    }

    fn clamp_slot(&mut self) {
        let len = self.schedule().len();
        if self.selection.slot >= len {
            self.selection.slot = len.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::notify::NoticeQueue;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn store() -> CalendarStore<NoticeQueue> {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        CalendarStore::new(Calendar::default(), monday, NoticeQueue::new())
    }

    #[test]
    fn starts_on_today_with_free_tag() {
        let store = store();
        assert_eq!(store.selection().day, store.today());
        assert_eq!(store.enabled_tag().name, "free");
        assert_eq!(store.total_time(), store.free_time());
        assert_eq!(
            store.selected_item().map(|slot| slot.event.name),
            Some("Standup".to_string())
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut store = store();
        assert!(store.select_tag(TagKey::new("gym")).is_err());
        assert!(store.selection().tag.is_free());

        store.select_tag(TagKey::new("meeting")).expect("known tag");
        assert_eq!(store.total_time(), Duration::hours(1));
        assert_eq!(store.daily_events().len(), 1);
    }

    #[test]
    fn delete_free_time_notifies_and_keeps_state() {
        let mut store = store();
        store.select_slot(1);

        assert_eq!(store.delete_selected(), Err(DeleteEventError::FreeTime));
        let notices = store.notifier_mut().drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Cannot delete event");
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(notices[0].icon, "mdi:delete");
        assert_eq!(store.calendar().dated_days().count(), 0);
    }

    #[test]
    fn delete_recurring_notifies_with_name() {
        let mut store = store();
        store.select_slot(0);

        assert!(store.delete_selected().is_err());
        assert_eq!(
            store.notifier().pending()[0].description,
            "Cannot delete recurring event: Standup"
        );
        assert_eq!(store.schedule().len(), 2);
    }

    #[test]
    fn delete_last_slot_moves_selection_back() {
        let mut store = store();
        store
            .create_event(EventDraft::new("Wrap-up", t(17, 0), t(18, 0), TagKey::new("meeting")))
            .expect("fits");
        assert_eq!(store.schedule().len(), 3);

        assert_eq!(store.select_slot(2), 2);
        let removed = store.delete_selected().expect("dated event");
        assert_eq!(removed.name, "Wrap-up");
        assert_eq!(store.schedule().len(), 2);
        assert_eq!(store.selection().slot, 1);

        let notice = &store.notifier().pending()[0];
        assert_eq!(notice.title, "Deleted event");
        assert_eq!(notice.description, "Deleted event Wrap-up");
        assert_eq!(notice.severity, Severity::Success);
    }

    #[test]
    fn delete_middle_slot_keeps_selection() {
        let mut store = store();
        store
            .create_event(EventDraft::new("Review", t(10, 0), t(11, 0), TagKey::new("meeting")))
            .expect("fits");
        assert_eq!(store.schedule().len(), 4);

        store.select_slot(2);
        store.delete_selected().expect("dated event");
        assert_eq!(store.schedule().len(), 2);
        assert_eq!(store.selection().slot, 1);

        store
            .create_event(EventDraft::new("Review", t(10, 0), t(11, 0), TagKey::new("meeting")))
            .expect("fits again");
        store
            .create_event(EventDraft::new("Sync", t(14, 0), t(15, 0), TagKey::new("meeting")))
            .expect("fits");
        store.select_slot(2);
        store.delete_selected().expect("dated event");
        assert_eq!(store.selection().slot, 2);
    }

    #[test]
    fn switching_day_clamps_selection() {
        let mut store = store();
        store
            .create_event(EventDraft::new("Review", t(10, 0), t(11, 0), TagKey::new("meeting")))
            .expect("fits");
        store.select_slot(3);

        store.shift_day(1).expect("valid day");
        assert_eq!(store.selection().slot, 1);
        assert_eq!(store.select_slot(99), 1);
    }
}
