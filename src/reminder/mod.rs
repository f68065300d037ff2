use thiserror::Error;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, Time, UtcOffset};

use crate::store::ItemId;

mod scheduler;

pub use scheduler::{ChannelNotifier, Notifier, ReminderScheduler};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    #[error("cannot read {0:?} as a time of day (expected HH:MM)")]
    AmbiguousTime(String),
}

/// A one-shot notification due for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub item_id: ItemId,
    pub text: String,
    pub fire_at: OffsetDateTime,
}

impl Reminder {
    pub fn time_label(&self) -> String {
        self.fire_at
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_else(|_| self.fire_at.to_string())
    }
}

/// Wall clock pinned to the UTC offset detected at start-up. The offset has
/// to be read before any other thread exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    offset: UtcOffset,
}

impl LocalClock {
    pub fn detect() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or_else(|err| {
            tracing::warn!(%err, "local UTC offset unavailable, reminders use UTC");
            UtcOffset::UTC
        });
        Self { offset }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    /// Shows `at` on this clock's wall time.
    pub fn localize(&self, at: OffsetDateTime) -> OffsetDateTime {
        at.to_offset(self.offset)
    }
}

/// Accepts a 24-hour `H:MM` or `HH:MM`.
pub fn parse_time_of_day(input: &str) -> Result<Time, ReminderError> {
    let ambiguous = || ReminderError::AmbiguousTime(input.to_string());
    let (hour, minute) = input.trim().split_once(':').ok_or_else(ambiguous)?;
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return Err(ambiguous());
    }
    let hour: u8 = hour.parse().map_err(|_| ambiguous())?;
    let minute: u8 = minute.parse().map_err(|_| ambiguous())?;
    Time::from_hms(hour, minute, 0).map_err(|_| ambiguous())
}

/// The next instant showing `at` on the clock: today if still ahead of
/// `now`, otherwise tomorrow.
pub fn next_occurrence(now: OffsetDateTime, at: Time) -> OffsetDateTime {
    let today = now.replace_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
