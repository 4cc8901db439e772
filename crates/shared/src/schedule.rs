use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

use crate::error::{Result, ScoutError};

/// A fixed weekly trigger in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            day: Weekday::Mon,
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl WeeklySchedule {
    /// Parse `SCHEDULE_DAY` (e.g. "monday", "Mon") and `SCHEDULE_TIME` ("HH:MM")
    pub fn parse(day: &str, time: &str) -> Result<Self> {
        let day = day.trim().parse::<Weekday>().map_err(|_| {
            ScoutError::Configuration(format!("Unrecognised schedule day: {day:?}"))
        })?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| {
            ScoutError::Configuration(format!("Schedule time must be HH:MM, got {time:?}"))
        })?;

        Ok(Self { day, time })
    }

    /// First instant strictly after `now` that falls on `day` at `time`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let current_day = now.weekday().num_days_from_monday();
        let target_day = self.day.num_days_from_monday();

        let days_until_target = if current_day == target_day {
            // Trigger day: once the trigger time is reached, wait a full week
            if now.time() >= self.time {
                7
            } else {
                0
            }
        } else if current_day < target_day {
            target_day - current_day
        } else {
            7 - (current_day - target_day)
        };

        (now.date() + Duration::days(days_until_target as i64)).and_time(self.time)
    }
}

impl std::fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "every {} at {}", self.day, self.time.format("%H:%M"))
    }
}
