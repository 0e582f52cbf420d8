use crate::domain::models::TimeOfDay;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock for the single user's day.
#[derive(Clone)]
pub struct Clock {
    now_provider: NowProvider,
    timezone: Option<Tz>,
}

impl Clock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self {
            now_provider: Arc::new(Utc::now),
            timezone,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn local_now(&self) -> NaiveDateTime {
        let now = self.now_utc();
        match self.timezone {
            Some(timezone) => now.with_timezone(&timezone).naive_local(),
            None => now.with_timezone(&Local).naive_local(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_naive_time(self.local_now().time())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn configured_zone_shifts_day_and_time() {
        let instant = fixed_time("2026-02-15T20:00:00Z");
        let clock = Clock::new(Some(chrono_tz::Asia::Kolkata))
            .with_now_provider(Arc::new(move || instant));

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date"));
        assert_eq!(clock.time_of_day().to_string(), "01:30");
    }

    #[test]
    fn utc_zone_uses_instant_as_is() {
        let instant = fixed_time("2026-02-16T09:30:45Z");
        let clock = Clock::new(Some(chrono_tz::UTC)).with_now_provider(Arc::new(move || instant));
        assert_eq!(clock.time_of_day().to_string(), "09:30");
        assert_eq!(clock.now_utc(), instant);
    }
}
