use crate::domain::models::{Activity, TimeOfDay};
use chrono::{Datelike, NaiveDate};

pub const SLEEP: &str = "Sleep";
pub const COLLEGE: &str = "College";
pub const DHOBI_G: &str = "Dhobi-G";

/// Fixed blocks for `date`, in display order. Depends only on the weekday.
pub fn fixed_commitments(date: NaiveDate) -> Vec<Activity> {
    // 0 = Sunday .. 6 = Saturday
    let day = date.weekday().num_days_from_sunday();
    let is_weekday = (1..=5).contains(&day);

    let mut commitments = vec![Activity::fixed(
        SLEEP,
        TimeOfDay::MIDNIGHT,
        TimeOfDay::hm(5, 0),
        5.0,
    )];

    if is_weekday {
        commitments.push(Activity::fixed(
            COLLEGE,
            TimeOfDay::hm(7, 30),
            TimeOfDay::hm(14, 0),
            6.5,
        ));
        // always true on a weekday
        if day != 0 {
            commitments.push(Activity::fixed(
                DHOBI_G,
                TimeOfDay::hm(16, 0),
                TimeOfDay::hm(19, 0),
                3.0,
            ));
        }
    }

    commitments
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday().num_days_from_sunday(), 0 | 6)
}
