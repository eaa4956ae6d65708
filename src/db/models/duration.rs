//! Per-day accumulated focus and rest time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::helpers::parse_date_key;

/// One row of the ledger. `date` is the `dd-mm-yyyy` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationRecord {
    pub date: String,
    pub focus_recorded_duration: i64,
    pub rest_recorded_duration: i64,
    pub recorded_rounds: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DurationRecord {
    pub fn new(date: impl Into<String>, delta: DurationDelta) -> Self {
        Self {
            date: date.into(),
            focus_recorded_duration: delta.focus_minutes,
            rest_recorded_duration: delta.rest_minutes,
            recorded_rounds: delta.rounds,
            updated_at: None,
        }
    }

    pub fn day(&self) -> Option<NaiveDate> {
        parse_date_key(&self.date).ok()
    }
}

/// Amounts added to a day's record when a phase completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationDelta {
    pub focus_minutes: i64,
    pub rest_minutes: i64,
    pub rounds: i64,
}

impl DurationDelta {
    pub fn focus(minutes: i64) -> Self {
        Self {
            focus_minutes: minutes,
            rest_minutes: 0,
            rounds: 1,
        }
    }

    pub fn rest(minutes: i64) -> Self {
        Self {
            focus_minutes: 0,
            rest_minutes: minutes,
            rounds: 0,
        }
    }
}
