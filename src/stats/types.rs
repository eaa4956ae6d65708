use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// Days covered, today included.
    pub fn days(&self) -> i64 {
        match self {
            Period::Day => 1,
            Period::Week => 7,
            Period::Month => 30,
        }
    }
}

/// Headline numbers for the summary screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub today_rounds: i64,
    pub today_focus_minutes: i64,
    /// Today minus yesterday; negative when yesterday was better.
    pub rounds_vs_yesterday: i64,
    pub focus_minutes_vs_yesterday: i64,
    pub total_rounds: i64,
    pub total_focus_minutes: i64,
    pub total_rest_minutes: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub focus_minutes: i64,
    pub rest_minutes: i64,
}

impl PeriodTotals {
    /// Share of focus time in `[0, 1]`; 0 when nothing was recorded.
    pub fn focus_share(&self) -> f64 {
        let total = self.focus_minutes + self.rest_minutes;
        if total <= 0 {
            0.0
        } else {
            self.focus_minutes as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayPoint {
    pub date: String,
    pub label: &'static str,
    pub focus_minutes: i64,
    pub rest_minutes: i64,
}
