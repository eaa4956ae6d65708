//! Summaries computed from ledger records. Everything here is pure; callers
//! load the records with `Database::list_durations` first.

mod types;

pub use types::{DailySummary, DayPoint, Period, PeriodTotals};

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::{db::DurationRecord, utils::time::date_key};

pub fn daily_summary(records: &[DurationRecord], today: NaiveDate) -> DailySummary {
    let by_day = index_by_day(records);
    let (today_focus, _, today_rounds) = totals_on(&by_day, today);
    let (yesterday_focus, _, yesterday_rounds) = totals_on(&by_day, today - Duration::days(1));

    let mut summary = DailySummary {
        today_rounds,
        today_focus_minutes: today_focus,
        rounds_vs_yesterday: today_rounds - yesterday_rounds,
        focus_minutes_vs_yesterday: today_focus - yesterday_focus,
        ..DailySummary::default()
    };
    for record in records {
        summary.total_rounds += record.recorded_rounds;
        summary.total_focus_minutes += record.focus_recorded_duration;
        summary.total_rest_minutes += record.rest_recorded_duration;
    }
    summary
}

/// Focus and rest minutes over the period ending `today`.
pub fn period_totals(records: &[DurationRecord], period: Period, today: NaiveDate) -> PeriodTotals {
    daily_series(records, period, today)
        .into_iter()
        .fold(PeriodTotals::default(), |mut acc, point| {
            acc.focus_minutes += point.focus_minutes;
            acc.rest_minutes += point.rest_minutes;
            acc
        })
}

/// One point per day of the period, oldest first. Missing days are zero.
pub fn daily_series(records: &[DurationRecord], period: Period, today: NaiveDate) -> Vec<DayPoint> {
    let by_day = index_by_day(records);
    let first = today - Duration::days(period.days() - 1);

    first
        .iter_days()
        .take(period.days() as usize)
        .map(|day| {
            let (focus, rest, _) = totals_on(&by_day, day);
            DayPoint {
                date: date_key(day),
                label: weekday_label(day.weekday()),
                focus_minutes: focus,
                rest_minutes: rest,
            }
        })
        .collect()
}

/// `73` -> `"1h13m"`. Negative values keep their sign.
pub fn format_hours_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    format!("{sign}{}h{}m", minutes / 60, minutes % 60)
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

// Records with an unparseable key are skipped.
fn index_by_day(records: &[DurationRecord]) -> HashMap<NaiveDate, &DurationRecord> {
    records
        .iter()
        .filter_map(|record| record.day().map(|day| (day, record)))
        .collect()
}

fn totals_on(by_day: &HashMap<NaiveDate, &DurationRecord>, day: NaiveDate) -> (i64, i64, i64) {
    by_day
        .get(&day)
        .map(|r| {
            (
                r.focus_recorded_duration,
                r.rest_recorded_duration,
                r.recorded_rounds,
            )
        })
        .unwrap_or((0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, focus: i64, rest: i64, rounds: i64) -> DurationRecord {
        DurationRecord {
            date: date.to_string(),
            focus_recorded_duration: focus,
            rest_recorded_duration: rest,
            recorded_rounds: rounds,
            updated_at: None,
        }
    }

    fn day(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger() -> Vec<DurationRecord> {
        vec![
            record("10-06-2024", 50, 10, 2),
            record("11-06-2024", 25, 5, 1),
            record("12-06-2024", 75, 10, 3),
            record("01-05-2024", 100, 20, 4),
            record("garbage", 999, 999, 999),
        ]
    }

    #[test]
    fn summary_compares_today_with_yesterday() {
        let summary = daily_summary(&ledger(), day(12, 6, 2024));

        assert_eq!(summary.today_rounds, 3);
        assert_eq!(summary.today_focus_minutes, 75);
        assert_eq!(summary.rounds_vs_yesterday, 2);
        assert_eq!(summary.focus_minutes_vs_yesterday, 50);
    }

    #[test]
    fn lifetime_totals_include_every_record() {
        let records = ledger()[..4].to_vec();
        let summary = daily_summary(&records, day(12, 6, 2024));

        assert_eq!(summary.total_rounds, 10);
        assert_eq!(summary.total_focus_minutes, 250);
        assert_eq!(summary.total_rest_minutes, 45);
    }

    #[test]
    fn an_empty_day_is_all_zero() {
        let summary = daily_summary(&ledger(), day(20, 6, 2024));
        assert_eq!(summary.today_rounds, 0);
        assert_eq!(summary.rounds_vs_yesterday, 0);
    }

    #[test]
    fn period_totals_only_cover_the_window() {
        let today = day(12, 6, 2024);
        let records = ledger();

        assert_eq!(
            period_totals(&records, Period::Day, today),
            PeriodTotals {
                focus_minutes: 75,
                rest_minutes: 10
            }
        );
        assert_eq!(
            period_totals(&records, Period::Week, today),
            PeriodTotals {
                focus_minutes: 150,
                rest_minutes: 25
            }
        );
        assert_eq!(period_totals(&records, Period::Month, today).focus_minutes, 150);
        assert_eq!(period_totals(&records, Period::Month, day(30, 5, 2024)).focus_minutes, 100);
    }

    #[test]
    fn focus_share_handles_empty_periods() {
        assert_eq!(PeriodTotals::default().focus_share(), 0.0);
        let totals = PeriodTotals {
            focus_minutes: 75,
            rest_minutes: 25,
        };
        assert!((totals.focus_share() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn weekly_series_is_oldest_first_with_gaps_filled() {
        let series = daily_series(&ledger(), Period::Week, day(12, 6, 2024));

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, "06-06-2024");
        assert_eq!(series[0].label, "thu");
        assert_eq!(series[0].focus_minutes, 0);
        assert_eq!(series[6].date, "12-06-2024");
        assert_eq!(series[6].label, "wed");
        assert_eq!(series[6].focus_minutes, 75);
        assert_eq!(series[4].label, "mon");
        assert_eq!(series[4].rest_minutes, 10);
    }

    #[test]
    fn month_series_crosses_month_boundaries() {
        let series = daily_series(&ledger(), Period::Month, day(12, 6, 2024));
        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, "14-05-2024");
    }

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(format_hours_minutes(13), "0h13m");
        assert_eq!(format_hours_minutes(125), "2h5m");
        assert_eq!(format_hours_minutes(0), "0h0m");
        assert_eq!(format_hours_minutes(-13), "-0h13m");
    }
}
