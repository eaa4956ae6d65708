//! Conversions between slider positions, minutes, milliseconds and the
//! `dd-mm-yyyy` keys the duration ledger is indexed by.

use chrono::{Local, NaiveDate};

pub const DATE_KEY_FORMAT: &str = "%d-%m-%Y";

const MS_PER_MINUTE: u64 = 60_000;

/// Maps a settings slider position to whole minutes.
pub fn float_to_time(position: f32, minutes_per_step: f32) -> u64 {
    let minutes = (position * minutes_per_step).round();
    if minutes.is_finite() && minutes > 0.0 {
        minutes as u64
    } else {
        0
    }
}

pub fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(MS_PER_MINUTE)
}

/// Rounds to the nearest minute, halves rounding up.
pub fn ms_to_minutes(ms: u64) -> i64 {
    (ms.saturating_add(MS_PER_MINUTE / 2) / MS_PER_MINUTE) as i64
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_key() -> String {
    date_key(today())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_positions_scale_by_step() {
        assert_eq!(float_to_time(1.0, 5.0), 5);
        assert_eq!(float_to_time(10.0, 5.0), 50);
        assert_eq!(float_to_time(4.6, 5.0), 23);
        assert_eq!(float_to_time(f32::NAN, 5.0), 0);
        assert_eq!(float_to_time(-3.0, 5.0), 0);
    }

    #[test]
    fn minutes_round_to_nearest() {
        assert_eq!(ms_to_minutes(0), 0);
        assert_eq!(ms_to_minutes(29_999), 0);
        assert_eq!(ms_to_minutes(30_000), 1);
        assert_eq!(ms_to_minutes(minutes_to_ms(25)), 25);
    }

    #[test]
    fn date_keys_are_day_first() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_key(date), "07-03-2024");
    }
}
