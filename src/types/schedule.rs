//! Daily irrigation schedule, the terminal artifact of a run.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One day of the schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleDay {
    pub date: NaiveDate,
    /// Irrigation depth applied on this day (mm).
    pub irr_day: f64,
}

/// CSV row layout: `Year, Month, Day, IrrDay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Day")]
    pub day: u32,
    #[serde(rename = "IrrDay")]
    pub irr_day: f64,
}

impl From<&ScheduleDay> for ScheduleRecord {
    fn from(d: &ScheduleDay) -> Self {
        Self {
            year: d.date.year(),
            month: d.date.month(),
            day: d.date.day(),
            irr_day: d.irr_day,
        }
    }
}

/// Calendar-indexed irrigation depths covering `start..=end`.
///
/// Always holds exactly one entry per calendar day of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct IrrigationSchedule {
    days: Vec<ScheduleDay>,
}

impl IrrigationSchedule {
    /// All-zero schedule for the inclusive window. Empty if `end < start`.
    pub fn zeroed(start: NaiveDate, end: NaiveDate) -> Self {
        let days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| ScheduleDay { date, irr_day: 0.0 })
            .collect();
        Self { days }
    }

    /// Align a simulator's daily series to the window by position.
    ///
    /// Only the first `min(series.len(), window_days)` days are taken from
    /// `series`; any day beyond that, or any non-finite value, stays at zero.
    pub fn from_series(start: NaiveDate, end: NaiveDate, series: &[f64]) -> Self {
        let mut schedule = Self::zeroed(start, end);
        for (day, &value) in schedule.days.iter_mut().zip(series) {
            if value.is_finite() {
                day.irr_day = value;
            }
        }
        schedule
    }

    pub fn days(&self) -> &[ScheduleDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total irrigation over the window (mm).
    pub fn total_mm(&self) -> f64 {
        self.days.iter().map(|d| d.irr_day).sum()
    }

    /// Number of days with a non-zero application.
    pub fn irrigation_events(&self) -> usize {
        self.days.iter().filter(|d| d.irr_day > 0.0).count()
    }

    pub fn records(&self) -> impl Iterator<Item = ScheduleRecord> + '_ {
        self.days.iter().map(ScheduleRecord::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zeroed_length_matches_calendar() {
        let s = IrrigationSchedule::zeroed(ymd(2024, 2, 27), ymd(2024, 3, 2));
        assert_eq!(s.len(), 5); // 27, 28, 29, 1, 2
        assert!(s.days().iter().all(|d| d.irr_day == 0.0));
    }

    #[test]
    fn test_short_series_pads_with_zero() {
        let s = IrrigationSchedule::from_series(ymd(2025, 1, 1), ymd(2025, 1, 10), &[5.0, 0.0, 12.5]);
        assert_eq!(s.len(), 10);
        assert_eq!(s.days()[0].irr_day, 5.0);
        assert_eq!(s.days()[2].irr_day, 12.5);
        assert!(s.days()[3..].iter().all(|d| d.irr_day == 0.0));
        assert_eq!(s.irrigation_events(), 2);
        assert_eq!(s.total_mm(), 17.5);
    }

    #[test]
    fn test_long_series_is_truncated() {
        let series = vec![1.0; 40];
        let s = IrrigationSchedule::from_series(ymd(2025, 1, 1), ymd(2025, 1, 31), &series);
        assert_eq!(s.len(), 31);
        assert_eq!(s.days().last().unwrap().date, ymd(2025, 1, 31));
    }

    #[test]
    fn test_non_finite_values_stay_zero() {
        let s = IrrigationSchedule::from_series(ymd(2025, 1, 1), ymd(2025, 1, 3), &[f64::NAN, 3.0]);
        assert_eq!(s.days()[0].irr_day, 0.0);
        assert_eq!(s.days()[1].irr_day, 3.0);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let s = IrrigationSchedule::zeroed(ymd(2025, 2, 1), ymd(2025, 1, 1));
        assert!(s.is_empty());
    }

    #[test]
    fn test_records_split_date() {
        let s = IrrigationSchedule::from_series(ymd(2025, 12, 31), ymd(2026, 1, 1), &[0.0, 7.0]);
        let records: Vec<_> = s.records().collect();
        assert_eq!(records[1], ScheduleRecord { year: 2026, month: 1, day: 1, irr_day: 7.0 });
    }
}
