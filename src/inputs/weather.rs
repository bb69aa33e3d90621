//! Climate series in the crop model's whitespace-delimited text layout.
//!
//! ```text
//!    Day  Month  Year  MinTemp  MaxTemp  Precipitation  ReferenceET
//! 0    1      1  2025     4.10    12.30           0.00         1.21
//! 1    2      1  2025     3.80    11.90           2.40         1.05
//! ```
//!
//! The leading row-index column written by the provider is optional: a data
//! row with one more field than the header has its first field dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use super::InputError;

/// Columns the crop model requires, in canonical order.
pub const WEATHER_COLUMNS: [&str; 7] = [
    "Day",
    "Month",
    "Year",
    "MinTemp",
    "MaxTemp",
    "Precipitation",
    "ReferenceET",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherDay {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub precipitation: f64,
    pub reference_et: f64,
}

/// Parsed daily climate series, in file order.
#[derive(Debug, Clone)]
pub struct WeatherSeries {
    pub path: PathBuf,
    pub days: Vec<WeatherDay>,
}

impl WeatherSeries {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }

    /// True when the series starts on/before `start` and ends on/after `end`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => first <= start && last >= end,
            _ => false,
        }
    }

    pub fn total_precipitation(&self) -> f64 {
        self.days.iter().map(|d| d.precipitation).sum()
    }
}

/// Parse a climate file.
pub fn read_weather(path: &Path) -> Result<WeatherSeries, InputError> {
    let io_err = |source| InputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut lines = reader.lines().enumerate();
    let header: Vec<String> = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line.map_err(io_err)?;
                if !line.trim().is_empty() {
                    break line.split_whitespace().map(str::to_string).collect();
                }
            }
            None => {
                return Err(InputError::EmptyWeather {
                    path: path.to_path_buf(),
                })
            }
        }
    };

    let mut index = [0usize; WEATHER_COLUMNS.len()];
    for (slot, column) in index.iter_mut().zip(WEATHER_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h == column)
            .ok_or(InputError::WeatherColumn {
                path: path.to_path_buf(),
                column,
            })?;
    }

    let mut days = Vec::new();
    for (i, line) in lines {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        let row_err = |message: String| InputError::WeatherRow {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };

        let mut fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() == header.len() + 1 {
            fields.remove(0);
        }
        if fields.len() != header.len() {
            return Err(row_err(format!(
                "expected {} fields, found {}",
                header.len(),
                fields.len()
            )));
        }

        let mut values = [0.0f64; WEATHER_COLUMNS.len()];
        for ((value, &col), name) in values.iter_mut().zip(index.iter()).zip(WEATHER_COLUMNS) {
            *value = fields[col]
                .parse::<f64>()
                .map_err(|_| row_err(format!("{name} '{}' is not a number", fields[col])))?;
        }

        let [day, month, year, min_temp, max_temp, precipitation, reference_et] = values;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            .ok_or_else(|| row_err(format!("{year}-{month}-{day} is not a calendar date")))?;

        days.push(WeatherDay {
            date,
            min_temp,
            max_temp,
            precipitation,
            reference_et,
        });
    }

    if days.is_empty() {
        return Err(InputError::EmptyWeather {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), days = days.len(), "Weather series loaded");
    Ok(WeatherSeries {
        path: path.to_path_buf(),
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reads_indexed_layout() {
        let f = write_tmp(
            "   Day  Month  Year  MinTemp  MaxTemp  Precipitation  ReferenceET\n\
             0    1      1  2025     4.10    12.30           0.00         1.21\n\
             1    2      1  2025     3.80    11.90           2.40         1.05\n",
        );
        let w = read_weather(f.path()).unwrap();
        assert_eq!(w.days.len(), 2);
        assert_eq!(w.first_date(), Some(ymd(2025, 1, 1)));
        assert_eq!(w.days[1].precipitation, 2.4);
        assert_eq!(w.days[0].reference_et, 1.21);
    }

    #[test]
    fn test_reads_plain_layout_any_column_order() {
        let f = write_tmp(
            "Year Month Day MinTemp MaxTemp Precipitation ReferenceET\n\
             2025 3 1 5 15 0 2\n",
        );
        let w = read_weather(f.path()).unwrap();
        assert_eq!(w.days[0].date, ymd(2025, 3, 1));
        assert_eq!(w.days[0].max_temp, 15.0);
    }

    #[test]
    fn test_missing_column() {
        let f = write_tmp("Day Month Year MinTemp MaxTemp Precipitation\n1 1 2025 1 2 3\n");
        let err = read_weather(f.path()).unwrap_err();
        assert!(matches!(err, InputError::WeatherColumn { column: "ReferenceET", .. }));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let f = write_tmp(
            "Day Month Year MinTemp MaxTemp Precipitation ReferenceET\n\
             1 1 2025 1 2 3 4\n\
             2 1 2025 x 2 3 4\n",
        );
        let err = read_weather(f.path()).unwrap_err();
        assert!(matches!(err, InputError::WeatherRow { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_coverage() {
        let f = write_tmp(
            "Day Month Year MinTemp MaxTemp Precipitation ReferenceET\n\
             1 1 2025 1 2 3 4\n\
             31 12 2025 1 2 3 4\n",
        );
        let w = read_weather(f.path()).unwrap();
        assert!(w.covers(ymd(2025, 1, 1), ymd(2025, 12, 31)));
        assert!(!w.covers(ymd(2025, 1, 1), ymd(2026, 1, 1)));
        assert_eq!(w.total_precipitation(), 6.0);
    }

    #[test]
    fn test_empty_file() {
        let f = write_tmp("\n\n");
        assert!(matches!(read_weather(f.path()), Err(InputError::EmptyWeather { .. })));
    }
}
