//! Readers for the upstream input artifacts (soil profile, climate series).
//!
//! Both files are produced by the data-acquisition collaborators; this module
//! only parses and sanity-checks them.

mod soil;
mod weather;

pub use soil::{read_soil_layers, SoilRecord};
pub use weather::{read_weather, WeatherDay, WeatherSeries, WEATHER_COLUMNS};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed soil profile {}: {source}", path.display())]
    SoilCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("soil profile {} has no usable layers", path.display())]
    EmptySoil { path: PathBuf },

    #[error("soil profile {} row {row}: {message}", path.display())]
    SoilValue {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("weather file {} is missing column '{column}'", path.display())]
    WeatherColumn { path: PathBuf, column: &'static str },

    #[error("weather file {} line {line}: {message}", path.display())]
    WeatherRow {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("weather file {} contains no daily rows", path.display())]
    EmptyWeather { path: PathBuf },
}
