//! Soil profile table: one row per depth layer with texture fractions.
//!
//! Expected header (extra columns ignored): `depth,thickness,clay,sand,om`.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::InputError;
use crate::types::{SoilLayer, DEFAULT_PENETRABILITY};

/// Raw CSV row as written by the soil data provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SoilRecord {
    #[serde(default)]
    pub depth: Option<String>,
    pub thickness: f64,
    pub clay: f64,
    pub sand: f64,
    pub om: f64,
}

/// Read the soil profile into simulator layers (penetrability 100).
pub fn read_soil_layers(path: &Path) -> Result<Vec<SoilLayer>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| InputError::SoilCsv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut layers = Vec::new();
    for (i, row) in reader.deserialize::<SoilRecord>().enumerate() {
        let record = row.map_err(|source| InputError::SoilCsv {
            path: path.to_path_buf(),
            source,
        })?;
        let row_no = i + 1;
        for (name, value) in [
            ("thickness", record.thickness),
            ("clay", record.clay),
            ("sand", record.sand),
            ("om", record.om),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::SoilValue {
                    path: path.to_path_buf(),
                    row: row_no,
                    message: format!("{name} = {value} must be a finite non-negative number"),
                });
            }
        }
        if record.thickness == 0.0 {
            return Err(InputError::SoilValue {
                path: path.to_path_buf(),
                row: row_no,
                message: "thickness must be > 0".to_string(),
            });
        }
        layers.push(SoilLayer {
            thickness: record.thickness,
            sand: record.sand,
            clay: record.clay,
            om: record.om,
            penetrability: DEFAULT_PENETRABILITY,
        });
    }

    if layers.is_empty() {
        return Err(InputError::EmptySoil {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), layers = layers.len(), "Soil profile loaded");
    Ok(layers)
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

    #[test]
    fn test_reads_provider_layout() {
        let f = write_tmp(
            "depth,thickness,clay,sand,om\n\
             0-30cm,0.3,28.1,31.4,1.52\n\
             30-60cm,0.3,30.0,29.8,0.9\n\
             60-100cm,0.4,31.2,28.0,0.6\n\
             100-200cm,1.0,31.2,28.0,0.4\n",
        );
        let layers = read_soil_layers(f.path()).unwrap();
        assert_eq!(layers.len(), 4);
        assert_eq!(layers[0].clay, 28.1);
        assert_eq!(layers[0].sand, 31.4);
        assert_eq!(layers[3].thickness, 1.0);
        assert!(layers.iter().all(|l| l.penetrability == 100.0));
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let f = write_tmp("thickness,sand,clay,om\n0.3,40,20,1.0\n");
        let layers = read_soil_layers(f.path()).unwrap();
        assert_eq!(layers[0].sand, 40.0);
        assert_eq!(layers[0].clay, 20.0);
    }

    #[test]
    fn test_missing_value_is_error() {
        let f = write_tmp("depth,thickness,clay,sand,om\n0-30cm,0.3,,31.4,1.5\n");
        assert!(matches!(read_soil_layers(f.path()), Err(InputError::SoilCsv { .. })));
    }

    #[test]
    fn test_empty_profile_is_error() {
        let f = write_tmp("depth,thickness,clay,sand,om\n");
        assert!(matches!(read_soil_layers(f.path()), Err(InputError::EmptySoil { .. })));
    }

    #[test]
    fn test_negative_fraction_is_error() {
        let f = write_tmp("depth,thickness,clay,sand,om\n0-30cm,0.3,-2,31.4,1.5\n");
        let err = read_soil_layers(f.path()).unwrap_err();
        assert!(err.to_string().contains("clay"), "{err}");
    }
}
