//! Trigger vectors: per-growth-stage soil-moisture thresholds.

use serde::{Deserialize, Serialize};

/// Lower bound of a soil-moisture trigger (% of total available water).
pub const TRIGGER_MIN: f64 = 0.0;
/// Upper bound of a soil-moisture trigger (% of total available water).
pub const TRIGGER_MAX: f64 = 100.0;
/// Neutral trigger used when the start-point search produces nothing.
pub const TRIGGER_MIDPOINT: f64 = 50.0;

/// Ordered soil-moisture triggers, one per growth stage.
///
/// Values are not range-checked on construction: the refinement phase may
/// legitimately produce out-of-range iterates, and `clipped()` is applied by
/// the caller before any value is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerVector(Vec<f64>);

impl TriggerVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// All stages at the midpoint (50%).
    pub fn midpoint(stages: usize) -> Self {
        Self(vec![TRIGGER_MIDPOINT; stages])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// True when every component lies in `[0, 100]`.
    pub fn is_within_bounds(&self) -> bool {
        self.0
            .iter()
            .all(|v| (TRIGGER_MIN..=TRIGGER_MAX).contains(v))
    }

    /// Element-wise clip into `[0, 100]`.
    ///
    /// NaN components map to the lower bound so the result is always inside
    /// the box.
    pub fn clipped(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        TRIGGER_MIN
                    } else {
                        v.clamp(TRIGGER_MIN, TRIGGER_MAX)
                    }
                })
                .collect(),
        )
    }
}

impl From<Vec<f64>> for TriggerVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl AsRef<[f64]> for TriggerVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl std::fmt::Display for TriggerVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:.2}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_inside_box_is_noop() {
        let v = TriggerVector::new(vec![0.0, 12.5, 99.9, 100.0]);
        assert!(v.is_within_bounds());
        assert_eq!(v.clipped(), v);
        assert_eq!(v.clipped().clipped(), v);
    }

    #[test]
    fn test_clip_out_of_range_lands_in_box() {
        let v = TriggerVector::new(vec![-15.0, 140.0, 55.0, f64::NAN, f64::INFINITY]);
        assert!(!v.is_within_bounds());
        let c = v.clipped();
        assert!(c.is_within_bounds());
        assert_eq!(c.as_slice(), &[0.0, 100.0, 55.0, 0.0, 100.0]);
    }

    #[test]
    fn test_midpoint() {
        let v = TriggerVector::midpoint(4);
        assert_eq!(v.as_slice(), &[50.0; 4]);
    }

    #[test]
    fn test_display() {
        let v = TriggerVector::new(vec![70.0, 65.126]);
        assert_eq!(v.to_string(), "[70.00, 65.13]");
    }

    #[test]
    fn test_serde_is_plain_array() {
        let v = TriggerVector::new(vec![1.0, 2.0]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[1.0,2.0]");
    }
}
