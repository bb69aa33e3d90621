//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::SchedulerConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `SchedulerConfig`.
///
/// Maintained by hand alongside scheduler_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [scenario]
        "scenario",
        "scenario.crop",
        "scenario.planting_date",
        "scenario.soil_type",
        "scenario.layer_thicknesses",
        "scenario.irrigation_method",
        "scenario.seasonal_cap_mm",
        "scenario.sim_start",
        "scenario.sim_end",
        // [scenario.initial_water]
        "scenario.initial_water",
        "scenario.initial_water.wc_type",
        "scenario.initial_water.method",
        "scenario.initial_water.depth_layer",
        "scenario.initial_water.value",
        // [search]
        "search",
        "search.stages",
        "search.num_searches",
        "search.mode",
        "search.seed",
        "search.max_workers",
        // [refine]
        "refine",
        "refine.sd_tolerance",
        "refine.initial_step",
        "refine.zero_step",
        "refine.max_iters",
        // [paths]
        "paths",
        "paths.weather",
        "paths.soil",
        "paths.output",
        // [simulator]
        "simulator",
        "simulator.command",
        "simulator.working_dir",
        // [acquisition]
        "acquisition",
        "acquisition.command",
        "acquisition.working_dir",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Levenshtein edit distance, counted in chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the lexicographically smallest key so the hint is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails: parse errors are reported by the serde pass.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Plausibility Checks
// ============================================================================

/// Values that are legal but probably not what the operator meant.
pub fn suspicious_values(config: &SchedulerConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    let search = &config.search;
    if search.num_searches < search.stages {
        warn(
            "search.num_searches",
            format!(
                "search.num_searches = {} is below the stage count ({}), the start point will be close to random",
                search.num_searches, search.stages
            ),
        );
    }

    let cap = config.scenario.seasonal_cap_mm;
    if cap > 2000.0 {
        warn(
            "scenario.seasonal_cap_mm",
            format!("scenario.seasonal_cap_mm = {cap:.0} exceeds any realistic seasonal demand (2000 mm)"),
        );
    }
    if cap == 0.0 {
        warn(
            "scenario.seasonal_cap_mm",
            "scenario.seasonal_cap_mm = 0 disables irrigation, every trigger vector scores the same".to_string(),
        );
    }

    let depth: f64 = config.scenario.layer_thicknesses.iter().sum();
    if depth > 5.0 {
        warn(
            "scenario.layer_thicknesses",
            format!("soil profile is {depth:.2} m deep, typical root zones are under 5 m"),
        );
    }

    let tol = config.refine.sd_tolerance;
    if tol > 1.0 {
        warn(
            "refine.sd_tolerance",
            format!("refine.sd_tolerance = {tol} is coarse, refinement may stop after a few steps"),
        );
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("stages", "stages"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("num_serches", "num_searches"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [scenario]
            crop = "Potato"
            [scenario.initial_water]
            wc_type = "Prop"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"scenario".to_string()));
        assert!(keys.contains(&"scenario.crop".to_string()));
        assert!(keys.contains(&"scenario.initial_water.wc_type".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[search]
num_serches = 50
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("num_serches"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("search.num_searches"));
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[scenaro]\ncrop = \"Maize\"\n");
        assert!(warnings.iter().any(|w| w.field == "scenaro"));
        assert!(warnings.iter().any(|w| w.suggestion.as_deref() == Some("scenario")));
    }

    #[test]
    fn test_unparseable_toml_yields_no_warnings() {
        assert!(validate_unknown_keys("[search\n").is_empty());
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_default_serialization_uses_only_known_keys() {
        let mut config = SchedulerConfig::default();
        config.search.seed = Some(1);
        config.search.max_workers = Some(2);
        config.refine.max_iters = Some(100);
        config.simulator.working_dir = Some("models".into());
        config.acquisition.working_dir = Some("fetch".into());
        let toml_str = config.to_toml().unwrap();
        let warnings = validate_unknown_keys(&toml_str);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_defaults_are_not_suspicious() {
        assert!(suspicious_values(&SchedulerConfig::default()).is_empty());
    }

    #[test]
    fn test_suspicious_cap_and_search_count() {
        let mut config = SchedulerConfig::default();
        config.scenario.seasonal_cap_mm = 5000.0;
        config.search.num_searches = 2;
        let warnings = suspicious_values(&config);
        assert!(warnings.iter().any(|w| w.field == "scenario.seasonal_cap_mm"));
        assert!(warnings.iter().any(|w| w.field == "search.num_searches"));
    }
}
