// Configuration loading and parsing (strategy.toml, formation.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::rotation::engine::ObjectiveWeights;
use crate::rotation::fairness::FairnessConfig;
use crate::rotation::formation::{FormationError, FormationSet};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid formation file {path}: {source}")]
    Formation {
        path: PathBuf,
        source: FormationError,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    fairness: FairnessConfig,
    objective: ObjectiveWeights,
    engine: EngineSettings,
    game: GameSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Wall-clock budget for the exact solve, in milliseconds. Zero skips
    /// the exact path entirely.
    pub time_budget_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSettings {
    /// Planned number of series per game.
    pub total_series: u32,
}

/// The assembled strategy: everything the game controller needs beyond the
/// roster and the formations.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub fairness: FairnessConfig,
    pub objective: ObjectiveWeights,
    pub engine: EngineSettings,
    pub game: GameSettings,
}

impl Strategy {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.engine.time_budget_ms)
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: Strategy,
    pub formations: FormationSet,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/strategy.toml` and
/// `config/formation.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- strategy.toml (required) ---
    let strategy_path = config_dir.join("strategy.toml");
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let strategy = Strategy {
        fairness: strategy_file.fairness,
        objective: strategy_file.objective,
        engine: strategy_file.engine,
        game: strategy_file.game,
    };

    // --- formation.toml (required) ---
    let formation_path = config_dir.join("formation.toml");
    let formation_text = read_file(&formation_path)?;
    let formations =
        FormationSet::from_toml_str(&formation_text).map_err(|e| ConfigError::Formation {
            path: formation_path.clone(),
            source: e,
        })?;

    let config = Config {
        strategy,
        formations,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, keep it.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let fairness = &config.strategy.fairness;
    if fairness.min_guarantee_series == 0 {
        return Err(ConfigError::ValidationError {
            field: "fairness.min_guarantee_series".into(),
            message: "must be greater than 0".into(),
        });
    }
    let reduction = fairness.varsity_reduction;
    if !(0.0..=1.0).contains(&reduction) {
        return Err(ConfigError::ValidationError {
            field: "fairness.varsity_reduction".into(),
            message: format!("must be between 0.0 and 1.0 inclusive, got {reduction}"),
        });
    }

    let obj = &config.strategy.objective;
    let coefficient_fields: &[(&str, f64)] = &[
        ("objective.strength", obj.strength),
        ("objective.preference", obj.preference),
        ("objective.fairness", obj.fairness),
        ("objective.pairing", obj.pairing),
    ];
    for (name, val) in coefficient_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a finite value >= 0, got {val}"),
            });
        }
    }

    if config.strategy.game.total_series == 0 {
        return Err(ConfigError::ValidationError {
            field: "game.total_series".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: locate the project root whether tests run from the crate
    /// root or a parent directory.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("rotation-assistant/defaults").exists() {
            cwd.join("rotation-assistant")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let root = project_root();
        ensure_config_files(&root).expect("should copy default configs");
        let config = load_config_from(&root).expect("should load valid config");

        assert_eq!(config.strategy.fairness.min_guarantee_series, 4);
        assert_eq!(config.strategy.fairness.evenness_cap, 1);
        assert!((config.strategy.fairness.varsity_reduction - 0.3).abs() < f64::EPSILON);

        assert!((config.strategy.objective.strength - 1.0).abs() < f64::EPSILON);
        assert!((config.strategy.objective.preference - 2.0).abs() < f64::EPSILON);
        assert!((config.strategy.objective.fairness - 50.0).abs() < f64::EPSILON);
        assert!((config.strategy.objective.pairing - 1.5).abs() < f64::EPSILON);

        assert_eq!(config.strategy.engine.time_budget_ms, 250);
        assert_eq!(config.strategy.time_budget(), Duration::from_millis(250));
        assert_eq!(config.strategy.game.total_series, 10);

        // The default offense fields eleven slots.
        assert_eq!(config.formations.offense.slots().len(), 11);
        assert_eq!(config.formations.defense_53.slots().len(), 11);
        assert_eq!(config.formations.defense_44.slots().len(), 10);
    }

    #[test]
    fn rejects_negative_objective_coefficient() {
        let tmp = std::env::temp_dir().join("rotation_config_test_neg_coeff");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/formation.toml"),
            config_dir.join("formation.toml"),
        )
        .unwrap();
        let strategy_text = fs::read_to_string(root.join("defaults/strategy.toml")).unwrap();
        let modified = strategy_text.replace("preference = 2.0", "preference = -2.0");
        fs::write(config_dir.join("strategy.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "objective.preference");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_varsity_reduction_above_one() {
        let tmp = std::env::temp_dir().join("rotation_config_test_reduction");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/formation.toml"),
            config_dir.join("formation.toml"),
        )
        .unwrap();
        let strategy_text = fs::read_to_string(root.join("defaults/strategy.toml")).unwrap();
        let modified = strategy_text.replace("varsity_reduction = 0.3", "varsity_reduction = 1.3");
        fs::write(config_dir.join("strategy.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "fairness.varsity_reduction");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_total_series() {
        let tmp = std::env::temp_dir().join("rotation_config_test_zero_series");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/formation.toml"),
            config_dir.join("formation.toml"),
        )
        .unwrap();
        let strategy_text = fs::read_to_string(root.join("defaults/strategy.toml")).unwrap();
        let modified = strategy_text.replace("total_series = 10", "total_series = 0");
        fs::write(config_dir.join("strategy.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "game.total_series");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_strategy_toml() {
        let tmp = std::env::temp_dir().join("rotation_config_test_missing_strategy");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/formation.toml"),
            config_dir.join("formation.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("strategy.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = std::env::temp_dir().join("rotation_config_test_invalid_toml");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        fs::write(
            config_dir.join("strategy.toml"),
            "this is not valid [[[ toml",
        )
        .unwrap();
        let root = project_root();
        fs::copy(
            root.join("defaults/formation.toml"),
            config_dir.join("formation.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("strategy.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn formation_error_carries_the_path() {
        let tmp = std::env::temp_dir().join("rotation_config_test_bad_formation");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/strategy.toml"),
            config_dir.join("strategy.toml"),
        )
        .unwrap();
        // A defensive position in the offense block.
        fs::write(
            config_dir.join("formation.toml"),
            r#"
[offense]
slots = [{ id = "S", position = "S" }]

[defense.five_three]
slots = [{ id = "S2", position = "S" }]

[defense.four_four]
slots = [{ id = "S3", position = "S" }]
"#,
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Formation { path, .. } => {
                assert!(path.ends_with("formation.toml"));
            }
            other => panic!("expected Formation, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("rotation_config_test_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/strategy.toml"),
            defaults_dir.join("strategy.toml"),
        )
        .unwrap();
        fs::copy(
            root.join("defaults/formation.toml"),
            defaults_dir.join("formation.toml"),
        )
        .unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 2);
        assert!(tmp.join("config/strategy.toml").exists());
        assert!(tmp.join("config/formation.toml").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("rotation_config_test_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/strategy.toml"),
            defaults_dir.join("strategy.toml"),
        )
        .unwrap();
        fs::copy(
            root.join("defaults/formation.toml"),
            defaults_dir.join("formation.toml"),
        )
        .unwrap();

        fs::write(config_dir.join("strategy.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(copied[0].ends_with("formation.toml"));

        let content = fs::read_to_string(config_dir.join("strategy.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("rotation_config_test_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
