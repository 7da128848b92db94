use std::{fs, path::Path};

use anyhow::{Context, Result};
use spinwheel_core::GameConfig;

/// Overrides supplied on the command line, applied after the config file.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) seed: Option<u64>,
    pub(crate) no_heartbeat: bool,
}

/// Loads the session configuration from an optional TOML file.
pub(crate) fn load(path: Option<&Path>, overrides: Overrides) -> Result<GameConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            parse(&contents)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => GameConfig::default(),
    };

    if let Some(seed) = overrides.seed {
        config.spin_seed = seed;
    }
    if overrides.no_heartbeat {
        config.heartbeat_enabled = false;
    }
    Ok(config)
}

fn parse(contents: &str) -> Result<GameConfig> {
    toml::from_str(contents).context("failed to parse config toml contents")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = parse("initial_bps = 90.0\nrelax_seconds = 3\n").expect("valid toml");
        assert!((config.initial_bps - 90.0).abs() < f64::EPSILON);
        assert_eq!(config.relax_seconds, 3);
        assert_eq!(config.spin_frame_ms, GameConfig::default().spin_frame_ms);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(parse("initial_bps = \"fast\"").is_err());
    }

    #[test]
    fn overrides_apply_without_a_file() {
        let config = load(
            None,
            Overrides {
                seed: Some(42),
                no_heartbeat: true,
            },
        )
        .expect("defaults");
        assert_eq!(config.spin_seed, 42);
        assert!(!config.heartbeat_enabled);
    }
}
