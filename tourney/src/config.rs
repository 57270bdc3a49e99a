//! Environment-driven configuration for the competition rules.

use std::str::FromStr;

use crate::tournament::pairing::{Pairing, RandomPairing, SkillBasedPairing};

/// Points for a win unless `POINTS_PER_WIN` says otherwise
pub const DEFAULT_POINTS_PER_WIN: u32 = 3;

/// Points for a loss unless `POINTS_PER_LOSS` says otherwise
pub const DEFAULT_POINTS_PER_LOSS: u32 = 0;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl ConfigError {
    pub fn invalid(var: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A value that is present but unparsable is an error rather than a silent
/// fallback.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// Scoring and pairing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetitionConfig {
    pub pairing: Pairing,
    pub points_per_win: u32,
    pub points_per_loss: u32,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            pairing: Pairing::default(),
            points_per_win: DEFAULT_POINTS_PER_WIN,
            points_per_loss: DEFAULT_POINTS_PER_LOSS,
        }
    }
}

impl CompetitionConfig {
    /// Load from environment variables
    ///
    /// - `PAIRING_STRATEGY`: `skill` (default) or `random`
    /// - `PAIRING_SEED`: optional seed for random pairing
    /// - `POINTS_PER_WIN` (default 3), `POINTS_PER_LOSS` (default 0)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown strategies, unparsable
    /// numbers or a loss worth more than a win.
    pub fn from_env() -> Result<Self, ConfigError> {
        let seed = match std::env::var("PAIRING_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::invalid("PAIRING_SEED", "must be a u64"))?,
            ),
            Err(_) => None,
        };

        let strategy = std::env::var("PAIRING_STRATEGY").unwrap_or_else(|_| "skill".to_string());
        let pairing = match strategy.trim().to_lowercase().as_str() {
            "skill" | "skill_based" => Pairing::from(SkillBasedPairing),
            "random" => Pairing::from(RandomPairing { seed }),
            other => {
                return Err(ConfigError::invalid(
                    "PAIRING_STRATEGY",
                    format!("unknown strategy '{other}', expected 'skill' or 'random'"),
                ));
            }
        };

        let config = Self {
            pairing,
            points_per_win: env_or("POINTS_PER_WIN", DEFAULT_POINTS_PER_WIN)?,
            points_per_loss: env_or("POINTS_PER_LOSS", DEFAULT_POINTS_PER_LOSS)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points_per_loss > self.points_per_win {
            return Err(ConfigError::invalid(
                "POINTS_PER_LOSS",
                format!("must not exceed POINTS_PER_WIN ({})", self.points_per_win),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::pairing::PairingStrategy;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PAIRING_STRATEGY",
            "PAIRING_SEED",
            "POINTS_PER_WIN",
            "POINTS_PER_LOSS",
        ] {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = CompetitionConfig::from_env().unwrap();
        assert_eq!(config, CompetitionConfig::default());
        assert_eq!(config.pairing.name(), "skill");
        assert_eq!(config.points_per_win, 3);
        assert_eq!(config.points_per_loss, 0);
    }

    #[test]
    #[serial]
    fn test_random_with_seed() {
        clear_env();
        unsafe {
            std::env::set_var("PAIRING_STRATEGY", "random");
            std::env::set_var("PAIRING_SEED", "7");
            std::env::set_var("POINTS_PER_WIN", "2");
            std::env::set_var("POINTS_PER_LOSS", "1");
        }
        let config = CompetitionConfig::from_env().unwrap();
        assert_eq!(config.pairing, Pairing::from(RandomPairing::seeded(7)));
        assert_eq!(config.points_per_win, 2);
        assert_eq!(config.points_per_loss, 1);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_unknown_strategy() {
        clear_env();
        unsafe { std::env::set_var("PAIRING_STRATEGY", "swiss") };
        let err = CompetitionConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_garbage_numbers() {
        clear_env();
        unsafe { std::env::set_var("POINTS_PER_WIN", "three") };
        assert!(CompetitionConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_loss_worth_more_than_win_is_invalid() {
        let config = CompetitionConfig {
            points_per_win: 1,
            points_per_loss: 2,
            ..CompetitionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
