use serde::Deserialize;
use std::env;

/// Tunable thresholds for the learner-model engine. Values come from
/// `config/{env}.toml` under a `[director]` table, overridable through
/// `APP_DIRECTOR__*` environment variables; anything missing falls back
/// to the documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorConfig {
    /// Intervene once frustration reaches this level.
    pub frustration_threshold: f64,
    /// Intervene once any unresolved struggle recurs this many times.
    pub struggle_frequency_threshold: u32,
    /// Intervene once this many seconds pass without a success.
    pub stall_seconds: i64,
    /// Upper bound on one generative-backend call.
    pub generative_timeout_secs: u64,
    /// Width of the velocity comparison windows.
    pub velocity_window: usize,
    /// How many recent observations feed the difficulty heuristics.
    pub difficulty_window: usize,
    /// How many observations to hydrate from the store on engine load.
    pub observation_cache_limit: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            frustration_threshold: 0.7,
            struggle_frequency_threshold: 3,
            stall_seconds: 300,
            generative_timeout_secs: 6,
            velocity_window: 5,
            difficulty_window: 10,
            observation_cache_limit: 50,
        }
    }
}

impl DirectorConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Self::default();

        Ok(Self {
            frustration_threshold: settings
                .get_float("director.frustration_threshold")
                .unwrap_or(defaults.frustration_threshold),
            struggle_frequency_threshold: settings
                .get_int("director.struggle_frequency_threshold")
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.struggle_frequency_threshold),
            stall_seconds: settings
                .get_int("director.stall_seconds")
                .unwrap_or(defaults.stall_seconds),
            generative_timeout_secs: settings
                .get_int("director.generative_timeout_secs")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.generative_timeout_secs),
            velocity_window: settings
                .get_int("director.velocity_window")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.velocity_window),
            difficulty_window: settings
                .get_int("director.difficulty_window")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.difficulty_window),
            observation_cache_limit: settings
                .get_int("director.observation_cache_limit")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.observation_cache_limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = DirectorConfig::default();
        assert_eq!(cfg.frustration_threshold, 0.7);
        assert_eq!(cfg.struggle_frequency_threshold, 3);
        assert_eq!(cfg.stall_seconds, 300);
        assert_eq!(cfg.velocity_window, 5);
        assert_eq!(cfg.difficulty_window, 10);
    }

    #[test]
    #[serial]
    fn env_override_applies() {
        std::env::set_var("APP_DIRECTOR__STALL_SECONDS", "120");
        let cfg = DirectorConfig::load().unwrap();
        assert_eq!(cfg.stall_seconds, 120);
        std::env::remove_var("APP_DIRECTOR__STALL_SECONDS");
    }

    #[test]
    #[serial]
    fn load_without_overrides_uses_defaults() {
        std::env::remove_var("APP_DIRECTOR__STALL_SECONDS");
        let cfg = DirectorConfig::load().unwrap();
        assert_eq!(cfg.stall_seconds, DirectorConfig::default().stall_seconds);
    }
}
