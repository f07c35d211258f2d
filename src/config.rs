use std::env;
use std::path::PathBuf;

/// Process configuration, resolved once at startup. Every knob has a
/// sensible default so a bare `screenhealth-api serve` works out of the
/// box with a database file in the working directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub model_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: PathBuf::from(env_or("SCREENHEALTH_DB", "screenhealth.db")),
            bind_addr: env_or("SCREENHEALTH_BIND", "0.0.0.0:8000"),
            model_path: PathBuf::from(env_or(
                "SCREENHEALTH_MODEL",
                "mental_health_predictor.json",
            )),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_when_unset_or_blank() {
        assert_eq!(env_or("SCREENHEALTH_TEST_UNSET_VAR", "fallback"), "fallback");

        env::set_var("SCREENHEALTH_TEST_BLANK_VAR", "   ");
        assert_eq!(env_or("SCREENHEALTH_TEST_BLANK_VAR", "fallback"), "fallback");
        env::remove_var("SCREENHEALTH_TEST_BLANK_VAR");
    }

    #[test]
    fn env_or_prefers_set_values() {
        env::set_var("SCREENHEALTH_TEST_SET_VAR", "custom.db");
        assert_eq!(env_or("SCREENHEALTH_TEST_SET_VAR", "fallback"), "custom.db");
        env::remove_var("SCREENHEALTH_TEST_SET_VAR");
    }
}
