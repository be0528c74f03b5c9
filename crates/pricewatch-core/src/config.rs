use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an unparsable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an unparsable value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"));

    let bind_addr = parse_addr("PRICEWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");
    let stores_path = PathBuf::from(or_default(
        "PRICEWATCH_STORES_PATH",
        "./config/stores.yaml",
    ));
    let data_dir = PathBuf::from(or_default("PRICEWATCH_DATA_DIR", "./data"));
    let default_category = or_default("PRICEWATCH_DEFAULT_CATEGORY", "all");

    let navigation_timeout_secs = parse_u64("PRICEWATCH_NAVIGATION_TIMEOUT_SECS", "30")?;
    let selector_timeout_secs = parse_u64("PRICEWATCH_SELECTOR_TIMEOUT_SECS", "10")?;
    let user_agent = or_default(
        "PRICEWATCH_USER_AGENT",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    );
    let inter_page_delay_ms = parse_u64("PRICEWATCH_INTER_PAGE_DELAY_MS", "2000")?;
    let inter_store_delay_ms = parse_u64("PRICEWATCH_INTER_STORE_DELAY_MS", "5000")?;
    let page_max_retries = parse_u32("PRICEWATCH_PAGE_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("PRICEWATCH_RETRY_BACKOFF_BASE_SECS", "1")?;

    let scrape_cron = lookup("PRICEWATCH_SCRAPE_CRON")
        .ok()
        .filter(|s| !s.trim().is_empty());

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        stores_path,
        data_dir,
        default_category,
        navigation_timeout_secs,
        selector_timeout_secs,
        user_agent,
        inter_page_delay_ms,
        inter_store_delay_ms,
        page_max_retries,
        retry_backoff_base_secs,
        scrape_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn parse_environment_production() {
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn build_app_config_succeeds_with_empty_env() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.stores_path.to_str(), Some("./config/stores.yaml"));
        assert_eq!(cfg.data_dir.to_str(), Some("./data"));
        assert_eq!(cfg.default_category, "all");
        assert_eq!(cfg.navigation_timeout_secs, 30);
        assert_eq!(cfg.selector_timeout_secs, 10);
        assert_eq!(cfg.inter_page_delay_ms, 2000);
        assert_eq!(cfg.inter_store_delay_ms, 5000);
        assert_eq!(cfg.page_max_retries, 2);
        assert_eq!(cfg.retry_backoff_base_secs, 1);
        assert!(cfg.scrape_cron.is_none());
    }

    #[test]
    fn build_app_config_fails_with_invalid_bind_addr() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_BIND_ADDR"),
            "expected InvalidEnvVar(PRICEWATCH_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_navigation_timeout_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_NAVIGATION_TIMEOUT_SECS", "60");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.navigation_timeout_secs, 60);
    }

    #[test]
    fn build_app_config_navigation_timeout_invalid() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_NAVIGATION_TIMEOUT_SECS", "soon");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_NAVIGATION_TIMEOUT_SECS"),
            "expected InvalidEnvVar(PRICEWATCH_NAVIGATION_TIMEOUT_SECS), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_page_max_retries_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_PAGE_MAX_RETRIES", "0");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.page_max_retries, 0);
    }

    #[test]
    fn build_app_config_user_agent_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_USER_AGENT", "custom-agent/2.0");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.user_agent, "custom-agent/2.0");
    }

    #[test]
    fn build_app_config_scrape_cron_set() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_SCRAPE_CRON", "0 0 3 * * *");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.scrape_cron.as_deref(), Some("0 0 3 * * *"));
    }

    #[test]
    fn build_app_config_blank_scrape_cron_treated_as_absent() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_SCRAPE_CRON", "   ");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert!(cfg.scrape_cron.is_none());
    }
}
