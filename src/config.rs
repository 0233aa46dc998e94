// ⚙️ Configuration - defaults, then environment, then command-line flags

use std::path::PathBuf;

use log::warn;

use crate::convert::NumberLocale;

pub const ENV_DATABASE: &str = "DEPOT_DB";
pub const ENV_LOCALE: &str = "DEPOT_LOCALE";
pub const ENV_LOG: &str = "DEPOT_LOG";

const DEFAULT_DATABASE: &str = "depot.db";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Number format for text fields
    pub locale: NumberLocale,
    /// env_logger filter string ("info", "depot_desk=debug", ...)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            locale: NumberLocale::invariant(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `DEPOT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = lookup(ENV_DATABASE) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(tag) = lookup(ENV_LOCALE) {
            config.locale = resolve_locale(&tag);
        }
        config.log_filter = log_filter_from_lookup(lookup);

        config
    }

    /// Apply command-line flags; `None` keeps the current value.
    pub fn with_overrides(mut self, database_path: Option<PathBuf>, locale: Option<&str>) -> Self {
        if let Some(path) = database_path {
            self.database_path = path;
        }
        if let Some(tag) = locale {
            self.locale = resolve_locale(tag);
        }
        self
    }
}

/// Logger filter from `DEPOT_LOG`. Read on its own so the logger can be up
/// before the rest of the configuration is resolved.
pub fn log_filter_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_LOG)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Known locale for `tag`, or invariant with a warning.
pub fn resolve_locale(tag: &str) -> NumberLocale {
    NumberLocale::from_tag(tag).unwrap_or_else(|| {
        warn!("unknown locale {:?}, using invariant number format", tag);
        NumberLocale::invariant()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.database_path, PathBuf::from("depot.db"));
        assert_eq!(config.locale, NumberLocale::invariant());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_DATABASE, "/var/lib/depot/fleet.db"),
            (ENV_LOCALE, "ru-RU"),
            (ENV_LOG, "depot_desk=debug"),
        ]));

        assert_eq!(config.database_path, PathBuf::from("/var/lib/depot/fleet.db"));
        assert_eq!(config.locale, NumberLocale::ru_ru());
        assert_eq!(config.log_filter, "depot_desk=debug");
    }

    #[test]
    fn test_blank_environment_values_ignored() {
        let config = Config::from_lookup(lookup_from(&[(ENV_DATABASE, "  "), (ENV_LOG, "")]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_environment() {
        let config = Config::from_lookup(lookup_from(&[(ENV_LOCALE, "de-DE")]))
            .with_overrides(Some(PathBuf::from("test.db")), Some("en-US"));

        assert_eq!(config.database_path, PathBuf::from("test.db"));
        assert_eq!(config.locale, NumberLocale::en_us());

        let untouched = config.clone().with_overrides(None, None);
        assert_eq!(untouched, config);
    }

    #[test]
    fn test_log_filter_read_alone() {
        let lookup = lookup_from(&[(ENV_LOG, "depot_desk=trace"), (ENV_LOCALE, "tlh-KL")]);
        assert_eq!(log_filter_from_lookup(&lookup), "depot_desk=trace");
        assert_eq!(Config::from_lookup(&lookup).log_filter, "depot_desk=trace");

        assert_eq!(log_filter_from_lookup(lookup_from(&[(ENV_LOG, " ")])), "info");
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        assert_eq!(resolve_locale("tlh-KL"), NumberLocale::invariant());
    }
}
