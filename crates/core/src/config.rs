use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub speech: SpeechConfig,
    pub proactive: ProactiveConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub fast_model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WeatherConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub units: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub voice: String,
    pub wake_words: Vec<String>,
    pub listen_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ProactiveConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub weather_interval_secs: u64,
    pub permit_warning_days: i64,
    /// Estimated permit validity window used when a route only carries an
    /// attachment date. Heuristic pending product confirmation.
    pub permit_validity_days: i64,
    pub deadline_warning_hours: i64,
    pub alert_check_interval_secs: u64,
    pub max_alert_age_hours: i64,
    pub summary_alert_cap: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Groq,
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub weather_api_key: Option<String>,
    pub proactive_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://haulvoice.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: Some("https://api.groq.com/openai/v1".to_string()),
                model: "llama-3.3-70b-versatile".to_string(),
                fast_model: Some("llama-3.3-70b-specdec".to_string()),
                temperature: 0.3,
                max_tokens: 300,
                timeout_secs: 30,
            },
            weather: WeatherConfig {
                api_key: None,
                base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
                units: "metric".to_string(),
                timeout_secs: 10,
            },
            speech: SpeechConfig {
                voice: "en-US-ChristopherNeural".to_string(),
                wake_words: vec!["james".to_string(), "pixel".to_string()],
                listen_timeout_secs: 5,
            },
            proactive: ProactiveConfig {
                enabled: true,
                poll_interval_secs: 120,
                weather_interval_secs: 1800,
                permit_warning_days: 3,
                permit_validity_days: 7,
                deadline_warning_hours: 24,
                alert_check_interval_secs: 15,
                max_alert_age_hours: 24,
                summary_alert_cap: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected groq|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    weather: Option<WeatherPatch>,
    speech: Option<SpeechPatch>,
    proactive: Option<ProactivePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    fast_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    units: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechPatch {
    voice: Option<String>,
    wake_words: Option<Vec<String>>,
    listen_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProactivePatch {
    enabled: Option<bool>,
    poll_interval_secs: Option<u64>,
    weather_interval_secs: Option<u64>,
    permit_warning_days: Option<i64>,
    permit_validity_days: Option<i64>,
    deadline_warning_hours: Option<i64>,
    alert_check_interval_secs: Option<u64>,
    max_alert_age_hours: Option<i64>,
    summary_alert_cap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("haulvoice.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(fast_model) = llm.fast_model {
                self.llm.fast_model = Some(fast_model);
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(weather) = patch.weather {
            if let Some(weather_api_key_value) = weather.api_key {
                self.weather.api_key = Some(secret_value(weather_api_key_value));
            }
            if let Some(base_url) = weather.base_url {
                self.weather.base_url = base_url;
            }
            if let Some(units) = weather.units {
                self.weather.units = units;
            }
            if let Some(timeout_secs) = weather.timeout_secs {
                self.weather.timeout_secs = timeout_secs;
            }
        }

        if let Some(speech) = patch.speech {
            if let Some(voice) = speech.voice {
                self.speech.voice = voice;
            }
            if let Some(wake_words) = speech.wake_words {
                self.speech.wake_words = wake_words;
            }
            if let Some(listen_timeout_secs) = speech.listen_timeout_secs {
                self.speech.listen_timeout_secs = listen_timeout_secs;
            }
        }

        if let Some(proactive) = patch.proactive {
            if let Some(enabled) = proactive.enabled {
                self.proactive.enabled = enabled;
            }
            if let Some(poll_interval_secs) = proactive.poll_interval_secs {
                self.proactive.poll_interval_secs = poll_interval_secs;
            }
            if let Some(weather_interval_secs) = proactive.weather_interval_secs {
                self.proactive.weather_interval_secs = weather_interval_secs;
            }
            if let Some(permit_warning_days) = proactive.permit_warning_days {
                self.proactive.permit_warning_days = permit_warning_days;
            }
            if let Some(permit_validity_days) = proactive.permit_validity_days {
                self.proactive.permit_validity_days = permit_validity_days;
            }
            if let Some(deadline_warning_hours) = proactive.deadline_warning_hours {
                self.proactive.deadline_warning_hours = deadline_warning_hours;
            }
            if let Some(alert_check_interval_secs) = proactive.alert_check_interval_secs {
                self.proactive.alert_check_interval_secs = alert_check_interval_secs;
            }
            if let Some(max_alert_age_hours) = proactive.max_alert_age_hours {
                self.proactive.max_alert_age_hours = max_alert_age_hours;
            }
            if let Some(summary_alert_cap) = proactive.summary_alert_cap {
                self.proactive.summary_alert_cap = summary_alert_cap;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HAULVOICE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("HAULVOICE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("HAULVOICE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("HAULVOICE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("HAULVOICE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HAULVOICE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("HAULVOICE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("HAULVOICE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("HAULVOICE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("HAULVOICE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("HAULVOICE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HAULVOICE_WEATHER_API_KEY") {
            self.weather.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("HAULVOICE_WEATHER_BASE_URL") {
            self.weather.base_url = value;
        }

        if let Some(value) = read_env("HAULVOICE_PROACTIVE_ENABLED") {
            self.proactive.enabled = parse_bool("HAULVOICE_PROACTIVE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("HAULVOICE_PROACTIVE_POLL_INTERVAL_SECS") {
            self.proactive.poll_interval_secs =
                parse_u64("HAULVOICE_PROACTIVE_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("HAULVOICE_PROACTIVE_WEATHER_INTERVAL_SECS") {
            self.proactive.weather_interval_secs =
                parse_u64("HAULVOICE_PROACTIVE_WEATHER_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("HAULVOICE_PROACTIVE_PERMIT_WARNING_DAYS") {
            self.proactive.permit_warning_days =
                parse_i64("HAULVOICE_PROACTIVE_PERMIT_WARNING_DAYS", &value)?;
        }
        if let Some(value) = read_env("HAULVOICE_PROACTIVE_DEADLINE_WARNING_HOURS") {
            self.proactive.deadline_warning_hours =
                parse_i64("HAULVOICE_PROACTIVE_DEADLINE_WARNING_HOURS", &value)?;
        }

        let log_level =
            read_env("HAULVOICE_LOGGING_LEVEL").or_else(|| read_env("HAULVOICE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HAULVOICE_LOGGING_FORMAT").or_else(|| read_env("HAULVOICE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(weather_api_key) = overrides.weather_api_key {
            self.weather.api_key = Some(secret_value(weather_api_key));
        }
        if let Some(enabled) = overrides.proactive_enabled {
            self.proactive.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_weather(&self.weather, &self.proactive)?;
        validate_proactive(&self.proactive)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("haulvoice.toml"), PathBuf::from("config/haulvoice.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Groq | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for groq/openai providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_weather(weather: &WeatherConfig, proactive: &ProactiveConfig) -> Result<(), ConfigError> {
    if !proactive.enabled {
        return Ok(());
    }

    let missing = weather
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "weather.api_key is required while proactive monitoring is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_proactive(proactive: &ProactiveConfig) -> Result<(), ConfigError> {
    if !proactive.enabled {
        return Ok(());
    }

    if proactive.poll_interval_secs == 0 || proactive.weather_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "proactive poll and weather intervals must be greater than zero".to_string(),
        ));
    }

    if proactive.permit_validity_days <= 0 {
        return Err(ConfigError::Validation(
            "proactive.permit_validity_days must be greater than zero".to_string(),
        ));
    }

    if proactive.deadline_warning_hours <= 0 {
        return Err(ConfigError::Validation(
            "proactive.deadline_warning_hours must be greater than zero".to_string(),
        ));
    }

    if proactive.summary_alert_cap == 0 {
        return Err(ConfigError::Validation(
            "proactive.summary_alert_cap must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    fn loadable_overrides() -> ConfigOverrides {
        ConfigOverrides {
            llm_api_key: Some("gsk-test".to_string()),
            weather_api_key: Some("owm-test".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn defaults_cover_proactive_cadence() {
        let config = AppConfig::default();
        assert_eq!(config.proactive.poll_interval_secs, 120);
        assert_eq!(config.proactive.weather_interval_secs, 1800);
        assert_eq!(config.proactive.permit_warning_days, 3);
        assert_eq!(config.proactive.permit_validity_days, 7);
        assert_eq!(config.proactive.deadline_warning_hours, 24);
    }

    #[test]
    fn load_without_file_applies_overrides() {
        let config = AppConfig::load(LoadOptions {
            config_path: None,
            require_file: false,
            overrides: ConfigOverrides {
                database_url: Some(":memory:".to_string()),
                llm_model: Some("llama-guard".to_string()),
                ..loadable_overrides()
            },
        })
        .expect("default config should load");

        assert_eq!(config.database.url, ":memory:");
        assert_eq!(config.llm.model, "llama-guard");
        assert_eq!(config.llm.provider, LlmProvider::Groq);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            require_file: true,
            overrides: loadable_overrides(),
        })
        .expect_err("missing file should fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn patch_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[proactive]
poll_interval_secs = 5
permit_validity_days = 10

[logging]
level = "debug"
format = "json"
"#
        )
        .expect("write patch");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: loadable_overrides(),
        })
        .expect("patched config should load");

        assert_eq!(config.proactive.poll_interval_secs, 5);
        assert_eq!(config.proactive.permit_validity_days, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_llm_key_fails_validation() {
        let error = AppConfig::load(LoadOptions {
            config_path: None,
            require_file: false,
            overrides: ConfigOverrides {
                weather_api_key: Some("owm-test".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .expect_err("groq without api key should fail");

        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn disabled_monitoring_relaxes_weather_key() {
        let config = AppConfig::load(LoadOptions {
            config_path: None,
            require_file: false,
            overrides: ConfigOverrides {
                llm_api_key: Some("gsk-test".to_string()),
                proactive_enabled: Some(false),
                ..ConfigOverrides::default()
            },
        })
        .expect("weather key optional when monitoring disabled");

        assert!(!config.proactive.enabled);
        assert!(config.weather.api_key.is_none());
    }
}
