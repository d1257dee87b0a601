use haulvoice_core::config::{AppConfig, LoadOptions};
use secrecy::SecretString;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render("database.url", &config.database.url),
        render("database.max_connections", &config.database.max_connections.to_string()),
        render("llm.provider", &format!("{:?}", config.llm.provider).to_lowercase()),
        render("llm.model", &config.llm.model),
        render("llm.base_url", config.llm.base_url.as_deref().unwrap_or("(unset)")),
        render("llm.api_key", &redact(config.llm.api_key.as_ref())),
        render("weather.base_url", &config.weather.base_url),
        render("weather.api_key", &redact(config.weather.api_key.as_ref())),
        render("speech.voice", &config.speech.voice),
        render("speech.wake_words", &config.speech.wake_words.join(", ")),
        render("proactive.enabled", &config.proactive.enabled.to_string()),
        render(
            "proactive.poll_interval_secs",
            &config.proactive.poll_interval_secs.to_string(),
        ),
        render(
            "proactive.weather_interval_secs",
            &config.proactive.weather_interval_secs.to_string(),
        ),
        render(
            "proactive.permit_warning_days",
            &config.proactive.permit_warning_days.to_string(),
        ),
        render(
            "proactive.permit_validity_days",
            &config.proactive.permit_validity_days.to_string(),
        ),
        render(
            "proactive.deadline_warning_hours",
            &config.proactive.deadline_warning_hours.to_string(),
        ),
        render("logging.level", &config.logging.level),
        render("logging.format", &format!("{:?}", config.logging.format).to_lowercase()),
    ];

    lines.join("\n")
}

fn render(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "(unset)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{redact, render};

    #[test]
    fn secrets_never_render_their_value() {
        assert_eq!(redact(Some(&"gsk-super-secret".to_string().into())), "<redacted>");
        assert_eq!(redact(None), "(unset)");
    }

    #[test]
    fn lines_are_key_value_formatted() {
        assert_eq!(render("llm.model", "llama-3.3-70b-versatile"), "  llm.model = llama-3.3-70b-versatile");
    }
}
