use haulvoice_core::config::{AppConfig, LlmProvider, LoadOptions};
use haulvoice_db::connect_with_settings;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            None
        }
    };

    match &config {
        Some(config) => {
            checks.push(database_check(config));
            checks.push(llm_check(config));
            checks.push(weather_check(config));
        }
        None => {
            for name in ["db_connectivity", "llm_readiness", "weather_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped: configuration failed to load".to_string(),
                });
            }
        }
    }

    let overall_status = if checks.iter().any(|check| check.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    };
    let summary = match overall_status {
        CheckStatus::Pass => "all checks passed".to_string(),
        _ => "one or more checks failed".to_string(),
    };

    DoctorReport { overall_status, summary, checks }
}

fn database_check(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "db_connectivity",
                status: CheckStatus::Fail,
                details: format!("runtime init failed: {error}"),
            };
        }
    };

    let outcome = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await?;
        sqlx_ping(&pool).await?;
        pool.close().await;
        Ok::<(), sqlx::Error>(())
    });

    match outcome {
        Ok(()) => DoctorCheck {
            name: "db_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected to {}", config.database.url),
        },
        Err(error) => DoctorCheck {
            name: "db_connectivity",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn sqlx_ping(pool: &haulvoice_db::DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

fn llm_check(config: &AppConfig) -> DoctorCheck {
    let ready = match config.llm.provider {
        LlmProvider::Groq | LlmProvider::OpenAi => config.llm.api_key.is_some(),
        LlmProvider::Ollama => config.llm.base_url.is_some(),
    };

    DoctorCheck {
        name: "llm_readiness",
        status: if ready { CheckStatus::Pass } else { CheckStatus::Fail },
        details: format!(
            "provider {:?} with model {}",
            config.llm.provider, config.llm.model
        ),
    }
}

fn weather_check(config: &AppConfig) -> DoctorCheck {
    if !config.proactive.enabled {
        return DoctorCheck {
            name: "weather_readiness",
            status: CheckStatus::Skipped,
            details: "proactive monitoring disabled".to_string(),
        };
    }

    DoctorCheck {
        name: "weather_readiness",
        status: if config.weather.api_key.is_some() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        },
        details: format!("weather endpoint {}", config.weather.base_url),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![format!("doctor: {}", report.summary)];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
