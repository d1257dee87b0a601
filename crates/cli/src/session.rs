use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::{Local, Timelike};
use tracing::{error, info};

use haulvoice_agent::conversation::{ConversationLog, ResponseGenerator};
use haulvoice_agent::llm::{HttpLlmClient, LlmClient};
use haulvoice_agent::permits::PermitAssistant;
use haulvoice_agent::router::{IntentRouter, TargetSystem};
use haulvoice_agent::speech::{ConsoleChannel, Utterance, VoiceChannel};
use haulvoice_agent::states::StateInfoAssistant;
use haulvoice_core::config::AppConfig;
use haulvoice_core::context::OrderContext;
use haulvoice_core::domain::user::{Role, UserProfile};
use haulvoice_core::errors::ApplicationError;
use haulvoice_core::keywords::{contains_any, PROACTIVE_STATUS_KEYWORDS};
use haulvoice_db::{
    connect_from_config, migrations, OrderStore, SqlOrderStore, SqlStateStore, StateStore,
};
use haulvoice_monitor::{
    MonitorSettings, OpenWeatherClient, ProactiveMonitor, SessionUser, WeatherClient,
};

const MAX_PROMPT_ATTEMPTS: u32 = 5;
const MAX_CONSECUTIVE_SILENCE: u32 = 10;

/// Wire up stores, capabilities, and the proactive monitor, then run the
/// interactive loop on the console voice channel.
pub async fn run(
    config: AppConfig,
    role_arg: Option<String>,
    email_arg: Option<String>,
) -> Result<()> {
    let pool = connect_from_config(&config.database).await?;
    migrations::run_pending(&pool).await?;

    let store: Arc<dyn OrderStore> = Arc::new(SqlOrderStore::new(pool.clone()));
    let states: Arc<dyn StateStore> = Arc::new(SqlStateStore::new(pool));
    let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::from_config(&config.llm)?);
    let voice = ConsoleChannel::new();

    let role = resolve_role(role_arg, &voice).await?;
    let email = resolve_email(role, email_arg, store.as_ref(), &voice).await?;
    let profile = store
        .find_user_profile(role, &email)
        .await?
        .ok_or_else(|| anyhow!("no {role} profile found for {email}"))?;

    let session_id = uuid::Uuid::new_v4();
    info!(session_id = %session_id, role = %role, "session authenticated");

    let weather: Option<Arc<dyn WeatherClient>> = match OpenWeatherClient::from_config(&config.weather) {
        Ok(client) => Some(Arc::new(client)),
        Err(_) => None,
    };

    let monitor = match (config.proactive.enabled, &weather) {
        (true, Some(weather)) => {
            let monitor = Arc::new(ProactiveMonitor::new(
                store.clone(),
                weather.clone(),
                llm.clone(),
                SessionUser { role, email: email.clone() },
                MonitorSettings::from_config(&config.proactive),
            ));
            monitor.start();
            info!("proactive monitoring enabled");
            Some(monitor)
        }
        _ => None,
    };

    voice.speak(&format!("Welcome {role}, I'm ready to assist you")).await?;

    let mut session = Session::new(
        profile,
        ResponseGenerator::new(store.clone(), llm.clone()),
        PermitAssistant::new(store, llm.clone(), config.llm.fast_model.clone()),
        StateInfoAssistant::new(states, llm, config.llm.fast_model.clone()),
        monitor,
        weather,
        config.speech.wake_words.clone(),
        Duration::from_secs(config.proactive.alert_check_interval_secs),
    );
    session.run(&voice).await
}

async fn resolve_role(role_arg: Option<String>, voice: &dyn VoiceChannel) -> Result<Role> {
    if let Some(role) = role_arg {
        return role.parse::<Role>().map_err(|error| anyhow!(error));
    }

    for _ in 0..MAX_PROMPT_ATTEMPTS {
        voice.speak("Please enter your role (Admin/Client/Driver):").await?;
        if let Utterance::Recognized(text) = voice.listen().await {
            match text.parse::<Role>() {
                Ok(role) => return Ok(role),
                Err(_) => {
                    voice.speak("Invalid role. Please enter Admin, Client, or Driver.").await?;
                }
            }
        }
    }

    Err(anyhow!("no valid role provided"))
}

async fn resolve_email(
    role: Role,
    email_arg: Option<String>,
    store: &dyn OrderStore,
    voice: &dyn VoiceChannel,
) -> Result<String> {
    if role.is_admin() {
        return Ok("admin".to_string());
    }

    if let Some(email) = email_arg {
        if store.verify_email(role, &email).await? {
            return Ok(email);
        }
        return Err(anyhow!("email {email} not found for role {role}"));
    }

    for _ in 0..MAX_PROMPT_ATTEMPTS {
        voice.speak(&format!("Please provide your email ID ({role}):")).await?;
        if let Utterance::Recognized(email) = voice.listen().await {
            if store.verify_email(role, &email).await? {
                return Ok(email);
            }
            voice.speak("Email not found. Please provide a valid email ID.").await?;
        }
    }

    Err(anyhow!("no valid email provided"))
}

/// One authenticated interactive session: wake-word handling, proactive
/// alert delivery between turns, and routing into the order, permit, and
/// state subsystems.
pub struct Session {
    profile: UserProfile,
    context: OrderContext,
    router: IntentRouter,
    generator: ResponseGenerator,
    permits: PermitAssistant,
    state_info: StateInfoAssistant,
    monitor: Option<Arc<ProactiveMonitor>>,
    weather: Option<Arc<dyn WeatherClient>>,
    log: ConversationLog,
    wake_words: Vec<String>,
    alert_check_interval: Duration,
    last_alert_check: Instant,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile: UserProfile,
        generator: ResponseGenerator,
        permits: PermitAssistant,
        state_info: StateInfoAssistant,
        monitor: Option<Arc<ProactiveMonitor>>,
        weather: Option<Arc<dyn WeatherClient>>,
        wake_words: Vec<String>,
        alert_check_interval: Duration,
    ) -> Self {
        let context = OrderContext::new(profile.role);
        Self {
            profile,
            context,
            router: IntentRouter::new(),
            generator,
            permits,
            state_info,
            monitor,
            weather,
            log: ConversationLog::new(),
            wake_words,
            alert_check_interval,
            last_alert_check: Instant::now(),
        }
    }

    pub fn conversation_log(&self) -> &ConversationLog {
        &self.log
    }

    pub async fn run(&mut self, voice: &dyn VoiceChannel) -> Result<()> {
        voice.speak(greeting_for_hour(Local::now().hour())).await?;

        let mut silent_turns = 0u32;
        loop {
            if self.monitor.is_some() && self.last_alert_check.elapsed() >= self.alert_check_interval
            {
                self.deliver_proactive_alerts(false, voice).await;
                self.last_alert_check = Instant::now();
            }

            let raw = match voice.listen().await {
                Utterance::Recognized(text) => {
                    silent_turns = 0;
                    text
                }
                Utterance::Silence => {
                    silent_turns += 1;
                    if silent_turns >= MAX_CONSECUTIVE_SILENCE {
                        break;
                    }
                    continue;
                }
            };

            let query = self.strip_wake_word(&raw);
            if query.is_empty() {
                let response = "Yes, how can I help you?";
                voice.speak(response).await?;
                self.log.save("Wake word detected", response);
                continue;
            }

            match self.process_command(&query, voice).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(loop_error) => {
                    error!(error = %loop_error, "error in main session loop");
                    let apology = ApplicationError::Integration(loop_error.to_string())
                        .into_interface("main-loop");
                    let _ = voice.speak(apology.user_message()).await;
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.stop();
        }
        Ok(())
    }

    fn strip_wake_word(&self, raw: &str) -> String {
        let mut words = raw.split_whitespace();
        let Some(first) = words.next() else {
            return String::new();
        };

        if self.wake_words.iter().any(|wake| wake.eq_ignore_ascii_case(first)) {
            words.collect::<Vec<_>>().join(" ")
        } else {
            raw.trim().to_string()
        }
    }

    /// Handle one utterance. Returns false when the session should end.
    async fn process_command(&mut self, query: &str, voice: &dyn VoiceChannel) -> Result<bool> {
        let query_lower = query.to_ascii_lowercase();

        if query_lower.contains("ok bye") {
            let farewell = farewell_for_hour(Local::now().hour());
            voice.speak(farewell).await?;
            self.log.save(query, farewell);
            if let Some(monitor) = &self.monitor {
                monitor.stop();
            }
            return Ok(false);
        }

        if contains_any(&query_lower, PROACTIVE_STATUS_KEYWORDS) {
            self.deliver_proactive_alerts(true, voice).await;
            return Ok(true);
        }

        if query_lower.contains("weather of") || query_lower.contains("weather in") {
            self.answer_city_weather(query, &query_lower, voice).await;
            return Ok(true);
        }

        if ["weather", "temperature", "how hot", "how cold"]
            .iter()
            .any(|phrase| query_lower.contains(phrase))
        {
            voice.speak("Please specify a city for the weather information.").await?;
            return Ok(true);
        }

        let routed = self.router.route(query, self.context.current_order_id());
        if let Some(ack) = &routed.spoken_ack {
            voice.speak(ack).await?;
        }

        match routed.target {
            TargetSystem::OrderQuery => {
                let response = self
                    .generator
                    .respond(query, &self.profile, &mut self.context, voice)
                    .await;
                if response.is_empty() {
                    self.log.save(query, "(spoken order answer)");
                } else {
                    voice.speak(&response).await?;
                    self.log.save(query, response);
                }
                Ok(true)
            }
            TargetSystem::Orders => Ok(true),
            target => self.run_subsystem(target, Some(query.to_string()), voice).await,
        }
    }

    /// Chain between permit and state subsystems until control returns to
    /// orders or the user exits.
    async fn run_subsystem(
        &mut self,
        mut target: TargetSystem,
        mut initial_query: Option<String>,
        voice: &dyn VoiceChannel,
    ) -> Result<bool> {
        loop {
            target = match target {
                TargetSystem::StateInfo => {
                    self.state_info.run_session(initial_query.take(), voice).await
                }
                TargetSystem::PermitInfo => match self.context.current_order_id() {
                    Some(order_id) => {
                        initial_query = None;
                        self.permits.run_session(order_id, voice).await
                    }
                    None => {
                        voice
                            .speak("Please select an order first before checking permits.")
                            .await?;
                        return Ok(true);
                    }
                },
                TargetSystem::Exit => {
                    voice.speak("Goodbye!").await?;
                    return Ok(false);
                }
                TargetSystem::Orders | TargetSystem::OrderQuery => return Ok(true),
            };
        }
    }

    async fn answer_city_weather(
        &mut self,
        query: &str,
        query_lower: &str,
        voice: &dyn VoiceChannel,
    ) {
        let separator =
            if query_lower.contains("weather of") { "weather of" } else { "weather in" };
        let city = query_lower.split(separator).last().unwrap_or("").trim().to_string();

        if city.is_empty() {
            let _ = voice.speak("Please specify a city for the weather information.").await;
            return;
        }

        let _ = voice.speak(&format!("Checking the weather in {city}.")).await;

        let Some(weather) = &self.weather else {
            let _ = voice.speak("Weather lookups are not configured.").await;
            return;
        };

        match weather.weather_for_city(&city).await {
            Ok(description) => {
                let _ = voice.speak(&description).await;
                self.log.save(query, description);
            }
            Err(_) => {
                let _ = voice
                    .speak(&format!("Unable to fetch weather information for {city}."))
                    .await;
            }
        }
    }

    async fn deliver_proactive_alerts(&mut self, force: bool, voice: &dyn VoiceChannel) {
        let Some(monitor) = &self.monitor else {
            if force {
                let _ = voice.speak("Proactive monitoring is not enabled.").await;
            }
            return;
        };

        if !monitor.has_alerts().await {
            if force {
                let _ = voice
                    .speak("No new updates or alerts at the moment. Everything looks good.")
                    .await;
                self.log.save("Status check", "No new updates.");
            }
            return;
        }

        match monitor.generate_summary().await {
            Some(summary) => {
                let _ = voice.speak(&summary).await;
                self.log.save("Proactive notification", summary);
                for alert in monitor.get_pending_alerts().await {
                    monitor.mark_delivered(alert.seq).await;
                }
            }
            None => {
                if force {
                    let _ = voice.speak("No new updates or alerts at the moment.").await;
                }
            }
        }
    }
}

fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        6..=11 => "Good morning, how may I assist you?",
        12..=15 => "Good afternoon, how may I assist you?",
        16..=20 => "Good evening, how may I assist you?",
        _ => "Hello, how may I assist you?",
    }
}

fn farewell_for_hour(hour: u32) -> &'static str {
    if hour >= 21 || hour < 6 {
        "Good night, take care!"
    } else {
        "Have a good day!"
    }
}
