use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use haulvoice_agent::llm::{ChatMessage, ChatParams, LlmClient};
use haulvoice_core::config::ProactiveConfig;
use haulvoice_core::domain::alert::{Alert, AlertKind, AlertPriority};
use haulvoice_core::domain::order::parse_flexible_date;
use haulvoice_core::domain::user::Role;
use haulvoice_core::keywords::is_severe_weather;
use haulvoice_db::{OrderStore, RepositoryError};

use crate::weather::WeatherClient;

const FAST_LOOP_BACKOFF: Duration = Duration::from_secs(10);
const SLOW_LOOP_BACKOFF: Duration = Duration::from_secs(60);
const WEATHER_STARTUP_DELAY: Duration = Duration::from_secs(30);
const SUMMARY_MAX_TOKENS: u32 = 200;

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a proactive voice assistant for heavy haul logistics. \
     Summarize the following alerts into a brief, natural spoken notification. \
     Prioritize critical alerts. Keep it concise — under 3 sentences if possible. \
     Start with 'I have an update for you.' or similar attention-getting phrase. \
     Do not use bullet points or formatting — this will be spoken aloud.";

#[derive(Clone, Debug)]
pub struct SessionUser {
    pub role: Role,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub weather_interval: Duration,
    pub permit_warning_days: i64,
    /// Estimated validity window applied to a route's attachment date when
    /// no explicit expiry exists.
    pub permit_validity_days: i64,
    pub deadline_warning_hours: i64,
    pub max_alert_age_hours: i64,
    pub summary_alert_cap: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(120),
            weather_interval: Duration::from_secs(1800),
            permit_warning_days: 3,
            permit_validity_days: 7,
            deadline_warning_hours: 24,
            max_alert_age_hours: 24,
            summary_alert_cap: 5,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &ProactiveConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            weather_interval: Duration::from_secs(config.weather_interval_secs),
            permit_warning_days: config.permit_warning_days,
            permit_validity_days: config.permit_validity_days,
            deadline_warning_hours: config.deadline_warning_hours,
            max_alert_age_hours: config.max_alert_age_hours,
            summary_alert_cap: config.summary_alert_cap,
        }
    }
}

#[derive(Default)]
struct MonitorState {
    queue: Vec<Alert>,
    next_seq: u64,
    delivered_keys: HashSet<String>,
    last_statuses: HashMap<i64, String>,
    last_order_ids: HashSet<i64>,
    warned_permits: HashSet<String>,
    warned_deadlines: HashSet<i64>,
}

impl MonitorState {
    /// Queue an alert unless its logical event was already delivered this
    /// session. `seq` is assigned here, so queue order is the stable
    /// tie-break for equal priorities.
    fn enqueue(
        &mut self,
        kind: AlertKind,
        priority: AlertPriority,
        title: String,
        message: String,
        order_id: Option<i64>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        let alert = Alert {
            seq: self.next_seq,
            kind,
            priority,
            title,
            message,
            order_id,
            metadata,
            created_at: Utc::now(),
            delivered: false,
        };

        if self.delivered_keys.contains(&alert.dedup_key()) {
            return;
        }

        info!(
            priority = alert.priority.label(),
            title = %alert.title,
            "proactive alert queued"
        );
        self.next_seq += 1;
        self.queue.push(alert);
    }
}

/// Background monitor for one authenticated session.
///
/// `start` spawns two supervised loops: the fast loop polls orders,
/// permits, and deadlines against a remembered snapshot; the slow loop
/// checks route weather. State is session-scoped and discarded on drop.
pub struct ProactiveMonitor {
    settings: MonitorSettings,
    user: SessionUser,
    store: Arc<dyn OrderStore>,
    weather: Arc<dyn WeatherClient>,
    llm: Arc<dyn LlmClient>,
    state: Mutex<MonitorState>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl ProactiveMonitor {
    pub fn new(
        store: Arc<dyn OrderStore>,
        weather: Arc<dyn WeatherClient>,
        llm: Arc<dyn LlmClient>,
        user: SessionUser,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            settings,
            user,
            store,
            weather,
            llm,
            state: Mutex::new(MonitorState::default()),
            tasks: StdMutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Start both background loops. Idempotent: a second call while
    /// running is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("proactive monitor already running");
            return;
        }

        let fast = tokio::spawn(Self::monitor_loop(self.clone()));
        let slow = tokio::spawn(Self::weather_loop(self.clone()));
        self.tasks.lock().expect("monitor task registry").extend([fast, slow]);

        info!(
            poll_secs = self.settings.poll_interval.as_secs(),
            weather_secs = self.settings.weather_interval.as_secs(),
            "proactive monitor started"
        );
    }

    /// Cancel both loops. Cancellation is a clean exit for the tasks.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        for task in self.tasks.lock().expect("monitor task registry").drain(..) {
            task.abort();
        }
        info!("proactive monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Delivery API ─────────────────────────────────────────────────────

    pub async fn has_alerts(&self) -> bool {
        self.state.lock().await.queue.iter().any(|alert| !alert.delivered)
    }

    /// Undelivered alerts, highest priority first; equal priorities keep
    /// queue order.
    pub async fn get_pending_alerts(&self) -> Vec<Alert> {
        let state = self.state.lock().await;
        let mut pending: Vec<Alert> =
            state.queue.iter().filter(|alert| !alert.delivered).cloned().collect();
        pending.sort_by_key(Alert::sort_key);
        pending
    }

    /// Mark an alert delivered and remember its dedup key. Idempotent.
    pub async fn mark_delivered(&self, seq: u64) {
        let mut state = self.state.lock().await;
        let Some(alert) = state.queue.iter_mut().find(|alert| alert.seq == seq) else {
            return;
        };
        alert.delivered = true;
        let key = alert.dedup_key();
        state.delivered_keys.insert(key);
    }

    /// Drop delivered alerts older than the configured age. Their dedup
    /// keys remain recorded.
    pub async fn clear_old_alerts(&self) {
        let cutoff = Utc::now() - chrono::Duration::hours(self.settings.max_alert_age_hours);
        let mut state = self.state.lock().await;
        state.queue.retain(|alert| !alert.delivered || alert.created_at > cutoff);
    }

    /// Compose a short spoken summary of the highest-priority pending
    /// alerts. Falls back to the top alert's raw message when the LLM is
    /// unavailable; None when nothing is pending.
    pub async fn generate_summary(&self) -> Option<String> {
        let pending = self.get_pending_alerts().await;
        if pending.is_empty() {
            return None;
        }

        let descriptions: Vec<String> = pending
            .iter()
            .take(self.settings.summary_alert_cap)
            .enumerate()
            .map(|(i, alert)| format!("{}. [{}] {}", i + 1, alert.priority.label(), alert.message))
            .collect();

        let messages = [
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Summarize these alerts for the {}:\n{}",
                self.user.role,
                descriptions.join("\n")
            )),
        ];
        let params =
            ChatParams { max_tokens: Some(SUMMARY_MAX_TOKENS), ..ChatParams::default() };

        match self.llm.complete(&messages, &params).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
            Ok(_) => None,
            Err(llm_error) => {
                error!(error = %llm_error, "proactive summary generation failed");
                pending.first().map(|alert| alert.message.clone())
            }
        }
    }

    // ── Background loops ─────────────────────────────────────────────────

    async fn monitor_loop(self: Arc<Self>) {
        // Cold start: remember current state without alerting, so session
        // startup does not replay history as an alert storm.
        self.take_initial_snapshot().await;

        while self.is_running() {
            tokio::time::sleep(self.settings.poll_interval).await;
            if !self.is_running() {
                break;
            }

            if let Err(cycle_error) = self.run_fast_cycle().await {
                error!(error = %cycle_error, "error in proactive monitor loop");
                tokio::time::sleep(FAST_LOOP_BACKOFF).await;
            }
        }
    }

    async fn weather_loop(self: Arc<Self>) {
        tokio::time::sleep(WEATHER_STARTUP_DELAY).await;

        while self.is_running() {
            match self.check_route_weather().await {
                Ok(()) => tokio::time::sleep(self.settings.weather_interval).await,
                Err(weather_error) => {
                    error!(error = %weather_error, "error in weather monitor loop");
                    tokio::time::sleep(SLOW_LOOP_BACKOFF).await;
                }
            }
        }
    }

    /// One fast-loop cycle: the detection phases run strictly in sequence,
    /// each isolated so a failing phase never starves the rest.
    async fn run_fast_cycle(&self) -> Result<(), RepositoryError> {
        let mut first_error = None;

        for (phase, result) in [
            ("order_status", self.check_order_status_changes().await),
            ("new_orders", self.check_new_order_assignments().await),
            ("permits", self.check_permit_expirations().await),
            ("deadlines", self.check_delivery_deadlines().await),
        ] {
            if let Err(phase_error) = result {
                warn!(phase, error = %phase_error, "monitor detection phase failed");
                first_error.get_or_insert(phase_error);
            }
        }

        self.clear_old_alerts().await;
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn visible_order_ids(&self) -> Result<Vec<i64>, RepositoryError> {
        self.store.find_user_order_ids(self.user.role, &self.user.email).await
    }

    // ── Initial snapshot ─────────────────────────────────────────────────

    async fn take_initial_snapshot(&self) {
        let order_ids = match self.visible_order_ids().await {
            Ok(order_ids) => order_ids,
            Err(snapshot_error) => {
                error!(error = %snapshot_error, "error taking initial snapshot");
                return;
            }
        };

        let mut statuses = HashMap::new();
        for &order_id in &order_ids {
            if let Ok(Some(document)) = self.store.find_order_by_id(order_id).await {
                statuses.insert(order_id, document.order.status_label().to_string());
            }
        }

        let mut state = self.state.lock().await;
        state.last_order_ids = order_ids.iter().copied().collect();
        state.last_statuses = statuses;
        info!(orders = order_ids.len(), "proactive monitor took initial snapshot");
    }

    // ── Detection phases ─────────────────────────────────────────────────

    async fn check_order_status_changes(&self) -> Result<(), RepositoryError> {
        let order_ids = self.visible_order_ids().await?;

        for order_id in order_ids {
            let Some(document) = self.store.find_order_by_id(order_id).await? else {
                continue;
            };
            let current_status = document.order.status_label().to_string();

            // Alert and snapshot update happen under one lock hold, so a
            // suspend can never observe the phase half-applied.
            let mut state = self.state.lock().await;
            if let Some(previous_status) = state.last_statuses.get(&order_id).cloned() {
                if previous_status != current_status {
                    let metadata = metadata([
                        ("old_status", serde_json::json!(previous_status)),
                        ("new_status", serde_json::json!(current_status)),
                    ]);
                    state.enqueue(
                        AlertKind::OrderStatus,
                        AlertPriority::High,
                        format!("Order {order_id} status changed"),
                        format!(
                            "Heads up! Order {order_id} status has changed from \
                             {previous_status} to {current_status}."
                        ),
                        Some(order_id),
                        metadata,
                    );
                }
            }
            // Stored even on first observation, establishing the baseline
            // for the next cycle.
            state.last_statuses.insert(order_id, current_status);
        }

        Ok(())
    }

    async fn check_new_order_assignments(&self) -> Result<(), RepositoryError> {
        let current_ids: HashSet<i64> = self.visible_order_ids().await?.into_iter().collect();

        let mut state = self.state.lock().await;
        let mut new_ids: Vec<i64> = current_ids.difference(&state.last_order_ids).copied().collect();
        new_ids.sort_unstable();

        for order_id in new_ids {
            state.enqueue(
                AlertKind::NewOrder,
                AlertPriority::Medium,
                format!("New order {order_id} assigned"),
                format!(
                    "You have a new order assignment! Order {order_id} has been assigned \
                     to you. Would you like me to show you the details?"
                ),
                Some(order_id),
                serde_json::Map::new(),
            );
        }
        state.last_order_ids = current_ids;

        Ok(())
    }

    async fn check_permit_expirations(&self) -> Result<(), RepositoryError> {
        let order_ids = self.visible_order_ids().await?;
        let now = Utc::now().naive_utc();

        for order_id in order_ids {
            let Some(document) = self.store.find_order_by_id(order_id).await? else {
                continue;
            };

            let mut state = self.state.lock().await;
            for route in &document.order.routes {
                let state_name = route.state_label().to_string();
                let permit_key = format!("{order_id}_{state_name}");
                if state.warned_permits.contains(&permit_key) {
                    continue;
                }

                if let Some(attached_at) =
                    route.attached_at.as_deref().and_then(parse_flexible_date)
                {
                    let estimated_expiry =
                        attached_at + chrono::Duration::days(self.settings.permit_validity_days);
                    let days_until_expiry =
                        (estimated_expiry - now).num_seconds().div_euclid(86_400);

                    if days_until_expiry < 0 {
                        let days_expired = -days_until_expiry;
                        let metadata = metadata([
                            ("state", serde_json::json!(state_name)),
                            ("days_expired", serde_json::json!(days_expired)),
                        ]);
                        state.enqueue(
                            AlertKind::PermitExpired,
                            AlertPriority::Critical,
                            format!("Permit expired: {state_name}"),
                            format!(
                                "Alert! The permit for {state_name} on order {order_id} \
                                 appears to have expired {days_expired} days ago. Please \
                                 verify and renew if needed."
                            ),
                            Some(order_id),
                            metadata,
                        );
                        state.warned_permits.insert(permit_key.clone());
                    } else if days_until_expiry <= self.settings.permit_warning_days {
                        let plural = if days_until_expiry == 1 { "" } else { "s" };
                        let metadata = metadata([
                            ("state", serde_json::json!(state_name)),
                            ("days_remaining", serde_json::json!(days_until_expiry)),
                        ]);
                        state.enqueue(
                            AlertKind::PermitExpiring,
                            AlertPriority::High,
                            format!("Permit expiring: {state_name}"),
                            format!(
                                "Reminder: The permit for {state_name} on order {order_id} \
                                 is expiring in {days_until_expiry} day{plural}. Please \
                                 ensure it's renewed on time."
                            ),
                            Some(order_id),
                            metadata,
                        );
                        state.warned_permits.insert(permit_key.clone());
                    }
                }

                // A troubled permit status alerts independently of the
                // expiry estimate, still capped at one alert per route key.
                if route.has_permit_issue() && !state.warned_permits.contains(&permit_key) {
                    let permit_status = route.permit_status.clone().unwrap_or_default();
                    let metadata = metadata([
                        ("state", serde_json::json!(state_name)),
                        ("status", serde_json::json!(permit_status)),
                    ]);
                    state.enqueue(
                        AlertKind::PermitIssue,
                        AlertPriority::Critical,
                        format!("Permit issue: {state_name}"),
                        format!(
                            "Alert! The permit for {state_name} on order {order_id} has \
                             status: {permit_status}. This needs immediate attention."
                        ),
                        Some(order_id),
                        metadata,
                    );
                    state.warned_permits.insert(permit_key);
                }
            }
        }

        Ok(())
    }

    async fn check_delivery_deadlines(&self) -> Result<(), RepositoryError> {
        let order_ids = self.visible_order_ids().await?;
        let now = Utc::now().naive_utc();

        for order_id in order_ids {
            if self.state.lock().await.warned_deadlines.contains(&order_id) {
                continue;
            }
            let Some(document) = self.store.find_order_by_id(order_id).await? else {
                continue;
            };

            let mut state = self.state.lock().await;
            for date_value in document.order.deadline_candidates().into_iter().flatten() {
                let Some(deadline) = parse_flexible_date(date_value) else {
                    continue;
                };

                let hours_remaining = (deadline - now).num_seconds() as f64 / 3600.0;

                if hours_remaining > 0.0
                    && hours_remaining <= self.settings.deadline_warning_hours as f64
                {
                    let hours_int = hours_remaining as i64;
                    let metadata = metadata([
                        ("deadline", serde_json::json!(deadline.to_string())),
                        ("hours_remaining", serde_json::json!(hours_int)),
                    ]);
                    state.enqueue(
                        AlertKind::DeadlineApproaching,
                        AlertPriority::High,
                        format!("Deadline: Order {order_id}"),
                        format!(
                            "Reminder: Order {order_id} has a delivery deadline in \
                             approximately {hours_int} hours. Scheduled for {}.",
                            format_deadline(&deadline)
                        ),
                        Some(order_id),
                        metadata,
                    );
                    state.warned_deadlines.insert(order_id);
                    break;
                } else if hours_remaining <= 0.0 && !document.order.is_terminal() {
                    let status = document.order.status_label().to_string();
                    let metadata = metadata([
                        ("deadline", serde_json::json!(deadline.to_string())),
                        ("status", serde_json::json!(status)),
                    ]);
                    state.enqueue(
                        AlertKind::DeadlineOverdue,
                        AlertPriority::Critical,
                        format!("Overdue: Order {order_id}"),
                        format!(
                            "Alert! Order {order_id} appears to be overdue. The deadline \
                             was {}. Current status: {status}.",
                            format_deadline(&deadline)
                        ),
                        Some(order_id),
                        metadata,
                    );
                    state.warned_deadlines.insert(order_id);
                    break;
                }
            }
        }

        Ok(())
    }

    async fn check_route_weather(&self) -> Result<(), RepositoryError> {
        let order_ids = self.visible_order_ids().await?;

        for order_id in order_ids {
            let Some(document) = self.store.find_order_by_id(order_id).await? else {
                continue;
            };
            if document.order.is_inactive() {
                continue;
            }

            for city in document.order.route_cities() {
                let weather_key = format!("weather_{order_id}_{city}");
                if self.state.lock().await.delivered_keys.contains(&weather_key) {
                    continue;
                }

                // A failed lookup for one city never aborts the sweep.
                let description = match self.weather.weather_for_city(&city).await {
                    Ok(description) => description,
                    Err(weather_error) => {
                        debug!(error = %weather_error, city = %city, "weather lookup failed");
                        continue;
                    }
                };
                if !is_severe_weather(&description) {
                    continue;
                }

                let mut state = self.state.lock().await;
                if state.delivered_keys.contains(&weather_key) {
                    continue;
                }
                let metadata = metadata([
                    ("city", serde_json::json!(city)),
                    ("weather", serde_json::json!(description)),
                ]);
                state.enqueue(
                    AlertKind::WeatherAlert,
                    AlertPriority::Critical,
                    format!("Severe weather: {city}"),
                    format!(
                        "Weather alert for your route! Severe conditions detected near \
                         {city} on order {order_id}. {description} Please exercise caution."
                    ),
                    Some(order_id),
                    metadata,
                );
                state.delivered_keys.insert(weather_key);
            }
        }

        Ok(())
    }
}

fn format_deadline(deadline: &NaiveDateTime) -> String {
    deadline.format("%B %d at %I:%M %p").to_string()
}

fn metadata<const N: usize>(
    pairs: [(&str, serde_json::Value); N],
) -> serde_json::Map<String, serde_json::Value> {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use haulvoice_agent::llm::ScriptedLlm;
    use haulvoice_core::domain::alert::{AlertKind, AlertPriority};
    use haulvoice_core::domain::order::{Order, OrderDocument, Route};
    use haulvoice_core::domain::user::{Role, UserProfile};
    use haulvoice_db::InMemoryOrderStore;

    use crate::weather::ScriptedWeather;

    use super::{MonitorSettings, ProactiveMonitor, SessionUser};

    const DRIVER_EMAIL: &str = "jo@example.com";

    fn open_order(id: i64) -> OrderDocument {
        OrderDocument {
            id,
            order: Order { order_status: Some("Open".to_string()), ..Order::default() },
        }
    }

    fn driver_store(documents: Vec<OrderDocument>) -> Arc<InMemoryOrderStore> {
        let order_ids: Vec<i64> = documents.iter().map(|doc| doc.id).collect();
        let store = InMemoryOrderStore::with_orders(documents);
        store.insert_profile(UserProfile {
            role: Role::Driver,
            name: "Jo Hauler".to_string(),
            email: DRIVER_EMAIL.to_string(),
            phone: None,
            order_ids,
        });
        Arc::new(store)
    }

    fn monitor_over(store: Arc<InMemoryOrderStore>) -> Arc<ProactiveMonitor> {
        monitor_with(store, Arc::new(ScriptedWeather::clear_everywhere()), Arc::new(ScriptedLlm::default()))
    }

    fn monitor_with(
        store: Arc<InMemoryOrderStore>,
        weather: Arc<ScriptedWeather>,
        llm: Arc<ScriptedLlm>,
    ) -> Arc<ProactiveMonitor> {
        Arc::new(ProactiveMonitor::new(
            store,
            weather,
            llm,
            SessionUser { role: Role::Driver, email: DRIVER_EMAIL.to_string() },
            MonitorSettings {
                poll_interval: Duration::from_millis(10),
                weather_interval: Duration::from_millis(10),
                ..MonitorSettings::default()
            },
        ))
    }

    fn naive_now() -> chrono::NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn stamp(value: chrono::NaiveDateTime) -> String {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[tokio::test]
    async fn cold_start_produces_no_alerts_but_populates_snapshots() {
        let store = driver_store(vec![open_order(4100), open_order(4101)]);
        let monitor = monitor_over(store);

        monitor.take_initial_snapshot().await;
        monitor.run_fast_cycle().await.expect("cycle");

        assert!(!monitor.has_alerts().await);

        let state = monitor.state.lock().await;
        assert_eq!(state.last_order_ids.len(), 2);
        assert_eq!(state.last_statuses.get(&4100).map(String::as_str), Some("Open"));
    }

    #[tokio::test]
    async fn status_change_alerts_once_and_updates_snapshot() {
        let store = driver_store(vec![open_order(4100)]);
        let monitor = monitor_over(store.clone());
        monitor.take_initial_snapshot().await;

        store.update_order(4100, |doc| {
            doc.order.order_status = Some("In Transit".to_string());
        });
        monitor.run_fast_cycle().await.expect("cycle");

        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, AlertKind::OrderStatus);
        assert_eq!(pending[0].priority, AlertPriority::High);
        assert!(pending[0].message.contains("from Open to In Transit"));
        assert_eq!(pending[0].metadata["new_status"], "In Transit");

        // Unchanged data next cycle: snapshot already advanced.
        monitor.run_fast_cycle().await.expect("cycle");
        assert_eq!(monitor.get_pending_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn first_observation_stores_status_without_alerting() {
        let store = driver_store(vec![open_order(4100)]);
        let monitor = monitor_over(store.clone());
        monitor.take_initial_snapshot().await;

        // A new assignment appears mid-session.
        store.upsert_order(open_order(4102));
        store.insert_profile(UserProfile {
            role: Role::Driver,
            name: "Jo Hauler".to_string(),
            email: DRIVER_EMAIL.to_string(),
            phone: None,
            order_ids: vec![4100, 4102],
        });

        monitor.run_fast_cycle().await.expect("cycle");

        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1, "only the new-order alert fires");
        assert_eq!(pending[0].kind, AlertKind::NewOrder);
        assert_eq!(pending[0].priority, AlertPriority::Medium);

        // The newcomer's status was snapshotted on first sight; flipping it
        // now triggers a status alert on the following cycle.
        store.update_order(4102, |doc| {
            doc.order.order_status = Some("In Transit".to_string());
        });
        monitor.run_fast_cycle().await.expect("cycle");

        let kinds: Vec<AlertKind> =
            monitor.get_pending_alerts().await.iter().map(|alert| alert.kind).collect();
        assert!(kinds.contains(&AlertKind::OrderStatus));
    }

    #[tokio::test]
    async fn permit_expired_eight_days_after_attachment_alerts_exactly_once() {
        let attached = naive_now() - chrono::Duration::days(8);
        let store = driver_store(vec![OrderDocument {
            id: 4100,
            order: Order {
                order_status: Some("Open".to_string()),
                routes: vec![Route {
                    state_name: Some("Texas".to_string()),
                    permit_status: Some("Approved".to_string()),
                    attached_at: Some(stamp(attached)),
                    ..Route::default()
                }],
                ..Order::default()
            },
        }]);
        let monitor = monitor_over(store);
        monitor.take_initial_snapshot().await;

        monitor.run_fast_cycle().await.expect("cycle");
        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, AlertKind::PermitExpired);
        assert_eq!(pending[0].priority, AlertPriority::Critical);
        assert_eq!(pending[0].metadata["days_expired"], 1);

        monitor.run_fast_cycle().await.expect("cycle");
        assert_eq!(monitor.get_pending_alerts().await.len(), 1, "warned permits never repeat");
    }

    #[tokio::test]
    async fn permit_nearing_estimated_expiry_warns_high() {
        // Attached 5 days and an hour ago with a 7-day validity estimate:
        // just under 2 days left, flooring to 1.
        let attached = naive_now() - chrono::Duration::days(5) - chrono::Duration::hours(1);
        let store = driver_store(vec![OrderDocument {
            id: 4100,
            order: Order {
                order_status: Some("Open".to_string()),
                routes: vec![Route {
                    state_name: Some("Oklahoma".to_string()),
                    attached_at: Some(stamp(attached)),
                    ..Route::default()
                }],
                ..Order::default()
            },
        }]);
        let monitor = monitor_over(store);
        monitor.take_initial_snapshot().await;

        monitor.run_fast_cycle().await.expect("cycle");
        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, AlertKind::PermitExpiring);
        assert!(pending[0].message.contains("expiring in 1 day"));
    }

    #[tokio::test]
    async fn rejected_permit_status_raises_a_critical_issue() {
        let store = driver_store(vec![OrderDocument {
            id: 4103,
            order: Order {
                order_status: Some("Open".to_string()),
                routes: vec![Route {
                    state_name: Some("New Mexico".to_string()),
                    permit_status: Some("Rejected".to_string()),
                    ..Route::default()
                }],
                ..Order::default()
            },
        }]);
        let monitor = monitor_over(store);
        monitor.take_initial_snapshot().await;

        monitor.run_fast_cycle().await.expect("cycle");
        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, AlertKind::PermitIssue);
        assert_eq!(pending[0].metadata["status"], "Rejected");

        monitor.run_fast_cycle().await.expect("cycle");
        assert_eq!(monitor.get_pending_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn deadline_boundary_is_inclusive_at_the_warning_window() {
        let inside = naive_now() + chrono::Duration::hours(24) - chrono::Duration::seconds(1);
        let outside = naive_now() + chrono::Duration::hours(24) + chrono::Duration::seconds(40);

        let store = driver_store(vec![
            OrderDocument {
                id: 4100,
                order: Order {
                    order_status: Some("Open".to_string()),
                    delivery_date: Some(stamp(inside)),
                    ..Order::default()
                },
            },
            OrderDocument {
                id: 4101,
                order: Order {
                    order_status: Some("Open".to_string()),
                    delivery_date: Some(stamp(outside)),
                    ..Order::default()
                },
            },
        ]);
        let monitor = monitor_over(store);
        monitor.take_initial_snapshot().await;

        monitor.run_fast_cycle().await.expect("cycle");
        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1, "only the in-window deadline alerts");
        assert_eq!(pending[0].kind, AlertKind::DeadlineApproaching);
        assert_eq!(pending[0].order_id, Some(4100));
    }

    #[tokio::test]
    async fn overdue_deadline_skips_terminal_orders() {
        let past = naive_now() - chrono::Duration::hours(6);
        let store = driver_store(vec![
            OrderDocument {
                id: 4100,
                order: Order {
                    order_status: Some("Open".to_string()),
                    end_date: Some(stamp(past)),
                    ..Order::default()
                },
            },
            OrderDocument {
                id: 4101,
                order: Order {
                    order_status: Some("Delivered".to_string()),
                    end_date: Some(stamp(past)),
                    ..Order::default()
                },
            },
        ]);
        let monitor = monitor_over(store);
        monitor.take_initial_snapshot().await;

        monitor.run_fast_cycle().await.expect("cycle");
        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, AlertKind::DeadlineOverdue);
        assert_eq!(pending[0].priority, AlertPriority::Critical);
        assert_eq!(pending[0].order_id, Some(4100));

        monitor.run_fast_cycle().await.expect("cycle");
        assert_eq!(monitor.get_pending_alerts().await.len(), 1, "one deadline alert per order");
    }

    #[tokio::test]
    async fn pending_alerts_sort_by_priority_with_stable_ties() {
        let monitor = monitor_over(driver_store(vec![]));

        {
            let mut state = monitor.state.lock().await;
            state.enqueue(
                AlertKind::NewOrder,
                AlertPriority::Medium,
                "medium-first".to_string(),
                "m1".to_string(),
                Some(1),
                serde_json::Map::new(),
            );
            state.enqueue(
                AlertKind::OrderStatus,
                AlertPriority::High,
                "high-first".to_string(),
                "h1".to_string(),
                Some(2),
                serde_json::Map::new(),
            );
            state.enqueue(
                AlertKind::OrderStatus,
                AlertPriority::High,
                "high-second".to_string(),
                "h2".to_string(),
                Some(3),
                serde_json::Map::new(),
            );
            state.enqueue(
                AlertKind::WeatherAlert,
                AlertPriority::Critical,
                "critical".to_string(),
                "c1".to_string(),
                Some(4),
                serde_json::Map::new(),
            );
        }

        let pending = monitor.get_pending_alerts().await;
        let titles: Vec<&str> = pending.iter().map(|alert| alert.title.as_str()).collect();
        assert_eq!(titles, vec!["critical", "high-first", "high-second", "medium-first"]);
    }

    #[tokio::test]
    async fn mark_delivered_is_idempotent_and_outlives_gc() {
        let monitor = monitor_over(driver_store(vec![]));

        {
            let mut state = monitor.state.lock().await;
            state.enqueue(
                AlertKind::PermitIssue,
                AlertPriority::Critical,
                "Permit issue: Texas".to_string(),
                "permit trouble".to_string(),
                Some(4100),
                serde_json::Map::new(),
            );
        }

        let seq = monitor.get_pending_alerts().await[0].seq;
        monitor.mark_delivered(seq).await;
        monitor.mark_delivered(seq).await;
        assert!(!monitor.has_alerts().await);

        // Age the delivered alert past the GC window and purge it.
        {
            let mut state = monitor.state.lock().await;
            state.queue[0].created_at = Utc::now() - chrono::Duration::hours(25);
        }
        monitor.clear_old_alerts().await;
        assert!(monitor.state.lock().await.queue.is_empty());

        // The same logical event can never re-enter the queue.
        {
            let mut state = monitor.state.lock().await;
            state.enqueue(
                AlertKind::PermitIssue,
                AlertPriority::Critical,
                "Permit issue: Texas".to_string(),
                "permit trouble again".to_string(),
                Some(4100),
                serde_json::Map::new(),
            );
        }
        assert!(!monitor.has_alerts().await);
    }

    #[tokio::test]
    async fn severe_route_weather_alerts_once_per_city_and_survives_api_failures() {
        let store = driver_store(vec![
            OrderDocument {
                id: 4100,
                order: Order {
                    order_status: Some("Open".to_string()),
                    origin_city: Some("Houston".to_string()),
                    destination_city: Some("Tulsa".to_string()),
                    ..Order::default()
                },
            },
            OrderDocument {
                id: 4101,
                order: Order {
                    order_status: Some("Cancelled".to_string()),
                    origin_city: Some("Tulsa".to_string()),
                    ..Order::default()
                },
            },
        ]);
        let weather = Arc::new(
            ScriptedWeather::clear_everywhere()
                .with_city("Tulsa", Ok("Tornado warning near downtown".to_string()))
                .with_city("Houston", Err("api down".to_string())),
        );
        let monitor = monitor_with(store, weather, Arc::new(ScriptedLlm::default()));

        monitor.check_route_weather().await.expect("weather sweep");

        let pending = monitor.get_pending_alerts().await;
        assert_eq!(pending.len(), 1, "inactive orders and failed cities are skipped");
        assert_eq!(pending[0].kind, AlertKind::WeatherAlert);
        assert_eq!(pending[0].order_id, Some(4100));
        assert!(pending[0].message.contains("Tulsa"));

        monitor.check_route_weather().await.expect("weather sweep");
        assert_eq!(monitor.get_pending_alerts().await.len(), 1, "city key dedups");
    }

    #[tokio::test]
    async fn summary_uses_llm_and_falls_back_to_top_alert() {
        let llm = Arc::new(ScriptedLlm::with_responses(vec![
            Ok("I have an update for you. One permit needs attention.".to_string()),
            Err("llm down".to_string()),
        ]));
        let monitor = monitor_with(
            driver_store(vec![]),
            Arc::new(ScriptedWeather::clear_everywhere()),
            llm,
        );

        assert!(monitor.generate_summary().await.is_none(), "no pending, no summary");

        {
            let mut state = monitor.state.lock().await;
            state.enqueue(
                AlertKind::NewOrder,
                AlertPriority::Medium,
                "new order".to_string(),
                "Order 4100 assigned.".to_string(),
                Some(4100),
                serde_json::Map::new(),
            );
            state.enqueue(
                AlertKind::PermitExpired,
                AlertPriority::Critical,
                "permit expired".to_string(),
                "Permit for Texas expired.".to_string(),
                Some(4100),
                serde_json::Map::new(),
            );
        }

        let summary = monitor.generate_summary().await.expect("summary");
        assert!(summary.starts_with("I have an update"));

        // Second call: scripted failure falls back to the raw message of
        // the highest-priority alert.
        let fallback = monitor.generate_summary().await.expect("fallback");
        assert_eq!(fallback, "Permit for Texas expired.");
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_cancels_the_loops() {
        let monitor = monitor_over(driver_store(vec![open_order(4100)]));

        monitor.start();
        assert!(monitor.is_running());
        monitor.start();
        assert_eq!(monitor.tasks.lock().expect("tasks").len(), 2, "second start is a no-op");

        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.stop();
        assert!(!monitor.is_running());
        assert!(monitor.tasks.lock().expect("tasks").is_empty());
    }
}
