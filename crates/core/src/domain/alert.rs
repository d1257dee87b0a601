use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OrderStatus,
    NewOrder,
    PermitExpiring,
    PermitExpired,
    PermitIssue,
    DeadlineApproaching,
    DeadlineOverdue,
    WeatherAlert,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderStatus => "order_status",
            Self::NewOrder => "new_order",
            Self::PermitExpiring => "permit_expiring",
            Self::PermitExpired => "permit_expired",
            Self::PermitIssue => "permit_issue",
            Self::DeadlineApproaching => "deadline_approaching",
            Self::DeadlineOverdue => "deadline_overdue",
            Self::WeatherAlert => "weather_alert",
        }
    }
}

/// Ordered priority levels; lower ordinal means more urgent and sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl AlertPriority {
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// A single proactive alert queued for spoken delivery.
///
/// `seq` is assigned by the engine at enqueue time; it is the stable
/// tie-break for equal-priority ordering and the identity used to mark
/// delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub seq: u64,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered: bool,
}

impl Alert {
    /// Key identifying the logical event behind this alert. Once the key is
    /// recorded as delivered, no alert with the same (kind, order, title) is
    /// ever enqueued again in this session.
    pub fn dedup_key(&self) -> String {
        match self.order_id {
            Some(order_id) => format!("{}_{}_{}", self.kind.as_str(), order_id, self.title),
            None => format!("{}_none_{}", self.kind.as_str(), self.title),
        }
    }

    /// Sort key: priority ascending, enqueue order within a priority.
    pub fn sort_key(&self) -> (u8, u64) {
        (self.priority.rank(), self.seq)
    }
}
