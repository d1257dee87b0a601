use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Driver,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Driver => "driver",
            Self::Client => "client",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "driver" => Ok(Self::Driver),
            "client" => Ok(Self::Client),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile of the authenticated session user, as loaded from the driver or
/// client collection. Admins get a synthetic profile with no personal order
/// list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub order_ids: Vec<i64>,
}

impl UserProfile {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            name: "Administrator".to_string(),
            email: "admin".to_string(),
            phone: None,
            order_ids: Vec::new(),
        }
    }

    /// Order IDs sorted newest-first. Position references ("latest",
    /// "third last") index into this ordering.
    pub fn order_ids_descending(&self) -> Vec<i64> {
        let mut ids = self.order_ids.clone();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids
    }
}
