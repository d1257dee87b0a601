pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod keywords;
pub mod text;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use context::{match_position_phrase, position_description, OrderContext};
pub use domain::alert::{Alert, AlertKind, AlertPriority};
pub use domain::order::{parse_flexible_date, Order, OrderDocument, Party, Route};
pub use domain::user::{Role, UserProfile};
pub use errors::{ApplicationError, DomainError, InterfaceError};
