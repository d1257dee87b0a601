//! Proactive monitoring engine
//!
//! Two supervised background loops watch a session user's visible orders:
//! a fast loop diffing order status, assignments, permit expiry, and
//! delivery deadlines against a remembered snapshot, and a slow loop
//! checking route weather. Detections become prioritized [`Alert`]s in a
//! session-scoped queue with at-most-once delivery per logical event.
//!
//! The engine owns both task handles: `start` spawns them, `stop` cancels
//! them, and a cancelled loop exits cleanly. Every store, weather, or LLM
//! failure is contained to the cycle that hit it.
//!
//! [`Alert`]: haulvoice_core::domain::alert::Alert

pub mod engine;
pub mod weather;

pub use engine::{MonitorSettings, ProactiveMonitor, SessionUser};
pub use weather::{OpenWeatherClient, ScriptedWeather, WeatherClient, WeatherError};
