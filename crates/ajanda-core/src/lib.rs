//! ajanda-core - Core library for Ajanda
//!
//! This crate contains the models, persistence, backend gateway, alarm
//! scheduling and reconciliation logic used by the Ajanda reminder client.

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod util;

pub use auth::AuthService;
pub use config::{GatewayConfig, TenantConfig};
pub use error::{Error, Result};
pub use filter::{NotificationFilter, StatusFilter};
pub use gateway::{HttpGateway, NotificationGateway};
pub use models::{
    AuthSession, Credentials, NoteRecord, NotificationDraft, NotificationId, NotificationRecord,
};
pub use reconciler::{NotificationReconciler, ReconcilerSnapshot};
pub use scheduler::{AlarmPlatform, AlarmScheduler, AlarmSink, ScheduledAlarm, TokioAlarmPlatform};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
