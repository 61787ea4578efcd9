//! # EvGrid Operator Backend
//!
//! OCPP 1.6-J central system for a public EV-charging network: terminates
//! one WebSocket per charging station, drives the charging-session
//! lifecycle (reservation, limit enforcement, settlement) and exposes the
//! mobile charging API.
//!
//! ## Architecture
//!
//! - **support**: Cross-cutting utilities (OCPP-J framing, shutdown, retry)
//! - **domain**: Core business entities, repository traits, errors
//! - **application**: Use-case orchestration (bus, actors, engine, pricing)
//! - **infrastructure**: External concerns (database, crypto)
//! - **interfaces**: Delivery mechanisms (HTTP REST, OCPP WebSocket)
//! - **config**: Application configuration (environment-based)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod support;

// Re-export commonly used types at crate root
pub use application::bus::{create_message_bus, MessageBus, SharedMessageBus};
pub use config::AppConfig;
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
