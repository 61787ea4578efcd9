//! SeaORM entities — the typed boundary to SQL.
//!
//! Schema management itself is owned by the operations tooling; these
//! definitions are the contract the code compiles against.

pub mod charging_session;
pub mod client;
pub mod client_tariff;
pub mod connector;
pub mod idempotency_key;
pub mod meter_value;
pub mod ocpp_authorization;
pub mod ocpp_transaction;
pub mod payment_transaction;
pub mod pricing_history;
pub mod station;
pub mod station_config;
pub mod tariff_plan;
pub mod tariff_rule;
