//! Use-case orchestration: message bus, per-station actors, OCPP
//! handlers, outbound commands, the charging-session engine, pricing
//! resolution and availability tracking.

pub mod availability;
pub mod bus;
pub mod charging;
pub mod commands;
pub mod handlers;
pub mod pricing;
pub mod session;

pub use charging::ChargingEngine;
pub use handlers::OcppHandler;
pub use pricing::PricingResolver;
