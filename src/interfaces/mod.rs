//! Delivery mechanisms: the OCPP WebSocket endpoint and the HTTP API.

pub mod http;
pub mod ws;
