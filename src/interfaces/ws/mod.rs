pub mod ocpp_server;
pub mod station_actor;

pub use ocpp_server::OcppServer;
