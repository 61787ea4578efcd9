pub mod ocpp_frame;
pub mod phone;
pub mod retry;
pub mod shutdown;
