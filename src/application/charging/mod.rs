pub mod engine;
pub mod reservation;
pub mod sweeper;

pub use engine::{ChargingEngine, SessionStatusView, StartOutcome, StopOutcome};
pub use reservation::{calculate_reservation, Reservation};
pub use sweeper::HangingSessionSweeper;
