pub mod charging;
pub mod common;
pub mod health;
pub mod middleware;
pub mod router;

pub use router::create_api_router;
