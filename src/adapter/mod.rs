//! Adapters connecting the application to the outside world.

pub mod inbound;
pub mod outbound;
