//! HTTP command surface
//!
//! Two routes, one per actuator, each taking a position as its last path
//! segment and handing it to that actuator's delivery channel.

mod error;
mod handlers;
mod router;
mod server;
mod state;
mod value;

pub use router::create_router;
pub use server::serve;
pub use state::ServerContext;
