pub mod handlers;
pub mod manager;
pub mod server;
pub mod state;

pub use manager::{Manager, SessionLimits};
pub use server::{build_router, run_server};
pub use state::{AppState, ManagerCommand, SessionCommand, DEFAULT_SESSION_ID};
