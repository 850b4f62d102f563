// HTTP surface: SDK-facing endpoints (§4.K/§4.L) plus the admin surface,
// assembled in `server`.

pub mod admin;
pub mod handlers;
pub mod middleware;
pub mod response_cache;
pub mod server;
pub mod state;

pub use response_cache::ResponseCache;
pub use server::build_router;
pub use state::AppState;
