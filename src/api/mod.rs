//! Request/response boundary: the router used by in-process hosts and the C ABI
//! used by foreign ones.

pub mod ffi;
pub mod routes;
pub mod state;

pub use routes::{handle, ApiRequest, ApiResponse, Method};
pub use state::AppState;
