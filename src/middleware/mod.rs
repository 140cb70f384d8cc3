pub mod access_gate;
pub mod response;

pub use access_gate::access_gate_middleware;
pub use response::{ApiResponse, ApiResult};
