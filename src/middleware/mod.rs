pub mod cors;
pub mod response;

pub use cors::cors_middleware;
pub use response::{ApiResponse, ApiResult};
