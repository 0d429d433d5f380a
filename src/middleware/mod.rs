pub mod auth;
pub mod request_log;
pub mod response;
pub mod validated_json;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use request_log::request_log_middleware;
pub use response::{ApiResponse, ApiResult};
pub use validated_json::ValidatedJson;
