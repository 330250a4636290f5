pub mod auth_service;
pub mod credit_service;
pub mod login_log_service;
pub mod video_service;

pub use auth_service::*;
pub use credit_service::*;
pub use login_log_service::*;
pub use video_service::*;
