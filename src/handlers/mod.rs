pub mod auth;
pub mod credit;
pub mod video;

pub use auth::auth_config;
pub use credit::credit_config;
pub use video::video_config;
