pub mod common;
pub mod credit;
pub mod user;
pub mod video;

pub use common::*;
pub use credit::*;
pub use user::*;
pub use video::*;
