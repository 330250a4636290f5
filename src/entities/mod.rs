pub mod comments;
pub mod credit_logs;
pub mod credit_packages;
pub mod likes;
pub mod login_logs;
pub mod orders;
pub mod posts;
pub mod users;
pub mod video_tasks;
pub mod works;

pub use comments as comment_entity;
pub use credit_logs as credit_log_entity;
pub use credit_packages as credit_package_entity;
pub use likes as like_entity;
pub use login_logs as login_log_entity;
pub use orders as order_entity;
pub use posts as post_entity;
pub use users as user_entity;
pub use video_tasks as video_task_entity;
pub use works as work_entity;
