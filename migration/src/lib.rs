pub use sea_orm_migration::prelude::*;

mod m20250918_000001_create_users;
mod m20250918_000002_create_credit_logs;
mod m20250918_000003_create_video_tasks;
mod m20250925_000001_create_login_logs;
mod m20251010_000001_create_community;
mod m20251018_000001_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250918_000001_create_users::Migration),
            Box::new(m20250918_000002_create_credit_logs::Migration),
            Box::new(m20250918_000003_create_video_tasks::Migration),
            Box::new(m20250925_000001_create_login_logs::Migration),
            Box::new(m20251010_000001_create_community::Migration),
            Box::new(m20251018_000001_create_orders::Migration),
        ]
    }
}
