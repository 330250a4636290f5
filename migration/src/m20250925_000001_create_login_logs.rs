use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum LoginLogs {
    Table,
    Id,
    UserId,
    LoginIp,
    LoginLocation,
    DeviceType,
    Browser,
    Os,
    Status,
    FailReason,
    CreateTime,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // 登录前失败的记录没有用户ID
                    .col(ColumnDef::new(LoginLogs::UserId).big_integer().null())
                    .col(ColumnDef::new(LoginLogs::LoginIp).string_len(64).null())
                    .col(
                        ColumnDef::new(LoginLogs::LoginLocation)
                            .string_len(128)
                            .null(),
                    )
                    .col(ColumnDef::new(LoginLogs::DeviceType).string_len(32).null())
                    .col(ColumnDef::new(LoginLogs::Browser).string_len(32).null())
                    .col(ColumnDef::new(LoginLogs::Os).string_len(32).null())
                    // 0=失败 1=成功
                    .col(
                        ColumnDef::new(LoginLogs::Status)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(LoginLogs::FailReason)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LoginLogs::CreateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_login_logs_user")
                    .table(LoginLogs::Table)
                    .col(LoginLogs::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LoginLogs::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
