use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum CreditLogs {
    Table,
    Id,
    UserId,
    Amount,
    LogType,
    Balance,
    Description,
    OrderId,
    TaskId,
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
                    .table(CreditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditLogs::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditLogs::Amount).integer().not_null())
                    // 1=充值 2=消费 3=退款
                    .col(ColumnDef::new(CreditLogs::LogType).integer().not_null())
                    .col(ColumnDef::new(CreditLogs::Balance).integer().not_null())
                    .col(
                        ColumnDef::new(CreditLogs::Description)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(CreditLogs::OrderId).big_integer().null())
                    .col(ColumnDef::new(CreditLogs::TaskId).big_integer().null())
                    .col(
                        ColumnDef::new(CreditLogs::CreateTime)
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
                    .name("idx_credit_logs_user")
                    .table(CreditLogs::Table)
                    .col(CreditLogs::UserId)
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
                    .table(CreditLogs::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
