use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    OrderNo,
    PackageId,
    Amount,
    Credits,
    Status,
    PayMethod,
    TransactionId,
    PayTime,
    CreateTime,
    UpdateTime,
}

#[derive(DeriveIden)]
enum CreditPackages {
    Table,
    Id,
    Name,
    Credits,
    Price,
    BonusCredits,
    Sort,
    IsActive,
    CreateTime,
    UpdateTime,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::OrderNo).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::PackageId).big_integer().null())
                    // 金额，单位分
                    .col(ColumnDef::new(Orders::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Credits).integer().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::PayMethod).integer().null())
                    .col(
                        ColumnDef::new(Orders::TransactionId)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::PayTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdateTime)
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
                    .name("idx_orders_user")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uk_orders_order_no")
                    .table(Orders::Table)
                    .col(Orders::OrderNo)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditPackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditPackages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditPackages::Name)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditPackages::Credits).integer().not_null())
                    // 价格，单位分
                    .col(ColumnDef::new(CreditPackages::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(CreditPackages::BonusCredits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CreditPackages::Sort)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CreditPackages::IsActive)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(CreditPackages::CreateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditPackages::UpdateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
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
                    .table(CreditPackages::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Orders::Table).to_owned())
            .await?;
        Ok(())
    }
}
