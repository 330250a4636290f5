use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum VideoTasks {
    Table,
    Id,
    UserId,
    TaskId,
    Provider,
    Prompt,
    Params,
    Status,
    Progress,
    VideoUrl,
    CoverUrl,
    Duration,
    CostCredits,
    ErrorMsg,
    Deleted,
    CreateTime,
    CompleteTime,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VideoTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VideoTasks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VideoTasks::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    // provider侧任务ID，提交前为本地占位符
                    .col(ColumnDef::new(VideoTasks::TaskId).string_len(128).not_null())
                    .col(
                        ColumnDef::new(VideoTasks::Provider)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VideoTasks::Prompt).text().not_null())
                    .col(ColumnDef::new(VideoTasks::Params).text().null())
                    // 0=队列中 1=生成中 2=已完成 3=失败 4=超时
                    .col(
                        ColumnDef::new(VideoTasks::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VideoTasks::Progress)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(VideoTasks::VideoUrl).string_len(1024).null())
                    .col(ColumnDef::new(VideoTasks::CoverUrl).string_len(1024).null())
                    .col(ColumnDef::new(VideoTasks::Duration).integer().null())
                    .col(
                        ColumnDef::new(VideoTasks::CostCredits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(VideoTasks::ErrorMsg).string_len(512).null())
                    .col(
                        ColumnDef::new(VideoTasks::Deleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VideoTasks::CreateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VideoTasks::CompleteTime)
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
                    .name("idx_video_tasks_user")
                    .table(VideoTasks::Table)
                    .col(VideoTasks::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_video_tasks_status")
                    .table(VideoTasks::Table)
                    .col(VideoTasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_video_tasks_task_id")
                    .table(VideoTasks::Table)
                    .col(VideoTasks::TaskId)
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
                    .table(VideoTasks::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
