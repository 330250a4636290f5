use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Works {
    Table,
    Id,
    UserId,
    VideoTaskId,
    Title,
    Description,
    Tags,
    CoverUrl,
    VideoUrl,
    Duration,
    IsPublic,
    ViewCount,
    LikeCount,
    CommentCount,
    Deleted,
    CreateTime,
    UpdateTime,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    UserId,
    WorkId,
    Content,
    LikeCount,
    CommentCount,
    Deleted,
    CreateTime,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    UserId,
    Content,
    ParentId,
    Deleted,
    CreateTime,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    Id,
    UserId,
    TargetId,
    TargetType,
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
                    .table(Works::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Works::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Works::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Works::VideoTaskId).big_integer().null())
                    .col(ColumnDef::new(Works::Title).string_len(128).null())
                    .col(ColumnDef::new(Works::Description).string_len(512).null())
                    .col(ColumnDef::new(Works::Tags).string_len(255).null())
                    .col(ColumnDef::new(Works::CoverUrl).string_len(1024).null())
                    .col(ColumnDef::new(Works::VideoUrl).string_len(1024).null())
                    .col(ColumnDef::new(Works::Duration).integer().null())
                    .col(
                        ColumnDef::new(Works::IsPublic)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Works::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Works::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Works::CommentCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Works::Deleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Works::CreateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Works::UpdateTime)
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
                    .name("idx_works_user")
                    .table(Works::Table)
                    .col(Works::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Posts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Posts::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Posts::WorkId).big_integer().null())
                    .col(ColumnDef::new(Posts::Content).text().null())
                    .col(
                        ColumnDef::new(Posts::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Posts::CommentCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Posts::Deleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Posts::CreateTime)
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
                    .name("idx_posts_user")
                    .table(Posts::Table)
                    .col(Posts::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::PostId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(ColumnDef::new(Comments::ParentId).big_integer().null())
                    .col(
                        ColumnDef::new(Comments::Deleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comments::CreateTime)
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
                    .name("idx_comments_post")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Likes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Likes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Likes::TargetId).big_integer().not_null())
                    // 1=动态 2=评论
                    .col(ColumnDef::new(Likes::TargetType).integer().not_null())
                    .col(
                        ColumnDef::new(Likes::CreateTime)
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
                    .name("uk_likes_user_target")
                    .table(Likes::Table)
                    .col(Likes::UserId)
                    .col(Likes::TargetId)
                    .col(Likes::TargetType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Likes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Works::Table).to_owned())
            .await?;
        Ok(())
    }
}
