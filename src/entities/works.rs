use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "works")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub video_task_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// 逗号分隔的标签
    pub tags: Option<String>,
    pub cover_url: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<i32>,
    pub is_public: i32,
    pub view_count: i32,
    pub like_count: i32,
    pub comment_count: i32,
    pub deleted: i32,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
