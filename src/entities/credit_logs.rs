use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "credit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// 正数为入账，负数为出账
    pub amount: i32,
    /// 1=充值 2=消费 3=退款
    pub log_type: i32,
    /// 本次变动后的余额快照
    pub balance: i32,
    pub description: Option<String>,
    pub order_id: Option<i64>,
    pub task_id: Option<i64>,
    pub create_time: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 积分流水类型
pub mod log_type {
    pub const TOP_UP: i32 = 1;
    pub const CONSUME: i32 = 2;
    pub const REFUND: i32 = 3;
}
