use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub order_no: String,
    pub package_id: Option<i64>,
    /// 金额，单位分
    pub amount: i64,
    pub credits: i32,
    /// 0=待支付 1=已支付 2=已取消 3=已退款
    pub status: i32,
    pub pay_method: Option<String>,
    pub transaction_id: Option<String>,
    pub pay_time: Option<DateTime<Utc>>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
