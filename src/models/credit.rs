use crate::entities::credit_log_entity as credit_logs;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: i32,
}

/// 积分流水条目
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditLogItem {
    pub id: i64,
    /// 正数入账，负数出账
    pub amount: i32,
    /// 1=充值 2=消费 3=退款
    pub log_type: i32,
    /// 变动后余额
    pub balance: i32,
    pub description: Option<String>,
    pub order_id: Option<i64>,
    pub task_id: Option<i64>,
    pub create_time: Option<DateTime<Utc>>,
}

impl From<credit_logs::Model> for CreditLogItem {
    fn from(log: credit_logs::Model) -> Self {
        Self {
            id: log.id,
            amount: log.amount,
            log_type: log.log_type,
            balance: log.balance,
            description: log.description,
            order_id: log.order_id,
            task_id: log.task_id,
            create_time: log.create_time,
        }
    }
}
