use crate::entities::credit_logs::log_type;
use crate::entities::{credit_log_entity as credit_logs, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{CreditLogItem, PageQuery, PageResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

/// 积分账本服务
///
/// 余额只通过本服务的reserve/top_up/refund变动，每次变动与流水插入
/// 在同一事务内完成，流水中的balance快照恒等于变动后的实时余额。
#[derive(Clone)]
pub struct CreditService {
    pool: DatabaseConnection,
}

impl CreditService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 扣减积分（消费）
    ///
    /// 余额校验与扣减是同一条条件更新 (credits >= amount)，并发下
    /// 不会把余额扣成负数；余额不足时不产生任何变更。
    pub async fn reserve(
        &self,
        user_id: i64,
        amount: i32,
        task_id: Option<i64>,
        description: &str,
    ) -> AppResult<i32> {
        use sea_orm::TransactionTrait;

        if amount <= 0 {
            return Err(AppError::ValidationError("积分数量必须为正数".into()));
        }

        let txn = self.pool.begin().await?;

        let update_result = users::Entity::update_many()
            .col_expr(
                users::Column::Credits,
                Expr::col(users::Column::Credits).sub(amount),
            )
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Deleted.eq(0))
            .filter(users::Column::Credits.gte(amount))
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            // 区分用户不存在与余额不足
            let exists = users::Entity::find_by_id(user_id)
                .filter(users::Column::Deleted.eq(0))
                .one(&txn)
                .await?
                .is_some();
            return Err(if exists {
                AppError::InsufficientBalance
            } else {
                AppError::UserNotFound
            });
        }

        let balance = self.read_balance(&txn, user_id).await?;

        credit_logs::ActiveModel {
            user_id: Set(user_id),
            amount: Set(-amount),
            log_type: Set(log_type::CONSUME),
            balance: Set(balance),
            description: Set(Some(description.to_string())),
            task_id: Set(task_id),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!("用户{user_id}消费积分: -{amount}, 余额: {balance}");
        Ok(balance)
    }

    /// 充值积分
    pub async fn top_up(
        &self,
        user_id: i64,
        amount: i32,
        order_id: Option<i64>,
        description: &str,
    ) -> AppResult<i32> {
        let balance = self
            .credit(user_id, amount, log_type::TOP_UP, order_id, None, description)
            .await?;
        log::info!("用户{user_id}充值积分: +{amount}, 余额: {balance}");
        Ok(balance)
    }

    /// 退回积分（任务失败/超时）
    pub async fn refund(&self, user_id: i64, amount: i32, task_id: Option<i64>) -> AppResult<i32> {
        let balance = self
            .credit(
                user_id,
                amount,
                log_type::REFUND,
                None,
                task_id,
                &format!("任务失败，退回{amount}积分"),
            )
            .await?;
        log::info!("用户{user_id}退回积分: +{amount}, 余额: {balance}");
        Ok(balance)
    }

    /// 入账公共路径（充值/退款）
    async fn credit(
        &self,
        user_id: i64,
        amount: i32,
        log_type: i32,
        order_id: Option<i64>,
        task_id: Option<i64>,
        description: &str,
    ) -> AppResult<i32> {
        use sea_orm::TransactionTrait;

        if amount <= 0 {
            return Err(AppError::ValidationError("积分数量必须为正数".into()));
        }

        let txn = self.pool.begin().await?;

        let update_result = users::Entity::update_many()
            .col_expr(
                users::Column::Credits,
                Expr::col(users::Column::Credits).add(amount),
            )
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Deleted.eq(0))
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        let balance = self.read_balance(&txn, user_id).await?;

        credit_logs::ActiveModel {
            user_id: Set(user_id),
            amount: Set(amount),
            log_type: Set(log_type),
            balance: Set(balance),
            description: Set(Some(description.to_string())),
            order_id: Set(order_id),
            task_id: Set(task_id),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(balance)
    }

    async fn read_balance<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<i32, sea_orm::DbErr> {
        Ok(users::Entity::find_by_id(user_id)
            .one(conn)
            .await?
            .map(|u| u.credits)
            .unwrap_or(0))
    }

    /// 获取积分余额，用户不存在时返回0
    pub async fn get_balance(&self, user_id: i64) -> AppResult<i32> {
        Ok(self.read_balance(&self.pool, user_id).await?)
    }

    /// 积分流水，按时间倒序分页
    pub async fn get_credit_logs(
        &self,
        user_id: i64,
        page: &PageQuery,
    ) -> AppResult<PageResult<CreditLogItem>> {
        let total = credit_logs::Entity::find()
            .filter(credit_logs::Column::UserId.eq(user_id))
            .count(&self.pool)
            .await?;

        let models = credit_logs::Entity::find()
            .filter(credit_logs::Column::UserId.eq(user_id))
            .order_by_desc(credit_logs::Column::CreateTime)
            .order_by_desc(credit_logs::Column::Id)
            .offset(page.offset())
            .limit(page.size())
            .all(&self.pool)
            .await?;

        let records: Vec<CreditLogItem> = models.into_iter().map(CreditLogItem::from).collect();
        Ok(PageResult::new(records, total, page.current(), page.size()))
    }
}
