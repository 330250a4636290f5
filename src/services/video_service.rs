use crate::config::VideoConfig;
use crate::entities::video_tasks::TaskStatus;
use crate::entities::{user_entity as users, video_task_entity as video_tasks};
use crate::error::{AppError, AppResult};
use crate::models::{PageQuery, PageResult, VideoGenerationRequest, VideoTaskItem};
use crate::providers::{ProviderRegistry, VideoTaskDto};
use crate::services::CreditService;
use crate::tasks::TaskQueue;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 1080p输出的固定加价
const HIGH_RES_SURCHARGE: i32 = 5;
/// provider接受任务前的本地占位符前缀
const PLACEHOLDER_PREFIX: &str = "pending-";

/// 视频任务编排
///
/// 生命周期：落库(占位符) → 入队 → worker提交provider → 有界轮询 →
/// 终态落库。终态迁移是一条条件更新，赢得迁移的调用方负责那次唯一的
/// 退款，worker与同步查询路径共用该迁移。
#[derive(Clone)]
pub struct VideoTaskService {
    pool: DatabaseConnection,
    registry: Arc<ProviderRegistry>,
    credit_service: CreditService,
    queue: TaskQueue,
    config: VideoConfig,
}

impl VideoTaskService {
    pub fn new(
        pool: DatabaseConnection,
        registry: Arc<ProviderRegistry>,
        credit_service: CreditService,
        queue: TaskQueue,
        config: VideoConfig,
    ) -> Self {
        Self {
            pool,
            registry,
            credit_service,
            queue,
            config,
        }
    }

    /// 计算所需积分: 时长*2，1080p加5
    fn calculate_credits(request: &VideoGenerationRequest) -> i32 {
        let mut credits = request.duration * 2;
        if request.resolution == "1080p" {
            credits += HIGH_RES_SURCHARGE;
        }
        credits
    }

    fn validate(request: &VideoGenerationRequest) -> AppResult<()> {
        if request.prompt.trim().is_empty() {
            return Err(AppError::ValidationError("提示词不能为空".into()));
        }
        if !(2..=10).contains(&request.duration) {
            return Err(AppError::ValidationError("时长需在2-10秒之间".into()));
        }
        if !(0.0..=1.0).contains(&request.temperature) {
            return Err(AppError::ValidationError("创意度需在0.0-1.0之间".into()));
        }
        Ok(())
    }

    /// 提交生成任务
    ///
    /// 积分在provider提交前扣除，之后的失败路径通过终态迁移退款。
    /// 返回时任务还未提交给provider，携带占位符ID。
    pub async fn create_task(
        &self,
        request: VideoGenerationRequest,
        user_id: i64,
    ) -> AppResult<VideoTaskDto> {
        Self::validate(&request)?;
        let required = Self::calculate_credits(&request);

        // 默认provider必须已配置，扣积分前先解析
        let provider = self.registry.get(None)?;

        self.credit_service
            .reserve(
                user_id,
                required,
                None,
                &format!("生成{}秒视频", request.duration),
            )
            .await
            .map_err(|e| match e {
                AppError::InsufficientBalance => AppError::InsufficientCredits { required },
                other => other,
            })?;

        let placeholder = format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4());
        let params = serde_json::to_string(&request)?;

        let task = video_tasks::ActiveModel {
            user_id: Set(user_id),
            task_id: Set(placeholder.clone()),
            provider: Set(provider.name().to_string()),
            prompt: Set(request.prompt.clone()),
            params: Set(Some(params)),
            status: Set(TaskStatus::Pending),
            progress: Set(0),
            cost_credits: Set(required),
            deleted: Set(0),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        // 生成次数统计，不在积分事务内
        users::Entity::update_many()
            .col_expr(
                users::Column::TotalVideos,
                Expr::col(users::Column::TotalVideos).add(1),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.pool)
            .await?;

        self.queue.enqueue(task.id).await;
        log::info!(
            "视频任务已创建: taskId={}, userId={user_id}, cost={required}",
            task.id
        );

        Ok(Self::to_dto(&task))
    }

    /// worker任务体：提交阶段 + 有界轮询阶段
    pub async fn run_generation(&self, task_id: i64) -> AppResult<()> {
        let Some(task) = self.find_task(task_id).await? else {
            log::warn!("任务{task_id}不存在，跳过");
            return Ok(());
        };
        if task.status.is_terminal() {
            return Ok(());
        }

        let provider = match self.registry.get(Some(&task.provider)) {
            Ok(provider) => provider,
            Err(e) => {
                // provider被下线后无法继续，结算为失败
                self.settle_terminal(&task, TaskStatus::Failed, None, Some(e.to_string()))
                    .await?;
                return Ok(());
            }
        };

        let provider_task_id = if task.task_id.starts_with(PLACEHOLDER_PREFIX) {
            match self.submit_phase(&task, provider.as_ref()).await? {
                Some(provider_task_id) => provider_task_id,
                None => return Ok(()), // 提交阶段已结算终态
            }
        } else {
            task.task_id.clone()
        };

        self.poll_phase(task.id, &provider_task_id, provider.as_ref())
            .await
    }

    /// 提交阶段：重建请求并调用provider.submit_task
    ///
    /// 成功时用真实ID覆盖占位符并写入首个快照；失败结算FAILED并退款。
    /// 返回None表示任务已进入终态，无需轮询。
    async fn submit_phase(
        &self,
        task: &video_tasks::Model,
        provider: &dyn crate::providers::VideoProvider,
    ) -> AppResult<Option<String>> {
        let request: VideoGenerationRequest = match task
            .params
            .as_deref()
            .ok_or_else(|| "请求参数缺失".to_string())
            .and_then(|params| serde_json::from_str(params).map_err(|e| e.to_string()))
        {
            Ok(request) => request,
            Err(e) => {
                self.settle_terminal(task, TaskStatus::Failed, None, Some(e))
                    .await?;
                return Ok(None);
            }
        };

        match provider.submit_task(&request).await {
            Ok(dto) => {
                // 占位符换成provider侧真实ID
                video_tasks::Entity::update_many()
                    .set(video_tasks::ActiveModel {
                        task_id: Set(dto.task_id.clone()),
                        ..Default::default()
                    })
                    .filter(video_tasks::Column::Id.eq(task.id))
                    .exec(&self.pool)
                    .await?;

                let status = TaskStatus::from_status_str(&dto.status);
                if status.is_terminal() {
                    self.settle_terminal(task, status, Some(&dto), dto.error_message.clone())
                        .await?;
                    return Ok(None);
                }
                self.write_snapshot(task.id, status, &dto).await?;
                Ok(Some(dto.task_id))
            }
            Err(e) => {
                log::error!("任务{}提交provider失败: {e}", task.id);
                self.settle_terminal(task, TaskStatus::Failed, None, Some(e.to_string()))
                    .await?;
                Ok(None)
            }
        }
    }

    /// 轮询阶段：最多max_poll_attempts次，间隔poll_interval_secs
    ///
    /// 查询失败记日志并消耗一次尝试；耗尽仍未到终态的任务结算EXPIRED，
    /// 按配置决定是否退款，而不是无声放弃。
    async fn poll_phase(
        &self,
        task_id: i64,
        provider_task_id: &str,
        provider: &dyn crate::providers::VideoProvider,
    ) -> AppResult<()> {
        for attempt in 1..=self.config.max_poll_attempts {
            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;

            let dto = match provider.query_task(provider_task_id).await {
                Ok(dto) => dto,
                Err(e) => {
                    log::warn!("任务{task_id}第{attempt}次查询失败: {e}");
                    continue;
                }
            };

            let Some(task) = self.find_task(task_id).await? else {
                return Ok(());
            };
            if task.status.is_terminal() {
                return Ok(());
            }

            let status = TaskStatus::from_status_str(&dto.status);
            if status.is_terminal() {
                self.settle_terminal(&task, status, Some(&dto), dto.error_message.clone())
                    .await?;
                log::info!("任务{task_id}到达终态: {}", dto.status);
                return Ok(());
            }
            self.write_snapshot(task_id, status, &dto).await?;
        }

        // 轮询耗尽：结算为EXPIRED
        if let Some(task) = self.find_task(task_id).await?
            && !task.status.is_terminal()
        {
            log::warn!(
                "任务{task_id}轮询{}次后仍未到终态，标记为超时",
                self.config.max_poll_attempts
            );
            self.settle_terminal(&task, TaskStatus::Expired, None, Some("生成超时".to_string()))
                .await?;
        }
        Ok(())
    }

    /// 非终态快照写入，终态行不会被覆盖
    async fn write_snapshot(
        &self,
        task_id: i64,
        status: TaskStatus,
        dto: &VideoTaskDto,
    ) -> AppResult<()> {
        video_tasks::Entity::update_many()
            .set(video_tasks::ActiveModel {
                status: Set(status),
                progress: Set(dto.progress),
                video_url: Set(dto.video_url.clone()),
                cover_url: Set(dto.cover_url.clone()),
                duration: Set(dto.duration),
                error_msg: Set(dto.error_message.clone()),
                ..Default::default()
            })
            .filter(video_tasks::Column::Id.eq(task_id))
            .filter(video_tasks::Column::Status.is_in([TaskStatus::Pending, TaskStatus::Processing]))
            .exec(&self.pool)
            .await?;
        Ok(())
    }

    /// 终态迁移（完成/失败/超时）
    ///
    /// 条件更新保证迁移只发生一次；赢得迁移才执行退款，因此失败/超时
    /// 的退款恰好一次，并发调用下也不会重复。
    async fn settle_terminal(
        &self,
        task: &video_tasks::Model,
        status: TaskStatus,
        dto: Option<&VideoTaskDto>,
        error_msg: Option<String>,
    ) -> AppResult<()> {
        let progress = match status {
            TaskStatus::Completed => 100,
            _ => dto.map(|d| d.progress).unwrap_or(task.progress),
        };

        let mut values = video_tasks::ActiveModel {
            status: Set(status),
            progress: Set(progress),
            error_msg: Set(error_msg),
            complete_time: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Some(dto) = dto {
            values.video_url = Set(dto.video_url.clone());
            values.cover_url = Set(dto.cover_url.clone());
            values.duration = Set(dto.duration);
        }

        let result = video_tasks::Entity::update_many()
            .set(values)
            .filter(video_tasks::Column::Id.eq(task.id))
            .filter(video_tasks::Column::Status.is_in([TaskStatus::Pending, TaskStatus::Processing]))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            // 其他路径已经完成迁移
            return Ok(());
        }

        let should_refund = match status {
            TaskStatus::Failed => true,
            TaskStatus::Expired => self.config.refund_on_expired,
            _ => false,
        };
        if should_refund && task.cost_credits > 0 {
            self.credit_service
                .refund(task.user_id, task.cost_credits, Some(task.id))
                .await?;
        }
        Ok(())
    }

    async fn find_task(&self, task_id: i64) -> AppResult<Option<video_tasks::Model>> {
        Ok(video_tasks::Entity::find_by_id(task_id)
            .filter(video_tasks::Column::Deleted.eq(0))
            .one(&self.pool)
            .await?)
    }

    /// 查询单个任务（带归属校验）
    ///
    /// 非终态时同步查一次provider并写回；查询失败回退到库内状态。
    /// 终态任务直接返回库内值，不再触达provider。
    pub async fn query_task(&self, task_id: i64, user_id: i64) -> AppResult<VideoTaskDto> {
        let task = self
            .find_task(task_id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or(AppError::TaskNotFound)?;

        if task.status.is_terminal() || task.task_id.starts_with(PLACEHOLDER_PREFIX) {
            return Ok(Self::to_dto(&task));
        }

        match self.registry.get(Some(&task.provider)) {
            Ok(provider) => match provider.query_task(&task.task_id).await {
                Ok(dto) => {
                    let status = TaskStatus::from_status_str(&dto.status);
                    if status.is_terminal() {
                        self.settle_terminal(&task, status, Some(&dto), dto.error_message.clone())
                            .await?;
                    } else {
                        self.write_snapshot(task.id, status, &dto).await?;
                    }
                }
                Err(e) => log::warn!("同步查询任务{task_id}失败，返回库内状态: {e}"),
            },
            Err(e) => log::warn!("任务{task_id}的provider不可用: {e}"),
        }

        let task = self
            .find_task(task_id)
            .await?
            .ok_or(AppError::TaskNotFound)?;
        Ok(Self::to_dto(&task))
    }

    /// 我的任务列表，按创建时间倒序
    pub async fn get_user_tasks(
        &self,
        user_id: i64,
        page: &PageQuery,
    ) -> AppResult<PageResult<VideoTaskItem>> {
        let filter = video_tasks::Entity::find()
            .filter(video_tasks::Column::UserId.eq(user_id))
            .filter(video_tasks::Column::Deleted.eq(0));

        let total = filter.clone().count(&self.pool).await?;
        let models = filter
            .order_by_desc(video_tasks::Column::CreateTime)
            .order_by_desc(video_tasks::Column::Id)
            .offset(page.offset())
            .limit(page.size())
            .all(&self.pool)
            .await?;

        let records: Vec<VideoTaskItem> = models.into_iter().map(VideoTaskItem::from).collect();
        Ok(PageResult::new(records, total, page.current(), page.size()))
    }

    /// 启动恢复：把所有非终态任务重新入队
    ///
    /// 占位符任务会重新提交provider；崩溃窗口内provider已接受但
    /// 本地未记录真实ID的任务存在重复提交的可能。
    pub async fn recover_pending(&self) -> AppResult<usize> {
        let pending = video_tasks::Entity::find()
            .filter(video_tasks::Column::Status.is_in([TaskStatus::Pending, TaskStatus::Processing]))
            .filter(video_tasks::Column::Deleted.eq(0))
            .order_by_asc(video_tasks::Column::Id)
            .all(&self.pool)
            .await?;

        let count = pending.len();
        for task in pending {
            if task.task_id.starts_with(PLACEHOLDER_PREFIX) {
                log::warn!("恢复占位符任务{}，将重新提交provider", task.id);
            }
            self.queue.enqueue(task.id).await;
        }

        if count > 0 {
            log::info!("启动恢复: {count}个未完成任务重新入队");
        }
        Ok(count)
    }

    fn to_dto(task: &video_tasks::Model) -> VideoTaskDto {
        let mut dto = VideoTaskDto::new(&task.task_id, task.status.as_status_str());
        dto.progress = task.progress;
        dto.video_url = task.video_url.clone();
        dto.cover_url = task.cover_url.clone();
        dto.duration = task.duration;
        dto.error_message = task.error_msg.clone();
        dto.metadata.insert("dbTaskId".to_string(), json!(task.id));
        dto.metadata
            .insert("provider".to_string(), json!(task.provider));
        dto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::credit_log_entity as credit_logs;
    use crate::entities::credit_logs::log_type;
    use crate::providers::VideoProvider;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按脚本返回结果的provider，并统计调用次数
    struct ScriptedProvider {
        submit_result: Mutex<Option<AppResult<VideoTaskDto>>>,
        query_results: Mutex<Vec<AppResult<VideoTaskDto>>>,
        query_calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(
            submit_result: AppResult<VideoTaskDto>,
            query_results: Vec<AppResult<VideoTaskDto>>,
        ) -> Self {
            Self {
                submit_result: Mutex::new(Some(submit_result)),
                query_results: Mutex::new(query_results),
                query_calls: AtomicUsize::new(0),
            }
        }

        fn query_call_count(&self) -> usize {
            self.query_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VideoProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn submit_task(&self, _request: &VideoGenerationRequest) -> AppResult<VideoTaskDto> {
            self.submit_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(VideoTaskDto::new("p-1", "PENDING")))
        }

        async fn query_task(&self, provider_task_id: &str) -> AppResult<VideoTaskDto> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.query_results.lock().unwrap();
            if results.is_empty() {
                return Ok(VideoTaskDto::new(provider_task_id, "PROCESSING"));
            }
            results.remove(0)
        }

        async fn cancel_task(&self, _provider_task_id: &str) -> bool {
            false
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn dto(task_id: &str, status: &str, progress: i32) -> VideoTaskDto {
        let mut d = VideoTaskDto::new(task_id, status);
        d.progress = progress;
        d
    }

    fn test_config(max_attempts: u32) -> VideoConfig {
        VideoConfig {
            default_provider: "scripted".to_string(),
            poll_interval_secs: 0,
            max_poll_attempts: max_attempts,
            worker_count: 1,
            queue_capacity: 16,
            refund_on_expired: true,
            ..Default::default()
        }
    }

    struct Fixture {
        db: DatabaseConnection,
        service: VideoTaskService,
        provider: Arc<ScriptedProvider>,
        user_id: i64,
        _rx: tokio::sync::mpsc::Receiver<i64>,
    }

    async fn setup(provider: ScriptedProvider, config: VideoConfig, credits: i32) -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let user = users::ActiveModel {
            openid: Set("openid-video".to_string()),
            credits: Set(credits),
            total_videos: Set(0),
            status: Set(0),
            deleted: Set(0),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let provider = Arc::new(provider);
        let mut providers: HashMap<String, Arc<dyn VideoProvider>> = HashMap::new();
        providers.insert("scripted".to_string(), provider.clone());
        let registry = Arc::new(ProviderRegistry::new(providers, "scripted"));

        let (queue, rx) = TaskQueue::new(config.queue_capacity);
        let service = VideoTaskService::new(
            db.clone(),
            registry,
            CreditService::new(db.clone()),
            queue,
            config,
        );

        Fixture {
            db,
            service,
            provider,
            user_id: user.id,
            _rx: rx,
        }
    }

    fn request() -> VideoGenerationRequest {
        serde_json::from_str(r#"{"prompt": "海上生明月"}"#).unwrap()
    }

    async fn refund_count(db: &DatabaseConnection, user_id: i64) -> u64 {
        credit_logs::Entity::find()
            .filter(credit_logs::Column::UserId.eq(user_id))
            .filter(credit_logs::Column::LogType.eq(log_type::REFUND))
            .count(db)
            .await
            .unwrap()
    }

    async fn balance(db: &DatabaseConnection, user_id: i64) -> i32 {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .credits
    }

    #[test]
    fn test_calculate_credits() {
        let mut req = request();
        assert_eq!(VideoTaskService::calculate_credits(&req), 10);
        req.resolution = "1080p".to_string();
        assert_eq!(VideoTaskService::calculate_credits(&req), 15);
        req.duration = 2;
        assert_eq!(VideoTaskService::calculate_credits(&req), 9);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut req = request();
        req.prompt = "  ".to_string();
        assert!(VideoTaskService::validate(&req).is_err());

        let mut req = request();
        req.duration = 11;
        assert!(VideoTaskService::validate(&req).is_err());

        let mut req = request();
        req.temperature = 1.5;
        assert!(VideoTaskService::validate(&req).is_err());
    }

    #[tokio::test]
    async fn test_create_task_reserves_and_persists_placeholder() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            20,
        )
        .await;

        let dto = f.service.create_task(request(), f.user_id).await.unwrap();
        assert_eq!(dto.status, "PENDING");
        assert!(dto.task_id.starts_with("pending-"));
        assert_eq!(balance(&f.db, f.user_id).await, 10);

        let task = video_tasks::Entity::find()
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.cost_credits, 10);
        assert_eq!(task.status, TaskStatus::Pending);

        let user = users::Entity::find_by_id(f.user_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.total_videos, 1);
    }

    #[tokio::test]
    async fn test_create_task_insufficient_credits() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            5,
        )
        .await;

        let err = f.service.create_task(request(), f.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredits { required: 10 }));
        assert_eq!(balance(&f.db, f.user_id).await, 5);
        // 不创建任务行
        assert_eq!(
            video_tasks::Entity::find().count(&f.db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_generation_success_transitions_to_completed() {
        let f = setup(
            ScriptedProvider::new(
                Ok(dto("p-1", "PENDING", 0)),
                vec![
                    Ok(dto("p-1", "PROCESSING", 40)),
                    Ok({
                        let mut d = dto("p-1", "COMPLETED", 100);
                        d.video_url = Some("https://v.example.com/out.mp4".to_string());
                        d
                    }),
                ],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.task_id, "p-1");
        assert_eq!(task.video_url.as_deref(), Some("https://v.example.com/out.mp4"));
        assert!(task.complete_time.is_some());
        // 成功不退款
        assert_eq!(refund_count(&f.db, f.user_id).await, 0);
        assert_eq!(balance(&f.db, f.user_id).await, 10);
    }

    #[tokio::test]
    async fn test_submit_failure_refunds_once() {
        let f = setup(
            ScriptedProvider::new(
                Err(AppError::ProviderSubmitError("上游拒绝".to_string())),
                vec![],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error_msg.as_deref().unwrap().contains("上游拒绝"));
        assert_eq!(refund_count(&f.db, f.user_id).await, 1);
        assert_eq!(balance(&f.db, f.user_id).await, 20);
    }

    #[tokio::test]
    async fn test_poll_failure_stops_loop_and_refunds_once() {
        let f = setup(
            ScriptedProvider::new(
                Ok(dto("p-1", "PENDING", 0)),
                vec![
                    Ok(dto("p-1", "PROCESSING", 10)),
                    Ok(dto("p-1", "PROCESSING", 20)),
                    Ok({
                        let mut d = dto("p-1", "FAILED", 20);
                        d.error_message = Some("渲染失败".to_string());
                        d
                    }),
                ],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        // 第3次查询遇到FAILED即停止，不再消耗剩余57次
        assert_eq!(f.provider.query_call_count(), 3);

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_msg.as_deref(), Some("渲染失败"));
        assert_eq!(refund_count(&f.db, f.user_id).await, 1);
        assert_eq!(balance(&f.db, f.user_id).await, 20);
    }

    #[tokio::test]
    async fn test_poll_exhaustion_expires_and_refunds() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(3),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        assert_eq!(f.provider.query_call_count(), 3);

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Expired);
        assert_eq!(refund_count(&f.db, f.user_id).await, 1);
        assert_eq!(balance(&f.db, f.user_id).await, 20);
    }

    #[tokio::test]
    async fn test_poll_exhaustion_without_refund_policy() {
        let mut config = test_config(2);
        config.refund_on_expired = false;
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            config,
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Expired);
        assert_eq!(refund_count(&f.db, f.user_id).await, 0);
        assert_eq!(balance(&f.db, f.user_id).await, 10);
    }

    #[tokio::test]
    async fn test_settle_is_exactly_once() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        let task = f.service.find_task(task_id).await.unwrap().unwrap();

        // 两次结算同一任务，只有第一次赢得迁移并退款
        f.service
            .settle_terminal(&task, TaskStatus::Failed, None, Some("err".into()))
            .await
            .unwrap();
        f.service
            .settle_terminal(&task, TaskStatus::Failed, None, Some("err".into()))
            .await
            .unwrap();

        assert_eq!(refund_count(&f.db, f.user_id).await, 1);
        assert_eq!(balance(&f.db, f.user_id).await, 20);
    }

    #[tokio::test]
    async fn test_query_task_terminal_skips_provider() {
        let f = setup(
            ScriptedProvider::new(
                Ok(dto("p-1", "PENDING", 0)),
                vec![Ok(dto("p-1", "COMPLETED", 100))],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();
        let calls_after_generation = f.provider.query_call_count();

        // 终态任务重复查询不再触达provider，返回值稳定
        let first = f.service.query_task(task_id, f.user_id).await.unwrap();
        let second = f.service.query_task(task_id, f.user_id).await.unwrap();
        assert_eq!(f.provider.query_call_count(), calls_after_generation);
        assert_eq!(first.status, "COMPLETED");
        assert_eq!(first.status, second.status);
        assert_eq!(first.progress, second.progress);
    }

    #[tokio::test]
    async fn test_query_task_ownership_check() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();

        let err = f.service.query_task(task_id, f.user_id + 1).await.unwrap_err();
        assert!(matches!(err, AppError::TaskNotFound));
        let err = f.service.query_task(9999, f.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_query_task_provider_error_falls_back_to_stored() {
        let f = setup(
            ScriptedProvider::new(
                Ok(dto("p-1", "PROCESSING", 30)),
                vec![Err(AppError::ProviderQueryError("超时".to_string()))],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        // 只执行提交阶段：手动写入provider真实ID与PROCESSING状态
        let task = f.service.find_task(task_id).await.unwrap().unwrap();
        f.service
            .submit_phase(&task, f.provider.as_ref() as &dyn VideoProvider)
            .await
            .unwrap();

        let dto = f.service.query_task(task_id, f.user_id).await.unwrap();
        assert_eq!(dto.status, "PROCESSING");
        assert_eq!(dto.progress, 30);
    }

    #[tokio::test]
    async fn test_recover_pending_enqueues_non_terminal() {
        let mut f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            40,
        )
        .await;

        f.service.create_task(request(), f.user_id).await.unwrap();
        f.service.create_task(request(), f.user_id).await.unwrap();
        // 清空入队记录，模拟重启
        while f._rx.try_recv().is_ok() {}

        let recovered = f.service.recover_pending().await.unwrap();
        assert_eq!(recovered, 2);
        assert!(f._rx.try_recv().is_ok());
        assert!(f._rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_scenario_720p_balance_20() {
        // 5秒/720p/余额20: 需要10积分，预留后余额10，轮询经processing到completed
        let f = setup(
            ScriptedProvider::new(
                Ok(dto("p-1", "PENDING", 0)),
                vec![
                    Ok(dto("p-1", "PROCESSING", 50)),
                    Ok(dto("p-1", "COMPLETED", 100)),
                ],
            ),
            test_config(60),
            20,
        )
        .await;

        let created = f.service.create_task(request(), f.user_id).await.unwrap();
        assert_eq!(balance(&f.db, f.user_id).await, 10);

        let task_id = created.metadata["dbTaskId"].as_i64().unwrap();
        f.service.run_generation(task_id).await.unwrap();

        let task = video_tasks::Entity::find_by_id(task_id)
            .one(&f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(balance(&f.db, f.user_id).await, 10);
    }

    #[tokio::test]
    async fn test_get_user_tasks_ordering() {
        let f = setup(
            ScriptedProvider::new(Ok(dto("p-1", "PENDING", 0)), vec![]),
            test_config(60),
            40,
        )
        .await;

        f.service.create_task(request(), f.user_id).await.unwrap();
        let mut second = request();
        second.prompt = "第二个任务".to_string();
        f.service.create_task(second, f.user_id).await.unwrap();

        let page = PageQuery {
            current: Some(1),
            size: Some(10),
        };
        let result = f.service.get_user_tasks(f.user_id, &page).await.unwrap();
        assert_eq!(result.total, 2);
        // 创建时间倒序，后创建的在前
        assert_eq!(result.records[0].prompt, "第二个任务");
    }
}
