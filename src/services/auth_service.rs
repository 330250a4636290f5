use crate::cache::MemoryCache;
use crate::config::UserConfig;
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::external::WeChatApi;
use crate::models::{LoginRequest, PhoneBindRequest, PhoneLoginRequest, UserInfo, UserUpdateRequest};
use crate::services::{ClientInfo, CreditService, LoginLogService};
use crate::utils::{JwtService, generate_six_digit_code, validate_phone};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use std::sync::Arc;
use std::time::Duration;

/// 短信验证码有效期
const SMS_CODE_TTL: Duration = Duration::from_secs(300);
/// 同一手机号重发间隔
const SMS_RESEND_INTERVAL: Duration = Duration::from_secs(60);

/// 认证与用户资料服务
#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    wechat_client: Arc<dyn WeChatApi>,
    credit_service: CreditService,
    login_log_service: LoginLogService,
    cache: MemoryCache,
    user_config: UserConfig,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt_service: JwtService,
        wechat_client: Arc<dyn WeChatApi>,
        credit_service: CreditService,
        cache: MemoryCache,
        user_config: UserConfig,
    ) -> Self {
        let login_log_service = LoginLogService::new(pool.clone());
        Self {
            pool,
            jwt_service,
            wechat_client,
            credit_service,
            login_log_service,
            cache,
            user_config,
        }
    }

    /// 微信小程序登录：code换openid，首次登录建档并发放注册赠送积分
    pub async fn login(&self, request: LoginRequest, client: &ClientInfo) -> AppResult<UserInfo> {
        let session = match self.wechat_client.code_to_session(&request.code).await {
            Ok(session) => session,
            Err(e) => {
                let _ = self
                    .login_log_service
                    .record_fail(None, &e.to_string(), client)
                    .await;
                return Err(e);
            }
        };

        let existing = users::Entity::find()
            .filter(users::Column::Openid.eq(session.openid.clone()))
            .filter(users::Column::Deleted.eq(0))
            .one(&self.pool)
            .await?;

        let user = match existing {
            Some(user) => {
                if user.status == 1 {
                    let _ = self
                        .login_log_service
                        .record_fail(Some(user.id), "账号已被禁用", client)
                        .await;
                    return Err(AppError::AccountDisabled);
                }
                self.refresh_profile(user, &request).await?
            }
            None => {
                let user = self.create_user(&session.openid, session.unionid, &request).await?;
                log::info!("创建新用户: userId={}, openid={}", user.id, session.openid);
                user
            }
        };

        let token = self.jwt_service.generate_token(user.id)?;
        self.login_log_service.record_success(user.id, client).await?;
        log::info!("用户登录成功: userId={}", user.id);

        // 重新读取，带上注册赠送后的余额
        let user = self.require_user(user.id).await?;
        Ok(UserInfo::from_user(user, Some(token)))
    }

    /// 手机号+验证码登录，仅限已绑定手机号的用户
    pub async fn login_by_phone(
        &self,
        request: PhoneLoginRequest,
        client: &ClientInfo,
    ) -> AppResult<UserInfo> {
        validate_phone(&request.phone)?;

        let code_key = format!("sms:code:{}", request.phone);
        let cached_code = self
            .cache
            .get(&code_key)
            .ok_or_else(|| AppError::ValidationError("验证码已过期，请重新获取".into()))?;
        if cached_code != request.code {
            return Err(AppError::ValidationError("验证码错误".into()));
        }

        let user = users::Entity::find()
            .filter(users::Column::Phone.eq(request.phone.clone()))
            .filter(users::Column::Deleted.eq(0))
            .one(&self.pool)
            .await?;
        let Some(user) = user else {
            let _ = self
                .login_log_service
                .record_fail(None, "手机号未注册", client)
                .await;
            return Err(AppError::ValidationError("该手机号未注册".into()));
        };
        if user.status == 1 {
            let _ = self
                .login_log_service
                .record_fail(Some(user.id), "账号已被禁用", client)
                .await;
            return Err(AppError::AccountDisabled);
        }

        let token = self.jwt_service.generate_token(user.id)?;
        self.login_log_service.record_success(user.id, client).await?;
        self.cache.delete(&code_key);
        log::info!("用户手机号登录成功: userId={}", user.id);

        Ok(UserInfo::from_user(user, Some(token)))
    }

    async fn create_user(
        &self,
        openid: &str,
        unionid: Option<String>,
        request: &LoginRequest,
    ) -> AppResult<users::Model> {
        let nickname = request
            .nickname
            .clone()
            .unwrap_or_else(|| format!("用户{}", Utc::now().timestamp_millis()));

        let user = users::ActiveModel {
            openid: Set(openid.to_string()),
            unionid: Set(unionid),
            nickname: Set(Some(nickname)),
            avatar: Set(request.avatar.clone()),
            credits: Set(0),
            total_videos: Set(0),
            status: Set(0),
            deleted: Set(0),
            create_time: Set(Some(Utc::now())),
            update_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        // 注册赠送走账本，保证流水与余额一致
        let bonus = self.user_config.register_bonus_credits;
        if bonus > 0 {
            self.credit_service
                .top_up(user.id, bonus, None, &format!("新用户注册赠送{bonus}积分"))
                .await?;
        }

        Ok(user)
    }

    async fn refresh_profile(
        &self,
        user: users::Model,
        request: &LoginRequest,
    ) -> AppResult<users::Model> {
        let nickname_changed =
            request.nickname.is_some() && request.nickname != user.nickname;
        let avatar_changed = request.avatar.is_some() && request.avatar != user.avatar;

        if !nickname_changed && !avatar_changed {
            return Ok(user);
        }

        let mut model = user.into_active_model();
        if nickname_changed {
            model.nickname = Set(request.nickname.clone());
        }
        if avatar_changed {
            model.avatar = Set(request.avatar.clone());
        }
        model.update_time = Set(Some(Utc::now()));
        Ok(model.update(&self.pool).await?)
    }

    async fn require_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .filter(users::Column::Deleted.eq(0))
            .one(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// 获取当前用户资料（手机号脱敏）
    pub async fn get_user_info(&self, user_id: i64) -> AppResult<UserInfo> {
        let user = self.require_user(user_id).await?;
        Ok(UserInfo::from_user(user, None))
    }

    /// 更新昵称/头像
    pub async fn update_user_info(
        &self,
        user_id: i64,
        request: UserUpdateRequest,
    ) -> AppResult<UserInfo> {
        if request.nickname.is_none() && request.avatar.is_none() {
            return Err(AppError::ValidationError("没有需要更新的字段".into()));
        }
        if let Some(nickname) = &request.nickname
            && (nickname.is_empty() || nickname.chars().count() > 30)
        {
            return Err(AppError::ValidationError("昵称长度需在1-30个字符".into()));
        }

        let mut model = self.require_user(user_id).await?.into_active_model();
        if let Some(nickname) = &request.nickname {
            model.nickname = Set(Some(nickname.clone()));
        }
        if let Some(avatar) = &request.avatar {
            model.avatar = Set(Some(avatar.clone()));
        }
        model.update_time = Set(Some(Utc::now()));
        let user = model.update(&self.pool).await?;

        log::info!("更新用户信息成功: userId={user_id}");
        Ok(UserInfo::from_user(user, None))
    }

    /// 发送短信验证码，返回的code仅在开启调试回显时对外可见
    pub async fn send_sms_code(&self, phone: &str) -> AppResult<Option<String>> {
        validate_phone(phone)?;

        let limit_key = format!("sms:limit:{phone}");
        if self.cache.exists(&limit_key) {
            return Err(AppError::SmsRateLimited);
        }

        let code = generate_six_digit_code();

        // TODO: 接入短信通道，当前仅记录日志
        log::info!("发送短信验证码: phone={phone}, code={code}");

        self.cache
            .set(&format!("sms:code:{phone}"), &code, SMS_CODE_TTL);
        self.cache.set(&limit_key, "1", SMS_RESEND_INTERVAL);

        Ok(self.user_config.sms_debug_echo.then_some(code))
    }

    /// 绑定手机号
    pub async fn bind_phone(&self, user_id: i64, request: PhoneBindRequest) -> AppResult<()> {
        validate_phone(&request.phone)?;

        let code_key = format!("sms:code:{}", request.phone);
        let cached_code = self
            .cache
            .get(&code_key)
            .ok_or_else(|| AppError::ValidationError("验证码已过期，请重新获取".into()))?;
        if cached_code != request.code {
            return Err(AppError::ValidationError("验证码错误".into()));
        }

        let occupied = users::Entity::find()
            .filter(users::Column::Phone.eq(request.phone.clone()))
            .filter(users::Column::Id.ne(user_id))
            .filter(users::Column::Deleted.eq(0))
            .one(&self.pool)
            .await?;
        if occupied.is_some() {
            return Err(AppError::ValidationError("该手机号已被其他账号绑定".into()));
        }

        let mut model = self.require_user(user_id).await?.into_active_model();
        model.phone = Set(Some(request.phone.clone()));
        model.update_time = Set(Some(Utc::now()));
        model.update(&self.pool).await?;

        self.cache.delete(&code_key);
        log::info!("用户绑定手机号成功: userId={user_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{credit_log_entity, login_log_entity};
    use crate::external::WeChatSession;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    /// 按剧本返回会话的微信接口替身，None表示接口报错
    struct ScriptedWeChat {
        openid: Option<&'static str>,
    }

    #[async_trait]
    impl WeChatApi for ScriptedWeChat {
        async fn code_to_session(&self, _code: &str) -> AppResult<WeChatSession> {
            match self.openid {
                Some(openid) => Ok(WeChatSession {
                    openid: openid.to_string(),
                    unionid: None,
                }),
                None => Err(AppError::WeChatApiError("invalid js_code".to_string())),
            }
        }
    }

    fn service_with(db: &DatabaseConnection, openid: Option<&'static str>) -> AuthService {
        AuthService::new(
            db.clone(),
            JwtService::new("test-secret", 3600),
            Arc::new(ScriptedWeChat { openid }),
            CreditService::new(db.clone()),
            MemoryCache::new(),
            UserConfig {
                register_bonus_credits: 100,
                sms_debug_echo: true,
            },
        )
    }

    async fn setup() -> (DatabaseConnection, AuthService, i64) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let user = users::ActiveModel {
            openid: Set("openid-auth".to_string()),
            nickname: Set(Some("测试用户".to_string())),
            credits: Set(0),
            total_videos: Set(0),
            status: Set(0),
            deleted: Set(0),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let service = service_with(&db, Some("openid-wx"));
        (db, service, user.id)
    }

    fn login_request(code: &str) -> LoginRequest {
        LoginRequest {
            code: code.to_string(),
            nickname: Some("微信用户".to_string()),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_login_creates_then_reuses_user() {
        let (db, service, _user_id) = setup().await;
        let client = ClientInfo::default();

        let first = service.login(login_request("c1"), &client).await.unwrap();
        assert!(first.token.is_some());
        assert_eq!(first.credits, 100);

        // 同一openid再次登录复用账号，不重复发放注册赠送
        let second = service.login(login_request("c2"), &client).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.credits, 100);

        let logs = credit_log_entity::Entity::find()
            .filter(credit_log_entity::Column::UserId.eq(first.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);

        let successes = login_log_entity::Entity::find()
            .filter(login_log_entity::Column::UserId.eq(first.id))
            .filter(login_log_entity::Column::Status.eq(1))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(successes.len(), 2);
    }

    #[tokio::test]
    async fn test_login_disabled_account_is_rejected() {
        let (db, service, _user_id) = setup().await;

        users::ActiveModel {
            openid: Set("openid-wx".to_string()),
            credits: Set(0),
            total_videos: Set(0),
            status: Set(1),
            deleted: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let err = service
            .login(login_request("c1"), &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountDisabled));

        let fails = login_log_entity::Entity::find()
            .filter(login_log_entity::Column::Status.eq(0))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(fails.len(), 1);
        assert!(fails[0].user_id.is_some());
        assert_eq!(fails[0].fail_reason.as_deref(), Some("账号已被禁用"));
    }

    #[tokio::test]
    async fn test_login_wechat_failure_records_fail_log() {
        let (db, _service, _user_id) = setup().await;
        let service = service_with(&db, None);

        let err = service
            .login(login_request("bad"), &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WeChatApiError(_)));

        // 换不到openid时记一条无归属的失败日志
        let fails = login_log_entity::Entity::find()
            .filter(login_log_entity::Column::Status.eq(0))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(fails.len(), 1);
        assert!(fails[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_login_by_phone_flow() {
        let (db, service, user_id) = setup().await;
        let client = ClientInfo::default();

        let mut model = users::Entity::find_by_id(user_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        model.phone = Set(Some("13812341234".to_string()));
        model.update(&db).await.unwrap();

        let code = service
            .send_sms_code("13812341234")
            .await
            .unwrap()
            .unwrap();

        // 错误验证码被拒
        let err = service
            .login_by_phone(
                PhoneLoginRequest {
                    phone: "13812341234".to_string(),
                    code: "000000".to_string(),
                },
                &client,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let info = service
            .login_by_phone(
                PhoneLoginRequest {
                    phone: "13812341234".to_string(),
                    code: code.clone(),
                },
                &client,
            )
            .await
            .unwrap();
        assert_eq!(info.id, user_id);
        assert!(info.token.is_some());

        // 验证码登录成功后即失效
        let err = service
            .login_by_phone(
                PhoneLoginRequest {
                    phone: "13812341234".to_string(),
                    code,
                },
                &client,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_login_by_phone_unregistered() {
        let (_db, service, _user_id) = setup().await;

        let code = service
            .send_sms_code("13900001111")
            .await
            .unwrap()
            .unwrap();
        let err = service
            .login_by_phone(
                PhoneLoginRequest {
                    phone: "13900001111".to_string(),
                    code,
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_create_user_grants_register_bonus() {
        let (db, service, _user_id) = setup().await;

        let user = service
            .create_user(
                "openid-new",
                None,
                &LoginRequest {
                    code: "ignored".to_string(),
                    nickname: Some("新用户".to_string()),
                    avatar: None,
                },
            )
            .await
            .unwrap();

        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.credits, 100);

        // 赠送走账本，留下一条充值流水
        let logs = crate::entities::credit_log_entity::Entity::find()
            .filter(crate::entities::credit_log_entity::Column::UserId.eq(user.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].amount, 100);
        assert_eq!(logs[0].balance, 100);
    }

    #[tokio::test]
    async fn test_refresh_profile_updates_changed_fields() {
        let (db, service, user_id) = setup().await;

        let user = users::Entity::find_by_id(user_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();

        // 资料未变化时不写库
        let same = service
            .refresh_profile(
                user.clone(),
                &LoginRequest {
                    code: String::new(),
                    nickname: Some("测试用户".to_string()),
                    avatar: None,
                },
            )
            .await
            .unwrap();
        assert!(same.update_time.is_none());

        let updated = service
            .refresh_profile(
                user,
                &LoginRequest {
                    code: String::new(),
                    nickname: Some("改名后".to_string()),
                    avatar: Some("https://img.example.com/a.png".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.nickname.as_deref(), Some("改名后"));
        assert!(updated.update_time.is_some());
    }

    #[tokio::test]
    async fn test_sms_code_rate_limit() {
        let (_db, service, _user_id) = setup().await;

        let code = service.send_sms_code("13812341234").await.unwrap();
        assert!(code.is_some());

        // 60秒内重发被拒
        let err = service.send_sms_code("13812341234").await.unwrap_err();
        assert!(matches!(err, AppError::SmsRateLimited));
    }

    #[tokio::test]
    async fn test_sms_code_invalid_phone() {
        let (_db, service, _user_id) = setup().await;
        assert!(service.send_sms_code("123").await.is_err());
    }

    #[tokio::test]
    async fn test_bind_phone_flow() {
        let (db, service, user_id) = setup().await;

        let code = service
            .send_sms_code("13812341234")
            .await
            .unwrap()
            .unwrap();

        // 错误验证码被拒
        let err = service
            .bind_phone(
                user_id,
                PhoneBindRequest {
                    phone: "13812341234".to_string(),
                    code: "000000".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        service
            .bind_phone(
                user_id,
                PhoneBindRequest {
                    phone: "13812341234".to_string(),
                    code,
                },
            )
            .await
            .unwrap();

        let user = users::Entity::find_by_id(user_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.phone.as_deref(), Some("13812341234"));

        // 资料读取返回脱敏手机号
        let info = service.get_user_info(user_id).await.unwrap();
        assert_eq!(info.phone.as_deref(), Some("138****1234"));
    }

    #[tokio::test]
    async fn test_bind_phone_already_taken() {
        let (db, service, user_id) = setup().await;

        users::ActiveModel {
            openid: Set("openid-other".to_string()),
            phone: Set(Some("13812341234".to_string())),
            credits: Set(0),
            total_videos: Set(0),
            status: Set(0),
            deleted: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let code = service
            .send_sms_code("13812341234")
            .await
            .unwrap()
            .unwrap();
        let err = service
            .bind_phone(
                user_id,
                PhoneBindRequest {
                    phone: "13812341234".to_string(),
                    code,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_update_user_info() {
        let (_db, service, user_id) = setup().await;

        let info = service
            .update_user_info(
                user_id,
                UserUpdateRequest {
                    nickname: Some("新昵称".to_string()),
                    avatar: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(info.nickname.as_deref(), Some("新昵称"));

        let err = service
            .update_user_info(
                user_id,
                UserUpdateRequest {
                    nickname: None,
                    avatar: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
