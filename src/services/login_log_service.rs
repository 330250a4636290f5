use crate::entities::login_log_entity as login_logs;
use crate::error::AppResult;
use actix_web::HttpRequest;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// 登录请求的客户端信息，由handler从HttpRequest提取后显式传入
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_request(req: &HttpRequest) -> Self {
        // X-Forwarded-For取链路中的第一个地址
        let ip = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()));

        let user_agent = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Self { ip, user_agent }
    }
}

/// 登录日志服务
#[derive(Clone)]
pub struct LoginLogService {
    pool: DatabaseConnection,
}

impl LoginLogService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn record_success(&self, user_id: i64, client: &ClientInfo) -> AppResult<()> {
        self.insert(Some(user_id), 1, None, client).await
    }

    /// 失败日志在识别出用户前user_id可能为空
    pub async fn record_fail(
        &self,
        user_id: Option<i64>,
        reason: &str,
        client: &ClientInfo,
    ) -> AppResult<()> {
        self.insert(user_id, 0, Some(reason.to_string()), client)
            .await
    }

    async fn insert(
        &self,
        user_id: Option<i64>,
        status: i32,
        fail_reason: Option<String>,
        client: &ClientInfo,
    ) -> AppResult<()> {
        let (device_type, browser, os) = client
            .user_agent
            .as_deref()
            .map(parse_user_agent)
            .unwrap_or((None, None, None));

        login_logs::ActiveModel {
            user_id: Set(user_id),
            login_ip: Set(client.ip.clone()),
            device_type: Set(device_type),
            browser: Set(browser),
            os: Set(os),
            status: Set(status),
            fail_reason: Set(fail_reason),
            create_time: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(())
    }
}

/// 从User-Agent中粗粒度解析设备/浏览器/系统
fn parse_user_agent(ua: &str) -> (Option<String>, Option<String>, Option<String>) {
    let lower = ua.to_lowercase();

    let device_type = if lower.contains("micromessenger") {
        "miniapp"
    } else if lower.contains("mobile") || lower.contains("android") || lower.contains("iphone") {
        "mobile"
    } else {
        "pc"
    };

    let browser = if lower.contains("micromessenger") {
        Some("WeChat")
    } else if lower.contains("edg") {
        Some("Edge")
    } else if lower.contains("chrome") {
        Some("Chrome")
    } else if lower.contains("firefox") {
        Some("Firefox")
    } else if lower.contains("safari") {
        Some("Safari")
    } else {
        None
    };

    let os = if lower.contains("android") {
        Some("Android")
    } else if lower.contains("iphone") || lower.contains("ipad") || lower.contains("ios") {
        Some("iOS")
    } else if lower.contains("windows") {
        Some("Windows")
    } else if lower.contains("mac os") {
        Some("macOS")
    } else if lower.contains("linux") {
        Some("Linux")
    } else {
        None
    };

    (
        Some(device_type.to_string()),
        browser.map(|b| b.to_string()),
        os.map(|o| o.to_string()),
    )
}
