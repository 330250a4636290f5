use crate::config::WeChatConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// 微信 jscode2session 响应
///
/// 成功时返回 openid/session_key，失败时返回 errcode/errmsg。
#[derive(Debug, Deserialize)]
struct Jscode2SessionResponse {
    openid: Option<String>,
    unionid: Option<String>,
    #[allow(dead_code)]
    session_key: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WeChatSession {
    pub openid: String,
    pub unionid: Option<String>,
}

/// 微信服务端接口契约，登录流程只依赖这一层
#[async_trait]
pub trait WeChatApi: Send + Sync {
    /// 登录code换取openid
    async fn code_to_session(&self, code: &str) -> AppResult<WeChatSession>;
}

/// 微信小程序服务端接口客户端
#[derive(Clone)]
pub struct WeChatClient {
    client: Client,
    config: WeChatConfig,
}

impl WeChatClient {
    pub fn new(config: WeChatConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl WeChatApi for WeChatClient {
    async fn code_to_session(&self, code: &str) -> AppResult<WeChatSession> {
        let url = format!("{}/sns/jscode2session", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("appid", self.config.app_id.as_str()),
                ("secret", self.config.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::WeChatApiError(format!("请求失败: {e}")))?;

        let result: Jscode2SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::WeChatApiError(format!("响应解析失败: {e}")))?;

        if let Some(errcode) = result.errcode
            && errcode != 0
        {
            return Err(AppError::WeChatApiError(format!(
                "errcode={errcode}, errmsg={}",
                result.errmsg.unwrap_or_default()
            )));
        }

        let openid = result
            .openid
            .ok_or_else(|| AppError::WeChatApiError("响应缺少openid".to_string()))?;

        Ok(WeChatSession {
            openid,
            unionid: result.unionid,
        })
    }
}
