use crate::entities::user_entity as users;
use crate::utils::mask_phone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 微信小程序登录请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// wx.login() 获取的临时code
    pub code: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

/// 用户信息（登录响应携带token）
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    /// 脱敏后的手机号
    pub phone: Option<String>,
    pub credits: i32,
    pub total_videos: i32,
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserInfo {
    pub fn from_user(user: users::Model, token: Option<String>) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            avatar: user.avatar,
            phone: user.phone.as_deref().map(mask_phone),
            credits: user.credits,
            total_videos: user.total_videos,
            create_time: user.create_time,
            token,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct SmsCodeQuery {
    pub phone: String,
}

/// 短信验证码响应（仅开发环境回显code）
#[derive(Debug, Serialize, ToSchema)]
pub struct SmsCodeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PhoneBindRequest {
    pub phone: String,
    pub code: String,
}

/// 手机号验证码登录请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct PhoneLoginRequest {
    pub phone: String,
    pub code: String,
}
