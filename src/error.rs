use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    AuthError(String),

    #[error("账号已被禁用，请联系客服")]
    AccountDisabled,

    #[error("{0}")]
    NotFound(String),

    #[error("任务不存在")]
    TaskNotFound,

    #[error("用户不存在")]
    UserNotFound,

    #[error("积分余额不足")]
    InsufficientBalance,

    #[error("积分不足，需要{required}积分")]
    InsufficientCredits { required: i32 },

    #[error("操作过于频繁，请稍后再试")]
    SmsRateLimited,

    #[error("不支持的视频生成服务商: {0}")]
    ProviderNotFound(String),

    #[error("视频任务提交失败: {0}")]
    ProviderSubmitError(String),

    #[error("视频任务查询失败: {0}")]
    ProviderQueryError(String),

    #[error("微信接口调用失败: {0}")]
    WeChatApiError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::AccountDisabled => {
                log::warn!("Disabled account attempted to login");
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::TaskNotFound | AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::InsufficientBalance | AppError::InsufficientCredits { .. } => {
                log::warn!("Credit check failed: {self}");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::SmsRateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::ProviderNotFound(name) => {
                log::warn!("Unknown video provider requested: {name}");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::ProviderSubmitError(msg) => {
                log::error!("Provider submit error: {msg}");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::ProviderQueryError(msg) => {
                log::error!("Provider query error: {msg}");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::WeChatApiError(msg) => {
                log::error!("WeChat API error: {msg}");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    StatusCode::UNAUTHORIZED,
                    "Token已过期或无效，请重新登录".to_string(),
                )
            }
            AppError::ReqwestError(err) => {
                log::error!("HTTP request error: {err}");
                (StatusCode::BAD_GATEWAY, "外部服务请求失败".to_string())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "系统异常，请稍后重试".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "系统异常，请稍后重试".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "code": status_code.as_u16(),
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_credits_message() {
        let err = AppError::InsufficientCredits { required: 15 };
        assert_eq!(err.to_string(), "积分不足，需要15积分");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::ValidationError("bad".into())
                .error_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::TaskNotFound.error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AccountDisabled.error_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::SmsRateLimited.error_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ProviderSubmitError("timeout".into())
                .error_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
