use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 统一响应包装: {code, message, data}
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: &str, data: T) -> Self {
        Self {
            code: 200,
            message: message.to_string(),
            data: Some(data),
        }
    }
}

/// 分页查询参数 ?current=&size=
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, IntoParams)]
pub struct PageQuery {
    pub current: Option<u64>,
    pub size: Option<u64>,
}

impl PageQuery {
    pub fn current(&self) -> u64 {
        self.current.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u64 {
        self.size.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> u64 {
        (self.current() - 1) * self.size()
    }
}

/// 分页结果: {records, total, current, size, pages}
#[derive(Debug, Serialize, ToSchema)]
pub struct PageResult<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub current: u64,
    pub size: u64,
    pub pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(records: Vec<T>, total: u64, current: u64, size: u64) -> Self {
        let pages = if size == 0 { 0 } else { total.div_ceil(size) };
        Self {
            records,
            total,
            current,
            size,
            pages,
        }
    }
}
