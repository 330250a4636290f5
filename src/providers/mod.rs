//! 视频生成provider抽象
//!
//! 每个第三方后端实现一份 [`VideoProvider`]，对上层只暴露统一的
//! [`VideoTaskDto`]，provider自有的报文结构不向外泄露。

pub mod sora_proxy;
pub mod wenwenai;

pub use sora_proxy::SoraProxyProvider;
pub use wenwenai::WenwenaiProvider;

use crate::config::VideoConfig;
use crate::error::{AppError, AppResult};
use crate::models::VideoGenerationRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// provider归一化后的任务视图
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoTaskDto {
    pub task_id: String,
    /// PENDING/PROCESSING/COMPLETED/FAILED，未识别的原生状态大写透传
    pub status: String,
    pub progress: i32,
    pub video_url: Option<String>,
    pub cover_url: Option<String>,
    pub duration: Option<i32>,
    pub error_message: Option<String>,
    pub estimated_time: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VideoTaskDto {
    pub fn new(task_id: &str, status: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: status.to_string(),
            progress: 0,
            video_url: None,
            cover_url: None,
            duration: None,
            error_message: None,
            estimated_time: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "COMPLETED" | "FAILED" | "EXPIRED")
    }
}

/// provider原生状态词汇映射到统一状态集
///
/// 未识别的值大写透传而不是报错，调用方需要容忍。
pub fn map_provider_status(status: Option<&str>) -> String {
    let Some(status) = status else {
        return "PENDING".to_string();
    };
    match status.to_lowercase().as_str() {
        "pending" | "queued" => "PENDING".to_string(),
        "processing" | "running" => "PROCESSING".to_string(),
        "completed" | "success" => "COMPLETED".to_string(),
        "failed" | "error" => "FAILED".to_string(),
        _ => status.to_uppercase(),
    }
}

/// 视频生成后端的统一契约
#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 提交生成任务，失败时不产生任何部分任务
    async fn submit_task(&self, request: &VideoGenerationRequest) -> AppResult<VideoTaskDto>;

    /// 查询任务当前状态/进度/结果
    async fn query_task(&self, provider_task_id: &str) -> AppResult<VideoTaskDto>;

    /// 任务终态后获取结果，默认等价于query_task
    async fn get_result(&self, provider_task_id: &str) -> AppResult<VideoTaskDto> {
        self.query_task(provider_task_id).await
    }

    /// 尽力取消，不支持取消的provider返回false而不是报错
    async fn cancel_task(&self, provider_task_id: &str) -> bool;

    /// 轻量存活探测，永不报错
    async fn health_check(&self) -> bool;
}

impl std::fmt::Debug for dyn VideoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VideoProvider({})", self.name())
    }
}

/// 启动时根据配置注册provider的名称表，运行期不再变更
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VideoProvider>>,
    default_provider: String,
}

impl ProviderRegistry {
    pub fn new(providers: HashMap<String, Arc<dyn VideoProvider>>, default_provider: &str) -> Self {
        Self {
            providers,
            default_provider: default_provider.to_string(),
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn VideoProvider>> = HashMap::new();

        if config.sora_proxy.enabled {
            let provider = SoraProxyProvider::new(config.sora_proxy.clone());
            providers.insert(provider.name().to_string(), Arc::new(provider));
        }
        if config.wenwenai.enabled {
            let provider = WenwenaiProvider::new(config.wenwenai.clone());
            providers.insert(provider.name().to_string(), Arc::new(provider));
        }

        log::info!(
            "Video providers registered: {:?}, default: {}",
            providers.keys().collect::<Vec<_>>(),
            config.default_provider
        );

        Self::new(providers, &config.default_provider)
    }

    /// 按名称解析provider，省略时使用配置的默认值
    pub fn get(&self, name: Option<&str>) -> AppResult<Arc<dyn VideoProvider>> {
        let name = name.unwrap_or(&self.default_provider);
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::ProviderNotFound(name.to_string()))
    }

    /// healthCheck包装，任何失败吞掉返回false
    pub async fn is_available(&self, name: &str) -> bool {
        match self.get(Some(name)) {
            Ok(provider) => provider.health_check().await,
            Err(_) => false,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyProvider {
        name: String,
        healthy: bool,
    }

    #[async_trait]
    impl VideoProvider for DummyProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn submit_task(&self, _request: &VideoGenerationRequest) -> AppResult<VideoTaskDto> {
            Ok(VideoTaskDto::new("t-1", "PENDING"))
        }

        async fn query_task(&self, provider_task_id: &str) -> AppResult<VideoTaskDto> {
            Ok(VideoTaskDto::new(provider_task_id, "PROCESSING"))
        }

        async fn cancel_task(&self, _provider_task_id: &str) -> bool {
            false
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }
    }

    fn registry_with(names: &[(&str, bool)], default: &str) -> ProviderRegistry {
        let mut providers: HashMap<String, Arc<dyn VideoProvider>> = HashMap::new();
        for (name, healthy) in names {
            providers.insert(
                name.to_string(),
                Arc::new(DummyProvider {
                    name: name.to_string(),
                    healthy: *healthy,
                }),
            );
        }
        ProviderRegistry::new(providers, default)
    }

    #[test]
    fn test_map_provider_status() {
        assert_eq!(map_provider_status(Some("queued")), "PENDING");
        assert_eq!(map_provider_status(Some("pending")), "PENDING");
        assert_eq!(map_provider_status(Some("Running")), "PROCESSING");
        assert_eq!(map_provider_status(Some("processing")), "PROCESSING");
        assert_eq!(map_provider_status(Some("SUCCESS")), "COMPLETED");
        assert_eq!(map_provider_status(Some("error")), "FAILED");
        assert_eq!(map_provider_status(None), "PENDING");
        // 未识别的状态大写透传
        assert_eq!(map_provider_status(Some("throttled")), "THROTTLED");
    }

    #[tokio::test]
    async fn test_registry_resolves_default_and_named() {
        let registry = registry_with(&[("a", true), ("b", true)], "a");
        assert_eq!(registry.get(None).unwrap().name(), "a");
        assert_eq!(registry.get(Some("b")).unwrap().name(), "b");
    }

    #[tokio::test]
    async fn test_registry_unknown_provider() {
        let registry = registry_with(&[("a", true)], "a");
        let err = registry.get(Some("missing")).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_is_available_swallows_missing_provider() {
        let registry = registry_with(&[("a", false)], "a");
        assert!(!registry.is_available("a").await);
        assert!(!registry.is_available("missing").await);
    }

    #[test]
    fn test_disabled_provider_not_registered() {
        let mut config = VideoConfig::default();
        config.sora_proxy.enabled = false;
        config.wenwenai.enabled = true;
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.get(Some("sora-proxy")).is_err());
        assert!(registry.get(Some("wenwenai")).is_ok());
    }
}
