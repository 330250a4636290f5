//! Sora中转站REST适配器

use crate::config::SoraProxyConfig;
use crate::error::{AppError, AppResult};
use crate::models::VideoGenerationRequest;
use crate::providers::{VideoProvider, VideoTaskDto, map_provider_status};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// 中转站任务报文
#[derive(Debug, Deserialize)]
struct SoraTaskResponse {
    task_id: String,
    status: Option<String>,
    progress: Option<i32>,
    video_url: Option<String>,
    cover_url: Option<String>,
    duration: Option<i32>,
    error: Option<String>,
    estimated_time: Option<i64>,
}

pub struct SoraProxyProvider {
    client: Client,
    config: SoraProxyConfig,
}

impl SoraProxyProvider {
    pub fn new(config: SoraProxyConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn to_dto(&self, response: SoraTaskResponse) -> VideoTaskDto {
        let mut dto = VideoTaskDto::new(
            &response.task_id,
            &map_provider_status(response.status.as_deref()),
        );
        dto.progress = response.progress.unwrap_or(0);
        dto.video_url = response.video_url;
        dto.cover_url = response.cover_url;
        dto.duration = response.duration;
        dto.error_message = response.error;
        dto.estimated_time = response.estimated_time;
        dto.metadata
            .insert("provider".to_string(), json!("sora-proxy"));
        dto
    }
}

#[async_trait]
impl VideoProvider for SoraProxyProvider {
    fn name(&self) -> &str {
        "sora-proxy"
    }

    async fn submit_task(&self, request: &VideoGenerationRequest) -> AppResult<VideoTaskDto> {
        log::info!("Sora Proxy - 提交任务: {}", request.prompt);

        let mut body = json!({
            "prompt": request.prompt,
            "duration": request.duration,
            "resolution": request.resolution,
            "style": request.style,
            "aspect_ratio": request.aspect_ratio,
        });
        if let Some(image_url) = &request.image_url {
            body["image_url"] = json!(image_url);
        }

        let response = self
            .client
            .post(format!("{}/v1/video/generate", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderSubmitError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ProviderSubmitError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let task: SoraTaskResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderSubmitError(format!("响应解析失败: {e}")))?;

        Ok(self.to_dto(task))
    }

    async fn query_task(&self, provider_task_id: &str) -> AppResult<VideoTaskDto> {
        log::debug!("Sora Proxy - 查询任务: {provider_task_id}");

        let response = self
            .client
            .get(format!(
                "{}/v1/video/query/{provider_task_id}",
                self.config.base_url
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::ProviderQueryError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ProviderQueryError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let task: SoraTaskResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderQueryError(format!("响应解析失败: {e}")))?;

        Ok(self.to_dto(task))
    }

    async fn cancel_task(&self, provider_task_id: &str) -> bool {
        log::info!("Sora Proxy - 取消任务: {provider_task_id}");

        let result = self
            .client
            .post(format!(
                "{}/v1/video/cancel/{provider_task_id}",
                self.config.base_url
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Sora Proxy - 取消任务失败: {e}");
                false
            }
        }
    }

    async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Sora Proxy - 健康检查失败: {e}");
                false
            }
        }
    }
}
