//! WenwenAI适配器（OpenAI chat/completions兼容格式）
//!
//! 上游没有独立的任务查询接口，提交即返回结果内容，因此把任务快照
//! 写进进程内缓存供后续query_task使用；取消即丢弃缓存条目。

use crate::cache::MemoryCache;
use crate::config::WenwenaiConfig;
use crate::error::{AppError, AppResult};
use crate::models::VideoGenerationRequest;
use crate::providers::{VideoProvider, VideoTaskDto};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// 任务快照缓存有效期
const TASK_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct WenwenaiProvider {
    client: Client,
    config: WenwenaiConfig,
    task_cache: MemoryCache,
}

impl WenwenaiProvider {
    pub fn new(config: WenwenaiConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            task_cache: MemoryCache::new(),
        }
    }

    async fn chat_completion(&self, content: &str) -> AppResult<ChatCompletionResponse> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": content}],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
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

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderSubmitError(format!("响应解析失败: {e}")))
    }

    fn cache_key(&self, task_id: &str) -> String {
        format!("wenwenai:task:{task_id}")
    }

    fn store_task(&self, dto: &VideoTaskDto) {
        if let Ok(serialized) = serde_json::to_string(dto) {
            self.task_cache
                .set(&self.cache_key(&dto.task_id), &serialized, TASK_CACHE_TTL);
        }
    }
}

/// 上游不接受结构化参数，全部折叠进提示词
fn build_prompt_content(request: &VideoGenerationRequest) -> String {
    let mut content = request.prompt.clone();
    content.push_str(&format!(" [时长:{}秒]", request.duration));
    content.push_str(&format!(" [分辨率:{}]", request.resolution));
    content.push_str(&format!(" [风格:{}]", request.style));
    content.push_str(&format!(
        " [比例:{}]",
        convert_aspect_ratio(&request.aspect_ratio)
    ));
    content
}

/// landscape -> 16:9, portrait -> 9:16, square -> 1:1；已是比例格式的原样返回
fn convert_aspect_ratio(aspect_ratio: &str) -> String {
    match aspect_ratio.to_lowercase().as_str() {
        "landscape" => "16:9".to_string(),
        "portrait" => "9:16".to_string(),
        "square" => "1:1".to_string(),
        other => other.to_string(),
    }
}

/// 从返回内容中提取视频信息：优先按JSON解析，失败则扫描裸URL
fn parse_content_into(dto: &mut VideoTaskDto, content: &str) {
    if let Ok(content_json) = serde_json::from_str::<serde_json::Value>(content) {
        let video_url = pick_string(&content_json, &["video_url", "videoUrl", "url", "video"]);
        if let Some(video_url) = video_url {
            dto.video_url = Some(video_url);
            dto.status = "COMPLETED".to_string();
            dto.progress = 100;
        }
        dto.cover_url = pick_string(
            &content_json,
            &["cover_url", "coverUrl", "thumbnail", "cover"],
        );
        if let Some(duration) = content_json.get("duration").and_then(|v| v.as_i64()) {
            dto.duration = Some(duration as i32);
        }
        return;
    }

    for part in content.split_whitespace() {
        if part.starts_with("http://") || part.starts_with("https://") {
            dto.video_url = Some(part.to_string());
            dto.status = "COMPLETED".to_string();
            dto.progress = 100;
            break;
        }
    }
}

fn pick_string(obj: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

#[async_trait]
impl VideoProvider for WenwenaiProvider {
    fn name(&self) -> &str {
        "wenwenai"
    }

    async fn submit_task(&self, request: &VideoGenerationRequest) -> AppResult<VideoTaskDto> {
        log::info!("WenwenAI - 提交任务: {}", request.prompt);

        let content = build_prompt_content(request);
        let response = self.chat_completion(&content).await?;

        let task_id = response
            .id
            .unwrap_or_else(|| format!("task_{}", Uuid::new_v4().simple()));

        let mut dto = VideoTaskDto::new(&task_id, "PROCESSING");
        if let Some(content) = response
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
        {
            parse_content_into(&mut dto, content);
        }

        dto.metadata
            .insert("provider".to_string(), json!("wenwenai"));
        dto.metadata
            .insert("model".to_string(), json!(self.config.model));

        self.store_task(&dto);
        Ok(dto)
    }

    async fn query_task(&self, provider_task_id: &str) -> AppResult<VideoTaskDto> {
        if let Some(serialized) = self.task_cache.get(&self.cache_key(provider_task_id))
            && let Ok(dto) = serde_json::from_str::<VideoTaskDto>(&serialized)
        {
            return Ok(dto);
        }

        // 上游无查询接口，缓存丢失后只能返回占位状态
        log::warn!("WenwenAI - 任务不在缓存中: {provider_task_id}");
        let mut dto = VideoTaskDto::new(provider_task_id, "PENDING");
        dto.error_message = Some("任务信息未找到".to_string());
        Ok(dto)
    }

    async fn cancel_task(&self, provider_task_id: &str) -> bool {
        self.task_cache.delete(&self.cache_key(provider_task_id));
        log::info!("WenwenAI - 已移除任务缓存: {provider_task_id}");
        true
    }

    async fn health_check(&self) -> bool {
        match self.chat_completion("health check").await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("WenwenAI - 健康检查失败: {e}");
                false
            }
        }
    }
}
