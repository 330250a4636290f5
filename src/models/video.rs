use crate::entities::video_task_entity as video_tasks;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// 视频生成请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationRequest {
    /// 提示词（必填）
    pub prompt: String,
    /// 图生视频时的参考图URL
    pub image_url: Option<String>,
    /// 时长（秒）：2-10
    #[serde(default = "default_duration")]
    pub duration: i32,
    /// 分辨率：720p/1080p
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// 风格：realistic/anime/artistic
    #[serde(default = "default_style")]
    pub style: String,
    /// 横竖屏：landscape/portrait/square
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// 创意度：0.0-1.0
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// 扩展参数
    pub extra_params: Option<HashMap<String, serde_json::Value>>,
}

fn default_duration() -> i32 {
    5
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_style() -> String {
    "realistic".to_string()
}

fn default_aspect_ratio() -> String {
    "landscape".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

/// 视频任务列表条目
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoTaskItem {
    pub id: i64,
    /// provider侧任务ID
    pub task_id: String,
    pub provider: String,
    pub prompt: String,
    pub status: String,
    pub progress: i32,
    pub video_url: Option<String>,
    pub cover_url: Option<String>,
    pub duration: Option<i32>,
    pub cost_credits: i32,
    pub error_msg: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
}

impl From<video_tasks::Model> for VideoTaskItem {
    fn from(task: video_tasks::Model) -> Self {
        Self {
            id: task.id,
            task_id: task.task_id,
            provider: task.provider,
            prompt: task.prompt,
            status: task.status.as_status_str().to_string(),
            progress: task.progress,
            video_url: task.video_url,
            cover_url: task.cover_url,
            duration: task.duration,
            cost_credits: task.cost_credits,
            error_msg: task.error_msg,
            create_time: task.create_time,
            complete_time: task.complete_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: VideoGenerationRequest =
            serde_json::from_str(r#"{"prompt": "一只在月球上跳舞的猫"}"#).unwrap();
        assert_eq!(req.duration, 5);
        assert_eq!(req.resolution, "720p");
        assert_eq!(req.style, "realistic");
        assert_eq!(req.aspect_ratio, "landscape");
        assert!((req.temperature - 0.7).abs() < f64::EPSILON);
        assert!(req.image_url.is_none());
    }

    #[test]
    fn test_request_camel_case_fields() {
        let req: VideoGenerationRequest = serde_json::from_str(
            r#"{"prompt": "p", "imageUrl": "http://img", "aspectRatio": "portrait"}"#,
        )
        .unwrap();
        assert_eq!(req.image_url.as_deref(), Some("http://img"));
        assert_eq!(req.aspect_ratio, "portrait");
    }
}
