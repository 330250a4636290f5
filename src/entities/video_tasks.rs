use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "video_tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// provider侧任务ID，提交成功前为本地占位符 pending-{uuid}
    pub task_id: String,
    pub provider: String,
    #[sea_orm(column_type = "Text")]
    pub prompt: String,
    /// 提交请求参数的JSON快照
    #[sea_orm(column_type = "Text", nullable)]
    pub params: Option<String>,
    pub status: TaskStatus,
    pub progress: i32,
    pub video_url: Option<String>,
    pub cover_url: Option<String>,
    pub duration: Option<i32>,
    pub cost_credits: i32,
    pub error_msg: Option<String>,
    pub deleted: i32,
    pub create_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum TaskStatus {
    #[sea_orm(num_value = 0)]
    Pending,
    #[sea_orm(num_value = 1)]
    Processing,
    #[sea_orm(num_value = 2)]
    Completed,
    #[sea_orm(num_value = 3)]
    Failed,
    #[sea_orm(num_value = 4)]
    Expired,
}

impl TaskStatus {
    /// 对外状态字符串，与小程序端约定一致
    pub fn as_status_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Expired => "EXPIRED",
        }
    }

    /// 未知值一律按排队中处理
    pub fn from_status_str(s: &str) -> Self {
        match s {
            "PROCESSING" => TaskStatus::Processing,
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            "EXPIRED" => TaskStatus::Expired,
            _ => TaskStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Expired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_str_round_trip() {
        let all = [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Expired,
        ];
        for status in all {
            assert_eq!(TaskStatus::from_status_str(status.as_status_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_str_defaults_to_pending() {
        assert_eq!(TaskStatus::from_status_str("RUNNING"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_status_str(""), TaskStatus::Pending);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Expired.is_terminal());
    }
}
