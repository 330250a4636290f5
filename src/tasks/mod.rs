//! 视频生成后台工作池
//!
//! 请求线程只负责落库和入队，有限个worker协程消费有界队列执行
//! 提交与轮询；任务行本身是持久状态，重启后由启动恢复重新入队。

use crate::services::VideoTaskService;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// 生成任务队列，队列元素是video_tasks表的本地ID
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<i64>,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<i64>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// 入队；队列已满时在此等待（有界队列即准入控制）
    pub async fn enqueue(&self, task_id: i64) -> bool {
        match self.tx.send(task_id).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("生成队列已关闭，任务{}无法入队: {e}", task_id);
                false
            }
        }
    }
}

/// 启动worker协程池，共享消费同一个接收端
pub fn spawn_workers(
    service: VideoTaskService,
    rx: mpsc::Receiver<i64>,
    worker_count: usize,
) {
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..worker_count.max(1) {
        let rx = rx.clone();
        let service = service.clone();
        tokio::spawn(async move {
            log::info!("视频生成worker {worker_id} 已启动");
            loop {
                let task_id = { rx.lock().await.recv().await };
                match task_id {
                    Some(task_id) => {
                        if let Err(e) = service.run_generation(task_id).await {
                            log::error!("worker {worker_id} 处理任务{task_id}失败: {e}");
                        }
                    }
                    None => {
                        log::info!("生成队列已关闭，worker {worker_id} 退出");
                        break;
                    }
                }
            }
        });
    }
}
