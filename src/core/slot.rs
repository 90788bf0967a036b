use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use crate::store::UploadService;
use super::errors::{Result, UploadError};
use super::slot_worker::SlotWorker;
use super::types::{FileInfo, SlotCommand, SlotConfig, SlotEvent, UploadFile};

/// 单文件上传槽位的对外句柄
///
/// 状态由 worker 独占，这里只负责发命令和读快照
pub struct UploadSlot {
    command_tx: mpsc::Sender<SlotCommand>,
    event_tx: broadcast::Sender<SlotEvent>,
    worker_handle: JoinHandle<()>,
}

impl UploadSlot {
    pub fn new(config: SlotConfig) -> Self {
        Self::build(config, None)
    }

    /// 完成后通过服务层把记录写入外部存储
    pub fn with_service(config: SlotConfig, service: Arc<UploadService>) -> Self {
        Self::build(config, Some(service))
    }

    fn build(config: SlotConfig, service: Option<Arc<UploadService>>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, _) = broadcast::channel(64);

        let worker_handle = tokio::spawn(SlotWorker::run(
            config,
            service,
            command_rx,
            event_tx.clone(),
        ));

        Self {
            command_tx,
            event_tx,
            worker_handle,
        }
    }

    /// 订阅槽位事件
    pub fn subscribe_events(&self) -> broadcast::Receiver<SlotEvent> {
        self.event_tx.subscribe()
    }

    /// 添加文件；槽位已占用或校验失败时拒绝
    pub async fn add_file(&self, info: FileInfo) -> Result<()> {
        self.request(|reply| SlotCommand::AddFile { info, reply }).await?
    }

    /// 开始上传；仅允许 pending 或 error 状态
    pub async fn upload(&self) -> Result<()> {
        self.request(|reply| SlotCommand::Upload { reply }).await?
    }

    /// 失败后重试；仅允许 error 状态
    pub async fn retry(&self) -> Result<()> {
        self.request(|reply| SlotCommand::Retry { reply }).await?
    }

    /// 清除已完成的文件
    pub async fn clear_completed(&self) -> Result<()> {
        self.request(|reply| SlotCommand::ClearCompleted { reply }).await?
    }

    /// 清空槽位（任意状态），取消进行中的 attempt
    pub async fn clear_all(&self) -> Result<()> {
        self.request(|reply| SlotCommand::ClearAll { reply }).await?
    }

    /// 当前槽位快照；worker 已不在时视为空槽，但留下告警
    pub async fn file(&self) -> Option<UploadFile> {
        match self.request(|reply| SlotCommand::GetFile { reply }).await {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("Slot snapshot unavailable: {err}");
                None
            }
        }
    }

    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SlotCommand::Shutdown).await;
        let _ = self.worker_handle.await;
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SlotCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| UploadError::internal("Send command failed".to_string()))?;

        // 等待响应
        reply_rx
            .await
            .map_err(|_| UploadError::internal("Slot worker dropped the reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dead_worker_reads_as_an_empty_slot() {
        let mut slot = UploadSlot::new(SlotConfig::default());
        slot.worker_handle.abort();
        let _ = (&mut slot.worker_handle).await;

        // 快照降级为 None，不会 panic
        assert!(slot.file().await.is_none());

        // 带结果的命令仍然把故障暴露出来
        assert!(matches!(
            slot.upload().await,
            Err(UploadError::Internal(_))
        ));
    }
}
