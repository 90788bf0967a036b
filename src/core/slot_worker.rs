use std::sync::Arc;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use crate::store::UploadService;
use super::errors::{Result, UploadError};
use super::simulator::ProgressSimulator;
use super::types::{FileInfo, SlotCommand, SlotConfig, SlotEvent, UploadFile, UploadStatus};
use super::validate::validate_file;

/// 一次 attempt 的输出，带 attempt 标签以便丢弃过期消息
#[derive(Debug)]
enum AttemptMessage {
    Progress { attempt: Uuid, percent: u8 },
    Completed { attempt: Uuid },
    Failed { attempt: Uuid, error: String },
    /// 持久化完成，携带远端分配的记录 ID
    Persisted { attempt: Uuid, id: i64 },
}

struct AttemptHandle {
    id: Uuid,
    cancellation_token: CancellationToken,
}

pub(crate) struct SlotWorker {
    config: SlotConfig,
    service: Option<Arc<UploadService>>,
    file: Option<UploadFile>,
    attempt: Option<AttemptHandle>,
    event_tx: broadcast::Sender<SlotEvent>,
    attempt_tx: mpsc::UnboundedSender<AttemptMessage>,
    attempt_rx: mpsc::UnboundedReceiver<AttemptMessage>,
}

impl SlotWorker {
    pub(crate) async fn run(
        config: SlotConfig,
        service: Option<Arc<UploadService>>,
        mut command_rx: mpsc::Receiver<SlotCommand>,
        event_tx: broadcast::Sender<SlotEvent>,
    ) {
        let (attempt_tx, attempt_rx) = mpsc::unbounded_channel();
        let mut worker = Self {
            config,
            service,
            file: None,
            attempt: None,
            event_tx,
            attempt_tx,
            attempt_rx,
        };

        // 主事件循环：命令和 attempt 消息都在这里串行处理
        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(SlotCommand::Shutdown) | None => break,
                        Some(command) => worker.handle_command(command),
                    }
                }
                Some(message) = worker.attempt_rx.recv() => {
                    worker.handle_attempt_message(message);
                }
            }
        }

        worker.cancel_attempt();
    }

    fn handle_command(&mut self, command: SlotCommand) {
        match command {
            SlotCommand::AddFile { info, reply } => {
                let _ = reply.send(self.add_file(info));
            }
            SlotCommand::Upload { reply } => {
                let _ = reply.send(self.start_upload(false));
            }
            SlotCommand::Retry { reply } => {
                let _ = reply.send(self.start_upload(true));
            }
            SlotCommand::ClearCompleted { reply } => {
                let _ = reply.send(self.clear(true));
            }
            SlotCommand::ClearAll { reply } => {
                let _ = reply.send(self.clear(false));
            }
            SlotCommand::GetFile { reply } => {
                let _ = reply.send(self.file.clone());
            }
            SlotCommand::Shutdown => {}
        }
    }

    fn add_file(&mut self, info: FileInfo) -> Result<()> {
        if self.file.is_some() {
            return Err(UploadError::precondition("The slot already holds a file"));
        }

        let validation = validate_file(&info.name, info.size, self.config.max_file_size);
        if !validation.is_valid {
            return Err(UploadError::Validation(validation.errors));
        }

        tracing::debug!(name = %info.name, size = info.size, "File added to the upload slot");
        let file = UploadFile::pending(info);
        let _ = self.event_tx.send(SlotEvent::FileAdded {
            name: file.name.clone(),
        });
        self.file = Some(file);

        Ok(())
    }

    /// upload 和 retry 共用的入口；retry 只接受 error 状态
    fn start_upload(&mut self, retry_only: bool) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| UploadError::precondition("No file to upload"))?;

        match file.status {
            UploadStatus::Error => {}
            UploadStatus::Pending if !retry_only => {}
            _ if retry_only => {
                return Err(UploadError::precondition(
                    "Only a failed upload can be retried",
                ));
            }
            _ => {
                return Err(UploadError::precondition(format!(
                    "Cannot upload a file in state {}",
                    file.status
                )));
            }
        }

        let old_status = file.status;
        file.status = UploadStatus::Uploading;
        file.progress = 0;
        file.error = None;

        // 取消上一次 attempt，过期定时器不得影响新一次上传
        self.cancel_attempt();

        let attempt_id = Uuid::new_v4();
        let cancellation_token = CancellationToken::new();
        self.attempt = Some(AttemptHandle {
            id: attempt_id,
            cancellation_token: cancellation_token.clone(),
        });

        let simulator = ProgressSimulator::with_cancellation_token(
            self.config.simulator.clone(),
            cancellation_token,
        );
        let attempt_tx = self.attempt_tx.clone();

        tokio::spawn(async move {
            let progress_tx = attempt_tx.clone();
            let result = simulator
                .run(move |percent| {
                    let _ = progress_tx.send(AttemptMessage::Progress {
                        attempt: attempt_id,
                        percent,
                    });
                })
                .await;

            match result {
                Ok(()) => {
                    let _ = attempt_tx.send(AttemptMessage::Completed { attempt: attempt_id });
                }
                // 被取消的 attempt 不再发声
                Err(UploadError::Cancelled) => {}
                Err(UploadError::Transfer(error)) => {
                    let _ = attempt_tx.send(AttemptMessage::Failed {
                        attempt: attempt_id,
                        error,
                    });
                }
                Err(err) => {
                    let _ = attempt_tx.send(AttemptMessage::Failed {
                        attempt: attempt_id,
                        error: err.to_string(),
                    });
                }
            }
        });

        tracing::info!(attempt = %attempt_id, "Upload attempt started");
        self.emit_state_change(old_status, UploadStatus::Uploading);

        Ok(())
    }

    fn handle_attempt_message(&mut self, message: AttemptMessage) {
        let current = match &self.attempt {
            Some(handle) => handle.id,
            // 槽位已被清空，一切 attempt 消息都过期了
            None => return,
        };

        match message {
            AttemptMessage::Progress { attempt, percent } if attempt == current => {
                if let Some(file) = self.file.as_mut() {
                    if file.is_uploading() && percent > file.progress {
                        file.progress = percent;
                        let _ = self.event_tx.send(SlotEvent::Progress { percent });
                    }
                }
            }
            AttemptMessage::Completed { attempt } if attempt == current => {
                let Some(file) = self.file.as_mut() else {
                    return;
                };

                let uploaded_at = Utc::now();
                file.status = UploadStatus::Completed;
                file.progress = 100;
                file.error = None;
                file.uploaded_at = Some(uploaded_at);
                let name = file.name.clone();

                self.emit_state_change(UploadStatus::Uploading, UploadStatus::Completed);
                let _ = self.event_tx.send(SlotEvent::Completed { uploaded_at });
                tracing::info!(name = %name, "Upload completed");

                self.persist_completed(attempt);
            }
            AttemptMessage::Failed { attempt, error } if attempt == current => {
                let Some(file) = self.file.as_mut() else {
                    return;
                };

                file.status = UploadStatus::Error;
                file.error = Some(error.clone());

                self.emit_state_change(UploadStatus::Uploading, UploadStatus::Error);
                tracing::warn!(error = %error, "Upload attempt failed");
                let _ = self.event_tx.send(SlotEvent::Failed { error });
            }
            AttemptMessage::Persisted { attempt, id } if attempt == current => {
                if let Some(file) = self.file.as_mut() {
                    file.id = Some(id);
                }
            }
            // 过期 attempt 的消息
            _ => {}
        }
    }

    /// 持久化不阻塞槽位，对调用方是 fire-and-forget
    fn persist_completed(&self, attempt: Uuid) {
        let Some(service) = self.service.clone() else {
            return;
        };
        let Some(file) = self.file.clone() else {
            return;
        };
        let attempt_tx = self.attempt_tx.clone();

        tokio::spawn(async move {
            match service.persist_completed(&file).await {
                Ok(stored) => {
                    if let Some(id) = stored.id {
                        let _ = attempt_tx.send(AttemptMessage::Persisted { attempt, id });
                    }
                }
                Err(err) => {
                    tracing::warn!("Failed to persist upload record: {err}");
                }
            }
        });
    }

    fn clear(&mut self, completed_only: bool) -> Result<()> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| UploadError::precondition("No file to clear"))?;

        if completed_only && !file.is_completed() {
            return Err(UploadError::precondition("No completed file to clear"));
        }

        self.cancel_attempt();
        self.file = None;
        let _ = self.event_tx.send(SlotEvent::Cleared);

        Ok(())
    }

    fn cancel_attempt(&mut self) {
        if let Some(handle) = self.attempt.take() {
            handle.cancellation_token.cancel();
        }
    }

    fn emit_state_change(&self, old_status: UploadStatus, new_status: UploadStatus) {
        if old_status == new_status {
            return;
        }
        tracing::debug!(%old_status, %new_status, "Slot state changed");
        let _ = self.event_tx.send(SlotEvent::StateChanged {
            old_status,
            new_status,
        });
    }
}
