use std::sync::Arc;
use chrono::Utc;
use tokio::sync::mpsc;
use crate::core::{FileInfo, ProgressSimulator, Result, SimulatorConfig, UploadError, UploadFile};
use super::mapper::{
    session_patch_value, FileRecord, NewSession, SessionPatch, SessionRecord, UploadSession,
    FILE_FIELDS, SESSION_FIELDS,
};
use super::records::{FetchQuery, RecordStore, FILES_TABLE, SESSIONS_TABLE};

/// 上传服务：模拟传输并把结果代理给外部记录存储
///
/// 除字段改名外不含任何业务逻辑；聚合都发生在远端
pub struct UploadService {
    store: Arc<dyn RecordStore>,
    simulator: SimulatorConfig,
}

impl UploadService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            simulator: SimulatorConfig::service(),
        }
    }

    /// 覆盖模拟配置
    pub fn with_simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = simulator;
        self
    }

    /// 模拟上传，成功后创建 files_c 记录并返回带 ID 的文件
    pub async fn upload_file(
        &self,
        info: &FileInfo,
        progress_tx: Option<mpsc::UnboundedSender<u8>>,
    ) -> Result<UploadFile> {
        ProgressSimulator::new(self.simulator.clone())
            .run(|percent| {
                if let Some(tx) = &progress_tx {
                    let _ = tx.send(percent);
                }
            })
            .await
            .inspect_err(|err| tracing::error!("Error uploading file: {err}"))?;

        self.create_file_record(FileRecord::completed(info, Utc::now()))
            .await
    }

    /// 把槽位里已完成的文件写入 files_c
    pub async fn persist_completed(&self, file: &UploadFile) -> Result<UploadFile> {
        self.create_file_record(FileRecord::from_file(file)).await
    }

    async fn create_file_record(&self, record: FileRecord) -> Result<UploadFile> {
        let response = self
            .store
            .create_record(FILES_TABLE, vec![record.to_value()?])
            .await?;
        let created = response
            .into_written()
            .inspect_err(|err| tracing::error!("Error creating file record: {err}"))?;

        Ok(FileRecord::from_value(created)?.into_file())
    }

    /// 全部文件记录，按创建时间倒序
    pub async fn all_files(&self) -> Result<Vec<UploadFile>> {
        let query = FetchQuery::with_fields(&FILE_FIELDS).order_by_desc("CreatedOn");
        let response = self.store.fetch_records(FILES_TABLE, &query).await?;
        let rows = response
            .into_list()
            .inspect_err(|err| tracing::error!("Error fetching files: {err}"))?;

        rows.into_iter()
            .map(|row| Ok(FileRecord::from_value(row)?.into_file()))
            .collect()
    }

    /// 全部上传会话，按创建时间倒序
    pub async fn all_sessions(&self) -> Result<Vec<UploadSession>> {
        let query = FetchQuery::with_fields(&SESSION_FIELDS).order_by_desc("CreatedOn");
        let response = self.store.fetch_records(SESSIONS_TABLE, &query).await?;
        let rows = response
            .into_list()
            .inspect_err(|err| tracing::error!("Error fetching upload sessions: {err}"))?;

        rows.into_iter()
            .map(|row| SessionRecord::from_value(row)?.into_session())
            .collect()
    }

    pub async fn session(&self, session_id: i64) -> Result<UploadSession> {
        let query = FetchQuery::with_fields(&SESSION_FIELDS);
        let response = self
            .store
            .get_record_by_id(SESSIONS_TABLE, session_id, &query)
            .await?;
        let row = response.into_data().map_err(|err| {
            tracing::error!("Error fetching session {session_id}: {err}");
            UploadError::persistence(format!("Upload session with ID {session_id} not found"))
        })?;

        SessionRecord::from_value(row)?.into_session()
    }

    pub async fn create_session(&self, new_session: NewSession) -> Result<UploadSession> {
        let record = SessionRecord::from_new(&new_session);
        let response = self
            .store
            .create_record(SESSIONS_TABLE, vec![record.to_value()?])
            .await?;
        let created = response
            .into_written()
            .inspect_err(|err| tracing::error!("Error creating session: {err}"))?;

        SessionRecord::from_value(created)?.into_session()
    }

    pub async fn update_session(
        &self,
        session_id: i64,
        patch: &SessionPatch,
    ) -> Result<UploadSession> {
        let record = session_patch_value(session_id, patch);
        let response = self
            .store
            .update_record(SESSIONS_TABLE, vec![record])
            .await?;
        let updated = response
            .into_written()
            .inspect_err(|err| tracing::error!("Error updating session {session_id}: {err}"))?;

        SessionRecord::from_value(updated)?.into_session()
    }

    pub async fn delete_session(&self, session_id: i64) -> Result<()> {
        let response = self
            .store
            .delete_record(SESSIONS_TABLE, vec![session_id])
            .await?;

        response
            .into_success()
            .inspect_err(|err| tracing::error!("Error deleting session {session_id}: {err}"))
    }
}
