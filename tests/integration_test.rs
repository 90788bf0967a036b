use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use dropslot::{
    FetchQuery, FileInfo, NewSession, RecordResponse, RecordResult, RecordStore, Result,
    SessionPatch, SimulatorConfig, UploadError, UploadService, UploadStatus,
};

/// 内存版记录存储 - 用于测试
struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicI64,
}

impl MemoryRecordStore {
    fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        let mut results = Vec::new();
        for mut record in records {
            if let Value::Object(map) = &mut record {
                map.insert(
                    "Id".to_string(),
                    json!(self.next_id.fetch_add(1, Ordering::SeqCst)),
                );
                map.entry("CreatedOn")
                    .or_insert(json!("2026-08-25T10:00:00Z"));
            }
            rows.push(record.clone());
            results.push(RecordResult { data: Some(record) });
        }

        Ok(RecordResponse {
            success: true,
            results: Some(results),
            ..Default::default()
        })
    }

    async fn fetch_records(&self, table: &str, _query: &FetchQuery) -> Result<RecordResponse> {
        // 按创建顺序倒序，模拟 CreatedOn DESC
        let mut rows = self.rows(table);
        rows.reverse();

        Ok(RecordResponse {
            success: true,
            data: Some(Value::Array(rows)),
            ..Default::default()
        })
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        record_id: i64,
        _query: &FetchQuery,
    ) -> Result<RecordResponse> {
        let row = self
            .rows(table)
            .into_iter()
            .find(|row| row["Id"] == json!(record_id));

        Ok(match row {
            Some(row) => RecordResponse {
                success: true,
                data: Some(row),
                ..Default::default()
            },
            None => RecordResponse {
                success: false,
                message: Some(format!("Record {record_id} does not exist")),
                ..Default::default()
            },
        })
    }

    async fn update_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        let mut results = Vec::new();
        for patch in records {
            let id = patch["Id"].clone();
            let row = rows.iter_mut().find(|row| row["Id"] == id);
            let Some(row) = row else {
                return Ok(RecordResponse {
                    success: false,
                    message: Some(format!("Record {id} does not exist")),
                    ..Default::default()
                });
            };

            if let (Value::Object(target), Value::Object(fields)) = (&mut *row, &patch) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            results.push(RecordResult {
                data: Some(row.clone()),
            });
        }

        Ok(RecordResponse {
            success: true,
            results: Some(results),
            ..Default::default()
        })
    }

    async fn delete_record(&self, table: &str, record_ids: Vec<i64>) -> Result<RecordResponse> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| {
                !record_ids
                    .iter()
                    .any(|record_id| row["Id"] == json!(record_id))
            });
        }

        Ok(RecordResponse {
            success: true,
            ..Default::default()
        })
    }
}

/// 始终报错的存储，校验 message 会被透传
struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn create_record(&self, _table: &str, _records: Vec<Value>) -> Result<RecordResponse> {
        Ok(RecordResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            ..Default::default()
        })
    }

    async fn fetch_records(&self, _table: &str, _query: &FetchQuery) -> Result<RecordResponse> {
        Ok(RecordResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            ..Default::default()
        })
    }

    async fn get_record_by_id(
        &self,
        _table: &str,
        _record_id: i64,
        _query: &FetchQuery,
    ) -> Result<RecordResponse> {
        Ok(RecordResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            ..Default::default()
        })
    }

    async fn update_record(&self, _table: &str, _records: Vec<Value>) -> Result<RecordResponse> {
        Ok(RecordResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            ..Default::default()
        })
    }

    async fn delete_record(&self, _table: &str, _record_ids: Vec<i64>) -> Result<RecordResponse> {
        Ok(RecordResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            ..Default::default()
        })
    }
}

fn never_failing() -> SimulatorConfig {
    SimulatorConfig {
        failure_chance: 0.0,
        ..SimulatorConfig::service()
    }
}

fn always_failing() -> SimulatorConfig {
    SimulatorConfig {
        failure_chance: 1.0,
        failure_window: Duration::ZERO..Duration::from_millis(1),
        ..SimulatorConfig::service()
    }
}

fn sample_info(name: &str) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        size: 4096,
        mime: "application/pdf".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn upload_creates_a_completed_file_record() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store.clone()).with_simulator(never_failing());

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();
    let file = service
        .upload_file(&sample_info("report.pdf"), Some(progress_tx))
        .await
        .unwrap();

    assert_eq!(file.id, Some(1));
    assert_eq!(file.name, "report.pdf");
    assert_eq!(file.status, UploadStatus::Completed);
    assert_eq!(file.progress, 100);
    assert!(file.uploaded_at.is_some());
    assert!(file.error.is_none());

    // 进度上报单调且从不出现 100
    let mut last = 0u8;
    while let Ok(percent) = progress_rx.try_recv() {
        assert!(percent >= last && percent < 100);
        last = percent;
    }

    let rows = store.rows("files_c");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name_c"], "report.pdf");
    assert_eq!(rows[0]["status_c"], "completed");
}

#[tokio::test(start_paused = true)]
async fn failed_simulation_writes_nothing() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store.clone()).with_simulator(always_failing());

    let err = service
        .upload_file(&sample_info("report.pdf"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Transfer(_)));

    assert!(store.rows("files_c").is_empty());
}

#[tokio::test(start_paused = true)]
async fn all_files_maps_records_newest_first() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store).with_simulator(never_failing());

    service
        .upload_file(&sample_info("first.pdf"), None)
        .await
        .unwrap();
    service
        .upload_file(&sample_info("second.pdf"), None)
        .await
        .unwrap();

    let files = service.all_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "second.pdf");
    assert_eq!(files[1].name, "first.pdf");
}

#[tokio::test]
async fn session_lifecycle_round_trips() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store);

    let session = service
        .create_session(NewSession {
            name: Some("Monday batch".to_string()),
            tags: "reports".to_string(),
            total_size: 8192,
        })
        .await
        .unwrap();

    assert_eq!(session.name, "Monday batch");
    assert_eq!(session.completed_count, 0);
    assert_eq!(session.total_size, 8192);
    assert!(session.started_at.is_some());
    assert!(session.completed_at.is_none());

    let completed_at = chrono::Utc::now();
    let updated = service
        .update_session(
            session.id,
            &SessionPatch {
                completed_count: Some(3),
                completed_at: Some(completed_at),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.completed_count, 3);
    assert!(updated.completed_at.is_some());

    let fetched = service.session(session.id).await.unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.completed_count, 3);

    let sessions = service.all_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);

    service.delete_session(session.id).await.unwrap();
    assert!(service.all_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn default_session_name_is_generated() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store);

    let session = service.create_session(NewSession::default()).await.unwrap();
    assert!(session.name.starts_with("Session "));
}

#[tokio::test]
async fn missing_session_surfaces_a_not_found_error() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = UploadService::new(store);

    let err = service.session(999).await.unwrap_err();
    match err {
        UploadError::Persistence(message) => assert!(message.contains("999")),
        other => panic!("expected persistence error, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn store_failure_message_is_surfaced() {
    let service = UploadService::new(Arc::new(FailingStore)).with_simulator(never_failing());

    let err = service
        .upload_file(&sample_info("report.pdf"), None)
        .await
        .unwrap_err();
    match err {
        UploadError::Persistence(message) => assert_eq!(message, "quota exceeded"),
        other => panic!("expected persistence error, got {other}"),
    }

    // 列表操作同样透传错误，而不是退化成空列表
    let err = service.all_sessions().await.unwrap_err();
    assert!(matches!(err, UploadError::Persistence(_)));
}
