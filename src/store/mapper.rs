use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use crate::core::{FileInfo, Result, UploadError, UploadFile, UploadStatus};

/// 查询 files_c 时请求的字段
pub(crate) const FILE_FIELDS: [&str; 9] = [
    "Name",
    "name_c",
    "size_c",
    "type_c",
    "status_c",
    "progress_c",
    "uploadedAt_c",
    "error_c",
    "uploadSessionId_c",
];

/// 查询 uploadSessions_c 时请求的字段
pub(crate) const SESSION_FIELDS: [&str; 6] = [
    "Name",
    "Tags",
    "CreatedOn",
    "completedAt_c",
    "completedCount_c",
    "totalSize_c",
];

/// files_c 行的外部形状
///
/// 仅做字段改名，两个方向都是全量无损的
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 远端的显示名，与 name_c 保持一致
    #[serde(rename = "Name")]
    pub display_name: String,
    pub name_c: String,
    pub size_c: u64,
    pub type_c: String,
    pub status_c: UploadStatus,
    pub progress_c: u8,
    #[serde(rename = "uploadedAt_c", default)]
    pub uploaded_at_c: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_c: Option<String>,
    /// 远端可能返回裸 ID，也可能返回 lookup 对象
    #[serde(
        rename = "uploadSessionId_c",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lookup_id"
    )]
    pub upload_session_id_c: Option<i64>,
}

impl FileRecord {
    /// 以"已完成"的姿态生成待创建的行
    pub fn completed(info: &FileInfo, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            display_name: info.name.clone(),
            name_c: info.name.clone(),
            size_c: info.size,
            type_c: info.mime.clone(),
            status_c: UploadStatus::Completed,
            progress_c: 100,
            uploaded_at_c: Some(uploaded_at),
            error_c: None,
            upload_session_id_c: None,
        }
    }

    pub fn from_file(file: &UploadFile) -> Self {
        Self {
            id: file.id,
            display_name: file.name.clone(),
            name_c: file.name.clone(),
            size_c: file.size,
            type_c: file.mime.clone(),
            status_c: file.status,
            progress_c: file.progress,
            uploaded_at_c: file.uploaded_at,
            error_c: file.error.clone(),
            upload_session_id_c: file.upload_session_id,
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn into_file(self) -> UploadFile {
        UploadFile {
            id: self.id,
            name: self.name_c,
            size: self.size_c,
            mime: self.type_c,
            status: self.status_c,
            progress: self.progress_c,
            error: self.error_c,
            uploaded_at: self.uploaded_at_c,
            upload_session_id: self.upload_session_id_c,
        }
    }
}

/// uploadSessions_c 行的外部形状
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Tags", default)]
    pub tags: String,
    /// 远端的创建时间即会话开始时间，由服务端写入
    #[serde(rename = "CreatedOn", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(rename = "totalSize_c")]
    pub total_size_c: u64,
    #[serde(rename = "completedCount_c")]
    pub completed_count_c: u32,
    #[serde(rename = "completedAt_c", default)]
    pub completed_at_c: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn from_new(new_session: &NewSession) -> Self {
        Self {
            id: None,
            name: new_session
                .name
                .clone()
                .unwrap_or_else(|| format!("Session {}", Utc::now().timestamp_millis())),
            tags: new_session.tags.clone(),
            created_on: None,
            total_size_c: new_session.total_size,
            completed_count_c: 0,
            completed_at_c: None,
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn into_session(self) -> Result<UploadSession> {
        let id = self
            .id
            .ok_or_else(|| UploadError::persistence("Session record is missing its Id"))?;

        Ok(UploadSession {
            id,
            name: self.name,
            tags: self.tags,
            total_size: self.total_size_c,
            completed_count: self.completed_count_c,
            started_at: self.created_on,
            completed_at: self.completed_at_c,
        })
    }
}

/// 上传会话（远端聚合，本地不做任何聚合计算）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: i64,
    pub name: String,
    pub tags: String,
    pub total_size: u64,
    pub completed_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 新建会话的输入
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// 缺省时远端名以 "Session <时间戳>" 填充
    pub name: Option<String>,
    pub tags: String,
    pub total_size: u64,
}

/// 会话的部分更新；None 的字段不写
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub completed_count: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 组装 updateRecord 的行：Id 加上要更新的字段
pub(crate) fn session_patch_value(session_id: i64, patch: &SessionPatch) -> Value {
    let mut record = serde_json::Map::new();
    record.insert("Id".to_string(), json!(session_id));
    if let Some(count) = patch.completed_count {
        record.insert("completedCount_c".to_string(), json!(count));
    }
    if let Some(completed_at) = patch.completed_at {
        record.insert("completedAt_c".to_string(), json!(completed_at));
    }
    Value::Object(record)
}

/// lookup 字段：接受裸 ID 或 {"Id": ...} 对象
fn lookup_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lookup {
        Id(i64),
        Object { #[serde(rename = "Id")] id: i64 },
        Null,
    }

    Ok(match Option::<Lookup>::deserialize(deserializer)? {
        Some(Lookup::Id(id)) => Some(id),
        Some(Lookup::Object { id }) => Some(id),
        _ => None,
    })
}
