use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::core::{Result, UploadError};

/// 文件记录表
pub const FILES_TABLE: &str = "files_c";
/// 上传会话表
pub const SESSIONS_TABLE: &str = "uploadSessions_c";

/// 外部记录存储端口
///
/// 语义对本仓库不透明：按表名寻址，统一返回 [`RecordResponse`]。
/// 测试用内存实现替身，生产用 [`crate::store::HttpRecordClient`]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse>;

    async fn fetch_records(&self, table: &str, query: &FetchQuery) -> Result<RecordResponse>;

    async fn get_record_by_id(
        &self,
        table: &str,
        record_id: i64,
        query: &FetchQuery,
    ) -> Result<RecordResponse>;

    async fn update_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse>;

    async fn delete_record(&self, table: &str, record_ids: Vec<i64>) -> Result<RecordResponse>;
}

/// 查询的字段选择与排序，保持远端的 JSON 形状
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchQuery {
    pub fields: Vec<FieldSpec>,
    #[serde(rename = "orderBy", default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
}

impl FetchQuery {
    pub fn with_fields(names: &[&str]) -> Self {
        Self {
            fields: names.iter().map(|name| FieldSpec::named(name)).collect(),
            order_by: Vec::new(),
        }
    }

    pub fn order_by_desc(mut self, field_name: &str) -> Self {
        self.order_by.push(OrderBy {
            field_name: field_name.to_string(),
            sort_type: "DESC".to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: FieldName,
}

impl FieldSpec {
    fn named(name: &str) -> Self {
        Self {
            field: FieldName {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldName {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "sorttype")]
    pub sort_type: String,
}

/// 远端统一响应：写操作的载荷在 results，读操作在 data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<RecordResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RecordResponse {
    /// success=false 时把远端的 message 作为持久化错误抛出
    fn check_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(UploadError::Persistence(self.message.unwrap_or_else(|| {
                "Record store reported a failure".to_string()
            })))
        }
    }

    /// createRecord / updateRecord 的载荷：results[0].data
    pub fn into_written(self) -> Result<Value> {
        let response = self.check_success()?;
        response
            .results
            .into_iter()
            .flatten()
            .next()
            .and_then(|result| result.data)
            .ok_or_else(|| UploadError::persistence("Response is missing the written record payload"))
    }

    /// getRecordById 的载荷
    pub fn into_data(self) -> Result<Value> {
        let response = self.check_success()?;
        response
            .data
            .ok_or_else(|| UploadError::persistence("Response is missing the record payload"))
    }

    /// fetchRecords 的载荷；远端缺省 data 视为空列表
    pub fn into_list(self) -> Result<Vec<Value>> {
        let response = self.check_success()?;
        match response.data {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(UploadError::persistence(format!(
                "Expected a record array, got {other}"
            ))),
        }
    }

    pub fn into_success(self) -> Result<()> {
        self.check_success().map(|_| ())
    }
}
