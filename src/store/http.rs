use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;
use crate::core::{Result, UploadError};
use super::records::{FetchQuery, RecordResponse, RecordStore};

/// reqwest 实现的记录存储客户端
#[derive(Debug, Clone)]
pub struct HttpRecordClient {
    client: Client,
    endpoint: Url,
}

impl HttpRecordClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint)?;
        // 保证 join 不会吃掉路径的最后一段
        if !endpoint.path().ends_with('/') {
            endpoint.set_path(&format!("{}/", endpoint.path()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| UploadError::internal(format!("Invalid token: {err}")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, endpoint })
    }

    fn route(&self, path: &str) -> Result<Url> {
        Ok(self.endpoint.join(path)?)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<RecordResponse> {
        let response = request
            .send()
            .await?
            .error_for_status()?
            .json::<RecordResponse>()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl RecordStore for HttpRecordClient {
    async fn create_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse> {
        let url = self.route(&format!("records/{table}"))?;
        self.execute(self.client.post(url).json(&json!({ "records": records })))
            .await
    }

    async fn fetch_records(&self, table: &str, query: &FetchQuery) -> Result<RecordResponse> {
        let url = self.route(&format!("records/{table}/fetch"))?;
        self.execute(self.client.post(url).json(query)).await
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        record_id: i64,
        query: &FetchQuery,
    ) -> Result<RecordResponse> {
        let url = self.route(&format!("records/{table}/{record_id}"))?;
        self.execute(self.client.post(url).json(query)).await
    }

    async fn update_record(&self, table: &str, records: Vec<Value>) -> Result<RecordResponse> {
        let url = self.route(&format!("records/{table}"))?;
        self.execute(self.client.put(url).json(&json!({ "records": records })))
            .await
    }

    async fn delete_record(&self, table: &str, record_ids: Vec<i64>) -> Result<RecordResponse> {
        let url = self.route(&format!("records/{table}"))?;
        self.execute(self.client.delete(url).json(&json!({ "RecordIds": record_ids })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_without_trailing_slash_still_joins() {
        let client = HttpRecordClient::new("https://records.example.com/api/v1", "token").unwrap();
        let url = client.route("records/files_c").unwrap();
        assert_eq!(url.as_str(), "https://records.example.com/api/v1/records/files_c");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(HttpRecordClient::new("not a url", "token").is_err());
    }
}
