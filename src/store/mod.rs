pub mod http;
pub mod mapper;
pub mod records;
pub mod service;

pub use http::HttpRecordClient;
pub use mapper::{FileRecord, NewSession, SessionPatch, SessionRecord, UploadSession};
pub use records::{
    FetchQuery, RecordResponse, RecordResult, RecordStore, FILES_TABLE, SESSIONS_TABLE,
};
pub use service::UploadService;
