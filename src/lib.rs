pub mod config;
pub mod core;
pub mod store;

// 重新导出核心类型
pub use core::{
    validate_file,
    FileInfo,
    ProgressSimulator,
    Result,
    SimulatorConfig,
    SlotConfig,
    SlotEvent,
    UploadError,
    UploadFile,
    UploadSlot,
    UploadStatus,
    Validation,
};

// 重新导出存储层
pub use store::{
    FetchQuery,
    FileRecord,
    HttpRecordClient,
    NewSession,
    RecordResponse,
    RecordResult,
    RecordStore,
    SessionPatch,
    SessionRecord,
    UploadService,
    UploadSession,
};
