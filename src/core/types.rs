use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use super::errors::Result;
use super::simulator::SimulatorConfig;

/// 默认最大文件大小（100 MiB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// 被选中文件的描述信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    /// 字节数
    pub size: u64,
    /// MIME 类型
    pub mime: String,
}

/// 上传状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// 等待上传
    Pending,
    /// 上传中
    Uploading,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// 槽位中的文件
///
/// 不变量：progress == 100 当且仅当 status == Completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFile {
    /// 记录 ID，持久化成功后由远端分配
    pub id: Option<i64>,
    pub name: String,
    pub size: u64,
    pub mime: String,
    /// 当前状态
    pub status: UploadStatus,
    /// 进度（0-100，上传期间单调不减）
    pub progress: u8,
    /// 错误信息，仅在失败状态存在
    pub error: Option<String>,
    /// 完成时间，仅在进入完成状态时写入
    pub uploaded_at: Option<DateTime<Utc>>,
    /// 所属上传会话的记录 ID（如果有）
    pub upload_session_id: Option<i64>,
}

impl UploadFile {
    pub fn pending(info: FileInfo) -> Self {
        Self {
            id: None,
            name: info.name,
            size: info.size,
            mime: info.mime,
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            uploaded_at: None,
            upload_session_id: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == UploadStatus::Completed
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }

    pub fn has_error(&self) -> bool {
        self.status == UploadStatus::Error
    }
}

/// 槽位配置
#[derive(Debug, Clone)]
pub struct SlotConfig {
    /// 最大文件大小（字节）
    pub max_file_size: u64,
    /// 进度模拟配置
    pub simulator: SimulatorConfig,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            simulator: SimulatorConfig::interactive(),
        }
    }
}

/// 槽位命令
pub(crate) enum SlotCommand {
    /// 添加文件
    AddFile {
        info: FileInfo,
        reply: oneshot::Sender<Result<()>>,
    },
    /// 开始上传
    Upload {
        reply: oneshot::Sender<Result<()>>,
    },
    /// 失败后重试
    Retry {
        reply: oneshot::Sender<Result<()>>,
    },
    /// 清除已完成的文件
    ClearCompleted {
        reply: oneshot::Sender<Result<()>>,
    },
    /// 清空槽位
    ClearAll {
        reply: oneshot::Sender<Result<()>>,
    },
    /// 获取槽位快照
    GetFile {
        reply: oneshot::Sender<Option<UploadFile>>,
    },
    /// 关闭
    Shutdown,
}

/// 槽位事件
#[derive(Debug, Clone)]
pub enum SlotEvent {
    /// 文件进入槽位
    FileAdded {
        name: String,
    },
    /// 状态变更
    StateChanged {
        old_status: UploadStatus,
        new_status: UploadStatus,
    },
    /// 进度更新
    Progress {
        percent: u8,
    },
    /// 上传完成
    Completed {
        uploaded_at: DateTime<Utc>,
    },
    /// 上传失败
    Failed {
        error: String,
    },
    /// 槽位被清空
    Cleared,
}

// 静态断言确保类型是 Send的
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadFile>();
        assert_send::<SlotEvent>();
        assert_send::<SlotCommand>();
    }
};
