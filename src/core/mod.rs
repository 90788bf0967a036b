pub mod errors;
pub mod simulator;
pub mod slot;
mod slot_worker;
pub mod types;
pub mod validate;

pub use errors::{Result, UploadError};
pub use simulator::{ProgressSimulator, SimulatorConfig};
pub use slot::UploadSlot;
pub use types::{
    FileInfo, SlotConfig, SlotEvent, UploadFile, UploadStatus, DEFAULT_MAX_FILE_SIZE,
};
pub use validate::{validate_file, Validation, BLOCKED_EXTENSIONS, MAX_NAME_LENGTH};
