//! Pre-upload validation. Pure checks, no side effects.

/// 文件名长度上限
pub const MAX_NAME_LENGTH: usize = 255;

/// 危险扩展名黑名单（大小写不敏感）
pub const BLOCKED_EXTENSIONS: [&str; 6] = [".exe", ".bat", ".cmd", ".scr", ".pif", ".com"];

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// 上传前的同步校验：大小、文件名长度、扩展名黑名单
pub fn validate_file(name: &str, size: u64, max_size: u64) -> Validation {
    let mut errors = Vec::new();

    if size > max_size {
        errors.push(format!(
            "File size must be less than {}MB",
            max_size / (1024 * 1024)
        ));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        errors.push("File name is too long (max 255 characters)".to_string());
    }

    if let Some(extension) = file_extension(name) {
        if BLOCKED_EXTENSIONS
            .iter()
            .any(|blocked| extension.eq_ignore_ascii_case(blocked))
        {
            errors.push("File type not allowed for security reasons".to_string());
        }
    }

    Validation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// 扩展名（含点）。没有 '.' 的文件名视为无扩展名
fn file_extension(name: &str) -> Option<&str> {
    name.rfind('.').map(|index| &name[index..])
}
