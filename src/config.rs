use std::path::Path;
use anyhow::Context;
use serde::Deserialize;
use crate::core::DEFAULT_MAX_FILE_SIZE;

/// 演示程序的配置
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// 记录存储的 endpoint
    pub endpoint: String,
    /// 访问令牌
    pub token: String,
    /// 最大文件大小（字节）
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            endpoint = "https://records.example.com/api"
            token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://records.example.com/api");
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn max_file_size_can_be_overridden() {
        let config: Config = toml::from_str(
            r#"
            endpoint = "https://records.example.com/api"
            token = "secret"
            max_file_size = 1048576
            "#,
        )
        .unwrap();

        assert_eq!(config.max_file_size, 1024 * 1024);
    }
}
