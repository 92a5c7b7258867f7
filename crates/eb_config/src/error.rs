// crates/eb_config/src/error.rs

//! 配置层错误类型

use eb_amr::AmrError;
use eb_runtime::RuntimeError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 内存池构建失败
    #[error("内存池构建失败: {0}")]
    Runtime(#[from] RuntimeError),

    /// 寄存器构建失败
    #[error("寄存器构建失败: {0}")]
    Amr(#[from] AmrError),
}

impl ConfigError {
    /// 便捷构造无效值错误
    pub fn invalid(key: &str, value: impl ToString, reason: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("arena.release_threshold", -1, "不能为负");
        assert!(err.to_string().contains("arena.release_threshold"));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn test_wraps_lower_layers() {
        let err: ConfigError = AmrError::CutCellInterfaceUnsupported.into();
        assert!(err.to_string().contains("hasEBCF"));
        let err: ConfigError = RuntimeError::InvalidReleaseThreshold { value: -5 }.into();
        assert!(matches!(err, ConfigError::Runtime(_)));
    }
}
