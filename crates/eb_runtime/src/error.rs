// crates/eb_runtime/src/error.rs

//! 运行时错误类型
//!
//! 内存分配失败是唯一一类允许调用者捕获并重试的错误，
//! 因此单独成型，由上层通过 `#[from]` 透传。

use thiserror::Error;

use crate::arena::MemoryKind;

/// 运行时结果类型
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// 平台内存不足
    #[error("内存不足: 请求 {requested} 字节, 已占用 {in_use} 字节, 上限 {limit:?}")]
    OutOfMemory {
        /// 请求字节数
        requested: usize,
        /// 当前已从平台分配的字节数
        in_use: usize,
        /// 平台上限（无上限时为 None）
        limit: Option<usize>,
    },

    /// 分配器无法处理该请求（布局非法、尺寸溢出等）
    #[error("分配器失败: {reason}")]
    AllocatorFailure {
        /// 原因
        reason: String,
    },

    /// 释放阈值配置非法
    #[error("内存池释放阈值非法: {value} (必须 >= 0)")]
    InvalidReleaseThreshold {
        /// 配置值
        value: i64,
    },

    /// 内存不可从主机访问
    #[error("{kind:?} 内存不可从主机访问")]
    NotHostAccessible {
        /// 内存类型
        kind: MemoryKind,
    },

    /// 元素对齐超出内存池保证
    #[error("元素对齐 {align} 超过内存池对齐保证 {max}")]
    AlignmentUnsupported {
        /// 需要的对齐
        align: usize,
        /// 内存池保证的对齐
        max: usize,
    },
}

impl RuntimeError {
    /// 是否为内存不足（调用者可在释放缓存后重试）
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// 便捷构造分配器失败
    pub fn allocator(reason: impl Into<String>) -> Self {
        Self::AllocatorFailure {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_invariant() {
        let err = RuntimeError::OutOfMemory {
            requested: 1024,
            in_use: 4096,
            limit: Some(4096),
        };
        assert!(err.is_out_of_memory());
        assert!(err.to_string().contains("1024"));

        let err = RuntimeError::InvalidReleaseThreshold { value: -1 };
        assert!(!err.is_out_of_memory());
        assert!(err.to_string().contains("-1"));
    }
}
