// crates/eb_runtime/src/lib.rs

//! EB-Reflux Runtime Layer (Layer 2)
//!
//! 数值数据的内存池抽象与运行时指标。
//!
//! # 模块概览
//!
//! - [`arena`]: `Arena` trait、`HostArena`、`PoolArena`、`PArena`
//! - [`buffer`]: `ArenaBuffer<T>` 内存池支撑的类型化缓冲区
//! - [`metrics`]: 计数器、计量器、计时器
//! - [`error`]: 运行时错误类型
//!
//! # 设计原则
//!
//! 1. **契约统一**: 池化与退化实现对调用者表现为同一接口
//! 2. **失败可见**: 分配失败以 `RuntimeError` 返回，从不返回无效块
//! 3. **所有权清晰**: 缓冲区持有内存池的 `Arc`，销毁顺序由类型系统保证

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod buffer;
pub mod error;
pub mod metrics;

/// 层级标识
pub const LAYER: u8 = 2;

pub use arena::{
    Arena, ArenaStats, Block, HostArena, MemoryKind, PArena, PlatformCaps, PoolArena,
    ARENA_ALIGN,
};
pub use buffer::ArenaBuffer;
pub use error::{RuntimeError, RuntimeResult};
pub use metrics::{Counter, Gauge, Timer, TimingSnapshot};

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::{Arena, ArenaBuffer, MemoryKind, PArena, RuntimeError, RuntimeResult};
}
