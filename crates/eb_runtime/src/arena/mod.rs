// crates/eb_runtime/src/arena/mod.rs

//! 内存池（Arena）
//!
//! 为数值数据提供原始内存块，并声明所返回内存的可访问性语义，
//! 调用者据此判断在某个执行上下文中访问数据前是否需要显式拷贝。
//!
//! # 结构
//!
//! ```text
//! +-----------+        +---------------------------+
//! |  PArena   |------->| Pooled(PoolArena<Host>)   |  平台支持池化时
//! | (前端)    |   或   | Fallback(HostArena)       |  否则退化为通用分配器
//! +-----------+        +---------------------------+
//!                                   |
//!                                   v
//!                          HostArena (系统堆, 64 字节对齐)
//! ```
//!
//! 所有实现都满足同一契约：`alloc` 要么返回有效块，要么返回错误；
//! `free` 把块交还给池；能力查询由 [`MemoryKind`] 推导。

mod host;
mod parena;
mod pool;

pub use host::HostArena;
pub use parena::{PArena, PlatformCaps};
pub use pool::{PoolArena, POOL_GRANULARITY};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ptr::NonNull;

use crate::error::RuntimeResult;

/// 所有内存块的对齐保证（缓存行 / AVX-512）
pub const ARENA_ALIGN: usize = 64;

// =============================================================================
// 内存类型
// =============================================================================

/// 内存放置/可访问性语义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryKind {
    /// 普通主机内存，仅主机可访问
    Host,
    /// 页锁定主机内存（DMA 友好），主机和设备均可访问
    Pinned,
    /// 设备内存，仅设备可访问
    Device,
    /// 托管内存，可在主机与设备间透明迁移
    Managed,
}

impl MemoryKind {
    /// 设备是否可访问
    #[inline]
    pub const fn is_device_accessible(self) -> bool {
        !matches!(self, MemoryKind::Host)
    }

    /// 主机是否可访问
    #[inline]
    pub const fn is_host_accessible(self) -> bool {
        !matches!(self, MemoryKind::Device)
    }

    /// 是否为托管内存
    #[inline]
    pub const fn is_managed(self) -> bool {
        matches!(self, MemoryKind::Managed)
    }

    /// 是否为纯设备内存
    #[inline]
    pub const fn is_device(self) -> bool {
        matches!(self, MemoryKind::Device)
    }

    /// 是否为页锁定内存
    #[inline]
    pub const fn is_pinned(self) -> bool {
        matches!(self, MemoryKind::Pinned)
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Host => write!(f, "host"),
            MemoryKind::Pinned => write!(f, "pinned"),
            MemoryKind::Device => write!(f, "device"),
            MemoryKind::Managed => write!(f, "managed"),
        }
    }
}

// =============================================================================
// 内存块
// =============================================================================

/// 从内存池取得的原始内存块
///
/// 块不可复制：同一块只能被 `free` 一次。块的 `size` 是实际可用字节数，
/// 可能大于请求的字节数（池化分配按粒度取整）。
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    ptr: NonNull<u8>,
    size: usize,
}

// Block 只是所有权凭证，指向的内存由持有者独占
unsafe impl Send for Block {}
unsafe impl Sync for Block {}

impl Block {
    /// 由原始指针构造
    ///
    /// # Safety
    ///
    /// `ptr` 必须指向至少 `size` 字节、按 [`ARENA_ALIGN`] 对齐、
    /// 且由调用者所在的内存池独占管理的内存。
    #[inline]
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, size: usize) -> Self {
        Self { ptr, size }
    }

    /// 起始地址
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// 非空起始地址
    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// 可用字节数
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

// =============================================================================
// 统计
// =============================================================================

/// 内存池统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    /// 当前交给调用者的字节数
    pub in_use_bytes: u64,
    /// 池中缓存（已释放但未归还平台）的字节数
    pub cached_bytes: u64,
    /// `in_use_bytes` 的历史峰值
    pub peak_in_use_bytes: u64,
    /// `alloc` 调用次数
    pub alloc_count: u64,
    /// 向平台申请物理内存的次数
    pub upstream_alloc_count: u64,
    /// 向平台归还物理内存的次数
    pub upstream_free_count: u64,
}

// =============================================================================
// Arena trait
// =============================================================================

/// 内存池接口
///
/// 能力查询默认由 [`Arena::memory_kind`] 推导，实现者通常只需提供
/// 分配、释放、内存类型与统计。
pub trait Arena: Send + Sync + fmt::Debug {
    /// 分配至少 `nbytes` 字节的内存块
    ///
    /// 平台无法满足请求时返回 `OutOfMemory` / `AllocatorFailure`，
    /// 从不静默返回无效块。`nbytes == 0` 时返回最小尺寸的有效块。
    fn alloc(&self, nbytes: usize) -> RuntimeResult<Block>;

    /// 把块交还给池
    fn free(&self, block: Block);

    /// 所返回内存的类型
    fn memory_kind(&self) -> MemoryKind;

    /// 统计快照
    fn stats(&self) -> ArenaStats;

    /// 设备是否可访问
    fn is_device_accessible(&self) -> bool {
        self.memory_kind().is_device_accessible()
    }

    /// 主机是否可访问
    fn is_host_accessible(&self) -> bool {
        self.memory_kind().is_host_accessible()
    }

    /// 是否为托管内存
    fn is_managed(&self) -> bool {
        self.memory_kind().is_managed()
    }

    /// 是否为纯设备内存
    fn is_device(&self) -> bool {
        self.memory_kind().is_device()
    }

    /// 是否为页锁定内存
    fn is_pinned(&self) -> bool {
        self.memory_kind().is_pinned()
    }
}
