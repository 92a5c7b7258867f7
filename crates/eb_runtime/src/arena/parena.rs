// crates/eb_runtime/src/arena/parena.rs

//! 平台感知的内存池前端
//!
//! 平台有原生池化分配器时使用池化实现，否则透明地退化为通用分配器，
//! 接口和能力语义保持一致（退化后仅主机可访问）。

use super::{Arena, ArenaStats, Block, HostArena, MemoryKind, PoolArena};
use crate::error::{RuntimeError, RuntimeResult};

/// 平台能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCaps {
    /// 平台是否提供池化分配器
    pub memory_pool: bool,
}

impl PlatformCaps {
    /// 探测当前目标平台
    ///
    /// wasm32 只有单一线性内存，不做池化。
    pub fn detect() -> Self {
        Self {
            memory_pool: !cfg!(target_arch = "wasm32"),
        }
    }

    /// 不支持池化的平台
    pub const fn without_pool() -> Self {
        Self { memory_pool: false }
    }
}

impl Default for PlatformCaps {
    fn default() -> Self {
        Self::detect()
    }
}

#[derive(Debug)]
enum Strategy {
    Pooled(PoolArena<HostArena>),
    Fallback(HostArena),
}

/// 平台感知内存池
///
/// 不可复制：实例独占一个活动的池资源，需要共享时放进 `Arc`。
///
/// # 示例
///
/// ```rust
/// use eb_runtime::arena::{Arena, PArena};
///
/// let arena = PArena::new(1 << 20).unwrap();
/// let block = arena.alloc(4096).unwrap();
/// assert!(arena.is_host_accessible());
/// arena.free(block);
/// ```
#[derive(Debug)]
pub struct PArena {
    strategy: Strategy,
    release_threshold: usize,
}

impl PArena {
    /// 按当前平台能力创建
    ///
    /// `release_threshold` 为池中保留的已释放字节数上限，负值是配置错误。
    pub fn new(release_threshold: i64) -> RuntimeResult<Self> {
        Self::with_platform(release_threshold, PlatformCaps::detect())
    }

    /// 按指定平台能力创建
    pub fn with_platform(release_threshold: i64, caps: PlatformCaps) -> RuntimeResult<Self> {
        Self::configure(release_threshold, caps, None)
    }

    /// 完整配置：平台能力和可选的物理字节上限
    pub fn configure(
        release_threshold: i64,
        caps: PlatformCaps,
        memory_limit: Option<usize>,
    ) -> RuntimeResult<Self> {
        let threshold = usize::try_from(release_threshold).map_err(|_| {
            RuntimeError::InvalidReleaseThreshold {
                value: release_threshold,
            }
        })?;

        let upstream = match memory_limit {
            Some(limit) => HostArena::with_limit(limit),
            None => HostArena::new(),
        };
        let strategy = if caps.memory_pool {
            Strategy::Pooled(PoolArena::new(upstream, threshold))
        } else {
            Strategy::Fallback(upstream)
        };

        log::debug!(
            "PArena: {} (release_threshold = {} 字节, limit = {:?})",
            if caps.memory_pool { "池化" } else { "通用分配器" },
            threshold,
            memory_limit
        );

        Ok(Self {
            strategy,
            release_threshold: threshold,
        })
    }

    /// 是否使用池化实现
    pub fn is_pooled(&self) -> bool {
        matches!(self.strategy, Strategy::Pooled(_))
    }

    /// 释放阈值（字节）
    pub fn release_threshold(&self) -> usize {
        self.release_threshold
    }

    /// 归还全部缓存内存（退化实现无缓存）
    pub fn trim(&self) {
        if let Strategy::Pooled(pool) = &self.strategy {
            pool.trim();
        }
    }

    fn inner(&self) -> &dyn Arena {
        match &self.strategy {
            Strategy::Pooled(pool) => pool,
            Strategy::Fallback(host) => host,
        }
    }
}

impl Arena for PArena {
    fn alloc(&self, nbytes: usize) -> RuntimeResult<Block> {
        self.inner().alloc(nbytes)
    }

    fn free(&self, block: Block) {
        self.inner().free(block)
    }

    fn memory_kind(&self) -> MemoryKind {
        match &self.strategy {
            Strategy::Pooled(pool) => pool.memory_kind(),
            Strategy::Fallback(_) => MemoryKind::Host,
        }
    }

    fn stats(&self) -> ArenaStats {
        self.inner().stats()
    }
}
