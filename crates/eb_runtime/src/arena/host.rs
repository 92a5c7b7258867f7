// crates/eb_runtime/src/arena/host.rs

//! 通用主机内存分配器
//!
//! 直接基于系统堆（`std::alloc`），每次 `alloc`/`free` 都对应一次物理
//! 分配/释放。既是平台不支持池化时 [`PArena`](super::PArena) 的退化实现，
//! 也是 [`PoolArena`](super::PoolArena) 的上游。

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Arena, ArenaStats, Block, MemoryKind, ARENA_ALIGN};
use crate::error::{RuntimeError, RuntimeResult};
use crate::metrics::{Counter, Gauge};

/// 系统堆分配器
///
/// 可选的字节上限用于模拟容量有限的设备堆：超过上限的请求返回
/// `OutOfMemory`，而不是让进程被系统杀掉。
#[derive(Debug, Default)]
pub struct HostArena {
    limit: Option<usize>,
    allocated: AtomicUsize,
    in_use: Gauge,
    allocs: Counter,
    frees: Counter,
}

impl HostArena {
    /// 无上限的主机分配器
    pub fn new() -> Self {
        Self::default()
    }

    /// 带字节上限的主机分配器
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            allocated: AtomicUsize::new(0),
            in_use: Gauge::new(),
            allocs: Counter::new(),
            frees: Counter::new(),
        }
    }

    /// 字节上限
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// 当前物理占用字节数
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn layout_for(size: usize) -> RuntimeResult<Layout> {
        Layout::from_size_align(size, ARENA_ALIGN)
            .map_err(|e| RuntimeError::allocator(format!("{} 字节的布局非法: {}", size, e)))
    }

    /// 预占额度，超过上限则失败
    fn reserve(&self, size: usize) -> RuntimeResult<()> {
        let Some(limit) = self.limit else {
            self.allocated.fetch_add(size, Ordering::Relaxed);
            return Ok(());
        };
        self.allocated
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(size).filter(|&next| next <= limit)
            })
            .map(|_| ())
            .map_err(|cur| RuntimeError::OutOfMemory {
                requested: size,
                in_use: cur,
                limit: Some(limit),
            })
    }
}

impl Arena for HostArena {
    fn alloc(&self, nbytes: usize) -> RuntimeResult<Block> {
        let size = nbytes.max(1);
        let layout = Self::layout_for(size)?;
        self.reserve(size)?;

        // SAFETY: layout 尺寸非零
        let raw = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            self.allocated.fetch_sub(size, Ordering::Relaxed);
            return Err(RuntimeError::OutOfMemory {
                requested: size,
                in_use: self.allocated_bytes(),
                limit: self.limit,
            });
        };

        self.allocs.inc();
        self.in_use.add(size as u64);
        // SAFETY: ptr 刚按 ARENA_ALIGN 分配了 size 字节
        Ok(unsafe { Block::from_raw_parts(ptr, size) })
    }

    fn free(&self, block: Block) {
        let size = block.size();
        match Self::layout_for(size) {
            Ok(layout) => {
                // SAFETY: 块由本分配器以相同布局分配
                unsafe { dealloc(block.as_ptr(), layout) };
                self.allocated.fetch_sub(size, Ordering::Relaxed);
                self.in_use.sub(size as u64);
                self.frees.inc();
            }
            Err(e) => log::warn!("HostArena 无法释放 {} 字节的块: {}", size, e),
        }
    }

    fn memory_kind(&self) -> MemoryKind {
        MemoryKind::Host
    }

    fn stats(&self) -> ArenaStats {
        ArenaStats {
            in_use_bytes: self.in_use.get(),
            cached_bytes: 0,
            peak_in_use_bytes: self.in_use.peak(),
            alloc_count: self.allocs.get(),
            upstream_alloc_count: self.allocs.get(),
            upstream_free_count: self.frees.get(),
        }
    }
}

impl Drop for HostArena {
    fn drop(&mut self) {
        let outstanding = self.allocated_bytes();
        if outstanding > 0 {
            log::warn!("HostArena 被销毁时仍有 {} 字节未释放", outstanding);
        }
    }
}
