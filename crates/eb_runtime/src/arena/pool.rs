// crates/eb_runtime/src/arena/pool.rs

//! 池化分配器
//!
//! 释放的块按尺寸等级缓存，下次同等级请求直接复用，避免时间步循环里
//! 反复向平台申请同样大小的内存。缓存总量超过释放阈值时，多出的部分
//! （优先大块）归还上游。阈值越大，峰值内存越高、分配延迟越低。

use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{Arena, ArenaStats, Block, HostArena, MemoryKind};
use crate::error::{RuntimeError, RuntimeResult};
use crate::metrics::{Counter, Gauge};

/// 尺寸等级粒度（字节）
pub const POOL_GRANULARITY: usize = 256;

#[derive(Debug, Default)]
struct PoolState {
    /// 尺寸等级 -> 空闲块
    bins: BTreeMap<usize, Vec<Block>>,
    cached_bytes: usize,
}

/// 带释放阈值的缓存内存池
#[derive(Debug)]
pub struct PoolArena<U: Arena = HostArena> {
    upstream: U,
    release_threshold: usize,
    state: Mutex<PoolState>,
    in_use: Gauge,
    allocs: Counter,
    hits: Counter,
}

impl<U: Arena> PoolArena<U> {
    /// 在上游分配器之上创建内存池
    pub fn new(upstream: U, release_threshold: usize) -> Self {
        Self {
            upstream,
            release_threshold,
            state: Mutex::new(PoolState::default()),
            in_use: Gauge::new(),
            allocs: Counter::new(),
            hits: Counter::new(),
        }
    }

    /// 释放阈值（字节）
    pub fn release_threshold(&self) -> usize {
        self.release_threshold
    }

    /// 当前缓存字节数
    pub fn cached_bytes(&self) -> usize {
        self.state.lock().cached_bytes
    }

    /// 缓存命中次数
    pub fn hit_count(&self) -> u64 {
        self.hits.get()
    }

    /// 上游分配器
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// 把全部缓存归还上游
    pub fn trim(&self) {
        let mut state = self.state.lock();
        self.release_down_to(&mut state, 0);
    }

    /// 请求对应的尺寸等级
    pub fn size_class(nbytes: usize) -> RuntimeResult<usize> {
        nbytes
            .max(1)
            .checked_next_multiple_of(POOL_GRANULARITY)
            .ok_or_else(|| RuntimeError::allocator(format!("请求 {} 字节溢出", nbytes)))
    }

    fn release_down_to(&self, state: &mut PoolState, limit: usize) {
        while state.cached_bytes > limit {
            let Some(mut entry) = state.bins.last_entry() else {
                break;
            };
            if let Some(block) = entry.get_mut().pop() {
                state.cached_bytes -= block.size();
                self.upstream.free(block);
            }
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    fn take_cached(&self, class: usize) -> Option<Block> {
        let mut state = self.state.lock();
        let bin = state.bins.get_mut(&class)?;
        let block = bin.pop();
        if bin.is_empty() {
            state.bins.remove(&class);
        }
        if let Some(b) = &block {
            state.cached_bytes -= b.size();
        }
        block
    }
}

impl<U: Arena> Arena for PoolArena<U> {
    fn alloc(&self, nbytes: usize) -> RuntimeResult<Block> {
        let class = Self::size_class(nbytes)?;
        self.allocs.inc();

        let block = match self.take_cached(class) {
            Some(block) => {
                self.hits.inc();
                log::trace!("PoolArena 命中: {} 字节", class);
                block
            }
            None => match self.upstream.alloc(class) {
                Ok(block) => block,
                Err(e) if e.is_out_of_memory() => {
                    log::warn!("PoolArena 上游内存不足，释放缓存后重试: {}", e);
                    self.trim();
                    self.upstream.alloc(class)?
                }
                Err(e) => return Err(e),
            },
        };

        self.in_use.add(block.size() as u64);
        Ok(block)
    }

    fn free(&self, block: Block) {
        let size = block.size();
        self.in_use.sub(size as u64);

        let mut state = self.state.lock();
        state.bins.entry(size).or_default().push(block);
        state.cached_bytes += size;
        if state.cached_bytes > self.release_threshold {
            self.release_down_to(&mut state, self.release_threshold);
        }
    }

    fn memory_kind(&self) -> MemoryKind {
        self.upstream.memory_kind()
    }

    fn stats(&self) -> ArenaStats {
        let upstream = self.upstream.stats();
        ArenaStats {
            in_use_bytes: self.in_use.get(),
            cached_bytes: self.cached_bytes() as u64,
            peak_in_use_bytes: self.in_use.peak(),
            alloc_count: self.allocs.get(),
            upstream_alloc_count: upstream.upstream_alloc_count,
            upstream_free_count: upstream.upstream_free_count,
        }
    }
}

impl<U: Arena> Drop for PoolArena<U> {
    fn drop(&mut self) {
        self.trim();
        let outstanding = self.in_use.get();
        if outstanding > 0 {
            log::warn!("PoolArena 被销毁时仍有 {} 字节在使用", outstanding);
        }
    }
}
