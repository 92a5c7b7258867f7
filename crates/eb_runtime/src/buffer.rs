// crates/eb_runtime/src/buffer.rs

//! ArenaBuffer - 内存池支撑的类型化缓冲区
//!
//! 定长、零初始化、按 64 字节对齐。缓冲区持有所属内存池的 `Arc`，
//! drop 时把块交还给池，因此缓冲区总是先于内存池销毁。

use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::arena::{Arena, Block, ARENA_ALIGN};
use crate::error::{RuntimeError, RuntimeResult};

/// 内存池支撑的定长缓冲区
pub struct ArenaBuffer<T: Pod> {
    ptr: NonNull<T>,
    len: usize,
    block: Option<Block>,
    arena: Arc<dyn Arena>,
    _marker: PhantomData<T>,
}

// 缓冲区独占其块，T: Pod 无内部引用
unsafe impl<T: Pod + Send> Send for ArenaBuffer<T> {}
unsafe impl<T: Pod + Sync> Sync for ArenaBuffer<T> {}

impl<T: Pod> ArenaBuffer<T> {
    /// 分配 `len` 个零值元素
    pub fn zeroed(arena: Arc<dyn Arena>, len: usize) -> RuntimeResult<Self> {
        if !arena.is_host_accessible() {
            return Err(RuntimeError::NotHostAccessible {
                kind: arena.memory_kind(),
            });
        }
        if align_of::<T>() > ARENA_ALIGN {
            return Err(RuntimeError::AlignmentUnsupported {
                align: align_of::<T>(),
                max: ARENA_ALIGN,
            });
        }
        let nbytes = len.checked_mul(size_of::<T>()).ok_or_else(|| {
            RuntimeError::allocator(format!("{} 个 {} 字节元素溢出", len, size_of::<T>()))
        })?;

        let block = arena.alloc(nbytes)?;
        // SAFETY: T: Pod，全零位模式合法；块至少 nbytes 字节
        unsafe { std::ptr::write_bytes(block.as_ptr(), 0, nbytes) };
        let ptr = block.as_non_null().cast::<T>();

        Ok(Self {
            ptr,
            len,
            block: Some(block),
            arena,
            _marker: PhantomData,
        })
    }

    /// 分配并填充
    pub fn filled(arena: Arc<dyn Arena>, len: usize, value: T) -> RuntimeResult<Self> {
        let mut buf = Self::zeroed(arena, len)?;
        buf.fill(value);
        Ok(buf)
    }

    /// 从切片复制
    pub fn from_slice(arena: Arc<dyn Arena>, src: &[T]) -> RuntimeResult<Self> {
        let mut buf = Self::zeroed(arena, src.len())?;
        buf.copy_from_slice(src);
        Ok(buf)
    }

    /// 在同一内存池中复制一份
    pub fn try_clone(&self) -> RuntimeResult<Self> {
        Self::from_slice(Arc::clone(&self.arena), self.as_slice())
    }

    /// 元素个数
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 所属内存池
    #[inline]
    pub fn arena(&self) -> &Arc<dyn Arena> {
        &self.arena
    }

    /// 只读切片
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr 指向 len 个已初始化元素，生命周期受 self 约束
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// 可变切片
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: 同上，且 &mut self 保证独占
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// 字节视图
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }
}

impl<T: Pod> Deref for ArenaBuffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> DerefMut for ArenaBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Pod> Drop for ArenaBuffer<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            self.arena.free(block);
        }
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for ArenaBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaBuffer")
            .field("len", &self.len)
            .field("kind", &self.arena.memory_kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{HostArena, PArena, PlatformCaps};

    #[test]
    fn test_zeroed_and_fill() {
        let arena: Arc<dyn Arena> = Arc::new(HostArena::new());
        let mut buf = ArenaBuffer::<f64>::zeroed(Arc::clone(&arena), 10).unwrap();
        assert_eq!(buf.len(), 10);
        assert!(buf.iter().all(|&x| x == 0.0));

        buf.fill(1.5);
        buf[3] = 2.0;
        assert_eq!(buf.iter().sum::<f64>(), 15.5);
        assert_eq!(buf.as_bytes().len(), 80);
    }

    #[test]
    fn test_reused_pool_block_is_zeroed() {
        let arena: Arc<dyn Arena> =
            Arc::new(PArena::with_platform(1 << 20, PlatformCaps { memory_pool: true }).unwrap());
        {
            let _dirty = ArenaBuffer::<f64>::filled(Arc::clone(&arena), 32, 7.0).unwrap();
        }
        let clean = ArenaBuffer::<f64>::zeroed(Arc::clone(&arena), 32).unwrap();
        assert!(clean.iter().all(|&x| x == 0.0));
        assert_eq!(arena.stats().upstream_alloc_count, 1);
    }

    #[test]
    fn test_drop_returns_block() {
        let arena: Arc<dyn Arena> = Arc::new(HostArena::new());
        let buf = ArenaBuffer::<u32>::from_slice(Arc::clone(&arena), &[1, 2, 3]).unwrap();
        let copy = buf.try_clone().unwrap();
        assert_eq!(copy.as_slice(), &[1, 2, 3]);
        assert_eq!(arena.stats().in_use_bytes, 24);
        drop(buf);
        drop(copy);
        assert_eq!(arena.stats().in_use_bytes, 0);
    }

    #[test]
    fn test_oversized_request_is_reported() {
        let arena: Arc<dyn Arena> = Arc::new(HostArena::with_limit(64));
        let err = ArenaBuffer::<f64>::zeroed(arena, 1000).unwrap_err();
        assert!(err.is_out_of_memory());
    }
}
