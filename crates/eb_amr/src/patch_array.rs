// crates/eb_amr/src/patch_array.rs

//! 单个盒子上的多分量数组
//!
//! 数据放在内存池分配的 [`ArenaBuffer`] 中，分量优先、每个分量内部按
//! Fortran 顺序（第 0 维最快）排列：
//!
//! ```text
//! [comp 0: pts 0..N) [comp 1: pts 0..N) ...
//! ```
//!
//! 分量窗口由上层校验，这里越界直接 panic。

use std::sync::Arc;

use eb_foundation::{IndexBox, IntVect};
use eb_runtime::{Arena, ArenaBuffer};

use crate::error::AmrResult;

/// 盒子上的多分量 f64 数组
pub struct PatchArray<const D: usize> {
    bx: IndexBox<D>,
    n_comp: usize,
    npts: usize,
    data: ArenaBuffer<f64>,
}

impl<const D: usize> PatchArray<D> {
    /// 分配零值数组
    ///
    /// # 参数
    /// - `arena`: 内存池
    /// - `bx`: 数组覆盖的索引盒子（单元盒子或面盒子）
    /// - `n_comp`: 分量数
    pub fn new(arena: Arc<dyn Arena>, bx: IndexBox<D>, n_comp: usize) -> AmrResult<Self> {
        let npts = bx.num_pts();
        let data = ArenaBuffer::zeroed(arena, npts * n_comp)?;
        Ok(Self {
            bx,
            n_comp,
            npts,
            data,
        })
    }

    /// 覆盖的盒子
    #[inline]
    pub fn bx(&self) -> IndexBox<D> {
        self.bx
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// 底层数据
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// 底层数据（可变）
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, iv: IntVect<D>, comp: usize) -> usize {
        assert!(comp < self.n_comp, "分量 {} 超出 {}", comp, self.n_comp);
        comp * self.npts + self.bx.linear_index(iv)
    }

    /// 第 `comp` 分量的连续数据
    pub fn comp_slice(&self, comp: usize) -> &[f64] {
        &self.data[comp * self.npts..(comp + 1) * self.npts]
    }

    /// 读取
    #[inline]
    pub fn get(&self, iv: IntVect<D>, comp: usize) -> f64 {
        self.data[self.offset(iv, comp)]
    }

    /// 写入
    #[inline]
    pub fn set(&mut self, iv: IntVect<D>, comp: usize, value: f64) {
        let k = self.offset(iv, comp);
        self.data[k] = value;
    }

    /// 累加
    #[inline]
    pub fn add(&mut self, iv: IntVect<D>, comp: usize, value: f64) {
        let k = self.offset(iv, comp);
        self.data[k] += value;
    }

    /// 全部元素置为 `value`
    pub fn set_val(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// 把 `region` 内 `[comp, comp + n)` 分量置为 `value`
    pub fn set_val_in(&mut self, region: &IndexBox<D>, comp: usize, n: usize, value: f64) {
        let Some(isect) = self.bx.intersect(region) else {
            return;
        };
        for c in comp..comp + n {
            for iv in &isect {
                self.set(iv, c, value);
            }
        }
    }

    /// 按函数填充某一分量
    pub fn fill_with(&mut self, comp: usize, f: impl Fn(IntVect<D>) -> f64) {
        let bx = self.bx;
        for iv in &bx {
            self.set(iv, comp, f(iv));
        }
    }

    /// `self[dst + c] += scale * other[src + c]`，作用于两盒子与 `region` 的交集
    pub fn plus_from(
        &mut self,
        other: &Self,
        region: &IndexBox<D>,
        src: usize,
        dst: usize,
        n: usize,
        scale: f64,
    ) {
        let Some(isect) = self
            .bx
            .intersect(&other.bx)
            .and_then(|b| b.intersect(region))
        else {
            return;
        };
        for c in 0..n {
            for iv in &isect {
                let v = other.get(iv, src + c);
                self.add(iv, dst + c, scale * v);
            }
        }
    }

    /// `self[dst + c] = scale * other[src + c]`，作用于两盒子与 `region` 的交集
    pub fn copy_scaled_from(
        &mut self,
        other: &Self,
        region: &IndexBox<D>,
        src: usize,
        dst: usize,
        n: usize,
        scale: f64,
    ) {
        let Some(isect) = self
            .bx
            .intersect(&other.bx)
            .and_then(|b| b.intersect(region))
        else {
            return;
        };
        for c in 0..n {
            for iv in &isect {
                let v = other.get(iv, src + c);
                self.set(iv, dst + c, scale * v);
            }
        }
    }

    /// 在同一内存池中复制一份
    pub fn try_clone(&self) -> AmrResult<Self> {
        Ok(Self {
            bx: self.bx,
            n_comp: self.n_comp,
            npts: self.npts,
            data: self.data.try_clone()?,
        })
    }
}

impl<const D: usize> std::fmt::Debug for PatchArray<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchArray")
            .field("bx", &self.bx)
            .field("n_comp", &self.n_comp)
            .finish()
    }
}
