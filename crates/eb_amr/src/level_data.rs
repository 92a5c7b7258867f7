// crates/eb_amr/src/level_data.rs

//! 层级数据容器
//!
//! - [`LevelFluxes`]: 每个面片 `D` 个方向的面通量，通量寄存器的存储
//! - [`DirectionalFluxes`]: 某一方向的非拥有视图，按层级布局别名
//! - [`LevelField`]: 单元中心的多分量解
//!
//! 面片之间互不重叠，批量操作按面片用 rayon 并行。

use rayon::prelude::*;
use std::sync::Arc;

use eb_foundation::{IntVect, PatchIndex};
use eb_runtime::Arena;

use crate::error::{AmrError, AmrResult};
use crate::face_flux::EbFaceFlux;
use crate::layout::BoxLayout;
use crate::patch_array::PatchArray;

// =============================================================================
// LevelFluxes
// =============================================================================

/// 整个层级的分方向面通量
#[derive(Debug)]
pub struct LevelFluxes<const D: usize> {
    layout: BoxLayout<D>,
    n_comp: usize,
    patches: Vec<[EbFaceFlux<D>; D]>,
}

impl<const D: usize> LevelFluxes<D> {
    /// 按布局分配零值通量
    pub fn new(arena: Arc<dyn Arena>, layout: &BoxLayout<D>, n_comp: usize) -> AmrResult<Self> {
        let patches = layout
            .iter()
            .map(|bx| {
                let fluxes = (0..D)
                    .map(|dir| EbFaceFlux::new(Arc::clone(&arena), *bx, dir, n_comp))
                    .collect::<AmrResult<Vec<_>>>()?;
                let dirs: [EbFaceFlux<D>; D] =
                    fluxes
                        .try_into()
                        .map_err(|v: Vec<EbFaceFlux<D>>| AmrError::DirectionMismatch {
                            expected: D,
                            found: v.len(),
                        })?;
                Ok(dirs)
            })
            .collect::<AmrResult<Vec<_>>>()?;

        Ok(Self {
            layout: layout.clone(),
            n_comp,
            patches,
        })
    }

    /// 布局
    #[inline]
    pub fn layout(&self) -> &BoxLayout<D> {
        &self.layout
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// 面片数
    #[inline]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    fn check_patch(&self, patch: PatchIndex) -> AmrResult<usize> {
        let k = patch.get();
        if k < self.patches.len() {
            Ok(k)
        } else {
            Err(AmrError::PatchOutOfRange {
                patch: k,
                len: self.patches.len(),
            })
        }
    }

    /// 某面片的全部方向
    pub fn patch(&self, patch: PatchIndex) -> AmrResult<&[EbFaceFlux<D>; D]> {
        let k = self.check_patch(patch)?;
        Ok(&self.patches[k])
    }

    /// 某面片的全部方向（可变）
    pub fn patch_mut(&mut self, patch: PatchIndex) -> AmrResult<&mut [EbFaceFlux<D>; D]> {
        let k = self.check_patch(patch)?;
        Ok(&mut self.patches[k])
    }

    /// 某面片某方向
    pub fn flux(&self, patch: PatchIndex, dir: usize) -> AmrResult<&EbFaceFlux<D>> {
        Ok(&self.patch(patch)?[dir])
    }

    /// 按面片切分的可变存储
    pub fn patches_mut(&mut self) -> &mut [[EbFaceFlux<D>; D]] {
        &mut self.patches
    }

    /// 全部置为 `value`
    pub fn set_val(&mut self, value: f64) {
        self.patches.par_iter_mut().for_each(|dirs| {
            for f in dirs.iter_mut() {
                f.set_val(value);
            }
        });
    }

    /// `dir` 方向的非拥有视图
    pub fn directional(&self, dir: usize) -> DirectionalFluxes<'_, D> {
        assert!(dir < D, "方向 {} 超出维数 {}", dir, D);
        DirectionalFluxes { level: self, dir }
    }

    /// 所有面值是否都等于 `value`
    pub fn all_equal(&self, value: f64) -> bool {
        self.patches
            .iter()
            .flat_map(|dirs| dirs.iter())
            .all(|f| f.data().as_slice().iter().all(|&x| x == value))
    }
}

// =============================================================================
// DirectionalFluxes
// =============================================================================

/// `LevelFluxes` 中单一方向的别名视图
///
/// 不复制数据，只记住来源和方向；按面片序号访问的仍是寄存器本身的存储。
#[derive(Debug, Clone, Copy)]
pub struct DirectionalFluxes<'a, const D: usize> {
    level: &'a LevelFluxes<D>,
    dir: usize,
}

impl<'a, const D: usize> DirectionalFluxes<'a, D> {
    /// 方向
    #[inline]
    pub fn direction(&self) -> usize {
        self.dir
    }

    /// 别名所依附的布局
    #[inline]
    pub fn layout(&self) -> &'a BoxLayout<D> {
        &self.level.layout
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.level.n_comp
    }

    /// 面片数
    #[inline]
    pub fn len(&self) -> usize {
        self.level.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.level.is_empty()
    }

    /// 第 `k` 个面片的通量
    #[inline]
    pub fn get(&self, k: usize) -> Option<&'a EbFaceFlux<D>> {
        self.level.patches.get(k).map(|dirs| &dirs[self.dir])
    }

    /// 遍历各面片的通量
    pub fn iter(&self) -> impl Iterator<Item = &'a EbFaceFlux<D>> + 'a {
        let (level, dir) = (self.level, self.dir);
        level.patches.iter().map(move |dirs| &dirs[dir])
    }
}

// =============================================================================
// LevelField
// =============================================================================

/// 单元中心的层级解
#[derive(Debug)]
pub struct LevelField<const D: usize> {
    layout: BoxLayout<D>,
    n_comp: usize,
    patches: Vec<PatchArray<D>>,
}

impl<const D: usize> LevelField<D> {
    /// 按布局分配零值解
    pub fn new(arena: Arc<dyn Arena>, layout: &BoxLayout<D>, n_comp: usize) -> AmrResult<Self> {
        let patches = layout
            .iter()
            .map(|bx| PatchArray::new(Arc::clone(&arena), *bx, n_comp))
            .collect::<AmrResult<Vec<_>>>()?;
        Ok(Self {
            layout: layout.clone(),
            n_comp,
            patches,
        })
    }

    /// 布局
    #[inline]
    pub fn layout(&self) -> &BoxLayout<D> {
        &self.layout
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// 面片数
    #[inline]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// 面片数组
    pub fn patch(&self, k: usize) -> Option<&PatchArray<D>> {
        self.patches.get(k)
    }

    /// 面片数组（可变）
    pub fn patch_mut(&mut self, k: usize) -> Option<&mut PatchArray<D>> {
        self.patches.get_mut(k)
    }

    /// 全部置为 `value`
    pub fn set_val(&mut self, value: f64) {
        self.patches
            .par_iter_mut()
            .for_each(|p| p.set_val(value));
    }

    /// 按单元索引填充某一分量
    pub fn fill_with<F>(&mut self, comp: usize, f: F)
    where
        F: Fn(IntVect<D>) -> f64 + Sync,
    {
        self.patches
            .par_iter_mut()
            .for_each(|p| p.fill_with(comp, &f));
    }

    /// 包含单元 `iv` 的面片序号
    pub fn find(&self, iv: IntVect<D>) -> Option<usize> {
        self.patches.iter().position(|p| p.bx().contains(iv))
    }

    /// 同 [`find`](Self::find)，但先检查 `hint` 指向的面片
    ///
    /// 按面顺序遍历时相邻单元几乎总落在同一面片，命中时为 O(1)。
    pub fn find_near(&self, iv: IntVect<D>, hint: Option<usize>) -> Option<usize> {
        match hint {
            Some(k) if self.patches.get(k).is_some_and(|p| p.bx().contains(iv)) => Some(k),
            _ => self.find(iv),
        }
    }

    /// 读取单元值
    pub fn get(&self, iv: IntVect<D>, comp: usize) -> Option<f64> {
        let k = self.find(iv)?;
        Some(self.patches[k].get(iv, comp))
    }

    /// 累加到单元，单元不在任何面片内时返回 `false`
    pub fn add(&mut self, iv: IntVect<D>, comp: usize, value: f64) -> bool {
        match self.find(iv) {
            Some(k) => {
                self.patches[k].add(iv, comp, value);
                true
            }
            None => false,
        }
    }

    /// 某分量在全部单元上的和
    pub fn sum(&self, comp: usize) -> f64 {
        self.patches
            .iter()
            .map(|p| p.comp_slice(comp).iter().sum::<f64>())
            .sum()
    }

    /// 在同一内存池中复制一份
    pub fn try_clone(&self) -> AmrResult<Self> {
        let patches = self
            .patches
            .iter()
            .map(PatchArray::try_clone)
            .collect::<AmrResult<Vec<_>>>()?;
        Ok(Self {
            layout: self.layout.clone(),
            n_comp: self.n_comp,
            patches,
        })
    }

    /// 与另一解逐元素比较是否完全相同（位级）
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        self.layout == other.layout
            && self.n_comp == other.n_comp
            && self
                .patches
                .iter()
                .zip(&other.patches)
                .all(|(a, b)| {
                    a.as_slice()
                        .iter()
                        .zip(b.as_slice())
                        .all(|(x, y)| x.to_bits() == y.to_bits())
                })
    }
}
