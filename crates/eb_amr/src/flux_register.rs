// crates/eb_amr/src/flux_register.rs

//! 规则单元通量修正算子
//!
//! [`FluxCorrector`] 是 EB 通量寄存器所依赖的修正原语接口，
//! [`FluxRegister`] 是它的经典实现。
//!
//! # 存储
//!
//! 对每个细面片 `k`、方向 `d`、侧 `s`，在 `coarsen(fine_box_k, r)` 的
//! `s` 侧边界面上存一层粗面值（slab）：
//!
//! ```text
//!        coarse cell   | fine patch k (coarsened) |   coarse cell
//!   ... [ lo - 1 ]     |lo                      hi|    [ hi ] ...
//!                      ^ Low slab                 ^ High slab
//! ```
//!
//! # 约定
//!
//! - `crse_init` 覆盖写入 `mult * 粗通量`（同一粗面可能被两个粗面片共享）
//! - `fine_add` 累加 `mult * 覆盖该粗面的细面之和`
//! - 两者都不自带任何缩放或符号，调用者负责
//! - `reflux` 对 Low slab 下方的粗单元加 `-scale * reg / vol`，
//!   对 High slab 上方的粗单元加 `+scale * reg / vol`

use std::collections::HashSet;
use std::sync::Arc;

use eb_foundation::{IndexBox, IntVect, Side};
use eb_runtime::Arena;

use crate::error::{AmrError, AmrResult};
use crate::geometry::Geometry;
use crate::layout::{BoxLayout, DistributionMap};
use crate::level_data::{DirectionalFluxes, LevelField};
use crate::patch_array::PatchArray;

// =============================================================================
// FluxCorrector trait
// =============================================================================

/// 规则单元通量修正原语
///
/// 实现者在细层布局上保存粗细界面的通量差，并把它作为守恒修正施加到粗层解上。
pub trait FluxCorrector<const D: usize>: Send + Sized {
    /// 按细层布局创建
    ///
    /// # 参数
    /// - `arena`: 存储所用内存池
    /// - `fine_layout`: 细层盒子布局
    /// - `dmap`: 细层分布映射
    /// - `ratio`: 各方向加密比
    /// - `fine_level`: 细层层号
    /// - `n_comp`: 分量数
    fn define(
        arena: Arc<dyn Arena>,
        fine_layout: &BoxLayout<D>,
        dmap: &DistributionMap,
        ratio: IntVect<D>,
        fine_level: usize,
        n_comp: usize,
    ) -> AmrResult<Self>;

    /// 内部状态全部置为 `value`
    fn set_val(&mut self, value: f64);

    /// 用粗层通量初始化 `dir` 方向（覆盖写入 `mult * flux`）
    fn crse_init(
        &mut self,
        crse: &DirectionalFluxes<'_, D>,
        dir: usize,
        src: usize,
        dst: usize,
        n: usize,
        mult: f64,
    ) -> AmrResult<()>;

    /// 累加细层通量到 `dir` 方向（`+= mult * sum(fine)`）
    fn fine_add(
        &mut self,
        fine: &DirectionalFluxes<'_, D>,
        dir: usize,
        src: usize,
        dst: usize,
        n: usize,
        mult: f64,
    ) -> AmrResult<()>;

    /// 清除细面片之间共享面上的重复贡献
    fn clear_internal_borders(&mut self, geom: &Geometry<D>);

    /// 把修正施加到粗层解
    fn reflux(
        &self,
        u: &mut LevelField<D>,
        scale: f64,
        src: usize,
        dst: usize,
        n: usize,
        geom: &Geometry<D>,
    ) -> AmrResult<()>;
}

// =============================================================================
// FluxRegister
// =============================================================================

/// 经典通量寄存器
#[derive(Debug)]
pub struct FluxRegister<const D: usize> {
    fine_layout: BoxLayout<D>,
    ratio: IntVect<D>,
    fine_level: usize,
    n_comp: usize,
    slabs: Vec<PatchArray<D>>,
}

impl<const D: usize> FluxRegister<D> {
    #[inline]
    fn slot(patch: usize, dir: usize, side: Side) -> usize {
        (patch * D + dir) * 2 + side.index()
    }

    /// 加密比
    #[inline]
    pub fn ratio(&self) -> IntVect<D> {
        self.ratio
    }

    /// 细层层号
    #[inline]
    pub fn fine_level(&self) -> usize {
        self.fine_level
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// 细面片数
    #[inline]
    pub fn num_patches(&self) -> usize {
        self.fine_layout.len()
    }

    /// 细面片 `patch` 在 `dir` 方向 `side` 侧的粗面值
    pub fn slab(&self, patch: usize, dir: usize, side: Side) -> Option<&PatchArray<D>> {
        if patch >= self.num_patches() || dir >= D {
            return None;
        }
        self.slabs.get(Self::slot(patch, dir, side))
    }

    fn check_dir(dir: usize, fluxes: &DirectionalFluxes<'_, D>) -> AmrResult<()> {
        if dir >= D || fluxes.direction() != dir {
            return Err(AmrError::DirectionMismatch {
                expected: dir,
                found: fluxes.direction(),
            });
        }
        Ok(())
    }

    /// 覆盖粗面 `face` 的细面
    fn fine_tile(&self, face: IntVect<D>, dir: usize) -> IndexBox<D> {
        let lo = face.refine(self.ratio);
        let mut hi = lo + self.ratio;
        hi[dir] = lo[dir] + 1;
        IndexBox::new(lo, hi)
    }
}

impl<const D: usize> FluxCorrector<D> for FluxRegister<D> {
    fn define(
        arena: Arc<dyn Arena>,
        fine_layout: &BoxLayout<D>,
        dmap: &DistributionMap,
        ratio: IntVect<D>,
        fine_level: usize,
        n_comp: usize,
    ) -> AmrResult<Self> {
        if n_comp == 0 {
            return Err(AmrError::InvalidComponentCount { n_comp });
        }
        if ratio.min_component() < 1 {
            return Err(AmrError::InvalidRefRatio {
                ratio: ratio.min_component(),
            });
        }
        if fine_layout.len() != dmap.len() {
            return Err(AmrError::LayoutMismatch {
                boxes: fine_layout.len(),
                owners: dmap.len(),
            });
        }
        if let Some(k) = fine_layout.iter().position(|b| !b.is_coarsenable(ratio)) {
            return Err(AmrError::NotCoarsenable {
                ratio: ratio.min_component(),
                patch: k,
                boxed: fine_layout.boxes()[k].to_string(),
            });
        }

        let mut slabs = Vec::with_capacity(fine_layout.len() * D * 2);
        for bx in fine_layout {
            let crse = bx.coarsen(ratio);
            for dir in 0..D {
                for side in Side::BOTH {
                    slabs.push(PatchArray::new(
                        Arc::clone(&arena),
                        crse.boundary_faces(dir, side),
                        n_comp,
                    )?);
                }
            }
        }

        Ok(Self {
            fine_layout: fine_layout.clone(),
            ratio,
            fine_level,
            n_comp,
            slabs,
        })
    }

    fn set_val(&mut self, value: f64) {
        for slab in &mut self.slabs {
            slab.set_val(value);
        }
    }

    fn crse_init(
        &mut self,
        crse: &DirectionalFluxes<'_, D>,
        dir: usize,
        src: usize,
        dst: usize,
        n: usize,
        mult: f64,
    ) -> AmrResult<()> {
        Self::check_dir(dir, crse)?;
        AmrError::check_window("src", src, n, crse.n_comp())?;
        AmrError::check_window("dst", dst, n, self.n_comp)?;

        for k in 0..self.num_patches() {
            for side in Side::BOTH {
                let slab = &mut self.slabs[Self::slot(k, dir, side)];
                let region = slab.bx();
                for flux in crse.iter() {
                    slab.copy_scaled_from(flux.data(), &region, src, dst, n, mult);
                }
            }
        }
        Ok(())
    }

    fn fine_add(
        &mut self,
        fine: &DirectionalFluxes<'_, D>,
        dir: usize,
        src: usize,
        dst: usize,
        n: usize,
        mult: f64,
    ) -> AmrResult<()> {
        Self::check_dir(dir, fine)?;
        if fine.len() != self.num_patches() {
            return Err(AmrError::LayoutMismatch {
                boxes: self.num_patches(),
                owners: fine.len(),
            });
        }
        AmrError::check_window("src", src, n, fine.n_comp())?;
        AmrError::check_window("dst", dst, n, self.n_comp)?;

        for (k, flux) in fine.iter().enumerate() {
            let face_box = flux.face_box();
            for side in Side::BOTH {
                let slot = Self::slot(k, dir, side);
                let faces = self.slabs[slot].bx();
                for face in &faces {
                    let Some(tile) = self.fine_tile(face, dir).intersect(&face_box) else {
                        continue;
                    };
                    for c in 0..n {
                        let sum: f64 = tile.iter().map(|f| flux.get(f, src + c)).sum();
                        self.slabs[slot].add(face, dst + c, mult * sum);
                    }
                }
            }
        }
        Ok(())
    }

    fn clear_internal_borders(&mut self, geom: &Geometry<D>) {
        for dir in 0..D {
            let mut faces_on = [HashSet::new(), HashSet::new()];
            for k in 0..self.num_patches() {
                for side in Side::BOTH {
                    let slab = &self.slabs[Self::slot(k, dir, side)];
                    faces_on[side.index()]
                        .extend(slab.bx().iter().filter_map(|f| geom.wrap_face(dir, f)));
                }
            }

            let mut cleared = 0usize;
            for k in 0..self.num_patches() {
                for side in Side::BOTH {
                    let other = &faces_on[side.flip().index()];
                    let slab = &mut self.slabs[Self::slot(k, dir, side)];
                    let faces = slab.bx();
                    for face in &faces {
                        let shared = geom
                            .wrap_face(dir, face)
                            .is_some_and(|f| other.contains(&f));
                        if shared {
                            for c in 0..self.n_comp {
                                slab.set(face, c, 0.0);
                            }
                            cleared += 1;
                        }
                    }
                }
            }
            if cleared > 0 {
                log::trace!("FluxRegister: 方向 {} 清除 {} 个内部共享面", dir, cleared);
            }
        }
    }

    fn reflux(
        &self,
        u: &mut LevelField<D>,
        scale: f64,
        src: usize,
        dst: usize,
        n: usize,
        geom: &Geometry<D>,
    ) -> AmrResult<()> {
        AmrError::check_window("src", src, n, self.n_comp)?;
        AmrError::check_window("dst", dst, n, u.n_comp())?;

        let vol = geom.cell_volume();
        for k in 0..self.num_patches() {
            for dir in 0..D {
                let below = IntVect::basis(dir);
                for side in Side::BOTH {
                    let slab = &self.slabs[Self::slot(k, dir, side)];
                    let mult = side.sign() * scale / vol;
                    let mut hint = None;
                    for face in &slab.bx() {
                        let cell = match side {
                            Side::Low => face - below,
                            Side::High => face,
                        };
                        // 非周期域外的单元没有修正对象
                        let Some(cell) = geom.wrap_cell(cell) else {
                            continue;
                        };
                        let Some(p) = u.find_near(cell, hint) else {
                            continue;
                        };
                        hint = Some(p);
                        let Some(target) = u.patch_mut(p) else {
                            continue;
                        };
                        for c in 0..n {
                            // 零寄存器值不写入，保持 -0.0 且不因 inf * 0 产生 NaN
                            let v = slab.get(face, src + c);
                            if v != 0.0 {
                                target.add(cell, dst + c, mult * v);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
