// crates/eb_amr/src/eb_flux_register.rs

//! EB 快速通量寄存器
//!
//! 一对相邻 AMR 层级之间的粗细界面通量累加与守恒修正。
//!
//! # 使用流程
//!
//! ```text
//! new/define ──> reset_to_zero ──> increment_coarse/increment_fine (每面片多次)
//!                     ^                              │
//!                     └──────────── reflux <─────────┘
//! ```
//!
//! # 缩放约定
//!
//! 寄存器和修正原语都不施加缩放或符号。`reflux` 把粗层寄存器以
//! `-r^(D-1)` 交给 `crse_init`，细层寄存器以 `1` 交给 `fine_add`，于是
//! 每个粗面上得到 `sum(fine) - r^(D-1) * coarse`，即面积加权后的通量差。
//!
//! # 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use eb_amr::prelude::*;
//! use eb_foundation::IndexBox;
//! use eb_runtime::{Arena, HostArena};
//!
//! let arena: Arc<dyn Arena> = Arc::new(HostArena::new());
//! let domain = IndexBox::from_arrays([0], [8]);
//! let coarse = LevelGrid::single_rank(BoxLayout::single(domain), Geometry::unit(domain)).unwrap();
//! let fine = LevelGrid::refined_from(&coarse, BoxLayout::single(IndexBox::from_arrays([4], [8])), 2).unwrap();
//!
//! let mut reg: EbFastFluxRegister<1> =
//!     EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
//! let mut u = LevelField::new(arena, coarse.layout(), 1).unwrap();
//! reg.reflux(&mut u, 1.0, 0, 0, 1).unwrap();
//! assert_eq!(u.sum(0), 0.0);
//! ```

use std::sync::Arc;
use std::time::Instant;

use eb_foundation::{IntVect, PatchIndex};
use eb_runtime::{Arena, Timer, TimingSnapshot};

use crate::error::{AmrError, AmrResult};
use crate::face_flux::EbFaceFlux;
use crate::flux_register::{FluxCorrector, FluxRegister};
use crate::geometry::LevelGrid;
use crate::level_data::{LevelField, LevelFluxes};

/// 细层在层级对中的相对层号
const FINE_LEVEL_TAG: usize = 1;

// =============================================================================
// InterfaceCorrection
// =============================================================================

/// 粗细界面上的修正策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceCorrection {
    /// 不施加割单元专用的界面修正
    NoInterfaceCorrection,
    /// 割单元粗细界面修正，保留给后续实现，当前不可构造
    CutCellInterfaceCorrection,
}

impl InterfaceCorrection {
    /// 由 `force_no_ebcf` 选择策略
    pub fn select(force_no_ebcf: bool) -> AmrResult<Self> {
        if force_no_ebcf {
            Ok(Self::NoInterfaceCorrection)
        } else {
            Err(AmrError::CutCellInterfaceUnsupported)
        }
    }

    /// 是否带割单元界面修正
    pub fn has_ebcf(self) -> bool {
        matches!(self, Self::CutCellInterfaceCorrection)
    }
}

// =============================================================================
// RegisterTimers
// =============================================================================

/// 寄存器各操作的累积耗时
#[derive(Debug, Default)]
pub struct RegisterTimers {
    /// 定义
    pub define: Timer,
    /// 清零
    pub reset: Timer,
    /// 粗层累加
    pub increment_coarse: Timer,
    /// 细层累加
    pub increment_fine: Timer,
    /// 修正
    pub reflux: Timer,
}

impl RegisterTimers {
    /// 各操作的快照
    pub fn snapshot(&self) -> [(&'static str, TimingSnapshot); 5] {
        [
            ("define", self.define.snapshot()),
            ("reset", self.reset.snapshot()),
            ("increment_coarse", self.increment_coarse.snapshot()),
            ("increment_fine", self.increment_fine.snapshot()),
            ("reflux", self.reflux.snapshot()),
        ]
    }
}

// =============================================================================
// PatchAccumulator
// =============================================================================

/// 单个面片的独占累加句柄
///
/// 持有该面片全部方向存储的 `&mut`，不同面片的句柄互不别名，
/// 可以分发到 rayon 线程上并行累加。
#[derive(Debug)]
pub struct PatchAccumulator<'a, const D: usize> {
    patch: PatchIndex,
    slabs: &'a mut [EbFaceFlux<D>; D],
}

impl<const D: usize> PatchAccumulator<'_, D> {
    /// 面片序号
    #[inline]
    pub fn patch(&self) -> PatchIndex {
        self.patch
    }

    /// 累加 `scale * flux[src..src + n)` 到 `flux` 自身方向的 `[dst, dst + n)` 分量
    pub fn increment(
        &mut self,
        flux: &EbFaceFlux<D>,
        scale: f64,
        src: usize,
        dst: usize,
        n: usize,
    ) -> AmrResult<()> {
        self.slabs[flux.direction()].plus(flux, src, dst, n, scale)
    }
}

// =============================================================================
// EbFastFluxRegister
// =============================================================================

/// EB 快速通量寄存器
///
/// 只能通过成功的构造得到，因此不存在"未定义"状态。
#[derive(Debug)]
pub struct EbFastFluxRegister<const D: usize, C: FluxCorrector<D> = FluxRegister<D>> {
    fine: LevelGrid<D>,
    coarse: LevelGrid<D>,
    ref_ratio: i64,
    n_comp: usize,
    interface: InterfaceCorrection,
    coar_register: LevelFluxes<D>,
    fine_register: LevelFluxes<D>,
    corrector: C,
    arena: Arc<dyn Arena>,
    timers: RegisterTimers,
}

impl<const D: usize, C: FluxCorrector<D>> EbFastFluxRegister<D, C> {
    /// 定义寄存器
    ///
    /// # 参数
    /// - `fine`, `coarse`: 细层、粗层网格
    /// - `ref_ratio`: 加密比，各方向相同
    /// - `n_comp`: 分量数
    /// - `force_no_ebcf`: 必须为 `true`，割单元粗细界面修正尚未实现
    /// - `arena`: 寄存器存储所用内存池
    ///
    /// # 错误
    /// 任何校验失败都不会产生寄存器。
    pub fn new(
        fine: &LevelGrid<D>,
        coarse: &LevelGrid<D>,
        ref_ratio: i64,
        n_comp: usize,
        force_no_ebcf: bool,
        arena: Arc<dyn Arena>,
    ) -> AmrResult<Self> {
        let start = Instant::now();

        let interface = InterfaceCorrection::select(force_no_ebcf)?;
        if ref_ratio < 1 {
            return Err(AmrError::InvalidRefRatio { ratio: ref_ratio });
        }
        if n_comp == 0 {
            return Err(AmrError::InvalidComponentCount { n_comp });
        }
        if let Some(k) = fine.layout().first_not_coarsenable(ref_ratio) {
            return Err(AmrError::NotCoarsenable {
                ratio: ref_ratio,
                patch: k,
                boxed: fine.layout().boxes()[k].to_string(),
            });
        }
        if let Some((i, j)) = fine.layout().first_overlap() {
            let boxes = fine.layout().boxes();
            return Err(AmrError::OverlappingPatches {
                first: i,
                first_box: boxes[i].to_string(),
                second: j,
                second_box: boxes[j].to_string(),
            });
        }
        let refined_coarse = coarse.domain().refine(IntVect::splat(ref_ratio));
        if fine.domain() != refined_coarse {
            return Err(AmrError::DomainMismatch {
                fine: fine.domain().to_string(),
                refined_coarse: refined_coarse.to_string(),
            });
        }

        let coar_register = LevelFluxes::new(Arc::clone(&arena), coarse.layout(), n_comp)?;
        let fine_register = LevelFluxes::new(Arc::clone(&arena), fine.layout(), n_comp)?;
        let corrector = C::define(
            Arc::clone(&arena),
            fine.layout(),
            fine.dmap(),
            IntVect::splat(ref_ratio),
            FINE_LEVEL_TAG,
            n_comp,
        )?;

        let mut reg = Self {
            fine: fine.clone(),
            coarse: coarse.clone(),
            ref_ratio,
            n_comp,
            interface,
            coar_register,
            fine_register,
            corrector,
            arena,
            timers: RegisterTimers::default(),
        };
        reg.zero_all();

        log::debug!(
            "EbFastFluxRegister<{}>: 定义完成, 细层 {} 个面片, 粗层 {} 个面片, r = {}, n_comp = {}",
            D,
            fine.num_patches(),
            coarse.num_patches(),
            ref_ratio,
            n_comp
        );
        reg.timers.define.record(start.elapsed());
        Ok(reg)
    }

    /// 原地重新定义
    ///
    /// 校验失败时保留原有定义不变。
    pub fn define(
        &mut self,
        fine: &LevelGrid<D>,
        coarse: &LevelGrid<D>,
        ref_ratio: i64,
        n_comp: usize,
        force_no_ebcf: bool,
    ) -> AmrResult<()> {
        let arena = Arc::clone(&self.arena);
        *self = Self::new(fine, coarse, ref_ratio, n_comp, force_no_ebcf, arena)?;
        Ok(())
    }

    fn zero_all(&mut self) {
        self.coar_register.set_val(0.0);
        self.fine_register.set_val(0.0);
        self.corrector.set_val(0.0);
    }

    /// 两侧寄存器和修正原语全部清零
    pub fn reset_to_zero(&mut self) {
        let start = Instant::now();
        self.zero_all();
        self.timers.reset.record(start.elapsed());
    }

    /// 累加粗层通量
    ///
    /// 写入 `flux` 自身方向的粗层寄存器：
    /// `coarse[patch][dir][dst + c] += scale * flux[src + c]`。
    pub fn increment_coarse(
        &mut self,
        flux: &EbFaceFlux<D>,
        scale: f64,
        patch: PatchIndex,
        src: usize,
        dst: usize,
        n: usize,
    ) -> AmrResult<()> {
        let _t = self.timers.increment_coarse.start();
        self.coar_register.patch_mut(patch)?[flux.direction()].plus(flux, src, dst, n, scale)
    }

    /// 累加细层通量
    pub fn increment_fine(
        &mut self,
        flux: &EbFaceFlux<D>,
        scale: f64,
        patch: PatchIndex,
        src: usize,
        dst: usize,
        n: usize,
    ) -> AmrResult<()> {
        let _t = self.timers.increment_fine.start();
        self.fine_register.patch_mut(patch)?[flux.direction()].plus(flux, src, dst, n, scale)
    }

    /// 粗层各面片的独占累加句柄
    pub fn coarse_accumulators(&mut self) -> Vec<PatchAccumulator<'_, D>> {
        Self::accumulators(&mut self.coar_register)
    }

    /// 细层各面片的独占累加句柄
    pub fn fine_accumulators(&mut self) -> Vec<PatchAccumulator<'_, D>> {
        Self::accumulators(&mut self.fine_register)
    }

    fn accumulators(level: &mut LevelFluxes<D>) -> Vec<PatchAccumulator<'_, D>> {
        level
            .patches_mut()
            .iter_mut()
            .enumerate()
            .map(|(k, slabs)| PatchAccumulator {
                patch: PatchIndex::new(k),
                slabs,
            })
            .collect()
    }

    /// 把累加的通量差作为守恒修正施加到粗层解 `u`
    ///
    /// 寄存器本身不被修改；下一个累加周期前需调用 [`reset_to_zero`](Self::reset_to_zero)。
    /// 窗口、布局在任何写入前校验，失败时 `u` 保持不变。
    ///
    /// # 参数
    /// - `u`: 粗层解，布局必须与粗层一致
    /// - `scale`: 修正缩放（通常为时间步长相关系数）
    /// - `src`: 寄存器起始分量，寄存器分量 `src + c` 修正解的分量 `dst + c`
    /// - `dst`: 解的起始分量，`dst + n` 不得超过寄存器与解的分量数
    /// - `n`: 分量个数
    pub fn reflux(
        &mut self,
        u: &mut LevelField<D>,
        scale: f64,
        src: usize,
        dst: usize,
        n: usize,
    ) -> AmrResult<()> {
        let _t = self.timers.reflux.start();

        AmrError::check_window("src", src, n, self.n_comp)?;
        AmrError::check_window("dst", dst, n, self.n_comp)?;
        AmrError::check_window("dst", dst, n, u.n_comp())?;
        if u.layout() != self.coarse.layout() {
            return Err(AmrError::BoxMismatch {
                expected: format!("{:?}", self.coarse.layout().boxes()),
                found: format!("{:?}", u.layout().boxes()),
            });
        }

        let coar_scale = -(self.num_fine_faces_per_coarse() as f64);
        let fine_scale = 1.0;
        for dir in 0..D {
            let crse = self.coar_register.directional(dir);
            let fine = self.fine_register.directional(dir);
            self.corrector
                .crse_init(&crse, dir, src, dst, n, coar_scale)?;
            self.corrector.fine_add(&fine, dir, src, dst, n, fine_scale)?;
            log::trace!("reflux: 方向 {} 已装入修正原语", dir);
        }

        let geom = self.coarse.geometry();
        self.corrector.clear_internal_borders(&geom);
        self.corrector.reflux(u, scale, dst, dst, n, &geom)?;

        log::debug!(
            "EbFastFluxRegister<{}>: reflux 完成 (scale = {}, 分量 [{}, {}))",
            D,
            scale,
            dst,
            dst + n
        );
        Ok(())
    }

    // =========================================================================
    // 访问器
    // =========================================================================

    /// 加密比
    #[inline]
    pub fn ref_ratio(&self) -> i64 {
        self.ref_ratio
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// 是否带割单元粗细界面修正（当前恒为 false）
    #[inline]
    pub fn has_ebcf(&self) -> bool {
        self.interface.has_ebcf()
    }

    /// 界面修正策略
    #[inline]
    pub fn interface_correction(&self) -> InterfaceCorrection {
        self.interface
    }

    /// 覆盖一个粗面的细面个数 `r^(D-1)`
    #[inline]
    pub fn num_fine_faces_per_coarse(&self) -> i64 {
        self.ref_ratio.pow(D as u32 - 1)
    }

    /// 粗层寄存器（只读）
    #[inline]
    pub fn coarse_register(&self) -> &LevelFluxes<D> {
        &self.coar_register
    }

    /// 细层寄存器（只读）
    #[inline]
    pub fn fine_register(&self) -> &LevelFluxes<D> {
        &self.fine_register
    }

    /// 修正原语
    #[inline]
    pub fn corrector(&self) -> &C {
        &self.corrector
    }

    /// 细层网格
    #[inline]
    pub fn fine_grid(&self) -> &LevelGrid<D> {
        &self.fine
    }

    /// 粗层网格
    #[inline]
    pub fn coarse_grid(&self) -> &LevelGrid<D> {
        &self.coarse
    }

    /// 存储所用内存池
    #[inline]
    pub fn arena(&self) -> &Arc<dyn Arena> {
        &self.arena
    }

    /// 各操作耗时
    #[inline]
    pub fn timers(&self) -> &RegisterTimers {
        &self.timers
    }
}
