// crates/eb_amr/src/geometry.rs

//! 层级几何与层级网格描述
//!
//! `Geometry` 给出计算域、网格尺寸和周期性，修正算子用它判断面两侧的
//! 单元是否在域内、是否要经周期映像折回。`LevelGrid` 把布局、分布映射
//! 和几何打包成一个层级的完整描述。

use eb_foundation::{IndexBox, IntVect};

use crate::error::{AmrError, AmrResult};
use crate::layout::{BoxLayout, DistributionMap};

// =============================================================================
// Geometry
// =============================================================================

/// 单层几何
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry<const D: usize> {
    domain: IndexBox<D>,
    dx: [f64; D],
    periodic: [bool; D],
}

impl<const D: usize> Geometry<D> {
    /// 创建几何
    pub fn new(domain: IndexBox<D>, dx: [f64; D], periodic: [bool; D]) -> Self {
        Self {
            domain,
            dx,
            periodic,
        }
    }

    /// 非周期、网格尺寸为 1 的几何
    pub fn unit(domain: IndexBox<D>) -> Self {
        Self::new(domain, [1.0; D], [false; D])
    }

    /// 计算域
    #[inline]
    pub fn domain(&self) -> IndexBox<D> {
        self.domain
    }

    /// 网格尺寸
    #[inline]
    pub fn cell_size(&self) -> [f64; D] {
        self.dx
    }

    /// 周期性标志
    #[inline]
    pub fn periodicity(&self) -> [bool; D] {
        self.periodic
    }

    /// `dir` 方向是否周期
    #[inline]
    pub fn is_periodic(&self, dir: usize) -> bool {
        self.periodic[dir]
    }

    /// 是否有任一周期方向
    pub fn is_any_periodic(&self) -> bool {
        self.periodic.iter().any(|&p| p)
    }

    /// 单元体积
    pub fn cell_volume(&self) -> f64 {
        self.dx.iter().product()
    }

    /// `dir` 方向的周期长度（单元数）
    #[inline]
    pub fn period(&self, dir: usize) -> i64 {
        self.domain.size()[dir]
    }

    /// 把单元索引映射回计算域
    ///
    /// 周期方向折回，非周期方向越界时返回 `None`。
    pub fn wrap_cell(&self, iv: IntVect<D>) -> Option<IntVect<D>> {
        let mut out = iv;
        for d in 0..D {
            let (lo, hi) = (self.domain.lo()[d], self.domain.hi()[d]);
            if iv[d] >= lo && iv[d] < hi {
                continue;
            }
            if !self.periodic[d] || hi <= lo {
                return None;
            }
            out[d] = lo + (iv[d] - lo).rem_euclid(hi - lo);
        }
        Some(out)
    }

    /// 把 `dir` 方向的面索引映射回计算域
    ///
    /// 面方向上有效面为 `[lo, hi]`；周期方向上 `hi` 面与 `lo` 面是同一个面，
    /// 统一归一为 `lo`。横向按单元规则处理。
    pub fn wrap_face(&self, dir: usize, iv: IntVect<D>) -> Option<IntVect<D>> {
        let (lo, hi) = (self.domain.lo()[dir], self.domain.hi()[dir]);
        let mut out = self.wrap_cell(iv.with(dir, lo))?;
        out[dir] = if self.periodic[dir] {
            if hi <= lo {
                return None;
            }
            lo + (iv[dir] - lo).rem_euclid(hi - lo)
        } else if iv[dir] >= lo && iv[dir] <= hi {
            iv[dir]
        } else {
            return None;
        };
        Some(out)
    }

    /// 加密 `ratio` 倍后的几何
    pub fn refine(&self, ratio: i64) -> Self {
        let r = ratio as f64;
        Self {
            domain: self.domain.refine(IntVect::splat(ratio)),
            dx: self.dx.map(|h| h / r),
            periodic: self.periodic,
        }
    }

    /// 粗化 `ratio` 倍后的几何
    pub fn coarsen(&self, ratio: i64) -> Self {
        let r = ratio as f64;
        Self {
            domain: self.domain.coarsen(IntVect::splat(ratio)),
            dx: self.dx.map(|h| h * r),
            periodic: self.periodic,
        }
    }
}

// =============================================================================
// LevelGrid
// =============================================================================

/// 单个 AMR 层级的网格描述
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGrid<const D: usize> {
    layout: BoxLayout<D>,
    dmap: DistributionMap,
    geom: Geometry<D>,
}

impl<const D: usize> LevelGrid<D> {
    /// 创建并校验
    ///
    /// 布局与分布映射项数一致，且每个盒子都落在计算域内。
    pub fn new(layout: BoxLayout<D>, dmap: DistributionMap, geom: Geometry<D>) -> AmrResult<Self> {
        if layout.len() != dmap.len() {
            return Err(AmrError::LayoutMismatch {
                boxes: layout.len(),
                owners: dmap.len(),
            });
        }
        let domain = geom.domain();
        if let Some(k) = layout.iter().position(|b| !domain.contains_box(b)) {
            return Err(AmrError::BoxOutsideDomain {
                patch: k,
                boxed: layout.boxes()[k].to_string(),
                domain: domain.to_string(),
            });
        }
        Ok(Self { layout, dmap, geom })
    }

    /// 全部面片归 0 号进程
    pub fn single_rank(layout: BoxLayout<D>, geom: Geometry<D>) -> AmrResult<Self> {
        let dmap = DistributionMap::single_rank(layout.len());
        Self::new(layout, dmap, geom)
    }

    /// 以 `coarse` 的几何加密 `ratio` 倍作为细层几何
    pub fn refined_from(coarse: &Self, fine_layout: BoxLayout<D>, ratio: i64) -> AmrResult<Self> {
        Self::single_rank(fine_layout, coarse.geom.refine(ratio))
    }

    /// 盒子布局
    #[inline]
    pub fn layout(&self) -> &BoxLayout<D> {
        &self.layout
    }

    /// 分布映射
    #[inline]
    pub fn dmap(&self) -> &DistributionMap {
        &self.dmap
    }

    /// 层级几何
    #[inline]
    pub fn geometry(&self) -> Geometry<D> {
        self.geom
    }

    /// 计算域
    #[inline]
    pub fn domain(&self) -> IndexBox<D> {
        self.geom.domain()
    }

    /// 面片数
    #[inline]
    pub fn num_patches(&self) -> usize {
        self.layout.len()
    }

    /// 布局能否被 `ratio` 精确粗化
    pub fn coarsenable(&self, ratio: i64) -> bool {
        self.layout.coarsenable(ratio)
    }
}
