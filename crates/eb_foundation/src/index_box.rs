// crates/eb_foundation/src/index_box.rs

//! 索引盒子 `IndexBox<D>`
//!
//! 半开区间 `[lo, hi)` 表示的矩形索引区域。同一类型既用于单元盒子，
//! 也用于面盒子：`d` 方向的面索引 `i` 表示单元 `i` 的低侧面，
//! 所以单元盒子 `[lo, hi)` 在 `d` 方向上的全部面为 `[lo[d], hi[d] + 1)`。
//!
//! ```text
//!   face:  lo        lo+1              hi
//!          |  cell lo |  ...  | cell hi-1 |
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::intvect::IntVect;

/// 面的朝向：低侧或高侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// 低侧（坐标减小方向）
    Low,
    /// 高侧（坐标增大方向）
    High,
}

impl Side {
    /// 两侧，按 Low, High 顺序
    pub const BOTH: [Side; 2] = [Side::Low, Side::High];

    /// 数组下标 (Low = 0, High = 1)
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Low => 0,
            Side::High => 1,
        }
    }

    /// 对侧
    #[inline]
    pub const fn flip(self) -> Self {
        match self {
            Side::Low => Side::High,
            Side::High => Side::Low,
        }
    }

    /// 外法向符号
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Side::Low => -1.0,
            Side::High => 1.0,
        }
    }
}

/// D 维半开索引盒子 `[lo, hi)`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBox<const D: usize> {
    lo: IntVect<D>,
    hi: IntVect<D>,
}

impl<const D: usize> IndexBox<D> {
    /// 由下界（含）和上界（不含）创建
    #[inline]
    pub const fn new(lo: IntVect<D>, hi: IntVect<D>) -> Self {
        Self { lo, hi }
    }

    /// 由数组创建
    #[inline]
    pub const fn from_arrays(lo: [i64; D], hi: [i64; D]) -> Self {
        Self::new(IntVect::new(lo), IntVect::new(hi))
    }

    /// 下界（含）
    #[inline]
    pub const fn lo(&self) -> IntVect<D> {
        self.lo
    }

    /// 上界（不含）
    #[inline]
    pub const fn hi(&self) -> IntVect<D> {
        self.hi
    }

    /// 每个方向的长度
    #[inline]
    pub fn size(&self) -> IntVect<D> {
        (self.hi - self.lo).map(|n| n.max(0))
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        (0..D).any(|d| self.hi[d] <= self.lo[d])
    }

    /// 点数
    #[inline]
    pub fn num_pts(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.size().product() as usize
        }
    }

    /// 是否包含某点
    #[inline]
    pub fn contains(&self, iv: IntVect<D>) -> bool {
        self.lo.all_le(iv) && iv.all_lt(self.hi)
    }

    /// 是否完整包含另一个盒子（空盒子总被包含）
    #[inline]
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (self.lo.all_le(other.lo) && other.hi.all_le(self.hi))
    }

    /// 交集，空则返回 `None`
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let lo = self.lo.zip_with(other.lo, i64::max);
        let hi = self.hi.zip_with(other.hi, i64::min);
        let isect = Self::new(lo, hi);
        if isect.is_empty() {
            None
        } else {
            Some(isect)
        }
    }

    /// 两盒子是否相交
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// 平移
    #[inline]
    pub fn shift(&self, offset: IntVect<D>) -> Self {
        Self::new(self.lo + offset, self.hi + offset)
    }

    /// 沿单一方向平移
    #[inline]
    pub fn shift_dir(&self, dir: usize, n: i64) -> Self {
        self.shift(IntVect::basis(dir) * n)
    }

    /// 粗化：覆盖原盒子全部单元的最小粗盒子
    pub fn coarsen(&self, ratio: IntVect<D>) -> Self {
        let lo = self.lo.coarsen(ratio);
        let hi = (self.hi - IntVect::unit()).coarsen(ratio) + IntVect::unit();
        Self::new(lo, hi)
    }

    /// 加密
    #[inline]
    pub fn refine(&self, ratio: IntVect<D>) -> Self {
        Self::new(self.lo.refine(ratio), self.hi.refine(ratio))
    }

    /// 能否被 `ratio` 精确粗化（上下界都是整数倍）
    #[inline]
    pub fn is_coarsenable(&self, ratio: IntVect<D>) -> bool {
        self.lo.is_multiple_of(ratio) && self.hi.is_multiple_of(ratio)
    }

    /// `dir` 方向上包围本单元盒子的全部面
    #[inline]
    pub fn surrounding_faces(&self, dir: usize) -> Self {
        let mut hi = self.hi;
        hi[dir] += 1;
        Self::new(self.lo, hi)
    }

    /// `dir` 方向 `side` 侧边界上的一层面
    pub fn boundary_faces(&self, dir: usize, side: Side) -> Self {
        let face = match side {
            Side::Low => self.lo[dir],
            Side::High => self.hi[dir],
        };
        Self::new(self.lo.with(dir, face), self.hi.with(dir, face + 1))
    }

    /// 紧邻 `dir` 方向 `side` 侧边界的外部一层单元
    pub fn adjacent_cells(&self, dir: usize, side: Side) -> Self {
        match side {
            Side::Low => Self::new(
                self.lo.with(dir, self.lo[dir] - 1),
                self.hi.with(dir, self.lo[dir]),
            ),
            Side::High => Self::new(
                self.lo.with(dir, self.hi[dir]),
                self.hi.with(dir, self.hi[dir] + 1),
            ),
        }
    }

    /// 按 Fortran 顺序（第 0 维最快）的线性偏移
    #[inline]
    pub fn linear_index(&self, iv: IntVect<D>) -> usize {
        debug_assert!(self.contains(iv), "{} 不在盒子 {} 内", iv, self);
        let mut offset = 0i64;
        let mut stride = 1i64;
        for d in 0..D {
            offset += (iv[d] - self.lo[d]) * stride;
            stride *= self.hi[d] - self.lo[d];
        }
        offset as usize
    }

    /// 按 Fortran 顺序遍历所有点
    pub fn iter(&self) -> BoxIter<D> {
        BoxIter {
            region: *self,
            next: if self.is_empty() { None } else { Some(self.lo) },
        }
    }
}

impl<const D: usize> fmt::Debug for IndexBox<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<const D: usize> fmt::Display for IndexBox<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

impl<'a, const D: usize> IntoIterator for &'a IndexBox<D> {
    type Item = IntVect<D>;
    type IntoIter = BoxIter<D>;

    fn into_iter(self) -> BoxIter<D> {
        self.iter()
    }
}

/// 盒子点迭代器
#[derive(Debug, Clone)]
pub struct BoxIter<const D: usize> {
    region: IndexBox<D>,
    next: Option<IntVect<D>>,
}

impl<const D: usize> Iterator for BoxIter<D> {
    type Item = IntVect<D>;

    fn next(&mut self) -> Option<IntVect<D>> {
        let current = self.next?;
        let mut iv = current;
        let mut advanced = false;
        for d in 0..D {
            iv[d] += 1;
            if iv[d] < self.region.hi()[d] {
                advanced = true;
                break;
            }
            iv[d] = self.region.lo()[d];
        }
        self.next = if advanced { Some(iv) } else { None };
        Some(current)
    }
}
