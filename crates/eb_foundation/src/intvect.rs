// crates/eb_foundation/src/intvect.rs

//! 整数向量 `IntVect<D>`
//!
//! `D` 为空间维数（编译期常量）。所有索引空间的运算（粗化、加密、平移）
//! 都按分量进行。

use std::array;
use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

/// D 维整数向量
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVect<const D: usize>(pub [i64; D]);

impl<const D: usize> IntVect<D> {
    /// 从数组创建
    #[inline]
    pub const fn new(v: [i64; D]) -> Self {
        Self(v)
    }

    /// 所有分量相同
    #[inline]
    pub const fn splat(v: i64) -> Self {
        Self([v; D])
    }

    /// 零向量
    #[inline]
    pub const fn zero() -> Self {
        Self::splat(0)
    }

    /// 单位向量 (1, 1, ..., 1)
    #[inline]
    pub const fn unit() -> Self {
        Self::splat(1)
    }

    /// `dir` 方向的基向量
    #[inline]
    pub fn basis(dir: usize) -> Self {
        assert!(dir < D, "方向 {} 超出维数 {}", dir, D);
        Self(array::from_fn(|d| if d == dir { 1 } else { 0 }))
    }

    /// 底层数组
    #[inline]
    pub const fn as_array(&self) -> &[i64; D] {
        &self.0
    }

    /// 按分量映射
    #[inline]
    pub fn map(self, f: impl Fn(i64) -> i64) -> Self {
        Self(array::from_fn(|d| f(self.0[d])))
    }

    /// 按分量组合
    #[inline]
    pub fn zip_with(self, other: Self, f: impl Fn(i64, i64) -> i64) -> Self {
        Self(array::from_fn(|d| f(self.0[d], other.0[d])))
    }

    /// 向下取整粗化（负索引同样向 -∞ 取整）
    #[inline]
    pub fn coarsen(self, ratio: Self) -> Self {
        self.zip_with(ratio, i64::div_euclid)
    }

    /// 加密
    #[inline]
    pub fn refine(self, ratio: Self) -> Self {
        self.zip_with(ratio, |a, r| a * r)
    }

    /// 每个分量是否为 `ratio` 对应分量的整数倍
    #[inline]
    pub fn is_multiple_of(self, ratio: Self) -> bool {
        (0..D).all(|d| ratio.0[d] != 0 && self.0[d].rem_euclid(ratio.0[d]) == 0)
    }

    /// 分量乘积
    #[inline]
    pub fn product(self) -> i64 {
        self.0.iter().product()
    }

    /// 最小分量
    #[inline]
    pub fn min_component(self) -> i64 {
        self.0.iter().copied().min().unwrap_or(0)
    }

    /// 逐分量小于等于
    #[inline]
    pub fn all_le(self, other: Self) -> bool {
        (0..D).all(|d| self.0[d] <= other.0[d])
    }

    /// 逐分量严格小于
    #[inline]
    pub fn all_lt(self, other: Self) -> bool {
        (0..D).all(|d| self.0[d] < other.0[d])
    }

    /// 替换单个分量
    #[inline]
    pub fn with(mut self, dir: usize, value: i64) -> Self {
        self.0[dir] = value;
        self
    }
}

impl<const D: usize> Default for IntVect<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> From<[i64; D]> for IntVect<D> {
    fn from(v: [i64; D]) -> Self {
        Self(v)
    }
}

impl<const D: usize> Index<usize> for IntVect<D> {
    type Output = i64;

    #[inline]
    fn index(&self, dir: usize) -> &i64 {
        &self.0[dir]
    }
}

impl<const D: usize> IndexMut<usize> for IntVect<D> {
    #[inline]
    fn index_mut(&mut self, dir: usize) -> &mut i64 {
        &mut self.0[dir]
    }
}

impl<const D: usize> Add for IntVect<D> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl<const D: usize> Sub for IntVect<D> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl<const D: usize> Mul<i64> for IntVect<D> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: i64) -> Self {
        self.map(|a| a * rhs)
    }
}

impl<const D: usize> Neg for IntVect<D> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl<const D: usize> fmt::Debug for IntVect<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<const D: usize> fmt::Display for IntVect<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (d, v) in self.0.iter().enumerate() {
            if d > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}
