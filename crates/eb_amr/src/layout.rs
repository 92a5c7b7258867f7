// crates/eb_amr/src/layout.rs

//! 层级盒子布局与分布映射
//!
//! `BoxLayout` 是一个层级上互不相交的单元盒子列表，`DistributionMap`
//! 记录每个盒子（面片）的所属进程。本构建运行在单一地址空间，
//! 分布映射只作为元数据，集合操作直接作用于全部面片。

use eb_foundation::{IndexBox, IntVect, PatchIndex, RankIndex};

// =============================================================================
// BoxLayout
// =============================================================================

/// 层级盒子布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxLayout<const D: usize> {
    boxes: Vec<IndexBox<D>>,
}

impl<const D: usize> BoxLayout<D> {
    /// 由盒子列表创建
    pub fn new(boxes: Vec<IndexBox<D>>) -> Self {
        Self { boxes }
    }

    /// 单个盒子的布局
    pub fn single(bx: IndexBox<D>) -> Self {
        Self { boxes: vec![bx] }
    }

    /// 盒子个数
    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// 第 `patch` 个盒子
    #[inline]
    pub fn get(&self, patch: PatchIndex) -> Option<&IndexBox<D>> {
        self.boxes.get(patch.get())
    }

    /// 全部盒子
    #[inline]
    pub fn boxes(&self) -> &[IndexBox<D>] {
        &self.boxes
    }

    /// 遍历盒子
    pub fn iter(&self) -> std::slice::Iter<'_, IndexBox<D>> {
        self.boxes.iter()
    }

    /// 总单元数
    pub fn num_pts(&self) -> usize {
        self.boxes.iter().map(IndexBox::num_pts).sum()
    }

    /// 第一个不能被 `ratio` 精确粗化的盒子
    pub fn first_not_coarsenable(&self, ratio: i64) -> Option<usize> {
        let r = IntVect::splat(ratio);
        self.boxes.iter().position(|b| !b.is_coarsenable(r))
    }

    /// 每个盒子的上下界是否都是 `ratio` 的整数倍
    pub fn coarsenable(&self, ratio: i64) -> bool {
        ratio >= 1 && self.first_not_coarsenable(ratio).is_none()
    }

    /// 逐盒子粗化
    pub fn coarsen(&self, ratio: i64) -> Self {
        let r = IntVect::splat(ratio);
        Self::new(self.boxes.iter().map(|b| b.coarsen(r)).collect())
    }

    /// 逐盒子加密
    pub fn refine(&self, ratio: i64) -> Self {
        let r = IntVect::splat(ratio);
        Self::new(self.boxes.iter().map(|b| b.refine(r)).collect())
    }

    /// 第一对相交的盒子序号 `(i, j)`，`i < j`
    pub fn first_overlap(&self) -> Option<(usize, usize)> {
        self.boxes.iter().enumerate().find_map(|(i, a)| {
            self.boxes[i + 1..]
                .iter()
                .position(|b| a.intersects(b))
                .map(|off| (i, i + 1 + off))
        })
    }

    /// 盒子两两不相交
    pub fn is_disjoint(&self) -> bool {
        self.first_overlap().is_none()
    }

    /// 包含 `iv` 的盒子序号
    pub fn find(&self, iv: IntVect<D>) -> Option<PatchIndex> {
        self.boxes
            .iter()
            .position(|b| b.contains(iv))
            .map(PatchIndex::new)
    }
}

impl<'a, const D: usize> IntoIterator for &'a BoxLayout<D> {
    type Item = &'a IndexBox<D>;
    type IntoIter = std::slice::Iter<'a, IndexBox<D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

// =============================================================================
// DistributionMap
// =============================================================================

/// 面片到进程的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionMap {
    owners: Vec<RankIndex>,
}

impl DistributionMap {
    /// 由显式所属列表创建
    pub fn from_owners(owners: Vec<RankIndex>) -> Self {
        Self { owners }
    }

    /// 全部面片归 0 号进程
    pub fn single_rank(n: usize) -> Self {
        Self {
            owners: vec![RankIndex::new(0); n],
        }
    }

    /// 轮转分配到 `ranks` 个进程
    pub fn round_robin(n: usize, ranks: usize) -> Self {
        let ranks = ranks.max(1);
        Self {
            owners: (0..n).map(|i| RankIndex::new(i % ranks)).collect(),
        }
    }

    /// 项数
    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// 面片的所属进程
    #[inline]
    pub fn owner(&self, patch: PatchIndex) -> Option<RankIndex> {
        self.owners.get(patch.get()).copied()
    }

    /// 某进程拥有的面片
    pub fn local_patches(&self, rank: RankIndex) -> impl Iterator<Item = PatchIndex> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |(_, r)| **r == rank)
            .map(|(i, _)| PatchIndex::new(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eb_foundation::{patch, rank};

    fn bx(lo: [i64; 2], hi: [i64; 2]) -> IndexBox<2> {
        IndexBox::from_arrays(lo, hi)
    }

    #[test]
    fn test_coarsenable() {
        let layout = BoxLayout::new(vec![bx([0, 0], [4, 4]), bx([4, 0], [8, 4])]);
        assert!(layout.coarsenable(2));
        assert!(layout.coarsenable(4));
        assert!(!layout.coarsenable(3));
        assert!(!layout.coarsenable(0));
        assert_eq!(layout.first_not_coarsenable(3), Some(0));

        let coarse = layout.coarsen(2);
        assert_eq!(coarse.boxes(), &[bx([0, 0], [2, 2]), bx([2, 0], [4, 2])]);
        assert_eq!(coarse.refine(2), layout);
    }

    #[test]
    fn test_disjoint_and_find() {
        let layout = BoxLayout::new(vec![bx([0, 0], [4, 4]), bx([4, 0], [8, 4])]);
        assert!(layout.is_disjoint());
        assert_eq!(layout.find(IntVect::new([5, 1])), Some(patch(1)));
        assert_eq!(layout.find(IntVect::new([9, 1])), None);
        assert_eq!(layout.num_pts(), 32);

        let overlapping = BoxLayout::new(vec![bx([0, 0], [4, 4]), bx([3, 0], [8, 4])]);
        assert!(!overlapping.is_disjoint());
        assert_eq!(overlapping.first_overlap(), Some((0, 1)));

        let third = BoxLayout::new(vec![
            bx([0, 0], [2, 2]),
            bx([4, 0], [6, 2]),
            bx([5, 1], [8, 4]),
        ]);
        assert_eq!(third.first_overlap(), Some((1, 2)));
    }

    #[test]
    fn test_distribution() {
        let dm = DistributionMap::round_robin(5, 2);
        assert_eq!(dm.len(), 5);
        assert_eq!(dm.owner(patch(3)), Some(rank(1)));
        assert_eq!(dm.owner(patch(9)), None);
        let mine: Vec<_> = dm.local_patches(rank(0)).collect();
        assert_eq!(mine, vec![patch(0), patch(2), patch(4)]);

        assert_eq!(DistributionMap::single_rank(3).owner(patch(2)), Some(rank(0)));
    }
}
