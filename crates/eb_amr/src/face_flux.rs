// crates/eb_amr/src/face_flux.rs

//! 面心通量容器 `EbFaceFlux`
//!
//! 一个面片在一个方向上的面通量。面盒子是单元盒子在该方向上的全部面
//! （`hi[dir] + 1`）。方向是通量对象自身的属性，寄存器按它选择写入哪一层。
//!
//! 割单元的面积分数与面心位置由外部几何负责；这里只保存规则面上的值，
//! 在没有粗细界面割单元修正时这就是寄存器所需的全部数据。

use std::sync::Arc;

use eb_foundation::{IndexBox, IntVect};
use eb_runtime::Arena;

use crate::error::{AmrError, AmrResult};
use crate::patch_array::PatchArray;

/// 单方向面通量
#[derive(Debug)]
pub struct EbFaceFlux<const D: usize> {
    dir: usize,
    cell_box: IndexBox<D>,
    data: PatchArray<D>,
}

impl<const D: usize> EbFaceFlux<D> {
    /// 在 `cell_box` 的 `dir` 方向面上分配零值通量
    pub fn new(
        arena: Arc<dyn Arena>,
        cell_box: IndexBox<D>,
        dir: usize,
        n_comp: usize,
    ) -> AmrResult<Self> {
        if dir >= D {
            return Err(AmrError::DirectionMismatch {
                expected: D - 1,
                found: dir,
            });
        }
        let data = PatchArray::new(arena, cell_box.surrounding_faces(dir), n_comp)?;
        Ok(Self {
            dir,
            cell_box,
            data,
        })
    }

    /// 通量方向
    #[inline]
    pub fn direction(&self) -> usize {
        self.dir
    }

    /// 所属单元盒子
    #[inline]
    pub fn cell_box(&self) -> IndexBox<D> {
        self.cell_box
    }

    /// 面盒子
    #[inline]
    pub fn face_box(&self) -> IndexBox<D> {
        self.data.bx()
    }

    /// 分量数
    #[inline]
    pub fn n_comp(&self) -> usize {
        self.data.n_comp()
    }

    /// 读取面 `face` 上的分量
    #[inline]
    pub fn get(&self, face: IntVect<D>, comp: usize) -> f64 {
        self.data.get(face, comp)
    }

    /// 写入面 `face` 上的分量
    #[inline]
    pub fn set(&mut self, face: IntVect<D>, comp: usize, value: f64) {
        self.data.set(face, comp, value);
    }

    /// 全部面置为 `value`
    pub fn set_val(&mut self, value: f64) {
        self.data.set_val(value);
    }

    /// 按面索引填充某一分量
    pub fn fill_with(&mut self, comp: usize, f: impl Fn(IntVect<D>) -> f64) {
        self.data.fill_with(comp, f);
    }

    /// 底层数组
    #[inline]
    pub fn data(&self) -> &PatchArray<D> {
        &self.data
    }

    /// 底层数组（可变）
    #[inline]
    pub fn data_mut(&mut self) -> &mut PatchArray<D> {
        &mut self.data
    }

    /// 累加另一个同方向通量
    ///
    /// `self[dst + c] += scale * other[src + c]`，`c` 取 `0..n`，作用于两者面盒子的交集。
    /// 方向与窗口在写入前校验。
    pub fn plus(
        &mut self,
        other: &EbFaceFlux<D>,
        src: usize,
        dst: usize,
        n: usize,
        scale: f64,
    ) -> AmrResult<()> {
        if other.dir != self.dir {
            return Err(AmrError::DirectionMismatch {
                expected: self.dir,
                found: other.dir,
            });
        }
        AmrError::check_window("src", src, n, other.n_comp())?;
        AmrError::check_window("dst", dst, n, self.n_comp())?;

        let region = self.face_box();
        self.data.plus_from(&other.data, &region, src, dst, n, scale);
        Ok(())
    }

    /// 在同一内存池中复制一份
    pub fn try_clone(&self) -> AmrResult<Self> {
        Ok(Self {
            dir: self.dir,
            cell_box: self.cell_box,
            data: self.data.try_clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eb_runtime::HostArena;

    fn arena() -> Arc<dyn Arena> {
        Arc::new(HostArena::new())
    }

    #[test]
    fn test_face_box_extends_in_direction() {
        let cells = IndexBox::from_arrays([0, 0], [4, 2]);
        let fx = EbFaceFlux::new(arena(), cells, 0, 1).unwrap();
        let fy = EbFaceFlux::new(arena(), cells, 1, 1).unwrap();
        assert_eq!(fx.face_box(), IndexBox::from_arrays([0, 0], [5, 2]));
        assert_eq!(fy.face_box(), IndexBox::from_arrays([0, 0], [4, 3]));
        assert_eq!(fy.direction(), 1);
        assert!(EbFaceFlux::new(arena(), cells, 2, 1).is_err());
    }

    #[test]
    fn test_plus_scales_and_windows() {
        let cells = IndexBox::from_arrays([0, 0], [2, 2]);
        let mut acc = EbFaceFlux::new(arena(), cells, 0, 3).unwrap();
        let mut f = EbFaceFlux::new(arena(), cells, 0, 2).unwrap();
        f.set_val(1.0);
        f.fill_with(1, |iv| iv[0] as f64);

        acc.plus(&f, 1, 2, 1, 0.5).unwrap();
        assert_eq!(acc.get(IntVect::new([2, 1]), 2), 1.0);
        assert_eq!(acc.get(IntVect::new([2, 1]), 0), 0.0);

        assert!(matches!(
            acc.plus(&f, 1, 2, 2, 1.0),
            Err(AmrError::ComponentWindow { what: "src", .. })
        ));
        assert_eq!(acc.get(IntVect::new([2, 1]), 2), 1.0);
    }

    #[test]
    fn test_plus_rejects_other_direction() {
        let cells = IndexBox::from_arrays([0, 0], [2, 2]);
        let mut fx = EbFaceFlux::new(arena(), cells, 0, 1).unwrap();
        let fy = EbFaceFlux::new(arena(), cells, 1, 1).unwrap();
        assert_eq!(
            fx.plus(&fy, 0, 0, 1, 1.0),
            Err(AmrError::DirectionMismatch {
                expected: 0,
                found: 1
            })
        );
    }
}
