// crates/eb_amr/tests/reflux_conservation.rs

//! 守恒修正集成测试
//!
//! 界面上细层通量为常数 F、粗层通量为常数 G 时，界面相邻粗单元的修正量应为
//! `(F - G) * r^(D-1) * scale / vol`，低侧为负、高侧为正。

use std::sync::Arc;

use eb_amr::prelude::*;
use eb_foundation::{patch, IndexBox, IntVect};
use eb_runtime::{Arena, HostArena};

fn arena() -> Arc<dyn Arena> {
    Arc::new(HostArena::new())
}

fn levels<const D: usize>(
    coarse_boxes: Vec<IndexBox<D>>,
    geom: Geometry<D>,
    fine_boxes: Vec<IndexBox<D>>,
    r: i64,
) -> (LevelGrid<D>, LevelGrid<D>) {
    let coarse = LevelGrid::single_rank(BoxLayout::new(coarse_boxes), geom).unwrap();
    let fine = LevelGrid::refined_from(&coarse, BoxLayout::new(fine_boxes), r).unwrap();
    (fine, coarse)
}

/// 每个面片每个方向累加一次常数通量
fn load_uniform<const D: usize>(
    reg: &mut EbFastFluxRegister<D>,
    arena: &Arc<dyn Arena>,
    fine: &LevelGrid<D>,
    coarse: &LevelGrid<D>,
    f: f64,
    g: f64,
) {
    for (k, bx) in coarse.layout().iter().enumerate() {
        for dir in 0..D {
            let mut flux = EbFaceFlux::new(Arc::clone(arena), *bx, dir, 1).unwrap();
            flux.set_val(g);
            reg.increment_coarse(&flux, 1.0, patch(k), 0, 0, 1).unwrap();
        }
    }
    for (k, bx) in fine.layout().iter().enumerate() {
        for dir in 0..D {
            let mut flux = EbFaceFlux::new(Arc::clone(arena), *bx, dir, 1).unwrap();
            flux.set_val(f);
            reg.increment_fine(&flux, 1.0, patch(k), 0, 0, 1).unwrap();
        }
    }
}

fn value<const D: usize>(u: &LevelField<D>, iv: [i64; D]) -> f64 {
    u.get(IntVect::new(iv), 0).unwrap()
}

#[test]
fn test_conservation_1d() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0], [8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4], [8])],
        2,
    );
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 0.5, 0, 0, 1).unwrap();

    // (3 - 1) * 1 * 0.5 / 1
    assert_eq!(value(&u, [1]), -1.0);
    assert_eq!(value(&u, [4]), 1.0);
    for i in [0, 2, 3, 5, 6, 7] {
        assert_eq!(value(&u, [i]), 0.0, "cell {}", i);
    }
}

#[test]
fn test_conservation_2d() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0, 0], [8, 8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4, 4], [12, 12])],
        2,
    );
    let mut reg: EbFastFluxRegister<2> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 0.5, 0, 0, 1).unwrap();

    // (3 - 1) * 2 * 0.5 / 1 = 2
    for j in 2..6 {
        assert_eq!(value(&u, [1, j]), -2.0);
        assert_eq!(value(&u, [6, j]), 2.0);
        assert_eq!(value(&u, [j, 1]), -2.0);
        assert_eq!(value(&u, [j, 6]), 2.0);
    }
    assert_eq!(value(&u, [1, 1]), 0.0);
    assert_eq!(value(&u, [3, 3]), 0.0);
    assert_eq!(u.sum(0), 0.0);
}

#[test]
fn test_conservation_3d_with_cell_volume() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0, 0, 0], [4, 4, 4]);
    let geom = Geometry::new(domain, [0.5; 3], [false; 3]);
    let (fine, coarse) = levels(
        vec![domain],
        geom,
        vec![IndexBox::from_arrays([2, 2, 2], [6, 6, 6])],
        2,
    );
    let mut reg: EbFastFluxRegister<3> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    assert_eq!(reg.num_fine_faces_per_coarse(), 4);
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 0.25, 0, 0, 1).unwrap();

    // (3 - 1) * 4 * 0.25 / 0.125 = 16
    for j in 1..3 {
        for k in 1..3 {
            assert_eq!(value(&u, [0, j, k]), -16.0);
            assert_eq!(value(&u, [3, j, k]), 16.0);
            assert_eq!(value(&u, [j, 0, k]), -16.0);
            assert_eq!(value(&u, [j, k, 3]), 16.0);
        }
    }
    assert_eq!(value(&u, [1, 1, 1]), 0.0);
    assert_eq!(u.sum(0), 0.0);
}

#[test]
fn test_fine_faces_are_summed_per_coarse_face() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0, 0], [8, 8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4, 4], [12, 12])],
        2,
    );
    let mut reg: EbFastFluxRegister<2> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();

    // 细层 x 向通量随 y 变化，粗层通量为 0
    let mut fx = EbFaceFlux::new(Arc::clone(&arena), fine.layout().boxes()[0], 0, 1).unwrap();
    fx.fill_with(0, |f| f[1] as f64);
    reg.increment_fine(&fx, 1.0, patch(0), 0, 0, 1).unwrap();

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 1.0, 0, 0, 1).unwrap();

    // 粗面 (2, J) 覆盖细面 (4, 2J) 和 (4, 2J + 1)
    for j in 2..6 {
        let expected = (4 * j + 1) as f64;
        assert_eq!(value(&u, [1, j]), -expected);
        assert_eq!(value(&u, [6, j]), expected);
    }
}

#[test]
fn test_shared_coarse_face_is_not_double_counted() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0], [8]);
    let (fine, coarse) = levels(
        vec![IndexBox::from_arrays([0], [4]), IndexBox::from_arrays([4], [8])],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([8], [12])],
        2,
    );
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 0.5, 0, 0, 1).unwrap();

    // 粗面 4 同属两个粗面片，仍只计一次 G
    assert_eq!(value(&u, [3]), -1.0);
    assert_eq!(value(&u, [6]), 1.0);
}

#[test]
fn test_periodic_wrap() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0], [8]);
    let fine_box = IndexBox::from_arrays([0], [4]);

    let periodic = Geometry::new(domain, [1.0], [true]);
    let (fine, coarse) = levels(vec![domain], periodic, vec![fine_box], 2);
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);
    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 1.0, 0, 0, 1).unwrap();

    assert_eq!(value(&u, [7]), -2.0);
    assert_eq!(value(&u, [2]), 2.0);
    assert_eq!(u.sum(0), 0.0);

    // 非周期时域外一侧没有修正
    let (fine, coarse) = levels(vec![domain], Geometry::unit(domain), vec![fine_box], 2);
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);
    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 1.0, 0, 0, 1).unwrap();

    assert_eq!(value(&u, [7]), 0.0);
    assert_eq!(value(&u, [2]), 2.0);
}

#[test]
fn test_abutting_fine_patches_are_cleared() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0], [8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4], [8]), IndexBox::from_arrays([8], [12])],
        2,
    );
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u, 0.5, 0, 0, 1).unwrap();

    assert_eq!(value(&u, [1]), -1.0);
    assert_eq!(value(&u, [6]), 1.0);
    for i in 2..6 {
        assert_eq!(value(&u, [i]), 0.0, "covered cell {}", i);
    }
}

#[test]
fn test_reflux_leaves_registers_unchanged() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0, 0], [8, 8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4, 4], [12, 12])],
        2,
    );
    let mut reg: EbFastFluxRegister<2> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 1, true, Arc::clone(&arena)).unwrap();
    load_uniform(&mut reg, &arena, &fine, &coarse, 3.0, 1.0);

    let mut u1 = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u1, 0.5, 0, 0, 1).unwrap();
    assert!(reg.coarse_register().all_equal(1.0));
    assert!(reg.fine_register().all_equal(3.0));

    // 修正原语每次重新装入，同样的寄存器得到同样的修正
    let mut u2 = LevelField::new(Arc::clone(&arena), coarse.layout(), 1).unwrap();
    reg.reflux(&mut u2, 0.5, 0, 0, 1).unwrap();
    assert!(u1.bitwise_eq(&u2));
    assert_eq!(reg.timers().reflux.count(), 2);
}

/// 寄存器分量 `src + c` 修正解分量 `dst + c`，其余分量不动
#[test]
fn test_component_offset_window() {
    let arena = arena();
    let domain = IndexBox::from_arrays([0], [8]);
    let (fine, coarse) = levels(
        vec![domain],
        Geometry::unit(domain),
        vec![IndexBox::from_arrays([4], [8])],
        2,
    );
    let mut reg: EbFastFluxRegister<1> =
        EbFastFluxRegister::new(&fine, &coarse, 2, 3, true, Arc::clone(&arena)).unwrap();

    let mut g = EbFaceFlux::new(Arc::clone(&arena), domain, 0, 1).unwrap();
    g.set_val(1.0);
    reg.increment_coarse(&g, 1.0, patch(0), 0, 0, 1).unwrap();
    let mut f = EbFaceFlux::new(Arc::clone(&arena), fine.layout().boxes()[0], 0, 1).unwrap();
    f.set_val(3.0);
    reg.increment_fine(&f, 1.0, patch(0), 0, 0, 1).unwrap();

    let mut u = LevelField::new(Arc::clone(&arena), coarse.layout(), 3).unwrap();
    u.set_val(10.0);
    reg.reflux(&mut u, 0.5, 0, 2, 1).unwrap();

    let at = |i: i64, c: usize| u.get(IntVect::new([i]), c).unwrap();
    assert_eq!(at(1, 2), 9.0);
    assert_eq!(at(4, 2), 11.0);
    for c in 0..2 {
        assert_eq!(at(1, c), 10.0);
        assert_eq!(at(4, c), 10.0);
    }
}
