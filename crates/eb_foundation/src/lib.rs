// crates/eb_foundation/src/lib.rs

//! EB-Reflux Foundation Layer (Layer 1)
//!
//! 块结构 AMR 层级所需的整数索引空间。
//!
//! # 模块概览
//!
//! - [`intvect`]: `IntVect<D>` 整数向量
//! - [`index_box`]: `IndexBox<D>` 半开索引盒子，`Side` 面朝向
//! - [`indices`]: 补丁/秩强类型索引
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: eb_config     ─> RefluxConfig, ArenaConfig
//! Layer 3: eb_amr        ─> LevelGrid, FluxRegister, EbFastFluxRegister
//! Layer 2: eb_runtime    ─> Arena, PArena, ArenaBuffer
//! Layer 1: eb_foundation ─> IntVect, IndexBox, PatchIndex (本层)
//! ```
//!
//! # 示例
//!
//! ```
//! use eb_foundation::{IndexBox, IntVect};
//!
//! let fine = IndexBox::from_arrays([8, 4], [16, 12]);
//! assert!(fine.is_coarsenable(IntVect::splat(4)));
//! assert_eq!(fine.coarsen(IntVect::splat(4)), IndexBox::from_arrays([2, 1], [4, 3]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index_box;
pub mod indices;
pub mod intvect;

/// 层级标识
pub const LAYER: u8 = 1;

pub use index_box::{BoxIter, IndexBox, Side};
pub use indices::{patch, rank, PatchIndex, RankIndex, INVALID_INDEX};
pub use intvect::IntVect;

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::{IndexBox, IntVect, PatchIndex, RankIndex, Side};
}
