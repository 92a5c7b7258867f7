// crates/eb_amr/src/lib.rs

//! EB-Reflux AMR Layer (Layer 3)
//!
//! 嵌入边界 AMR 层级之间的守恒通量修正（reflux）。
//!
//! # 模块概览
//!
//! - [`layout`]: `BoxLayout` 盒子布局、`DistributionMap` 分布映射
//! - [`geometry`]: `Geometry` 单层几何、`LevelGrid` 层级网格描述
//! - [`patch_array`]: 内存池支撑的多分量盒子数组
//! - [`face_flux`]: `EbFaceFlux` 面心通量容器
//! - [`level_data`]: `LevelFluxes` / `DirectionalFluxes` / `LevelField`
//! - [`flux_register`]: `FluxCorrector` 修正原语接口与经典 `FluxRegister`
//! - [`eb_flux_register`]: `EbFastFluxRegister` 粗细界面通量寄存器
//!
//! # 守恒修正
//!
//! 细层推进所用的界面通量与粗层推进所用的不一致时，粗层解在界面
//! 两侧单元上补上差值，使粗层看到的界面通量等于细层通量的面积平均。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod eb_flux_register;
pub mod error;
pub mod face_flux;
pub mod flux_register;
pub mod geometry;
pub mod layout;
pub mod level_data;
pub mod patch_array;

/// 层级标识
pub const LAYER: u8 = 3;

pub use eb_flux_register::{
    EbFastFluxRegister, InterfaceCorrection, PatchAccumulator, RegisterTimers,
};
pub use error::{AmrError, AmrResult};
pub use face_flux::EbFaceFlux;
pub use flux_register::{FluxCorrector, FluxRegister};
pub use geometry::{Geometry, LevelGrid};
pub use layout::{BoxLayout, DistributionMap};
pub use level_data::{DirectionalFluxes, LevelField, LevelFluxes};
pub use patch_array::PatchArray;

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::{
        AmrError, AmrResult, BoxLayout, DistributionMap, EbFaceFlux, EbFastFluxRegister,
        FluxCorrector, Geometry, LevelField, LevelFluxes, LevelGrid,
    };
}
