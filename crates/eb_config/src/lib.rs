// crates/eb_config/src/lib.rs

//! EB-Reflux Config Layer (Layer 4)
//!
//! 内存池与通量寄存器的可序列化配置，以及据此构建对象的工厂方法。
//!
//! # 模块概览
//!
//! - [`reflux_config`]: `RefluxConfig` / `ArenaConfig` / `RegisterConfig`
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: eb_config     ─> RefluxConfig, ArenaConfig (本层)
//! Layer 3: eb_amr        ─> LevelGrid, FluxRegister, EbFastFluxRegister
//! Layer 2: eb_runtime    ─> Arena, PArena, ArenaBuffer
//! Layer 1: eb_foundation ─> IntVect, IndexBox, PatchIndex
//! ```
//!
//! # 示例
//!
//! ```
//! use eb_config::RefluxConfig;
//!
//! let config = RefluxConfig::from_json(r#"{ "arena": { "use_pool": false } }"#).unwrap();
//! let arena = config.build_arena().unwrap();
//! assert!(!arena.is_pooled());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod reflux_config;

/// 层级标识
pub const LAYER: u8 = 4;

pub use error::ConfigError;
pub use reflux_config::{ArenaConfig, RefluxConfig, RegisterConfig};
