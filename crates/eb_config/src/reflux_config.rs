// crates/eb_config/src/reflux_config.rs

//! RefluxConfig - 内存池与通量寄存器配置
//!
//! JSON 格式，所有字段都有默认值，缺省的键按默认值补齐：
//!
//! ```json
//! {
//!   "arena": { "release_threshold": 268435456, "use_pool": true, "memory_limit": null },
//!   "register": { "ref_ratio": 2, "n_comp": 1, "force_no_ebcf": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use eb_amr::{EbFastFluxRegister, LevelGrid};
use eb_runtime::{Arena, PArena, PlatformCaps};

use crate::error::ConfigError;

/// 顶层配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RefluxConfig {
    /// 内存池配置
    #[serde(default)]
    pub arena: ArenaConfig,

    /// 寄存器配置
    #[serde(default)]
    pub register: RegisterConfig,
}

// =============================================================================
// ArenaConfig
// =============================================================================

/// 内存池配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// 池中保留的已释放字节数上限
    #[serde(default = "default_release_threshold")]
    pub release_threshold: i64,

    /// 是否使用池化实现（false 强制使用通用分配器）
    #[serde(default = "default_use_pool")]
    pub use_pool: bool,

    /// 物理字节上限（模拟容量有限的设备堆）
    #[serde(default)]
    pub memory_limit: Option<u64>,
}

fn default_release_threshold() -> i64 { 256 * 1024 * 1024 }
fn default_use_pool() -> bool { true }

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            release_threshold: default_release_threshold(),
            use_pool: default_use_pool(),
            memory_limit: None,
        }
    }
}

impl ArenaConfig {
    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.release_threshold < 0 {
            return Err(ConfigError::invalid(
                "arena.release_threshold",
                self.release_threshold,
                "释放阈值不能为负",
            ));
        }
        if let Some(limit) = self.memory_limit {
            if limit == 0 {
                return Err(ConfigError::invalid("arena.memory_limit", limit, "上限必须为正"));
            }
            if usize::try_from(limit).is_err() {
                return Err(ConfigError::invalid(
                    "arena.memory_limit",
                    limit,
                    "超出本平台地址空间",
                ));
            }
        }
        Ok(())
    }

    /// 平台能力：`use_pool = false` 时按无池平台处理
    pub fn platform_caps(&self) -> PlatformCaps {
        if self.use_pool {
            PlatformCaps::detect()
        } else {
            PlatformCaps::without_pool()
        }
    }

    /// 构建内存池
    pub fn build(&self) -> Result<Arc<PArena>, ConfigError> {
        self.validate()?;
        let limit = self.memory_limit.and_then(|l| usize::try_from(l).ok());
        let arena = PArena::configure(self.release_threshold, self.platform_caps(), limit)?;
        Ok(Arc::new(arena))
    }
}

// =============================================================================
// RegisterConfig
// =============================================================================

/// 通量寄存器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// 加密比
    #[serde(default = "default_ref_ratio")]
    pub ref_ratio: i64,

    /// 分量数
    #[serde(default = "default_n_comp")]
    pub n_comp: usize,

    /// 禁用割单元粗细界面修正（必须为 true）
    #[serde(default = "default_force_no_ebcf")]
    pub force_no_ebcf: bool,
}

fn default_ref_ratio() -> i64 { 2 }
fn default_n_comp() -> usize { 1 }
fn default_force_no_ebcf() -> bool { true }

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            ref_ratio: default_ref_ratio(),
            n_comp: default_n_comp(),
            force_no_ebcf: default_force_no_ebcf(),
        }
    }
}

impl RegisterConfig {
    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ref_ratio < 1 {
            return Err(ConfigError::invalid(
                "register.ref_ratio",
                self.ref_ratio,
                "加密比必须 >= 1",
            ));
        }
        if self.n_comp == 0 {
            return Err(ConfigError::invalid(
                "register.n_comp",
                self.n_comp,
                "分量数必须 >= 1",
            ));
        }
        if !self.force_no_ebcf {
            return Err(ConfigError::invalid(
                "register.force_no_ebcf",
                self.force_no_ebcf,
                "割单元粗细界面修正尚未实现",
            ));
        }
        Ok(())
    }

    /// 按配置定义寄存器
    ///
    /// # 参数
    /// - `fine`, `coarse`: 细层、粗层网格
    /// - `arena`: 寄存器存储所用内存池
    pub fn build_register<const D: usize>(
        &self,
        fine: &LevelGrid<D>,
        coarse: &LevelGrid<D>,
        arena: Arc<dyn Arena>,
    ) -> Result<EbFastFluxRegister<D>, ConfigError> {
        self.validate()?;
        let reg = EbFastFluxRegister::new(
            fine,
            coarse,
            self.ref_ratio,
            self.n_comp,
            self.force_no_ebcf,
            arena,
        )?;
        Ok(reg)
    }
}

// =============================================================================
// 文件读写
// =============================================================================

impl RefluxConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        let config = Self::from_json(&content)?;
        log::debug!("加载配置: {}", path.as_ref().display());
        Ok(config)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: RefluxConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate()?;
        self.register.validate()?;
        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 构建内存池
    pub fn build_arena(&self) -> Result<Arc<PArena>, ConfigError> {
        self.arena.build()
    }
}
