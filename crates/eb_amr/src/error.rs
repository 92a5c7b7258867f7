// crates/eb_amr/src/error.rs

//! AMR 层错误类型
//!
//! 配置错误与前置条件违例都在修改任何数据之前返回，
//! 内存分配失败由 [`RuntimeError`] 透传。

use eb_runtime::RuntimeError;
use thiserror::Error;

/// AMR 层结果类型
pub type AmrResult<T> = Result<T, AmrError>;

/// AMR 层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmrError {
    /// 细层盒子布局不能被加密比整除
    #[error("细层布局不能按加密比 {ratio} 粗化: 盒子 {patch} = {boxed}")]
    NotCoarsenable {
        /// 加密比
        ratio: i64,
        /// 出错的盒子序号
        patch: usize,
        /// 盒子描述
        boxed: String,
    },

    /// 细层盒子相互重叠
    #[error("细层布局的盒子 {first} = {first_box} 与盒子 {second} = {second_box} 重叠")]
    OverlappingPatches {
        /// 前一个盒子序号
        first: usize,
        /// 前一个盒子描述
        first_box: String,
        /// 后一个盒子序号
        second: usize,
        /// 后一个盒子描述
        second_box: String,
    },

    /// 请求了尚未实现的割单元粗细界面修正
    #[error("EB 粗细界面修正 (hasEBCF = true) 尚未实现")]
    CutCellInterfaceUnsupported,

    /// 加密比非法
    #[error("加密比非法: {ratio} (必须 >= 1)")]
    InvalidRefRatio {
        /// 加密比
        ratio: i64,
    },

    /// 分量数非法
    #[error("分量数非法: {n_comp} (必须 >= 1)")]
    InvalidComponentCount {
        /// 分量数
        n_comp: usize,
    },

    /// 细层计算域与粗层计算域加密后不一致
    #[error("计算域不匹配: 细层 {fine}, 粗层加密后 {refined_coarse}")]
    DomainMismatch {
        /// 细层计算域
        fine: String,
        /// 粗层计算域加密结果
        refined_coarse: String,
    },

    /// 布局与分布映射长度不一致
    #[error("布局有 {boxes} 个盒子, 分布映射有 {owners} 项")]
    LayoutMismatch {
        /// 盒子数
        boxes: usize,
        /// 分布映射项数
        owners: usize,
    },

    /// 盒子超出计算域
    #[error("盒子 {patch} = {boxed} 超出计算域 {domain}")]
    BoxOutsideDomain {
        /// 盒子序号
        patch: usize,
        /// 盒子描述
        boxed: String,
        /// 计算域描述
        domain: String,
    },

    /// 分量窗口越界
    #[error("分量窗口越界: {what} [{start}, {start} + {n}) 超出 {available} 个分量")]
    ComponentWindow {
        /// 哪一侧的窗口 (src / dst)
        what: &'static str,
        /// 起始分量
        start: usize,
        /// 分量个数
        n: usize,
        /// 可用分量数
        available: usize,
    },

    /// 面片序号越界
    #[error("面片序号 {patch} 越界 (共 {len} 个)")]
    PatchOutOfRange {
        /// 序号
        patch: usize,
        /// 面片总数
        len: usize,
    },

    /// 通量方向不一致
    #[error("通量方向不一致: 期望 {expected}, 实际 {found}")]
    DirectionMismatch {
        /// 期望方向
        expected: usize,
        /// 实际方向
        found: usize,
    },

    /// 两个数组的盒子不一致
    #[error("盒子不一致: 期望 {expected}, 实际 {found}")]
    BoxMismatch {
        /// 期望盒子
        expected: String,
        /// 实际盒子
        found: String,
    },

    /// 运行时错误（内存分配）
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl AmrError {
    /// 检查 `[start, start + n)` 落在 `[0, available)` 内
    pub fn check_window(
        what: &'static str,
        start: usize,
        n: usize,
        available: usize,
    ) -> AmrResult<()> {
        match start.checked_add(n) {
            Some(end) if end <= available => Ok(()),
            _ => Err(Self::ComponentWindow {
                what,
                start,
                n,
                available,
            }),
        }
    }

    /// 是否为可重试的内存分配失败
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::Runtime(e) if e.is_out_of_memory())
    }
}
