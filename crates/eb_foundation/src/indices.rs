// crates/eb_foundation/src/indices.rs

//! 强类型句柄索引
//!
//! 层级数据按"补丁"（patch，即盒子布局中的一个矩形子区域）组织，
//! 进程按"秩"（rank）划分所有权。两者都是普通的 `usize` 位置，
//! 但不可混用，因此用新类型区分。
//!
//! # 示例
//!
//! ```rust
//! use eb_foundation::indices::{PatchIndex, patch};
//!
//! let p = PatchIndex::new(3);
//! assert!(p.is_valid());
//! assert_eq!(patch(3), p);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// 无效索引标记
pub const INVALID_INDEX: usize = usize::MAX;

/// 索引类型 Trait
pub trait Index: Copy + Clone + Eq + Hash + fmt::Debug {
    /// 创建新索引
    fn new(idx: usize) -> Self;

    /// 获取索引值
    fn get(self) -> usize;

    /// 检查是否有效
    fn is_valid(self) -> bool;
}

macro_rules! define_index {
    ($(#[$meta:meta])* $name:ident, $doc:literal) => {
        #[doc = $doc]
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// 无效索引常量
            pub const INVALID: Self = Self(INVALID_INDEX);

            /// 创建新索引
            #[inline]
            pub const fn new(idx: usize) -> Self {
                Self(idx)
            }

            /// 获取索引值
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }

            /// 检查是否有效
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != INVALID_INDEX
            }
        }

        impl Index for $name {
            #[inline]
            fn new(idx: usize) -> Self { Self(idx) }

            #[inline]
            fn get(self) -> usize { self.0 }

            #[inline]
            fn is_valid(self) -> bool { self.0 != INVALID_INDEX }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(idx: usize) -> Self { Self::new(idx) }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(idx: $name) -> usize { idx.get() }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(INVALID)", stringify!($name))
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "INVALID")
                }
            }
        }

        impl Default for $name {
            fn default() -> Self { Self::INVALID }
        }
    };
}

define_index!(PatchIndex, "补丁（盒子）索引，布局内的位置");
define_index!(RankIndex, "进程秩索引");

/// 创建补丁索引
#[inline]
pub const fn patch(idx: usize) -> PatchIndex {
    PatchIndex::new(idx)
}

/// 创建秩索引
#[inline]
pub const fn rank(idx: usize) -> RankIndex {
    RankIndex::new(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_index() {
        let idx = PatchIndex::new(42);
        assert!(idx.is_valid());
        assert_eq!(idx.get(), 42);
        assert!(!PatchIndex::INVALID.is_valid());
        assert_eq!(PatchIndex::default(), PatchIndex::INVALID);
    }

    #[test]
    fn test_conversions() {
        let idx: PatchIndex = 10.into();
        let val: usize = idx.into();
        assert_eq!(val, 10);
        assert_eq!(format!("{:?}", rank(2)), "RankIndex(2)");
        assert_eq!(format!("{}", PatchIndex::INVALID), "INVALID");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&patch(7)).unwrap();
        assert_eq!(json, "7");
    }
}
