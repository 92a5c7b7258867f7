// crates/eb_runtime/src/metrics.rs

//! 运行时性能指标
//!
//! 无锁原子计数器、带峰值的计量器和累积计时器。内存池的字节统计和
//! 通量寄存器各操作的耗时都记录在这里的类型中。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 原子计数器
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// 创建零值计数器
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// 增加计数
    #[inline]
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// 增加指定值
    #[inline]
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// 获取当前值
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// 重置为零
    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// 计量器
// =============================================================================

/// 可增可减的计量器，记录历史峰值
///
/// 用于"当前占用字节数"这类会回落的量。
#[derive(Debug)]
pub struct Gauge {
    value: AtomicU64,
    peak: AtomicU64,
}

impl Gauge {
    /// 创建零值计量器
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        }
    }

    /// 增加并更新峰值
    #[inline]
    pub fn add(&self, n: u64) {
        let now = self.value.fetch_add(n, Ordering::Relaxed) + n;
        self.peak.fetch_max(now, Ordering::Relaxed);
    }

    /// 减少（饱和到 0）
    #[inline]
    pub fn sub(&self, n: u64) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(n))
            });
    }

    /// 当前值
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// 历史峰值
    #[inline]
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// 计时器
// =============================================================================

/// 累积计时器
///
/// # 示例
///
/// ```rust
/// use eb_runtime::metrics::Timer;
///
/// let timer = Timer::new();
/// {
///     let _guard = timer.start();
///     // ... 被测量的代码 ...
/// }
/// assert_eq!(timer.count(), 1);
/// ```
#[derive(Debug)]
pub struct Timer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Timer {
    /// 创建新计时器
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// 开始计时，返回守卫
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: Instant::now(),
        }
    }

    /// 记录一次计时（手动）
    pub fn record(&self, elapsed: Duration) {
        self.total_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// 总时间（纳秒）
    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed)
    }

    /// 总时间（毫秒）
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    /// 调用次数
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 平均时间（纳秒）
    pub fn avg_ns(&self) -> f64 {
        let c = self.count();
        if c == 0 {
            0.0
        } else {
            self.total_ns() as f64 / c as f64
        }
    }

    /// 快照
    pub fn snapshot(&self) -> TimingSnapshot {
        TimingSnapshot {
            count: self.count(),
            total_ms: self.total_ms(),
            avg_ns: self.avg_ns(),
        }
    }

    /// 重置计时器
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// 计时守卫，drop 时自动记录
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// 计时快照
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingSnapshot {
    /// 调用次数
    pub count: u64,
    /// 总时间（毫秒）
    pub total_ms: f64,
    /// 平均时间（纳秒）
    pub avg_ns: f64,
}
