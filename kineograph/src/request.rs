//! # Request 模块
//!
//! 动画请求及其参数。
//!
//! - [`PlayRequest`]：调用方传给 `play()` 的参数（名称、循环次数、回调、速率）
//! - [`AnimationRequest`]：校验通过、速率已确定，进入队列的请求

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use tracing::warn;

use crate::display::Surface;
use crate::registry::DEFAULT_ANIMATION;
use crate::scheduler::Kineograph;

/// 完成回调
///
/// 回调拿到调度器本身，可以直接链式调用 `play()` 等操作。
pub type Callback<S> = Box<dyn FnOnce(&mut Kineograph<S>) + Send + 'static>;

/// 动画请求 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

impl AnimationId {
    /// 创建新的请求 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 循环次数
///
/// `0` 表示无限循环；正整数 N 表示完整播放 N 遍后结束。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopCount {
    /// 无限循环，直到 `unloop()` 或硬停止
    Indefinite,
    /// 播放固定遍数
    Times(NonZeroU32),
}

impl LoopCount {
    /// 只播放一遍
    pub const ONCE: Self = Self::Times(NonZeroU32::MIN);

    /// 从整数构造，`0` 为无限循环
    pub fn times(count: u32) -> Self {
        NonZeroU32::new(count).map_or(Self::Indefinite, Self::Times)
    }

    /// 从浮点数构造
    ///
    /// 小数部分截断。截断后为 0、负数或 NaN 都视为无限循环。
    pub fn from_f64(count: f64) -> Self {
        let truncated = count.trunc();
        if truncated.is_nan() || truncated < 1.0 {
            return Self::Indefinite;
        }
        if truncated >= u32::MAX as f64 {
            return Self::times(u32::MAX);
        }
        Self::times(truncated as u32)
    }

    /// 是否无限循环
    pub fn is_indefinite(&self) -> bool {
        matches!(self, Self::Indefinite)
    }

    /// 总遍数（无限循环返回 `None`）
    pub fn passes(&self) -> Option<u32> {
        match self {
            Self::Indefinite => None,
            Self::Times(n) => Some(n.get()),
        }
    }
}

impl Default for LoopCount {
    fn default() -> Self {
        Self::ONCE
    }
}

impl From<u32> for LoopCount {
    fn from(count: u32) -> Self {
        Self::times(count)
    }
}

impl From<i64> for LoopCount {
    fn from(count: i64) -> Self {
        if count <= 0 {
            Self::Indefinite
        } else {
            Self::times(u32::try_from(count).unwrap_or(u32::MAX))
        }
    }
}

impl From<f64> for LoopCount {
    fn from(count: f64) -> Self {
        Self::from_f64(count)
    }
}

/// 播放速率的来源
///
/// 帧率和目标时长互斥，由类型保证不会同时给出。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Timing {
    /// 使用入队时的全局帧率
    #[default]
    Default,
    /// 指定帧率（帧/秒）
    Fps(f64),
    /// 指定一遍的目标时长，帧率 = 帧数 / 时长
    Duration(Duration),
}

impl Timing {
    /// 计算实际帧率
    ///
    /// 无效的帧率与零时长都会退回全局帧率。
    pub fn resolve(&self, frame_count: usize, global_fps: f64) -> f64 {
        match *self {
            Self::Default => global_fps,
            Self::Fps(rate) if is_valid_rate(rate) => rate,
            Self::Fps(rate) => {
                warn!(rate = rate, fallback = global_fps, "无效的帧率，使用全局帧率");
                global_fps
            }
            Self::Duration(duration) if !duration.is_zero() => {
                let rate = frame_count as f64 / duration.as_secs_f64();
                if is_valid_rate(rate) { rate } else { global_fps }
            }
            Self::Duration(_) => global_fps,
        }
    }
}

/// 帧率是否可用（有限且为正）
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// `play()` 的参数
///
/// ```ignore
/// kineograph.play(
///     PlayRequest::new("run")
///         .loops(2)
///         .fps(10.0)
///         .on_complete(|k| { k.play("idle").ok(); }),
/// )?;
/// ```
pub struct PlayRequest<S: Surface> {
    pub(crate) name: String,
    pub(crate) loops: LoopCount,
    pub(crate) timing: Timing,
    pub(crate) callback: Option<Callback<S>>,
}

impl<S: Surface> PlayRequest<S> {
    /// 播放指定动画，默认只播放一遍
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loops: LoopCount::default(),
            timing: Timing::Default,
            callback: None,
        }
    }

    /// 设置循环次数
    pub fn loops(mut self, loops: impl Into<LoopCount>) -> Self {
        self.loops = loops.into();
        self
    }

    /// 无限循环
    pub fn indefinite(mut self) -> Self {
        self.loops = LoopCount::Indefinite;
        self
    }

    /// 指定帧率
    pub fn fps(mut self, rate: f64) -> Self {
        self.timing = Timing::Fps(rate);
        self
    }

    /// 指定一遍的目标时长
    pub fn duration(mut self, duration: Duration) -> Self {
        self.timing = Timing::Duration(duration);
        self
    }

    /// 设置速率来源
    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// 设置完成回调
    pub fn on_complete<C>(mut self, callback: C) -> Self
    where
        C: FnOnce(&mut Kineograph<S>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// 动画名
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: Surface> Default for PlayRequest<S> {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATION)
    }
}

impl<S: Surface> From<&str> for PlayRequest<S> {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<S: Surface> From<String> for PlayRequest<S> {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl<S: Surface> fmt::Debug for PlayRequest<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("name", &self.name)
            .field("loops", &self.loops)
            .field("timing", &self.timing)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// 已入队的动画请求
pub struct AnimationRequest<S: Surface> {
    /// 请求 ID
    pub id: AnimationId,
    /// 帧序列名
    pub sequence: String,
    /// 循环次数
    pub loops: LoopCount,
    /// 帧率（入队时确定）
    pub rate: f64,
    /// 完成回调（硬停止时不会调用）
    pub callback: Option<Callback<S>>,
}

impl<S: Surface> fmt::Debug for AnimationRequest<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationRequest")
            .field("id", &self.id)
            .field("sequence", &self.sequence)
            .field("loops", &self.loops)
            .field("rate", &self.rate)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
