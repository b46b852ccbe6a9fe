//! # Kineograph
//!
//! 帧序列动画调度器（翻页书）。
//!
//! ## 架构概述
//!
//! `kineograph` 是纯逻辑核心，不依赖任何 IO、渲染或真实时钟。
//! 帧的显示通过宿主实现的 [`Surface`] 完成，时间由宿主推进：
//!
//! ```text
//! Host                                Kineograph
//!   │                                     │
//!   │──── play / next / unloop / stop ───►│ 入队、开始、标记
//!   │──── advance(delta) ────────────────►│ 触发到期的帧定时器
//!   │◄─── Surface::show / hide ───────────│
//!   │◄─── Vec<PlaybackEvent> ─────────────│
//! ```
//!
//! ## 核心类型
//!
//! - [`Kineograph`]：调度器与控制接口
//! - [`PlayRequest`]：`play()` 的参数（名称、循环次数、回调、帧率/时长）
//! - [`PlaybackEvent`]：推进过程中产生的事件
//! - [`Surface`]：渲染能力
//! - [`SharedKineograph`]：多线程句柄与真实时间驱动线程
//!
//! ## 使用示例
//!
//! ```ignore
//! use kineograph::{FrameSet, Kineograph, PlayRequest, SchedulerConfig};
//!
//! let frames = FrameSet::new()
//!     .with("spin", ["s0.png", "s1.png"])
//!     .with("wave", ["w0.png", "w1.png", "w2.png"]);
//! let mut kineograph = Kineograph::new(surface, frames, SchedulerConfig::default());
//!
//! kineograph
//!     .play(PlayRequest::new("spin").indefinite())?
//!     .play(PlayRequest::new("wave").loops(2).on_complete(|k| {
//!         k.play("spin").ok();
//!     }))?;
//!
//! // 稍后：让 spin 播完当前这一遍再切到 wave
//! kineograph.unloop();
//! ```
//!
//! ## 模块结构
//!
//! - [`registry`]：帧注册表
//! - [`request`]：动画请求、循环次数、速率
//! - [`queue`]：先进先出的请求队列
//! - [`timer`]：可整体取消的帧定时器
//! - [`engine`]：播放状态机
//! - [`scheduler`]：调度器与控制接口
//! - [`display`]：渲染边界与单帧显示槽
//! - [`config`]：配置与构造输入
//! - [`shared`]：多线程句柄
//! - [`error`]：错误类型

pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod event;
pub mod queue;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod shared;
pub mod timer;

// 重导出核心类型
pub use config::{FrameManifest, FrameSet, SchedulerConfig};
pub use display::{DisplaySlot, FrameRef, NullSurface, Surface};
pub use engine::PlaybackPhase;
pub use error::{KineographError, KineographResult};
pub use event::PlaybackEvent;
pub use registry::{DEFAULT_ANIMATION, FrameRegistry};
pub use request::{AnimationId, Callback, LoopCount, PlayRequest, Timing};
pub use scheduler::Kineograph;
pub use shared::{DriverHandle, SharedKineograph};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let frames = FrameSet::single(["a".to_string()]);
        let mut kineograph = Kineograph::new(NullSurface, frames, SchedulerConfig::default());

        kineograph
            .play(PlayRequest::default().loops(LoopCount::ONCE))
            .unwrap();
        assert_eq!(kineograph.phase(), PlaybackPhase::Playing);

        let _events: Vec<PlaybackEvent> = kineograph.advance(std::time::Duration::ZERO);
        let _timing = Timing::Fps(12.0);
    }
}
