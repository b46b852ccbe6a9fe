//! # Engine 模块
//!
//! 播放引擎：同一时刻只驱动一个请求的状态机。
//!
//! ## 状态转换
//!
//! ```text
//!            start                 unloop()
//!   Idle ───────────► Playing ───────────────► Draining
//!    ▲                 │  ▲                       │
//!    │   最后一帧显示   │  │ 还有剩余遍数/无限循环   │ 本遍最后一帧显示
//!    │◄────────────────┘  └───────────────────────│
//!    │        (结束：回调 → 取下一个请求)           │
//!    └────────────────────────────────────────────┘
//! ```
//!
//! 引擎只维护状态与定时器；帧的实际显示、回调调用和取下一个请求由
//! [`Kineograph`](crate::Kineograph) 根据引擎返回的 [`PassOutcome`] 完成。

use std::time::Duration;

use tracing::{debug, warn};

use crate::display::Surface;
use crate::request::{AnimationId, AnimationRequest, Callback};
use crate::timer::{TimerSet, frame_offset};

/// 引擎阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// 没有正在播放的请求
    #[default]
    Idle,
    /// 正在逐帧推进
    Playing,
    /// 已请求 unloop，播完本遍后结束
    Draining,
}

/// 当前请求的播放状态
pub struct ActivePlayback<S: Surface> {
    /// 正在播放的请求
    pub request: AnimationRequest<S>,
    /// 序列帧数
    pub frame_count: usize,
    /// 剩余重复遍数（无限循环时无意义）
    pub remaining_loops: u32,
    /// 是否无限循环
    pub indefinite: bool,
    /// 当前这一遍的开始时间
    pub pass_start: Duration,
}

/// 一遍播放结束后的处理结果
pub enum PassOutcome<S: Surface> {
    /// 重新开始下一遍
    Repeat { remaining: Option<u32> },
    /// 请求结束，调用方依次执行回调后取下一个请求
    Finished {
        id: AnimationId,
        sequence: String,
        callback: Option<Callback<S>>,
        unloop_callback: Option<Callback<S>>,
        unlooped: bool,
    },
}

/// 播放引擎
pub struct PlaybackEngine<S: Surface> {
    active: Option<ActivePlayback<S>>,
    unloop_requested: bool,
    unloop_callback: Option<Callback<S>>,
    timers: TimerSet,
    /// 每次开始/中止播放时递增，用于判断回调是否已经改变了播放状态
    epoch: u64,
}

impl<S: Surface> Default for PlaybackEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> std::fmt::Debug for PlaybackEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("active", &self.active.as_ref().map(|a| &a.request))
            .field("unloop_requested", &self.unloop_requested)
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}

impl<S: Surface> PlaybackEngine<S> {
    pub fn new() -> Self {
        Self {
            active: None,
            unloop_requested: false,
            unloop_callback: None,
            timers: TimerSet::new(),
            epoch: 0,
        }
    }

    /// 开始播放一个请求，第一帧在 `now` 显示
    pub fn start(&mut self, request: AnimationRequest<S>, frame_count: usize, now: Duration) {
        self.timers.cancel_all();
        self.clear_unloop();

        let indefinite = request.loops.is_indefinite();
        let remaining_loops = request.loops.passes().map_or(0, |n| n - 1);

        debug!(
            id = %request.id,
            sequence = %request.sequence,
            rate = request.rate,
            loops = ?request.loops,
            "开始播放动画"
        );

        self.timers.schedule_pass(now, frame_count, request.rate);
        self.active = Some(ActivePlayback {
            request,
            frame_count,
            remaining_loops,
            indefinite,
            pass_start: now,
        });
        self.epoch += 1;
    }

    /// 本遍最后一帧显示后调用
    ///
    /// 判定顺序：unloop > 无限循环 > 剩余遍数。结束时请求立即离开引擎，
    /// 回调执行期间引擎已经处于空闲。
    pub fn complete_pass(&mut self) -> Option<PassOutcome<S>> {
        let active = self.active.as_mut()?;

        if self.unloop_requested {
            debug!(id = %active.request.id, "unloop：本遍结束后停止循环");
            self.unloop_requested = false;
            let unloop_callback = self.unloop_callback.take();
            return self.finish(unloop_callback, true);
        }

        let remaining = if active.indefinite {
            None
        } else if active.remaining_loops == 0 {
            debug!(id = %active.request.id, "动画播放完毕");
            return self.finish(None, false);
        } else {
            active.remaining_loops -= 1;
            Some(active.remaining_loops)
        };

        // 下一遍紧接在上一遍最后一帧之后一个帧间隔开始
        active.pass_start += frame_offset(active.frame_count, active.request.rate);
        self.timers
            .schedule_pass(active.pass_start, active.frame_count, active.request.rate);

        Some(PassOutcome::Repeat { remaining })
    }

    fn finish(
        &mut self,
        unloop_callback: Option<Callback<S>>,
        unlooped: bool,
    ) -> Option<PassOutcome<S>> {
        let AnimationRequest {
            id,
            sequence,
            callback,
            ..
        } = self.active.take()?.request;
        self.timers.cancel_all();
        self.epoch += 1;

        Some(PassOutcome::Finished {
            id,
            sequence,
            callback,
            unloop_callback,
            unlooped,
        })
    }

    /// 硬停止：取消全部定时器并丢弃当前请求，不调用任何回调
    ///
    /// 即使当前空闲也会递增 epoch，完成回调里调用 `stop()` 因此会阻止队列推进。
    pub fn hard_stop(&mut self) -> Option<AnimationRequest<S>> {
        let cancelled = self.timers.cancel_all();
        self.epoch += 1;
        let active = self.active.take()?;
        debug!(id = %active.request.id, cancelled = cancelled, "停止当前动画");
        Some(active.request)
    }

    /// 请求优雅退出循环
    pub fn request_unloop(&mut self, callback: Option<Callback<S>>) {
        self.unloop_requested = true;
        self.unloop_callback = callback;
    }

    /// 清除 unloop 标记及其回调，返回是否丢弃了一个尚未触发的回调
    pub fn clear_unloop(&mut self) -> bool {
        self.unloop_requested = false;
        let discarded = self.unloop_callback.take().is_some();
        if discarded {
            warn!("丢弃未触发的 unloop 回调");
        }
        discarded
    }

    pub fn phase(&self) -> PlaybackPhase {
        match (&self.active, self.unloop_requested) {
            (None, _) => PlaybackPhase::Idle,
            (Some(_), true) => PlaybackPhase::Draining,
            (Some(_), false) => PlaybackPhase::Playing,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn active(&self) -> Option<&ActivePlayback<S>> {
        self.active.as_ref()
    }

    pub fn unloop_requested(&self) -> bool {
        self.unloop_requested
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerSet {
        &mut self.timers
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NullSurface;
    use crate::request::LoopCount;
    use crate::scheduler::Kineograph;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn request(loops: LoopCount) -> AnimationRequest<NullSurface> {
        AnimationRequest {
            id: AnimationId::new(7),
            sequence: "run".to_string(),
            loops,
            rate: 10.0,
            callback: None,
        }
    }

    #[test]
    fn test_start_schedules_first_pass() {
        let mut engine = PlaybackEngine::new();
        engine.start(request(LoopCount::times(2)), 3, ms(50));

        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        assert_eq!(engine.timers().len(), 3);
        assert_eq!(engine.timers().next_deadline(), Some(ms(50)));
        let active = engine.active().unwrap();
        assert_eq!(active.remaining_loops, 1);
        assert!(!active.indefinite);
    }

    #[test]
    fn test_finite_loops_repeat_then_finish() {
        let mut engine = PlaybackEngine::new();
        engine.start(request(LoopCount::times(2)), 3, Duration::ZERO);
        engine.timers_mut().cancel_all();

        match engine.complete_pass() {
            Some(PassOutcome::Repeat { remaining }) => assert_eq!(remaining, Some(0)),
            _ => panic!("第一遍结束后应重复"),
        }
        // 第二遍从 300ms 开始
        assert_eq!(engine.timers().next_deadline(), Some(ms(300)));
        engine.timers_mut().cancel_all();

        let epoch = engine.epoch();
        match engine.complete_pass() {
            Some(PassOutcome::Finished { unlooped, unloop_callback, .. }) => {
                assert!(!unlooped);
                assert!(unloop_callback.is_none());
            }
            _ => panic!("第二遍结束后应结束"),
        }
        // 结束的请求立即离开引擎
        assert!(engine.timers().is_empty());
        assert!(engine.is_idle());
        assert_eq!(engine.phase(), PlaybackPhase::Idle);
        assert_ne!(engine.epoch(), epoch);
    }

    #[test]
    fn test_indefinite_until_unloop() {
        let mut engine = PlaybackEngine::new();
        engine.start(request(LoopCount::Indefinite), 2, Duration::ZERO);

        for _ in 0..5 {
            engine.timers_mut().cancel_all();
            assert!(matches!(
                engine.complete_pass(),
                Some(PassOutcome::Repeat { remaining: None })
            ));
        }

        engine.request_unloop(Some(Box::new(|_: &mut Kineograph<NullSurface>| {})));
        assert_eq!(engine.phase(), PlaybackPhase::Draining);

        match engine.complete_pass() {
            Some(PassOutcome::Finished { unlooped, unloop_callback, .. }) => {
                assert!(unlooped);
                assert!(unloop_callback.is_some());
            }
            _ => panic!("unloop 后应结束"),
        }
        assert!(!engine.unloop_requested());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_start_clears_unloop() {
        let mut engine = PlaybackEngine::new();
        engine.request_unloop(None);
        assert_eq!(engine.phase(), PlaybackPhase::Idle);

        engine.start(request(LoopCount::Indefinite), 2, Duration::ZERO);
        assert!(!engine.unloop_requested());
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_hard_stop() {
        let mut engine = PlaybackEngine::new();
        assert!(engine.hard_stop().is_none());

        engine.start(request(LoopCount::ONCE), 3, Duration::ZERO);
        let epoch = engine.epoch();
        let stopped = engine.hard_stop().unwrap();

        assert_eq!(stopped.sequence, "run");
        assert!(engine.timers().is_empty());
        assert!(engine.is_idle());
        assert_ne!(engine.epoch(), epoch);
        assert!(engine.complete_pass().is_none());

        // 空闲时的硬停止同样递增 epoch
        let epoch = engine.epoch();
        assert!(engine.hard_stop().is_none());
        assert_ne!(engine.epoch(), epoch);
    }

    #[test]
    fn test_clear_unloop_reports_discarded_callback() {
        let mut engine = PlaybackEngine::new();
        assert!(!engine.clear_unloop());

        engine.request_unloop(None);
        assert!(!engine.clear_unloop());

        engine.request_unloop(Some(Box::new(|_: &mut Kineograph<NullSurface>| {})));
        assert!(engine.clear_unloop());
        assert!(!engine.unloop_requested());
    }
}
