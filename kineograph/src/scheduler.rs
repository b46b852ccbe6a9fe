//! # Scheduler 模块
//!
//! 调度器本体与对外控制接口。
//!
//! ## 执行模型
//!
//! ```text
//! advance(delta) -> Vec<PlaybackEvent>
//! ```
//!
//! 调度器持有一个虚拟时钟，不读取真实时间。宿主（定时器、事件循环或
//! [`SharedKineograph`](crate::SharedKineograph) 的驱动线程）负责推进时钟：
//!
//! 1. 按到期顺序取出不晚于目标时间的帧定时器
//! 2. 把时钟设为该定时器的计划时间，显示对应帧
//! 3. 如果是本遍最后一帧，交给引擎判定重复 / 结束
//! 4. 结束时依次调用请求回调、unloop 回调，再取下一个请求
//!
//! ## 控制接口
//!
//! `play` / `next` / `unloop` / `stop` / `fps` 在禁用状态下都是静默的空操作，
//! 只有 `enable` 不受此限制。

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::{FrameSet, SchedulerConfig};
use crate::display::{DisplaySlot, FrameRef, Surface};
use crate::engine::{PassOutcome, PlaybackEngine, PlaybackPhase};
use crate::error::{KineographError, KineographResult};
use crate::event::PlaybackEvent;
use crate::queue::AnimationQueue;
use crate::registry::FrameRegistry;
use crate::request::{AnimationId, AnimationRequest, PlayRequest, is_valid_rate};
use crate::timer::FrameTimer;

/// 帧序列动画调度器
///
/// # 使用示例
///
/// ```ignore
/// let frames = FrameSet::new().with("run", ["r0.png", "r1.png", "r2.png"]);
/// let mut kineograph = Kineograph::new(surface, frames, SchedulerConfig::default());
///
/// kineograph
///     .fps(10.0)
///     .play(PlayRequest::new("run").loops(2))?
///     .play("idle")?;
///
/// loop {
///     for event in kineograph.advance(frame_delta) {
///         // ...
///     }
/// }
/// ```
pub struct Kineograph<S: Surface> {
    surface: S,
    registry: FrameRegistry<S::Frame>,
    queue: AnimationQueue<S>,
    engine: PlaybackEngine<S>,
    display: DisplaySlot,
    enabled: bool,
    default_fps: f64,
    /// 虚拟时钟
    clock: Duration,
    next_request_id: u64,
    /// 尚未交给宿主的事件
    events: Vec<PlaybackEvent>,
}

impl<S: Surface> std::fmt::Debug for Kineograph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kineograph")
            .field("sequences", &self.registry.len())
            .field("queue", &self.queue.len())
            .field("engine", &self.engine)
            .field("enabled", &self.enabled)
            .field("default_fps", &self.default_fps)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<S: Surface> Kineograph<S> {
    /// 创建调度器并登记全部帧
    ///
    /// 每一帧登记后都处于隐藏状态；若 `config.show_first_frame` 为真，
    /// 第一个登记的帧会立即显示。
    pub fn new(surface: S, frames: FrameSet<S::Frame>, config: SchedulerConfig) -> Self {
        let default_fps = if is_valid_rate(config.default_fps) {
            config.default_fps
        } else {
            warn!(rate = config.default_fps, "无效的初始帧率，使用 25fps");
            25.0
        };

        let mut kineograph = Self {
            surface,
            registry: FrameRegistry::new(),
            queue: AnimationQueue::new(),
            engine: PlaybackEngine::new(),
            display: DisplaySlot::new(),
            enabled: true,
            default_fps,
            clock: Duration::ZERO,
            next_request_id: 1,
            events: Vec::new(),
        };

        for (name, sequence) in frames {
            kineograph.register_sequence(&name, sequence, config.show_first_frame);
        }

        debug!(
            sequences = kineograph.registry.len(),
            default_fps = default_fps,
            "调度器初始化完成"
        );
        kineograph
    }

    fn register_sequence(&mut self, name: &str, frames: Vec<S::Frame>, show_first_frame: bool) {
        let start = self.registry.sequence_len(name).unwrap_or(0);
        let first_ever = self.registry.is_empty();
        self.registry.register(name, frames);

        let Ok(sequence) = self.registry.get(name) else {
            return;
        };
        for (index, frame) in sequence.iter().enumerate().skip(start) {
            self.surface.register(name, frame);
            if show_first_frame && first_ever && index == 0 {
                self.surface.show(frame);
                self.display.mark_shown(FrameRef::new(name, index));
            } else {
                self.surface.hide(frame);
            }
        }
    }

    // ========== 控制接口 ==========

    /// 把动画加入队列；当前空闲时立即开始播放
    ///
    /// 动画名未注册时同步返回 [`KineographError::AnimationNotFound`]，队列不变。
    pub fn play(&mut self, request: impl Into<PlayRequest<S>>) -> KineographResult<&mut Self> {
        if !self.enabled {
            return Ok(self);
        }

        let PlayRequest {
            name,
            loops,
            timing,
            callback,
        } = request.into();

        let frame_count = self
            .registry
            .sequence_len(&name)
            .ok_or_else(|| KineographError::not_found(&name))?;
        let rate = timing.resolve(frame_count, self.default_fps);

        let id = AnimationId::new(self.next_request_id);
        self.next_request_id += 1;

        debug!(id = %id, sequence = %name, rate = rate, loops = ?loops, "动画入队");
        self.queue.enqueue(AnimationRequest {
            id,
            sequence: name,
            loops,
            rate,
            callback,
        });

        if self.engine.is_idle() {
            self.advance_queue();
        }
        Ok(self)
    }

    /// 放弃当前动画（不调用回调），开始队列中的下一个
    pub fn next(&mut self) -> &mut Self {
        if self.enabled {
            self.advance_queue();
        }
        self
    }

    /// 让当前循环在本遍结束后停止，并继续队列
    pub fn unloop(&mut self) -> &mut Self {
        if self.enabled {
            self.engine.request_unloop(None);
        }
        self
    }

    /// 同 [`unloop`](Self::unloop)，并在循环优雅结束时调用 `callback`
    ///
    /// 只对当前正在播放的请求有效。空闲时（包括在完成回调里）登记的回调会在
    /// 下一个请求开始时被丢弃，不会被调用。
    pub fn unloop_with<C>(&mut self, callback: C) -> &mut Self
    where
        C: FnOnce(&mut Kineograph<S>) + Send + 'static,
    {
        if self.enabled {
            self.engine.request_unloop(Some(Box::new(callback)));
        }
        self
    }

    /// 硬停止：立即取消本遍所有未触发的帧，不调用任何回调
    ///
    /// `clear` 为真时同时清空等待中的队列。
    pub fn stop(&mut self, clear: bool) -> &mut Self {
        if !self.enabled {
            return self;
        }

        let stopped = self.engine.hard_stop().map(|request| request.id);
        let cleared = if clear { self.queue.clear() } else { 0 };
        if stopped.is_some() || cleared > 0 {
            self.events.push(PlaybackEvent::Stopped {
                at: self.clock,
                id: stopped,
                cleared,
            });
        }
        self
    }

    /// 设置之后入队请求的默认帧率
    ///
    /// 非有限值或非正数被忽略，保留原帧率。
    pub fn fps(&mut self, rate: f64) -> &mut Self {
        if !self.enabled {
            return self;
        }
        if is_valid_rate(rate) {
            self.default_fps = rate;
        } else {
            warn!(rate = rate, "忽略无效的帧率");
        }
        self
    }

    /// 启用/禁用全部控制接口
    pub fn enable(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    // ========== 时间推进 ==========

    /// 把虚拟时钟推进 `delta`，返回期间产生的事件
    pub fn advance(&mut self, delta: Duration) -> Vec<PlaybackEvent> {
        self.advance_to(self.clock + delta)
    }

    /// 把虚拟时钟推进到 `target`（早于当前时间时不回退）
    pub fn advance_to(&mut self, target: Duration) -> Vec<PlaybackEvent> {
        self.catch_up(target);
        self.drain_events()
    }

    /// 同 [`advance_to`](Self::advance_to)，但事件留在缓冲区里，
    /// 由下一次 `advance*` 或 [`drain_events`](Self::drain_events) 取出
    pub fn catch_up(&mut self, target: Duration) {
        while let Some(timer) = self.engine.timers_mut().pop_due(target) {
            self.clock = self.clock.max(timer.due);
            self.fire(timer);
        }
        self.clock = self.clock.max(target);
    }

    /// 最早的待触发时间
    pub fn next_deadline(&self) -> Option<Duration> {
        self.engine.timers().next_deadline()
    }

    /// 取出控制调用产生、尚未返回的事件
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    fn fire(&mut self, timer: FrameTimer) {
        let Some(active) = self.engine.active() else {
            return;
        };
        let id = active.request.id;
        let sequence = active.request.sequence.clone();

        self.show_frame(&sequence, timer.frame_index);
        trace!(id = %id, sequence = %sequence, index = timer.frame_index, "显示帧");
        self.events.push(PlaybackEvent::FrameShown {
            at: self.clock,
            id,
            frame: FrameRef::new(sequence, timer.frame_index),
        });

        if !timer.last {
            return;
        }

        match self.engine.complete_pass() {
            None => {}
            Some(PassOutcome::Repeat { remaining }) => {
                self.events.push(PlaybackEvent::Repeated {
                    at: self.clock,
                    id,
                    remaining,
                });
            }
            Some(PassOutcome::Finished {
                id,
                sequence,
                callback,
                unloop_callback,
                unlooped,
            }) => {
                self.events.push(PlaybackEvent::Completed {
                    at: self.clock,
                    id,
                    sequence,
                    unlooped,
                });

                // 引擎此时已空闲，回调里看到的是 Idle
                let epoch = self.engine.epoch();
                if let Some(callback) = callback {
                    callback(self);
                }
                if let Some(callback) = unloop_callback {
                    callback(self);
                }

                // 回调里已经调用过 next/stop 或开始了新动画时不再推进
                if self.engine.epoch() == epoch {
                    self.advance_queue();
                }
            }
        }
    }

    fn show_frame(&mut self, sequence: &str, index: usize) {
        let Some(frame) = self.registry.frame(sequence, index) else {
            return;
        };
        let previous = self
            .display
            .current()
            .and_then(|shown| self.registry.frame(&shown.sequence, shown.index));
        self.display
            .show(&mut self.surface, FrameRef::new(sequence, index), frame, previous);
    }

    /// 取下一个请求：清除 unloop，中止残留播放，队列为空则进入空闲
    fn advance_queue(&mut self) {
        self.engine.clear_unloop();
        if let Some(skipped) = self.engine.hard_stop() {
            self.events.push(PlaybackEvent::Skipped {
                at: self.clock,
                id: skipped.id,
            });
        }

        let Some(request) = self.queue.dequeue_next() else {
            debug!("队列为空，进入空闲");
            return;
        };

        let frame_count = self.registry.sequence_len(&request.sequence).unwrap_or(0);
        self.events.push(PlaybackEvent::Started {
            at: self.clock,
            id: request.id,
            sequence: request.sequence.clone(),
            rate: request.rate,
        });
        self.engine.start(request, frame_count, self.clock);
    }

    // ========== 查询 ==========

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.engine.phase()
    }

    /// 正在播放的请求 (ID, 序列名)
    pub fn active(&self) -> Option<(AnimationId, &str)> {
        self.engine
            .active()
            .map(|a| (a.request.id, a.request.sequence.as_str()))
    }

    /// 当前请求剩余的重复遍数（无限循环或空闲时为 `None`）
    pub fn remaining_loops(&self) -> Option<u32> {
        self.engine
            .active()
            .filter(|a| !a.indefinite)
            .map(|a| a.remaining_loops)
    }

    /// 按播放顺序列出等待中的序列名
    pub fn queued(&self) -> Vec<&str> {
        self.queue.iter().map(|r| r.sequence.as_str()).collect()
    }

    pub fn default_fps(&self) -> f64 {
        self.default_fps
    }

    /// 虚拟时钟当前值
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// 当前显示的帧
    pub fn shown_frame(&self) -> Option<&FrameRef> {
        self.display.current()
    }

    pub fn pending_timers(&self) -> usize {
        self.engine.timers().len()
    }

    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn sequence_len(&self, name: &str) -> Option<usize> {
        self.registry.sequence_len(name)
    }

    pub fn registry(&self) -> &FrameRegistry<S::Frame> {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
