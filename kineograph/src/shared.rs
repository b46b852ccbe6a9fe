//! # Shared 模块
//!
//! 多线程环境下的调度器句柄。
//!
//! 调度器本身是单线程状态机。当控制调用来自其他线程（例如 UI 回调）时，
//! 队列、当前请求和定时器集合必须用同一把锁串行化：
//!
//! ```text
//! UI 线程 ──play/unloop/stop──┐
//!                             ▼
//!                   Arc<Mutex<Kineograph>>
//!                             ▲
//! 驱动线程 ──drain_events─────┘
//! ```
//!
//! 句柄以真实时间作为时钟：每次加锁都先把虚拟时钟追到当前时刻，
//! 所以无论驱动线程睡了多久，控制调用都发生在“现在”，新一遍的帧偏移
//! 从这一刻算起。
//!
//! 回调在锁内执行，并直接拿到 `&mut Kineograph`，因此回调里不要再调用
//! [`SharedKineograph::with`]，否则会死锁。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::display::Surface;
use crate::event::PlaybackEvent;
use crate::scheduler::Kineograph;

/// 真实时间到虚拟时钟的映射
#[derive(Debug, Clone, Copy)]
struct WallClock {
    /// 创建句柄时调度器的虚拟时间
    base: Duration,
    origin: Instant,
}

impl WallClock {
    fn now(&self) -> Duration {
        self.base + self.origin.elapsed()
    }
}

type DriverSlot = Arc<Mutex<Option<Thread>>>;

/// 线程安全的调度器句柄
pub struct SharedKineograph<S: Surface> {
    inner: Arc<Mutex<Kineograph<S>>>,
    clock: WallClock,
    /// 正在运行的驱动线程，控制调用之后唤醒它
    driver: DriverSlot,
}

impl<S: Surface> Clone for SharedKineograph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: self.clock,
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<S: Surface> SharedKineograph<S> {
    pub fn new(kineograph: Kineograph<S>) -> Self {
        let clock = WallClock {
            base: kineograph.now(),
            origin: Instant::now(),
        };
        Self {
            inner: Arc::new(Mutex::new(kineograph)),
            clock,
            driver: Arc::new(Mutex::new(None)),
        }
    }

    /// 当前真实时间对应的虚拟时间
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// 加锁，并把虚拟时钟追到当前真实时间
    ///
    /// 追赶期间触发的帧产生的事件留在缓冲区，由驱动线程统一交出。
    /// 锁中毒说明某个回调 panic 了；调度器状态本身仍然一致，继续使用。
    pub fn lock(&self) -> MutexGuard<'_, Kineograph<S>> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.catch_up(self.now());
        guard
    }

    /// 在锁内执行一次操作，然后唤醒驱动线程重新计算下一个到期时间
    pub fn with<R>(&self, f: impl FnOnce(&mut Kineograph<S>) -> R) -> R {
        let result = {
            let mut guard = self.lock();
            f(&mut guard)
        };
        self.wake_driver();
        result
    }

    fn wake_driver(&self) {
        let driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(thread) = driver.as_ref() {
            thread.unpark();
        }
    }
}

impl<S> SharedKineograph<S>
where
    S: Surface + Send + 'static,
    S::Frame: Send,
{
    /// 启动驱动线程，用真实时间推进调度器
    ///
    /// 线程睡到下一个定时器到期（最长 `granularity`），醒来后加锁追赶时钟，
    /// 并把产生的事件交给 `on_events`。[`with`](Self::with) 会唤醒它。
    pub fn spawn_driver<H>(
        &self,
        granularity: Duration,
        mut on_events: H,
    ) -> std::io::Result<DriverHandle>
    where
        H: FnMut(Vec<PlaybackEvent>) + Send + 'static,
    {
        let shared = self.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("kineograph-driver".to_string())
            .spawn(move || {
                debug!(granularity = ?granularity, "驱动线程启动");
                while !stop_flag.load(Ordering::Acquire) {
                    // 直接加锁而不是 with()，避免唤醒自己
                    let (events, deadline) = {
                        let mut k = shared.lock();
                        (k.drain_events(), k.next_deadline())
                    };
                    if !events.is_empty() {
                        on_events(events);
                    }

                    let wait = deadline
                        .map_or(granularity, |due| due.saturating_sub(shared.now()))
                        .min(granularity);
                    thread::park_timeout(wait);
                }
                debug!("驱动线程退出");
            })?;

        *self.driver.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(thread.thread().clone());

        Ok(DriverHandle {
            stop,
            slot: Arc::clone(&self.driver),
            thread: Some(thread),
        })
    }
}

/// 驱动线程句柄，drop 时停止并等待线程退出
#[derive(Debug)]
pub struct DriverHandle {
    stop: Arc<AtomicBool>,
    slot: DriverSlot,
    thread: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// 停止驱动线程
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
            self.slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
