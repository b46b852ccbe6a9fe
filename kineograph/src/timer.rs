//! # Timer 模块
//!
//! 可整体取消的帧定时器集合。
//!
//! 每一遍播放开始时为序列中的每一帧登记一个定时器，第 i 个定时器在
//! `pass_start + i * (1s / rate)` 到期。定时器按绝对到期时间触发，
//! 与前一个回调何时执行完毕无关；到期时间相同时按登记顺序触发。

use std::collections::BTreeMap;
use std::time::Duration;

/// 第 `index` 帧相对本遍开始的偏移
///
/// 每帧单独从起点计算，避免逐帧累加带来的舍入漂移。
pub fn frame_offset(index: usize, rate: f64) -> Duration {
    let nanos = (index as f64 * 1_000_000_000.0 / rate).round();
    Duration::from_nanos(nanos as u64)
}

/// 一个待触发的帧显示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimer {
    /// 到期时间（调度器虚拟时钟）
    pub due: Duration,
    /// 要显示的帧下标
    pub frame_index: usize,
    /// 是否为本遍最后一帧
    pub last: bool,
}

/// 定时器集合
#[derive(Debug, Default)]
pub struct TimerSet {
    /// (到期时间, 登记序号) -> 定时器
    entries: BTreeMap<(Duration, u64), FrameTimer>,
    next_seq: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一整遍登记定时器
    pub fn schedule_pass(&mut self, pass_start: Duration, frame_count: usize, rate: f64) {
        for index in 0..frame_count {
            self.schedule(FrameTimer {
                due: pass_start + frame_offset(index, rate),
                frame_index: index,
                last: index + 1 == frame_count,
            });
        }
    }

    /// 登记单个定时器
    pub fn schedule(&mut self, timer: FrameTimer) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((timer.due, seq), timer);
    }

    /// 取出最早一个不晚于 `until` 到期的定时器
    pub fn pop_due(&mut self, until: Duration) -> Option<FrameTimer> {
        let (&key, _) = self.entries.first_key_value()?;
        if key.0 > until {
            return None;
        }
        self.entries.remove(&key)
    }

    /// 最早的到期时间
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// 取消全部定时器，返回取消数量
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.entries.len();
        self.entries.clear();
        cancelled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_frame_offset() {
        assert_eq!(frame_offset(0, 10.0), Duration::ZERO);
        assert_eq!(frame_offset(3, 10.0), ms(300));
        assert_eq!(frame_offset(7, 10.0), ms(700));
        // 25fps = 40ms 间隔
        assert_eq!(frame_offset(5, 25.0), ms(200));
        // 3fps 无法整除，四舍五入到纳秒
        assert_eq!(frame_offset(1, 3.0), Duration::from_nanos(333_333_333));
        assert_eq!(frame_offset(2, 3.0), Duration::from_nanos(666_666_667));
    }

    #[test]
    fn test_schedule_pass_marks_last_frame() {
        let mut timers = TimerSet::new();
        timers.schedule_pass(ms(1000), 3, 10.0);

        assert_eq!(timers.len(), 3);
        assert_eq!(timers.next_deadline(), Some(ms(1000)));

        let fired: Vec<_> = std::iter::from_fn(|| timers.pop_due(ms(5000))).collect();
        assert_eq!(
            fired,
            vec![
                FrameTimer { due: ms(1000), frame_index: 0, last: false },
                FrameTimer { due: ms(1100), frame_index: 1, last: false },
                FrameTimer { due: ms(1200), frame_index: 2, last: true },
            ]
        );
    }

    #[test]
    fn test_pop_due_respects_deadline() {
        let mut timers = TimerSet::new();
        timers.schedule_pass(Duration::ZERO, 2, 5.0);

        assert_eq!(timers.pop_due(ms(100)).map(|t| t.frame_index), Some(0));
        assert_eq!(timers.pop_due(ms(100)), None);
        assert_eq!(timers.pop_due(ms(200)).map(|t| t.frame_index), Some(1));
    }

    #[test]
    fn test_equal_deadlines_fire_in_insertion_order() {
        let mut timers = TimerSet::new();
        timers.schedule(FrameTimer { due: ms(10), frame_index: 4, last: false });
        timers.schedule(FrameTimer { due: ms(10), frame_index: 2, last: true });

        assert_eq!(timers.pop_due(ms(10)).map(|t| t.frame_index), Some(4));
        assert_eq!(timers.pop_due(ms(10)).map(|t| t.frame_index), Some(2));
    }

    #[test]
    fn test_cancel_all() {
        let mut timers = TimerSet::new();
        timers.schedule_pass(Duration::ZERO, 4, 25.0);

        assert_eq!(timers.cancel_all(), 4);
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
