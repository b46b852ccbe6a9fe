//! # Event 模块
//!
//! 调度器在推进过程中产生的事件，由 `advance()` 返回给宿主。

use std::time::Duration;

use crate::display::FrameRef;
use crate::request::AnimationId;

/// 播放事件
///
/// `at` 是事件发生时调度器虚拟时钟的值（即定时器的计划触发时间）。
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// 请求开始播放
    Started {
        at: Duration,
        id: AnimationId,
        sequence: String,
        rate: f64,
    },
    /// 显示了一帧
    FrameShown {
        at: Duration,
        id: AnimationId,
        frame: FrameRef,
    },
    /// 一遍播放完毕，开始下一遍
    ///
    /// `remaining` 为之后还要重复的遍数，无限循环时为 `None`。
    Repeated {
        at: Duration,
        id: AnimationId,
        remaining: Option<u32>,
    },
    /// 请求自然结束（回调在此之后触发）
    Completed {
        at: Duration,
        id: AnimationId,
        sequence: String,
        unlooped: bool,
    },
    /// 请求被 `next()` 跳过，不触发回调
    Skipped { at: Duration, id: AnimationId },
    /// 硬停止
    Stopped {
        at: Duration,
        id: Option<AnimationId>,
        cleared: usize,
    },
}

impl PlaybackEvent {
    /// 事件时间
    pub fn at(&self) -> Duration {
        match self {
            Self::Started { at, .. }
            | Self::FrameShown { at, .. }
            | Self::Repeated { at, .. }
            | Self::Completed { at, .. }
            | Self::Skipped { at, .. }
            | Self::Stopped { at, .. } => *at,
        }
    }

    /// 如果是帧显示事件，返回对应帧
    pub fn frame(&self) -> Option<&FrameRef> {
        match self {
            Self::FrameShown { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ms = self.at().as_millis();
        match self {
            Self::Started { id, sequence, rate, .. } => {
                write!(f, "{ms}ms start {sequence} {id} @ {rate}fps")
            }
            Self::FrameShown { frame, .. } => write!(f, "{ms}ms show {frame}"),
            Self::Repeated { remaining: Some(n), .. } => write!(f, "{ms}ms repeat ({n} left)"),
            Self::Repeated { remaining: None, .. } => write!(f, "{ms}ms repeat (indefinite)"),
            Self::Completed { sequence, unlooped, .. } => {
                if *unlooped {
                    write!(f, "{ms}ms complete {sequence} (unlooped)")
                } else {
                    write!(f, "{ms}ms complete {sequence}")
                }
            }
            Self::Skipped { id, .. } => write!(f, "{ms}ms skip {id}"),
            Self::Stopped { cleared, .. } => write!(f, "{ms}ms stop (cleared {cleared})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = PlaybackEvent::FrameShown {
            at: Duration::from_millis(300),
            id: AnimationId::new(1),
            frame: FrameRef::new("run", 0),
        };
        assert_eq!(event.to_string(), "300ms show run[0]");
        assert_eq!(event.frame(), Some(&FrameRef::new("run", 0)));

        let event = PlaybackEvent::Repeated {
            at: Duration::from_millis(200),
            id: AnimationId::new(1),
            remaining: None,
        };
        assert_eq!(event.to_string(), "200ms repeat (indefinite)");
        assert_eq!(event.frame(), None);
    }
}
