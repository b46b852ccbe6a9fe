//! # Display 模块
//!
//! 调度器与渲染层之间的边界。
//!
//! ## 核心概念
//!
//! - [`Surface`]：由宿主实现的渲染能力（显示/隐藏一帧、登记一帧）
//! - [`DisplaySlot`]：单槽位，同一时刻最多只有一帧处于显示状态
//!
//! 调度器从不关心帧如何被绘制，只通过 `Surface` 发出"显示第 N 帧"。

/// 帧的定位信息（序列名 + 下标）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameRef {
    pub sequence: String,
    pub index: usize,
}

impl FrameRef {
    pub fn new(sequence: impl Into<String>, index: usize) -> Self {
        Self {
            sequence: sequence.into(),
            index,
        }
    }
}

impl std::fmt::Display for FrameRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.sequence, self.index)
    }
}

/// 渲染能力
///
/// ## 实现示例
///
/// ```rust,ignore
/// struct DomSurface;
///
/// impl Surface for DomSurface {
///     type Frame = ElementHandle;
///
///     fn show(&mut self, frame: &ElementHandle) {
///         frame.set_visible(true);
///     }
///
///     fn hide(&mut self, frame: &ElementHandle) {
///         frame.set_visible(false);
///     }
/// }
/// ```
pub trait Surface {
    /// 不透明的帧句柄
    type Frame;

    /// 让一帧可见
    fn show(&mut self, frame: &Self::Frame);

    /// 让一帧不可见
    fn hide(&mut self, frame: &Self::Frame);

    /// 帧被登记到某个动画名下时调用
    ///
    /// 默认什么也不做；需要预先挂载帧资源的宿主可以在这里处理。
    fn register(&mut self, _sequence: &str, _frame: &Self::Frame) {}
}

/// 不渲染任何内容的 Surface，用于无头模拟
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    type Frame = String;

    fn show(&mut self, _frame: &String) {}

    fn hide(&mut self, _frame: &String) {}
}

/// 当前显示帧的单槽位
///
/// 显示新帧是一次"交换并释放旧帧"：先显示新帧，再隐藏之前的帧。
#[derive(Debug, Default, Clone)]
pub struct DisplaySlot {
    shown: Option<FrameRef>,
}

impl DisplaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 显示一帧，返回被替换下来的帧
    pub fn show<S: Surface>(
        &mut self,
        surface: &mut S,
        frame_ref: FrameRef,
        frame: &S::Frame,
        previous: Option<&S::Frame>,
    ) -> Option<FrameRef> {
        surface.show(frame);

        let replaced = self.shown.replace(frame_ref.clone());
        // 同一帧重复显示时不能再把它隐藏掉
        if replaced.as_ref() != Some(&frame_ref) {
            if let Some(previous) = previous {
                surface.hide(previous);
            }
        }
        replaced
    }

    /// 当前显示的帧
    pub fn current(&self) -> Option<&FrameRef> {
        self.shown.as_ref()
    }

    /// 记录一帧为已显示（不触发渲染）
    pub(crate) fn mark_shown(&mut self, frame_ref: FrameRef) {
        self.shown = Some(frame_ref);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl Surface for Recorder {
        type Frame = &'static str;

        fn show(&mut self, frame: &&'static str) {
            self.log.push(format!("show {frame}"));
        }

        fn hide(&mut self, frame: &&'static str) {
            self.log.push(format!("hide {frame}"));
        }
    }

    #[test]
    fn test_show_hides_previous() {
        let mut surface = Recorder::default();
        let mut slot = DisplaySlot::new();

        assert_eq!(slot.show(&mut surface, FrameRef::new("a", 0), &"a0", None), None);
        let replaced = slot.show(&mut surface, FrameRef::new("a", 1), &"a1", Some(&"a0"));

        assert_eq!(replaced, Some(FrameRef::new("a", 0)));
        assert_eq!(slot.current(), Some(&FrameRef::new("a", 1)));
        assert_eq!(surface.log, vec!["show a0", "show a1", "hide a0"]);
    }

    #[test]
    fn test_reshowing_same_frame_keeps_it_visible() {
        let mut surface = Recorder::default();
        let mut slot = DisplaySlot::new();

        slot.show(&mut surface, FrameRef::new("dot", 0), &"d0", None);
        slot.show(&mut surface, FrameRef::new("dot", 0), &"d0", Some(&"d0"));

        assert_eq!(surface.log, vec!["show d0", "show d0"]);
    }

    #[test]
    fn test_frame_ref_display() {
        assert_eq!(FrameRef::new("run", 2).to_string(), "run[2]");
    }
}
