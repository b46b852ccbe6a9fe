//! 终端渲染：每显示一帧打印一行

use std::io::{self, Write};

use kineograph::Surface;
use tracing::trace;

/// 把帧来源（路径）打印到标准输出
///
/// 同一路径可能出现在多个序列或同一序列的多个位置，终端没有“隐藏”可言，
/// 因此这里不跟踪可见性；当前显示的是哪一帧以调度器的
/// [`shown_frame`](kineograph::Kineograph::shown_frame) 为准。
#[derive(Debug, Default)]
pub struct TerminalSurface {
    shown: usize,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计显示次数
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl Surface for TerminalSurface {
    type Frame = String;

    fn show(&mut self, frame: &String) {
        self.shown += 1;
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "  ▶ {frame}");
        let _ = stdout.flush();
    }

    fn hide(&mut self, frame: &String) {
        trace!(frame = %frame, "隐藏帧");
    }

    fn register(&mut self, sequence: &str, frame: &String) {
        trace!(sequence = sequence, frame = %frame, "登记帧");
    }
}
