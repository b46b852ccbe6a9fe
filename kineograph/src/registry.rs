//! # Registry 模块
//!
//! 帧注册表：按名称保存有序的帧句柄序列。
//!
//! - 同名多次注册会追加到已有序列末尾，保持调用顺序
//! - 空序列不会被创建，因此永远不会成为播放目标
//! - 本模块不提供删除操作

use std::collections::HashMap;

use tracing::warn;

use crate::error::{KineographError, KineographResult};

/// 未命名帧列表使用的动画名
pub const DEFAULT_ANIMATION: &str = "_default";

/// 帧注册表
///
/// `F` 是不透明的帧句柄，注册表只负责保存顺序，不关心其内容。
#[derive(Debug, Clone)]
pub struct FrameRegistry<F> {
    /// 名称 -> 帧序列
    sequences: HashMap<String, Vec<F>>,
    /// 序列名称的注册顺序
    order: Vec<String>,
}

impl<F> Default for FrameRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FrameRegistry<F> {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            sequences: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 向指定序列追加帧，序列不存在时创建
    ///
    /// 返回本次追加的帧数量。
    pub fn register(&mut self, name: &str, frames: impl IntoIterator<Item = F>) -> usize {
        let mut frames = frames.into_iter().peekable();
        if frames.peek().is_none() {
            if !self.sequences.contains_key(name) {
                warn!(name = %name, "忽略空帧序列的注册");
            }
            return 0;
        }

        if !self.sequences.contains_key(name) {
            self.order.push(name.to_string());
        }
        let sequence = self.sequences.entry(name.to_string()).or_default();

        let before = sequence.len();
        sequence.extend(frames);
        sequence.len() - before
    }

    /// 获取指定序列
    pub fn get(&self, name: &str) -> KineographResult<&[F]> {
        self.sequences
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| KineographError::not_found(name))
    }

    /// 获取序列中的单帧
    pub fn frame(&self, name: &str, index: usize) -> Option<&F> {
        self.sequences.get(name).and_then(|s| s.get(index))
    }

    /// 检查序列是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    /// 序列长度
    pub fn sequence_len(&self, name: &str) -> Option<usize> {
        self.sequences.get(name).map(Vec::len)
    }

    /// 按注册顺序遍历序列名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// 已注册序列数量
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
