//! # Queue 模块
//!
//! 待播放的动画请求队列，严格先进先出。

use std::collections::VecDeque;

use crate::display::Surface;
use crate::request::AnimationRequest;

/// 动画队列
///
/// 只保存**待播放**的请求；正在播放的请求由引擎持有，不在队列中。
pub struct AnimationQueue<S: Surface> {
    pending: VecDeque<AnimationRequest<S>>,
}

impl<S: Surface> Default for AnimationQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> std::fmt::Debug for AnimationQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.pending.iter()).finish()
    }
}

impl<S: Surface> AnimationQueue<S> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// 追加到队尾
    pub fn enqueue(&mut self, request: AnimationRequest<S>) {
        self.pending.push_back(request);
    }

    /// 取出队首
    pub fn dequeue_next(&mut self) -> Option<AnimationRequest<S>> {
        self.pending.pop_front()
    }

    /// 丢弃全部待播放请求，返回丢弃数量
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// 按播放顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &AnimationRequest<S>> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NullSurface;
    use crate::request::{AnimationId, LoopCount};

    fn request(id: u64, sequence: &str) -> AnimationRequest<NullSurface> {
        AnimationRequest {
            id: AnimationId::new(id),
            sequence: sequence.to_string(),
            loops: LoopCount::ONCE,
            rate: 25.0,
            callback: None,
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = AnimationQueue::new();
        queue.enqueue(request(1, "a"));
        queue.enqueue(request(2, "b"));
        queue.enqueue(request(3, "c"));

        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue_next())
            .map(|r| r.sequence)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut queue = AnimationQueue::new();
        queue.enqueue(request(1, "a"));
        queue.enqueue(request(2, "b"));

        assert_eq!(queue.clear(), 2);
        assert!(queue.dequeue_next().is_none());
    }
}
