//! # Config 模块
//!
//! 调度器配置与构造输入。
//!
//! - [`SchedulerConfig`]：全局帧率、首帧是否立即显示
//! - [`FrameSet`]：构造调度器时提供的帧（具名序列，或单个未命名序列）
//! - [`FrameManifest`]：`FrameSet<String>` 的 JSON 形式
//!
//! ## 清单格式
//!
//! ```json
//! { "run": ["run/0.png", "run/1.png"], "idle": ["idle/0.png"] }
//! ```
//!
//! 或者单个数组，注册为 `"_default"`：
//!
//! ```json
//! ["frame0.png", "frame1.png"]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KineographError, KineographResult};
use crate::registry::DEFAULT_ANIMATION;

/// 调度器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 初始全局帧率
    #[serde(default = "default_fps")]
    pub default_fps: f64,

    /// 是否在构造时立即显示第一个注册的帧
    ///
    /// 关闭时所有帧初始都是隐藏的。
    #[serde(default)]
    pub show_first_frame: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_fps: default_fps(),
            show_first_frame: false,
        }
    }
}

fn default_fps() -> f64 {
    25.0
}

/// 构造输入：按注册顺序排列的 (动画名, 帧列表)
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSet<F> {
    sequences: Vec<(String, Vec<F>)>,
}

impl<F> Default for FrameSet<F> {
    fn default() -> Self {
        Self {
            sequences: Vec::new(),
        }
    }
}

impl<F> FrameSet<F> {
    /// 空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 单个未命名序列，注册为 `"_default"`
    pub fn single(frames: impl IntoIterator<Item = F>) -> Self {
        Self::new().with(DEFAULT_ANIMATION, frames)
    }

    /// 追加一个具名序列
    pub fn with(mut self, name: impl Into<String>, frames: impl IntoIterator<Item = F>) -> Self {
        self.sequences.push((name.into(), frames.into_iter().collect()));
        self
    }

    /// 对每个帧做映射（例如把路径换成已加载的资源句柄）
    pub fn map<G>(self, mut f: impl FnMut(&str, F) -> G) -> FrameSet<G> {
        FrameSet {
            sequences: self
                .sequences
                .into_iter()
                .map(|(name, frames)| {
                    let frames = frames.into_iter().map(|frame| f(&name, frame)).collect();
                    (name, frames)
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[F])> {
        self.sequences
            .iter()
            .map(|(name, frames)| (name.as_str(), frames.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl<F> IntoIterator for FrameSet<F> {
    type Item = (String, Vec<F>);
    type IntoIter = std::vec::IntoIter<(String, Vec<F>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.into_iter()
    }
}

/// 帧清单（JSON）
///
/// 具名形式按名称字典序注册。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameManifest {
    /// 名称 -> 帧来源列表
    Named(BTreeMap<String, Vec<String>>),
    /// 单个未命名列表
    Single(Vec<String>),
}

impl FrameManifest {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> KineographResult<Self> {
        serde_json::from_str(text).map_err(|e| KineographError::InvalidManifest {
            message: e.to_string(),
        })
    }

    /// 找出空序列的名称
    pub fn empty_sequences(&self) -> Vec<&str> {
        match self {
            Self::Named(map) => map
                .iter()
                .filter(|(_, frames)| frames.is_empty())
                .map(|(name, _)| name.as_str())
                .collect(),
            Self::Single(frames) if frames.is_empty() => vec![DEFAULT_ANIMATION],
            Self::Single(_) => Vec::new(),
        }
    }

    /// 转换为构造输入
    pub fn into_frame_set(self) -> FrameSet<String> {
        match self {
            Self::Named(map) => map
                .into_iter()
                .fold(FrameSet::new(), |set, (name, frames)| set.with(name, frames)),
            Self::Single(frames) => FrameSet::single(frames),
        }
    }
}

impl From<FrameManifest> for FrameSet<String> {
    fn from(manifest: FrameManifest) -> Self {
        manifest.into_frame_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.default_fps, 25.0);
        assert!(!config.show_first_frame);

        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "default_fps": 12, "show_first_frame": true }"#).unwrap();
        assert_eq!(config.default_fps, 12.0);
        assert!(config.show_first_frame);
    }

    #[test]
    fn test_named_manifest() {
        let manifest =
            FrameManifest::from_json(r#"{ "run": ["r0", "r1"], "idle": ["i0"] }"#).unwrap();
        let set = manifest.into_frame_set();

        let sequences: Vec<_> = set.iter().collect();
        assert_eq!(
            sequences,
            vec![
                ("idle", &["i0".to_string()][..]),
                ("run", &["r0".to_string(), "r1".to_string()][..]),
            ]
        );
    }

    #[test]
    fn test_single_manifest_uses_default_name() {
        let manifest = FrameManifest::from_json(r#"["a.png", "b.png"]"#).unwrap();
        assert_eq!(
            manifest,
            FrameManifest::Single(vec!["a.png".to_string(), "b.png".to_string()])
        );

        let set: FrameSet<String> = manifest.into();
        let (name, frames) = set.iter().next().unwrap();
        assert_eq!(name, "_default");
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_invalid_manifest() {
        let err = FrameManifest::from_json(r#"{ "run": 3 }"#).unwrap_err();
        assert!(matches!(err, KineographError::InvalidManifest { .. }));
    }

    #[test]
    fn test_empty_sequences() {
        let manifest = FrameManifest::from_json(r#"{ "run": [], "idle": ["i0"] }"#).unwrap();
        assert_eq!(manifest.empty_sequences(), vec!["run"]);

        let manifest = FrameManifest::Single(Vec::new());
        assert_eq!(manifest.empty_sequences(), vec!["_default"]);
    }

    #[test]
    fn test_frame_set_map() {
        let set = FrameSet::new().with("run", ["a", "b"]).map(|name, frame| format!("{name}/{frame}"));
        let (_, frames) = set.iter().next().unwrap();
        assert_eq!(frames, &["run/a".to_string(), "run/b".to_string()]);
    }
}
