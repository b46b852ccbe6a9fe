//! # Config 模块
//!
//! 命令行工具的配置文件。
//!
//! ```json
//! {
//!   "frames": { "run": ["run/0.png", "run/1.png"] },
//!   "scheduler": { "default_fps": 12 }
//! }
//! ```
//!
//! 优先级：命令行参数 > 配置文件 > 默认值。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kineograph::{FrameManifest, SchedulerConfig};
use serde::Deserialize;
use tracing::{debug, info};

/// 未指定 `--config` 时在当前目录查找的文件名
pub const DEFAULT_CONFIG: &str = "kineo.json";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct CliConfig {
    /// 内联帧清单（命令行未给出清单文件时使用）
    #[serde(default)]
    pub frames: Option<FrameManifest>,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl CliConfig {
    /// 加载配置
    ///
    /// 显式指定的文件必须存在；默认文件不存在时使用默认配置。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG);
                if path.exists() {
                    Self::read(&path)
                } else {
                    debug!("未找到 {DEFAULT_CONFIG}，使用默认配置");
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        info!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 取帧清单：优先读取 `path`，否则使用配置文件里的 `frames`
    pub fn manifest(&self, path: Option<&Path>) -> Result<FrameManifest> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("读取帧清单失败: {}", path.display()))?;
                FrameManifest::from_json(&text)
                    .with_context(|| format!("帧清单格式错误: {}", path.display()))
            }
            None => self
                .frames
                .clone()
                .context("未提供帧清单：请传入清单文件，或在配置文件中设置 frames"),
        }
    }
}
