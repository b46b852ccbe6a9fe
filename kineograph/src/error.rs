//! # Error 模块
//!
//! 定义 kineograph 中使用的错误类型。
//!
//! 播放过程中不存在可恢复的运行时错误：定时器取消与回调调用都视为不会失败。
//! 唯一的错误来源是配置问题，它们在出错的调用处同步返回。

use thiserror::Error;

/// kineograph 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KineographError {
    /// 请求的动画名未注册
    #[error("动画 '{name}' 不存在")]
    AnimationNotFound { name: String },

    /// 构造输入无法使用
    #[error("无效的帧清单: {message}")]
    InvalidManifest { message: String },
}

impl KineographError {
    /// 创建动画未找到错误
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::AnimationNotFound { name: name.into() }
    }
}

/// Result 类型别名
pub type KineographResult<T> = Result<T, KineographError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KineographError::not_found("run");
        assert_eq!(err.to_string(), "动画 'run' 不存在");

        let err = KineographError::InvalidManifest {
            message: "expected object".to_string(),
        };
        assert!(err.to_string().contains("expected object"));
    }
}
