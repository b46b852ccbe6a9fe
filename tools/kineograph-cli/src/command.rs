//! # Command 模块
//!
//! 交互模式下从标准输入读取的控制命令。
//!
//! ```text
//! play [name] [loops] [fps]   入队（loops 为 0 表示无限循环）
//! next                        跳到队列中的下一个
//! unloop                      播完当前一遍后结束循环
//! stop [clear]                硬停止，可选清空队列
//! fps <rate>                  设置全局帧率
//! enable / disable            启用 / 禁用控制接口
//! status                      查看状态
//! help                        帮助
//! quit                        退出
//! ```

use anyhow::{Context, Result, bail};
use kineograph::{DEFAULT_ANIMATION, LoopCount};

pub const HELP: &str = "\
命令:
  play [name] [loops] [fps]   入队（loops 为 0 表示无限循环）
  next                        跳到队列中的下一个
  unloop                      播完当前一遍后结束循环
  stop [clear]                硬停止，可选清空队列
  fps <rate>                  设置全局帧率
  enable | disable            启用 / 禁用控制接口
  status                      查看状态
  quit                        退出";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play {
        name: String,
        loops: LoopCount,
        fps: Option<f64>,
    },
    Next,
    Unloop,
    Stop {
        clear: bool,
    },
    Fps(f64),
    Enable,
    Disable,
    Status,
    Help,
    Quit,
}

impl Command {
    /// 解析一行输入，空行返回 `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "play" | "p" => {
                let name = args.first().copied().unwrap_or(DEFAULT_ANIMATION).to_string();
                let loops = match args.get(1) {
                    Some(raw) => LoopCount::from_f64(parse_number(raw, "循环次数")?),
                    None => LoopCount::ONCE,
                };
                let fps = args.get(2).map(|raw| parse_number(raw, "帧率")).transpose()?;
                Self::Play { name, loops, fps }
            }
            "next" | "n" => Self::Next,
            "unloop" | "u" => Self::Unloop,
            "stop" | "s" => match args.first() {
                None => Self::Stop { clear: false },
                Some(&"clear") => Self::Stop { clear: true },
                Some(other) => bail!("未知的 stop 参数: {other}"),
            },
            "fps" => {
                let raw = args.first().context("fps 需要一个数值")?;
                Self::Fps(parse_number(raw, "帧率")?)
            }
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "status" | "st" => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("未知命令: {other}（输入 help 查看帮助）"),
        };
        Ok(Some(command))
    }
}

fn parse_number(raw: &str, what: &str) -> Result<f64> {
    raw.parse()
        .with_context(|| format!("{what}不是有效数字: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        assert_eq!(
            Command::parse("play run 3 12").unwrap(),
            Some(Command::Play {
                name: "run".to_string(),
                loops: LoopCount::times(3),
                fps: Some(12.0),
            })
        );
        assert_eq!(
            Command::parse("play").unwrap(),
            Some(Command::Play {
                name: "_default".to_string(),
                loops: LoopCount::ONCE,
                fps: None,
            })
        );
        assert_eq!(
            Command::parse("PLAY spin 0").unwrap(),
            Some(Command::Play {
                name: "spin".to_string(),
                loops: LoopCount::Indefinite,
                fps: None,
            })
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("  ").unwrap(), None);
        assert_eq!(Command::parse("next").unwrap(), Some(Command::Next));
        assert_eq!(Command::parse("unloop").unwrap(), Some(Command::Unloop));
        assert_eq!(
            Command::parse("stop").unwrap(),
            Some(Command::Stop { clear: false })
        );
        assert_eq!(
            Command::parse("stop clear").unwrap(),
            Some(Command::Stop { clear: true })
        );
        assert_eq!(Command::parse("fps 30").unwrap(), Some(Command::Fps(30.0)));
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("fps").is_err());
        assert!(Command::parse("fps fast").is_err());
        assert!(Command::parse("stop now").is_err());
        assert!(Command::parse("jump").is_err());
    }
}
