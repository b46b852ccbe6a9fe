//! # Kineo
//!
//! kineograph 命令行工具 - 检查帧清单、在虚拟时钟上模拟时间轴、在终端实时播放。
//!
//! ## 用法
//!
//! ```bash
//! # 在项目根目录使用 cargo 运行
//! cargo run -p kineograph-cli -- check frames.json
//! cargo run -p kineograph-cli -- trace frames.json --name run --loops 2 --fps 10
//!
//! # 或安装后直接使用
//! cargo install --path tools/kineograph-cli
//! kineo check frames.json
//! kineo trace frames.json --name spin --loops 0 --unloop-at 450
//! kineo play frames.json --name run --duration-ms 800
//! kineo interactive frames.json
//! ```

mod command;
mod config;
mod surface;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use kineograph::{
    FrameManifest, Kineograph, LoopCount, NullSurface, PlayRequest, PlaybackEvent,
    PlaybackPhase, SchedulerConfig, SharedKineograph, Surface,
};
use tracing::{Level, debug};

use crate::command::{Command, HELP};
use crate::config::CliConfig;
use crate::surface::TerminalSurface;

/// 驱动线程最长睡眠时间
const DRIVER_GRANULARITY: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "kineo")]
#[command(about = "kineograph 命令行工具 - 帧序列动画调度")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：当前目录下的 kineo.json）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖配置中的全局帧率
    #[arg(long, global = true)]
    default_fps: Option<f64>,

    /// 构造时立即显示第一帧
    #[arg(long, global = true)]
    show_first_frame: bool,

    /// 日志详细程度（可重复：-v / -vv / -vvv）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// 只输出错误日志
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 检查帧清单
    Check {
        /// 帧清单文件（省略时使用配置文件中的 frames）
        manifest: Option<PathBuf>,
    },

    /// 在虚拟时钟上运行一次播放并打印时间轴
    Trace(PlayArgs),

    /// 在终端实时播放
    Play(PlayArgs),

    /// 交互模式：从标准输入读取控制命令
    Interactive {
        /// 帧清单文件（省略时使用配置文件中的 frames）
        manifest: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// 帧清单文件（省略时使用配置文件中的 frames）
    manifest: Option<PathBuf>,

    /// 动画名
    #[arg(short, long, default_value = "_default")]
    name: String,

    /// 循环次数，0 表示无限循环
    #[arg(short, long, default_value_t = 1.0, allow_negative_numbers = true)]
    loops: f64,

    /// 帧率
    #[arg(long, conflicts_with = "duration_ms")]
    fps: Option<f64>,

    /// 一遍的目标时长（毫秒），帧率由帧数推出
    #[arg(long)]
    duration_ms: Option<u64>,

    /// 在该时刻（毫秒）调用 unloop
    #[arg(long)]
    unloop_at: Option<u64>,

    /// 最长运行时间（毫秒）
    #[arg(long, default_value_t = 10_000)]
    limit_ms: u64,
}

impl PlayArgs {
    fn request<S: Surface>(&self) -> PlayRequest<S> {
        let request = PlayRequest::new(self.name.as_str()).loops(LoopCount::from_f64(self.loops));
        match (self.fps, self.duration_ms) {
            (Some(rate), _) => request.fps(rate),
            (None, Some(ms)) => request.duration(Duration::from_millis(ms)),
            (None, None) => request,
        }
    }

    fn unloop_at(&self) -> Option<Duration> {
        self.unloop_at.map(Duration::from_millis)
    }

    fn limit(&self) -> Duration {
        Duration::from_millis(self.limit_ms)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(rate) = cli.default_fps {
        config.scheduler.default_fps = rate;
    }
    if cli.show_first_frame {
        config.scheduler.show_first_frame = true;
    }

    match &cli.command {
        Commands::Check { manifest } => check(config.manifest(manifest.as_deref())?),
        Commands::Trace(args) => trace(
            config.manifest(args.manifest.as_deref())?,
            config.scheduler.clone(),
            args,
        ),
        Commands::Play(args) => play(
            config.manifest(args.manifest.as_deref())?,
            config.scheduler.clone(),
            args,
        ),
        Commands::Interactive { manifest } => {
            interactive(config.manifest(manifest.as_deref())?, config.scheduler.clone())
        }
    }
}

// ========== check ==========

fn check(manifest: FrameManifest) -> Result<()> {
    let empty: Vec<String> = manifest
        .empty_sequences()
        .into_iter()
        .map(str::to_string)
        .collect();
    let kineograph = Kineograph::new(NullSurface, manifest.into(), SchedulerConfig::default());

    println!("📋 {} 个动画序列:", kineograph.registry().len());
    for name in kineograph.sequence_names() {
        let count = kineograph.sequence_len(name).unwrap_or(0);
        println!("  {name:<24} {count:>4} 帧");
    }

    if !empty.is_empty() {
        bail!("以下序列没有任何帧: {}", empty.join(", "));
    }
    println!("✅ 清单有效");
    Ok(())
}

// ========== trace ==========

fn trace(manifest: FrameManifest, config: SchedulerConfig, args: &PlayArgs) -> Result<()> {
    let mut kineograph = Kineograph::new(NullSurface, manifest.into(), config);
    kineograph.play(args.request::<NullSurface>())?;
    print_events(kineograph.drain_events());

    let mut unloop_at = args.unloop_at();
    let limit = args.limit();

    while let Some(deadline) = kineograph.next_deadline() {
        if let Some(at) = unloop_at.filter(|at| *at <= deadline) {
            print_events(kineograph.advance_to(at));
            kineograph.unloop();
            println!("{}ms unloop", at.as_millis());
            unloop_at = None;
            continue;
        }
        if deadline > limit {
            println!("⏹ 到达时间上限 {}ms", limit.as_millis());
            break;
        }
        print_events(kineograph.advance_to(deadline));
    }

    Ok(())
}

fn print_events(events: Vec<PlaybackEvent>) {
    for event in events {
        println!("{event}");
    }
}

// ========== play ==========

fn play(manifest: FrameManifest, config: SchedulerConfig, args: &PlayArgs) -> Result<()> {
    let frames = manifest.into();
    let shared = SharedKineograph::new(Kineograph::new(TerminalSurface::new(), frames, config));
    shared.with(|k| k.play(args.request::<TerminalSurface>()).map(|_| ()))?;

    let (tx, rx) = mpsc::channel();
    let driver = shared.spawn_driver(DRIVER_GRANULARITY, move |events| {
        let _ = tx.send(events);
    })?;

    let origin = Instant::now();
    let mut unloop_at = args.unloop_at();
    let limit = args.limit();

    loop {
        let elapsed = origin.elapsed();
        if let Some(at) = unloop_at.filter(|at| *at <= elapsed) {
            shared.with(|k| {
                k.unloop();
            });
            println!("{}ms unloop", at.as_millis());
            unloop_at = None;
        }
        if elapsed >= limit {
            println!("⏹ 到达时间上限 {}ms", limit.as_millis());
            break;
        }
        if shared.lock().phase() == PlaybackPhase::Idle {
            break;
        }

        let wait = unloop_at
            .map_or(limit, |at| at.min(limit))
            .saturating_sub(elapsed)
            .min(DRIVER_GRANULARITY);
        match rx.recv_timeout(wait) {
            Ok(events) => print_status_events(events),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    driver.stop();
    print_status_events(rx.try_iter().flatten().collect());
    let shown = shared.lock().surface().shown();
    debug!(shown = shown, "播放结束");
    Ok(())
}

/// 打印帧以外的事件（帧由 [`TerminalSurface`] 自己打印）
fn print_status_events(events: Vec<PlaybackEvent>) {
    for event in events {
        if event.frame().is_none() {
            println!("{event}");
        }
    }
}

// ========== interactive ==========

fn interactive(manifest: FrameManifest, config: SchedulerConfig) -> Result<()> {
    let frames = manifest.into();
    let shared = SharedKineograph::new(Kineograph::new(TerminalSurface::new(), frames, config));
    let driver = shared.spawn_driver(DRIVER_GRANULARITY, print_status_events)?;

    println!("{HELP}");
    let names: Vec<String> = shared.with(|k| k.sequence_names().map(str::to_string).collect());
    println!("可用动画: {}", names.join(", "));

    for line in io::stdin().lock().lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("⚠️ {e:#}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Status => print_status(&shared.lock()),
            command => {
                if let Err(e) = shared.with(|k| apply(k, command)) {
                    eprintln!("⚠️ {e}");
                }
            }
        }
    }

    driver.stop();
    Ok(())
}

fn apply(kineograph: &mut Kineograph<TerminalSurface>, command: Command) -> Result<()> {
    match command {
        Command::Play { name, loops, fps } => {
            let mut request = PlayRequest::new(name).loops(loops);
            if let Some(rate) = fps {
                request = request.fps(rate);
            }
            kineograph.play(request)?;
        }
        Command::Next => {
            kineograph.next();
        }
        Command::Unloop => {
            kineograph.unloop();
        }
        Command::Stop { clear } => {
            kineograph.stop(clear);
        }
        Command::Fps(rate) => {
            kineograph.fps(rate);
        }
        Command::Enable => {
            kineograph.enable(true);
        }
        Command::Disable => {
            kineograph.enable(false);
        }
        Command::Status | Command::Help | Command::Quit => {}
    }
    Ok(())
}

fn print_status(kineograph: &Kineograph<TerminalSurface>) {
    println!("状态: {:?}", kineograph.phase());
    println!("  启用: {}", kineograph.is_enabled());
    println!("  全局帧率: {}fps", kineograph.default_fps());
    println!("  时钟: {}ms", kineograph.now().as_millis());
    match kineograph.active() {
        Some((id, name)) => {
            let loops = match kineograph.remaining_loops() {
                Some(n) => format!("剩余 {n} 遍"),
                None => "无限循环".to_string(),
            };
            println!("  当前: {name} {id}（{loops}）");
        }
        None => println!("  当前: -"),
    }
    println!("  队列: [{}]", kineograph.queued().join(", "));
    if let Some(frame) = kineograph.shown_frame() {
        println!("  显示: {frame}");
    }
}
