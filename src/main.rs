use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use dc_notification_service::notification::{
    DebugTrail, FetchGuard, LocalFileSink, NotificationContent, NotificationDispatcher, StdoutSink,
};
use dc_notification_service::{FixtureCore, NotificationService, ServiceConfig, ServiceOutcome};

#[derive(Parser)]
#[command(name = "dc-nse")]
#[command(about = "Delta Chat 通知服务扩展 - 拉取多账户消息并生成一条通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 模拟一次推送唤醒
    Run(RunArgs),
    /// 查看调试足迹
    Trail {
        /// 显示条数
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// JSON 输出
        #[arg(long)]
        json: bool,
        /// 配置文件路径
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 清除拉取互斥
    ResetGuard {
        /// 配置文件路径
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// 核心库 fixture（JSON）
    #[arg(long)]
    fixture: PathBuf,
    /// 后台拉取时限（秒），覆盖配置
    #[arg(long)]
    timeout: Option<f64>,
    /// 宿主硬时限（秒），到期后使用 best-attempt 内容
    #[arg(long, default_value = "30")]
    deadline: f64,
    /// best-attempt 标题
    #[arg(long, default_value = "Delta Chat")]
    title: String,
    /// best-attempt 正文
    #[arg(long, default_value = "You have new messages")]
    body: String,
    /// 额外写入 JSONL 文件
    #[arg(long)]
    out: Option<PathBuf>,
    /// 不实际投递
    #[arg(long)]
    dry_run: bool,
    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::load_from(path),
        None => ServiceConfig::load(),
    }
}

/// 宿主兜底：原样输出 best-attempt 内容
fn deliver_fallback(content: &NotificationContent) -> Result<()> {
    println!("{}", serde_json::to_string(content)?);
    Ok(())
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(timeout) = args.timeout {
        config.fetch_timeout_secs = timeout;
    }

    let core = FixtureCore::from_file(&args.fixture)?;
    let mut dispatcher = NotificationDispatcher::new().with_dry_run(args.dry_run);
    dispatcher.register_sink(Arc::new(StdoutSink::new()));
    if let Some(out) = &args.out {
        dispatcher.register_sink(Arc::new(LocalFileSink::new(out)));
    }

    let best_attempt = NotificationContent::new(args.title, args.body);
    let fallback = best_attempt.clone();
    let mut service = NotificationService::new(core, dispatcher, config);
    let expiry = service.expiry_handle();

    let task = tokio::task::spawn_blocking(move || service.did_receive(&best_attempt));
    let deadline = Duration::from_secs_f64(args.deadline.max(0.0).min(3600.0));
    match tokio::time::timeout(deadline, task).await {
        Ok(joined) => match joined?? {
            ServiceOutcome::Aborted(reason) => {
                warn!(reason = %reason, "Service produced nothing, host falls back");
                deliver_fallback(&fallback)?;
            }
            outcome => info!(?outcome, "Notification delivered"),
        },
        Err(_) => {
            expiry.time_will_expire();
            deliver_fallback(&fallback)?;
            // 宿主到期后直接结束扩展进程
            std::process::exit(0);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dc_notification_service=info,dc_nse=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => handle_run(args).await?,
        Commands::Trail { limit, json, config } => {
            let config = load_config(config.as_ref())?;
            let entries = DebugTrail::in_dir(&config.state_dir()).read_recent(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("没有调试足迹");
            } else {
                for entry in entries {
                    println!(
                        "{}  {:<14} {}",
                        entry.ts.format("%Y-%m-%d %H:%M:%S"),
                        entry.code,
                        entry.detail.unwrap_or_default()
                    );
                }
            }
        }
        Commands::ResetGuard { config } => {
            let config = load_config(config.as_ref())?;
            FetchGuard::in_dir(&config.state_dir()).done()?;
            println!("拉取互斥已清除");
        }
    }

    Ok(())
}
