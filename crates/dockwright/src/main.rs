mod commands;
mod docker;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dockwright_build::BuildError;
use dockwright_core::BuildConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dockwright")]
#[command(about = "フラグメントから Dockerfile を組み立て、バージョン付きのイメージをリリースする", long_about = None)]
struct Cli {
    /// 設定ファイル（省略時は DOCKWRIGHT_CONFIG → dockwright.local.kdl → dockwright.kdl）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// フラグメントから Dockerfile を合成
    Compose,
    /// レジストリの既存タグから次のバージョンを表示
    #[command(name = "next-version")]
    NextVersion {
        /// 解決の詳細を JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// Dockerfile を合成し、次のバージョンでイメージをビルド
    Build {
        /// ビルド後にレジストリへプッシュ
        #[arg(long)]
        push: bool,
        /// ビルド前にソースを shallow clone
        #[arg(long)]
        clone: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("dockwright {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let start = chrono::Local::now();
    tracing::info!("Starting at {}", start.format("%Y-%m-%d %H:%M:%S%.3f"));

    let result = run(cli).await;

    let end = chrono::Local::now();
    let elapsed = (end - start).num_milliseconds() as f64 / 1000.0;

    match result {
        Ok(()) => {
            tracing::info!(
                "Completed at {} in {:.3}s",
                end.format("%Y-%m-%d %H:%M:%S%.3f"),
                elapsed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            tracing::info!(
                "Failed at {} after {:.3}s",
                end.format("%Y-%m-%d %H:%M:%S%.3f"),
                elapsed
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compose => {
            commands::compose::handle(&config)?;
        }
        Commands::NextVersion { json } => {
            commands::next_version::handle(&config, json).await?;
        }
        Commands::Build { push, clone } => {
            commands::build::handle(&config, push, clone).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BuildConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => dockwright_core::find_config_file()?,
    };
    tracing::debug!(config = %path.display(), "Loading config");

    dockwright_core::parse_kdl_file(&path)
        .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))
}

/// エラーチェーン（ビルド失敗時はビルドログも）を表示
fn report_error(error: &anyhow::Error) {
    let build_error = error.downcast_ref::<BuildError>();

    if let Some(log) = build_error.and_then(BuildError::build_log) {
        eprintln!();
        eprintln!("{}", "ビルドログ:".yellow());
        for line in log {
            eprintln!("  {}", line.red());
        }
    }

    eprintln!();
    match build_error {
        Some(e) => eprintln!("{} {}", "Error:".red().bold(), e.user_message().red()),
        None => eprintln!("{} {}", "Error:".red().bold(), error.to_string().red()),
    }
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "原因:".yellow(), cause.to_string().red());
    }
}
