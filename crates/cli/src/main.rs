//! # datapack CLI
//!
//! パッケージマニフェストの確認と、パック済みBlobのディレクトリ展開を行う。
//!
//! ## サブコマンド
//! - `inspect`: マニフェストを検証し、エントリとディレクトリを表示する
//! - `unpack`: Blobを取得し、出力ディレクトリ配下にファイルを展開する

mod config;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use datapack_core::{
    vfs, CancelToken, DownloadProgress, FsSink, LoadJob, PackageLoader, RunDependencies,
    TracingObserver, VfsSink,
};

use crate::config::UnpackConfig;

#[derive(Parser)]
#[command(name = "datapack")]
#[command(about = "Packed asset loader", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストを検証して内容を表示する
    Inspect {
        /// マニフェスト（.json または生成済みローダー .js）
        manifest: PathBuf,
    },

    /// パッケージを取得して出力ディレクトリに展開する
    Unpack {
        /// マニフェスト（複数指定時は並行に読み込む）
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
        /// 取得元（http(s)のベースURL、またはディレクトリ）。未指定時は DATAPACK_SOURCE
        #[arg(short, long)]
        source: Option<String>,
        /// 出力ディレクトリ
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
        /// パッケージ名の上書き（マニフェスト1つの場合のみ）
        #[arg(long)]
        package_name: Option<String>,
        /// リソース名の上書き（マニフェスト1つの場合のみ）
        #[arg(long)]
        remote_base: Option<String>,
        /// HTTPタイムアウト（秒）。未指定時は DATAPACK_HTTP_TIMEOUT_SECS または120
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { manifest } => inspect(manifest),
        Commands::Unpack {
            manifests,
            source,
            out,
            package_name,
            remote_base,
            timeout_secs,
        } => {
            if manifests.len() > 1 && (package_name.is_some() || remote_base.is_some()) {
                anyhow::bail!(
                    "--package-name / --remote-base はマニフェストが1つの場合のみ指定できます"
                );
            }
            let config = UnpackConfig::resolve(source, out, timeout_secs)?;
            unpack(
                manifests,
                config,
                package_name.as_deref(),
                remote_base.as_deref(),
            )
            .await
        }
    }
}

fn inspect(path: PathBuf) -> anyhow::Result<()> {
    let package = input::read_package(&path, None, None)?;
    let manifest = &package.manifest;

    println!("package:     {}", package.name);
    println!("remote:      {}", package.remote_base);
    println!("total size:  {} bytes", manifest.total_size());
    println!("files:       {}", manifest.len());
    println!("directories:");
    for dir in manifest.directories() {
        println!("  {dir}");
    }
    println!("entries:");
    for entry in manifest.entries() {
        let marker = if entry.is_streamable { " (audio)" } else { "" };
        println!(
            "  [{:>10}, {:>10}) {:>10}  {}{marker}",
            entry.start,
            entry.end,
            entry.len(),
            entry.name
        );
    }
    Ok(())
}

async fn unpack(
    paths: Vec<PathBuf>,
    config: UnpackConfig,
    package_name: Option<&str>,
    remote_base: Option<&str>,
) -> anyhow::Result<()> {
    let packages = paths
        .iter()
        .map(|path| input::read_package(path, package_name, remote_base))
        .collect::<anyhow::Result<Vec<_>>>()?;

    std::fs::create_dir_all(&config.out_dir)?;
    let source = config.source.build(config.http_timeout)?;

    let dependencies = Arc::new(RunDependencies::new());
    let progress = Arc::new(DownloadProgress::new().with_observer(Arc::new(TracingObserver)));
    let cancel = CancelToken::new();
    let loader = PackageLoader::new()
        .with_dependencies(Arc::clone(&dependencies))
        .with_progress(progress)
        .with_cancel_token(cancel.clone());

    // Ctrl-Cで書き込み開始前のパッケージを中止する
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("中断要求を受信しました。書き込み前のパッケージを中止します");
            cancel.cancel();
        }
    });

    let sink: Arc<dyn FsSink> = Arc::new(VfsSink::new(vfs::PhysicalFS::new(
        config.out_dir.clone(),
    )));
    tracing::info!(
        out_dir = %config.out_dir.display(),
        packages = packages.len(),
        "展開を開始します"
    );

    let jobs = packages
        .into_iter()
        .map(|package| LoadJob {
            package,
            source: Arc::clone(&source),
        })
        .collect();
    let results = loader.load_all(jobs, sink).await;

    let mut failures = 0;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(outcome) => println!(
                "{}: {} files, {} bytes from {} (sha256 {})",
                outcome.package_name,
                outcome.files,
                outcome.bytes,
                outcome.source,
                outcome.blob_sha256
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e}", path.display());
            }
        }
    }

    if failures > 0 {
        tracing::debug!(pending = ?dependencies.pending_keys(), "未解除の実行依存");
        anyhow::bail!("{failures} 個のパッケージの読み込みに失敗しました");
    }
    Ok(())
}
