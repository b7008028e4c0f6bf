//! # パッケージローダー
//!
//! 1つのマニフェストと1つのByte sourceから、Sink上の仮想ファイル群を組み立てる。
//!
//! ## 読み込みシーケンス
//! 1. ファイルごとの `fp <name>` とパッケージの `datafile_<name>` を登録
//! 2. Byte sourceからBlobを1回だけ取得（唯一の待機点、リトライなし）
//! 3. Blob長とマニフェストの総サイズ、各範囲を検証
//! 4. キャンセルを確認
//! 5. ディレクトリを作成し、マニフェスト順にファイルを書き込んで `fp <name>` を解除
//! 6. `datafile_<name>` を解除して完了を返す
//!
//! 取得・検証・キャンセルで失敗した場合、Sinkには何も書き込まれない。
//! 書き込み途中でSinkが失敗した場合、作成済みのファイルはそのまま残る（ロールバックしない）。
//! 失敗したパッケージのトークンは解除されない。

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::blob::BlobSlice;
use crate::cancel::CancelToken;
use crate::dependency::{file_token, package_token, RunDependencies};
use crate::error::LoadError;
use crate::manifest::{ManifestEntry, Package};
use crate::progress::DownloadProgress;
use crate::sink::FsSink;
use crate::source::{ByteSource, FetchRequest};


/// リソース名をByte sourceに渡す前に書き換える関数。
pub type Locator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 1パッケージ分の読み込み結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// パッケージ名
    pub package_name: String,
    /// 取得元URI（`ByteSource::describe` の結果）
    pub source: String,
    /// 作成したファイル数
    pub files: usize,
    /// 作成したファイルの合計バイト数
    pub bytes: u64,
    /// 取得したBlobのSHA-256（hex）
    pub blob_sha256: String,
}

/// `load_all` に渡す1パッケージ分のジョブ。
pub struct LoadJob {
    pub package: Package,
    pub source: Arc<dyn ByteSource>,
}

/// パッケージローダー。
///
/// 依存トークンと進捗集計器はインスタンスが保持し、複製したローダー間で共有される。
#[derive(Clone, Default)]
pub struct PackageLoader {
    dependencies: Arc<RunDependencies>,
    progress: Arc<DownloadProgress>,
    locator: Option<Locator>,
    cancel: Option<CancelToken>,
}

impl PackageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// ホストと共有する依存トークン集合を使う。
    pub fn with_dependencies(mut self, dependencies: Arc<RunDependencies>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// ホストと共有する進捗集計器を使う。
    pub fn with_progress(mut self, progress: Arc<DownloadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// リソース名の書き換え関数を設定する（CDN配置やキャッシュバスター付与など）。
    pub fn with_locator(
        mut self,
        locator: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.locator = Some(Arc::new(locator));
        self
    }

    /// 書き込み開始前に確認するキャンセルトークンを設定する。
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn dependencies(&self) -> &Arc<RunDependencies> {
        &self.dependencies
    }

    pub fn progress(&self) -> &Arc<DownloadProgress> {
        &self.progress
    }

    fn locate(&self, remote_base: &str) -> String {
        match &self.locator {
            Some(locate) => locate(remote_base),
            None => remote_base.to_string(),
        }
    }

    /// パッケージを読み込み、全ファイルを `sink` に書き込む。
    pub async fn load(
        &self,
        package: &Package,
        source: &dyn ByteSource,
        sink: &dyn FsSink,
    ) -> Result<LoadOutcome, LoadError> {
        let result = self.load_inner(package, source, sink).await;
        match &result {
            Ok(outcome) => tracing::info!(
                package = %outcome.package_name,
                source = %outcome.source,
                files = outcome.files,
                bytes = outcome.bytes,
                "パッケージ読み込み完了"
            ),
            Err(e) => tracing::error!(
                package = %package.name,
                error = %e,
                "パッケージ読み込みに失敗"
            ),
        }
        result
    }

    async fn load_inner(
        &self,
        package: &Package,
        source: &dyn ByteSource,
        sink: &dyn FsSink,
    ) -> Result<LoadOutcome, LoadError> {
        let manifest = &package.manifest;
        let package_key = package_token(&package.name);

        for entry in manifest.entries() {
            self.dependencies.add(file_token(&entry.name));
        }
        self.dependencies.add(package_key.clone());
        self.progress.expect_download();

        let request = FetchRequest {
            name: self.locate(&package.remote_base),
            expected_size: manifest.total_size(),
        };
        let resource = source.describe(&request.name);
        tracing::info!(
            package = %package.name,
            source = %resource,
            files = manifest.len(),
            total_size = manifest.total_size(),
            "パッケージ読み込み開始"
        );

        let reporter = self.progress.reporter(resource.clone(), manifest.total_size());
        let blob = source.fetch(&request, &reporter).await?;

        if blob.len() as u64 != manifest.total_size() {
            return Err(LoadError::CorruptPackage(format!(
                "Blob長が一致しません: 期待値 {} バイト, 実際 {} バイト ({resource})",
                manifest.total_size(),
                blob.len()
            )));
        }

        // 書き込み前に全範囲を切り出し、Sinkに触れる前に検証を終える
        let slices = manifest
            .entries()
            .iter()
            .map(|entry| {
                blob.slice(entry.start..entry.end)
                    .map(|slice| (entry, slice))
                    .ok_or_else(|| {
                        LoadError::CorruptPackage(format!(
                            "範囲がBlob外です: {} [{}, {})",
                            entry.name, entry.start, entry.end
                        ))
                    })
            })
            .collect::<Result<Vec<(&ManifestEntry, BlobSlice)>, LoadError>>()?;

        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(LoadError::Cancelled);
        }

        for dir in manifest.directories() {
            sink.create_directory(&dir)?;
        }

        let mut bytes = 0u64;
        for (entry, slice) in slices {
            sink.create_file(&entry.name, slice)?;
            self.dependencies.remove(&file_token(&entry.name));
            bytes += entry.len();
            tracing::trace!(file = %entry.name, len = entry.len(), "ファイルを作成");
        }

        self.dependencies.remove(&package_key);

        Ok(LoadOutcome {
            package_name: package.name.clone(),
            source: resource,
            files: manifest.len(),
            bytes,
            blob_sha256: blob.sha256_hex(),
        })
    }

    /// 複数パッケージを並行に読み込み、1つのSinkへ書き込む。
    ///
    /// 結果は `jobs` と同じ順序で返す。1つの失敗は他のパッケージに影響しない。
    pub async fn load_all(
        &self,
        jobs: Vec<LoadJob>,
        sink: Arc<dyn FsSink>,
    ) -> Vec<Result<LoadOutcome, LoadError>> {
        let mut results: Vec<Option<Result<LoadOutcome, LoadError>>> =
            (0..jobs.len()).map(|_| None).collect();

        let mut tasks = JoinSet::new();
        for (idx, job) in jobs.into_iter().enumerate() {
            let loader = self.clone();
            let sink = Arc::clone(&sink);
            tasks.spawn(async move {
                let result = loader
                    .load(&job.package, job.source.as_ref(), sink.as_ref())
                    .await;
                (idx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => tracing::error!(error = %e, "読み込みタスクが中断されました"),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or(Err(LoadError::Cancelled)))
            .collect()
    }
}
