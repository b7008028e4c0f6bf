//! # Byte source
//!
//! パック済みBlobの取得を抽象化する。どの実装を使うかは呼び出し側が
//! 構築時に選ぶ（ローダー内部で実行環境を判定しない）。
//!
//! ## 実装
//! - `HttpSource`: URL経由でBlobを取得する（逐次進捗あり）
//! - `FileSource`: ローカルディレクトリから読み込む（完了時のみ進捗）
//! - `PreloadedSource`: 事前にメモリへ登録済みのBlobを返す

pub mod file;
pub mod http;
pub mod preloaded;

pub use file::FileSource;
pub use http::HttpSource;
pub use preloaded::PreloadedSource;

use crate::blob::PackedBlob;
use crate::error::LoadError;
use crate::progress::ProgressReporter;

/// Blob取得リクエスト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// リソース名（`locate_file` 適用後）
    pub name: String,
    /// マニフェストが宣言するBlobサイズ
    pub expected_size: u64,
}

/// パック済みBlobを取得するトレイト。
///
/// 1回の読み込みにつき `fetch` は1回だけ呼ばれる。リトライは行わない。
#[async_trait::async_trait]
pub trait ByteSource: Send + Sync {
    /// `name` に対応するソースURI（`LoadOutcome::source` に記録される）。
    fn describe(&self, name: &str) -> String;

    /// Blob全体を取得する。失敗時は `LoadError::Retrieval` を返す。
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressReporter,
    ) -> Result<PackedBlob, LoadError>;
}
