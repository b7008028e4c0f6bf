//! # ファイルシステム byte source
//!
//! ローカルディレクトリからBlobを読み込む。開発・サーバー実行環境用。

use std::path::PathBuf;

use crate::blob::PackedBlob;
use crate::error::LoadError;
use crate::progress::ProgressReporter;

use super::{ByteSource, FetchRequest};

/// ローカルディレクトリからBlobを読み込むソース。
///
/// ディレクトリ構成: `{dir}/{name}`
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    /// # 引数
    /// - `dir`: パッケージが格納されているディレクトリパス
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl ByteSource for FileSource {
    fn describe(&self, name: &str) -> String {
        format!("file://{}", self.path_for(name).display())
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressReporter,
    ) -> Result<PackedBlob, LoadError> {
        let path = self.path_for(&request.name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::retrieval(path.display().to_string(), e))?;
        progress.complete(bytes.len() as u64);
        Ok(PackedBlob::from(bytes))
    }
}
