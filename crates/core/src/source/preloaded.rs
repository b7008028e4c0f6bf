//! # 事前読み込み済み byte source
//!
//! ホストが既に手元に持っているBlobを名前で登録しておき、ネットワークや
//! ディスクを経由せずに返す。

use std::collections::HashMap;

use crate::blob::PackedBlob;
use crate::error::LoadError;
use crate::progress::ProgressReporter;

use super::{ByteSource, FetchRequest};

/// メモリ上に登録済みのBlobを返すソース。
#[derive(Default)]
pub struct PreloadedSource {
    packages: HashMap<String, PackedBlob>,
}

impl PreloadedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` に対するBlobを登録する。
    pub fn insert(&mut self, name: impl Into<String>, blob: impl Into<PackedBlob>) {
        self.packages.insert(name.into(), blob.into());
    }

    /// 登録済みBlobを1つ持つソースを作る。
    pub fn single(name: impl Into<String>, blob: impl Into<PackedBlob>) -> Self {
        let mut source = Self::new();
        source.insert(name, blob);
        source
    }
}

#[async_trait::async_trait]
impl ByteSource for PreloadedSource {
    fn describe(&self, name: &str) -> String {
        format!("preloaded:{name}")
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressReporter,
    ) -> Result<PackedBlob, LoadError> {
        let blob = self.packages.get(&request.name).cloned().ok_or_else(|| {
            LoadError::retrieval(
                self.describe(&request.name),
                "事前読み込みされたパッケージが登録されていません",
            )
        })?;
        progress.complete(blob.len() as u64);
        Ok(blob)
    }
}
