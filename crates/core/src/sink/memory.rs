//! # メモリSink
//!
//! 受け取った `BlobSlice` をコピーせずそのまま保持する。
//! ホストアプリケーションがプロセス内で資産を参照する場合やテストで使う。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use crate::blob::BlobSlice;
use crate::error::LoadError;

use super::{path_prefixes, FsSink};

/// メモリ上の仮想ファイルシステム。
#[derive(Default)]
pub struct MemorySink {
    files: RwLock<BTreeMap<String, BlobSlice>>,
    directories: RwLock<BTreeSet<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `path` の内容を返す。
    pub fn read(&self, path: &str) -> Option<BlobSlice> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// 作成済みファイルのパス一覧（ソート済み）。
    pub fn files(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// 作成済みディレクトリのパス一覧（ソート済み）。
    pub fn directories(&self) -> Vec<String> {
        self.directories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// ファイルもディレクトリも1つも作成されていないか。
    pub fn is_empty(&self) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
            && self
                .directories
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    fn has_parent(&self, path: &str) -> bool {
        match path.rfind('/') {
            Some(0) => true,
            Some(idx) => self
                .directories
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&path[..idx]),
            None => false,
        }
    }
}

impl FsSink for MemorySink {
    fn create_directory(&self, path: &str) -> Result<(), LoadError> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let mut directories = self
            .directories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for prefix in path_prefixes(path) {
            if files.contains_key(&prefix) {
                return Err(LoadError::sink(
                    prefix,
                    "同名のファイルが存在するためディレクトリを作成できません",
                ));
            }
            directories.insert(prefix);
        }
        Ok(())
    }

    fn create_file(&self, path: &str, contents: BlobSlice) -> Result<(), LoadError> {
        if !self.has_parent(path) {
            return Err(LoadError::sink(path, "親ディレクトリが存在しません"));
        }
        if self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
        {
            return Err(LoadError::sink(path, "同名のディレクトリが存在します"));
        }
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), contents);
        Ok(())
    }
}
