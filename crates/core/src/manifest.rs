//! # マニフェスト
//!
//! パック済みBlob内の名前付きバイト範囲の一覧。構築時に検証され、以後は不変。
//!
//! ## 不変条件
//! - エントリは1件以上
//! - 各範囲は `0 <= start < end <= total_size`
//! - 範囲同士は重ならない（連続している必要はない）
//! - 名前は `/` で始まる正規の仮想パスで、マニフェスト内で一意

use std::collections::{BTreeSet, HashSet};

use datapack_types::{FileRecord, PackageDescriptor, PackageMetadata};

use crate::error::LoadError;

/// マニフェストの1エントリ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 仮想ファイルシステム上の絶対パス
    pub name: String,
    /// 開始オフセット（含む）
    pub start: u64,
    /// 終了オフセット（含まない）
    pub end: u64,
    /// ストリーミング再生対象か（読み込み動作には影響しない）
    pub is_streamable: bool,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            is_streamable: false,
        }
    }

    /// エントリのバイト数。
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// 親ディレクトリのパス。ルート直下なら `None`。
    pub fn parent(&self) -> Option<&str> {
        match self.name.rfind('/') {
            Some(0) | None => None,
            Some(idx) => Some(&self.name[..idx]),
        }
    }
}

impl From<&FileRecord> for ManifestEntry {
    fn from(record: &FileRecord) -> Self {
        Self {
            name: record.filename.clone(),
            start: record.start,
            end: record.end,
            is_streamable: record.audio != 0,
        }
    }
}

/// 検証済みマニフェスト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    total_size: u64,
}

impl Manifest {
    /// エントリ一覧と総サイズからマニフェストを構築する。
    ///
    /// 不変条件に違反する場合は `LoadError::InvalidManifest` を返す。
    pub fn new(entries: Vec<ManifestEntry>, total_size: u64) -> Result<Self, LoadError> {
        if entries.is_empty() {
            return Err(LoadError::InvalidManifest(
                "エントリが1件もありません".to_string(),
            ));
        }

        let mut names = HashSet::with_capacity(entries.len());
        for entry in &entries {
            validate_path(&entry.name)?;
            if entry.start >= entry.end {
                return Err(LoadError::InvalidManifest(format!(
                    "空の範囲です: {} [{}, {})",
                    entry.name, entry.start, entry.end
                )));
            }
            if entry.end > total_size {
                return Err(LoadError::InvalidManifest(format!(
                    "範囲がパッケージサイズを超えています: {} [{}, {}) > {total_size}",
                    entry.name, entry.start, entry.end
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(LoadError::InvalidManifest(format!(
                    "名前が重複しています: {}",
                    entry.name
                )));
            }
        }

        // ファイル名が他エントリの祖先ディレクトリを兼ねることはできない
        for entry in &entries {
            let ancestors = entry
                .name
                .match_indices('/')
                .map(|(idx, _)| &entry.name[..idx])
                .filter(|prefix| !prefix.is_empty());
            for ancestor in ancestors {
                if names.contains(ancestor) {
                    return Err(LoadError::InvalidManifest(format!(
                        "ファイル名がディレクトリと衝突しています: {ancestor} ({})",
                        entry.name
                    )));
                }
            }
        }

        // 名前順とオフセット順は一致しないことがあるため、ソートして隣接比較する
        let mut by_offset: Vec<&ManifestEntry> = entries.iter().collect();
        by_offset.sort_by_key(|e| (e.start, e.end));
        for pair in by_offset.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(LoadError::InvalidManifest(format!(
                    "範囲が重なっています: {} と {}",
                    pair[0].name, pair[1].name
                )));
            }
        }

        Ok(Self {
            entries,
            total_size,
        })
    }

    /// ワイヤ形式のメタデータから構築する。
    pub fn from_metadata(metadata: &PackageMetadata) -> Result<Self, LoadError> {
        let entries = metadata.files.iter().map(ManifestEntry::from).collect();
        Self::new(entries, metadata.remote_package_size)
    }

    /// `{"files": [...], "remote_package_size": N}` 形式のJSONから構築する。
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let metadata: PackageMetadata = serde_json::from_str(json)
            .map_err(|e| LoadError::InvalidManifest(format!("JSONのパースに失敗: {e}")))?;
        Self::from_metadata(&metadata)
    }

    /// マニフェスト順のエントリ一覧。
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// パック済みBlobの総バイト数。
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// 全エントリの祖先ディレクトリ。親が子より先に並び、ルートは含まない。
    pub fn directories(&self) -> Vec<String> {
        let mut dirs = BTreeSet::new();
        for entry in &self.entries {
            let mut current = entry.parent();
            while let Some(dir) = current {
                if !dirs.insert(dir.to_string()) {
                    break;
                }
                current = match dir.rfind('/') {
                    Some(0) | None => None,
                    Some(idx) => Some(&dir[..idx]),
                };
            }
        }
        // BTreeSetの辞書順では "/a" が "/a/b" より必ず先に来る
        dirs.into_iter().collect()
    }
}

/// 名前付きの検証済みマニフェスト。ローダーの読み込み単位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// パッケージ名。依存トークン `datafile_<name>` のキーになる。
    pub name: String,
    /// Byte sourceに渡すリソース名
    pub remote_base: String,
    /// マニフェスト
    pub manifest: Manifest,
}

impl Package {
    /// パッケージ名とリソース名が同じパッケージを作る。
    pub fn new(name: impl Into<String>, manifest: Manifest) -> Self {
        let name = name.into();
        Self {
            remote_base: name.clone(),
            name,
            manifest,
        }
    }

    /// リソース名を差し替える。
    pub fn with_remote_base(mut self, remote_base: impl Into<String>) -> Self {
        self.remote_base = remote_base.into();
        self
    }

    /// ワイヤ形式の記述子から構築する。マニフェストはここで検証される。
    pub fn from_descriptor(descriptor: &PackageDescriptor) -> Result<Self, LoadError> {
        Ok(Self {
            name: descriptor.package_name.clone(),
            remote_base: descriptor.remote_package_base.clone(),
            manifest: Manifest::from_metadata(&descriptor.metadata)?,
        })
    }
}

fn validate_path(name: &str) -> Result<(), LoadError> {
    let rest = name.strip_prefix('/').ok_or_else(|| {
        LoadError::InvalidManifest(format!("絶対パスではありません: {name:?}"))
    })?;
    if rest.is_empty() {
        return Err(LoadError::InvalidManifest(
            "ルートディレクトリはファイル名にできません".to_string(),
        ));
    }
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(LoadError::InvalidManifest(format!(
                "不正なパス要素を含みます: {name:?}"
            )));
        }
    }
    Ok(())
}
