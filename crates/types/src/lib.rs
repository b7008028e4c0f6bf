//! # datapack 共有型定義
//!
//! パッケージローダーが扱うマニフェストのワイヤ形式をRust構造体として提供する。
//!
//! ## フォーマット
//! - `PackageMetadata`: `{"files": [...], "remote_package_size": N}`
//! - `PackageDescriptor`: パッケージ名・リモート名・メタデータの組

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// マニフェスト (ワイヤ形式)
// ---------------------------------------------------------------------------

/// パック済みBlob内の1ファイル分のバイト範囲。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// 仮想ファイルシステム上の絶対パス（例: "/ExportBunny/ExportBunny_0.vtp"）
    pub filename: String,
    /// Blob内の開始オフセット（含む）
    pub start: u64,
    /// Blob内の終了オフセット（含まない）
    pub end: u64,
    /// ストリーミング再生対象フラグ（非0で有効）。省略時は0。
    #[serde(default, skip_serializing_if = "is_zero")]
    pub audio: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

/// パッケージのメタデータ。ローダースクリプトの `loadPackage(...)` 引数と同形式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// ファイル一覧（マニフェスト順）
    pub files: Vec<FileRecord>,
    /// パック済みBlobの総バイト数
    pub remote_package_size: u64,
}

// ---------------------------------------------------------------------------
// パッケージ記述子
// ---------------------------------------------------------------------------

/// 1パッケージを読み込むために必要な情報一式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// パッケージ名（例: "packaged_data/ExportBunny.data"）。
    /// パッケージ単位の依存トークン `datafile_<package_name>` のキーになる。
    pub package_name: String,
    /// Byte sourceに渡すリソース名（例: "ExportBunny.data"）
    pub remote_package_base: String,
    /// マニフェスト本体
    pub metadata: PackageMetadata,
}

impl PackageDescriptor {
    /// メタデータのみからパッケージ記述子を組み立てる。
    /// `package_name` と `remote_package_base` は同じ値を使う。
    pub fn from_metadata(name: impl Into<String>, metadata: PackageMetadata) -> Self {
        let name = name.into();
        Self {
            package_name: name.clone(),
            remote_package_base: name,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 生成済みローダーが埋め込むJSONをそのままデシリアライズできることを確認
    #[test]
    fn test_metadata_from_loader_json() {
        let json = r#"{"files": [
            {"filename": "/Skyboxes/wintersun.jpg", "start": 0, "end": 183016},
            {"filename": "/Audio/theme.ogg", "start": 183016, "end": 200000, "audio": 1}
        ], "remote_package_size": 200000}"#;

        let metadata: PackageMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.files.len(), 2);
        assert_eq!(metadata.files[0].audio, 0);
        assert_eq!(metadata.files[1].audio, 1);
        assert_eq!(metadata.remote_package_size, 200000);
    }

    /// audio=0はシリアライズ時に省略される
    #[test]
    fn test_audio_zero_is_omitted() {
        let record = FileRecord {
            filename: "/a".to_string(),
            start: 0,
            end: 3,
            audio: 0,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("audio").is_none());
    }

    #[test]
    fn test_descriptor_from_metadata() {
        let metadata = PackageMetadata {
            files: vec![],
            remote_package_size: 0,
        };
        let desc = PackageDescriptor::from_metadata("assets.data", metadata);
        assert_eq!(desc.package_name, "assets.data");
        assert_eq!(desc.remote_package_base, "assets.data");
    }
}
