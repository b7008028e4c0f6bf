//! # ローダーエラー型
//!
//! パッケージ読み込みの全段階で共通のエラー型。
//! どのバリアントもそのパッケージにとって終端であり、リトライは行わない。

/// パッケージ読み込みエラー。
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// マニフェストが不正（空範囲、範囲外、重複名、範囲の重なり、不正パス）
    #[error("不正なマニフェスト: {0}")]
    InvalidManifest(String),
    /// Blobの取得に失敗（HTTPエラー、ファイル読み込み失敗）
    #[error("パッケージの取得に失敗 ({resource}): {cause}")]
    Retrieval {
        /// 取得対象のリソース（URLまたはファイルパス）
        resource: String,
        /// 下位層のエラー
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 取得したBlobとマニフェストの不一致（長さ・範囲）
    #[error("パッケージが破損しています: {0}")]
    CorruptPackage(String),
    /// 書き込み先ファイルシステムの操作に失敗
    #[error("ファイルシステムへの書き込みに失敗 ({path}): {cause}")]
    Sink {
        /// 書き込み対象パス
        path: String,
        /// 下位層のエラー
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 書き込み開始前にキャンセルされた
    #[error("読み込みがキャンセルされました")]
    Cancelled,
}

impl LoadError {
    /// 任意のエラーから `Retrieval` を作る。
    pub fn retrieval(
        resource: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LoadError::Retrieval {
            resource: resource.into(),
            cause: cause.into(),
        }
    }

    /// 任意のエラーから `Sink` を作る。
    pub fn sink(
        path: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LoadError::Sink {
            path: path.into(),
            cause: cause.into(),
        }
    }
}
