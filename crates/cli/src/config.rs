//! # CLI設定
//!
//! コマンドライン引数と環境変数から読み込み設定を組み立てる。
//! 引数が優先され、未指定の項目は環境変数、最後にデフォルト値を使う。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use datapack_core::{ByteSource, FileSource, HttpSource};

/// HTTP取得のデフォルトタイムアウト（秒）
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Blobの取得元。呼び出し側が明示的に選ぶ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// `http://` / `https://` のベースURL
    Http(String),
    /// パッケージを含むローカルディレクトリ
    Dir(PathBuf),
}

impl SourceSpec {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            SourceSpec::Http(s.to_string())
        } else {
            SourceSpec::Dir(PathBuf::from(s))
        }
    }

    /// 対応するByte sourceを構築する。
    pub fn build(&self, timeout: Duration) -> anyhow::Result<Arc<dyn ByteSource>> {
        let source: Arc<dyn ByteSource> = match self {
            SourceSpec::Http(base_url) => {
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                Arc::new(HttpSource::with_client(base_url.clone(), client))
            }
            SourceSpec::Dir(dir) => Arc::new(FileSource::new(dir.clone())),
        };
        Ok(source)
    }
}

/// `unpack` サブコマンドの解決済み設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackConfig {
    pub source: SourceSpec,
    pub out_dir: PathBuf,
    pub http_timeout: Duration,
}

impl UnpackConfig {
    /// 引数と環境変数（`DATAPACK_SOURCE`, `DATAPACK_HTTP_TIMEOUT_SECS`）から解決する。
    pub fn resolve(
        source: Option<String>,
        out_dir: PathBuf,
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<Self> {
        let source = source
            .or_else(|| std::env::var("DATAPACK_SOURCE").ok())
            .ok_or_else(|| {
                anyhow::anyhow!("--source または DATAPACK_SOURCE を指定してください")
            })?;

        let timeout_secs = match timeout_secs {
            Some(secs) => secs,
            None => match std::env::var("DATAPACK_HTTP_TIMEOUT_SECS") {
                Ok(v) => v.parse().map_err(|_| {
                    anyhow::anyhow!("DATAPACK_HTTP_TIMEOUT_SECSは整数である必要があります: {v}")
                })?,
                Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
            },
        };

        Ok(Self {
            source: SourceSpec::parse(&source),
            out_dir,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_spec_parse() {
        assert_eq!(
            SourceSpec::parse("https://cdn.example.com/packaged_data"),
            SourceSpec::Http("https://cdn.example.com/packaged_data".to_string())
        );
        assert_eq!(
            SourceSpec::parse("./packaged_data"),
            SourceSpec::Dir(PathBuf::from("./packaged_data"))
        );
    }

    /// 引数で指定された値は環境変数より優先される
    #[test]
    fn test_resolve_explicit_args() {
        let config = UnpackConfig::resolve(
            Some("http://localhost:8000".to_string()),
            PathBuf::from("out"),
            Some(5),
        )
        .unwrap();
        assert_eq!(config.source, SourceSpec::Http("http://localhost:8000".to_string()));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_build_dir_source() {
        let spec = SourceSpec::Dir(PathBuf::from("/tmp/packages"));
        let source = spec.build(Duration::from_secs(1)).unwrap();
        assert_eq!(source.describe("a.data"), "file:///tmp/packages/a.data");
    }
}
