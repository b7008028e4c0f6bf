//! # HTTP byte source
//!
//! `{base_url}/{name}` をGETし、チャンク単位で受信しながら進捗を報告する。

use crate::blob::PackedBlob;
use crate::error::LoadError;
use crate::progress::ProgressReporter;

use super::{ByteSource, FetchRequest};

/// 事前確保するバッファの上限（64MB）。これを超える分は受信に応じて伸長する。
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

/// URL経由でBlobを取得するソース。
///
/// 200 / 206 / 304 を成功として扱い、それ以外のステータスは取得失敗とする。
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// デフォルト設定のクライアントで作成する。
    ///
    /// # 引数
    /// - `base_url`: パッケージ配置先のベースURL（例: "https://cdn.example.com/packaged_data"）
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// タイムアウト等を設定済みのクライアントで作成する。
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, name: &str) -> String {
        if name.starts_with("http://") || name.starts_with("https://") {
            return name.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }
}

fn is_success(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 206 | 304)
}

/// 宣言サイズを超えたレスポンスは受信を打ち切る。
fn oversized(url: &str, len: u64, expected: u64) -> LoadError {
    LoadError::CorruptPackage(format!(
        "{url}: レスポンスが宣言サイズを超えています ({len} > {expected})"
    ))
}

#[async_trait::async_trait]
impl ByteSource for HttpSource {
    fn describe(&self, name: &str) -> String {
        self.url_for(name)
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressReporter,
    ) -> Result<PackedBlob, LoadError> {
        let url = self.url_for(&request.name);
        tracing::debug!(url = %url, expected_size = request.expected_size, "パッケージを取得中");

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::retrieval(&url, e))?;

        let status = response.status();
        if !is_success(status) {
            return Err(LoadError::retrieval(
                &url,
                format!("HTTPエラー: ステータス {status}"),
            ));
        }

        let total = response.content_length();
        if let Some(len) = total.filter(|len| *len > request.expected_size) {
            return Err(oversized(&url, len, request.expected_size));
        }
        let capacity = total
            .unwrap_or(request.expected_size)
            .min(MAX_PREALLOC_BYTES);
        let mut bytes = Vec::with_capacity(capacity as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LoadError::retrieval(&url, e))?
        {
            bytes.extend_from_slice(&chunk);
            let received = bytes.len() as u64;
            if received > request.expected_size {
                return Err(oversized(&url, received, request.expected_size));
            }
            progress.report(received, total);
        }

        tracing::debug!(url = %url, len = bytes.len(), "パッケージ取得完了");
        Ok(PackedBlob::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let source = HttpSource::new("http://localhost:8000/packaged_data/");
        assert_eq!(
            source.url_for("/ExportBunny.data"),
            "http://localhost:8000/packaged_data/ExportBunny.data"
        );
        assert_eq!(
            source.url_for("PBR_Examples.data"),
            "http://localhost:8000/packaged_data/PBR_Examples.data"
        );
    }

    /// locate_fileで絶対URLに書き換えられた名前はそのまま使う
    #[test]
    fn test_url_for_absolute_name() {
        let source = HttpSource::new("http://localhost:8000");
        assert_eq!(
            source.url_for("https://cdn.example.com/a.data"),
            "https://cdn.example.com/a.data"
        );
    }

    #[test]
    fn test_accepted_statuses() {
        assert!(is_success(reqwest::StatusCode::OK));
        assert!(is_success(reqwest::StatusCode::PARTIAL_CONTENT));
        assert!(is_success(reqwest::StatusCode::NOT_MODIFIED));
        assert!(!is_success(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_success(reqwest::StatusCode::NO_CONTENT));
    }
}
