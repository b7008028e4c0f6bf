//! # テスト用共通ヘルパー
//!
//! ローダー・Byte sourceのテストで共有するモックサーバーとマニフェスト生成。

use crate::manifest::{Manifest, ManifestEntry, Package};

/// テスト用モックHTTPサーバーを起動し、指定パスで指定データを返す。
/// 未登録のパスには404を返す。
pub async fn start_mock_storage(path: &str, data: Vec<u8>) -> u16 {
    use axum::routing::get;

    let app = axum::Router::new().route(
        path,
        get(move || {
            let d = data.clone();
            async move { d }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}

/// `(name, len)` の並びから連続したマニフェストを持つパッケージを作る。
pub fn contiguous_package(package_name: &str, files: &[(&str, u64)]) -> Package {
    let mut offset = 0;
    let entries = files
        .iter()
        .map(|(name, len)| {
            let entry = ManifestEntry::new(*name, offset, offset + len);
            offset += len;
            entry
        })
        .collect();
    Package::new(package_name, Manifest::new(entries, offset).unwrap())
}

/// `0, 1, 2, ...` を251で折り返すテスト用Blob。
pub fn pattern_blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
