//! # datapack Core
//!
//! パック済みBlobとマニフェストから仮想ファイルシステムを組み立てるローダー。
//!
//! ## 処理フロー
//! 1. マニフェストを検証する（`manifest`）
//! 2. Byte sourceからBlobを1回だけ取得する（`source`）
//! 3. Blob長と各範囲を検証する
//! 4. マニフェスト順に切り出してSinkへ書き込む（`sink`）
//! 5. 実行依存トークンを解除してホストに完了を知らせる（`dependency`）

pub mod blob;
pub mod cancel;
pub mod dependency;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod progress;
pub mod script;
pub mod sink;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use blob::{BlobSlice, PackedBlob};
pub use cancel::CancelToken;
pub use dependency::RunDependencies;
pub use error::LoadError;
pub use loader::{LoadJob, LoadOutcome, Locator, PackageLoader};
pub use manifest::{Manifest, ManifestEntry, Package};
pub use progress::{DownloadProgress, ProgressObserver, ProgressSnapshot, TracingObserver};
pub use script::parse_loader_script;
pub use sink::{FsSink, MemorySink, VfsSink};
pub use source::{ByteSource, FetchRequest, FileSource, HttpSource, PreloadedSource};

// 書き込み先として使う vfs を再エクスポート
pub use vfs;
