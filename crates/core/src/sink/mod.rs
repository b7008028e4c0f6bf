//! # 書き込み先ファイルシステム
//!
//! 切り出したファイルの公開先を抽象化する。複数パッケージが1つのSinkを
//! 共有できるよう、メソッドは `&self` を取り内部でロックする。
//!
//! ## 実装
//! - `MemorySink`: スライスをコピーせずに保持するメモリ上のSink
//! - `VfsSink`: `vfs` クレートの任意のファイルシステムへ書き込むSink

pub mod memory;
pub mod virtual_fs;

pub use memory::MemorySink;
pub use virtual_fs::VfsSink;

use crate::blob::BlobSlice;
use crate::error::LoadError;

/// 読み込んだファイルの公開先。
pub trait FsSink: Send + Sync {
    /// ディレクトリを作成する。途中のディレクトリも作成し、既存なら何もしない。
    fn create_directory(&self, path: &str) -> Result<(), LoadError>;

    /// ファイルを作成する。`contents` の所有権はSinkに移り、
    /// ローダーは以後そのスライスに触れない。既存ファイルは上書きする。
    fn create_file(&self, path: &str, contents: BlobSlice) -> Result<(), LoadError>;
}

/// `/a/b/c` の祖先を含めた各段階のパス（`/a`, `/a/b`, `/a/b/c`）を返す。
pub(crate) fn path_prefixes(path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefixes() {
        assert_eq!(path_prefixes("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert_eq!(path_prefixes("a//b/"), vec!["/a", "/a/b"]);
        assert!(path_prefixes("/").is_empty());
    }
}
