//! # vfs Sink
//!
//! `vfs` クレートの `FileSystem` 実装へ書き込む。
//! `MemoryFS` ならプロセス内、`PhysicalFS` なら出力ディレクトリ配下に展開される。

use std::io::Write;

use vfs::FileSystem;

use crate::blob::BlobSlice;
use crate::error::LoadError;

use super::{path_prefixes, FsSink};

/// 任意の `vfs::FileSystem` を書き込み先とするSink。
#[derive(Debug)]
pub struct VfsSink<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> VfsSink<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// 書き込み先ファイルシステムへの参照。
    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn into_inner(self) -> F {
        self.fs
    }
}

impl<F: FileSystem> FsSink for VfsSink<F> {
    fn create_directory(&self, path: &str) -> Result<(), LoadError> {
        for prefix in path_prefixes(path) {
            let exists = self
                .fs
                .exists(&prefix)
                .map_err(|e| LoadError::sink(prefix.as_str(), e.to_string()))?;
            if !exists {
                self.fs
                    .create_dir(&prefix)
                    .map_err(|e| LoadError::sink(prefix.as_str(), e.to_string()))?;
            }
        }
        Ok(())
    }

    fn create_file(&self, path: &str, contents: BlobSlice) -> Result<(), LoadError> {
        let mut writer = self
            .fs
            .create_file(path)
            .map_err(|e| LoadError::sink(path, format!("ファイル作成に失敗: {e}")))?;
        writer
            .write_all(&contents)
            .map_err(|e| LoadError::sink(path, e))?;
        writer.flush().map_err(|e| LoadError::sink(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use crate::blob::PackedBlob;

    fn read_all<F: FileSystem>(fs: &F, path: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        fs.open_file(path).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_memory_fs_roundtrip() {
        let sink = VfsSink::new(vfs::MemoryFS::new());
        let blob = PackedBlob::from(vec![9u8, 8, 7, 6]);

        sink.create_directory("/Textures/Isotropic").unwrap();
        sink.create_directory("/Textures").unwrap();
        sink.create_file("/Textures/Isotropic/vtk_Normal.png", blob.slice(1..3).unwrap())
            .unwrap();

        assert_eq!(
            read_all(sink.fs(), "/Textures/Isotropic/vtk_Normal.png"),
            vec![8, 7]
        );
    }

    #[test]
    fn test_physical_fs_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let sink = VfsSink::new(vfs::PhysicalFS::new(dir.path().to_path_buf()));
        let blob = PackedBlob::from(vec![1u8, 2, 3]);

        sink.create_directory("/ExportBunny").unwrap();
        sink.create_file("/ExportBunny/ExportBunny_0.vtp", blob.slice(0..3).unwrap())
            .unwrap();

        let written = std::fs::read(dir.path().join("ExportBunny/ExportBunny_0.vtp")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }
}
