//! # パック済みBlob
//!
//! 取得したBlobは不変かつ参照カウントで共有される。
//! 各ファイルは `BlobSlice` としてコピーなしで切り出され、
//! Sinkに所有権ごと渡される（Sinkはコピーせずに保持してよい）。

use std::ops::{Deref, Range};
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// 1パッケージ分のパック済みBlob。
#[derive(Clone)]
pub struct PackedBlob {
    bytes: Arc<[u8]>,
}

impl PackedBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `[start, end)` を切り出す。範囲がBlob外なら `None`。
    pub fn slice(&self, range: Range<u64>) -> Option<BlobSlice> {
        let start = usize::try_from(range.start).ok()?;
        let end = usize::try_from(range.end).ok()?;
        if start > end || end > self.bytes.len() {
            return None;
        }
        Some(BlobSlice {
            blob: Arc::clone(&self.bytes),
            start,
            end,
        })
    }

    /// Blob全体のSHA-256（hex）。
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

impl From<Vec<u8>> for PackedBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for PackedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedBlob")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Blobの一部分への所有ビュー。元のBlobは変更されないため共有して安全。
#[derive(Clone)]
pub struct BlobSlice {
    blob: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl BlobSlice {
    /// 中身をコピーして `Vec<u8>` にする。
    pub fn to_vec(&self) -> Vec<u8> {
        self.deref().to_vec()
    }
}

impl Deref for BlobSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.blob[self.start..self.end]
    }
}

impl AsRef<[u8]> for BlobSlice {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl PartialEq<[u8]> for BlobSlice {
    fn eq(&self, other: &[u8]) -> bool {
        self.deref() == other
    }
}

impl std::fmt::Debug for BlobSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobSlice")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}
