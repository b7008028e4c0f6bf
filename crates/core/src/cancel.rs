//! # キャンセルトークン
//!
//! 取得後、Sinkへの書き込みを始める前に確認される。
//! 発行済みの取得リクエスト自体は中断しない。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 複製可能なキャンセルフラグ。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
