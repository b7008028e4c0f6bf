//! # 実行依存トークン
//!
//! ホストアプリケーションの起動を、全パッケージの読み込み完了まで遅らせるための
//! キー付きカウンタ。ローダーはファイルごとに `fp <name>`、パッケージごとに
//! `datafile_<package_name>` を登録し、完了時に解除する。
//! 失敗したパッケージのトークンは解除されない。

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

/// ファイル単位のトークンキー。
pub fn file_token(name: &str) -> String {
    format!("fp {name}")
}

/// パッケージ単位のトークンキー。
pub fn package_token(package_name: &str) -> String {
    format!("datafile_{package_name}")
}

/// 実行依存トークンの集合。`Arc` で共有して使う。
#[derive(Default)]
pub struct RunDependencies {
    pending: Mutex<HashMap<String, usize>>,
    idle: Notify,
}

impl RunDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// トークンを1つ追加する。同じキーは重ねて追加できる。
    pub fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let count = pending.entry(key.clone()).or_insert(0);
        *count += 1;
        tracing::trace!(key = %key, pending = pending.len(), "run dependency added");
    }

    /// トークンを1つ解除する。未登録のキーは警告のみで無視する。
    pub fn remove(&self, key: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(count) = pending.get_mut(key) else {
            tracing::warn!(key = %key, "未登録の実行依存を解除しようとしました");
            return;
        };
        *count -= 1;
        if *count == 0 {
            pending.remove(key);
        }
        tracing::trace!(key = %key, pending = pending.len(), "run dependency removed");
        if pending.is_empty() {
            self.idle.notify_waiters();
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// 未解除トークンの総数（重複追加分を含む）。
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// 未解除トークンのキー一覧（ソート済み）。
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn is_idle(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// 全トークンが解除されるまで待つ。
    ///
    /// 失敗したパッケージのトークンは解除されないため、呼び出し側はタイムアウトを
    /// 併用するか、`load` の結果を先に確認すること。
    pub async fn wait_idle(&self) {
        loop {
            // 判定より先にNotifiedを作り、通知の取りこぼしを防ぐ
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_token_keys() {
        assert_eq!(file_token("/a/b.jpg"), "fp /a/b.jpg");
        assert_eq!(
            package_token("packaged_data/PBR_Examples.data"),
            "datafile_packaged_data/PBR_Examples.data"
        );
    }

    #[test]
    fn test_add_remove_counts() {
        let deps = RunDependencies::new();
        deps.add("x");
        deps.add("x");
        deps.add("y");
        assert_eq!(deps.pending(), 3);
        deps.remove("x");
        assert!(deps.contains("x"));
        deps.remove("x");
        assert!(!deps.contains("x"));
        assert_eq!(deps.pending_keys(), vec!["y".to_string()]);
        deps.remove("y");
        assert!(deps.is_idle());
    }

    /// 未登録キーの解除はカウントに影響しない
    #[test]
    fn test_remove_unknown_is_noop() {
        let deps = RunDependencies::new();
        deps.add("x");
        deps.remove("unknown");
        assert_eq!(deps.pending(), 1);
    }

    #[tokio::test]
    async fn test_wait_idle_resolves_after_release() {
        let deps = Arc::new(RunDependencies::new());
        deps.add("datafile_a");

        let waiter = {
            let deps = Arc::clone(&deps);
            tokio::spawn(async move { deps.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        deps.remove("datafile_a");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait_idleが完了しない")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_idle_immediate_when_empty() {
        let deps = RunDependencies::new();
        tokio::time::timeout(Duration::from_millis(100), deps.wait_idle())
            .await
            .expect("空の場合は即座に完了する");
    }
}
