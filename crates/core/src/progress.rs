//! # ダウンロード進捗の集計
//!
//! 並行して読み込まれる全パッケージの `(loaded, total)` をリソース単位で集計し、
//! 注入されたオブザーバーに通知する。観測専用で、読み込みの正否には影響しない。
//!
//! 合計サイズは、まだ進捗が届いていないパッケージ分を見込んで
//! `ceil(Σtotal × expected / tracked)` に補正する。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// 集計済みの進捗スナップショット。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// 全リソースの受信済みバイト数
    pub loaded: u64,
    /// 補正済みの合計バイト数
    pub total: u64,
    /// 進捗が届いているリソース数
    pub downloads: usize,
    /// 読み込み予定のパッケージ数
    pub expected: usize,
}

impl ProgressSnapshot {
    /// ホスト向けのステータス文字列。
    pub fn status_text(&self) -> String {
        if self.downloads == 0 {
            "Downloading data...".to_string()
        } else {
            format!("Downloading data... ({}/{})", self.loaded, self.total)
        }
    }
}

/// 進捗の通知先。
pub trait ProgressObserver: Send + Sync {
    /// `resource` の進捗が更新されたときに呼ばれる。
    fn on_progress(&self, resource: &str, snapshot: ProgressSnapshot);
}

/// 進捗を `tracing` のdebugログとして出力するオブザーバー。
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, resource: &str, snapshot: ProgressSnapshot) {
        tracing::debug!(
            resource = %resource,
            loaded = snapshot.loaded,
            total = snapshot.total,
            "{}",
            snapshot.status_text()
        );
    }
}

#[derive(Default)]
struct ProgressState {
    downloads: BTreeMap<String, (u64, u64)>,
    expected: usize,
}

impl ProgressState {
    fn snapshot(&self) -> ProgressSnapshot {
        let downloads = self.downloads.len();
        let (loaded, raw_total) = self
            .downloads
            .values()
            .fold((0u64, 0u64), |(l, t), (dl, dt)| {
                (l.saturating_add(*dl), t.saturating_add(*dt))
            });
        // 合計はu64::MAXで頭打ち
        let total = if downloads == 0 {
            0
        } else {
            let expected = self.expected.max(downloads) as u128;
            let n = downloads as u128;
            let scaled = (raw_total as u128).saturating_mul(expected).div_ceil(n);
            u64::try_from(scaled).unwrap_or(u64::MAX)
        };
        ProgressSnapshot {
            loaded,
            total,
            downloads,
            expected: self.expected,
        }
    }
}

/// 全パッケージ共通の進捗集計器。`Arc` で共有して使う。
#[derive(Default)]
pub struct DownloadProgress {
    state: Mutex<ProgressState>,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl DownloadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// オブザーバーを追加する。
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// 読み込み予定のパッケージを1つ加算する。
    pub fn expect_download(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .expected += 1;
    }

    /// `resource` の進捗を記録し、オブザーバーに通知する。
    pub fn update(&self, resource: &str, loaded: u64, total: u64) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state
                .downloads
                .insert(resource.to_string(), (loaded, total));
            state.snapshot()
        };
        for observer in &self.observers {
            observer.on_progress(resource, snapshot);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// 1リソース分の報告ハンドルを作る。
    pub fn reporter(
        self: &Arc<Self>,
        resource: impl Into<String>,
        expected_size: u64,
    ) -> ProgressReporter {
        ProgressReporter {
            progress: Arc::clone(self),
            resource: resource.into(),
            expected_size,
        }
    }
}

/// Byte sourceに渡される、1リソース分の進捗報告ハンドル。
pub struct ProgressReporter {
    progress: Arc<DownloadProgress>,
    resource: String,
    expected_size: u64,
}

impl ProgressReporter {
    /// 受信済みバイト数を報告する。`total` が不明ならマニフェストのサイズを使う。
    /// 受信0バイトの報告は記録しない。
    pub fn report(&self, loaded: u64, total: Option<u64>) {
        if loaded == 0 {
            return;
        }
        let total = total.unwrap_or(self.expected_size);
        self.progress.update(&self.resource, loaded, total);
    }

    /// 逐次進捗を持たないソース用。完了時に1回だけ報告する。
    pub fn complete(&self, len: u64) {
        self.report(len, Some(len));
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Mutex<Vec<(String, ProgressSnapshot)>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, resource: &str, snapshot: ProgressSnapshot) {
            self.0.lock().unwrap().push((resource.to_string(), snapshot));
        }
    }

    #[test]
    fn test_status_text_without_downloads() {
        let progress = DownloadProgress::new();
        assert_eq!(progress.snapshot().status_text(), "Downloading data...");
    }

    /// 2パッケージ予定で1つだけ進捗がある場合、合計は2倍に見込まれる
    #[test]
    fn test_total_scaled_by_expected_downloads() {
        let progress = DownloadProgress::new();
        progress.expect_download();
        progress.expect_download();
        progress.update("a.data", 50, 101);

        let snap = progress.snapshot();
        assert_eq!(snap.loaded, 50);
        assert_eq!(snap.total, 202);
        assert_eq!(snap.status_text(), "Downloading data... (50/202)");

        progress.update("b.data", 10, 99);
        let snap = progress.snapshot();
        assert_eq!(snap.loaded, 60);
        assert_eq!(snap.total, 200);
        assert_eq!(snap.downloads, 2);
    }

    #[test]
    fn test_ceil_division() {
        let progress = DownloadProgress::new();
        progress.expect_download();
        progress.expect_download();
        progress.expect_download();
        progress.update("a", 1, 10);
        progress.update("b", 1, 11);
        // ceil(21 * 3 / 2) = 32
        assert_eq!(progress.snapshot().total, 32);
    }

    /// 巨大なContent-Lengthが並んでもパニックせず上限で止まる
    #[test]
    fn test_huge_totals_saturate() {
        let progress = DownloadProgress::new();
        progress.expect_download();
        progress.expect_download();
        progress.expect_download();
        progress.update("a", 1, u64::MAX / 2 + 1);
        assert_eq!(progress.snapshot().total, u64::MAX);

        progress.update("b", u64::MAX, u64::MAX / 2 + 1);
        let snap = progress.snapshot();
        assert_eq!(snap.loaded, u64::MAX);
        assert_eq!(snap.total, u64::MAX);
        assert_eq!(snap.downloads, 2);
    }

    #[test]
    fn test_reporter_uses_expected_size_and_skips_zero() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let progress = Arc::new(DownloadProgress::new().with_observer(recorder.clone()));
        progress.expect_download();

        let reporter = progress.reporter("pkg.data", 1000);
        reporter.report(0, None);
        reporter.report(400, None);
        reporter.complete(1000);

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "pkg.data");
        assert_eq!(events[0].1.total, 1000);
        assert_eq!(events[1].1.loaded, 1000);
    }
}
