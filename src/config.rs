use std::path::PathBuf;
use std::time::Duration;

/// 件数指定なしの場合の上限（実質無制限）
pub const UNBOUNDED_TOTAL: usize = 1_000_000;
/// `--test` 指定時の件数
pub const TEST_TOTAL: usize = 2;

const MAPS_URL: &str = "https://www.google.com/maps";

/// 操作後の待機設定
///
/// `min_wait` だけ待ってから、`timeout` までページが安定するのを待つ。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settle {
    pub min_wait: Duration,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Settle {
    pub const fn new(min_wait: Duration, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            min_wait,
            timeout,
            poll_interval,
        }
    }

    /// 待機なし（テスト用）
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }
}

/// Google Maps のDOMセレクタ
#[derive(Debug, Clone)]
pub struct Selectors {
    pub search_box: String,
    pub results_feed: String,
    pub listing: String,
    pub address: String,
    pub website: String,
    pub phone: String,
    pub reviews_count: String,
    pub reviews_average: String,
    /// リスティング名・評価を持つ属性
    pub label_attr: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_box: "input#searchboxinput".to_string(),
            results_feed: r#"div[role="feed"]"#.to_string(),
            listing: r#"a[href*="https://www.google.com/maps/place"]"#.to_string(),
            address: r#"button[data-item-id="address"] div[class*="fontBodyMedium"]"#.to_string(),
            website: r#"a[data-item-id="authority"] div[class*="fontBodyMedium"]"#.to_string(),
            phone: r#"button[data-item-id*="phone:tel:"] div[class*="fontBodyMedium"]"#
                .to_string(),
            reviews_count: r#"button[jsaction="pane.reviewChart.moreReviews"] span"#.to_string(),
            reviews_average: r#"div[jsaction="pane.reviewChart.moreReviews"] div[role="img"]"#
                .to_string(),
            label_attr: "aria-label".to_string(),
        }
    }
}

/// スクロール収集の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectorConfig {
    /// 件数増加を待つ時間（これを過ぎても増えなければ打ち止め）
    pub growth_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// スクロール回数の上限
    pub max_scroll_rounds: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            growth_timeout: Duration::from_secs(3),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(1),
            max_scroll_rounds: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub maps_url: String,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub debug: bool,
    /// ナビゲーション/CDPリクエストのタイムアウト
    pub timeout: Duration,
    /// トップページ表示後
    pub startup_settle: Settle,
    /// 検索実行後
    pub search_settle: Settle,
    /// リスティングを開いた後
    pub detail_settle: Settle,
    pub collector: CollectorConfig,
    pub selectors: Selectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            maps_url: MAPS_URL.to_string(),
            output_dir: PathBuf::from("output"),
            headless: false,
            debug: false,
            timeout: Duration::from_secs(60),
            startup_settle: Settle::new(
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_millis(300),
            ),
            search_settle: Settle::new(
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_millis(300),
            ),
            detail_settle: Settle::new(
                Duration::from_secs(1),
                Duration::from_secs(8),
                Duration::from_millis(300),
            ),
            collector: CollectorConfig::default(),
            selectors: Selectors::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_collector(mut self, collector: CollectorConfig) -> Self {
        self.collector = collector;
        self
    }

    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }
}

/// CLIフラグから1検索語あたりの件数を決定
///
/// `0` は未指定と同じく無制限として扱う。
pub fn resolve_total(total: Option<usize>, test_mode: bool) -> usize {
    match total {
        _ if test_mode => TEST_TOTAL,
        Some(0) | None => UNBOUNDED_TOTAL,
        Some(total) => total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_total() {
        assert_eq!(resolve_total(None, false), UNBOUNDED_TOTAL);
        assert_eq!(resolve_total(Some(25), false), 25);
        assert_eq!(resolve_total(Some(25), true), TEST_TOTAL);
        assert_eq!(resolve_total(None, true), 2);
    }

    #[test]
    fn test_zero_total_is_unbounded() {
        assert_eq!(resolve_total(Some(0), false), UNBOUNDED_TOTAL);
        assert_eq!(resolve_total(Some(0), true), TEST_TOTAL);
    }

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::new()
            .with_output_dir("/tmp/out")
            .with_headless(true)
            .with_debug(true)
            .with_timeout(Duration::from_secs(120));

        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.headless);
        assert!(config.debug);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.maps_url, "https://www.google.com/maps");
    }
}
