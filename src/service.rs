use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use tower::Service;
use tracing::{info, warn};

use crate::config::{ScraperConfig, UNBOUNDED_TOTAL};
use crate::error::ScraperError;
use crate::export::TabularExporter;
use crate::maps::{BrowserSession, RunSummary, SearchDriver, TermSummary};
use crate::traits::MapsPage;

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub search_terms: Vec<String>,
    /// 1検索語あたりの最大件数
    pub total: usize,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub debug: bool,
}

impl ScrapeRequest {
    pub fn new(search_terms: Vec<String>) -> Self {
        Self {
            search_terms,
            total: UNBOUNDED_TOTAL,
            output_dir: PathBuf::from("output"),
            headless: false,
            debug: false,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total;
        self
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
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// 1リクエストにつきブラウザを1つ起動し、終了時に必ず閉じる。
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    config: ScraperConfig,
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }

    /// タイムアウトやセレクタを差し替える
    pub fn with_config(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn request_config(&self, req: &ScrapeRequest) -> ScraperConfig {
        self.config
            .clone()
            .with_output_dir(req.output_dir.clone())
            .with_headless(req.headless)
            .with_debug(req.debug)
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = RunSummary;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!(
            "スクレイピングリクエスト受信: terms={}, total={}",
            req.search_terms.len(),
            req.total
        );
        let config = self.request_config(&req);

        Box::pin(async move {
            if req.search_terms.is_empty() {
                return Err(ScraperError::Config("検索語がありません".into()));
            }

            let started_at = Utc::now();
            let session = BrowserSession::launch(&config).await?;

            let result = scrape_terms(session.page(), &config, &req).await;

            // 成否にかかわらずブラウザを閉じる
            if let Err(e) = session.close().await {
                warn!("Failed to close browser: {}", e);
            }
            let terms = result?;

            let summary = RunSummary {
                started_at,
                finished_at: Utc::now(),
                terms,
            };
            info!(
                "スクレイピング完了: terms={}, records={}, elapsed={}s",
                summary.terms.len(),
                summary.total_records(),
                (summary.finished_at - summary.started_at).num_seconds()
            );
            Ok(summary)
        })
    }
}

async fn scrape_terms<P: MapsPage>(
    page: &P,
    config: &ScraperConfig,
    req: &ScrapeRequest,
) -> Result<Vec<TermSummary>, ScraperError> {
    page.open_search(&config.maps_url).await?;
    page.settle(&config.startup_settle).await?;

    let exporter = TabularExporter::new(&config.output_dir);
    SearchDriver::new(page, &exporter, config)
        .run(&req.search_terms, req.total)
        .await
}
