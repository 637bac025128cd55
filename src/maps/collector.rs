//! 検索結果一覧のスクロール収集

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::error::ScraperError;
use crate::traits::MapsPage;

use super::types::CollectOutcome;

/// 収集結果
pub struct Collected<H> {
    pub handles: Vec<H>,
    pub outcome: CollectOutcome,
}

/// 件数が指定数に達するか、増えなくなるまでスクロールする
pub struct ListingCollector<'a, P: MapsPage> {
    page: &'a P,
    config: CollectorConfig,
}

impl<'a, P: MapsPage> ListingCollector<'a, P> {
    pub fn new(page: &'a P, config: CollectorConfig) -> Self {
        Self { page, config }
    }

    pub async fn collect(&self, target: usize) -> Result<Collected<P::Handle>, ScraperError> {
        let mut previously_counted = 0;

        for _ in 0..self.config.max_scroll_rounds {
            self.page.scroll_results().await?;
            let count = self.wait_for_growth(previously_counted).await?;

            if count >= target {
                let handles = self.take(target).await?;
                info!("Total scraped: {}", handles.len());
                return Ok(Collected {
                    handles,
                    outcome: CollectOutcome::ReachedTarget,
                });
            }

            if count == previously_counted {
                let handles = self.take(target).await?;
                info!("Arrived at all available, total scraped: {}", handles.len());
                return Ok(Collected {
                    handles,
                    outcome: CollectOutcome::Exhausted,
                });
            }

            previously_counted = count;
            info!("Currently scraped: {}", count);
        }

        let handles = self.take(target).await?;
        warn!(
            "Stopped scrolling after {} rounds without stalling, total scraped: {}",
            self.config.max_scroll_rounds,
            handles.len()
        );
        Ok(Collected {
            handles,
            outcome: CollectOutcome::RoundLimit,
        })
    }

    /// 件数が `previous` を超えるまで、指数バックオフでポーリング
    ///
    /// タイムアウト時はその時点の件数を返す。
    async fn wait_for_growth(&self, previous: usize) -> Result<usize, ScraperError> {
        let deadline = Instant::now() + self.config.growth_timeout;
        let mut backoff = self.config.initial_backoff;

        loop {
            let count = self.page.listing_count().await?;
            let now = Instant::now();
            if count > previous || now >= deadline {
                return Ok(count);
            }

            debug!("Waiting for more listings ({} loaded)", count);
            sleep(backoff.min(deadline - now)).await;
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }

    async fn take(&self, target: usize) -> Result<Vec<P::Handle>, ScraperError> {
        let mut handles = self.page.listings().await?;
        handles.truncate(target);
        Ok(handles)
    }
}
