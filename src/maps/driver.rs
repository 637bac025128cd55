//! 検索語ごとの収集・抽出・出力の実行

use base64::Engine;
use tracing::{debug, error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{ExportSink, MapsPage};

use super::collector::ListingCollector;
use super::extractor::FieldExtractor;
use super::types::{ResultBatch, TermSummary};

/// 1つのページ上で検索語を順番に処理する
pub struct SearchDriver<'a, P: MapsPage, S: ExportSink> {
    page: &'a P,
    sink: &'a S,
    config: &'a ScraperConfig,
}

impl<'a, P: MapsPage, S: ExportSink> SearchDriver<'a, P, S> {
    pub fn new(page: &'a P, sink: &'a S, config: &'a ScraperConfig) -> Self {
        Self { page, sink, config }
    }

    /// 全検索語を入力順に処理
    ///
    /// リスティング単位の失敗はスキップし、セッション自体の失敗のみ返す。
    pub async fn run(
        &self,
        search_terms: &[String],
        total: usize,
    ) -> Result<Vec<TermSummary>, ScraperError> {
        let mut summaries = Vec::with_capacity(search_terms.len());
        for (index, term) in search_terms.iter().enumerate() {
            info!("-----");
            info!("{} - {}", index, term);
            summaries.push(self.run_term(term, total).await?);
        }
        Ok(summaries)
    }

    async fn run_term(&self, term: &str, total: usize) -> Result<TermSummary, ScraperError> {
        self.page.submit_search(term).await?;
        self.page.settle(&self.config.search_settle).await?;

        let collected = ListingCollector::new(self.page, self.config.collector)
            .collect(total)
            .await?;

        let extractor = FieldExtractor::new(&self.config.selectors, self.config.detail_settle);
        let mut batch = ResultBatch::new(term);

        for (i, handle) in collected.handles.iter().enumerate() {
            match extractor.extract(self.page, handle).await {
                Ok(record) => {
                    debug!("Listing {}: {}", i, record.name);
                    batch.push(record);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Error occurred on listing {}: {}", i, e);
                    batch.skipped += 1;
                    if self.config.debug {
                        self.log_screenshot(i).await;
                    }
                }
            }
        }

        info!(
            "Term '{}': {} records, {} skipped",
            term,
            batch.len(),
            batch.skipped
        );

        let (files, export_error) = match self.sink.export(&batch) {
            Ok(exported) => (exported.paths(), None),
            Err(e) => {
                error!("Failed to export '{}': {}", term, e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        Ok(TermSummary {
            term: term.to_string(),
            outcome: collected.outcome,
            collected: collected.handles.len(),
            exported: if export_error.is_none() { batch.len() } else { 0 },
            skipped: batch.skipped,
            files,
            export_error,
        })
    }

    async fn log_screenshot(&self, index: usize) {
        match self.page.capture_screenshot().await {
            Ok(png) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                debug!(
                    "Listing {} screenshot: data:image/png;base64,{}",
                    index, encoded
                );
            }
            Err(e) => debug!("Failed to capture screenshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::config::{CollectorConfig, Settle};
    use crate::export::ExportedFiles;
    use crate::maps::types::{BusinessRecord, CollectOutcome};
    use crate::testing::{FakeListing, FakePage};

    /// 出力されたバッチを記録する
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<(String, Vec<BusinessRecord>)>>,
        fail_on: Option<&'static str>,
    }

    impl ExportSink for RecordingSink {
        fn export(&self, batch: &ResultBatch) -> Result<ExportedFiles, ScraperError> {
            if self.fail_on == Some(batch.term.as_str()) {
                return Err(ScraperError::Export("disk full".into()));
            }
            self.batches
                .lock()
                .unwrap()
                .push((batch.file_stem(), batch.records.clone()));
            Ok(ExportedFiles {
                xlsx: format!("{}.xlsx", batch.file_stem()).into(),
                csv: format!("{}.csv", batch.file_stem()).into(),
            })
        }
    }

    fn config() -> ScraperConfig {
        ScraperConfig {
            search_settle: Settle::immediate(),
            detail_settle: Settle::immediate(),
            collector: CollectorConfig {
                growth_timeout: Duration::from_millis(500),
                ..CollectorConfig::default()
            },
            ..ScraperConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_mode_caps_batch_at_two() {
        let page = FakePage::new([8, 16]).with_listings(vec![
            FakeListing::at("Cafe A", 40.7128, -74.006),
            FakeListing::at("Cafe B", 40.73, -73.99),
        ]);
        let sink = RecordingSink::default();
        let config = config();

        let summaries = SearchDriver::new(&page, &sink, &config)
            .run(&["coffee shop".to_string()], 2)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].outcome, CollectOutcome::ReachedTarget);
        assert_eq!(summaries[0].exported, 2);

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "google_maps_data_coffee_shop");
        let names: Vec<_> = batches[0].1.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Cafe A", "Cafe B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_listing_is_skipped() {
        let page = FakePage::new([3, 3]).with_listings(vec![
            FakeListing::at("Good 1", 1.0, 2.0),
            FakeListing::at("No Coords", 0.0, 0.0)
                .with_url("https://www.google.com/maps/place/No+Coords"),
            FakeListing::at("Broken", 0.0, 0.0)
                .failing_open(|| ScraperError::Navigation("detached".into())),
        ]);
        let sink = RecordingSink::default();
        let config = config().with_debug(true);

        let summaries = SearchDriver::new(&page, &sink, &config)
            .run(&["pizza".to_string()], 1_000_000)
            .await
            .unwrap();

        assert_eq!(summaries[0].outcome, CollectOutcome::Exhausted);
        assert_eq!(summaries[0].collected, 3);
        assert_eq!(summaries[0].exported, 1);
        assert_eq!(summaries[0].skipped, 2);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0].1.len(), 1);
        assert_eq!(batches[0].1[0].name, "Good 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_failure_aborts_run() {
        let page = FakePage::new([1, 1]).with_listings(vec![FakeListing::at("Gone", 1.0, 1.0)
            .failing_open(|| ScraperError::Session("websocket closed".into()))]);
        let sink = RecordingSink::default();
        let config = config();

        let result = SearchDriver::new(&page, &sink, &config)
            .run(&["a".to_string(), "b".to_string()], 10)
            .await;

        assert!(matches!(result, Err(ScraperError::Session(_))));
        assert!(sink.batches.lock().unwrap().is_empty());
        assert_eq!(page.searches(), ["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terms_run_in_order_with_separate_batches() {
        let page = FakePage::new([2, 2, 1, 1]);
        let sink = RecordingSink {
            fail_on: Some("first term"),
            ..Default::default()
        };
        let config = config();

        let summaries = SearchDriver::new(&page, &sink, &config)
            .run(&["first term".to_string(), "second".to_string()], 100)
            .await
            .unwrap();

        assert_eq!(page.searches(), ["first term", "second"]);
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].is_success());
        assert_eq!(summaries[0].exported, 0);
        assert!(summaries[1].is_success());
        assert_eq!(summaries[1].collected, 1);

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "google_maps_data_second");
        assert_eq!(batches[0].1.len(), 1);
    }
}
