//! Google Maps スクレイパーライブラリ
//!
//! - 検索語ごとにGoogle Mapsを検索し、結果一覧をスクロールして収集
//! - 各リスティングの詳細から名称・住所・電話番号・評価・座標を抽出
//! - 検索語ごとに `output/google_maps_data_<検索語>.xlsx` / `.csv` を出力
//!
//! # 使用例
//!
//! ```rust,ignore
//! use maps_scraper::{ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new(vec!["coffee shop".to_string()])
//!         .with_total(20)
//!         .with_output_dir("./output")
//!         .with_headless(true);
//!
//!     let summary = service.call(request).await.unwrap();
//!     println!("Records: {}", summary.total_records());
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod input;
pub mod maps;
pub mod service;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use export::{ExportedFiles, TabularExporter};
pub use maps::{BusinessRecord, ResultBatch, RunSummary, SearchDriver};
pub use service::{ScrapeRequest, ScraperService};
pub use traits::{ExportSink, MapsPage};
