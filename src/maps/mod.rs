//! Google Maps スクレイパーモジュール
//!
//! 検索結果をスクロールして集め、各リスティングの詳細から事業者情報を抽出する

mod collector;
mod driver;
mod extractor;
mod page;
mod types;

pub use collector::{Collected, ListingCollector};
pub use driver::SearchDriver;
pub use extractor::{parse_coordinates, parse_reviews_average, parse_reviews_count, FieldExtractor};
pub use page::{BrowserSession, ChromiumMapsPage};
pub use types::{BusinessRecord, CollectOutcome, ResultBatch, RunSummary, TermSummary};
