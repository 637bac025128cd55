use async_trait::async_trait;

use crate::config::Settle;
use crate::error::ScraperError;
use crate::export::ExportedFiles;
use crate::maps::ResultBatch;

/// 検索・閲覧に使う単一ページの操作
///
/// DOM読み取り系は、該当要素がなければ `Ok(None)` を返す。
#[async_trait]
pub trait MapsPage: Send + Sync {
    /// 検索結果一覧の1件
    type Handle: Send + Sync;

    /// Mapsトップページへ遷移
    async fn open_search(&self, url: &str) -> Result<(), ScraperError>;

    /// 検索ボックスに検索語を入力して実行
    async fn submit_search(&self, term: &str) -> Result<(), ScraperError>;

    /// 検索結果一覧をスクロール
    async fn scroll_results(&self) -> Result<(), ScraperError>;

    async fn listing_count(&self) -> Result<usize, ScraperError>;

    /// 表示中のリスティング（文書順）
    async fn listings(&self) -> Result<Vec<Self::Handle>, ScraperError>;

    /// リスティングをクリックして詳細を開く
    async fn open_listing(&self, handle: &Self::Handle) -> Result<(), ScraperError>;

    async fn handle_attribute(
        &self,
        handle: &Self::Handle,
        attr: &str,
    ) -> Result<Option<String>, ScraperError>;

    async fn first_text(&self, selector: &str) -> Result<Option<String>, ScraperError>;

    async fn first_attribute(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ScraperError>;

    async fn current_url(&self) -> Result<String, ScraperError>;

    /// 操作後、ページが落ち着くまで待機
    async fn settle(&self, settle: &Settle) -> Result<(), ScraperError>;

    /// PNGスクリーンショット
    async fn capture_screenshot(&self) -> Result<Vec<u8>, ScraperError>;
}

/// 検索語ごとの結果の出力先
pub trait ExportSink: Send + Sync {
    fn export(&self, batch: &ResultBatch) -> Result<ExportedFiles, ScraperError>;
}
