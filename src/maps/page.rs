//! chromiumoxide による `MapsPage` 実装

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{ScraperConfig, Selectors, Settle};
use crate::error::ScraperError;
use crate::traits::MapsPage;

/// 結果一覧を1回でスクロールする量（px）
const SCROLL_DELTA: u32 = 10_000;
/// 連続何回HTMLサイズが同じなら安定とみなすか
const REQUIRED_STABLE_CHECKS: u32 = 3;
/// ブラウザプロセス終了待ちの上限
const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);

/// 起動したブラウザと操作対象のページ
///
/// `close` で必ず解放する。途中でドロップされた場合も `Browser` 側で子プロセスは終了する。
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromiumMapsPage,
    user_data_dir: PathBuf,
}

impl BrowserSession {
    /// ブラウザを起動して空のページを開く
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("Initializing browser for maps scraper...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("maps-scraper-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1440, 900)
            .request_timeout(config.timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=en-US");

        // Chrome パスは環境変数で上書き可能
        if let Ok(chrome_path) =
            std::env::var("CHROME_PATH").or_else(|_| std::env::var("CHROMIUM_PATH"))
        {
            builder = builder.chrome_executable(chrome_path);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {:?}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("Browser initialized successfully");
        Ok(Self {
            browser,
            handler,
            page: ChromiumMapsPage::new(page, config.selectors.clone()),
            user_data_dir,
        })
    }

    pub fn page(&self) -> &ChromiumMapsPage {
        &self.page
    }

    /// ブラウザを終了し、プロファイルを削除
    pub async fn close(mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        let closed = shutdown(&mut self.browser, SHUTDOWN_WAIT).await;
        self.handler.abort();
        remove_profile(&self.user_data_dir);

        closed?;
        info!("Browser closed");
        Ok(())
    }
}

/// 終了処理に使うブラウザプロセスの操作
#[async_trait]
trait BrowserProcess: Send {
    async fn close(&mut self) -> Result<(), ScraperError>;
    async fn kill(&mut self);
    async fn wait(&mut self) -> std::io::Result<()>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn close(&mut self) -> Result<(), ScraperError> {
        Browser::close(self)
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::Session(format!("ブラウザ終了エラー: {}", e)))
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = Browser::kill(self).await {
            debug!("Failed to kill browser process: {}", e);
        }
    }

    async fn wait(&mut self) -> std::io::Result<()> {
        Browser::wait(self).await.map(|_| ())
    }
}

/// 正常終了を試み、応答がなければ強制終了する
///
/// プロセス終了待ちは `wait_timeout` で打ち切る。
async fn shutdown<B: BrowserProcess>(
    browser: &mut B,
    wait_timeout: Duration,
) -> Result<(), ScraperError> {
    let closed = browser.close().await;
    if let Err(e) = &closed {
        warn!("Browser did not close cleanly, killing: {}", e);
        browser.kill().await;
    }

    match timeout(wait_timeout, browser.wait()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Failed to wait for browser process: {}", e),
        Err(_) => {
            warn!("Browser still running after {:?}, killing", wait_timeout);
            browser.kill().await;
        }
    }

    closed
}

/// 起動時に作ったユーザーデータディレクトリを削除
fn remove_profile(dir: &Path) {
    if !dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed browser profile {:?}", dir),
        Err(e) => warn!("Failed to remove browser profile {:?}: {}", dir, e),
    }
}

/// Google Maps を表示している1ページ
pub struct ChromiumMapsPage {
    page: Page,
    selectors: Selectors,
}

impl ChromiumMapsPage {
    pub fn new(page: Page, selectors: Selectors) -> Self {
        Self { page, selectors }
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T, ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| cdp_error(e, ScraperError::JavaScript))?
            .into_value::<T>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn first_element(&self, selector: &str) -> Result<Option<Element>, ScraperError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| cdp_error(e, ScraperError::ElementNotFound))?;
        Ok(elements.into_iter().next())
    }

    /// HTMLサイズが連続して変わらなくなるまで待機
    async fn wait_stable(&self, settle: &Settle) {
        let start = Instant::now();
        let mut last_html_len: Option<usize> = None;
        let mut stable_count = 0;

        while start.elapsed() < settle.timeout {
            match self
                .evaluate::<usize>("document.documentElement.outerHTML.length")
                .await
            {
                Ok(current_len) => {
                    match last_html_len {
                        Some(last) if last == current_len => {
                            stable_count += 1;
                            if stable_count >= REQUIRED_STABLE_CHECKS {
                                debug!("Page stable after {:?}", start.elapsed());
                                return;
                            }
                        }
                        _ => stable_count = 0,
                    }
                    last_html_len = Some(current_len);
                }
                Err(e) => {
                    debug!("Page stable check error: {}", e);
                    stable_count = 0;
                }
            }

            sleep(settle.poll_interval).await;
        }

        warn!(
            "Page stable timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
    }
}

#[async_trait]
impl MapsPage for ChromiumMapsPage {
    type Handle = Element;

    async fn open_search(&self, url: &str) -> Result<(), ScraperError> {
        info!("Opening {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?;
        Ok(())
    }

    async fn submit_search(&self, term: &str) -> Result<(), ScraperError> {
        let search_box = self
            .page
            .find_element(self.selectors.search_box.as_str())
            .await
            .map_err(|e| cdp_error(e, |m| ScraperError::ElementNotFound(format!("検索ボックス: {}", m))))?;

        search_box
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| cdp_error(e, ScraperError::JavaScript))?;

        search_box
            .click()
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?
            .type_str(term)
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?
            .press_key("Enter")
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?;

        debug!("Submitted search: {}", term);
        Ok(())
    }

    async fn scroll_results(&self) -> Result<(), ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const feed = document.querySelector({feed});
                if (feed) {{
                    feed.scrollBy(0, {delta});
                    return true;
                }}
                const items = document.querySelectorAll({listing});
                if (items.length > 0) {{
                    items[items.length - 1].scrollIntoView();
                    return true;
                }}
                window.scrollBy(0, {delta});
                return false;
            }})()
            "#,
            feed = js_string(&self.selectors.results_feed),
            listing = js_string(&self.selectors.listing),
            delta = SCROLL_DELTA,
        );

        let scrolled: bool = self.evaluate(&script).await?;
        if !scrolled {
            debug!("Results feed not found, scrolled window instead");
        }
        Ok(())
    }

    async fn listing_count(&self) -> Result<usize, ScraperError> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(&self.selectors.listing)
        );
        self.evaluate(&script).await
    }

    async fn listings(&self) -> Result<Vec<Element>, ScraperError> {
        self.page
            .find_elements(self.selectors.listing.as_str())
            .await
            .map_err(|e| cdp_error(e, ScraperError::ElementNotFound))
    }

    async fn open_listing(&self, handle: &Element) -> Result<(), ScraperError> {
        handle
            .click()
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?;
        Ok(())
    }

    async fn handle_attribute(
        &self,
        handle: &Element,
        attr: &str,
    ) -> Result<Option<String>, ScraperError> {
        handle
            .attribute(attr)
            .await
            .map_err(|e| cdp_error(e, ScraperError::JavaScript))
    }

    async fn first_text(&self, selector: &str) -> Result<Option<String>, ScraperError> {
        match self.first_element(selector).await? {
            Some(element) => element
                .inner_text()
                .await
                .map_err(|e| cdp_error(e, ScraperError::JavaScript)),
            None => Ok(None),
        }
    }

    async fn first_attribute(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ScraperError> {
        match self.first_element(selector).await? {
            Some(element) => element
                .attribute(attr)
                .await
                .map_err(|e| cdp_error(e, ScraperError::JavaScript)),
            None => Ok(None),
        }
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        self.page
            .url()
            .await
            .map_err(|e| cdp_error(e, ScraperError::Navigation))?
            .ok_or_else(|| ScraperError::Navigation("ページURLが取得できません".into()))
    }

    async fn settle(&self, settle: &Settle) -> Result<(), ScraperError> {
        if settle.min_wait > Duration::ZERO {
            sleep(settle.min_wait).await;
        }
        self.wait_stable(settle).await;
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| cdp_error(e, ScraperError::JavaScript))
    }
}

/// CDP接続が切れた場合はセッションエラー、それ以外は `wrap` で包む
fn cdp_error(e: CdpError, wrap: impl FnOnce(String) -> ScraperError) -> ScraperError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            ScraperError::Session(e.to_string())
        }
        e => wrap(e.to_string()),
    }
}

/// JavaScript の文字列リテラルに変換
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
