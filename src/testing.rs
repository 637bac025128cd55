//! テスト用のインメモリ `MapsPage`

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::Settle;
use crate::error::ScraperError;
use crate::traits::MapsPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeHandle(pub usize);

/// 詳細パネルの内容
#[derive(Debug, Clone, Default)]
pub struct FakeListing {
    pub label: Option<String>,
    pub url: String,
    /// セレクタ → テキスト
    pub texts: HashMap<String, String>,
    /// (セレクタ, 属性) → 値
    pub attrs: HashMap<(String, String), String>,
    pub open_error: Option<fn() -> ScraperError>,
    /// 読み取りに失敗するセレクタ（属性名も可）
    pub read_errors: HashMap<String, fn() -> ScraperError>,
    pub url_error: Option<fn() -> ScraperError>,
}

impl FakeListing {
    pub fn at(label: &str, lat: f64, lon: f64) -> Self {
        Self {
            label: Some(label.to_string()),
            url: format!(
                "https://www.google.com/maps/place/{}/@{},{},17z/data=!3m1",
                label.replace(' ', "+"),
                lat,
                lon
            ),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_attr(mut self, selector: &str, attr: &str, value: &str) -> Self {
        self.attrs
            .insert((selector.to_string(), attr.to_string()), value.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn failing_open(mut self, error: fn() -> ScraperError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn failing_read(mut self, selector: &str, error: fn() -> ScraperError) -> Self {
        self.read_errors.insert(selector.to_string(), error);
        self
    }

    pub fn failing_url(mut self, error: fn() -> ScraperError) -> Self {
        self.url_error = Some(error);
        self
    }

    fn read(&self, key: &str) -> Result<(), ScraperError> {
        match self.read_errors.get(key) {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct State {
    loaded: usize,
    /// スクロールごとに読み込まれる件数
    script: VecDeque<usize>,
    /// スクリプトが尽きた後もスクロールごとに増える件数
    endless_step: usize,
    scrolls: usize,
    searches: Vec<String>,
    current: Option<usize>,
}

/// スクリプト通りに件数が増えるページ
#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
    listings: Vec<FakeListing>,
}

impl FakePage {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            state: Mutex::new(State {
                script: script.into_iter().collect(),
                ..Default::default()
            }),
            listings: Vec::new(),
        }
    }

    pub fn endless(step: usize) -> Self {
        let page = Self::default();
        page.state.lock().unwrap().endless_step = step;
        page
    }

    pub fn with_listings(mut self, listings: Vec<FakeListing>) -> Self {
        self.listings = listings;
        self
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    fn listing(&self, index: usize) -> FakeListing {
        self.listings
            .get(index)
            .cloned()
            .unwrap_or_else(|| FakeListing::at(&format!("Listing {}", index), 40.0, -74.0))
    }

    fn current(&self) -> Option<FakeListing> {
        let current = self.state.lock().unwrap().current;
        current.map(|i| self.listing(i))
    }
}

#[async_trait]
impl MapsPage for FakePage {
    type Handle = FakeHandle;

    async fn open_search(&self, _url: &str) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn submit_search(&self, term: &str) -> Result<(), ScraperError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(term.to_string());
        state.loaded = 0;
        state.current = None;
        Ok(())
    }

    async fn scroll_results(&self) -> Result<(), ScraperError> {
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        match state.script.pop_front() {
            Some(count) => state.loaded = count,
            None => state.loaded += state.endless_step,
        }
        Ok(())
    }

    async fn listing_count(&self) -> Result<usize, ScraperError> {
        Ok(self.state.lock().unwrap().loaded)
    }

    async fn listings(&self) -> Result<Vec<FakeHandle>, ScraperError> {
        let loaded = self.state.lock().unwrap().loaded;
        Ok((0..loaded).map(FakeHandle).collect())
    }

    async fn open_listing(&self, handle: &FakeHandle) -> Result<(), ScraperError> {
        if let Some(error) = self.listing(handle.0).open_error {
            return Err(error());
        }
        self.state.lock().unwrap().current = Some(handle.0);
        Ok(())
    }

    async fn handle_attribute(
        &self,
        handle: &FakeHandle,
        attr: &str,
    ) -> Result<Option<String>, ScraperError> {
        let listing = self.listing(handle.0);
        listing.read(attr)?;
        Ok(listing.label)
    }

    async fn first_text(&self, selector: &str) -> Result<Option<String>, ScraperError> {
        match self.current() {
            Some(listing) => {
                listing.read(selector)?;
                Ok(listing.texts.get(selector).cloned())
            }
            None => Ok(None),
        }
    }

    async fn first_attribute(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ScraperError> {
        match self.current() {
            Some(listing) => {
                listing.read(selector)?;
                Ok(listing
                    .attrs
                    .get(&(selector.to_string(), attr.to_string()))
                    .cloned())
            }
            None => Ok(None),
        }
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        match self.current() {
            Some(listing) => match listing.url_error {
                Some(error) => Err(error()),
                None => Ok(listing.url),
            },
            None => Ok("https://www.google.com/maps".to_string()),
        }
    }

    async fn settle(&self, _settle: &Settle) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}
