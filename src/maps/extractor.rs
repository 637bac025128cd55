//! リスティング詳細からの項目抽出
//!
//! 各項目は独立して読み取り、取れなかった項目は空（`""` / `None`）にする。
//! 座標だけは必須で、URLから取れなければレコード全体を失敗とする。

use tracing::debug;

use crate::config::{Selectors, Settle};
use crate::error::ScraperError;
use crate::traits::MapsPage;

use super::types::BusinessRecord;

/// URL中の座標区間の目印
const COORDINATE_MARKER: &str = "/@";

pub struct FieldExtractor<'a> {
    selectors: &'a Selectors,
    settle: Settle,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(selectors: &'a Selectors, settle: Settle) -> Self {
        Self { selectors, settle }
    }

    /// リスティングを開いて1件分を抽出
    pub async fn extract<P: MapsPage>(
        &self,
        page: &P,
        handle: &P::Handle,
    ) -> Result<BusinessRecord, ScraperError> {
        page.open_listing(handle).await?;
        page.settle(&self.settle).await?;

        let sel = self.selectors;
        let name = optional(
            "name",
            page.handle_attribute(handle, &sel.label_attr).await,
        )?;
        let address = optional("address", page.first_text(&sel.address).await)?;
        let website = optional("website", page.first_text(&sel.website).await)?;
        let phone_number = optional("phone_number", page.first_text(&sel.phone).await)?;

        let reviews_count = optional("reviews_count", page.first_text(&sel.reviews_count).await)?
            .and_then(|text| {
                let count = parse_reviews_count(&text);
                if count.is_none() {
                    debug!("Unparsable reviews count: {:?}", text);
                }
                count
            });

        let reviews_average = optional(
            "reviews_average",
            page.first_attribute(&sel.reviews_average, &sel.label_attr)
                .await,
        )?
        .and_then(|label| {
            let average = parse_reviews_average(&label);
            if average.is_none() {
                debug!("Unparsable reviews average: {:?}", label);
            }
            average
        });

        let maps_url = page.current_url().await?;
        let (latitude, longitude) = parse_coordinates(&maps_url)?;

        Ok(BusinessRecord {
            name: name.unwrap_or_default(),
            address: address.unwrap_or_default(),
            website: website.unwrap_or_default(),
            phone_number: phone_number.unwrap_or_default(),
            reviews_count,
            reviews_average,
            latitude,
            longitude,
            maps_url,
        })
    }
}

/// 項目単位の読み取り失敗は「なし」として扱う
///
/// セッション自体が切れた場合だけはエラーを返す。
fn optional(
    field: &str,
    value: Result<Option<String>, ScraperError>,
) -> Result<Option<String>, ScraperError> {
    match value {
        Ok(Some(text)) => {
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        }
        Ok(None) => Ok(None),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Field {} unavailable: {}", field, e);
            Ok(None)
        }
    }
}

/// `.../@<lat>,<lon>,<zoom>/...` から緯度経度を取り出す
pub fn parse_coordinates(url: &str) -> Result<(f64, f64), ScraperError> {
    let (_, tail) = url
        .rsplit_once(COORDINATE_MARKER)
        .ok_or_else(|| ScraperError::Coordinates(format!("no '{}' in {}", COORDINATE_MARKER, url)))?;
    let segment = tail.split('/').next().unwrap_or_default();

    let mut tokens = segment.split(',');
    let mut next_number = |axis: &str| -> Result<f64, ScraperError> {
        let token = tokens
            .next()
            .ok_or_else(|| ScraperError::Coordinates(format!("missing {} in {}", axis, url)))?;
        let value = token
            .trim()
            .parse::<f64>()
            .map_err(|e| ScraperError::Coordinates(format!("{} {:?}: {}", axis, token, e)))?;
        if !value.is_finite() {
            return Err(ScraperError::Coordinates(format!(
                "{} {:?} is not finite",
                axis, token
            )));
        }
        Ok(value)
    };

    let latitude = next_number("latitude")?;
    let longitude = next_number("longitude")?;
    Ok((latitude, longitude))
}

/// `"1,234 reviews"` → `1234`
pub fn parse_reviews_count(text: &str) -> Option<u32> {
    let token = text.split_whitespace().next()?;
    let digits: String = token
        .trim_matches(|c| c == '(' || c == ')')
        .chars()
        .filter(|c| *c != ',' && *c != '.')
        .collect();
    digits.parse().ok()
}

/// `"4,5 stars"` / `"4.5 stars"` → `4.5`
pub fn parse_reviews_average(label: &str) -> Option<f64> {
    let token = label.split_whitespace().next()?;
    token.replace(',', ".").parse().ok()
}
