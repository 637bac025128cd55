//! Google Maps スクレイパーの型定義

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 出力ファイル名の接頭辞
const FILE_PREFIX: &str = "google_maps_data_";

/// 1件の事業者データ
///
/// フィールドの宣言順がそのまま出力列の順になる。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusinessRecord {
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone_number: String,
    pub reviews_count: Option<u32>,
    pub reviews_average: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub maps_url: String,
}

/// 1検索語分の結果
#[derive(Debug, Clone, Default)]
pub struct ResultBatch {
    pub term: String,
    pub records: Vec<BusinessRecord>,
    /// 抽出に失敗してスキップしたリスティング数
    pub skipped: usize,
}

impl ResultBatch {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, record: BusinessRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 出力ファイル名（拡張子なし）
    ///
    /// 空白とパス区切りは `_` に置き換える。
    pub fn file_stem(&self) -> String {
        format!("{}{}", FILE_PREFIX, self.term)
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect()
    }
}

/// スクロール収集の終了状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectOutcome {
    /// 指定件数に到達
    ReachedTarget,
    /// 件数が増えなくなった
    Exhausted,
    /// スクロール回数の上限
    RoundLimit,
}

/// 検索語ごとの処理結果
#[derive(Debug, Clone, Serialize)]
pub struct TermSummary {
    pub term: String,
    pub outcome: CollectOutcome,
    pub collected: usize,
    pub exported: usize,
    pub skipped: usize,
    pub files: Vec<PathBuf>,
    pub export_error: Option<String>,
}

impl TermSummary {
    pub fn is_success(&self) -> bool {
        self.export_error.is_none()
    }
}

/// 実行全体の結果
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub terms: Vec<TermSummary>,
}

impl RunSummary {
    pub fn total_records(&self) -> usize {
        self.terms.iter().map(|t| t.exported).sum()
    }

    pub fn failed_exports(&self) -> usize {
        self.terms.iter().filter(|t| !t.is_success()).count()
    }
}
