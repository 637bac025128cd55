use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ブラウザセッション切断: {0}")]
    Session(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("座標を取得できません: {0}")]
    Coordinates(String),

    #[error("出力エラー: {0}")]
    Export(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

impl ScraperError {
    /// ブラウザ/ページが使えなくなったエラーか（リスティング単位でスキップできない）
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrowserInit(_) | Self::Session(_))
    }
}

impl From<csv::Error> for ScraperError {
    fn from(e: csv::Error) -> Self {
        Self::Export(format!("CSV: {}", e))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ScraperError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(format!("XLSX: {}", e))
    }
}
