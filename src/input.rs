//! 検索語の読み込み

use std::path::Path;

use tracing::{debug, info};

use crate::error::ScraperError;

/// 既定の検索語ファイル名（カレントディレクトリ）
pub const DEFAULT_INPUT_FILE: &str = "input.txt";

/// `--search` があればそれだけ、なければ入力ファイルの各行を検索語とする
///
/// 空行は無視する。1件もなければ設定エラー。
pub fn resolve_search_terms(
    search: Option<&str>,
    input_path: &Path,
) -> Result<Vec<String>, ScraperError> {
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(vec![term.to_string()]);
    }

    let terms = if input_path.exists() {
        let content = std::fs::read_to_string(input_path)?;
        let terms = parse_terms(&content);
        info!("Loaded {} search terms from {:?}", terms.len(), input_path);
        terms
    } else {
        debug!("Input file {:?} does not exist", input_path);
        Vec::new()
    };

    if terms.is_empty() {
        return Err(ScraperError::Config(format!(
            "You must either pass the -s search argument, or add searches to {}",
            input_path.display()
        )));
    }
    Ok(terms)
}

fn parse_terms(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
