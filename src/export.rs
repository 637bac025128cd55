//! 検索結果のExcel/CSV出力

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ScraperError;
use crate::maps::{BusinessRecord, ResultBatch};
use crate::traits::ExportSink;

/// ネストした項目の列名の区切り
const COLUMN_SEPARATOR: &str = "_";

/// 1検索語分の出力ファイル
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub xlsx: PathBuf,
    pub csv: PathBuf,
}

impl ExportedFiles {
    pub fn paths(&self) -> Vec<PathBuf> {
        vec![self.xlsx.clone(), self.csv.clone()]
    }
}

/// 出力ディレクトリに `.xlsx` と `.csv` を書き出す
#[derive(Debug, Clone)]
pub struct TabularExporter {
    output_dir: PathBuf,
}

impl TabularExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// レコード列を表に変換して書き出す
    ///
    /// 列は最初のレコード（空なら `T::default()`）から決める。
    pub fn write<T: Serialize + Default>(
        &self,
        records: &[T],
        stem: &str,
    ) -> Result<ExportedFiles, ScraperError> {
        let table = Table::from_records(records)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let files = ExportedFiles {
            xlsx: self.output_dir.join(format!("{}.xlsx", stem)),
            csv: self.output_dir.join(format!("{}.csv", stem)),
        };

        table.write_xlsx(&files.xlsx)?;
        table.write_csv(&files.csv)?;

        info!(
            "Saved {} rows to {:?} and {:?}",
            table.rows.len(),
            files.xlsx,
            files.csv
        );
        Ok(files)
    }
}

impl ExportSink for TabularExporter {
    fn export(&self, batch: &ResultBatch) -> Result<ExportedFiles, ScraperError> {
        self.write::<BusinessRecord>(&batch.records, &batch.file_stem())
    }
}

/// ヘッダーとフラット化した行
struct Table {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl Table {
    fn from_records<T: Serialize + Default>(records: &[T]) -> Result<Self, ScraperError> {
        let rows = records
            .iter()
            .map(flatten_record)
            .collect::<Result<Vec<_>, _>>()?;

        let columns = match rows.first() {
            Some(first) => first.keys().cloned().collect(),
            None => flatten_record(&T::default())?.keys().cloned().collect(),
        };

        Ok(Self { columns, rows })
    }

    fn write_csv(&self, path: &Path) -> Result<(), ScraperError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|column| cell_text(row.get(column))),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_xlsx(&self, path: &Path) -> Result<(), ScraperError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, column) in self.columns.iter().enumerate() {
            sheet.write_string(0, col as u16, column.as_str())?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, column) in self.columns.iter().enumerate() {
                let c = col as u16;
                match row.get(column) {
                    None | Some(Value::Null) => {}
                    Some(Value::Number(n)) => match n.as_f64() {
                        Some(f) => {
                            sheet.write_number(r, c, f)?;
                        }
                        None => {
                            sheet.write_string(r, c, n.to_string())?;
                        }
                    },
                    Some(Value::Bool(b)) => {
                        sheet.write_boolean(r, c, *b)?;
                    }
                    Some(value) => {
                        sheet.write_string(r, c, cell_text(Some(value)))?;
                    }
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// レコードを `列名 → 値` に平坦化（宣言順を保持）
fn flatten_record<T: Serialize>(record: &T) -> Result<Map<String, Value>, ScraperError> {
    let value = serde_json::to_value(record)
        .map_err(|e| ScraperError::Export(format!("serialize: {}", e)))?;

    let mut row = Map::new();
    match value {
        Value::Object(map) => flatten_into(&mut row, None, map),
        other => {
            row.insert("value".to_string(), other);
        }
    }
    Ok(row)
}

fn flatten_into(row: &mut Map<String, Value>, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let column = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, COLUMN_SEPARATOR, key),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(row, Some(&column), nested),
            value => {
                row.insert(column, value);
            }
        }
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
