// ==========================================
// 商品批量导入系统 - 文件解析器实现
// ==========================================
// 支持: 分隔文本 (.csv/.tsv/.txt) / 电子表格 (.xlsx/.xlsm/.xls/.ods)
// 约定: 第一行为表头，全空行跳过但保留其余行的物理行号
// ==========================================

use crate::domain::item::{RawRow, SourceRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::item_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];
const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 分隔符探测: .tsv 用制表符；其他按表头行中出现最多的候选分隔符
    fn detect_delimiter(ext: &str, header_line: &str) -> u8 {
        if ext == "tsv" {
            return b'\t';
        }

        [b',', b';', b'\t']
            .into_iter()
            .max_by_key(|d| header_line.bytes().filter(|b| b == d).count())
            .filter(|d| header_line.as_bytes().contains(d))
            .unwrap_or(b',')
    }
}

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<SourceRow>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let content = std::fs::read_to_string(file_path)?;
        let content = content.trim_start_matches('\u{feff}');
        let header_line = content.lines().next().unwrap_or("");
        let delimiter = Self::detect_delimiter(&ext, header_line);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            // csv 会静默跳过完全空白的行，行号以记录起始位置为准
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows.len() + 2);
            let mut row = RawRow::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx).filter(|h| !h.is_empty()) {
                    row.insert(header.clone(), Value::String(value.trim().to_string()));
                }
            }

            if row.values().all(is_blank) {
                continue;
            }

            rows.push(SourceRow::new(line, row));
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 单元格 → JSON 值（数值保持数值，空单元格为 Null）
    fn cell_to_value(cell: &Data) -> Value {
        match cell {
            Data::Empty => Value::Null,
            Data::String(s) => Value::String(s.trim().to_string()),
            Data::Int(i) => Value::from(*i),
            Data::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Data::Bool(b) => Value::Bool(*b),
            other => Value::String(other.to_string().trim().to_string()),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<SourceRow>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        // 数据区可能不从 A1 开始
        let first_line = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 1;

        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("工作表无表头行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (offset, data_row) in sheet_rows.enumerate() {
            let line = first_line + offset + 1;
            let mut row = RawRow::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx).filter(|h| !h.is_empty()) {
                    row.insert(header.clone(), Self::cell_to_value(cell));
                }
            }

            if row.values().all(is_blank) {
                continue;
            }

            rows.push(SourceRow::new(line, row));
        }

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<SourceRow>> {
        let ext = extension_of(file_path);

        if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
            CsvParser.parse_rows(file_path)
        } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            ExcelParser.parse_rows(file_path)
        } else {
            Err(ImportError::UnsupportedFormat(ext))
        }
    }
}
