// ==========================================
// 试算平衡表导入系统 - 文件解析器实现
// ==========================================
// 支持: CSV (.csv, UTF-8, 首行为表头)
// 约束: 字段数与表头不一致的行视为格式错误，整文件失败
// ==========================================

use crate::domain::RawDataset;
use crate::importer::error::{IngestError, IngestResult};
use crate::importer::ingest_traits::FileParser;
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> IngestResult<RawDataset> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(IngestError::UnsupportedFormat(ext));
        }

        // 打开 CSV 文件
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(file);

        // 读取表头（去除 UTF-8 BOM）
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::ParseError(format!(
                "{}: 文件无表头",
                path.display()
            )));
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(IngestError::ParseError(format!(
                    "{}: 表头重复列 {}",
                    path.display(),
                    header
                )));
            }
        }

        // 读取所有行
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::with_capacity(headers.len());

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(RawDataset::new(headers, records))
    }
}
