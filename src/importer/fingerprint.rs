// ==========================================
// 试算平衡表导入系统 - 文件指纹
// ==========================================
// 职责: 文件内容 SHA-256 指纹 + 基于审计日志的重复文件判定
// 约束: 分块读取，不一次性加载整个文件
// ==========================================

use crate::importer::error::{IngestError, IngestResult};
use crate::importer::ingest_traits::AuditSink;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 默认分块大小（字节）
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 对任意可读源分块计算 SHA-256（64 位十六进制小写）
pub fn compute_fingerprint<R: Read>(reader: &mut R, chunk_size: usize) -> IngestResult<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

// ==========================================
// Fingerprinter
// ==========================================
pub struct Fingerprinter {
    audit: Arc<dyn AuditSink>,
    chunk_size: usize,
}

impl Fingerprinter {
    pub fn new(audit: Arc<dyn AuditSink>, chunk_size: usize) -> Self {
        Self { audit, chunk_size }
    }

    /// 计算文件指纹
    ///
    /// # 返回
    /// - Ok(String): 64 位十六进制 SHA-256
    /// - Err(FileNotFound / FileReadError): 文件无法打开或读取
    pub fn generate_fingerprint(&self, file_path: &Path) -> IngestResult<String> {
        let mut file = File::open(file_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                IngestError::FileNotFound(file_path.display().to_string())
            }
            _ => IngestError::FileReadError(format!("{}: {}", file_path.display(), e)),
        })?;

        let fingerprint = compute_fingerprint(&mut file, self.chunk_size)?;
        debug!(file = %file_path.display(), fingerprint = %fingerprint, "文件指纹计算完成");
        Ok(fingerprint)
    }

    /// 是否已有相同内容的文件成功导入
    ///
    /// 只说明字节内容相同，不代表主体/期间相同
    pub fn check_duplicate(&self, fingerprint: &str) -> IngestResult<bool> {
        self.audit.find_duplicate_fingerprint(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuditEvent, IngestionMetadata};
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct FixedAudit {
        known: Mutex<Vec<String>>,
    }

    impl AuditSink for FixedAudit {
        fn log_event(&self, _event: &AuditEvent) -> IngestResult<()> {
            Ok(())
        }

        fn find_duplicate_fingerprint(&self, fingerprint: &str) -> IngestResult<bool> {
            Ok(self.known.lock().unwrap().iter().any(|k| k == fingerprint))
        }

        fn record_ingestion_metadata(&self, _metadata: &IngestionMetadata) -> IngestResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_compute_fingerprint_known_vector() {
        let mut cursor = Cursor::new(b"hello world");
        let fingerprint = compute_fingerprint(&mut cursor, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(
            fingerprint,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_chunk_size_does_not_change_fingerprint() {
        let data = vec![7u8; 10_000];
        let small = compute_fingerprint(&mut Cursor::new(&data), 3).unwrap();
        let large = compute_fingerprint(&mut Cursor::new(&data), 8192).unwrap();
        assert_eq!(small, large);
        assert_eq!(small.len(), 64);
    }

    #[test]
    fn test_generate_fingerprint_deterministic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "account_code,balance").unwrap();
        writeln!(temp_file, "1000,12.5").unwrap();

        let fingerprinter = Fingerprinter::new(Arc::new(FixedAudit::default()), DEFAULT_CHUNK_SIZE);
        let first = fingerprinter.generate_fingerprint(temp_file.path()).unwrap();
        let second = fingerprinter.generate_fingerprint(temp_file.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_fingerprint_missing_file() {
        let fingerprinter = Fingerprinter::new(Arc::new(FixedAudit::default()), DEFAULT_CHUNK_SIZE);
        let result = fingerprinter.generate_fingerprint(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(IngestError::FileNotFound(_))));
    }

    #[test]
    fn test_check_duplicate_delegates_to_audit() {
        let audit = Arc::new(FixedAudit::default());
        audit.known.lock().unwrap().push("abc".to_string());

        let fingerprinter = Fingerprinter::new(audit, DEFAULT_CHUNK_SIZE);
        assert!(fingerprinter.check_duplicate("abc").unwrap());
        assert!(!fingerprinter.check_duplicate("def").unwrap());
    }
}
