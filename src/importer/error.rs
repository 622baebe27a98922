// ==========================================
// 试算平衡表导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 行级错误只计数，文件级错误终止当前任务，批次级错误终止当前任务的重试
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum IngestError {
    // ===== 文件相关错误（文件级，终止当前任务）=====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    ParseError(String),

    // ===== 表头/类型错误 =====
    #[error("缺少必需列: {}", missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeCoercion {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 业务流程错误 =====
    #[error("文件已导入过 (fingerprint={0})")]
    DuplicateFile(String),

    #[error("落库失败: {0}")]
    Persistence(String),

    #[error("校验未通过: 严重失败 {critical_failures} 项")]
    ValidationGateFailure { critical_failures: usize },

    #[error("Max retries exceeded")]
    MaxRetriesExceeded,

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    Config {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IngestError::FileNotFound(err.to_string()),
            std::io::ErrorKind::InvalidData => IngestError::ParseError(err.to_string()),
            _ => IngestError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io_err) if io_err.kind() != std::io::ErrorKind::InvalidData => {
                IngestError::FileReadError(err.to_string())
            }
            _ => IngestError::ParseError(err.to_string()),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        IngestError::Persistence(err.to_string())
    }
}

// 实现 From<RepositoryError>
impl From<crate::repository::RepositoryError> for IngestError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        IngestError::Persistence(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Internal(err.to_string())
    }
}

/// Result 类型别名
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_retries_message() {
        assert_eq!(IngestError::MaxRetriesExceeded.to_string(), "Max retries exceeded");
    }

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err: IngestError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }

    #[test]
    fn test_schema_validation_message_lists_columns() {
        let err = IngestError::SchemaValidation {
            missing: vec!["account_code".to_string(), "balance".to_string()],
        };
        assert_eq!(err.to_string(), "缺少必需列: account_code, balance");
    }
}
