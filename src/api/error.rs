// ==========================================
// 试算平衡表导入系统 - API层错误类型
// ==========================================
// 职责: 将仓储/导入层的技术错误转换为调用方可读的错误消息
// ==========================================

use crate::importer::error::IngestError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入/配置错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::NotNullViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段 {} 数据异常: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 IngestError 转换
// ==========================================
impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Config { .. } => ApiError::ConfigError(err.to_string()),
            IngestError::Persistence(msg) => ApiError::DatabaseError(msg),
            IngestError::Internal(msg) => ApiError::InternalError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从 rusqlite::Error 转换（打开数据库/建表）
// ==========================================
impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::DatabaseConnectionError(err.to_string())
    }
}

/// API层Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_maps_to_connection_error() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
    }

    #[test]
    fn test_config_error_kept_distinct() {
        let api_err: ApiError = IngestError::Config {
            key: "ingest.max_workers".to_string(),
            value: "x".to_string(),
            message: "invalid digit".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::ConfigError(_)));
    }
}
