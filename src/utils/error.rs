use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source not found: {location}")]
    SourceNotFound { location: String },

    #[error("Unknown table: {table}")]
    UnknownTable { table: String },

    #[error("Schema violation in table '{table}': {message}")]
    SchemaViolation { table: String, message: String },

    #[error("Missing required configuration: {field}")]
    ConfigurationMissing { field: String },

    #[error("Malformed run timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Object storage failure: {message}")]
    StorageFailure { message: String },

    #[error("Database failure: {0}")]
    DatabaseFailure(#[from] sqlx::Error),

    #[error("Malformed CSV record at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 輸入檔案或儲存物件缺失、格式錯誤
    Input,
    /// 資料表結構不符合 contract
    Schema,
    /// 環境變數或設定檔問題
    Configuration,
    /// S3 / Postgres 等外部系統失敗
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 外部系統暫時性錯誤，排程器可重試
    Medium,
    /// 資料或輸入錯誤，需要人工處理
    High,
    /// 設定錯誤，程式無法啟動
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SourceNotFound { .. }
            | EtlError::MalformedTimestamp { .. }
            | EtlError::MalformedRecord { .. }
            | EtlError::CsvError(_)
            | EtlError::IoError(_) => ErrorCategory::Input,
            EtlError::UnknownTable { .. } | EtlError::SchemaViolation { .. } => {
                ErrorCategory::Schema
            }
            EtlError::ConfigurationMissing { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::StorageFailure { .. }
            | EtlError::DatabaseFailure(_)
            | EtlError::SerializationError(_) => ErrorCategory::External,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::External => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Schema => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for a failed stage. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::SourceNotFound { location } => {
                format!("Expected input is missing: {}", location)
            }
            EtlError::UnknownTable { table } => {
                format!("'{}' is not a registered table", table)
            }
            EtlError::SchemaViolation { table, message } => {
                format!("Table '{}' does not match its schema: {}", table, message)
            }
            EtlError::ConfigurationMissing { field } => {
                format!("Environment variable {} is not set", field)
            }
            EtlError::MalformedTimestamp { value, .. } => {
                format!("'{}' is not a usable run timestamp", value)
            }
            EtlError::MalformedRecord { line, .. } => {
                format!("Line {} has more fields than the header", line)
            }
            EtlError::DatabaseFailure(_) => "The staging database rejected the load".to_string(),
            EtlError::StorageFailure { .. } => "Object storage request failed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the previous stage ran with the same run timestamp and that source files exist"
            }
            ErrorCategory::Schema => {
                "Compare the input header with the table contract in the schema registry"
            }
            ErrorCategory::Configuration => {
                "Set the missing variables in the environment or in a .env file"
            }
            ErrorCategory::External => {
                "Verify credentials and connectivity, then let the scheduler retry the stage"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_failure_exits_non_zero() {
        let errors = vec![
            EtlError::SourceNotFound {
                location: "data/raw/orders.csv".to_string(),
            },
            EtlError::UnknownTable {
                table: "refunds".to_string(),
            },
            EtlError::ConfigurationMissing {
                field: "S3_BUCKET_NAME".to_string(),
            },
            EtlError::StorageFailure {
                message: "timeout".to_string(),
            },
        ];

        for error in errors {
            assert_ne!(error.exit_code(), 0, "{}", error);
        }
    }

    #[test]
    fn test_categories() {
        let missing = EtlError::ConfigurationMissing {
            field: "PG_HOST".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Configuration);
        assert_eq!(missing.severity(), ErrorSeverity::Critical);

        let violation = EtlError::SchemaViolation {
            table: "orders".to_string(),
            message: "missing column order_id".to_string(),
        };
        assert_eq!(violation.category(), ErrorCategory::Schema);
        assert!(violation.user_friendly_message().contains("orders"));
    }
}
