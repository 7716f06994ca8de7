use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_aws_region, validate_non_empty_string, validate_range, validate_s3_bucket_name,
    validate_url, Validate,
};

pub const DEFAULT_STAGE_SCHEMA: &str = "stage";
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Object storage settings (`S3_BUCKET_NAME`, `AWS_REGION`, `S3_ENDPOINT_URL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// 本地 MinIO / LocalStack 用
    pub endpoint_url: Option<String>,
}

impl StorageSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            bucket: required(&lookup, "S3_BUCKET_NAME")?,
            region: required(&lookup, "AWS_REGION")?,
            endpoint_url: optional(&lookup, "S3_ENDPOINT_URL"),
        })
    }
}

impl Validate for StorageSettings {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("S3_BUCKET_NAME", &self.bucket)?;
        validate_aws_region("AWS_REGION", &self.region)?;
        if let Some(endpoint) = &self.endpoint_url {
            validate_url("S3_ENDPOINT_URL", endpoint)?;
        }
        tracing::debug!("✅ Storage configuration validation passed");
        Ok(())
    }
}

/// Staging database settings (`PG_HOST`, `PG_PORT`, `PG_DB`, `PG_USER`,
/// `PG_PASSWORD`, `STAGE_SCHEMA`).
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub schema: String,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("schema", &self.schema)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match optional(&lookup, "PG_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| EtlError::InvalidConfigValueError {
                    field: "PG_PORT".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_PG_PORT,
        };

        Ok(Self {
            host: required(&lookup, "PG_HOST")?,
            port,
            database: required(&lookup, "PG_DB")?,
            user: required(&lookup, "PG_USER")?,
            password: required(&lookup, "PG_PASSWORD")?,
            schema: optional(&lookup, "STAGE_SCHEMA")
                .unwrap_or_else(|| DEFAULT_STAGE_SCHEMA.to_string()),
        })
    }
}

impl Validate for DatabaseSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("PG_HOST", &self.host)?;
        validate_range("PG_PORT", self.port, 1, u16::MAX)?;
        validate_non_empty_string("PG_DB", &self.database)?;
        validate_non_empty_string("PG_USER", &self.user)?;
        validate_non_empty_string("STAGE_SCHEMA", &self.schema)?;
        tracing::debug!("✅ Database configuration validation passed");
        Ok(())
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(lookup, name).ok_or_else(|| EtlError::ConfigurationMissing {
        field: name.to_string(),
    })
}

/// 空字串視同未設定
fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}
