use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension) => {}
            Some(extension) => {
                return Err(invalid(
                    field_name,
                    file,
                    format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                ))
            }
            None => {
                return Err(invalid(
                    field_name,
                    file,
                    "File has no extension or invalid filename",
                ))
            }
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name must be between 3 and 63 characters",
        ));
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid(
            field_name,
            bucket_name,
            "S3 bucket name cannot start or end with a hyphen",
        ));
    }

    Ok(())
}

pub fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    // AWS region format validation
    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field_name,
            region,
            "AWS region can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("S3_ENDPOINT_URL", "https://s3.example.com").is_ok());
        assert!(validate_url("S3_ENDPOINT_URL", "http://localhost:9000").is_ok());
        assert!(validate_url("S3_ENDPOINT_URL", "").is_err());
        assert!(validate_url("S3_ENDPOINT_URL", "invalid-url").is_err());
        assert!(validate_url("S3_ENDPOINT_URL", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_s3_bucket_name() {
        assert!(validate_s3_bucket_name("bucket", "ecommerce-raw.data").is_ok());
        assert!(validate_s3_bucket_name("bucket", "ab").is_err());
        assert!(validate_s3_bucket_name("bucket", "-leading").is_err());
        assert!(validate_s3_bucket_name("bucket", "Upper_Case").is_err());
    }

    #[test]
    fn test_validate_aws_region() {
        assert!(validate_aws_region("region", "sa-east-1").is_ok());
        assert!(validate_aws_region("region", "").is_err());
        assert!(validate_aws_region("region", "US East").is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["orders.csv".to_string(), "payments.csv".to_string()];
        assert!(validate_file_extensions("sources", &files, &["csv"]).is_ok());

        let invalid_files = vec!["orders.parquet".to_string()];
        assert!(validate_file_extensions("sources", &invalid_files, &["csv"]).is_err());

        let no_extension = vec!["orders".to_string()];
        assert!(validate_file_extensions("sources", &no_extension, &["csv"]).is_err());
    }
}
