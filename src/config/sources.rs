use crate::domain::schema::Table;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_file_extensions, validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the ingestion stage finds each table's source CSV.
///
/// Defaults to `<base_dir>/<table>.csv`; a TOML manifest can override the
/// directory and individual file names:
///
/// ```toml
/// base_dir = "${REPO_PATH}/data/raw"
///
/// [files]
/// payments = "olist_order_payments_dataset.csv"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLayout {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
}

impl SourceLayout {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            files: BTreeMap::new(),
        }
    }

    /// 從 TOML 檔案載入來源設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::SourceNotFound {
                location: path.as_ref().display().to_string(),
            },
            _ => EtlError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        let layout: Self = toml::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "sources".to_string(),
            message: format!("TOML parsing error: {}", e),
        })?;

        for name in layout.files.keys() {
            name.parse::<Table>()?;
        }
        Ok(layout)
    }

    pub fn path_for(&self, table: Table) -> PathBuf {
        match self.files.get(table.as_str()) {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => self.base_dir.join(file),
            None => self.base_dir.join(format!("{}.csv", table)),
        }
    }
}

impl Validate for SourceLayout {
    fn validate(&self) -> Result<()> {
        validate_path("sources.base_dir", &self.base_dir.to_string_lossy())?;
        let names: Vec<String> = Table::ALL
            .iter()
            .map(|t| self.path_for(*t).to_string_lossy().into_owned())
            .collect();
        validate_file_extensions("sources.files", &names, &["csv"])
    }
}

/// 替換環境變數 (例如 ${REPO_PATH})；未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
        field: "sources".to_string(),
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}
