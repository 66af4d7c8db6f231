use crate::core::composition::DEFAULT_COVERAGE_THRESHOLDS;
use crate::core::ConfigProvider;
use crate::domain::ports::dataset_name_from_path;
use crate::utils::error::{CensusError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub census: CensusConfig,
    pub datasets: DatasetsConfig,
    pub analysis: Option<AnalysisConfig>,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    pub dataset_a: String,
    pub dataset_b: String,
    pub name_a: Option<String>,
    pub name_b: Option<String>,
    pub composition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub target_classes: Option<Vec<String>>,
    pub threshold: Option<f64>,
    pub coverage_thresholds: Option<Vec<f64>>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub log_dir: Option<String>,
    pub log_file: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CensusError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CensusError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CensusError::ConfigError {
            message: format!("Invalid env var pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if self.census.name.trim().is_empty() {
            return Err(CensusError::MissingConfigError {
                field: "census.name".to_string(),
            });
        }
        validation::validate_json_path("datasets.dataset_a", &self.datasets.dataset_a)?;
        validation::validate_json_path("datasets.dataset_b", &self.datasets.dataset_b)?;
        if let Some(composition) = &self.datasets.composition {
            validation::validate_json_path("datasets.composition", composition)?;
        }
        validation::validate_path("output.path", &self.output.path)?;

        if let Some(workers) = self.analysis.as_ref().and_then(|a| a.workers) {
            validation::validate_positive_number("analysis.workers", workers, 1)?;
        }
        for class in self.target_classes() {
            validation::validate_non_empty_string("analysis.target_classes", class)?;
        }

        validation::validate_threshold(self.threshold())?;
        validation::validate_thresholds(self.coverage_thresholds())?;

        Ok(())
    }

    pub fn threshold(&self) -> f64 {
        self.analysis
            .as_ref()
            .and_then(|a| a.threshold)
            .unwrap_or(0.5)
    }

    pub fn workers(&self) -> usize {
        self.analysis.as_ref().and_then(|a| a.workers).unwrap_or(4)
    }

    pub fn overwrite(&self) -> bool {
        self.output.overwrite.unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    /// 日誌檔路徑：明確指定優先，其次在 log_dir 下產生帶時間戳的檔名
    pub fn log_file(&self) -> Option<PathBuf> {
        let logging = self.logging.as_ref()?;
        if let Some(file) = &logging.log_file {
            return Some(PathBuf::from(file));
        }
        logging
            .log_dir
            .as_ref()
            .map(crate::utils::logger::default_log_file)
    }
}

impl ConfigProvider for TomlConfig {
    fn dataset_a_path(&self) -> &str {
        &self.datasets.dataset_a
    }

    fn dataset_b_path(&self) -> &str {
        &self.datasets.dataset_b
    }

    fn composition_path(&self) -> Option<&str> {
        self.datasets.composition.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn target_classes(&self) -> &[String] {
        self.analysis
            .as_ref()
            .and_then(|a| a.target_classes.as_deref())
            .unwrap_or(&[])
    }

    fn threshold(&self) -> f64 {
        TomlConfig::threshold(self)
    }

    fn coverage_thresholds(&self) -> &[f64] {
        self.analysis
            .as_ref()
            .and_then(|a| a.coverage_thresholds.as_deref())
            .unwrap_or(&DEFAULT_COVERAGE_THRESHOLDS)
    }

    fn workers(&self) -> usize {
        TomlConfig::workers(self)
    }

    fn overwrite(&self) -> bool {
        TomlConfig::overwrite(self)
    }

    fn dataset_a_name(&self) -> String {
        self.datasets
            .name_a
            .clone()
            .unwrap_or_else(|| dataset_name_from_path(&self.datasets.dataset_a))
    }

    fn dataset_b_name(&self) -> String {
        self.datasets
            .name_b
            .clone()
            .unwrap_or_else(|| dataset_name_from_path(&self.datasets.dataset_b))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[census]
name = "inat-vs-haute-garonne"

[datasets]
dataset_a = "./output/inat_species.json"
dataset_b = "./output/haute_garonne_species.json"
name_b = "Haute-Garonne"
composition = "./output/inat_composition.json"

[analysis]
target_classes = ["Aves", "Insecta"]
threshold = 0.8
workers = 2

[output]
path = "./output"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.census.name, "inat-vs-haute-garonne");
        assert_eq!(config.target_classes(), ["Aves", "Insecta"]);
        assert_eq!(ConfigProvider::threshold(&config), 0.8);
        assert_eq!(ConfigProvider::workers(&config), 2);
        assert_eq!(config.coverage_thresholds(), DEFAULT_COVERAGE_THRESHOLDS);
        assert!(!ConfigProvider::overwrite(&config));
        assert_eq!(config.dataset_a_name(), "inat");
        assert_eq!(config.dataset_b_name(), "Haute-Garonne");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
[census]
name = "minimal"

[datasets]
dataset_a = "a.json"
dataset_b = "b.json"

[output]
path = "./out"
"#,
        )
        .unwrap();

        assert!(config.target_classes().is_empty());
        assert_eq!(ConfigProvider::threshold(&config), 0.5);
        assert_eq!(ConfigProvider::workers(&config), 4);
        assert!(config.composition_path().is_none());
        assert!(config.log_file().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CENSUS_TEST_DATA_DIR", "/data/census");

        let config = TomlConfig::from_toml_str(
            r#"
[census]
name = "env"

[datasets]
dataset_a = "${CENSUS_TEST_DATA_DIR}/a.json"
dataset_b = "${CENSUS_TEST_UNSET_VAR}/b.json"

[output]
path = "./out"
"#,
        )
        .unwrap();

        assert_eq!(config.datasets.dataset_a, "/data/census/a.json");
        assert_eq!(config.datasets.dataset_b, "${CENSUS_TEST_UNSET_VAR}/b.json");

        std::env::remove_var("CENSUS_TEST_DATA_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_threshold = BASIC.replace("threshold = 0.8", "threshold = 1.2");
        let config = TomlConfig::from_toml_str(&bad_threshold).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CensusError::InvalidThreshold { .. })
        ));

        let bad_workers = BASIC.replace("workers = 2", "workers = 0");
        let config = TomlConfig::from_toml_str(&bad_workers).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_name_or_dataset_is_missing_config() {
        let blank_name = BASIC.replace("name = \"inat-vs-haute-garonne\"", "name = \"  \"");
        let config = TomlConfig::from_toml_str(&blank_name).unwrap();
        match config.validate() {
            Err(CensusError::MissingConfigError { field }) => assert_eq!(field, "census.name"),
            other => panic!("unexpected result: {:?}", other),
        }

        let blank_dataset = BASIC.replace("./output/inat_species.json", "");
        let config = TomlConfig::from_toml_str(&blank_dataset).unwrap();
        match config.validate() {
            Err(CensusError::MissingConfigError { field }) => {
                assert_eq!(field, "datasets.dataset_a")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[census\nname = ").unwrap_err();
        assert!(matches!(err, CensusError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_log_file_resolution() {
        let with_dir = format!("{}\n[logging]\nlog_dir = \"./logs\"\n", BASIC);
        let config = TomlConfig::from_toml_str(&with_dir).unwrap();
        assert!(config.log_file().unwrap().starts_with("./logs"));

        let with_file = format!("{}\n[logging]\nlog_file = \"run.log\"\nverbose = true\n", BASIC);
        let config = TomlConfig::from_toml_str(&with_file).unwrap();
        assert_eq!(config.log_file().unwrap(), PathBuf::from("run.log"));
        assert!(config.verbose());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.census.name, "inat-vs-haute-garonne");
    }
}
