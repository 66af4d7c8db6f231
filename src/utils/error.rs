use thiserror::Error;

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("Dataset '{dataset}' is empty, cross-reference aborted")]
    EmptyDataset { dataset: String },

    #[error("Class '{group}' not found or has no species counts")]
    GroupNotFound { group: String },

    #[error("Class '{group}' has only zero image counts, cumulative fraction is undefined")]
    DegenerateDistribution { group: String },

    #[error("Class '{group}' image counts exceed the supported total")]
    CountOverflow { group: String },

    #[error("Threshold {value} is outside (0, 1]")]
    InvalidThreshold { value: f64 },

    #[error("Invalid dataset: {message}")]
    InvalidDataset { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Worker task failed: {message}")]
    TaskError { message: String },
}

// 錯誤種類，用於 `Outcome::Failed` 標記
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyDataset,
    GroupNotFound,
    DegenerateDistribution,
    CountOverflow,
    InvalidThreshold,
    InvalidDataset,
    Io,
    Serialization,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Configuration,
    Io,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CensusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CensusError::EmptyDataset { .. } => ErrorKind::EmptyDataset,
            CensusError::GroupNotFound { .. } => ErrorKind::GroupNotFound,
            CensusError::DegenerateDistribution { .. } => ErrorKind::DegenerateDistribution,
            CensusError::CountOverflow { .. } => ErrorKind::CountOverflow,
            CensusError::InvalidThreshold { .. } => ErrorKind::InvalidThreshold,
            CensusError::InvalidDataset { .. } => ErrorKind::InvalidDataset,
            CensusError::IoError(_) => ErrorKind::Io,
            CensusError::SerializationError(_) | CensusError::CsvError(_) => {
                ErrorKind::Serialization
            }
            CensusError::ConfigError { .. }
            | CensusError::ConfigValidationError { .. }
            | CensusError::InvalidConfigValueError { .. }
            | CensusError::MissingConfigError { .. } => ErrorKind::Configuration,
            CensusError::TaskError { .. } => ErrorKind::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::EmptyDataset
            | ErrorKind::GroupNotFound
            | ErrorKind::DegenerateDistribution
            | ErrorKind::CountOverflow
            | ErrorKind::InvalidDataset
            | ErrorKind::Serialization => ErrorCategory::Data,
            ErrorKind::InvalidThreshold | ErrorKind::Configuration => ErrorCategory::Configuration,
            ErrorKind::Io => ErrorCategory::Io,
            ErrorKind::Internal => ErrorCategory::Internal,
        }
    }

    // 單一類別的失敗屬於可恢復錯誤，不影響其他類別
    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::GroupNotFound
            | ErrorKind::DegenerateDistribution
            | ErrorKind::CountOverflow => ErrorSeverity::Medium,
            ErrorKind::EmptyDataset
            | ErrorKind::InvalidThreshold
            | ErrorKind::InvalidDataset
            | ErrorKind::Serialization
            | ErrorKind::Configuration => ErrorSeverity::High,
            ErrorKind::Io | ErrorKind::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CensusError::EmptyDataset { dataset } => format!(
                "Check that '{}' contains at least one class with species",
                dataset
            ),
            CensusError::GroupNotFound { group } => format!(
                "Remove '{}' from the target classes or regenerate the composition file",
                group
            ),
            CensusError::DegenerateDistribution { group } => {
                format!("Class '{}' has no images, rescan the dataset", group)
            }
            CensusError::CountOverflow { group } => {
                format!("Check the image counts of class '{}' for corrupt values", group)
            }
            CensusError::InvalidThreshold { .. } => {
                "Use a threshold greater than 0 and at most 1 (e.g. 0.5)".to_string()
            }
            CensusError::InvalidDataset { .. } => {
                "Make sure class and species names are non-empty strings".to_string()
            }
            CensusError::IoError(_) => "Check file paths and permissions".to_string(),
            CensusError::SerializationError(_) => {
                "Make sure the input is valid JSON of the expected shape".to_string()
            }
            CensusError::CsvError(_) => "Check the output directory is writable".to_string(),
            CensusError::ConfigError { .. }
            | CensusError::ConfigValidationError { .. }
            | CensusError::InvalidConfigValueError { .. } => {
                "Review the configuration file or command line arguments".to_string()
            }
            CensusError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            CensusError::TaskError { .. } => "Re-run with --verbose and report the log".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Internal => format!("Internal failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
