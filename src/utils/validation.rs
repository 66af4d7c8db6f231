use crate::utils::error::{CensusError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(CensusError::MissingConfigError {
            field: field_name.to_string(),
        });
    }

    if path.contains('\0') {
        return Err(CensusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_json_path(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;

    let is_json = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if !is_json {
        return Err(CensusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Expected a .json file".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(CensusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CensusError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

// 門檻值必須落在 (0, 1]，NaN 亦視為無效
pub fn validate_threshold(value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 || value > 1.0 {
        return Err(CensusError::InvalidThreshold { value });
    }
    Ok(())
}

pub fn validate_thresholds(values: &[f64]) -> Result<()> {
    values.iter().try_for_each(|&value| validate_threshold(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_json_path() {
        assert!(validate_json_path("dataset_a", "data/a_species.json").is_ok());
        assert!(validate_json_path("dataset_a", "data/A.JSON").is_ok());
        assert!(matches!(
            validate_json_path("dataset_a", ""),
            Err(CensusError::MissingConfigError { .. })
        ));
        assert!(validate_json_path("dataset_a", "data/a_species.yaml").is_err());
        assert!(validate_json_path("dataset_a", "data/noext").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("workers", 4, 1).is_ok());
        assert!(validate_positive_number("workers", 0, 1).is_err());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(0.5).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(-0.1).is_err());
        assert!(validate_threshold(1.0001).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_thresholds_reports_first_bad_value() {
        let err = validate_thresholds(&[0.5, 2.0, -1.0]).unwrap_err();
        match err {
            CensusError::InvalidThreshold { value } => assert_eq!(value, 2.0),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
