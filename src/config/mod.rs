pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::composition::DEFAULT_COVERAGE_THRESHOLDS;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "species-census")]
#[command(about = "Cross-reference species inventories and find dominant species per class")]
pub struct CliConfig {
    /// First species JSON file ({class: [species, ...]})
    #[arg(long)]
    pub dataset_a: String,

    /// Second species JSON file
    #[arg(long)]
    pub dataset_b: String,

    /// Composition JSON file ({class: {species: image_count}})
    #[arg(long)]
    pub composition: Option<String>,

    /// Only analyze these classes
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<String>,

    /// Cumulative fraction used to pick dominant species
    #[arg(long, default_value = "0.5")]
    pub threshold: f64,

    /// Coverage points to report
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_COVERAGE_THRESHOLDS)]
    pub coverage: Vec<f64>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Recompute even when output files already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn dataset_a_path(&self) -> &str {
        &self.dataset_a
    }

    fn dataset_b_path(&self) -> &str {
        &self.dataset_b
    }

    fn composition_path(&self) -> Option<&str> {
        self.composition.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn target_classes(&self) -> &[String] {
        &self.classes
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn coverage_thresholds(&self) -> &[f64] {
        &self.coverage
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn overwrite(&self) -> bool {
        self.overwrite
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_json_path("dataset_a", &self.dataset_a)?;
        validation::validate_json_path("dataset_b", &self.dataset_b)?;
        if let Some(composition) = &self.composition {
            validation::validate_json_path("composition", composition)?;
        }
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_positive_number("workers", self.workers, 1)?;
        for class in &self.classes {
            validation::validate_non_empty_string("classes", class)?;
        }
        validation::validate_threshold(self.threshold)?;
        validation::validate_thresholds(&self.coverage)?;
        Ok(())
    }
}
