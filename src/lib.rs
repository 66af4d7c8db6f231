pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{
    composition::{
        composition_summary, cumulative_fraction, dominant_species, dominant_species_batch,
        sorted_counts, threshold_crossings, DEFAULT_COVERAGE_THRESHOLDS,
    },
    engine::CensusEngine,
    matcher::{aggregate_species, cross_reference, cross_reference_classes, set_difference},
    pipeline::CensusPipeline,
};
pub use domain::model::{CompositionTable, CrossReferenceRecord, Outcome, TaxonomyMapping};
pub use utils::error::{CensusError, Result};
