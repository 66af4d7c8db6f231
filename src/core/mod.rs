pub mod composition;
pub mod engine;
pub mod matcher;
pub mod pipeline;
pub mod worker;

pub use crate::domain::model::{
    CensusInputs, CensusResult, ClassComparison, CompositionReport, CompositionRow,
    CompositionSummary, CompositionTable, CrossReferenceRecord, DatasetSummary,
    DominantSpeciesResult, GroupAnalysis, NamedDataset, Outcome, SortedCounts, SpeciesCount,
    SpeciesSet, TaxonomyMapping, TaxonomyMappingBuilder, ThresholdCrossing, VennCounts,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
