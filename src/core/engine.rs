use crate::core::{Outcome, Pipeline};
use crate::utils::error::Result;

pub struct CensusEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> CensusEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting census...");

        // Extract
        tracing::info!("Loading datasets...");
        let inputs = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded {} ({} species) and {} ({} species)",
            inputs.dataset_a.name,
            inputs.dataset_a.mapping.species_count(),
            inputs.dataset_b.name,
            inputs.dataset_b.mapping.species_count()
        );

        // Transform
        tracing::info!("Analyzing...");
        let result = self.pipeline.transform(inputs).await?;
        tracing::info!(
            "Cross-reference: {}, composition: {}",
            result.cross_reference.label(),
            result.composition.label()
        );
        if let Outcome::Computed(report) = &result.composition {
            let failures = report.failures();
            if !failures.is_empty() {
                tracing::warn!(
                    "⚠️ {} of {} classes could not be analyzed",
                    failures.len(),
                    report.analyses.len()
                );
            }
        }

        // Load
        tracing::info!("Saving results...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
