use crate::core::composition::analyze_group;
use crate::core::matcher::{cross_reference_classes, venn_counts};
use crate::core::worker::{GroupTask, WorkerPool};
use crate::core::{
    CensusInputs, CensusResult, CompositionReport, CompositionSummary, CompositionTable,
    ConfigProvider, GroupAnalysis, NamedDataset, Outcome, Pipeline, Storage,
};
use crate::utils::error::{CensusError, Result};
use crate::utils::validation::{validate_threshold, validate_thresholds};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub const CROSS_REFERENCE_FILE: &str = "cross_reference.json";
pub const MATCHED_SPECIES_FILE: &str = "matched_species.json";
pub const DOMINANT_SPECIES_FILE: &str = "dominant_species.json";
pub const COVERAGE_REPORT_FILE: &str = "coverage_report.json";

#[derive(Serialize)]
struct CoverageReport<'a> {
    generated_at: &'a str,
    threshold: f64,
    groups: BTreeMap<&'a str, &'a GroupAnalysis>,
    failures: BTreeMap<String, String>,
}

pub struct CensusPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    pool: WorkerPool,
}

impl<S: Storage, C: ConfigProvider> CensusPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let pool = WorkerPool::new(config.workers());
        Self {
            storage,
            config,
            pool,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("Reading {}", path);
        let data = self.storage.read_file(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<String> {
        let path = self.output_file(name);
        let json = serde_json::to_string_pretty(value)?;
        self.storage.write_file(&path, json.as_bytes()).await?;
        tracing::debug!("Wrote {} ({} bytes)", path, json.len());
        Ok(path)
    }

    // 已有輸出且未要求覆寫時跳過
    async fn existing_output(&self, name: &str) -> Option<String> {
        let path = self.output_file(name);
        if !self.config.overwrite() && self.storage.exists(&path).await {
            Some(path)
        } else {
            None
        }
    }

    async fn load_dataset(&self, path: &str, name: String) -> Result<NamedDataset> {
        let mapping = self.read_json(path).await?;
        let dataset = NamedDataset { name, mapping };
        tracing::info!(
            "📥 Loaded {} from {}\n{}",
            dataset.name,
            path,
            dataset.mapping.summary()
        );
        Ok(dataset)
    }

    async fn analyze_composition(&self, table: CompositionTable) -> Result<CompositionReport> {
        let threshold = self.config.threshold();
        let coverage = self.config.coverage_thresholds();
        validate_threshold(threshold)?;
        validate_thresholds(coverage)?;

        let groups: Vec<String> = if self.config.target_classes().is_empty() {
            table.group_names().map(str::to_string).collect()
        } else {
            self.config.target_classes().to_vec()
        };

        let analyses = if groups.len() <= 1 {
            // 單一類別不需要開工作池
            groups
                .iter()
                .map(|group| {
                    let outcome =
                        Outcome::from_result(analyze_group(&table, group, threshold, coverage));
                    (group.clone(), outcome)
                })
                .collect()
        } else {
            let tasks = GroupTask::batch(&groups, threshold, coverage);
            self.pool.dispatch(Arc::new(table), tasks).await
        };

        Ok(CompositionReport {
            threshold,
            generated_at: chrono::Utc::now().to_rfc3339(),
            analyses,
        })
    }

    async fn write_composition_csv(
        &self,
        file_name: &str,
        summary: &CompositionSummary,
    ) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &summary.rows {
            writer.serialize(row)?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| CensusError::IoError(e.into_error()))?;

        let path = self.output_file(file_name);
        self.storage.write_file(&path, &data).await?;
        Ok(path)
    }
}

fn file_safe(group: &str) -> String {
    group
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

// 不同類別可能得到相同檔名（"Aves x" 與 "Aves_x"），重複時依序加上 _2、_3
fn composition_file_names<'a>(groups: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    groups
        .into_iter()
        .map(|group| {
            let stem = format!("composition_{}", file_safe(group));
            let mut name = format!("{}.csv", stem);
            let mut suffix = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}.csv", stem, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CensusPipeline<S, C> {
    async fn extract(&self) -> Result<CensusInputs> {
        let dataset_a = self
            .load_dataset(self.config.dataset_a_path(), self.config.dataset_a_name())
            .await?;
        let dataset_b = self
            .load_dataset(self.config.dataset_b_path(), self.config.dataset_b_name())
            .await?;

        let composition = match self.config.composition_path() {
            Some(path) => {
                let table: CompositionTable = self.read_json(path).await?;
                tracing::info!("📥 Loaded composition of {} classes from {}", table.len(), path);
                Some(table)
            }
            None => None,
        };

        Ok(CensusInputs {
            dataset_a,
            dataset_b,
            composition,
        })
    }

    async fn transform(&self, inputs: CensusInputs) -> Result<CensusResult> {
        let target_classes = self.config.target_classes();
        let mapping_a = &inputs.dataset_a.mapping;
        let mapping_b = &inputs.dataset_b.mapping;

        let (cross_reference, venn) = match self.existing_output(CROSS_REFERENCE_FILE).await {
            Some(path) => {
                tracing::info!("⏭️ {} already exists, skipping cross-reference", path);
                (
                    Outcome::Skipped {
                        reason: format!("{} already exists", path),
                    },
                    None,
                )
            }
            None => {
                // 比對器回報的是 dataset_a / dataset_b，換成設定中的資料集名稱
                let record = cross_reference_classes(mapping_a, mapping_b, target_classes)
                    .map_err(|e| match e {
                        CensusError::EmptyDataset { dataset } => CensusError::EmptyDataset {
                            dataset: if dataset == "dataset_a" {
                                inputs.dataset_a.name.clone()
                            } else {
                                inputs.dataset_b.name.clone()
                            },
                        },
                        other => other,
                    })?;
                let venn = venn_counts(
                    &mapping_a.restrict_to(target_classes),
                    &mapping_b.restrict_to(target_classes),
                );
                tracing::info!(
                    "🔗 {} vs {}: {} matched, {} unmatched",
                    inputs.dataset_a.name,
                    inputs.dataset_b.name,
                    record.total_matched,
                    record.total_unmatched
                );
                (Outcome::Computed(record), Some(venn))
            }
        };

        let composition = match inputs.composition {
            None => Outcome::Skipped {
                reason: "no composition table configured".to_string(),
            },
            Some(table) => match self.existing_output(DOMINANT_SPECIES_FILE).await {
                Some(path) => {
                    tracing::info!("⏭️ {} already exists, skipping composition analysis", path);
                    Outcome::Skipped {
                        reason: format!("{} already exists", path),
                    }
                }
                None => Outcome::Computed(self.analyze_composition(table).await?),
            },
        };

        Ok(CensusResult {
            cross_reference,
            venn,
            composition,
        })
    }

    async fn load(&self, result: CensusResult) -> Result<String> {
        if let Outcome::Computed(record) = &result.cross_reference {
            let path = self.write_json(CROSS_REFERENCE_FILE, record).await?;
            tracing::info!("💾 Cross-reference result saved to {}", path);
            self.write_json(MATCHED_SPECIES_FILE, &record.matched_species())
                .await?;
        }

        if let Some(venn) = &result.venn {
            tracing::info!(
                "Venn: {} only in A, {} only in B, {} shared",
                venn.only_a,
                venn.only_b,
                venn.both
            );
        }

        if let Outcome::Computed(report) = &result.composition {
            let path = self
                .write_json(DOMINANT_SPECIES_FILE, &report.dominant_species())
                .await?;
            tracing::info!("💾 Dominant species saved to {}", path);

            let coverage = CoverageReport {
                generated_at: &report.generated_at,
                threshold: report.threshold,
                groups: report
                    .computed()
                    .map(|analysis| (analysis.group.as_str(), analysis))
                    .collect(),
                failures: report.failures(),
            };
            self.write_json(COVERAGE_REPORT_FILE, &coverage).await?;

            let analyses: Vec<&GroupAnalysis> = report.computed().collect();
            let file_names = composition_file_names(analyses.iter().map(|a| a.group.as_str()));
            for (analysis, file_name) in analyses.iter().zip(&file_names) {
                let path = self.write_composition_csv(file_name, &analysis.summary).await?;
                tracing::debug!("Composition table for {} saved to {}", analysis.group, path);
            }
        }

        Ok(self.config.output_path().to_string())
    }
}
