use crate::core::composition::analyze_group;
use crate::core::{CompositionTable, GroupAnalysis, Outcome};
use crate::utils::error::CensusError;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTask {
    pub group: String,
    pub threshold: f64,
    pub coverage_thresholds: Vec<f64>,
}

impl GroupTask {
    pub fn new(group: impl Into<String>, threshold: f64, coverage_thresholds: &[f64]) -> Self {
        Self {
            group: group.into(),
            threshold,
            coverage_thresholds: coverage_thresholds.to_vec(),
        }
    }

    pub fn batch(groups: &[String], threshold: f64, coverage_thresholds: &[f64]) -> Vec<Self> {
        groups
            .iter()
            .map(|group| Self::new(group.clone(), threshold, coverage_thresholds))
            .collect()
    }

    pub fn run(&self, table: &CompositionTable) -> Outcome<GroupAnalysis> {
        Outcome::from_result(analyze_group(
            table,
            &self.group,
            self.threshold,
            &self.coverage_thresholds,
        ))
    }
}

// 以 semaphore 限制同時執行數量的分析工作池
//
// 每個工作只讀取共用的 `CompositionTable`，各自回傳結果，
// 由呼叫端依原順序收集。
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn dispatch(
        &self,
        table: Arc<CompositionTable>,
        tasks: Vec<GroupTask>,
    ) -> Vec<(String, Outcome<GroupAnalysis>)> {
        tracing::debug!(
            "Dispatching {} class tasks to {} workers",
            tasks.len(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let semaphore = semaphore.clone();
            let table = table.clone();
            let group = task.group.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return task_failure(e.to_string()),
                };

                match tokio::task::spawn_blocking(move || task.run(&table)).await {
                    Ok(outcome) => outcome,
                    Err(e) => task_failure(e.to_string()),
                }
            });
            handles.push((group, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (group, handle) in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|e| task_failure(e.to_string()));

            match &outcome {
                Outcome::Computed(analysis) => tracing::info!(
                    "✅ {}: {} dominant species out of {}",
                    group,
                    analysis.dominant_species.len(),
                    analysis.species_count
                ),
                Outcome::Failed { kind, message } => {
                    tracing::warn!("⚠️ {} failed ({:?}): {}", group, kind, message)
                }
                Outcome::Skipped { reason } => {
                    tracing::info!("⏭️ {} skipped: {}", group, reason)
                }
            }

            results.push((group, outcome));
        }

        results
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}

fn task_failure(message: String) -> Outcome<GroupAnalysis> {
    Outcome::from_result(Err(CensusError::TaskError { message }))
}
