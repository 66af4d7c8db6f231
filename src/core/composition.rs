use crate::core::{
    CompositionRow, CompositionSummary, CompositionTable, GroupAnalysis, SortedCounts,
    SpeciesCount, ThresholdCrossing,
};
use crate::utils::error::{CensusError, Result};
use crate::utils::validation::{validate_threshold, validate_thresholds};
use std::collections::BTreeMap;

pub const DEFAULT_COVERAGE_THRESHOLDS: [f64; 3] = [0.5, 0.8, 0.9];

// 取出類別的 (物種, 影像數)，依影像數遞增排序，同數量依物種名稱
pub fn sorted_counts(table: &CompositionTable, group: &str) -> Result<SortedCounts> {
    let counts = table
        .group(group)
        .filter(|counts| !counts.is_empty())
        .ok_or_else(|| CensusError::GroupNotFound {
            group: group.to_string(),
        })?;

    let mut entries: Vec<SpeciesCount> = counts
        .iter()
        .map(|(species, &count)| SpeciesCount {
            species: species.clone(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.species.cmp(&b.species)));

    Ok(SortedCounts {
        group: group.to_string(),
        entries,
    })
}

// 遞增序列的累積比例，最後一項必為 1.0
pub fn cumulative_fraction(sorted: &SortedCounts) -> Result<Vec<f64>> {
    let total = sorted.total()?;
    if total == 0 {
        return Err(CensusError::DegenerateDistribution {
            group: sorted.group.clone(),
        });
    }

    // 前綴和不超過總數，總數已檢查過溢位
    let total = total as f64;
    let mut running = 0u64;
    Ok(sorted
        .entries
        .iter()
        .map(|entry| {
            running = running.saturating_add(entry.count);
            running as f64 / total
        })
        .collect())
}

// 第一個累積比例 >= threshold 的位置
fn crossing_index(fractions: &[f64], threshold: f64) -> usize {
    fractions
        .iter()
        .position(|&fraction| fraction >= threshold)
        .unwrap_or(fractions.len().saturating_sub(1))
}

fn select_at_or_above(sorted: &SortedCounts, cutoff: u64) -> Vec<String> {
    sorted
        .entries
        .iter()
        .filter(|entry| entry.count >= cutoff)
        .map(|entry| entry.species.clone())
        .collect()
}

// 依遞增累積分佈挑出優勢物種
//
// 找到累積比例首次達到 `threshold` 的位置，以該處的影像數為門檻，
// 回傳所有影像數不低於門檻的物種（保持遞增順序）。
// 因為是從少數量那端開始累積，結果可能包含大多數物種。
pub fn dominant_species(
    table: &CompositionTable,
    group: &str,
    threshold: f64,
) -> Result<Vec<String>> {
    validate_threshold(threshold)?;

    let sorted = sorted_counts(table, group)?;
    let fractions = cumulative_fraction(&sorted)?;
    let cutoff = sorted.entries[crossing_index(&fractions, threshold)].count;

    Ok(select_at_or_above(&sorted, cutoff))
}

pub fn threshold_crossings(
    sorted: &SortedCounts,
    thresholds: &[f64],
) -> Result<Vec<ThresholdCrossing>> {
    validate_thresholds(thresholds)?;

    let fractions = cumulative_fraction(sorted)?;
    let species_num = sorted.len();

    Ok(thresholds
        .iter()
        .map(|&threshold| {
            let index = crossing_index(&fractions, threshold);
            ThresholdCrossing {
                threshold,
                index,
                count: sorted.entries[index].count,
                species_needed: index + 1,
                cumulative_fraction: fractions[index],
                species_fraction: (index + 1) as f64 / species_num as f64,
            }
        })
        .collect())
}

// 多類別批次；門檻錯誤直接失敗，個別類別的錯誤只記在該類別
pub fn dominant_species_batch(
    table: &CompositionTable,
    groups: &[String],
    threshold: f64,
) -> Result<BTreeMap<String, Result<Vec<String>>>> {
    validate_threshold(threshold)?;

    Ok(groups
        .iter()
        .map(|group| {
            let result = dominant_species(table, group, threshold);
            if let Err(e) = &result {
                tracing::warn!("⚠️ Skipping class {}: {}", group, e);
            }
            (group.clone(), result)
        })
        .collect())
}

pub fn composition_summary(sorted: &SortedCounts) -> Result<CompositionSummary> {
    let fractions = cumulative_fraction(sorted)?;
    let total_images = sorted.total()?;

    let rows = sorted
        .entries
        .iter()
        .zip(fractions)
        .map(|(entry, cumulative_fraction)| CompositionRow {
            species: entry.species.clone(),
            count: entry.count,
            percentage: entry.count as f64 * 100.0 / total_images as f64,
            cumulative_fraction,
        })
        .collect();

    Ok(CompositionSummary {
        group: sorted.group.clone(),
        total_images,
        rows,
    })
}

pub fn analyze_group(
    table: &CompositionTable,
    group: &str,
    threshold: f64,
    coverage_thresholds: &[f64],
) -> Result<GroupAnalysis> {
    validate_threshold(threshold)?;
    validate_thresholds(coverage_thresholds)?;

    let sorted = sorted_counts(table, group)?;
    let fractions = cumulative_fraction(&sorted)?;
    let cutoff_count = sorted.entries[crossing_index(&fractions, threshold)].count;
    let dominant = select_at_or_above(&sorted, cutoff_count);

    tracing::debug!(
        "{}: cutoff {} images, {}/{} species dominant at {:.0}%",
        group,
        cutoff_count,
        dominant.len(),
        sorted.len(),
        threshold * 100.0
    );

    Ok(GroupAnalysis {
        group: group.to_string(),
        total_images: sorted.total()?,
        species_count: sorted.len(),
        threshold,
        cutoff_count,
        dominant_species: dominant,
        crossings: threshold_crossings(&sorted, coverage_thresholds)?,
        summary: composition_summary(&sorted)?,
    })
}
