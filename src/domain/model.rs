use crate::utils::error::{CensusError, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// 所有類別攤平後的物種集合
pub type SpeciesSet = BTreeSet<String>;

// 類別 -> 依計數遞增排列的優勢物種
pub type DominantSpeciesResult = BTreeMap<String, Vec<String>>;

// 類別名稱 -> 物種清單
//
// 類別之間依名稱排序迭代，類別內保留輸入順序（包含重複項）。
// 只能透過 `TaxonomyMappingBuilder` 或 `TryFrom` 建立，建立時即完成驗證。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct TaxonomyMapping {
    groups: BTreeMap<String, Vec<String>>,
}

impl TaxonomyMapping {
    pub fn builder() -> TaxonomyMappingBuilder {
        TaxonomyMappingBuilder::new()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(group, species)| (group.as_str(), species.as_slice()))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    // 不存在的類別視為空清單
    pub fn species(&self, group: &str) -> &[String] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn species_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    // 沒有任何類別，或所有類別都沒有物種
    pub fn is_empty(&self) -> bool {
        self.species_count() == 0
    }

    // 只保留指定類別；空清單表示不過濾
    pub fn restrict_to(&self, classes: &[String]) -> TaxonomyMapping {
        if classes.is_empty() {
            return self.clone();
        }

        let groups = self
            .groups
            .iter()
            .filter(|(group, _)| classes.iter().any(|c| c == *group))
            .map(|(group, species)| (group.clone(), species.clone()))
            .collect();

        TaxonomyMapping { groups }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            species_per_group: self
                .groups
                .iter()
                .map(|(group, species)| (group.clone(), species.len()))
                .collect(),
            total_species: self.species_count(),
        }
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for TaxonomyMapping {
    type Error = CensusError;

    fn try_from(groups: BTreeMap<String, Vec<String>>) -> Result<Self> {
        for (group, species_list) in &groups {
            if group.trim().is_empty() {
                return Err(CensusError::InvalidDataset {
                    message: "class name cannot be empty".to_string(),
                });
            }
            if let Some(position) = species_list.iter().position(|s| s.trim().is_empty()) {
                return Err(CensusError::InvalidDataset {
                    message: format!(
                        "class '{}' has an empty species name at position {}",
                        group, position
                    ),
                });
            }
        }
        Ok(Self { groups })
    }
}

impl From<TaxonomyMapping> for BTreeMap<String, Vec<String>> {
    fn from(mapping: TaxonomyMapping) -> Self {
        mapping.groups
    }
}

// 明確建立類別與物種，驗證延到 `build` 時一次完成
#[derive(Debug, Default)]
pub struct TaxonomyMappingBuilder {
    groups: BTreeMap<String, Vec<String>>,
}

impl TaxonomyMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.entry(group.into()).or_default();
        self
    }

    pub fn add_species(mut self, group: impl Into<String>, species: impl Into<String>) -> Self {
        self.groups.entry(group.into()).or_default().push(species.into());
        self
    }

    pub fn extend_group<I, S>(mut self, group: impl Into<String>, species: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(group.into())
            .or_default()
            .extend(species.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<TaxonomyMapping> {
        TaxonomyMapping::try_from(self.groups)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub species_per_group: BTreeMap<String, usize>,
    pub total_species: usize,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (group, count) in &self.species_per_group {
            writeln!(f, "  {}: {} species", group, count)?;
        }
        write!(f, "  Total species: {}", self.total_species)
    }
}

// 單一類別的比對結果，兩個清單皆已排序
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassComparison {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceRecord {
    pub total_matched: usize,
    pub total_unmatched: usize,
    pub class_comparison: BTreeMap<String, ClassComparison>,
}

impl CrossReferenceRecord {
    // 各類別的配對物種（包含沒有配對的類別）
    pub fn matched_species(&self) -> BTreeMap<String, Vec<String>> {
        self.class_comparison
            .iter()
            .map(|(group, comparison)| (group.clone(), comparison.matched.clone()))
            .collect()
    }

    pub fn comparison(&self, group: &str) -> Option<&ClassComparison> {
        self.class_comparison.get(group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VennCounts {
    pub only_a: usize,
    pub only_b: usize,
    pub both: usize,
}

// 類別 -> 物種 -> 影像數
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionTable {
    groups: BTreeMap<String, BTreeMap<String, u64>>,
}

impl CompositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: BTreeMap<String, BTreeMap<String, u64>>) -> Self {
        Self { groups }
    }

    pub fn insert(&mut self, group: impl Into<String>, species: impl Into<String>, count: u64) {
        self.groups
            .entry(group.into())
            .or_default()
            .insert(species.into(), count);
    }

    pub fn with_counts<S: AsRef<str>>(mut self, group: &str, counts: &[(S, u64)]) -> Self {
        let entry = self.groups.entry(group.to_string()).or_default();
        for (species, count) in counts {
            entry.insert(species.as_ref().to_string(), *count);
        }
        self
    }

    pub fn group(&self, group: &str) -> Option<&BTreeMap<String, u64>> {
        self.groups.get(group)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub count: u64,
}

// 依影像數遞增排序（同數量依名稱）的單一類別
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedCounts {
    pub group: String,
    pub entries: Vec<SpeciesCount>,
}

impl SortedCounts {
    // 影像總數超出 u64 時回報溢位，不做環繞
    pub fn total(&self) -> Result<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.count))
            .ok_or_else(|| CensusError::CountOverflow {
                group: self.group.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// 累積比例第一次達到門檻的位置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCrossing {
    pub threshold: f64,
    pub index: usize,
    pub count: u64,
    pub species_needed: usize,
    pub cumulative_fraction: f64,
    pub species_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionRow {
    pub species: String,
    pub count: u64,
    pub percentage: f64,
    pub cumulative_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionSummary {
    pub group: String,
    pub total_images: u64,
    pub rows: Vec<CompositionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAnalysis {
    pub group: String,
    pub total_images: u64,
    pub species_count: usize,
    pub threshold: f64,
    pub cutoff_count: u64,
    pub dominant_species: Vec<String>,
    pub crossings: Vec<ThresholdCrossing>,
    #[serde(skip)]
    pub summary: CompositionSummary,
}

// 階段或工作單元的結果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Computed(T),
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

impl<T> Outcome<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Computed(value),
            Err(e) => Outcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Outcome::Computed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            Outcome::Computed(value) => Some(value),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Computed(_) => "computed",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamedDataset {
    pub name: String,
    pub mapping: TaxonomyMapping,
}

#[derive(Debug, Clone)]
pub struct CensusInputs {
    pub dataset_a: NamedDataset,
    pub dataset_b: NamedDataset,
    pub composition: Option<CompositionTable>,
}

#[derive(Debug, Clone)]
pub struct CompositionReport {
    pub threshold: f64,
    pub generated_at: String,
    pub analyses: Vec<(String, Outcome<GroupAnalysis>)>,
}

impl CompositionReport {
    pub fn dominant_species(&self) -> DominantSpeciesResult {
        self.analyses
            .iter()
            .filter_map(|(group, outcome)| {
                outcome
                    .computed()
                    .map(|analysis| (group.clone(), analysis.dominant_species.clone()))
            })
            .collect()
    }

    pub fn failures(&self) -> BTreeMap<String, String> {
        self.analyses
            .iter()
            .filter_map(|(group, outcome)| match outcome {
                Outcome::Failed { message, .. } => Some((group.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn computed(&self) -> impl Iterator<Item = &GroupAnalysis> {
        self.analyses.iter().filter_map(|(_, outcome)| outcome.computed())
    }
}

#[derive(Debug, Clone)]
pub struct CensusResult {
    pub cross_reference: Outcome<CrossReferenceRecord>,
    pub venn: Option<VennCounts>,
    pub composition: Outcome<CompositionReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_insertion_order_and_duplicates() {
        let mapping = TaxonomyMapping::builder()
            .add_species("Aves", "Turdus merula")
            .add_species("Aves", "Corvus corax")
            .add_species("Aves", "Turdus merula")
            .group("Fungi")
            .build()
            .unwrap();

        assert_eq!(
            mapping.species("Aves"),
            ["Turdus merula", "Corvus corax", "Turdus merula"]
        );
        assert!(mapping.contains_group("Fungi"));
        assert!(mapping.species("Fungi").is_empty());
        assert!(mapping.species("Mammalia").is_empty());
        assert_eq!(mapping.species_count(), 3);
    }

    #[test]
    fn test_builder_rejects_blank_names() {
        let err = TaxonomyMapping::builder()
            .add_species("Aves", "  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, CensusError::InvalidDataset { .. }));

        let err = TaxonomyMapping::builder()
            .add_species("", "Parus major")
            .build()
            .unwrap_err();
        assert!(matches!(err, CensusError::InvalidDataset { .. }));
    }

    #[test]
    fn test_mapping_with_only_empty_groups_is_empty() {
        let mapping = TaxonomyMapping::builder()
            .group("Aves")
            .group("Insecta")
            .build()
            .unwrap();
        assert_eq!(mapping.group_count(), 2);
        assert!(mapping.is_empty());
        assert!(TaxonomyMapping::default().is_empty());
    }

    #[test]
    fn test_deserialize_validates_mapping() {
        let mapping: TaxonomyMapping =
            serde_json::from_str(r#"{"Aves": ["Parus major"], "Insecta": []}"#).unwrap();
        assert_eq!(mapping.group_count(), 2);

        let bad = serde_json::from_str::<TaxonomyMapping>(r#"{"Aves": [""]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_restrict_to_target_classes() {
        let mapping = TaxonomyMapping::builder()
            .add_species("Aves", "Parus major")
            .add_species("Insecta", "Apis mellifera")
            .build()
            .unwrap();

        let restricted = mapping.restrict_to(&["Aves".to_string(), "Reptilia".to_string()]);
        assert_eq!(restricted.group_names().collect::<Vec<_>>(), vec!["Aves"]);
        assert_eq!(mapping.restrict_to(&[]), mapping);
    }

    #[test]
    fn test_summary_counts_species_per_group() {
        let mapping = TaxonomyMapping::builder()
            .extend_group("Aves", ["Parus major", "Pica pica"])
            .add_species("Insecta", "Apis mellifera")
            .build()
            .unwrap();

        let summary = mapping.summary();
        assert_eq!(summary.species_per_group["Aves"], 2);
        assert_eq!(summary.total_species, 3);
        assert!(summary.to_string().contains("Total species: 3"));
    }

    #[test]
    fn test_composition_table_rejects_negative_counts() {
        let table: CompositionTable =
            serde_json::from_str(r#"{"Aves": {"A": 10, "B": 30}}"#).unwrap();
        assert_eq!(table.group("Aves").unwrap()["B"], 30);

        assert!(serde_json::from_str::<CompositionTable>(r#"{"Aves": {"A": -1}}"#).is_err());
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Outcome<u32> = Outcome::from_result(Ok(3));
        assert_eq!(ok.computed(), Some(&3));

        let failed: Outcome<u32> = Outcome::from_result(Err(CensusError::GroupNotFound {
            group: "Aves".to_string(),
        }));
        match failed {
            Outcome::Failed { kind, message } => {
                assert_eq!(kind, ErrorKind::GroupNotFound);
                assert!(message.contains("Aves"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
