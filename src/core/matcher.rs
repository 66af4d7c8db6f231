use crate::core::{ClassComparison, CrossReferenceRecord, SpeciesSet, TaxonomyMapping, VennCounts};
use crate::utils::error::{CensusError, Result};
use std::collections::{BTreeMap, BTreeSet};

pub fn aggregate_species(mapping: &TaxonomyMapping) -> SpeciesSet {
    mapping
        .groups()
        .flat_map(|(_, species)| species.iter().cloned())
        .collect()
}

// 回傳 `(A ∩ B, A Δ B)`
pub fn set_difference(set_a: &SpeciesSet, set_b: &SpeciesSet) -> (SpeciesSet, SpeciesSet) {
    let matches = set_a.intersection(set_b).cloned().collect();
    let symmetric_difference = set_a.symmetric_difference(set_b).cloned().collect();
    (matches, symmetric_difference)
}

// 比對兩個資料集，產生各類別與整體的配對結果
//
// 整體數量以攤平後的集合計算，與各類別的分割無關：同一物種若在兩邊被放在
// 不同類別，會計入 `total_matched`，但不會出現在任何類別的 `matched`。
pub fn cross_reference(
    mapping_a: &TaxonomyMapping,
    mapping_b: &TaxonomyMapping,
) -> Result<CrossReferenceRecord> {
    if mapping_a.is_empty() {
        return Err(CensusError::EmptyDataset {
            dataset: "dataset_a".to_string(),
        });
    }
    if mapping_b.is_empty() {
        return Err(CensusError::EmptyDataset {
            dataset: "dataset_b".to_string(),
        });
    }

    let _span = tracing::debug_span!(
        "cross_reference",
        groups_a = mapping_a.group_count(),
        groups_b = mapping_b.group_count()
    )
    .entered();

    let all_groups: BTreeSet<&str> = mapping_a
        .group_names()
        .chain(mapping_b.group_names())
        .collect();

    let mut class_comparison = BTreeMap::new();
    for group in all_groups {
        let set_a: SpeciesSet = mapping_a.species(group).iter().cloned().collect();
        let set_b: SpeciesSet = mapping_b.species(group).iter().cloned().collect();
        let (matched, unmatched) = set_difference(&set_a, &set_b);

        tracing::debug!(
            "{}: {} matched, {} unmatched",
            group,
            matched.len(),
            unmatched.len()
        );

        class_comparison.insert(
            group.to_string(),
            ClassComparison {
                matched: matched.into_iter().collect(),
                unmatched: unmatched.into_iter().collect(),
            },
        );
    }

    let (matches, unmatched) =
        set_difference(&aggregate_species(mapping_a), &aggregate_species(mapping_b));

    Ok(CrossReferenceRecord {
        total_matched: matches.len(),
        total_unmatched: unmatched.len(),
        class_comparison,
    })
}

// 先限制到目標類別再比對；限制後為空同樣視為 `EmptyDataset`
pub fn cross_reference_classes(
    mapping_a: &TaxonomyMapping,
    mapping_b: &TaxonomyMapping,
    target_classes: &[String],
) -> Result<CrossReferenceRecord> {
    let restricted_a = mapping_a.restrict_to(target_classes);
    let restricted_b = mapping_b.restrict_to(target_classes);
    cross_reference(&restricted_a, &restricted_b)
}

pub fn venn_counts(mapping_a: &TaxonomyMapping, mapping_b: &TaxonomyMapping) -> VennCounts {
    let set_a = aggregate_species(mapping_a);
    let set_b = aggregate_species(mapping_b);
    let both = set_a.intersection(&set_b).count();

    VennCounts {
        only_a: set_a.len() - both,
        only_b: set_b.len() - both,
        both,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> SpeciesSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_pair() -> (TaxonomyMapping, TaxonomyMapping) {
        let m1 = TaxonomyMapping::builder()
            .extend_group("Aves", ["Turdus merula", "Corvus corax"])
            .add_species("Insecta", "Apis mellifera")
            .build()
            .unwrap();
        let m2 = TaxonomyMapping::builder()
            .extend_group("Aves", ["Turdus merula", "Parus major"])
            .add_species("Mammalia", "Vulpes vulpes")
            .build()
            .unwrap();
        (m1, m2)
    }

    #[test]
    fn test_aggregate_species_deduplicates_across_groups() {
        let mapping = TaxonomyMapping::builder()
            .extend_group("Aves", ["Pica pica", "Pica pica"])
            .add_species("Insecta", "Pica pica")
            .add_species("Insecta", "Apis mellifera")
            .build()
            .unwrap();

        assert_eq!(aggregate_species(&mapping), set(&["Apis mellifera", "Pica pica"]));
        assert!(aggregate_species(&TaxonomyMapping::default()).is_empty());
    }

    #[test]
    fn test_set_difference_partitions_union() {
        let a = set(&["a", "b", "c"]);
        let b = set(&["b", "c", "d", "e"]);
        let (matches, unmatched) = set_difference(&a, &b);

        assert_eq!(matches, set(&["b", "c"]));
        assert_eq!(unmatched, set(&["a", "d", "e"]));
        let union: SpeciesSet = a.union(&b).cloned().collect();
        assert_eq!(union.len(), matches.len() + unmatched.len());
    }

    #[test]
    fn test_set_difference_is_case_sensitive() {
        let (matches, unmatched) = set_difference(&set(&["Parus major"]), &set(&["parus major"]));
        assert!(matches.is_empty());
        assert_eq!(unmatched.len(), 2);
    }

    #[test]
    fn test_cross_reference_scenario() {
        let (m1, m2) = sample_pair();
        let record = cross_reference(&m1, &m2).unwrap();

        let aves = record.comparison("Aves").unwrap();
        assert_eq!(aves.matched, vec!["Turdus merula"]);
        assert_eq!(aves.unmatched, vec!["Corvus corax", "Parus major"]);

        let insecta = record.comparison("Insecta").unwrap();
        assert!(insecta.matched.is_empty());
        assert_eq!(insecta.unmatched, vec!["Apis mellifera"]);

        let mammalia = record.comparison("Mammalia").unwrap();
        assert!(mammalia.matched.is_empty());
        assert_eq!(mammalia.unmatched, vec!["Vulpes vulpes"]);

        assert_eq!(record.total_matched, 1);
        assert_eq!(record.total_unmatched, 4);
    }

    #[test]
    fn test_cross_reference_is_symmetric() {
        let (m1, m2) = sample_pair();
        assert_eq!(cross_reference(&m1, &m2).unwrap(), cross_reference(&m2, &m1).unwrap());
    }

    #[test]
    fn test_cross_reference_is_deterministic() {
        let (m1, m2) = sample_pair();
        let first = serde_json::to_string(&cross_reference(&m1, &m2).unwrap()).unwrap();
        let second = serde_json::to_string(&cross_reference(&m1, &m2).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cross_reference_rejects_empty_input() {
        let (m1, _) = sample_pair();
        let empty = TaxonomyMapping::builder().group("Aves").build().unwrap();

        let err = cross_reference(&m1, &empty).unwrap_err();
        assert!(matches!(err, CensusError::EmptyDataset { .. }));
        let err = cross_reference(&TaxonomyMapping::default(), &m1).unwrap_err();
        assert!(matches!(err, CensusError::EmptyDataset { .. }));
    }

    #[test]
    fn test_cross_reference_classes_filters_before_matching() {
        let (m1, m2) = sample_pair();
        let record = cross_reference_classes(&m1, &m2, &["Aves".to_string()]).unwrap();

        assert_eq!(record.class_comparison.len(), 1);
        assert_eq!(record.total_matched, 1);
        assert_eq!(record.total_unmatched, 2);

        let err = cross_reference_classes(&m1, &m2, &["Mammalia".to_string()]).unwrap_err();
        assert!(matches!(err, CensusError::EmptyDataset { .. }));
    }

    #[test]
    fn test_venn_counts() {
        let (m1, m2) = sample_pair();
        let venn = venn_counts(&m1, &m2);
        assert_eq!(
            venn,
            VennCounts {
                only_a: 2,
                only_b: 2,
                both: 1
            }
        );
    }

    #[test]
    fn test_matched_species_keeps_every_group() {
        let (m1, m2) = sample_pair();
        let matched = cross_reference(&m1, &m2).unwrap().matched_species();
        assert_eq!(matched.len(), 3);
        assert_eq!(matched["Aves"], vec!["Turdus merula"]);
        assert!(matched["Insecta"].is_empty());
    }
}
