use crate::hit::{DocHitInfo, SchemaTypeId};
use crate::ranker::{
    build_heap_in_place, pop_top_results_from_heap, ScoredDocumentHit, ScoredDocumentHitComparator,
};
use crate::section_weights::SectionWeights;

/// Sum over matched sections of normalized section weight times the
/// term frequency in that section.
pub fn score_doc_hit_info(
    doc_hit_info: &DocHitInfo,
    schema_type_id: SchemaTypeId,
    section_weights: &SectionWeights,
) -> f64 {
    doc_hit_info
        .section_ids()
        .map(|section_id| {
            section_weights.get_normalized_section_weight(schema_type_id, section_id)
                * f64::from(doc_hit_info.hit_term_frequency(section_id))
        })
        .sum()
}

/// Scores every candidate and keeps the best `num_to_return`, best first.
pub fn rank_doc_hit_infos<F>(
    doc_hit_infos: &[DocHitInfo],
    num_to_return: usize,
    section_weights: &SectionWeights,
    schema_type_of: F,
) -> Vec<ScoredDocumentHit>
where
    F: Fn(&DocHitInfo) -> Option<SchemaTypeId>,
{
    let mut heap: Vec<ScoredDocumentHit> = doc_hit_infos
        .iter()
        .filter_map(|info| {
            let schema_type_id = schema_type_of(info)?;
            Some(ScoredDocumentHit::new(
                info.document_id(),
                info.hit_section_ids_mask(),
                score_doc_hit_info(info, schema_type_id, section_weights),
            ))
        })
        .collect();
    let comparator = ScoredDocumentHitComparator::default();
    build_heap_in_place(&mut heap, &comparator);
    pop_top_results_from_heap(&mut heap, num_to_return, &comparator)
}
