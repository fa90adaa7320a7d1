//! Bounded top-K selection with array-backed binary heaps.
//!
//! For index `i` the children live at `2i + 1` and `2i + 2` and the
//! parent at `(i - 1) / 2`. Sifting is iterative.

use crate::error::{Error, Result};
use crate::hit::{DocumentId, SectionIdMask, TermMetadata};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocumentHit {
    pub document_id: DocumentId,
    pub hit_section_id_mask: SectionIdMask,
    pub score: f64,
}

impl ScoredDocumentHit {
    pub fn new(document_id: DocumentId, hit_section_id_mask: SectionIdMask, score: f64) -> Self {
        ScoredDocumentHit {
            document_id,
            hit_section_id_mask,
            score,
        }
    }
}

/// Orders scored hits so that the "better" one compares greater.
///
/// With `is_descending` a higher score is better; otherwise a lower one
/// is. Equal scores fall back to the document id, newer first.
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocumentHitComparator {
    pub is_descending: bool,
}

impl Default for ScoredDocumentHitComparator {
    fn default() -> Self {
        ScoredDocumentHitComparator { is_descending: true }
    }
}

impl ScoredDocumentHitComparator {
    pub fn compare(&self, lhs: &ScoredDocumentHit, rhs: &ScoredDocumentHit) -> Ordering {
        let by_score = lhs.score.partial_cmp(&rhs.score).unwrap_or(Ordering::Equal);
        let by_score = if self.is_descending { by_score } else { by_score.reverse() };
        by_score.then(lhs.document_id.cmp(&rhs.document_id))
    }

    /// True if `lhs` ranks below `rhs`.
    pub fn less(&self, lhs: &ScoredDocumentHit, rhs: &ScoredDocumentHit) -> bool {
        self.compare(lhs, rhs) == Ordering::Less
    }
}

fn sift_down<T>(heap: &mut [T], mut root: usize, less: &impl Fn(&T, &T) -> bool) {
    let len = heap.len();
    loop {
        let left = 2 * root + 1;
        let right = left + 1;
        let mut best = root;
        if left < len && less(&heap[best], &heap[left]) {
            best = left;
        }
        if right < len && less(&heap[best], &heap[right]) {
            best = right;
        }
        if best == root {
            return;
        }
        heap.swap(root, best);
        root = best;
    }
}

fn sift_up<T>(heap: &mut [T], mut child: usize, less: &impl Fn(&T, &T) -> bool) {
    while child > 0 {
        let parent = (child - 1) / 2;
        if !less(&heap[parent], &heap[child]) {
            return;
        }
        heap.swap(parent, child);
        child = parent;
    }
}

fn pop_root<T>(heap: &mut Vec<T>, less: &impl Fn(&T, &T) -> bool) -> Result<T> {
    if heap.is_empty() {
        return Err(Error::ResourceExhausted("heap is empty".to_string()));
    }
    let last = heap.len() - 1;
    heap.swap(0, last);
    let root = heap.pop().ok_or_else(|| Error::Internal("heap vanished during pop".to_string()))?;
    sift_down(heap, 0, less);
    Ok(root)
}

/// Turns `hits` into a max-heap under `comparator` in O(n).
pub fn build_heap_in_place(hits: &mut [ScoredDocumentHit], comparator: &ScoredDocumentHitComparator) {
    let less = |a: &ScoredDocumentHit, b: &ScoredDocumentHit| comparator.less(a, b);
    for root in (0..hits.len() / 2).rev() {
        sift_down(hits, root, &less);
    }
}

/// Extracts up to `num_results` best hits, best first. An exhausted heap
/// just ends the extraction.
pub fn pop_top_results_from_heap(
    heap: &mut Vec<ScoredDocumentHit>,
    num_results: usize,
    comparator: &ScoredDocumentHitComparator,
) -> Vec<ScoredDocumentHit> {
    let less = |a: &ScoredDocumentHit, b: &ScoredDocumentHit| comparator.less(a, b);
    let result_size = num_results.min(heap.len());
    let mut results = Vec::with_capacity(result_size);
    for _ in 0..result_size {
        match pop_root(heap, &less) {
            Ok(hit) => results.push(hit),
            Err(e) => {
                debug!(error = %e, "stopping top results extraction");
                break;
            }
        }
    }
    results
}

// The term heap is a min-heap on hit_count: "less" means "greater count",
// so the smallest count floats to the root.
fn term_less(a: &TermMetadata, b: &TermMetadata) -> bool {
    a.hit_count > b.hit_count
}

/// Offers `term` to a min-heap holding at most `capacity` terms. Once
/// full, the term only gets in by beating the current minimum.
pub fn push_to_term_heap(term: TermMetadata, capacity: usize, min_heap: &mut Vec<TermMetadata>) {
    if min_heap.len() < capacity {
        min_heap.push(term);
        let last = min_heap.len() - 1;
        sift_up(min_heap, last, &term_less);
    } else if let Some(root) = min_heap.first_mut() {
        if root.hit_count < term.hit_count {
            *root = term;
            sift_down(min_heap, 0, &term_less);
        }
    }
}

/// Drains the min-heap, returning terms in ascending hit count order.
pub fn pop_all_terms_from_heap(min_heap: &mut Vec<TermMetadata>) -> Vec<TermMetadata> {
    let mut terms = Vec::with_capacity(min_heap.len());
    loop {
        match pop_root(min_heap, &term_less) {
            Ok(term) => terms.push(term),
            Err(e) if e.is_resource_exhausted() => break,
            Err(e) => {
                debug!(error = %e, "stopping term heap drain");
                break;
            }
        }
    }
    terms
}

/// Merge-walks two content-sorted term lists, summing the counts of
/// terms present in both, and keeps the `num_to_return` most frequent.
/// The result is sorted by descending hit count.
pub fn merge_and_rank_term_metadatas(
    lite_terms: Vec<TermMetadata>,
    main_terms: Vec<TermMetadata>,
    num_to_return: usize,
) -> Vec<TermMetadata> {
    let mut heap = Vec::with_capacity(num_to_return.min(lite_terms.len() + main_terms.len()));
    let mut lite = lite_terms.into_iter().peekable();
    let mut main = main_terms.into_iter().peekable();
    loop {
        let merged = match (lite.peek(), main.peek()) {
            (None, None) => break,
            (Some(_), None) => lite.next(),
            (None, Some(_)) => main.next(),
            (Some(l), Some(m)) => match l.content.cmp(&m.content) {
                Ordering::Less => lite.next(),
                Ordering::Greater => main.next(),
                Ordering::Equal => {
                    let main_count = main.next().map_or(0, |m| m.hit_count);
                    lite.next().map(|mut l| {
                        l.hit_count = l.hit_count.saturating_add(main_count);
                        l
                    })
                }
            },
        };
        if let Some(term) = merged {
            push_to_term_heap(term, num_to_return, &mut heap);
        }
    }
    let mut ranked = pop_all_terms_from_heap(&mut heap);
    ranked.reverse();
    ranked
}
