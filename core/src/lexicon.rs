//! Term store backing both index structures.
//!
//! Maps each term to a dense value index (tvi) and keeps per-value
//! properties. Keys are ordered, so a prefix walk is a range scan.

use crate::error::{Error, Result};
use crate::hit::NamespaceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermProperties {
    has_hits_in_prefix_section: bool,
    namespaces: BTreeSet<NamespaceId>,
}

impl TermProperties {
    pub fn has_hits_in_prefix_section(&self) -> bool {
        self.has_hits_in_prefix_section
    }

    pub fn belongs_to_namespace(&self, namespace_id: NamespaceId) -> bool {
        self.namespaces.contains(&namespace_id)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = NamespaceId> + '_ {
        self.namespaces.iter().copied()
    }

    /// Union only: properties are never cleared by an update.
    pub fn widen(&mut self, has_hits_in_prefix_section: bool, namespace_id: NamespaceId) {
        self.has_hits_in_prefix_section |= has_hits_in_prefix_section;
        self.namespaces.insert(namespace_id);
    }

    pub fn widen_from(&mut self, other: &TermProperties) {
        self.has_hits_in_prefix_section |= other.has_hits_in_prefix_section;
        self.namespaces.extend(other.namespaces.iter().copied());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LexiconValue {
    term: String,
    properties: TermProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    terms: BTreeMap<String, u32>,
    values: Vec<LexiconValue>,
    max_value_index: u32,
}

impl Lexicon {
    pub fn new(max_value_index: u32) -> Self {
        Lexicon {
            terms: BTreeMap::new(),
            values: Vec::new(),
            max_value_index,
        }
    }

    /// Returns the term's value index and whether it was newly added.
    pub fn insert(&mut self, term: &str) -> Result<(u32, bool)> {
        if let Some(&tvi) = self.terms.get(term) {
            return Ok((tvi, false));
        }
        let tvi = self.values.len() as u32;
        if tvi >= self.max_value_index {
            return Err(Error::ResourceExhausted(format!(
                "lexicon is full ({} terms)",
                self.max_value_index
            )));
        }
        self.terms.insert(term.to_string(), tvi);
        self.values.push(LexiconValue {
            term: term.to_string(),
            properties: TermProperties::default(),
        });
        Ok((tvi, true))
    }

    pub fn find(&self, term: &str) -> Option<u32> {
        self.terms.get(term).copied()
    }

    pub fn term(&self, tvi: u32) -> Option<&str> {
        self.values.get(tvi as usize).map(|v| v.term.as_str())
    }

    pub fn properties(&self, tvi: u32) -> Result<&TermProperties> {
        self.values
            .get(tvi as usize)
            .map(|v| &v.properties)
            .ok_or_else(|| Error::NotFound(format!("no lexicon value at tvi {tvi}")))
    }

    pub fn properties_mut(&mut self, tvi: u32) -> Result<&mut TermProperties> {
        self.values
            .get_mut(tvi as usize)
            .map(|v| &mut v.properties)
            .ok_or_else(|| Error::NotFound(format!("no lexicon value at tvi {tvi}")))
    }

    /// Terms starting with `prefix`, in lexicographic order.
    pub fn prefix_iter<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, u32)> + 'a {
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(term, tvi)| (term.as_str(), *tvi))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.terms.iter().map(|(term, tvi)| (term.as_str(), *tvi))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_value_index(&self) -> u32 {
        self.max_value_index
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.values.clear();
    }

    pub fn serialized_size(&self) -> Result<u64> {
        Ok(bincode::serialized_size(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut lexicon = Lexicon::new(16);
        let (a, inserted) = lexicon.insert("foo").unwrap();
        assert!(inserted);
        let (b, inserted) = lexicon.insert("foo").unwrap();
        assert!(!inserted);
        assert_eq!(a, b);
        assert_eq!(lexicon.term(a), Some("foo"));
    }

    #[test]
    fn prefix_iter_is_ordered_and_bounded() {
        let mut lexicon = Lexicon::new(16);
        for term in ["fool", "bar", "foo", "fob", "g"] {
            lexicon.insert(term).unwrap();
        }
        let terms: Vec<&str> = lexicon.prefix_iter("fo").map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["fob", "foo", "fool"]);
        assert_eq!(lexicon.prefix_iter("z").count(), 0);
        assert_eq!(lexicon.prefix_iter("").count(), 5);
    }

    #[test]
    fn full_lexicon_is_resource_exhausted() {
        let mut lexicon = Lexicon::new(1);
        lexicon.insert("a").unwrap();
        assert!(lexicon.insert("b").unwrap_err().is_resource_exhausted());
        assert!(lexicon.insert("a").is_ok());
    }

    #[test]
    fn properties_only_widen() {
        let mut props = TermProperties::default();
        props.widen(true, 1);
        props.widen(false, 2);
        assert!(props.has_hits_in_prefix_section());
        assert!(props.belongs_to_namespace(1));
        assert!(props.belongs_to_namespace(2));
    }
}
