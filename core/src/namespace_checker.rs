use crate::hit::DocumentId;

/// Answers whether a document belongs to the namespaces a query targets.
///
/// Wherever a checker is optional, `None` means no filtering.
pub trait NamespaceChecker {
    fn belongs_to_target_namespaces(&self, document_id: DocumentId) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrueNamespaceChecker;

impl NamespaceChecker for AlwaysTrueNamespaceChecker {
    fn belongs_to_target_namespaces(&self, _document_id: DocumentId) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFalseNamespaceChecker;

impl NamespaceChecker for AlwaysFalseNamespaceChecker {
    fn belongs_to_target_namespaces(&self, _document_id: DocumentId) -> bool {
        false
    }
}

#[inline]
pub(crate) fn passes(checker: Option<&dyn NamespaceChecker>, document_id: DocumentId) -> bool {
    checker.map_or(true, |c| c.belongs_to_target_namespaces(document_id))
}
