//! In-memory document registry and derived dashboard counters.
//!
//! The registry is the only shared mutable state in the workflow. It is
//! owned by the session and mutated exclusively through whole-record
//! operations: prepend a new document or replace an existing one by id.
//! Partial field patches do not exist, so a failed update can never
//! leave a half-written record behind.

use chrono::{DateTime, Datelike, Local};
use tracing::warn;

use crate::domain::{Document, DocumentId, DocumentStatus};

/// Summary counters derived from the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// All documents in the session
    pub total: usize,

    /// Documents uploaded in the current calendar month (viewer's local time)
    pub this_month: usize,

    /// Documents with a completed analysis
    pub analyzed: usize,

    /// Documents still being processed
    pub processing: usize,
}

impl DashboardStats {
    /// Compute counters from a document snapshot.
    ///
    /// Reads only `upload_date` and `status`. The month counter compares
    /// year and month components of the upload date against `now`.
    pub fn compute(documents: &[Document], now: DateTime<Local>) -> Self {
        let mut stats = Self {
            total: documents.len(),
            ..Self::default()
        };

        for doc in documents {
            let uploaded = doc.upload_date.with_timezone(&Local);
            if uploaded.year() == now.year() && uploaded.month() == now.month() {
                stats.this_month += 1;
            }

            match doc.status {
                DocumentStatus::Analyzed => stats.analyzed += 1,
                DocumentStatus::Processing => stats.processing += 1,
                _ => {}
            }
        }

        stats
    }
}

/// Outcome of inserting a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New id, prepended as the newest entry
    Prepended,

    /// Id already present; the existing record was replaced in place
    Replaced,
}

/// Ordered collection of the session's documents, newest first.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
    stats: DashboardStats,
}

impl DocumentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection with a freshly fetched list.
    ///
    /// Service order is preserved; a duplicated id keeps its first
    /// occurrence.
    pub fn reset(&mut self, documents: Vec<Document>) {
        let mut seen = std::collections::HashSet::new();
        self.documents = documents
            .into_iter()
            .filter(|doc| seen.insert(doc.id.clone()))
            .collect();
        self.recompute();
    }

    /// Insert a document as the newest entry.
    ///
    /// If the id is already present the existing record is replaced in
    /// place instead, keeping ids unique.
    pub fn insert(&mut self, document: Document) -> InsertOutcome {
        let outcome = match self.position(&document.id) {
            Some(idx) => {
                self.documents[idx] = document;
                InsertOutcome::Replaced
            }
            None => {
                self.documents.insert(0, document);
                InsertOutcome::Prepended
            }
        };
        self.recompute();
        outcome
    }

    /// Replace an existing record with a fresher snapshot, keeping its
    /// position. Returns false (and drops the update) if the id is not
    /// present; a stale settlement must not resurrect a removed entry.
    pub fn replace(&mut self, document: Document) -> bool {
        match self.position(&document.id) {
            Some(idx) => {
                self.documents[idx] = document;
                self.recompute();
                true
            }
            None => {
                warn!(id = %document.id, "dropping update for unknown document");
                false
            }
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.position(id).map(|idx| &self.documents[idx])
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.position(id).is_some()
    }

    /// Current snapshot, newest first
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Counters as of the last mutation
    pub fn stats(&self) -> DashboardStats {
        self.stats
    }

    /// Ids of documents still awaiting a terminal status
    pub fn processing_ids(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter(|doc| doc.status == DocumentStatus::Processing)
            .map(|doc| doc.id.clone())
            .collect()
    }

    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| &doc.id == id)
    }

    fn recompute(&mut self) {
        self.stats = DashboardStats::compute(&self.documents, Local::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn doc(id: &str, status: DocumentStatus) -> Document {
        Document {
            id: DocumentId::from(id),
            file_name: format!("{id}.pdf"),
            upload_date: Utc::now(),
            status,
            classification: None,
            confidence: None,
            key_terms: None,
            summary: None,
            important_dates: None,
            parties_involved: None,
            jargon_analysis: None,
        }
    }

    #[test]
    fn test_insert_prepends_newest_first() {
        let mut registry = DocumentRegistry::new();

        assert_eq!(
            registry.insert(doc("a", DocumentStatus::Processing)),
            InsertOutcome::Prepended
        );
        assert_eq!(
            registry.insert(doc("b", DocumentStatus::Processing)),
            InsertOutcome::Prepended
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.documents()[0].id.as_str(), "b");
        assert_eq!(registry.documents()[1].id.as_str(), "a");
    }

    #[test]
    fn test_insert_existing_id_replaces_in_place() {
        let mut registry = DocumentRegistry::new();
        registry.insert(doc("a", DocumentStatus::Processing));
        registry.insert(doc("b", DocumentStatus::Processing));

        let outcome = registry.insert(doc("a", DocumentStatus::Analyzed));

        assert_eq!(outcome, InsertOutcome::Replaced);
        assert_eq!(registry.len(), 2);
        // Position unchanged: "a" is still the older entry
        assert_eq!(registry.documents()[1].id.as_str(), "a");
        assert_eq!(registry.documents()[1].status, DocumentStatus::Analyzed);
    }

    #[test]
    fn test_replace_keeps_position_and_swaps_whole_record() {
        let mut registry = DocumentRegistry::new();
        registry.insert(doc("a", DocumentStatus::Processing));
        registry.insert(doc("b", DocumentStatus::Processing));

        let mut settled = doc("a", DocumentStatus::Analyzed);
        settled.classification = Some("NDA".to_string());

        assert!(registry.replace(settled));
        let stored = registry.get(&DocumentId::from("a")).unwrap();
        assert_eq!(stored.status, DocumentStatus::Analyzed);
        assert_eq!(stored.classification.as_deref(), Some("NDA"));
        assert_eq!(registry.documents()[0].id.as_str(), "b");
    }

    #[test]
    fn test_replace_unknown_id_is_dropped() {
        let mut registry = DocumentRegistry::new();
        registry.insert(doc("a", DocumentStatus::Processing));

        assert!(!registry.replace(doc("ghost", DocumentStatus::Analyzed)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&DocumentId::from("ghost")));
    }

    #[test]
    fn test_reset_preserves_service_order_and_dedupes() {
        let mut registry = DocumentRegistry::new();
        registry.reset(vec![
            doc("newest", DocumentStatus::Analyzed),
            doc("older", DocumentStatus::Processing),
            doc("newest", DocumentStatus::Error),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.documents()[0].id.as_str(), "newest");
        // First occurrence wins
        assert_eq!(registry.documents()[0].status, DocumentStatus::Analyzed);
    }

    #[test]
    fn test_stats_recomputed_on_every_mutation() {
        let mut registry = DocumentRegistry::new();
        assert_eq!(registry.stats(), DashboardStats::default());

        registry.insert(doc("a", DocumentStatus::Processing));
        registry.insert(doc("b", DocumentStatus::Processing));
        assert_eq!(registry.stats().processing, 2);
        assert_eq!(registry.stats().analyzed, 0);

        registry.replace(doc("a", DocumentStatus::Analyzed));
        assert_eq!(registry.stats().processing, 1);
        assert_eq!(registry.stats().analyzed, 1);
        assert_eq!(registry.stats().total, 2);
    }

    #[test]
    fn test_month_counter_compares_year_and_month_only() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        // Same instant as `now`, so it lands in the current local month
        let mut this_month = doc("recent", DocumentStatus::Analyzed);
        this_month.upload_date = now.with_timezone(&Utc);

        let mut last_month = doc("old", DocumentStatus::Analyzed);
        last_month.upload_date = now.with_timezone(&Utc) - Duration::days(40);

        let mut last_year = doc("ancient", DocumentStatus::Analyzed);
        last_year.upload_date = now.with_timezone(&Utc) - Duration::days(365);

        let docs = vec![this_month, last_month, last_year];
        let stats = DashboardStats::compute(&docs, now);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.analyzed, 3);
        assert_eq!(stats.this_month, 1);
    }

    #[test]
    fn test_processing_ids() {
        let mut registry = DocumentRegistry::new();
        registry.insert(doc("a", DocumentStatus::Analyzed));
        registry.insert(doc("b", DocumentStatus::Processing));
        registry.insert(doc("c", DocumentStatus::Processing));

        let ids = registry.processing_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&DocumentId::from("b")));
        assert!(ids.contains(&DocumentId::from("c")));
    }
}
