use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{Document, DocumentStatus, FileMeta, StatusUpdate};
use crate::clock::Clock;
use crate::error::DealError;
use crate::store::{RecordStore, UnitOfWork, WriteOutcome};
use crate::workflows::{DocumentId, PurchaseId};

/// Tracks supporting paperwork and answers whether a purchase still owes any of it.
#[derive(Debug, Clone)]
pub struct DocumentGate {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
}

impl DocumentGate {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn add(&self, document: &Document) -> Result<WriteOutcome, DealError> {
        let outcome = self.store.add(document)?;
        debug!(document_id = %document.id, kind = ?document.kind, ?outcome, "document added");
        Ok(outcome)
    }

    /// Move a document to `status`, stamping the matching date. `Ok(None)` when the id is unknown.
    pub fn update_status(
        &self,
        id: &DocumentId,
        status: DocumentStatus,
        update: StatusUpdate,
    ) -> Result<Option<Document>, DealError> {
        let now = self.clock.now();
        let (document, _) = self.store.transaction(|uow| {
            let Some(mut document) = uow.find::<Document>(id.as_str()) else {
                return Ok(None);
            };
            document.apply(status, update, now)?;
            uow.put(&document)?;
            Ok::<_, DealError>(Some(document))
        })?;

        if let Some(document) = &document {
            info!(
                document_id = %document.id,
                status = document.status.label(),
                "document status changed"
            );
        }
        Ok(document)
    }

    /// Record an uploaded file. Verification stays a separate step.
    pub fn upload_document(
        &self,
        id: &DocumentId,
        file: FileMeta,
    ) -> Result<Option<Document>, DealError> {
        self.update_status(
            id,
            DocumentStatus::Uploaded,
            StatusUpdate {
                file: Some(file),
                note: None,
            },
        )
    }

    pub fn get_by_id(&self, id: &DocumentId) -> Option<Document> {
        self.store.find(id.as_str())
    }

    pub fn for_purchase(&self, purchase_id: &PurchaseId) -> Vec<Document> {
        self.store
            .all::<Document>()
            .into_iter()
            .filter(|document| document.belongs_to(purchase_id))
            .collect()
    }

    pub fn outstanding(&self, purchase_id: &PurchaseId) -> Vec<Document> {
        self.for_purchase(purchase_id)
            .into_iter()
            .filter(Document::is_outstanding)
            .collect()
    }

    /// True iff no document of the purchase is still `required`.
    pub fn all_satisfied(&self, purchase_id: &PurchaseId) -> bool {
        self.outstanding(purchase_id).is_empty()
    }

    pub(crate) fn outstanding_in(uow: &UnitOfWork, purchase_id: &PurchaseId) -> Vec<Document> {
        uow.all::<Document>()
            .into_iter()
            .filter(|document| document.belongs_to(purchase_id) && document.is_outstanding())
            .collect()
    }
}
