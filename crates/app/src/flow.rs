//! Capture and review: turning a scan or a manual entry into a committed record.

use chrono::{DateTime, Utc};
use kakeibo_core::{ExpenseRecord, LineItem, Yen};
use kakeibo_ocr::{OcrBackend, PipelineError, ReceiptPipeline};
use kakeibo_storage::{delete_value, get_value, set_value, ExpenseStore, StoreError};
use std::path::Path;
use thiserror::Error;

use crate::review::{DraftOrigin, ReviewDraft, ReviewError};

/// Key holding the draft currently under review, if any.
pub const DRAFT_KEY: &str = "review_draft";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error("No draft is under review")]
    NoDraft,
    #[error("Saved draft could not be read: {0}")]
    CorruptDraft(#[from] serde_json::Error),
}

/// What a successful commit left behind.
#[derive(Debug, Clone)]
pub struct Committed {
    pub record: ExpenseRecord,
    /// Budget after the record's total was deducted.
    pub budget: Yen,
}

#[derive(Debug, Clone)]
pub struct CaptureFlow {
    store: ExpenseStore,
}

impl CaptureFlow {
    pub fn new(store: ExpenseStore) -> Self {
        CaptureFlow { store }
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    /// Scan a receipt image into a fresh draft. A scan that finds nothing
    /// still yields a (possibly empty) draft carrying a notice.
    pub async fn scan<R: OcrBackend>(
        &self,
        pipeline: &ReceiptPipeline<R>,
        image: &Path,
    ) -> Result<ReviewDraft, FlowError> {
        let outcome = pipeline.scan_file(image).await?;
        let draft = ReviewDraft::from_scan(outcome, Utc::now());
        self.save_draft(&draft).await?;
        tracing::info!(items = draft.items.len(), "scan ready for review");
        Ok(draft)
    }

    /// Record a manual entry straight away as a pending record and open it
    /// for review. The review commit later overwrites that record.
    pub async fn start_manual(
        &self,
        shop: Option<String>,
        items: Vec<LineItem>,
    ) -> Result<ReviewDraft, FlowError> {
        self.start_manual_at(shop, items, Utc::now()).await
    }

    pub async fn start_manual_at(
        &self,
        shop: Option<String>,
        items: Vec<LineItem>,
        date: DateTime<Utc>,
    ) -> Result<ReviewDraft, FlowError> {
        if items.is_empty() {
            return Err(ReviewError::NoItems.into());
        }
        let pending = ExpenseRecord::new(date, shop, items);
        let draft = ReviewDraft::manual(pending.shop.clone(), pending.items.clone(), pending.date);
        self.store.add_record(pending).await?;
        self.save_draft(&draft).await?;
        Ok(draft)
    }

    pub async fn current_draft(&self) -> Result<Option<ReviewDraft>, FlowError> {
        match get_value(self.store.pool(), DRAFT_KEY)
            .await
            .map_err(StoreError::from)?
        {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// The current draft, or [`FlowError::NoDraft`].
    pub async fn require_draft(&self) -> Result<ReviewDraft, FlowError> {
        self.current_draft().await?.ok_or(FlowError::NoDraft)
    }

    pub async fn save_draft(&self, draft: &ReviewDraft) -> Result<(), FlowError> {
        let json = serde_json::to_string(draft)?;
        set_value(self.store.pool(), DRAFT_KEY, &json)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Drop the draft without committing. A manual entry's pending record
    /// stays in the history.
    pub async fn discard_draft(&self) -> Result<bool, FlowError> {
        Ok(delete_value(self.store.pool(), DRAFT_KEY)
            .await
            .map_err(StoreError::from)?)
    }

    /// Persist the reviewed draft and deduct its total from the budget.
    pub async fn commit(&self, draft: ReviewDraft) -> Result<Committed, FlowError> {
        let origin = draft.origin;
        let date = draft.date;
        let patch = draft.into_patch()?;

        let record = match origin {
            DraftOrigin::Scan => {
                let record = ExpenseRecord::new(date, patch.shop, patch.items);
                self.store.add_record(record.clone()).await?;
                record
            }
            DraftOrigin::Manual => self.store.update_most_recent(patch).await?,
        };

        let book = self.store.load().await?;
        let budget = book.budget() - record.total();
        self.store.set_budget(budget).await?;
        self.discard_draft().await?;

        tracing::info!(id = %record.id, total = %record.total(), budget = %budget, "committed");
        Ok(Committed { record, budget })
    }
}
