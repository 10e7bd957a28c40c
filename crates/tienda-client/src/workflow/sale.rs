//! # Sale Composer
//!
//! Drives one [`SaleDraft`] from composition to a created sale.
//!
//! ## Submit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SaleComposer::submit                            │
//! │                                                                         │
//! │  1. single-flight guard ───── busy ──────────────────► Busy            │
//! │  2. phase = Validating                                                  │
//! │  3. check_ready() ─────────── fails ─────────────────► Rejected        │
//! │     branch → items → payment method → lines → discount                 │
//! │     no session ────────────────────────────────────► NotAuthenticated  │
//! │  4. GET /inventory/?branch_id=B&product_ids=…   (one request, then     │
//! │     /products/{id}/inventory for products the batch left out)          │
//! │  5. check_stock() ─────────── shortages ─────────────► Rejected        │
//! │     one message per short line, all of them                            │
//! │  6. POST /sales ───────────── 4xx/5xx ───────────────► Rejected        │
//! │  7. phase = Submitted, draft replaced by a fresh one                   │
//! │     outcome carries the detail route and the confirmation delay        │
//! │                                                                         │
//! │  Rejected keeps the draft exactly as it was; the next edit returns     │
//! │  the composer to Composing. Edits are refused while 1 to 7 run.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check is advisory. Stock can change between the check and
//! the POST; the server makes the authoritative decision.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use tienda_core::{DraftRejection, DraftTotals, Sale, SaleDraft, SubmissionPhase};

use super::{require_session, DraftState, SingleFlight};
use crate::config::WorkflowSettings;
use crate::error::ClientResult;
use crate::services::{InventoryService, SaleService};

pub const SALE_CREATED_MESSAGE: &str = "Venta creada exitosamente";

/// What a page needs after a successful submission.
#[derive(Debug, Clone)]
pub struct SaleSubmitted {
    pub sale: Sale,
    pub message: String,
    /// Route of the sale detail view.
    pub detail_path: String,
    /// How long the confirmation stays before navigating.
    pub navigate_after: Duration,
}

impl SaleSubmitted {
    /// Resolves once the confirmation has been visible long enough.
    pub async fn wait_for_navigation(&self) {
        tokio::time::sleep(self.navigate_after).await;
    }
}

#[derive(Debug, Clone)]
pub struct SaleComposer {
    sales: SaleService,
    inventory: InventoryService,
    draft: DraftState<SaleDraft>,
    /// Set while validating and after the last attempt; cleared by edits.
    outcome: Arc<Mutex<Option<SubmissionPhase>>>,
    flight: SingleFlight,
    navigate_after: Duration,
}

impl SaleComposer {
    pub fn new(sales: SaleService, inventory: InventoryService, settings: &WorkflowSettings) -> Self {
        SaleComposer {
            sales,
            inventory,
            draft: DraftState::new(SaleDraft::new()),
            outcome: Arc::new(Mutex::new(None)),
            flight: SingleFlight::new(),
            navigate_after: settings.sale_confirmation_delay(),
        }
    }

    // =========================================================================
    // Draft Access
    // =========================================================================

    pub fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SaleDraft) -> R,
    {
        self.draft.with_draft(f)
    }

    /// Edits the draft. Any edit moves a rejected or submitted composer
    /// back to the draft's own phase.
    ///
    /// Fails with [`ClientError::Busy`](crate::ClientError::Busy) while a
    /// submission is in flight, leaving the draft untouched.
    pub fn with_draft_mut<F, R>(&self, f: F) -> ClientResult<R>
    where
        F: FnOnce(&mut SaleDraft) -> R,
    {
        let result = self.draft.edit_unless_busy(&self.flight, f)?;
        *self.outcome_slot() = None;
        Ok(result)
    }

    pub fn draft(&self) -> SaleDraft {
        self.draft.snapshot()
    }

    pub fn totals(&self) -> DraftTotals {
        self.draft.with_draft(SaleDraft::totals)
    }

    pub fn phase(&self) -> SubmissionPhase {
        match *self.outcome_slot() {
            Some(phase) => phase,
            None => self.draft.with_draft(SaleDraft::phase),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.flight.is_busy()
    }

    /// Discards the draft and any outcome.
    pub fn reset(&self) {
        self.draft.replace(SaleDraft::new());
        *self.outcome_slot() = None;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    pub async fn submit(&self) -> ClientResult<SaleSubmitted> {
        let _flight = self.flight.try_begin()?;
        self.set_outcome(SubmissionPhase::Validating);

        let draft = self.draft.snapshot();
        match self.run(&draft).await {
            Ok(sale) => {
                self.draft.replace(SaleDraft::new());
                self.set_outcome(SubmissionPhase::Submitted);
                info!(
                    sale_id = sale.sale_id,
                    total = %sale.total,
                    lines = draft.items.len(),
                    "Sale submitted"
                );
                Ok(SaleSubmitted {
                    detail_path: format!("/ventas/{}", sale.sale_id),
                    sale,
                    message: SALE_CREATED_MESSAGE.to_string(),
                    navigate_after: self.navigate_after,
                })
            }
            Err(e) => {
                self.set_outcome(SubmissionPhase::Rejected);
                warn!(draft_id = %draft.id, code = e.code(), error = %e, "Sale rejected");
                Err(e)
            }
        }
    }

    async fn run(&self, draft: &SaleDraft) -> ClientResult<Sale> {
        draft.check_ready()?;
        let branch_id = draft.branch_id.ok_or(DraftRejection::MissingBranch)?;
        require_session(self.sales.api())?;

        let snapshot = self
            .inventory
            .snapshot(branch_id, &draft.product_ids())
            .await?;
        let shortages = draft.check_stock(&snapshot);
        if !shortages.is_empty() {
            debug!(count = shortages.len(), "Stock shortages");
            return Err(DraftRejection::InsufficientStock(shortages).into());
        }

        let request = draft.to_request()?;
        self.sales.create(&request).await
    }

    fn outcome_slot(&self) -> std::sync::MutexGuard<'_, Option<SubmissionPhase>> {
        self.outcome.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_outcome(&self, phase: SubmissionPhase) {
        *self.outcome_slot() = Some(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::ConsoleConfig;
    use crate::error::ClientError;
    use crate::session::SessionContext;
    use tienda_core::{Money, Quantity};

    /// Points at a closed port; these tests never reach the network.
    fn composer() -> SaleComposer {
        let config = ConsoleConfig::with_base_url("http://127.0.0.1:9/api/v1");
        let api = ApiClient::new(&config, Arc::new(SessionContext::in_memory())).unwrap();
        SaleComposer::new(
            SaleService::new(api.clone()),
            InventoryService::new(api),
            &config.workflow,
        )
    }

    #[tokio::test]
    async fn test_precondition_rejection_keeps_draft() {
        let composer = composer();
        assert_eq!(composer.phase(), SubmissionPhase::Empty);

        composer
            .with_draft_mut(|d| {
                d.add_line().unwrap();
                d.set_line_quantity(0, Quantity::from_units(2)).unwrap();
            })
            .unwrap();
        assert_eq!(composer.phase(), SubmissionPhase::Composing);

        let err = composer.submit().await.unwrap_err();
        assert!(matches!(err, ClientError::Draft(DraftRejection::MissingBranch)));
        assert_eq!(composer.phase(), SubmissionPhase::Rejected);
        assert_eq!(composer.with_draft(|d| d.items.len()), 1);
        assert!(!composer.is_submitting());

        composer.with_draft_mut(|d| d.set_branch(Some(1))).unwrap();
        assert_eq!(composer.phase(), SubmissionPhase::Composing);

        let err = composer.submit().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Draft(DraftRejection::MissingPaymentMethod)
        ));
    }

    #[tokio::test]
    async fn test_totals_follow_edits() {
        let composer = composer();
        composer.with_draft_mut(|d| {
            let a = d.add_line().unwrap();
            d.items[a].unit_price = Money::from_cents(1000);
            d.items[a].quantity = Quantity::from_units(2);
            let b = d.add_line().unwrap();
            d.items[b].unit_price = Money::from_cents(500);
            d.items[b].quantity = Quantity::from_units(3);
            d.set_discount(Money::from_cents(500));
        })
        .unwrap();

        let totals = composer.totals();
        assert_eq!(totals.subtotal, Money::from_cents(3500));
        assert_eq!(totals.total, Money::from_cents(3000));

        composer.reset();
        assert_eq!(composer.phase(), SubmissionPhase::Empty);
    }

    #[tokio::test]
    async fn test_edits_refused_during_submission() {
        let composer = composer();
        composer.with_draft_mut(|d| d.set_branch(Some(1))).unwrap();

        let flight = composer.flight.try_begin().unwrap();
        let err = composer
            .with_draft_mut(|d| d.set_branch(Some(2)))
            .unwrap_err();
        assert!(matches!(err, ClientError::Busy));
        assert_eq!(composer.with_draft(|d| d.branch_id), Some(1));

        drop(flight);
        composer.with_draft_mut(|d| d.set_branch(Some(2))).unwrap();
        assert_eq!(composer.with_draft(|d| d.branch_id), Some(2));
    }

    #[tokio::test]
    async fn test_ready_draft_without_session_is_not_sent() {
        let composer = composer();
        composer
            .with_draft_mut(|d| {
                d.set_branch(Some(1));
                d.set_payment_method(Some(1));
                let line = d.add_line().unwrap();
                d.items[line].product_id = Some(5);
                d.items[line].unit_price = Money::from_cents(100);
                d.set_line_quantity(line, Quantity::from_units(1)).unwrap();
            })
            .unwrap();

        let err = composer.submit().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert_eq!(err.user_message(), "Debes iniciar sesión");
        assert_eq!(composer.phase(), SubmissionPhase::Rejected);
    }
}
