//! # Purchase Order Composer
//!
//! Drives one [`PurchaseOrderDraft`] to a created (and optionally
//! approved) supplier order.
//!
//! ```text
//! submit()
//!   ├─ single-flight guard
//!   ├─ check_ready()          supplier → branch + items → positive lines
//!   ├─ signed-in session      otherwise NotAuthenticated
//!   ├─ POST /suppliers/orders/              (no client-set status)
//!   ├─ POST /suppliers/orders/{id}/approve  (only with auto-approve)
//!   └─ fresh draft for the same supplier
//! ```
//!
//! Orders add stock, so there is no stock check. Once the order exists
//! the draft is cleared even if the approval call fails; the outcome
//! reports the approval error instead of inviting a duplicate order.
//! Draft edits are refused with `Busy` while a submission runs.

use std::time::Duration;

use tracing::{info, warn};

use tienda_core::{PurchaseOrder, PurchaseOrderDraft, SupplierId};

use super::{require_session, DraftState, SingleFlight};
use crate::config::WorkflowSettings;
use crate::error::ClientResult;
use crate::services::SupplierService;

/// What the order dialog needs after a successful submission.
#[derive(Debug, Clone)]
pub struct OrderSubmitted {
    pub order: PurchaseOrder,
    pub approved: bool,
    /// Set when the order was created but approving it failed.
    pub approval_error: Option<String>,
    pub message: String,
    /// How long the dialog stays open showing `message`.
    pub close_after: Duration,
}

impl OrderSubmitted {
    pub async fn wait_for_close(&self) {
        tokio::time::sleep(self.close_after).await;
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderComposer {
    suppliers: SupplierService,
    draft: DraftState<PurchaseOrderDraft>,
    flight: SingleFlight,
    auto_approve: bool,
    close_after: Duration,
}

impl PurchaseOrderComposer {
    pub fn new(
        suppliers: SupplierService,
        supplier_id: Option<SupplierId>,
        settings: &WorkflowSettings,
    ) -> Self {
        PurchaseOrderComposer {
            suppliers,
            draft: DraftState::new(PurchaseOrderDraft::new(supplier_id)),
            flight: SingleFlight::new(),
            auto_approve: settings.auto_approve_purchase_orders,
            close_after: settings.order_confirmation_delay(),
        }
    }

    pub fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PurchaseOrderDraft) -> R,
    {
        self.draft.with_draft(f)
    }

    pub fn with_draft_mut<F, R>(&self, f: F) -> ClientResult<R>
    where
        F: FnOnce(&mut PurchaseOrderDraft) -> R,
    {
        self.draft.edit_unless_busy(&self.flight, f)
    }

    pub fn draft(&self) -> PurchaseOrderDraft {
        self.draft.snapshot()
    }

    pub fn is_submitting(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn auto_approve(&self) -> bool {
        self.auto_approve
    }

    pub async fn submit(&self) -> ClientResult<OrderSubmitted> {
        let _flight = self.flight.try_begin()?;

        let draft = self.draft.snapshot();
        let request = match draft.to_request() {
            Ok(request) => request,
            Err(rejection) => {
                warn!(code = rejection.code(), "Purchase order rejected");
                return Err(rejection.into());
            }
        };
        require_session(self.suppliers.api())?;

        let order = self.suppliers.create_purchase_order(&request).await?;
        self.draft
            .replace(PurchaseOrderDraft::new(draft.supplier_id));

        let (approved, approval_error) = if self.auto_approve {
            match self.suppliers.approve_purchase_order(order.order_id).await {
                Ok(()) => (true, None),
                Err(e) => {
                    warn!(order_id = order.order_id, error = %e, "Approval failed");
                    (false, Some(e.user_message()))
                }
            }
        } else {
            (false, None)
        };

        let message = match (&approval_error, approved) {
            (Some(error), _) => format!(
                "Pedido #{} creado, pero no se pudo aprobar: {}",
                order.order_id, error
            ),
            (None, true) => format!("Pedido #{} creado y aprobado exitosamente!", order.order_id),
            (None, false) => format!("Pedido #{} creado exitosamente!", order.order_id),
        };
        info!(order_id = order.order_id, approved, "Purchase order submitted");

        Ok(OrderSubmitted {
            order,
            approved,
            approval_error,
            message,
            close_after: self.close_after,
        })
    }
}
