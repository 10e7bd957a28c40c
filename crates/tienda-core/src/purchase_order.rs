//! # Purchase Order Draft
//!
//! Replenishment order to a supplier, composed line by line.
//!
//! Same shape as [`crate::sale_draft`] with two differences: there is no
//! stock check (orders add stock), and adding a product that is already
//! on the order sums the quantities instead of adding a second line.
//!
//! ```text
//! add_product(Arroz, 3) ──► [Arroz × 3]
//! add_product(Aceite, 1) ─► [Arroz × 3, Aceite × 1]
//! add_product(Arroz, 4) ──► [Arroz × 7, Aceite × 1]
//! ```
//!
//! The draft carries no status. Approval is a separate server call made
//! by the client crate when configured to do so.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, DraftRejection, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{BranchId, Product, ProductId, SupplierId};
use crate::MAX_DRAFT_LINES;

/// One product on a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    /// Pre-filled from the product cost, editable.
    pub unit_cost: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_cost * self.quantity
    }
}

/// A purchase order being composed for one supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderDraft {
    pub id: Uuid,
    pub supplier_id: Option<SupplierId>,
    pub branch_id: Option<BranchId>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: String,
    pub items: Vec<OrderLine>,
}

impl PurchaseOrderDraft {
    pub fn new(supplier_id: Option<SupplierId>) -> Self {
        PurchaseOrderDraft {
            id: Uuid::new_v4(),
            supplier_id,
            branch_id: None,
            expected_delivery_date: None,
            notes: String::new(),
            items: Vec::new(),
        }
    }

    pub fn for_supplier(supplier_id: SupplierId) -> Self {
        Self::new(Some(supplier_id))
    }

    pub fn set_branch(&mut self, branch_id: Option<BranchId>) {
        self.branch_id = branch_id;
    }

    pub fn set_expected_delivery_date(&mut self, date: Option<NaiveDate>) {
        self.expected_delivery_date = date;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Adds `quantity` of `product`, merging with an existing line.
    ///
    /// The unit cost of a new line comes from the product's cost (zero
    /// when unknown). Merging keeps the cost already on the line.
    pub fn add_product(&mut self, product: &Product, quantity: Quantity) -> CoreResult<()> {
        self.add_line(
            product.product_id,
            product.name.clone(),
            quantity,
            product.unit_cost(),
        )
    }

    pub fn add_line(
        &mut self,
        product_id: ProductId,
        product_name: String,
        quantity: Quantity,
        unit_cost: Money,
    ) -> CoreResult<()> {
        if !quantity.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += quantity;
            return Ok(());
        }

        if self.items.len() >= MAX_DRAFT_LINES {
            return Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_LINES,
            });
        }

        self.items.push(OrderLine {
            product_id,
            product_name,
            quantity,
            unit_cost,
        });
        Ok(())
    }

    pub fn set_line_quantity(&mut self, index: usize, quantity: Quantity) -> CoreResult<()> {
        self.line_mut(index)?.quantity = quantity;
        Ok(())
    }

    pub fn set_line_cost(&mut self, index: usize, unit_cost: Money) -> CoreResult<()> {
        self.line_mut(index)?.unit_cost = unit_cost;
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<OrderLine> {
        if index >= self.items.len() {
            return Err(CoreError::LineNotFound { index });
        }
        Ok(self.items.remove(index))
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut OrderLine> {
        self.items
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })
    }

    /// `Σ unit_cost × quantity`.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Supplier, then branch and items, then every line positive.
    pub fn check_ready(&self) -> Result<(), DraftRejection> {
        if self.supplier_id.is_none() {
            return Err(DraftRejection::MissingSupplier);
        }
        if self.branch_id.is_none() || self.items.is_empty() {
            return Err(DraftRejection::IncompleteOrder);
        }
        let invalid = self
            .items
            .iter()
            .any(|l| !l.quantity.is_positive() || !l.unit_cost.is_positive());
        if invalid {
            return Err(DraftRejection::InvalidOrderLines);
        }
        Ok(())
    }

    /// Body of `POST /suppliers/orders/`. Runs `check_ready` first.
    pub fn to_request(&self) -> Result<NewPurchaseOrder, DraftRejection> {
        self.check_ready()?;
        let (Some(supplier_id), Some(branch_id)) = (self.supplier_id, self.branch_id) else {
            return Err(DraftRejection::IncompleteOrder);
        };
        Ok(NewPurchaseOrder {
            supplier_id,
            branch_id,
            expected_delivery_date: self.expected_delivery_date,
            notes: self.notes.clone(),
            items: self
                .items
                .iter()
                .map(|l| NewOrderItem {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_cost: l.unit_cost,
                })
                .collect(),
        })
    }
}

/// Body of `POST /suppliers/orders/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    pub branch_id: BranchId,
    #[ts(as = "Option<String>")]
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    #[ts(type = "string")]
    pub quantity: Quantity,
    #[ts(type = "string")]
    pub unit_cost: Money,
}
