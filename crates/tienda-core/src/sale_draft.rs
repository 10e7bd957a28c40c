//! # Sale Draft
//!
//! Client-side composition state of a sale before it is submitted.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Draft State Machine                             │
//! │                                                                         │
//! │   ┌─────────┐  add_line / set_branch   ┌───────────┐                   │
//! │   │  Empty  │ ───────────────────────► │ Composing │ ◄──────────┐      │
//! │   └─────────┘                          └─────┬─────┘            │      │
//! │                                              │ submit            │      │
//! │                                              ▼                   │      │
//! │                                        ┌────────────┐  rejected  │      │
//! │                                        │ Validating │ ──────────►│      │
//! │                                        └─────┬──────┘  (draft kept)     │
//! │                                              │ accepted                 │
//! │                                              ▼                          │
//! │                                        ┌───────────┐                    │
//! │                                        │ Submitted │  draft discarded   │
//! │                                        └───────────┘                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The draft itself only knows `Empty` and `Composing`; the composer in
//! the client crate drives the other phases around the network calls.
//!
//! ## Price Lock
//! Selecting a product copies its catalog price into the line. Later
//! catalog refreshes do not touch the line, so the user submits the price
//! they saw. The server still owns pricing and may reject the sale.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, DraftRejection};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{
    BranchId, ClientId, InventoryItem, PaymentMethodId, Product, ProductId,
};
use crate::{MAX_DRAFT_LINES, UNKNOWN_PRODUCT_LABEL};

// =============================================================================
// Sale Line
// =============================================================================

/// One line of a sale draft.
///
/// A fresh line has no product, quantity 1, zero price and zero discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: Option<ProductId>,

    /// Name at selection time, for messages.
    pub product_name: Option<String>,

    pub quantity: Quantity,

    /// Catalog price at selection time (locked).
    pub unit_price: Money,

    /// Absolute discount on this line.
    pub discount: Money,
}

impl SaleLine {
    pub fn new() -> Self {
        SaleLine {
            product_id: None,
            product_name: None,
            quantity: Quantity::from_units(1),
            unit_price: Money::zero(),
            discount: Money::zero(),
        }
    }

    /// `unit_price × quantity`.
    pub fn gross(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// `unit_price × quantity − discount`, the amount shown on the row.
    pub fn line_total(&self) -> Money {
        self.gross() - self.discount
    }

    /// Label used in stock messages.
    pub fn label(&self) -> &str {
        self.product_name.as_deref().unwrap_or(UNKNOWN_PRODUCT_LABEL)
    }
}

impl Default for SaleLine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Sale Draft
// =============================================================================

/// Which phase a sale submission is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SubmissionPhase {
    Empty,
    Composing,
    Validating,
    Submitted,
    Rejected,
}

/// A sale being composed.
///
/// ## Invariants
/// - At most `MAX_DRAFT_LINES` lines
/// - `unit_price` of a line equals the catalog price of its product at
///   the moment the product was selected
/// - Totals are derived on every read, never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDraft {
    /// Local identity; the single-flight guard is keyed on it.
    pub id: Uuid,
    pub client_id: Option<ClientId>,
    pub branch_id: Option<BranchId>,
    pub payment_method_id: Option<PaymentMethodId>,
    /// General discount subtracted from the subtotal.
    pub discount: Money,
    pub items: Vec<SaleLine>,
}

impl SaleDraft {
    pub fn new() -> Self {
        SaleDraft {
            id: Uuid::new_v4(),
            client_id: None,
            branch_id: None,
            payment_method_id: None,
            discount: Money::zero(),
            items: Vec::new(),
        }
    }

    /// `Empty` until anything is chosen, `Composing` afterwards.
    pub fn phase(&self) -> SubmissionPhase {
        let untouched = self.items.is_empty()
            && self.branch_id.is_none()
            && self.payment_method_id.is_none()
            && self.client_id.is_none()
            && self.discount.is_zero();
        if untouched {
            SubmissionPhase::Empty
        } else {
            SubmissionPhase::Composing
        }
    }

    // -------------------------------------------------------------------------
    // Header fields
    // -------------------------------------------------------------------------

    pub fn set_client(&mut self, client_id: Option<ClientId>) {
        self.client_id = client_id;
    }

    pub fn set_branch(&mut self, branch_id: Option<BranchId>) {
        self.branch_id = branch_id;
    }

    pub fn set_payment_method(&mut self, payment_method_id: Option<PaymentMethodId>) {
        self.payment_method_id = payment_method_id;
    }

    pub fn set_discount(&mut self, discount: Money) {
        self.discount = discount;
    }

    // -------------------------------------------------------------------------
    // Lines
    // -------------------------------------------------------------------------

    /// Appends an empty line and returns its index.
    pub fn add_line(&mut self) -> CoreResult<usize> {
        if self.items.len() >= MAX_DRAFT_LINES {
            return Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_LINES,
            });
        }
        self.items.push(SaleLine::new());
        Ok(self.items.len() - 1)
    }

    /// Selects `product` for a line and locks its current price.
    pub fn set_line_product(&mut self, index: usize, product: &Product) -> CoreResult<()> {
        let line = self.line_mut(index)?;
        line.product_id = Some(product.product_id);
        line.product_name = Some(product.name.clone());
        line.unit_price = product.price;
        Ok(())
    }

    /// Values are stored as given; non-positive quantities are rejected
    /// at submit time, not here.
    pub fn set_line_quantity(&mut self, index: usize, quantity: Quantity) -> CoreResult<()> {
        self.line_mut(index)?.quantity = quantity;
        Ok(())
    }

    pub fn set_line_discount(&mut self, index: usize, discount: Money) -> CoreResult<()> {
        self.line_mut(index)?.discount = discount;
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<SaleLine> {
        if index >= self.items.len() {
            return Err(CoreError::LineNotFound { index });
        }
        Ok(self.items.remove(index))
    }

    pub fn line(&self, index: usize) -> Option<&SaleLine> {
        self.items.get(index)
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut SaleLine> {
        self.items
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// `Σ unit_price × quantity` over every line.
    ///
    /// Line discounts are shown per row but, like the backend, the sale
    /// subtotal is computed from gross line amounts.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(SaleLine::gross).sum()
    }

    /// `subtotal − discount`. Negative when the discount exceeds the
    /// subtotal; the server decides whether to accept that.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount
    }

    pub fn totals(&self) -> DraftTotals {
        DraftTotals::from(self)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct product ids, in line order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::new();
        for id in self.items.iter().filter_map(|l| l.product_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    // -------------------------------------------------------------------------
    // Submission checks
    // -------------------------------------------------------------------------

    /// Preconditions evaluated before any network call, first failure wins:
    /// branch, at least one line, payment method, then each line in order.
    pub fn check_ready(&self) -> Result<(), DraftRejection> {
        if self.branch_id.is_none() {
            return Err(DraftRejection::MissingBranch);
        }
        if self.items.is_empty() {
            return Err(DraftRejection::NoItems);
        }
        if self.payment_method_id.is_none() {
            return Err(DraftRejection::MissingPaymentMethod);
        }
        for (line, item) in self.items.iter().enumerate() {
            if item.product_id.is_none() {
                return Err(DraftRejection::LineWithoutProduct { line });
            }
            if !item.quantity.is_positive() {
                return Err(DraftRejection::InvalidQuantity { line });
            }
            if item.discount.is_negative() {
                return Err(DraftRejection::InvalidLineDiscount { line });
            }
        }
        if self.discount.is_negative() {
            return Err(DraftRejection::InvalidDiscount);
        }
        Ok(())
    }

    /// Every line whose requested quantity exceeds the stock in `snapshot`.
    ///
    /// Lines are checked independently; a product missing from the
    /// snapshot counts as zero available. The result does not depend on
    /// line order beyond the order of the returned list.
    pub fn check_stock(&self, snapshot: &StockSnapshot) -> Vec<StockShortage> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(line, item)| {
                let product_id = item.product_id?;
                let available = snapshot.available(product_id).unwrap_or_default();
                if available >= item.quantity {
                    return None;
                }
                let product_name = item
                    .product_name
                    .clone()
                    .or_else(|| snapshot.name(product_id).map(str::to_string))
                    .unwrap_or_else(|| UNKNOWN_PRODUCT_LABEL.to_string());
                Some(StockShortage {
                    line,
                    product_id,
                    product_name,
                    available,
                    requested: item.quantity,
                })
            })
            .collect()
    }

    /// `check_ready` then `check_stock`, folded into one rejection.
    pub fn validate_against(&self, snapshot: &StockSnapshot) -> Result<(), DraftRejection> {
        self.check_ready()?;
        let shortages = self.check_stock(snapshot);
        if shortages.is_empty() {
            Ok(())
        } else {
            Err(DraftRejection::InsufficientStock(shortages))
        }
    }

    /// Request body for `POST /sales`. Runs `check_ready` first.
    pub fn to_request(&self) -> Result<NewSale, DraftRejection> {
        self.check_ready()?;
        let (Some(branch_id), Some(payment_method_id)) = (self.branch_id, self.payment_method_id)
        else {
            return Err(DraftRejection::MissingBranch);
        };
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(line, item)| {
                let product_id = item
                    .product_id
                    .ok_or(DraftRejection::LineWithoutProduct { line })?;
                Ok(NewSaleItem {
                    product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    discount: item.discount,
                })
            })
            .collect::<Result<Vec<_>, DraftRejection>>()?;

        Ok(NewSale {
            client_id: self.client_id,
            branch_id,
            payment_method_id,
            discount: self.discount,
            items,
        })
    }
}

impl Default for SaleDraft {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Totals summary for the draft footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DraftTotals {
    pub line_count: usize,
    #[ts(type = "string")]
    pub subtotal: Money,
    #[ts(type = "string")]
    pub discount: Money,
    #[ts(type = "string")]
    pub total: Money,
}

impl From<&SaleDraft> for DraftTotals {
    fn from(draft: &SaleDraft) -> Self {
        DraftTotals {
            line_count: draft.items.len(),
            subtotal: draft.subtotal(),
            discount: draft.discount,
            total: draft.total(),
        }
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Stock levels at one branch for the products of a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockSnapshot {
    branch_id: BranchId,
    levels: HashMap<ProductId, Quantity>,
    names: HashMap<ProductId, String>,
}

impl StockSnapshot {
    pub fn new(branch_id: BranchId) -> Self {
        StockSnapshot {
            branch_id,
            ..Default::default()
        }
    }

    /// Builds a snapshot from inventory rows, ignoring other branches.
    ///
    /// Rows for the same product are summed.
    pub fn from_inventory(branch_id: BranchId, rows: &[InventoryItem]) -> Self {
        let mut snapshot = StockSnapshot::new(branch_id);
        for row in rows.iter().filter(|r| r.branch_id == branch_id) {
            if let Some(product_id) = row.product_id {
                *snapshot.levels.entry(product_id).or_default() += row.quantity;
            }
        }
        snapshot
    }

    /// Builds a snapshot from products carrying `inventory_items`.
    pub fn from_products(branch_id: BranchId, products: &[Product]) -> Self {
        let mut snapshot = StockSnapshot::new(branch_id);
        for product in products {
            snapshot
                .names
                .insert(product.product_id, product.name.clone());
            if let Some(level) = product.stock_at(branch_id) {
                snapshot.levels.insert(product.product_id, level);
            }
        }
        snapshot
    }

    pub fn set_level(&mut self, product_id: ProductId, quantity: Quantity) {
        self.levels.insert(product_id, quantity);
    }

    pub fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    pub fn available(&self, product_id: ProductId) -> Option<Quantity> {
        self.levels.get(&product_id).copied()
    }

    pub fn name(&self, product_id: ProductId) -> Option<&str> {
        self.names.get(&product_id).map(String::as_str)
    }
}

/// A line asking for more than the branch has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    /// 0-based line index.
    pub line: usize,
    pub product_id: ProductId,
    pub product_name: String,
    pub available: Quantity,
    pub requested: Quantity,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stock insuficiente para {}. Disponible: {}, Solicitado: {}",
            self.product_name, self.available, self.requested
        )
    }
}

// =============================================================================
// Request Body
// =============================================================================

/// Body of `POST /sales`. Numeric item fields travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub client_id: Option<ClientId>,
    pub branch_id: BranchId,
    pub payment_method_id: PaymentMethodId,
    #[ts(type = "string")]
    pub discount: Money,
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: ProductId,
    #[ts(type = "string")]
    pub quantity: Quantity,
    #[ts(type = "string")]
    pub unit_price: Money,
    #[ts(type = "string")]
    pub discount: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId, name: &str, price_cents: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "product_id": id,
            "name": name,
            "price": price_cents as f64 / 100.0,
        }))
        .unwrap()
    }

    fn draft_with(lines: &[(ProductId, &str, i64, i64)]) -> SaleDraft {
        let mut draft = SaleDraft::new();
        for (id, name, price, qty) in lines {
            let index = draft.add_line().unwrap();
            draft.set_line_product(index, &product(*id, name, *price)).unwrap();
            draft
                .set_line_quantity(index, Quantity::from_units(*qty))
                .unwrap();
        }
        draft
    }

    fn ready(mut draft: SaleDraft) -> SaleDraft {
        draft.set_branch(Some(1));
        draft.set_payment_method(Some(1));
        draft
    }

    #[test]
    fn test_new_line_defaults() {
        let mut draft = SaleDraft::new();
        assert_eq!(draft.phase(), SubmissionPhase::Empty);
        let index = draft.add_line().unwrap();
        let line = draft.line(index).unwrap();
        assert_eq!(line.product_id, None);
        assert_eq!(line.quantity, Quantity::from_units(1));
        assert_eq!(line.unit_price, Money::zero());
        assert_eq!(line.discount, Money::zero());
        assert_eq!(draft.phase(), SubmissionPhase::Composing);
    }

    #[test]
    fn test_totals_example() {
        // [{10 × 2}, {5 × 3}], discount 5 → subtotal 35, total 30
        let mut draft = draft_with(&[(1, "A", 1000, 2), (2, "B", 500, 3)]);
        draft.set_discount(Money::from_cents(500));

        let totals = draft.totals();
        assert_eq!(totals.subtotal, Money::from_cents(3500));
        assert_eq!(totals.total, Money::from_cents(3000));
        assert_eq!(totals.line_count, 2);
    }

    #[test]
    fn test_totals_independent_of_edit_order() {
        let mut a = draft_with(&[(1, "A", 1000, 2), (2, "B", 500, 3), (3, "C", 100, 9)]);
        a.remove_line(2).unwrap();

        let b = draft_with(&[(2, "B", 500, 3), (1, "A", 1000, 2)]);
        assert_eq!(a.subtotal(), b.subtotal());
        assert_eq!(a.total(), b.total());
    }

    #[test]
    fn test_price_locked_at_selection() {
        let mut draft = SaleDraft::new();
        let index = draft.add_line().unwrap();
        let mut p = product(1, "Leche", 650);
        draft.set_line_product(index, &p).unwrap();

        p.price = Money::from_cents(700);
        assert_eq!(draft.line(index).unwrap().unit_price, Money::from_cents(650));
    }

    #[test]
    fn test_line_total_subtracts_line_discount() {
        let mut draft = draft_with(&[(1, "A", 1000, 2)]);
        draft.set_line_discount(0, Money::from_cents(150)).unwrap();
        assert_eq!(draft.line(0).unwrap().line_total(), Money::from_cents(1850));
    }

    #[test]
    fn test_bad_line_index() {
        let mut draft = SaleDraft::new();
        assert!(matches!(
            draft.remove_line(0),
            Err(CoreError::LineNotFound { index: 0 })
        ));
        assert!(draft.set_line_quantity(3, Quantity::from_units(1)).is_err());
    }

    #[test]
    fn test_line_limit() {
        let mut draft = SaleDraft::new();
        for _ in 0..MAX_DRAFT_LINES {
            draft.add_line().unwrap();
        }
        assert!(matches!(
            draft.add_line(),
            Err(CoreError::DraftTooLarge { .. })
        ));
    }

    #[test]
    fn test_preconditions_in_order() {
        let mut draft = SaleDraft::new();
        assert_eq!(draft.check_ready(), Err(DraftRejection::MissingBranch));

        draft.set_branch(Some(1));
        assert_eq!(draft.check_ready(), Err(DraftRejection::NoItems));

        draft.add_line().unwrap();
        assert_eq!(draft.check_ready(), Err(DraftRejection::MissingPaymentMethod));

        draft.set_payment_method(Some(2));
        assert_eq!(
            draft.check_ready(),
            Err(DraftRejection::LineWithoutProduct { line: 0 })
        );

        draft.set_line_product(0, &product(1, "A", 100)).unwrap();
        draft.set_line_quantity(0, Quantity::zero()).unwrap();
        assert_eq!(
            draft.check_ready(),
            Err(DraftRejection::InvalidQuantity { line: 0 })
        );

        draft.set_line_quantity(0, Quantity::from_units(1)).unwrap();
        draft.set_discount(Money::from_cents(-1));
        assert_eq!(draft.check_ready(), Err(DraftRejection::InvalidDiscount));

        draft.set_discount(Money::zero());
        assert_eq!(draft.check_ready(), Ok(()));
    }

    #[test]
    fn test_stock_check_reports_exactly_the_short_lines() {
        let draft = ready(draft_with(&[
            (1, "Arroz", 100, 4),
            (2, "Fideo", 100, 1),
            (3, "Aceite", 100, 2),
        ]));
        let mut snapshot = StockSnapshot::new(1);
        snapshot.set_level(1, Quantity::from_units(1));
        snapshot.set_level(2, Quantity::from_units(10));
        // product 3 has no inventory entry at this branch

        let shortages = draft.check_stock(&snapshot);
        assert_eq!(shortages.len(), 2);
        assert_eq!(
            shortages[0].to_string(),
            "Stock insuficiente para Arroz. Disponible: 1, Solicitado: 4"
        );
        assert_eq!(
            shortages[1].to_string(),
            "Stock insuficiente para Aceite. Disponible: 0, Solicitado: 2"
        );

        let err = draft.validate_against(&snapshot).unwrap_err();
        assert_eq!(err.shortages().len(), 2);
    }

    #[test]
    fn test_weighed_shortage_uses_shortest_decimals() {
        let mut draft = ready(SaleDraft::new());
        let line = draft.add_line().unwrap();
        draft.set_line_product(line, &product(7, "Queso", 4500)).unwrap();
        draft.set_line_quantity(line, Quantity::from_milli(2500)).unwrap();
        let mut snapshot = StockSnapshot::new(1);
        snapshot.set_level(7, Quantity::from_milli(1250));

        let shortages = draft.check_stock(&snapshot);
        assert_eq!(
            shortages[0].to_string(),
            "Stock insuficiente para Queso. Disponible: 1.25, Solicitado: 2.5"
        );
    }

    #[test]
    fn test_stock_check_passes_when_everything_available() {
        let draft = ready(draft_with(&[(1, "Arroz", 100, 4)]));
        let mut snapshot = StockSnapshot::new(1);
        snapshot.set_level(1, Quantity::from_units(4));
        assert!(draft.check_stock(&snapshot).is_empty());
        assert_eq!(draft.validate_against(&snapshot), Ok(()));
    }

    #[test]
    fn test_snapshot_from_inventory_ignores_other_branches() {
        let rows = vec![
            InventoryItem {
                product_id: Some(1),
                branch_id: 1,
                quantity: Quantity::from_units(3),
            },
            InventoryItem {
                product_id: Some(1),
                branch_id: 2,
                quantity: Quantity::from_units(50),
            },
        ];
        let snapshot = StockSnapshot::from_inventory(1, &rows);
        assert_eq!(snapshot.available(1), Some(Quantity::from_units(3)));
        assert_eq!(snapshot.available(2), None);
    }

    #[test]
    fn test_unnamed_line_uses_fallback_label() {
        let mut draft = ready(SaleDraft::new());
        draft.add_line().unwrap();
        draft.items[0].product_id = Some(9);
        let shortages = draft.check_stock(&StockSnapshot::new(1));
        assert_eq!(shortages[0].product_name, "producto");
    }

    #[test]
    fn test_request_serializes_numbers_as_strings() {
        let mut draft = ready(draft_with(&[(1, "A", 1050, 2)]));
        draft.set_client(Some(7));
        let body = serde_json::to_value(draft.to_request().unwrap()).unwrap();

        assert_eq!(body["branch_id"], 1);
        assert_eq!(body["client_id"], 7);
        assert_eq!(body["discount"], "0.00");
        assert_eq!(body["items"][0]["quantity"], "2");
        assert_eq!(body["items"][0]["unit_price"], "10.50");
    }

    #[test]
    fn test_product_ids_are_distinct() {
        let draft = draft_with(&[(1, "A", 1, 1), (2, "B", 1, 1), (1, "A", 1, 1)]);
        assert_eq!(draft.product_ids(), vec![1, 2]);
    }
}
