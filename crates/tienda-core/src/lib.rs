//! # tienda-core: Pure Business Logic for Tienda Admin
//!
//! This crate holds every rule of the back-office console that can be
//! expressed without touching the network: money math, the permission
//! model, and the sale / purchase-order drafts a user composes before
//! anything is sent to the REST API.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tienda Admin Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Presentation (any UI shell)                  │   │
//! │  │    Products ──► New Sale ──► Purchase Order ──► Dashboard       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tienda-client                                │   │
//! │  │    ApiClient, SessionContext, services, composers, search       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tienda-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ sale_draft │  │  session  │  │   │
//! │  │   │  Product  │  │   Money   │  │ SaleDraft  │  │  policy   │  │   │
//! │  │   │   Sale    │  │ Quantity  │  │ PO draft   │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK-DRIVEN BEHAVIOR               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities as transferred by the REST API
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`quantity`] - Stock quantities in thousandths (weighed goods)
//! - [`session`] - Authenticated identity and the permission predicate
//! - [`policy`] - Per-page capability sets driving action visibility
//! - [`sale_draft`] - Sale composition, totals and stock-shortage checks
//! - [`purchase_order`] - Supplier order composition
//! - [`validation`] - Field and form validation
//! - [`format`] - Display helpers
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tienda_core::money::Money;
//! use tienda_core::quantity::Quantity;
//!
//! let unit_price = Money::from_cents(1000);
//! let line_total = unit_price * Quantity::from_units(2);
//! assert_eq!(line_total.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod format;
pub mod money;
pub mod policy;
pub mod purchase_order;
pub mod quantity;
pub mod sale_draft;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, DraftRejection, FormErrors, ValidationError};
pub use money::Money;
pub use policy::{can_see_action, menu_pages, Action, Page, PagePolicy, Requirement};
pub use purchase_order::{NewOrderItem, NewPurchaseOrder, OrderLine, PurchaseOrderDraft};
pub use quantity::Quantity;
pub use sale_draft::{
    DraftTotals, NewSale, NewSaleItem, SaleDraft, SaleLine, StockShortage, StockSnapshot,
    SubmissionPhase,
};
pub use session::{has_permission, PermissionMap, Session, TokenClaims};
pub use types::*;
pub use validation::ValidationResult;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Role identifier that bypasses every permission check.
pub const ADMIN_ROLE_ID: RoleId = 1;

/// Role given to a session whose token carries no `role_id` claim.
pub const UNASSIGNED_ROLE_ID: RoleId = 0;

/// Maximum lines allowed in a single sale or purchase-order draft.
///
/// ## Business Reason
/// Keeps a runaway form from producing a request the API will reject
/// anyway. Counter sales in this business rarely exceed a few dozen lines.
pub const MAX_DRAFT_LINES: usize = 100;

/// Fallback label for a line whose product name is unknown.
pub const UNKNOWN_PRODUCT_LABEL: &str = "producto";
