//! # Error Types
//!
//! Domain-specific error types for tienda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tienda-core errors (this file)                                        │
//! │  ├── CoreError        - Misuse of a draft (bad line index, too big)    │
//! │  ├── ValidationError  - One field failed a rule                        │
//! │  ├── FormErrors       - Every field error of one form                  │
//! │  └── DraftRejection   - Business rule stopped a submission             │
//! │                                                                         │
//! │  tienda-client errors (separate crate)                                 │
//! │  └── ClientError      - Transport / HTTP status / storage failures     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → UI banner           │
//! │        DraftRejection  ─────────────► ClientError → UI banner          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Language of messages
//! `DraftRejection` messages go straight to the store staff and are in
//! Spanish, like the rest of the console. Field validation messages keep
//! the field name first so a form can attach them to the input.

use serde::Serialize;
use thiserror::Error;

use crate::sale_draft::StockShortage;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A draft operation referenced a line that does not exist.
    #[error("Line {index} does not exist")]
    LineNotFound { index: usize },

    /// Draft has reached the maximum number of lines.
    #[error("Draft cannot have more than {max} lines")]
    DraftTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything is sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., not a number, not a URL).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Every field error found while validating one form.
///
/// Forms show all problems at once, so validators collect instead of
/// returning on the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("{}", join_lines(.0))]
pub struct FormErrors(pub Vec<ValidationError>);

impl FormErrors {
    pub fn new() -> Self {
        FormErrors(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First error attached to `field`, if any.
    pub fn field(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field() == field)
    }

    /// `Ok(value)` when no error was collected.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

// =============================================================================
// Draft Rejection
// =============================================================================

/// A business rule evaluated on the client stopped a submission.
///
/// ## User Workflow
/// ```text
/// Click "Guardar venta"
///      │
///      ▼
/// Preconditions ── branch? items? payment method? lines valid?
///      │                 │
///      │                 └── first failing check ──► DraftRejection
///      ▼
/// Stock check ── every short line collected ──► InsufficientStock(vec)
///      │
///      ▼
/// POST /sales
/// ```
///
/// Rejections never reach the network and leave the draft untouched so
/// the user can correct it and try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftRejection {
    #[error("Debes seleccionar una sucursal")]
    MissingBranch,

    #[error("Debes agregar al menos un producto")]
    NoItems,

    #[error("Debes seleccionar un método de pago")]
    MissingPaymentMethod,

    #[error("Debes seleccionar un proveedor")]
    MissingSupplier,

    /// Purchase orders report branch and items together.
    #[error("Se requiere sucursal y al menos un producto")]
    IncompleteOrder,

    /// Line numbers are 1-based in messages, matching the table rows.
    #[error("La línea {} no tiene un producto seleccionado", .line + 1)]
    LineWithoutProduct { line: usize },

    #[error("La cantidad de la línea {} debe ser mayor a cero", .line + 1)]
    InvalidQuantity { line: usize },

    #[error("El descuento de la línea {} no puede ser negativo", .line + 1)]
    InvalidLineDiscount { line: usize },

    #[error("El descuento no puede ser negativo")]
    InvalidDiscount,

    /// Purchase-order lines need a positive quantity and cost.
    #[error("Cantidades y costos deben ser mayores a cero")]
    InvalidOrderLines,

    /// One message per short line, newline-separated.
    #[error("{}", join_lines(.0))]
    InsufficientStock(Vec<StockShortage>),
}

impl DraftRejection {
    /// Stable code for programmatic handling on the UI side.
    pub fn code(&self) -> &'static str {
        match self {
            DraftRejection::MissingBranch => "MISSING_BRANCH",
            DraftRejection::NoItems => "NO_ITEMS",
            DraftRejection::MissingPaymentMethod => "MISSING_PAYMENT_METHOD",
            DraftRejection::MissingSupplier => "MISSING_SUPPLIER",
            DraftRejection::IncompleteOrder => "INCOMPLETE_ORDER",
            DraftRejection::LineWithoutProduct { .. } => "LINE_WITHOUT_PRODUCT",
            DraftRejection::InvalidQuantity { .. } => "INVALID_QUANTITY",
            DraftRejection::InvalidLineDiscount { .. } | DraftRejection::InvalidDiscount => {
                "INVALID_DISCOUNT"
            }
            DraftRejection::InvalidOrderLines => "INVALID_ORDER_LINES",
            DraftRejection::InsufficientStock(_) => "INSUFFICIENT_STOCK",
        }
    }

    /// Shortages carried by a stock rejection; empty for every other kind.
    pub fn shortages(&self) -> &[StockShortage] {
        match self {
            DraftRejection::InsufficientStock(shortages) => shortages,
            _ => &[],
        }
    }
}

fn join_lines<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
