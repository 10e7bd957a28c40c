//! # Validation Module
//!
//! Field validators and the form validators built on them.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI shell                                                      │
//! │  └── Raw text inputs collected into a *Form struct                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Every field checked, every error collected (FormErrors)           │
//! │  └── Success yields the typed *Input body for the API                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: REST API                                                      │
//! │  └── Authoritative checks; 422 detail surfaced verbatim                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tienda_core::validation::ProductForm;
//!
//! let form = ProductForm {
//!     barcode: "7790001".into(),
//!     name: "Arroz 1kg".into(),
//!     price: "12.50".into(),
//!     min_stock: "5".into(),
//!     category_id: Some(2),
//!     unit_type: "unidad".into(),
//!     ..Default::default()
//! };
//! let input = form.validate().unwrap();
//! assert_eq!(input.price.cents(), 1250);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{FormErrors, ValidationError};
use crate::money::Money;
use crate::types::{
    BranchInput, CategoryId, ClientInput, ProductInput, RoleId, SupplierInput, UserInput,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Trimmed value of a required text field.
///
/// ## Example
/// ```rust
/// use tienda_core::validation::validate_required;
///
/// assert_eq!(validate_required("name", "  Arroz ").unwrap(), "Arroz");
/// assert!(validate_required("name", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Required name-like field, at most 200 characters.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = validate_required(field, value)?;
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(value)
}

/// Trimmed optional text: blank becomes `None`.
pub fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Optional `http(s)://` URL with something after the scheme.
pub fn validate_image_url(value: &str) -> ValidationResult<Option<String>> {
    let Some(url) = optional_text(value) else {
        return Ok(None);
    };
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() => Ok(Some(url)),
        _ => Err(ValidationError::InvalidFormat {
            field: "image_url".to_string(),
            reason: "must be an http(s) URL".to_string(),
        }),
    }
}

/// Optional email: when present it needs a local part and a domain.
pub fn validate_email(value: &str) -> ValidationResult<Option<String>> {
    let Some(email) = optional_text(value) else {
        return Ok(None);
    };
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(Some(email)),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be an email address".to_string(),
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a decimal amount typed by the user.
pub fn parse_money(field: &str, value: &str) -> ValidationResult<Money> {
    value
        .trim()
        .parse::<Money>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a number".to_string(),
        })
}

/// Required amount strictly greater than zero.
///
/// ## Example
/// ```rust
/// use tienda_core::validation::validate_price;
///
/// assert!(validate_price("price", "10.99").is_ok());
/// assert!(validate_price("price", "0").is_err());
/// assert!(validate_price("price", "").is_err());
/// ```
pub fn validate_price(field: &str, value: &str) -> ValidationResult<Money> {
    validate_required(field, value)?;
    let amount = parse_money(field, value)?;
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(amount)
}

/// Optional amount that must not be negative when present.
pub fn validate_optional_cost(field: &str, value: &str) -> ValidationResult<Option<Money>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    let amount = parse_money(field, value)?;
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(Some(amount))
}

/// Required whole number ≥ 0.
pub fn validate_non_negative_int(field: &str, value: &str) -> ValidationResult<i64> {
    let value = validate_required(field, value)?;
    let n: i64 = value.parse().map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a whole number".to_string(),
    })?;
    if n < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(n)
}

fn require_id<T: Copy>(field: &str, value: Option<T>) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

// =============================================================================
// Form Collector
// =============================================================================

/// Runs field validators and remembers every failure.
struct Collector {
    errors: FormErrors,
}

impl Collector {
    fn new() -> Self {
        Collector {
            errors: FormErrors::new(),
        }
    }

    fn check<T>(&mut self, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, FormErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        // every check passed, so every Option is Some
        build().ok_or(self.errors)
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Raw product form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub barcode: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub cost: String,
    pub min_stock: String,
    pub category_id: Option<CategoryId>,
    pub unit_type: String,
    pub image_url: String,
    pub is_active: Option<bool>,
}

impl ProductForm {
    /// Pre-fills the form from an existing product for editing.
    pub fn from_product(product: &crate::types::Product) -> Self {
        ProductForm {
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.to_decimal_string(),
            cost: product
                .cost
                .map(|c| c.to_decimal_string())
                .unwrap_or_default(),
            min_stock: product.min_stock.to_string(),
            category_id: product.category_id,
            unit_type: product.unit_type.clone().unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
            is_active: Some(product.is_active),
        }
    }

    pub fn validate(&self) -> Result<ProductInput, FormErrors> {
        let mut c = Collector::new();
        let barcode = c.check(validate_required("barcode", &self.barcode));
        let name = c.check(validate_name("name", &self.name));
        let price = c.check(validate_price("price", &self.price));
        let cost = c.check(validate_optional_cost("cost", &self.cost));
        let min_stock = c.check(validate_non_negative_int("min_stock", &self.min_stock));
        let category_id = c.check(require_id("category_id", self.category_id));
        let unit_type = c.check(validate_required("unit_type", &self.unit_type));
        let image_url = c.check(validate_image_url(&self.image_url));

        c.finish(|| {
            Some(ProductInput {
                barcode: barcode?,
                name: name?,
                description: optional_text(&self.description),
                price: price?,
                cost: cost?,
                min_stock: min_stock?,
                category_id: category_id?,
                unit_type: unit_type?,
                image_url: image_url?,
                is_active: self.is_active.unwrap_or(true),
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientForm {
    pub ci_nit: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl ClientForm {
    pub fn validate(&self) -> Result<ClientInput, FormErrors> {
        let mut c = Collector::new();
        let ci_nit = c.check(validate_required("ci_nit", &self.ci_nit));
        let full_name = c.check(validate_name("full_name", &self.full_name));
        let email = c.check(validate_email(&self.email));

        c.finish(|| {
            Some(ClientInput {
                ci_nit: ci_nit?,
                full_name: full_name?,
                email: email?,
                phone: optional_text(&self.phone),
                address: optional_text(&self.address),
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchForm {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub opening_hours: String,
}

impl BranchForm {
    pub fn validate(&self) -> Result<BranchInput, FormErrors> {
        let mut c = Collector::new();
        let name = c.check(validate_name("name", &self.name));
        let address = c.check(validate_required("address", &self.address));

        c.finish(|| {
            Some(BranchInput {
                name: name?,
                address: address?,
                phone: optional_text(&self.phone),
                opening_hours: optional_text(&self.opening_hours),
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierForm {
    pub name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl SupplierForm {
    pub fn validate(&self) -> Result<SupplierInput, FormErrors> {
        let mut c = Collector::new();
        let name = c.check(validate_name("name", &self.name));
        let email = c.check(validate_email(&self.email));

        c.finish(|| {
            Some(SupplierInput {
                name: name?,
                contact_name: optional_text(&self.contact_name),
                phone: optional_text(&self.phone),
                email: email?,
                address: optional_text(&self.address),
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

impl UserForm {
    /// `creating` makes the password mandatory; on edit a blank password
    /// leaves the current one unchanged.
    pub fn validate(&self, creating: bool) -> Result<UserInput, FormErrors> {
        let mut c = Collector::new();
        let username = c.check(validate_name("username", &self.username));
        let password = if creating {
            c.check(validate_required("password", &self.password).map(Some))
        } else {
            Some(optional_text(&self.password))
        };
        let role_id = c.check(require_id("role_id", self.role_id));

        c.finish(|| {
            Some(UserInput {
                username: username?,
                full_name: optional_text(&self.full_name),
                password: password?,
                role_id: role_id?,
                is_active: self.is_active.unwrap_or(true),
            })
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_product_form() -> ProductForm {
        ProductForm {
            barcode: "7790001".into(),
            name: "Arroz 1kg".into(),
            price: "12.50".into(),
            cost: "9".into(),
            min_stock: "5".into(),
            category_id: Some(2),
            unit_type: "unidad".into(),
            image_url: "https://cdn.example.com/arroz.png".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_product_form() {
        let input = valid_product_form().validate().unwrap();
        assert_eq!(input.price, Money::from_cents(1250));
        assert_eq!(input.cost, Some(Money::from_cents(900)));
        assert_eq!(input.min_stock, 5);
        assert!(input.is_active);
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_empty_product_form_reports_every_field() {
        let errors = ProductForm::default().validate().unwrap_err();
        for field in [
            "barcode",
            "name",
            "price",
            "min_stock",
            "category_id",
            "unit_type",
        ] {
            assert!(errors.field(field).is_some(), "missing error for {field}");
        }
        assert!(errors.field("cost").is_none());
        assert!(errors.field("image_url").is_none());
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_product_numeric_rules() {
        let mut form = valid_product_form();
        form.price = "0".into();
        form.cost = "-1".into();
        form.min_stock = "2.5".into();
        form.image_url = "ftp://x".into();

        let errors = form.validate().unwrap_err();
        assert!(matches!(
            errors.field("price"),
            Some(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            errors.field("cost"),
            Some(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            errors.field("min_stock"),
            Some(ValidationError::InvalidFormat { .. })
        ));
        assert!(errors.field("image_url").is_some());
    }

    #[test]
    fn test_price_must_be_numeric() {
        assert!(matches!(
            validate_price("price", "doce"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_client_form() {
        let form = ClientForm {
            ci_nit: "123456".into(),
            full_name: "María Pérez".into(),
            email: " ".into(),
            ..Default::default()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.email, None);

        let errors = ClientForm {
            email: "no-at-sign".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_branch_and_supplier_forms() {
        assert!(BranchForm {
            name: "Centro".into(),
            address: "Av. 6 de Agosto".into(),
            ..Default::default()
        }
        .validate()
        .is_ok());
        assert_eq!(BranchForm::default().validate().unwrap_err().len(), 2);

        assert!(SupplierForm::default().validate().unwrap_err().field("name").is_some());
    }

    #[test]
    fn test_user_password_only_required_on_create() {
        let form = UserForm {
            username: "ana".into(),
            role_id: Some(2),
            ..Default::default()
        };
        assert!(form.validate(true).unwrap_err().field("password").is_some());

        let input = form.validate(false).unwrap();
        assert_eq!(input.password, None);
        let body = serde_json::to_value(&input).unwrap();
        assert!(body.get("password").is_none());
    }

    #[test]
    fn test_search_query_limits() {
        assert_eq!(validate_search_query("  leche ").unwrap(), "leche");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_product_form_round_trip_from_product() {
        let input = valid_product_form().validate().unwrap();
        let product: crate::types::Product = serde_json::from_value(serde_json::json!({
            "product_id": 1,
            "barcode": input.barcode,
            "name": input.name,
            "price": "12.50",
            "cost": "9.00",
            "min_stock": 5,
            "category_id": 2,
            "unit_type": "unidad",
            "image_url": "https://cdn.example.com/arroz.png"
        }))
        .unwrap();
        let again = ProductForm::from_product(&product).validate().unwrap();
        assert_eq!(again, input);
    }
}
