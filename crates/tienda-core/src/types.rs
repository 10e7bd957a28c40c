//! # Domain Types
//!
//! Entities as transferred by the remote REST API.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │ PurchaseOrder   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  sale_id        │   │  order_id       │       │
//! │  │  barcode        │   │  invoice_number │   │  supplier_id    │       │
//! │  │  price / cost   │   │  status         │   │  status         │       │
//! │  │  inventory[]    │   │  details[]      │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Client       │   │     Branch      │   │  Supplier/User  │       │
//! │  │  client_id      │   │  branch_id|id   │   │  supplier_id    │       │
//! │  │  ci_nit         │   │  opening_hours  │   │  user_id, role  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! The API owns every entity; the console only holds read snapshots.
//! Decoding is tolerant: revisions of the backend disagree on a few key
//! names (`branch_id` vs `id`, `cost` vs `cost_price`) and omit fields on
//! list endpoints or send them as `null`, so most fields default instead
//! of failing.
//!
//! ## Input types
//! `*Input` structs are the bodies sent on create/update. They are
//! produced by the validators in [`crate::validation`], never by hand in
//! UI code.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Identifiers
// =============================================================================

pub type ProductId = i64;
pub type BranchId = i64;
pub type ClientId = i64;
pub type SupplierId = i64;
pub type UserId = i64;
pub type RoleId = i64;
pub type CategoryId = i64;
pub type UnitTypeId = i64;
pub type PaymentMethodId = i64;
pub type SaleId = i64;
pub type OrderId = i64;

/// Status label the API omits on sales that were completed normally.
pub const DEFAULT_SALE_STATUS: &str = "COMPLETADA";

// =============================================================================
// Paging
// =============================================================================

/// One page of a paginated listing.
///
/// Not every endpoint paginates; services normalise plain arrays into a
/// single page whose `total` is the array length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

impl<T> Paginated<T> {
    /// Wraps an unpaginated response.
    pub fn from_vec(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Paginated {
            items,
            total,
            skip: 0,
            limit: total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Product & Inventory
// =============================================================================

/// Stock of one product at one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,

    pub branch_id: BranchId,

    #[serde(default)]
    pub quantity: Quantity,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "id")]
    pub product_id: ProductId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub barcode: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Sale price. Missing or null prices decode as zero.
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Money,

    /// Purchase cost used to pre-fill purchase-order lines.
    #[serde(default, alias = "cost_price")]
    pub cost: Option<Money>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub min_stock: i64,

    #[serde(default)]
    pub category_id: Option<CategoryId>,

    #[serde(default)]
    pub unit_type: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Per-branch stock; absent or null on some list endpoints.
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory_items: Vec<InventoryItem>,
}

impl Product {
    /// Cost used for a new purchase-order line, zero when unknown.
    pub fn unit_cost(&self) -> Money {
        self.cost.unwrap_or_default()
    }

    /// Stock at `branch`, or `None` when the product has no entry there.
    pub fn stock_at(&self, branch: BranchId) -> Option<Quantity> {
        self.inventory_items
            .iter()
            .find(|item| item.branch_id == branch)
            .map(|item| item.quantity)
    }

    /// Total stock over all branches.
    pub fn total_stock(&self) -> Quantity {
        self.inventory_items.iter().map(|item| item.quantity).sum()
    }

    /// True when the stock at `branch` is at or below `min_stock`.
    pub fn is_low_stock_at(&self, branch: BranchId) -> bool {
        let available = self.stock_at(branch).unwrap_or_default();
        available <= Quantity::from_units(self.min_stock)
    }
}

/// Body of `POST /products` and `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub barcode: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub price: Money,
    #[ts(type = "string | null")]
    pub cost: Option<Money>,
    pub min_stock: i64,
    pub category_id: CategoryId,
    pub unit_type: String,
    pub image_url: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(alias = "id")]
    pub category_id: CategoryId,
    #[serde(alias = "category_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    #[serde(alias = "id")]
    pub unit_type_id: UnitTypeId,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

// =============================================================================
// Clients & Branches
// =============================================================================

/// A customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    #[serde(alias = "id")]
    pub client_id: ClientId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ci_nit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientInput {
    pub ci_nit: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A store location. Older endpoints return the key as `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(alias = "id")]
    pub branch_id: BranchId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchInput {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub opening_hours: Option<String>,
}

// =============================================================================
// Suppliers & Purchase Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(alias = "id")]
    pub supplier_id: SupplierId,
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Lifecycle of a supplier order as reported by the API.
///
/// Unknown values are kept verbatim so a newer backend does not break
/// listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Approved,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => OrderStatus::Pending,
            "APPROVED" => OrderStatus::Approved,
            _ => OrderStatus::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: Quantity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_cost: Money,
}

/// A purchase order confirmed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    #[serde(alias = "id")]
    pub order_id: OrderId,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    #[serde(default = "default_order_status")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "lenient_date")]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default, alias = "details", deserialize_with = "null_as_default")]
    pub items: Vec<PurchaseOrderItem>,
}

// =============================================================================
// Users & Roles
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(alias = "id")]
    pub role_id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "id")]
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    /// Nested role object some endpoints embed instead of `role_id`.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl User {
    /// Role id from either the flat field or the embedded role.
    pub fn effective_role_id(&self) -> Option<RoleId> {
        self.role_id.or_else(|| self.role.as_ref().map(|r| r.role_id))
    }
}

/// Body of `POST /users` and `PUT /users/{id}`.
///
/// `password` is omitted on update when the user left it blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserInput {
    pub username: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role_id: RoleId,
    pub is_active: bool,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(alias = "id")]
    pub payment_method_id: PaymentMethodId,
    pub name: String,
}

/// Minimal embedded references inside a sale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaleClientRef {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub ci_nit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// One line of a confirmed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product: Option<NamedRef>,
    pub quantity: Quantity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_price: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount: Money,
    #[serde(default)]
    pub total_line: Option<Money>,
}

impl SaleDetail {
    /// Server line total, or `unit_price × quantity − discount`.
    pub fn line_total(&self) -> Money {
        self.total_line
            .unwrap_or_else(|| self.unit_price * self.quantity - self.discount)
    }
}

/// A sale confirmed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(alias = "id")]
    pub sale_id: SaleId,
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Either a plain string or `{ "label": ... }` depending on endpoint.
    #[serde(default = "default_sale_status", deserialize_with = "label_or_string")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtotal: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Money,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub sale_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub client: Option<SaleClientRef>,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    #[serde(default)]
    pub branch: Option<NamedRef>,
    #[serde(default, deserialize_with = "optional_label_or_string")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: Vec<SaleDetail>,
}

impl Sale {
    /// Client name for listings.
    pub fn client_name(&self) -> &str {
        self.client
            .as_ref()
            .and_then(|c| c.full_name.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("Cliente no especificado")
    }

    pub fn client_ci_nit(&self) -> &str {
        self.client
            .as_ref()
            .and_then(|c| c.ci_nit.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A")
    }

    pub fn branch_name(&self) -> &str {
        self.branch
            .as_ref()
            .and_then(|b| b.name.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("Sucursal no especificada")
    }

    pub fn is_completed(&self) -> bool {
        self.status == DEFAULT_SALE_STATUS
    }
}

/// Row of the sales listing with every display default applied.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SaleSummaryRow {
    pub sale_id: SaleId,
    pub invoice_number: String,
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub client_name: String,
    pub client_ci_nit: String,
    pub branch_name: String,
    pub status: String,
    #[ts(type = "string")]
    pub total: Money,
}

impl From<&Sale> for SaleSummaryRow {
    fn from(sale: &Sale) -> Self {
        SaleSummaryRow {
            sale_id: sale.sale_id,
            invoice_number: sale.invoice_number.clone().unwrap_or_default(),
            sale_date: sale.sale_date,
            client_name: sale.client_name().to_string(),
            client_ci_nit: sale.client_ci_nit().to_string(),
            branch_name: sale.branch_name().to_string(),
            status: sale.status.clone(),
            total: sale.total,
        }
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

fn default_true() -> bool {
    true
}

/// `null` decodes like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_sale_status() -> String {
    DEFAULT_SALE_STATUS.to_string()
}

fn default_order_status() -> OrderStatus {
    OrderStatus::Pending
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelOrString {
    Plain(String),
    Labeled {
        #[serde(alias = "name")]
        label: Option<String>,
    },
}

impl LabelOrString {
    fn into_option(self) -> Option<String> {
        match self {
            LabelOrString::Plain(s) => Some(s),
            LabelOrString::Labeled { label } => label,
        }
        .filter(|s| !s.is_empty())
    }
}

fn label_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<LabelOrString>::deserialize(deserializer)?;
    Ok(value
        .and_then(LabelOrString::into_option)
        .unwrap_or_else(default_sale_status))
}

fn optional_label_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<LabelOrString>::deserialize(deserializer)?;
    Ok(value.and_then(LabelOrString::into_option))
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (assumed UTC) and a
/// bare date. Unparseable values decode as `None`.
fn lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_datetime))
}

fn lenient_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|s| parse_datetime(s).map(|dt| dt.date_naive())))
}

/// Parses the date formats the API is known to emit.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Unit Tests
// =============================================================================
