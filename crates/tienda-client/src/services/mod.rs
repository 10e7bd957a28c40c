//! # Resource Services
//!
//! One service per REST resource. Every call is stateless: nothing is
//! cached and no pagination state survives between calls.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Services                                                               │
//! │                                                                         │
//! │  auth ────────► POST /login (form)                                      │
//! │  products ────► /products, /products/search, /categories, /unit-types  │
//! │  inventory ───► /inventory/?branch_id=&product_ids=1,2,3                │
//! │  sales ───────► /sales, /sales/{id}/invoice, /sales/report/*,           │
//! │                 /sales/export/{format}, /payment-methods                │
//! │  clients ─────► /clients, /clients/search                               │
//! │  branches ────► /branches                                               │
//! │  suppliers ───► /suppliers, /suppliers/orders/                          │
//! │  orders ──────► /orders, /orders/{id}/status                            │
//! │  users ───────► /users, /roles                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! List endpoints answer either a page object or a plain array, and
//! pages sometimes arrive without `total`, `skip` or `limit`. Both shapes
//! are normalised into [`Paginated`].

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tienda_core::Paginated;

use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

pub mod auth;
pub mod branches;
pub mod clients;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod sales;
pub mod suppliers;
pub mod users;

pub use auth::{AuthService, Credentials};
pub use branches::BranchService;
pub use clients::ClientService;
pub use inventory::InventoryService;
pub use orders::{OrderFilters, OrderService};
pub use products::{ProductFilters, ProductService};
pub use sales::{DateRange, ExportFormat, ReportFilters, SaleFilters, SaleService, TopProductsQuery};
pub use suppliers::SupplierService;
pub use users::UserService;

/// Page size assumed when neither the response nor the request has one.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

// =============================================================================
// Services Bundle
// =============================================================================

/// Every resource service over one shared [`ApiClient`].
#[derive(Debug, Clone)]
pub struct Services {
    pub auth: AuthService,
    pub products: ProductService,
    pub inventory: InventoryService,
    pub sales: SaleService,
    pub clients: ClientService,
    pub branches: BranchService,
    pub suppliers: SupplierService,
    pub orders: OrderService,
    pub users: UserService,
}

impl Services {
    pub fn new(api: ApiClient) -> Self {
        Services {
            auth: AuthService::new(api.clone()),
            products: ProductService::new(api.clone()),
            inventory: InventoryService::new(api.clone()),
            sales: SaleService::new(api.clone()),
            clients: ClientService::new(api.clone()),
            branches: BranchService::new(api.clone()),
            suppliers: SupplierService::new(api.clone()),
            orders: OrderService::new(api.clone()),
            users: UserService::new(api),
        }
    }
}

// =============================================================================
// Paging
// =============================================================================

/// `skip`/`limit` of a list request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl PageRequest {
    pub fn new(skip: u64, limit: u64) -> Self {
        PageRequest {
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    pub(crate) fn apply(&self, params: Params) -> Params {
        params.opt("skip", self.skip).opt("limit", self.limit)
    }
}

/// Either list shape the API produces.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBody<T> {
    Plain(Vec<T>),
    Page {
        #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
        items: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        skip: Option<u64>,
        #[serde(default)]
        limit: Option<u64>,
    },
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> ListBody<T> {
    /// Fills what the response left out from the request.
    pub(crate) fn into_page(self, request: PageRequest) -> Paginated<T> {
        match self {
            ListBody::Plain(items) => Paginated::from_vec(items),
            ListBody::Page {
                items,
                total,
                skip,
                limit,
            } => Paginated {
                total: total.unwrap_or(items.len() as u64),
                skip: skip.or(request.skip).unwrap_or(0),
                limit: limit
                    .filter(|l| *l > 0)
                    .or(request.limit)
                    .unwrap_or(DEFAULT_PAGE_LIMIT),
                items,
            },
        }
    }

    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) | ListBody::Page { items, .. } => items,
        }
    }
}

// =============================================================================
// Generic Resource
// =============================================================================

/// The five uniform operations of a REST collection.
///
/// `base` is the collection path exactly as the API expects it for
/// listing and creation (some collections want a trailing slash); item
/// paths drop that slash before appending the id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resource<'a> {
    api: &'a ApiClient,
    base: &'static str,
}

impl<'a> Resource<'a> {
    pub(crate) fn new(api: &'a ApiClient, base: &'static str) -> Self {
        Resource { api, base }
    }

    pub(crate) fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), id)
    }

    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        params: &Params,
        page: PageRequest,
    ) -> ClientResult<Paginated<T>> {
        let body: ListBody<T> = self.api.get(self.base, params).await?;
        let page = body.into_page(page);
        debug!(path = %self.base, count = page.items.len(), total = page.total, "Listed");
        Ok(page)
    }

    pub(crate) async fn all<T: DeserializeOwned>(&self, params: &Params) -> ClientResult<Vec<T>> {
        let body: ListBody<T> = self.api.get(self.base, params).await?;
        Ok(body.into_items())
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, id: i64) -> ClientResult<T> {
        self.api.get(&self.item_path(id), &Params::new()).await
    }

    pub(crate) async fn create<B, T>(&self, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let created = self.api.post(self.base, body).await?;
        info!(path = %self.base, "Created");
        Ok(created)
    }

    pub(crate) async fn update<B, T>(&self, id: i64, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let updated = self.api.put(&self.item_path(id), body).await?;
        info!(path = %self.base, id, "Updated");
        Ok(updated)
    }

    pub(crate) async fn delete(&self, id: i64) -> ClientResult<()> {
        self.api.delete(&self.item_path(id)).await?;
        info!(path = %self.base, id, "Deleted");
        Ok(())
    }
}

/// Decodes action responses whose body nobody reads.
pub(crate) type Ack = IgnoredAny;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i64,
    }

    fn decode(json: &str) -> ListBody<Row> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_plain_array_becomes_single_page() {
        let page = decode(r#"[{"id":1},{"id":2}]"#).into_page(PageRequest::default());
        assert_eq!(page.total, 2);
        assert_eq!(page.skip, 0);
        assert_eq!(page.items, vec![Row { id: 1 }, Row { id: 2 }]);
    }

    #[test]
    fn test_partial_page_falls_back_to_request() {
        let page = decode(r#"{"items":[{"id":7}]}"#).into_page(PageRequest::new(20, 25));
        assert_eq!(page.total, 1);
        assert_eq!(page.skip, 20);
        assert_eq!(page.limit, 25);

        let page = decode(r#"{"total":40}"#).into_page(PageRequest::default());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 40);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_product_page_with_null_fields() {
        let body: ListBody<tienda_core::Product> = serde_json::from_str(
            r#"{"items":[
                {"product_id":1,"name":"x","barcode":null,"price":"5.00"},
                {"product_id":2,"name":"y","price":null,"inventory_items":null}
            ],"total":null,"skip":null,"limit":null}"#,
        )
        .unwrap();
        let page = body.into_page(PageRequest::new(0, 10));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].barcode, "");
        assert!(page.items[1].price.is_zero());
        assert_eq!((page.total, page.limit), (2, 10));

        let empty = decode(r#"{"items":null,"total":0}"#).into_page(PageRequest::default());
        assert!(empty.items.is_empty());
    }

    #[test]
    fn test_full_page_is_kept() {
        let page = decode(r#"{"items":[{"id":3}],"total":31,"skip":30,"limit":30}"#)
            .into_page(PageRequest::new(0, 10));
        assert_eq!((page.total, page.skip, page.limit), (31, 30, 30));
    }

    #[test]
    fn test_page_request_params() {
        let params = PageRequest::new(0, 50).apply(Params::new());
        assert_eq!(params.get("skip"), Some("0"));
        assert_eq!(params.get("limit"), Some("50"));
        assert!(PageRequest::default().apply(Params::new()).is_empty());
    }
}
