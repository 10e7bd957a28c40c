//! Catalog: products, categories, unit types and per-product stock.

use serde::{Deserialize, Serialize};

use tienda_core::{
    Branch, Category, CategoryId, InventoryItem, Paginated, Product, ProductId, ProductInput,
    UnitType,
};

use super::{InventoryService, PageRequest, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const PRODUCTS: &str = "/products";

/// Filters of the products table. Empty values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilters {
    #[serde(flatten)]
    pub page: PageRequest,
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub branch_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl ProductFilters {
    fn params(&self) -> Params {
        let params = Params::new()
            .opt("search", self.search.as_deref())
            .opt("category_id", self.category_id)
            .opt("branch_id", self.branch_id)
            .opt("is_active", self.is_active);
        self.page.apply(params)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MinStockBody {
    Wrapped { min_stock: i64 },
    Bare(i64),
}

#[derive(Debug, Clone)]
pub struct ProductService {
    api: ApiClient,
}

impl ProductService {
    pub fn new(api: ApiClient) -> Self {
        ProductService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, PRODUCTS)
    }

    pub async fn list(&self, filters: &ProductFilters) -> ClientResult<Paginated<Product>> {
        self.resource().list(&filters.params(), filters.page).await
    }

    /// Name search on `/products/search`.
    pub async fn search(&self, name: &str, page: PageRequest) -> ClientResult<Paginated<Product>> {
        let params = page.apply(Params::new().opt("name", Some(name)));
        let body: super::ListBody<Product> =
            self.api.get("/products/search", &params).await?;
        Ok(body.into_page(page))
    }

    pub async fn get(&self, id: ProductId) -> ClientResult<Product> {
        self.resource().get(id).await
    }

    pub async fn create(&self, input: &ProductInput) -> ClientResult<Product> {
        self.resource().create(input).await
    }

    pub async fn update(&self, id: ProductId, input: &ProductInput) -> ClientResult<Product> {
        self.resource().update(id, input).await
    }

    pub async fn delete(&self, id: ProductId) -> ClientResult<()> {
        self.resource().delete(id).await
    }

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        Resource::new(&self.api, "/categories").all(&Params::new()).await
    }

    pub async fn unit_types(&self) -> ClientResult<Vec<UnitType>> {
        Resource::new(&self.api, "/unit-types").all(&Params::new()).await
    }

    /// Branches that hold inventory.
    pub async fn inventory_branches(&self) -> ClientResult<Vec<Branch>> {
        Resource::new(&self.api, "/inventory/branches")
            .all(&Params::new())
            .await
    }

    /// Accepts `{"min_stock": n}` or a bare number.
    pub async fn min_stock(&self, id: ProductId) -> ClientResult<i64> {
        let path = format!("{}/{}/min_stock", PRODUCTS, id);
        let body: MinStockBody = self.api.get(&path, &Params::new()).await?;
        Ok(match body {
            MinStockBody::Wrapped { min_stock } | MinStockBody::Bare(min_stock) => min_stock,
        })
    }

    /// Stock of one product at every branch.
    pub async fn inventory(&self, id: ProductId) -> ClientResult<Vec<InventoryItem>> {
        InventoryService::new(self.api.clone()).product_stock(id).await
    }
}
