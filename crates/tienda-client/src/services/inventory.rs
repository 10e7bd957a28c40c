//! Stock lookups for one branch.
//!
//! The pre-submit check asks for every product of the draft in one
//! batched request. Products the batch does not answer for (a paginated
//! or filtered reply, rows without `product_id`) are then looked up per
//! product through `/products/{id}/inventory` before the snapshot is
//! built.

use std::collections::HashSet;

use futures_util::future::try_join_all;
use tracing::{debug, warn};

use tienda_core::{BranchId, InventoryItem, ProductId, StockSnapshot};

use super::ListBody;
use crate::api::{ApiClient, Params};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct InventoryService {
    api: ApiClient,
}

impl InventoryService {
    pub fn new(api: ApiClient) -> Self {
        InventoryService { api }
    }

    /// `GET /inventory/?branch_id=B&product_ids=1,2,3&limit=3`, one request
    /// for every product.
    ///
    /// With a single product, rows missing `product_id` are attributed to it.
    pub async fn stock(
        &self,
        branch_id: BranchId,
        product_ids: &[ProductId],
    ) -> ClientResult<Vec<InventoryItem>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = Params::new()
            .with("branch_id", branch_id)
            .with("product_ids", join_ids(product_ids))
            .with("limit", product_ids.len());
        let body: ListBody<InventoryItem> = self.api.get("/inventory/", &params).await?;
        let mut rows = body.into_items();
        if let [only] = product_ids {
            for row in &mut rows {
                row.product_id.get_or_insert(*only);
            }
        }
        debug!(branch_id, products = product_ids.len(), rows = rows.len(), "Fetched stock");
        Ok(rows)
    }

    /// Stock of one product at every branch, `GET /products/{id}/inventory`.
    pub async fn product_stock(&self, product_id: ProductId) -> ClientResult<Vec<InventoryItem>> {
        let path = format!("/products/{}/inventory", product_id);
        let body: ListBody<InventoryItem> = self.api.get(&path, &Params::new()).await?;
        Ok(body
            .into_items()
            .into_iter()
            .map(|mut row| {
                row.product_id.get_or_insert(product_id);
                row
            })
            .collect())
    }

    /// Stock levels at `branch_id`; products without a row anywhere are
    /// absent.
    pub async fn snapshot(
        &self,
        branch_id: BranchId,
        product_ids: &[ProductId],
    ) -> ClientResult<StockSnapshot> {
        let mut rows = self.stock(branch_id, product_ids).await?;

        let missing = unanswered(branch_id, product_ids, &rows);
        if !missing.is_empty() {
            warn!(
                branch_id,
                missing = missing.len(),
                "Batched stock reply incomplete, looking up remaining products"
            );
            let lookups = missing.iter().map(|id| async move {
                match self.product_stock(*id).await {
                    Err(ClientError::NotFound(_)) => Ok(Vec::new()),
                    other => other,
                }
            });
            for per_product in try_join_all(lookups).await? {
                rows.extend(per_product);
            }
        }

        Ok(StockSnapshot::from_inventory(branch_id, &rows))
    }
}

/// Requested products with no row at `branch_id` in `rows`, in request
/// order and without duplicates.
fn unanswered(
    branch_id: BranchId,
    product_ids: &[ProductId],
    rows: &[InventoryItem],
) -> Vec<ProductId> {
    let answered: HashSet<ProductId> = rows
        .iter()
        .filter(|row| row.branch_id == branch_id)
        .filter_map(|row| row.product_id)
        .collect();
    let mut seen = HashSet::new();
    product_ids
        .iter()
        .copied()
        .filter(|id| !answered.contains(id) && seen.insert(*id))
        .collect()
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
