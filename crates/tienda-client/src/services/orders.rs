//! Purchase-order tracking after submission.

use serde::{Deserialize, Serialize};
use tracing::info;

use tienda_core::{BranchId, OrderId, OrderStatus, Paginated, PurchaseOrder, SupplierId};

use super::{Ack, PageRequest, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const ORDERS: &str = "/orders";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilters {
    #[serde(flatten)]
    pub page: PageRequest,
    pub status: Option<OrderStatus>,
    pub supplier_id: Option<SupplierId>,
    pub branch_id: Option<BranchId>,
}

impl OrderFilters {
    fn params(&self) -> Params {
        let params = Params::new()
            .opt("status", self.status.as_ref())
            .opt("supplier_id", self.supplier_id)
            .opt("branch_id", self.branch_id);
        self.page.apply(params)
    }
}

#[derive(Debug, Serialize)]
struct StatusChange<'a> {
    status: &'a OrderStatus,
    notes: &'a str,
}

#[derive(Debug, Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    pub fn new(api: ApiClient) -> Self {
        OrderService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, ORDERS)
    }

    pub async fn list(&self, filters: &OrderFilters) -> ClientResult<Paginated<PurchaseOrder>> {
        self.resource().list(&filters.params(), filters.page).await
    }

    pub async fn get(&self, id: OrderId) -> ClientResult<PurchaseOrder> {
        self.resource().get(id).await
    }

    /// `PATCH /orders/{id}/status` with `{status, notes}`.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
        notes: &str,
    ) -> ClientResult<()> {
        let path = format!("{}/status", self.resource().item_path(order_id));
        let _: Ack = self.api.patch(&path, &StatusChange { status, notes }).await?;
        info!(order_id, status = %status, "Order status updated");
        Ok(())
    }
}
