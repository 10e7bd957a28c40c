//! Suppliers and the purchase orders placed with them.

use tracing::info;

use tienda_core::{
    NewPurchaseOrder, OrderId, Product, PurchaseOrder, Supplier, SupplierId, SupplierInput,
};

use super::{Ack, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const SUPPLIERS: &str = "/suppliers";
const PURCHASE_ORDERS: &str = "/suppliers/orders/";

#[derive(Debug, Clone)]
pub struct SupplierService {
    api: ApiClient,
}

impl SupplierService {
    pub fn new(api: ApiClient) -> Self {
        SupplierService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, SUPPLIERS)
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn list(&self) -> ClientResult<Vec<Supplier>> {
        self.resource().all(&Params::new()).await
    }

    pub async fn get(&self, id: SupplierId) -> ClientResult<Supplier> {
        self.resource().get(id).await
    }

    pub async fn create(&self, input: &SupplierInput) -> ClientResult<Supplier> {
        self.resource().create(input).await
    }

    pub async fn update(&self, id: SupplierId, input: &SupplierInput) -> ClientResult<Supplier> {
        self.resource().update(id, input).await
    }

    pub async fn delete(&self, id: SupplierId) -> ClientResult<()> {
        self.resource().delete(id).await
    }

    /// Products this supplier provides.
    pub async fn products(&self, supplier_id: SupplierId) -> ClientResult<Vec<Product>> {
        let path = format!("{}/{}/products", SUPPLIERS, supplier_id);
        let body: super::ListBody<Product> = self.api.get(&path, &Params::new()).await?;
        Ok(body.into_items())
    }

    /// Submits the order as intent; the server decides its initial status.
    pub async fn create_purchase_order(
        &self,
        order: &NewPurchaseOrder,
    ) -> ClientResult<PurchaseOrder> {
        let created: PurchaseOrder = self.api.post(PURCHASE_ORDERS, order).await?;
        info!(
            order_id = created.order_id,
            supplier_id = order.supplier_id,
            lines = order.items.len(),
            "Purchase order created"
        );
        Ok(created)
    }

    pub async fn approve_purchase_order(&self, order_id: OrderId) -> ClientResult<()> {
        let path = format!("{}{}/approve", PURCHASE_ORDERS, order_id);
        let _: Ack = self.api.post_empty(&path).await?;
        info!(order_id, "Purchase order approved");
        Ok(())
    }
}
