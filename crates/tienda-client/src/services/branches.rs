//! Store locations.

use tienda_core::{Branch, BranchId, BranchInput};

use super::Resource;
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

/// The collection answers on the trailing-slash form.
const BRANCHES: &str = "/branches/";

#[derive(Debug, Clone)]
pub struct BranchService {
    api: ApiClient,
}

impl BranchService {
    pub fn new(api: ApiClient) -> Self {
        BranchService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, BRANCHES)
    }

    pub async fn list(&self) -> ClientResult<Vec<Branch>> {
        self.resource().all(&Params::new()).await
    }

    pub async fn get(&self, id: BranchId) -> ClientResult<Branch> {
        self.resource().get(id).await
    }

    pub async fn create(&self, input: &BranchInput) -> ClientResult<Branch> {
        self.resource().create(input).await
    }

    pub async fn update(&self, id: BranchId, input: &BranchInput) -> ClientResult<Branch> {
        self.resource().update(id, input).await
    }

    pub async fn delete(&self, id: BranchId) -> ClientResult<()> {
        self.resource().delete(id).await
    }
}
