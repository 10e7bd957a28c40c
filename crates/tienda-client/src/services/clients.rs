//! Customers, looked up by name or CI/NIT.

use tienda_core::{Client, ClientId, ClientInput, Paginated};

use super::{PageRequest, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const CLIENTS: &str = "/clients";

#[derive(Debug, Clone)]
pub struct ClientService {
    api: ApiClient,
}

impl ClientService {
    pub fn new(api: ApiClient) -> Self {
        ClientService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, CLIENTS)
    }

    pub async fn list(&self, page: PageRequest) -> ClientResult<Paginated<Client>> {
        self.resource().list(&page.apply(Params::new()), page).await
    }

    /// Matches by name or CI/NIT on the server.
    pub async fn search(&self, term: &str) -> ClientResult<Vec<Client>> {
        Resource::new(&self.api, "/clients/search")
            .all(&Params::new().opt("search_term", Some(term.trim())))
            .await
    }

    /// The client whose CI/NIT is exactly `ci_nit`, if any.
    pub async fn find_by_ci_nit(&self, ci_nit: &str) -> ClientResult<Option<Client>> {
        let ci_nit = ci_nit.trim();
        Ok(self
            .search(ci_nit)
            .await?
            .into_iter()
            .find(|c| c.ci_nit.trim().eq_ignore_ascii_case(ci_nit)))
    }

    pub async fn get(&self, id: ClientId) -> ClientResult<Client> {
        self.resource().get(id).await
    }

    pub async fn create(&self, input: &ClientInput) -> ClientResult<Client> {
        self.resource().create(input).await
    }

    pub async fn update(&self, id: ClientId, input: &ClientInput) -> ClientResult<Client> {
        self.resource().update(id, input).await
    }

    pub async fn delete(&self, id: ClientId) -> ClientResult<()> {
        self.resource().delete(id).await
    }
}
