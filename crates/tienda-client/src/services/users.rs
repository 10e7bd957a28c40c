//! Console users and their roles.

use tienda_core::{Paginated, Role, User, UserId, UserInput};

use super::{PageRequest, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const USERS: &str = "/users";

#[derive(Debug, Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        UserService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, USERS)
    }

    pub async fn list(&self, page: PageRequest) -> ClientResult<Paginated<User>> {
        self.resource().list(&page.apply(Params::new()), page).await
    }

    pub async fn get(&self, id: UserId) -> ClientResult<User> {
        self.resource().get(id).await
    }

    /// `input.password` must be set; see `UserForm::validate(true)`.
    pub async fn create(&self, input: &UserInput) -> ClientResult<User> {
        self.resource().create(input).await
    }

    /// A `None` password leaves the current one unchanged.
    pub async fn update(&self, id: UserId, input: &UserInput) -> ClientResult<User> {
        self.resource().update(id, input).await
    }

    pub async fn delete(&self, id: UserId) -> ClientResult<()> {
        self.resource().delete(id).await
    }

    pub async fn roles(&self) -> ClientResult<Vec<Role>> {
        Resource::new(&self.api, "/roles").all(&Params::new()).await
    }
}
