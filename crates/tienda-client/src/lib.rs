//! # tienda-client: REST Gateway, Session and Workflows for Tienda Admin
//!
//! Everything in the back-office console that touches the network, the
//! clock or durable storage. A UI shell builds one [`AdminConsole`] and
//! drives pages through it; the business rules themselves live in
//! `tienda-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AdminConsole                                   │
//! │                                                                         │
//! │  ConsoleConfig ── defaults → console.toml → TIENDA_* env → validate()  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌────────────────┐   token    ┌──────────────────────────────────┐    │
//! │  │ SessionContext │◄──────────►│ ApiClient                        │    │
//! │  │                │            │                                  │    │
//! │  │ durable store  │  401 on a  │ Authorization: Bearer <token>    │    │
//! │  │ watch<AuthState│◄─non-login─│ {detail|message} → user message  │    │
//! │  │  > events      │   path     │ no retries                       │    │
//! │  └────────────────┘            └───────────────┬──────────────────┘    │
//! │                                                │                        │
//! │                        ┌───────────────────────▼──────────────────┐    │
//! │                        │ Services (one per REST resource)         │    │
//! │                        └───────┬───────────────────────┬──────────┘    │
//! │                                │                       │                │
//! │              ┌─────────────────▼──────┐   ┌────────────▼───────────┐   │
//! │              │ SaleComposer           │   │ DebouncedSearch        │   │
//! │              │ PurchaseOrderComposer  │   │ clients / products     │   │
//! │              │ single-flight submit   │   │ sequence-tagged        │   │
//! │              └────────────────────────┘   └────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Layered configuration (TOML file + environment)
//! - [`error`] - Client error taxonomy and user-facing messages
//! - [`session`] - Session context, durable store and auth events
//! - [`api`] - HTTP gateway with token injection and the 401 policy
//! - [`services`] - Stateless per-resource services
//! - [`workflow`] - Sale and purchase-order composers
//! - [`search`] - Debounced search-as-you-type
//! - [`telemetry`] - `tracing` subscriber setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tienda_client::{AdminConsole, ConsoleConfig, Credentials};
//!
//! # async fn run() -> tienda_client::ClientResult<()> {
//! tienda_client::telemetry::init_tracing();
//!
//! let console = AdminConsole::new(ConsoleConfig::load_or_default(None))?;
//! if !console.check_auth() {
//!     console
//!         .services()
//!         .auth
//!         .login(&Credentials::new("ana", "secreto"))
//!         .await?;
//! }
//!
//! let products = console.services().products.list(&Default::default()).await?;
//! println!("{} productos", products.total);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use api::{ApiClient, Params};
pub use config::ConsoleConfig;
pub use error::{ClientError, ClientResult};
pub use search::{DebouncedSearch, FnSource, SearchSource, SearchState};
pub use services::{Credentials, PageRequest, Services};
pub use session::{AuthState, FileSessionStore, MemorySessionStore, SessionContext, SessionStore};
pub use workflow::{OrderSubmitted, PurchaseOrderComposer, SaleComposer, SaleSubmitted};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use tienda_core::{Session, SupplierId};

use services::{ClientService, ProductService};

// =============================================================================
// Admin Console
// =============================================================================

/// One configured console: session, gateway and services wired together.
///
/// Cheap to clone; clones share the session and the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct AdminConsole {
    config: Arc<ConsoleConfig>,
    session: Arc<SessionContext>,
    api: ApiClient,
    services: Services,
}

impl AdminConsole {
    /// Validates `config` and builds the console around the durable
    /// session file it names.
    ///
    /// Falls back to an in-memory session when no data directory can be
    /// resolved; the user then has to log in on every start.
    pub fn new(config: ConsoleConfig) -> ClientResult<Self> {
        config.validate()?;

        let session = match config.session_path() {
            Some(path) => {
                info!(path = %path.display(), "Using durable session file");
                SessionContext::with_file(path)
            }
            None => {
                warn!("No data directory available; session will not survive restarts");
                SessionContext::in_memory()
            }
        };

        Self::with_session(config, Arc::new(session))
    }

    /// Builds the console around an existing session context.
    pub fn with_session(config: ConsoleConfig, session: Arc<SessionContext>) -> ClientResult<Self> {
        let api = ApiClient::new(&config, Arc::clone(&session))?;
        let services = Services::new(api.clone());

        Ok(AdminConsole {
            config: Arc::new(config),
            session,
            api,
            services,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    // =========================================================================
    // Session Shortcuts
    // =========================================================================

    /// Restores the stored session; see [`SessionContext::check_auth`].
    pub fn check_auth(&self) -> bool {
        self.session.check_auth()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<Session> {
        self.session.current()
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.session.has_permission(name)
    }

    /// Auth transitions, including forced logouts after a 401.
    pub fn auth_events(&self) -> watch::Receiver<AuthState> {
        self.session.subscribe()
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    // =========================================================================
    // Workflow Factories
    // =========================================================================

    /// A fresh, empty sale draft for the "new sale" page.
    pub fn new_sale(&self) -> SaleComposer {
        SaleComposer::new(
            self.services.sales.clone(),
            self.services.inventory.clone(),
            &self.config.workflow,
        )
    }

    /// A fresh purchase order, optionally pre-bound to a supplier.
    pub fn new_purchase_order(&self, supplier_id: Option<SupplierId>) -> PurchaseOrderComposer {
        PurchaseOrderComposer::new(
            self.services.suppliers.clone(),
            supplier_id,
            &self.config.workflow,
        )
    }

    pub fn client_search(&self) -> DebouncedSearch<ClientService> {
        DebouncedSearch::with_settings(self.services.clients.clone(), &self.config.workflow)
    }

    pub fn product_search(&self) -> DebouncedSearch<ProductService> {
        DebouncedSearch::with_settings(self.services.products.clone(), &self.config.workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ConsoleConfig {
        let mut config = ConsoleConfig::with_base_url("http://127.0.0.1:9/api/v1/");
        config.session.storage_path = Some(dir.path().join("session.json"));
        config
    }

    #[test]
    fn test_console_starts_logged_out() {
        let dir = TempDir::new().unwrap();
        let console = AdminConsole::new(config_in(&dir)).unwrap();

        assert!(!console.check_auth());
        assert!(!console.is_authenticated());
        assert!(console.current_user().is_none());
        assert!(!console.has_permission("sales"));
        assert_eq!(*console.auth_events().borrow(), AuthState::LoggedOut);
        assert_eq!(console.api().base_url(), "http://127.0.0.1:9/api/v1");
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = ConsoleConfig::with_base_url("ftp://example.com");
        assert!(matches!(
            AdminConsole::new(config),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_workflow_factories_use_settings() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.workflow.auto_approve_purchase_orders = false;
        let console = AdminConsole::new(config).unwrap();

        let order = console.new_purchase_order(Some(3));
        assert!(!order.auto_approve());
        assert_eq!(order.draft().supplier_id, Some(3));

        let sale = console.new_sale();
        assert!(sale.draft().items.is_empty());

        let search = console.client_search();
        assert!(search.current().results.is_empty());
    }
}
