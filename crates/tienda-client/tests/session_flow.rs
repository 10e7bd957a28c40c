//! Login, logout and forced logout against the stub API.

mod common;

use std::sync::Arc;

use tempfile::TempDir;
use tienda_client::services::ProductFilters;
use tienda_client::{
    AdminConsole, AuthState, ClientError, ConsoleConfig, Credentials, FileSessionStore,
    SessionContext, SessionStore,
};

use common::{Stub, PASSWORD, USERNAME};

fn file_console(stub: &Stub, dir: &TempDir) -> AdminConsole {
    let mut config = ConsoleConfig::with_base_url(stub.base_url());
    config.session.storage_path = Some(dir.path().join("session.json"));
    AdminConsole::new(config).unwrap()
}

#[tokio::test]
async fn test_login_logout_round_trip() {
    let stub = Stub::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(dir.path().join("session.json"));
    let console = file_console(&stub, &dir);

    // Nothing stored yet: unauthenticated, no error.
    assert!(!console.check_auth());
    assert!(!console.is_authenticated());

    let session = console
        .services()
        .auth
        .login(&Credentials::new(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert_eq!(session.username, USERNAME);
    assert_eq!(session.role_id, 2);
    assert!(console.is_authenticated());
    assert!(console.has_permission("sales"));
    assert!(!console.has_permission("reports"));

    let stored = store.load().unwrap().expect("session persisted");
    assert!(!stored.token.is_empty());
    assert_eq!(stored.user.username, USERNAME);

    let login = stub.calls_to("POST", "/login");
    assert_eq!(login.len(), 1);
    assert_eq!(login[0].body["username"], USERNAME);

    console.logout();
    assert!(!console.is_authenticated());
    assert!(store.load().unwrap().is_none());
    assert_eq!(*console.auth_events().borrow(), AuthState::LoggedOut);
}

#[tokio::test]
async fn test_stored_session_survives_restart() {
    let stub = Stub::start().await;
    let dir = TempDir::new().unwrap();

    {
        let console = file_console(&stub, &dir);
        console
            .services()
            .auth
            .login(&Credentials::new(USERNAME, PASSWORD))
            .await
            .unwrap();
    }

    let restarted = file_console(&stub, &dir);
    assert!(!restarted.is_authenticated());
    assert!(restarted.check_auth());
    assert_eq!(restarted.current_user().unwrap().username, USERNAME);

    // The restored token is sent with the next request.
    let page = restarted
        .services()
        .products
        .list(&ProductFilters::default())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_rejected_credentials_surface_server_message() {
    let stub = Stub::start().await;
    let console = stub.console();

    let err = console
        .services()
        .auth
        .login(&Credentials::new(USERNAME, "incorrecta"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert_eq!(err.user_message(), "Usuario o contraseña incorrectos");
    // A login 401 is an answer, not a forced logout.
    assert_eq!(*console.auth_events().borrow(), AuthState::LoggedOut);
}

#[tokio::test]
async fn test_login_401_leaves_existing_session_alone() {
    let stub = Stub::start().await;
    let console = stub.console();
    let auth = &console.services().auth;

    auth.login(&Credentials::new(USERNAME, PASSWORD)).await.unwrap();
    assert!(auth
        .login(&Credentials::new(USERNAME, "incorrecta"))
        .await
        .is_err());

    assert!(console.is_authenticated());
    assert!(console.auth_events().borrow().is_authenticated());
}

#[tokio::test]
async fn test_blank_credentials_never_reach_the_server() {
    let stub = Stub::start().await;
    let console = stub.console();

    let err = console
        .services()
        .auth
        .login(&Credentials::new("  ", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Form(_)));
    assert!(stub.calls_to("POST", "/login").is_empty());
}

#[tokio::test]
async fn test_401_on_resource_forces_logout() {
    let stub = Stub::start().await;
    let session = Arc::new(SessionContext::in_memory());
    let console =
        AdminConsole::with_session(ConsoleConfig::with_base_url(stub.base_url()), Arc::clone(&session))
            .unwrap();
    let mut events = console.auth_events();

    console
        .services()
        .auth
        .login(&Credentials::new(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert!(events.borrow_and_update().is_authenticated());

    stub.revoke_tokens();
    let err = console
        .services()
        .products
        .list(&ProductFilters::default())
        .await
        .unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(err.user_message(), "Token inválido o expirado");
    assert!(!session.is_authenticated());
    assert!(session.token().is_none());

    events.changed().await.unwrap();
    assert_eq!(*events.borrow(), AuthState::Expired);
}

#[tokio::test]
async fn test_request_without_session_is_rejected_by_server() {
    let stub = Stub::start().await;
    let console = stub.console();

    let err = console
        .services()
        .products
        .list(&ProductFilters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert_eq!(*console.auth_events().borrow(), AuthState::Expired);
}
