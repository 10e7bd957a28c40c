//! # Page Policies
//!
//! One declared capability set per page. Every rendering decision (show
//! the page in the menu, show the actions column, show a row button, show
//! a toolbar button) is answered from the same table, so the "show
//! column" and "show button" predicates cannot disagree.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PagePolicy(Products)                                                   │
//! │  ┌────────────┬──────────────────────────┐                              │
//! │  │  Action    │  Requirement             │                              │
//! │  ├────────────┼──────────────────────────┤                              │
//! │  │  View      │  AnyOf["inventory"]      │ ◄── menu entry, route guard  │
//! │  │  Create    │  AnyOf["inventory"]      │ ◄── toolbar button           │
//! │  │  Edit      │  AnyOf["inventory"]      │ ◄┐                           │
//! │  │  Delete    │  AnyOf["inventory"]      │ ◄┴─ row buttons              │
//! │  └────────────┴──────────────────────────┘                              │
//! │                                                                         │
//! │  any_row_action() = Edit.allowed || Delete.allowed   (actions column)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Actions missing from a page's table are not offered on that page at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::session::{permissions, Session};

// =============================================================================
// Requirement
// =============================================================================

/// What a session needs to perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any logged-in user.
    Authenticated,
    /// At least one of the named permissions (admins always pass).
    AnyOf(&'static [&'static str]),
    /// Only the admin role.
    AdminOnly,
}

impl Requirement {
    pub fn is_met_by(&self, session: Option<&Session>) -> bool {
        let Some(session) = session else {
            return false;
        };
        match self {
            Requirement::Authenticated => true,
            Requirement::AnyOf(names) => session.has_any_permission(names),
            Requirement::AdminOnly => session.is_admin(),
        }
    }
}

// =============================================================================
// Pages & Actions
// =============================================================================

/// Top-level pages of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Page {
    Dashboard,
    Products,
    Sales,
    Clients,
    Branches,
    Suppliers,
    Users,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Dashboard,
        Page::Products,
        Page::Sales,
        Page::Clients,
        Page::Branches,
        Page::Suppliers,
        Page::Users,
    ];

    /// Route of the page in the console.
    pub fn path(&self) -> &'static str {
        match self {
            Page::Dashboard => "/",
            Page::Products => "/productos",
            Page::Sales => "/ventas",
            Page::Clients => "/clientes",
            Page::Branches => "/sucursales",
            Page::Suppliers => "/proveedores",
            Page::Users => "/usuarios",
        }
    }

    /// Menu label.
    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Products => "Productos",
            Page::Sales => "Ventas",
            Page::Clients => "Clientes",
            Page::Branches => "Sucursales",
            Page::Suppliers => "Proveedores",
            Page::Users => "Usuarios",
        }
    }

    pub fn policy(self) -> PagePolicy {
        PagePolicy::for_page(self)
    }
}

/// Something a user can do on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    /// Download the invoice PDF of a sale.
    Invoice,
    /// Export a listing (csv, xlsx, pdf).
    Export,
    /// Charts and summaries.
    ViewReports,
    /// Open a purchase order for a supplier.
    CreatePurchaseOrder,
    /// Change the status of a purchase order.
    ChangeOrderStatus,
}

impl Action {
    /// Actions rendered per table row, which decide whether the actions
    /// column exists at all.
    pub fn is_row_action(&self) -> bool {
        matches!(
            self,
            Action::Edit
                | Action::Delete
                | Action::Invoice
                | Action::CreatePurchaseOrder
                | Action::ChangeOrderStatus
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Invoice => "invoice",
            Action::Export => "export",
            Action::ViewReports => "view_reports",
            Action::CreatePurchaseOrder => "create_purchase_order",
            Action::ChangeOrderStatus => "change_order_status",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Policy Tables
// =============================================================================

const INVENTORY: &[&str] = &[permissions::INVENTORY];
const SALES: &[&str] = &[permissions::SALES];
const REPORTS: &[&str] = &[permissions::REPORTS];
const SALES_OR_REPORTS: &[&str] = &[permissions::SALES, permissions::REPORTS];

type Rules = &'static [(Action, Requirement)];

const DASHBOARD_RULES: Rules = &[
    (Action::View, Requirement::Authenticated),
    (Action::ViewReports, Requirement::AnyOf(REPORTS)),
];

const PRODUCT_RULES: Rules = &[
    (Action::View, Requirement::AnyOf(INVENTORY)),
    (Action::Create, Requirement::AnyOf(INVENTORY)),
    (Action::Edit, Requirement::AnyOf(INVENTORY)),
    (Action::Delete, Requirement::AnyOf(INVENTORY)),
];

// Listing and invoices are open to report readers; mutations need `sales`.
const SALE_RULES: Rules = &[
    (Action::View, Requirement::AnyOf(SALES_OR_REPORTS)),
    (Action::Create, Requirement::AnyOf(SALES)),
    (Action::Edit, Requirement::AnyOf(SALES)),
    (Action::Delete, Requirement::AnyOf(SALES)),
    (Action::Invoice, Requirement::AnyOf(SALES_OR_REPORTS)),
    (Action::Export, Requirement::AnyOf(REPORTS)),
    (Action::ViewReports, Requirement::AnyOf(REPORTS)),
];

const CLIENT_RULES: Rules = &[
    (Action::View, Requirement::AnyOf(SALES)),
    (Action::Create, Requirement::AnyOf(SALES)),
    (Action::Edit, Requirement::AnyOf(SALES)),
    (Action::Delete, Requirement::AnyOf(SALES)),
];

const BRANCH_RULES: Rules = &[
    (Action::View, Requirement::AdminOnly),
    (Action::Create, Requirement::AdminOnly),
    (Action::Edit, Requirement::AdminOnly),
    (Action::Delete, Requirement::AdminOnly),
];

const SUPPLIER_RULES: Rules = &[
    (Action::View, Requirement::AnyOf(INVENTORY)),
    (Action::Create, Requirement::AnyOf(INVENTORY)),
    (Action::Edit, Requirement::AnyOf(INVENTORY)),
    (Action::Delete, Requirement::AnyOf(INVENTORY)),
    (Action::CreatePurchaseOrder, Requirement::AnyOf(INVENTORY)),
    (Action::ChangeOrderStatus, Requirement::AnyOf(INVENTORY)),
];

const USER_RULES: Rules = &[
    (Action::View, Requirement::AdminOnly),
    (Action::Create, Requirement::AdminOnly),
    (Action::Edit, Requirement::AdminOnly),
    (Action::Delete, Requirement::AdminOnly),
];

// =============================================================================
// PagePolicy
// =============================================================================

/// The capability set declared for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    page: Page,
    rules: Rules,
}

impl PagePolicy {
    pub fn for_page(page: Page) -> Self {
        let rules = match page {
            Page::Dashboard => DASHBOARD_RULES,
            Page::Products => PRODUCT_RULES,
            Page::Sales => SALE_RULES,
            Page::Clients => CLIENT_RULES,
            Page::Branches => BRANCH_RULES,
            Page::Suppliers => SUPPLIER_RULES,
            Page::Users => USER_RULES,
        };
        PagePolicy { page, rules }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Requirement for `action`, `None` when the page does not offer it.
    pub fn requirement(&self, action: Action) -> Option<Requirement> {
        self.rules
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, req)| *req)
    }

    /// Whether `session` may perform `action` on this page.
    pub fn allows(&self, session: Option<&Session>, action: Action) -> bool {
        self.requirement(action)
            .is_some_and(|req| req.is_met_by(session))
    }

    /// Route guard and menu visibility.
    pub fn can_view(&self, session: Option<&Session>) -> bool {
        self.allows(session, Action::View)
    }

    /// Actions `session` may perform here, in declaration order.
    pub fn visible_actions(&self, session: Option<&Session>) -> Vec<Action> {
        self.rules
            .iter()
            .filter(|(_, req)| req.is_met_by(session))
            .map(|(action, _)| *action)
            .collect()
    }

    /// Row buttons `session` gets.
    pub fn row_actions(&self, session: Option<&Session>) -> Vec<Action> {
        self.visible_actions(session)
            .into_iter()
            .filter(Action::is_row_action)
            .collect()
    }

    /// Whether the actions column is rendered: exactly when at least one
    /// row button would be.
    pub fn any_row_action(&self, session: Option<&Session>) -> bool {
        self.rules
            .iter()
            .filter(|(action, _)| action.is_row_action())
            .any(|(_, req)| req.is_met_by(session))
    }
}

/// Shorthand for `PagePolicy::for_page(page).allows(session, action)`.
pub fn can_see_action(session: Option<&Session>, page: Page, action: Action) -> bool {
    PagePolicy::for_page(page).allows(session, action)
}

/// Pages to list in the navigation menu for `session`.
pub fn menu_pages(session: Option<&Session>) -> Vec<Page> {
    Page::ALL
        .into_iter()
        .filter(|page| page.policy().can_view(session))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PermissionMap;
    use crate::ADMIN_ROLE_ID;

    fn user(grants: &[&str]) -> Session {
        let permissions: PermissionMap = grants.iter().map(|g| (g.to_string(), true)).collect();
        Session::new("staff", 2, permissions)
    }

    fn admin() -> Session {
        Session::new("root", ADMIN_ROLE_ID, PermissionMap::new())
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = admin();
        for page in Page::ALL {
            let policy = page.policy();
            for (action, _) in policy.rules {
                assert!(policy.allows(Some(&admin), *action), "{page:?} {action}");
            }
        }
        assert_eq!(menu_pages(Some(&admin)).len(), Page::ALL.len());
    }

    #[test]
    fn test_anonymous_sees_nothing() {
        for page in Page::ALL {
            assert!(page.policy().visible_actions(None).is_empty());
            assert!(!page.policy().any_row_action(None));
        }
        assert!(menu_pages(None).is_empty());
    }

    #[test]
    fn test_any_row_action_agrees_with_row_buttons() {
        let sessions = [
            user(&[]),
            user(&["sales"]),
            user(&["reports"]),
            user(&["inventory"]),
            user(&["all"]),
            admin(),
        ];
        for session in &sessions {
            for page in Page::ALL {
                let policy = page.policy();
                assert_eq!(
                    policy.any_row_action(Some(session)),
                    !policy.row_actions(Some(session)).is_empty(),
                    "{page:?} for {:?}",
                    session.permissions
                );
            }
        }
    }

    #[test]
    fn test_report_reader_can_list_sales_but_not_edit() {
        let reader = user(&["reports"]);
        let sales = Page::Sales.policy();
        assert!(sales.can_view(Some(&reader)));
        assert!(sales.allows(Some(&reader), Action::Invoice));
        assert!(sales.allows(Some(&reader), Action::Export));
        assert!(!sales.allows(Some(&reader), Action::Edit));
        assert!(!sales.allows(Some(&reader), Action::Create));
        assert_eq!(sales.row_actions(Some(&reader)), vec![Action::Invoice]);
    }

    #[test]
    fn test_actions_not_offered_are_denied() {
        let admin = admin();
        assert_eq!(Page::Products.policy().requirement(Action::Invoice), None);
        assert!(!can_see_action(Some(&admin), Page::Products, Action::Invoice));
    }

    #[test]
    fn test_admin_only_pages() {
        let everyone_else = user(&["all"]);
        assert!(!Page::Users.policy().can_view(Some(&everyone_else)));
        assert!(!Page::Branches.policy().can_view(Some(&everyone_else)));
        assert!(Page::Products.policy().can_view(Some(&everyone_else)));
    }

    #[test]
    fn test_menu_for_inventory_clerk() {
        let clerk = user(&["inventory"]);
        assert_eq!(
            menu_pages(Some(&clerk)),
            vec![Page::Dashboard, Page::Products, Page::Suppliers]
        );
    }
}
