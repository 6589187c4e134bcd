use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, Principal};
use crate::error::AuthError;
use crate::roles::{Role, RoleLookup};
use crate::subscription::Subscription;

pub const LOGIN_PATH: &str = "/login";
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Where a principal's role claim stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleClaim {
    Resolving,
    Resolved(Role),
    /// Profile absent or without a role.
    Missing,
    Failed(AuthError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing heard from the provider yet.
    #[default]
    Unknown,
    Authenticated {
        principal: Principal,
        role: RoleClaim,
    },
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    DenyRedirect(&'static str),
    /// Render nothing yet: neither the page nor a redirect.
    Pending,
}

/// Decide whether `state` may view a page gated on `required` roles.
///
/// An empty `required` means any signed-in principal. A role claim that is
/// missing, failed or unrecognized never grants a gated page.
pub fn evaluate(state: &SessionState, required: &[Role]) -> Access {
    match state {
        SessionState::Unknown => Access::Pending,
        SessionState::Unauthenticated => Access::DenyRedirect(LOGIN_PATH),
        SessionState::Authenticated { role, .. } => {
            if required.is_empty() {
                return Access::Allow;
            }
            match role {
                RoleClaim::Resolving => Access::Pending,
                RoleClaim::Resolved(r) if r.is_recognized() && required.contains(r) => Access::Allow,
                _ => Access::DenyRedirect(FORBIDDEN_PATH),
            }
        }
    }
}

/// Tracks the session for one mounted view and gates it.
///
/// Mounting subscribes to the provider's auth stream once; `teardown` (or
/// dropping the guard) releases that subscription.
pub struct SessionGuard {
    state: Rc<RefCell<SessionState>>,
    subscription: Option<Subscription>,
}

impl SessionGuard {
    pub fn mount<A, L>(auth: &A, roles: L) -> Self
    where
        A: AuthProvider + ?Sized,
        L: RoleLookup + 'static,
    {
        let state = Rc::new(RefCell::new(SessionState::Unknown));
        let target = state.clone();
        let subscription = auth.subscribe_auth_state(Box::new(move |principal| {
            transition(&target, principal, &roles);
        }));
        debug!("session guard mounted");
        Self {
            state,
            subscription: Some(subscription),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn check(&self, required: &[Role]) -> Access {
        evaluate(&self.state.borrow(), required)
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn teardown(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.unsubscribe();
            debug!("session guard torn down");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn transition(state: &RefCell<SessionState>, principal: Option<&Principal>, roles: &dyn RoleLookup) {
    let Some(principal) = principal else {
        *state.borrow_mut() = SessionState::Unauthenticated;
        debug!("session unauthenticated");
        return;
    };
    *state.borrow_mut() = SessionState::Authenticated {
        principal: principal.clone(),
        role: RoleClaim::Resolving,
    };
    let claim = match roles.resolve(principal) {
        Ok(Some(role)) => RoleClaim::Resolved(role),
        Ok(None) => {
            warn!(email = %principal.email, "no role on profile");
            RoleClaim::Missing
        }
        Err(e) => {
            warn!(email = %principal.email, error = %e, "role lookup failed");
            RoleClaim::Failed(e)
        }
    };
    let mut current = state.borrow_mut();
    // A later event may already have replaced the principal.
    if let SessionState::Authenticated { principal: p, role } = &mut *current {
        if p.uid == principal.uid {
            info!(email = %p.email, role = ?claim, "session authenticated");
            *role = claim;
        }
    }
}

/// The application's route table.
pub struct RouteTable {
    routes: Vec<(&'static str, Vec<Role>)>,
}

impl RouteTable {
    pub fn standard() -> Self {
        let super_only = || vec![Role::Super];
        Self {
            routes: vec![
                ("/dashboardAdmin", vec![Role::Admin]),
                ("/dashboardCashier", vec![Role::Cashier]),
                ("/dashboardSuper", super_only()),
                ("/activityLogSuper", super_only()),
                ("/AdminManagementSuper", super_only()),
                ("/RouteManagementSuper", super_only()),
                ("/QuotaManagementSuper", super_only()),
                ("/UACSuper", super_only()),
                ("/PasswordSuper", super_only()),
                ("/MaintenanceSuper", super_only()),
            ],
        }
    }

    pub fn required_roles(&self, path: &str) -> Option<&[Role]> {
        self.routes
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, roles)| roles.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|(p, _)| *p)
    }

    /// Public pages always render; unknown paths go to the login page.
    pub fn decide(&self, path: &str, state: &SessionState) -> Access {
        if path == LOGIN_PATH || path == FORBIDDEN_PATH {
            return Access::Allow;
        }
        match self.required_roles(path) {
            Some(required) => evaluate(state, required),
            None => Access::DenyRedirect(LOGIN_PATH),
        }
    }
}

/// Dashboard a role lands on after signing in.
pub fn landing_path(role: &Role) -> Option<&'static str> {
    match role {
        Role::Admin => Some("/dashboardAdmin"),
        Role::Cashier => Some("/dashboardCashier"),
        Role::Super => Some("/dashboardSuper"),
        _ => None,
    }
}
