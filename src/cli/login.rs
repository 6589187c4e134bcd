use colored::Colorize;
use tracing::debug;
use zeroize::Zeroize;

use crate::activity;
use crate::auth::{AuthProvider, LocalAuth};
use crate::cli::{read_password, Context};
use crate::error::{AuthError, FleetError, Result};
use crate::guard::{landing_path, Access, RoleClaim, RouteTable, SessionGuard, SessionState};
use crate::roles::{Role, StoreRoleLookup};

/// Where a freshly signed-in session should go.
fn landing(state: &SessionState) -> Result<(&'static str, Role)> {
    match state {
        SessionState::Authenticated { role, .. } => match role {
            RoleClaim::Resolved(r) => landing_path(r)
                .map(|path| (path, r.clone()))
                .ok_or_else(|| AuthError::UnknownRole(r.to_string()).into()),
            RoleClaim::Missing => Err(AuthError::NoRole.into()),
            RoleClaim::Failed(e) => Err(e.clone().into()),
            RoleClaim::Resolving => Err(FleetError::Other("role lookup did not finish".to_string())),
        },
        _ => Err(AuthError::NotSignedIn.into()),
    }
}

pub fn run(email: &str, route: Option<String>) -> Result<()> {
    let ctx = Context::open()?;
    let auth = LocalAuth::new(ctx.store.clone());
    let mut guard = SessionGuard::mount(&auth, StoreRoleLookup::new(ctx.store.clone()));

    let mut password = read_password("Password: ")?;
    let signed_in = auth.sign_in(email, &password);
    password.zeroize();
    let principal = signed_in?;

    let state = guard.state();
    let outcome = match route {
        Some(path) => {
            let access = RouteTable::standard().decide(&path, &state);
            match access {
                Access::Allow => println!("{} {path}", "allow".green().bold()),
                Access::DenyRedirect(to) => println!("{} {path} -> {to}", "deny".red().bold()),
                Access::Pending => println!("{} {path}", "pending".yellow().bold()),
            }
            Ok(())
        }
        None => landing(&state).and_then(|(path, role)| {
            activity::record(&*ctx.store, &principal.email, role.as_str(), "Logged in")?;
            println!("Signed in as {} ({role})", principal.email);
            println!("Landing page: {path}");
            Ok(())
        }),
    };

    auth.sign_out()?;
    guard.teardown();
    debug!(
        signed_in = auth.current_user().is_some(),
        guard_mounted = guard.is_mounted(),
        "session closed"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;

    fn authed(role: RoleClaim) -> SessionState {
        SessionState::Authenticated {
            principal: Principal {
                uid: "u1".to_string(),
                email: "ana@fleet.ph".to_string(),
            },
            role,
        }
    }

    #[test]
    fn test_landing_for_dashboard_roles() {
        let (path, role) = landing(&authed(RoleClaim::Resolved(Role::Cashier))).unwrap();
        assert_eq!(path, "/dashboardCashier");
        assert_eq!(role, Role::Cashier);
    }

    #[test]
    fn test_landing_errors() {
        let err = landing(&authed(RoleClaim::Resolved(Role::Driver))).unwrap_err();
        assert!(matches!(err, FleetError::Auth(AuthError::UnknownRole(r)) if r == "Driver"));
        let err = landing(&authed(RoleClaim::Missing)).unwrap_err();
        assert!(matches!(err, FleetError::Auth(AuthError::NoRole)));
        let err = landing(&SessionState::Unauthenticated).unwrap_err();
        assert!(matches!(err, FleetError::Auth(AuthError::NotSignedIn)));
    }
}
