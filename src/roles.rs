use std::fmt;

use tracing::{debug, warn};

use crate::auth::Principal;
use crate::error::AuthError;
use crate::store::DocumentStore;

pub const USERS_COLLECTION: &str = "users";

/// Staff roles. Profiles carry free-form strings; anything outside the known
/// set is kept as `Unrecognized` so it can be reported rather than lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Cashier,
    Super,
    Driver,
    Reliever,
    Inspector,
    Conductor,
    Unrecognized(String),
}

impl Role {
    pub const KNOWN: [Role; 7] = [
        Role::Admin,
        Role::Cashier,
        Role::Super,
        Role::Driver,
        Role::Reliever,
        Role::Inspector,
        Role::Conductor,
    ];

    pub fn parse(raw: &str) -> Role {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "cashier" => Role::Cashier,
            "super" | "super admin" | "superadmin" => Role::Super,
            "driver" => Role::Driver,
            "reliever" => Role::Reliever,
            "inspector" => Role::Inspector,
            "conductor" => Role::Conductor,
            _ => {
                warn!(role = trimmed, "unrecognized role value");
                Role::Unrecognized(trimmed.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "Admin",
            Role::Cashier => "Cashier",
            Role::Super => "Super",
            Role::Driver => "Driver",
            Role::Reliever => "Reliever",
            Role::Inspector => "Inspector",
            Role::Conductor => "Conductor",
            Role::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the role claim for a principal. `Ok(None)` means the principal
/// has no profile or the profile has no role.
pub trait RoleLookup {
    fn resolve(&self, principal: &Principal) -> Result<Option<Role>, AuthError>;
}

/// Reads `role` from the `users` profile whose `email` matches the principal.
pub struct StoreRoleLookup<S> {
    store: S,
}

impl<S> StoreRoleLookup<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S, D> RoleLookup for StoreRoleLookup<S>
where
    S: std::ops::Deref<Target = D>,
    D: DocumentStore + ?Sized,
{
    fn resolve(&self, principal: &Principal) -> Result<Option<Role>, AuthError> {
        let profiles = self
            .store
            .find_where(USERS_COLLECTION, "email", &principal.email)
            .map_err(|e| AuthError::Lookup(e.to_string()))?;
        let role = profiles
            .first()
            .and_then(|doc| doc.str_field("role"))
            .filter(|r| !r.trim().is_empty())
            .map(Role::parse);
        debug!(email = %principal.email, role = ?role, "role resolved");
        Ok(role)
    }
}
