use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::OptionalExtension;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::error::{AuthError, FleetError, Result};
use crate::store::{auto_id, fields, DocumentStore, SqliteStore};
use crate::subscription::Subscription;

pub const MAX_FAILED_ATTEMPTS: i64 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const OUTBOX_COLLECTION: &str = "mailOutbox";

/// A signed-in identity. `uid` is stable; `email` is what profiles are keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
}

pub type AuthStateFn = Box<dyn FnMut(Option<&Principal>)>;

pub trait AuthProvider {
    /// Register for sign-in / sign-out changes. The current state is delivered
    /// once the provider knows it, then again on every change.
    fn subscribe_auth_state(&self, on_change: AuthStateFn) -> Subscription;
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal>;
    fn sign_out(&self) -> Result<()>;
    fn send_password_reset(&self, email: &str) -> Result<()>;
    fn current_user(&self) -> Option<Principal>;
}

struct AuthListener {
    active: Cell<bool>,
    on_change: RefCell<AuthStateFn>,
}

#[derive(Default)]
struct AuthListeners {
    next_id: u64,
    entries: Vec<(u64, Rc<AuthListener>)>,
}

/// Email/password provider backed by the `credentials` table.
pub struct LocalAuth {
    store: Rc<SqliteStore>,
    current: RefCell<Option<Principal>>,
    listeners: Rc<RefCell<AuthListeners>>,
}

fn email_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

pub fn validate_email(email: &str) -> Result<()> {
    if email_re().is_some_and(|re| re.is_match(email.trim())) {
        Ok(())
    } else {
        Err(FleetError::Validation {
            field: "email",
            message: format!("'{email}' is not a valid email address"),
        })
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut buf = Vec::with_capacity(salt.len() + password.len());
    buf.extend_from_slice(salt.as_bytes());
    buf.extend_from_slice(password.as_bytes());
    let digest = Sha256::digest(&buf);
    buf.zeroize();
    hex::encode(digest)
}

/// `last_failed_at` is SQLite `datetime('now')` text, in UTC.
fn lockout_expired(last_failed: Option<&str>) -> bool {
    let Some(raw) = last_failed else {
        return false;
    };
    match chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(at) => chrono::Utc::now().naive_utc() - at >= chrono::Duration::minutes(LOCKOUT_MINUTES),
        Err(_) => false,
    }
}

fn new_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

impl LocalAuth {
    pub fn new(store: Rc<SqliteStore>) -> Self {
        Self {
            store,
            current: RefCell::new(None),
            listeners: Rc::new(RefCell::new(AuthListeners::default())),
        }
    }

    /// Create a credential. Emails are unique ignoring case.
    pub fn register(&self, email: &str, password: &str) -> Result<Principal> {
        let email = email.trim();
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FleetError::Validation {
                field: "password",
                message: format!("must be at least {MIN_PASSWORD_LEN} characters"),
            });
        }
        let conn = self.store.connection();
        let exists: bool = conn.query_row(
            "SELECT count(*) > 0 FROM credentials WHERE email = ?1",
            [email],
            |r| r.get(0),
        )?;
        if exists {
            return Err(FleetError::Validation {
                field: "email",
                message: format!("{email} is already registered"),
            });
        }
        let salt = new_salt();
        let uid = auto_id();
        conn.execute(
            "INSERT INTO credentials (email, uid, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![email, uid, hash_password(&salt, password), salt],
        )?;
        info!(email, "credential registered");
        Ok(Principal {
            uid,
            email: email.to_string(),
        })
    }

    fn broadcast(&self) {
        let principal = self.current.borrow().clone();
        let targets: Vec<Rc<AuthListener>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in targets {
            deliver(&listener, principal.as_ref());
        }
    }
}

fn deliver(listener: &AuthListener, principal: Option<&Principal>) {
    if !listener.active.get() {
        return;
    }
    if let Ok(mut cb) = listener.on_change.try_borrow_mut() {
        cb(principal);
    }
}

impl AuthProvider for LocalAuth {
    fn subscribe_auth_state(&self, on_change: AuthStateFn) -> Subscription {
        let listener = Rc::new(AuthListener {
            active: Cell::new(true),
            on_change: RefCell::new(on_change),
        });
        let id = {
            let mut ls = self.listeners.borrow_mut();
            ls.next_id += 1;
            let id = ls.next_id;
            ls.entries.push((id, listener.clone()));
            id
        };
        debug!(listener = id, "auth state subscribed");

        let current = self.current.borrow().clone();
        deliver(&listener, current.as_ref());

        let registry = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            listener.active.set(false);
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().entries.retain(|(lid, _)| *lid != id);
            }
            debug!(listener = id, "auth state unsubscribed");
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        let email = email.trim();
        let conn = self.store.connection();
        let row: Option<(String, String, String, i64, Option<String>)> = conn
            .query_row(
                "SELECT uid, password_hash, salt, failed_attempts, last_failed_at \
                 FROM credentials WHERE email = ?1",
                [email],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .optional()?;
        let Some((uid, stored_hash, salt, failed, last_failed)) = row else {
            warn!(email, "sign-in for unknown email");
            return Err(AuthError::InvalidCredential.into());
        };
        if failed >= MAX_FAILED_ATTEMPTS && !lockout_expired(last_failed.as_deref()) {
            warn!(email, failed, "sign-in locked out");
            return Err(AuthError::TooManyRequests.into());
        }
        if hash_password(&salt, password) != stored_hash {
            // An expired lockout starts a fresh count.
            conn.execute(
                "UPDATE credentials SET failed_attempts = \
                 CASE WHEN failed_attempts >= ?2 THEN 1 ELSE failed_attempts + 1 END, \
                 last_failed_at = datetime('now') WHERE email = ?1",
                rusqlite::params![email, MAX_FAILED_ATTEMPTS],
            )?;
            warn!(email, attempts = failed + 1, "sign-in rejected");
            return Err(AuthError::InvalidCredential.into());
        }
        conn.execute(
            "UPDATE credentials SET failed_attempts = 0 WHERE email = ?1",
            [email],
        )?;
        let stored_email: String =
            conn.query_row("SELECT email FROM credentials WHERE uid = ?1", [&uid], |r| r.get(0))?;
        let principal = Principal {
            uid,
            email: stored_email,
        };
        info!(email = %principal.email, "signed in");
        *self.current.borrow_mut() = Some(principal.clone());
        self.broadcast();
        Ok(principal)
    }

    fn sign_out(&self) -> Result<()> {
        let previous = self.current.borrow_mut().take();
        if let Some(p) = previous {
            info!(email = %p.email, "signed out");
        }
        self.broadcast();
        Ok(())
    }

    fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = email.trim();
        let known: bool = self.store.connection().query_row(
            "SELECT count(*) > 0 FROM credentials WHERE email = ?1",
            [email],
            |r| r.get(0),
        )?;
        if !known {
            return Err(FleetError::NotFound(format!("no account for {email}")));
        }
        self.store.insert_document(
            OUTBOX_COLLECTION,
            fields(json!({
                "to": email,
                "kind": "passwordReset",
                "sentAt": chrono::Utc::now().to_rfc3339(),
            })),
        )?;
        info!(email, "password reset mail queued");
        Ok(())
    }

    fn current_user(&self) -> Option<Principal> {
        self.current.borrow().clone()
    }
}

#[cfg(test)]
pub(crate) fn test_auth() -> (tempfile::TempDir, Rc<SqliteStore>, LocalAuth) {
    let (dir, store) = crate::store::test_store();
    let store = Rc::new(store);
    let auth = LocalAuth::new(store.clone());
    (dir, store, auth)
}
