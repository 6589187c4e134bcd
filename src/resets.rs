use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::AuthProvider;
use crate::dates::{parse_instant, BoundaryZone};
use crate::error::{FleetError, Result};
use crate::store::{fields, Document, DocumentStore};

pub const RESETS_COLLECTION: &str = "passwordRequestReset";

const PENDING: &str = "pending";
const APPROVED: &str = "Approved";
const DECLINED: &str = "Declined";
const DEFAULT_HANDLER: &str = "Super Admin";

/// A staff member's request to have their password reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetRequest {
    pub id: String,
    pub user: String,
    pub role: String,
    pub requested_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl ResetRequest {
    pub fn from_document(doc: &Document, zone: BoundaryZone) -> Self {
        let text = |key: &str| doc.str_field(key).unwrap_or_default().to_string();
        let requested_at = ["requestedAt", "createdAt"]
            .iter()
            .filter_map(|k| doc.fields.get(*k))
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .and_then(|v| parse_instant(v, zone));
        let status = doc
            .str_field("status")
            .filter(|s| !s.is_empty())
            .unwrap_or(PENDING)
            .to_string();
        Self {
            id: doc.id.clone(),
            user: text("user"),
            role: text("role"),
            requested_at,
            status,
        }
    }

    fn requested_millis(&self) -> i64 {
        self.requested_at.map_or(0, |t| t.timestamp_millis())
    }
}

/// Pending requests, oldest first; equal times fall back to the user name.
pub fn pending_requests(docs: &[Document], zone: BoundaryZone) -> Vec<ResetRequest> {
    let mut pending: Vec<ResetRequest> = docs
        .iter()
        .filter(|d| d.str_field("status") == Some(PENDING))
        .map(|d| ResetRequest::from_document(d, zone))
        .collect();
    pending.sort_by(|a, b| match a.requested_millis().cmp(&b.requested_millis()) {
        Ordering::Equal => a.user.cmp(&b.user),
        other => other,
    });
    pending
}

/// Case-insensitive match on user, role and status.
pub fn search_requests(requests: &[ResetRequest], search: &str) -> Vec<ResetRequest> {
    let needle = search.trim().to_lowercase();
    requests
        .iter()
        .filter(|r| {
            needle.is_empty()
                || format!("{} {} {}", r.user, r.role, r.status)
                    .to_lowercase()
                    .contains(&needle)
        })
        .cloned()
        .collect()
}

/// What happened after a request was marked approved.
#[derive(Debug)]
pub enum Approval {
    Mailed,
    /// The request stays approved; the reset mail could not be sent.
    MailFailed(FleetError),
}

/// Approves or declines reset requests on behalf of one handler.
pub struct ResetDesk<'a, S: ?Sized, A: ?Sized> {
    store: &'a S,
    auth: &'a A,
    handled_by: String,
}

impl<'a, S, A> ResetDesk<'a, S, A>
where
    S: DocumentStore + ?Sized,
    A: AuthProvider + ?Sized,
{
    pub fn new(store: &'a S, auth: &'a A) -> Self {
        Self {
            store,
            auth,
            handled_by: DEFAULT_HANDLER.to_string(),
        }
    }

    pub fn handled_by(mut self, name: impl Into<String>) -> Self {
        self.handled_by = name.into();
        self
    }

    fn mark(&self, id: &str, status: &str) -> Result<()> {
        if self.store.get_document(RESETS_COLLECTION, id)?.is_none() {
            return Err(FleetError::NotFound(format!("reset request {id}")));
        }
        self.store.write_document(
            RESETS_COLLECTION,
            id,
            fields(json!({
                "status": status,
                "approvedBy": self.handled_by,
                "handledAt": Utc::now().to_rfc3339(),
            })),
            true,
        )
    }

    /// Mark the request approved, then mail the reset link to `email`.
    ///
    /// `Err` means the request was not approved. A mail failure after the
    /// status write comes back as `Approval::MailFailed`.
    pub fn approve(&self, id: &str, email: &str) -> Result<Approval> {
        self.mark(id, APPROVED)?;
        info!(id, email, by = %self.handled_by, "reset request approved");
        match self.auth.send_password_reset(email) {
            Ok(()) => Ok(Approval::Mailed),
            Err(e) => {
                warn!(id, email, error = %e, "reset mail not sent");
                Ok(Approval::MailFailed(e))
            }
        }
    }

    /// Mark the request declined and remove it.
    pub fn decline(&self, id: &str) -> Result<()> {
        self.mark(id, DECLINED)?;
        self.store.delete_document(RESETS_COLLECTION, id)?;
        info!(id, by = %self.handled_by, "reset request declined");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{test_auth, OUTBOX_COLLECTION};
    use serde_json::Value;

    fn doc(id: &str, v: Value) -> Document {
        Document {
            id: id.to_string(),
            fields: fields(v),
        }
    }

    #[test]
    fn test_pending_sorted_by_time_then_user() {
        let docs = vec![
            doc("a", json!({"user": "zed@fleet.ph", "status": "pending", "requestedAt": "2024-05-02T00:00:00Z"})),
            doc("b", json!({"user": "amy@fleet.ph", "status": "pending", "createdAt": "2024-05-01T00:00:00Z"})),
            doc("c", json!({"user": "bob@fleet.ph", "status": "Approved", "requestedAt": "2024-04-01T00:00:00Z"})),
            doc("d", json!({"user": "cy@fleet.ph", "status": "pending"})),
            doc("e", json!({"user": "al@fleet.ph", "status": "pending"})),
        ];
        let ids: Vec<_> = pending_requests(&docs, BoundaryZone::utc())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["e", "d", "b", "a"]);
    }

    #[test]
    fn test_requested_at_prefers_requested_over_created() {
        let r = ResetRequest::from_document(
            &doc("x", json!({"requestedAt": "2024-05-03T00:00:00Z", "createdAt": "2024-01-01T00:00:00Z"})),
            BoundaryZone::utc(),
        );
        assert_eq!(r.requested_at.unwrap().to_rfc3339(), "2024-05-03T00:00:00+00:00");
        assert_eq!(r.status, "pending");
    }

    #[test]
    fn test_empty_requested_at_falls_back_to_created() {
        let r = ResetRequest::from_document(
            &doc("x", json!({"requestedAt": "", "createdAt": "2024-01-01T00:00:00Z"})),
            BoundaryZone::utc(),
        );
        assert_eq!(r.requested_at.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_search() {
        let docs = vec![
            doc("a", json!({"user": "ana@fleet.ph", "role": "Cashier", "status": "pending"})),
            doc("b", json!({"user": "ben@fleet.ph", "role": "Admin", "status": "pending"})),
        ];
        let all = pending_requests(&docs, BoundaryZone::utc());
        assert_eq!(search_requests(&all, "admin").len(), 1);
        assert_eq!(search_requests(&all, "  ").len(), 2);
    }

    #[test]
    fn test_approve_marks_and_mails() {
        let (_dir, store, auth) = test_auth();
        auth.register("ana@fleet.ph", "s3cret!").unwrap();
        store
            .write_document(RESETS_COLLECTION, "r1", fields(json!({"user": "ana@fleet.ph", "status": "pending"})), false)
            .unwrap();

        let approval = ResetDesk::new(&*store, &auth).approve("r1", "ana@fleet.ph").unwrap();
        assert!(matches!(approval, Approval::Mailed));

        let saved = store.get_document(RESETS_COLLECTION, "r1").unwrap().unwrap();
        assert_eq!(saved.str_field("status"), Some("Approved"));
        assert_eq!(saved.str_field("approvedBy"), Some("Super Admin"));
        assert_eq!(saved.str_field("user"), Some("ana@fleet.ph"));
        assert!(saved.str_field("handledAt").is_some());
        assert_eq!(store.list_collection(OUTBOX_COLLECTION).unwrap().len(), 1);
    }

    #[test]
    fn test_approve_mail_failure_keeps_status() {
        let (_dir, store, auth) = test_auth();
        store
            .write_document(RESETS_COLLECTION, "r1", fields(json!({"user": "ghost@fleet.ph", "status": "pending"})), false)
            .unwrap();

        let approval = ResetDesk::new(&*store, &auth)
            .handled_by("Root")
            .approve("r1", "ghost@fleet.ph")
            .unwrap();
        assert!(matches!(approval, Approval::MailFailed(FleetError::NotFound(_))));
        let saved = store.get_document(RESETS_COLLECTION, "r1").unwrap().unwrap();
        assert_eq!(saved.str_field("status"), Some("Approved"));
        assert_eq!(saved.str_field("approvedBy"), Some("Root"));
    }

    #[test]
    fn test_decline_removes_request() {
        let (_dir, store, auth) = test_auth();
        store
            .write_document(RESETS_COLLECTION, "r1", fields(json!({"user": "ana@fleet.ph", "status": "pending"})), false)
            .unwrap();
        ResetDesk::new(&*store, &auth).decline("r1").unwrap();
        assert!(store.get_document(RESETS_COLLECTION, "r1").unwrap().is_none());
        assert!(store.list_collection(OUTBOX_COLLECTION).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_request() {
        let (_dir, store, auth) = test_auth();
        let desk = ResetDesk::new(&*store, &auth);
        assert!(matches!(desk.decline("nope"), Err(FleetError::NotFound(_))));
        assert!(matches!(desk.approve("nope", "a@b.ph"), Err(FleetError::NotFound(_))));
        assert!(store.list_collection(OUTBOX_COLLECTION).unwrap().is_empty());
        assert!(store.list_collection(RESETS_COLLECTION).unwrap().is_empty());
    }
}
