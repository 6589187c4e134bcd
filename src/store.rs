use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{FleetError, Result};
use crate::subscription::Subscription;

pub type Fields = Map<String, Value>;

pub type SnapshotFn = Box<dyn FnMut(&[Document])>;
pub type ErrorFn = Box<dyn FnMut(&FleetError)>;

const AUTO_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// A collection-oriented document store with live snapshot subscriptions.
///
/// Every delivered snapshot is the whole collection and replaces whatever the
/// subscriber saw before.
pub trait DocumentStore {
    fn subscribe_collection(&self, name: &str, on_snapshot: SnapshotFn, on_error: ErrorFn)
        -> Subscription;

    /// Write `fields` to `collection/id`. With `merge`, existing top-level
    /// fields not named in `fields` are kept; without it the document is replaced.
    fn write_document(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()>;

    fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    fn list_collection(&self, collection: &str) -> Result<Vec<Document>>;

    /// Create a document under a fresh id and return the id.
    fn insert_document(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = auto_id();
        self.write_document(collection, &id, fields, false)?;
        Ok(id)
    }

    /// Documents whose string field `field` equals `value`, ignoring ASCII case.
    fn find_where(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        Ok(self
            .list_collection(collection)?
            .into_iter()
            .filter(|d| d.str_field(field).is_some_and(|v| v.eq_ignore_ascii_case(value)))
            .collect())
    }
}

pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

struct Listener {
    collection: String,
    active: Cell<bool>,
    // A failed read ends the subscription; only a fresh subscribe recovers.
    failed: Cell<bool>,
    on_snapshot: RefCell<SnapshotFn>,
    on_error: RefCell<ErrorFn>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Rc<Listener>)>,
}

/// `DocumentStore` over the local SQLite database.
pub struct SqliteStore {
    conn: Connection,
    listeners: Rc<RefCell<Listeners>>,
    delivering: Cell<bool>,
    // Collections written from inside a callback, re-broadcast afterwards.
    pending: RefCell<Vec<String>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            listeners: Rc::new(RefCell::new(Listeners::default())),
            delivering: Cell::new(false),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields FROM documents WHERE collection = ?1 ORDER BY rowid")?;
        let raw: Vec<(String, String)> = stmt
            .query_map([collection], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(id, json)| Ok(Document { id, fields: parse_fields(&json)? }))
            .collect()
    }

    /// Push a fresh snapshot of `collection` to its live subscribers.
    ///
    /// A write made by a callback is queued and delivered once the current
    /// round finishes, so every subscriber ends on the latest state.
    fn notify(&self, collection: &str) {
        if self.delivering.get() {
            let mut pending = self.pending.borrow_mut();
            if !pending.iter().any(|c| c == collection) {
                debug!(collection, "write during delivery, snapshot queued");
                pending.push(collection.to_string());
            }
            return;
        }
        self.delivering.set(true);
        self.broadcast(collection);
        self.drain_pending();
        self.delivering.set(false);
    }

    fn drain_pending(&self) {
        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                if pending.is_empty() {
                    None
                } else {
                    Some(pending.remove(0))
                }
            };
            let Some(collection) = next else {
                break;
            };
            self.broadcast(&collection);
        }
    }

    fn broadcast(&self, collection: &str) {
        let targets: Vec<Rc<Listener>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .filter(|(_, l)| l.collection == collection)
            .map(|(_, l)| l.clone())
            .collect();
        if targets.is_empty() {
            return;
        }
        let snapshot = self.read_collection(collection);
        for listener in targets {
            deliver(&listener, &snapshot);
        }
    }
}

fn deliver(listener: &Listener, snapshot: &Result<Vec<Document>>) {
    if !listener.active.get() || listener.failed.get() {
        return;
    }
    match snapshot {
        Ok(docs) => match listener.on_snapshot.try_borrow_mut() {
            Ok(mut cb) => {
                debug!(collection = %listener.collection, count = docs.len(), "snapshot delivered");
                cb(docs)
            }
            Err(_) => debug!(collection = %listener.collection, "listener busy, snapshot skipped"),
        },
        Err(e) => {
            listener.failed.set(true);
            warn!(collection = %listener.collection, error = %e, "snapshot failed, subscription ended");
            if let Ok(mut cb) = listener.on_error.try_borrow_mut() {
                cb(e)
            }
        }
    }
}

fn parse_fields(json: &str) -> Result<Fields> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(FleetError::DataFetch(format!("document is not an object: {other}"))),
    }
}

impl DocumentStore for SqliteStore {
    fn subscribe_collection(
        &self,
        name: &str,
        on_snapshot: SnapshotFn,
        on_error: ErrorFn,
    ) -> Subscription {
        let listener = Rc::new(Listener {
            collection: name.to_string(),
            active: Cell::new(true),
            failed: Cell::new(false),
            on_snapshot: RefCell::new(on_snapshot),
            on_error: RefCell::new(on_error),
        });
        let id = {
            let mut ls = self.listeners.borrow_mut();
            ls.next_id += 1;
            let id = ls.next_id;
            ls.entries.push((id, listener.clone()));
            id
        };
        debug!(collection = name, listener = id, "subscribed");

        let outermost = !self.delivering.replace(true);
        deliver(&listener, &self.read_collection(name));
        if outermost {
            self.drain_pending();
            self.delivering.set(false);
        }

        let registry = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            listener.active.set(false);
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().entries.retain(|(lid, _)| *lid != id);
            }
            debug!(listener = id, "unsubscribed");
        })
    }

    fn write_document(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
        let merged = if merge {
            match self.get_document(collection, id)? {
                Some(mut existing) => {
                    existing.fields.extend(fields);
                    existing.fields
                }
                None => fields,
            }
        } else {
            fields
        };
        let json = serde_json::to_string(&Value::Object(merged))?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, fields) VALUES (?1, ?2, ?3) \
             ON CONFLICT(collection, id) DO UPDATE SET fields = excluded.fields, \
             updated_at = datetime('now')",
            rusqlite::params![collection, id, json],
        )?;
        info!(collection, id, merge, "document written");
        self.notify(collection);
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let n = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;
        if n > 0 {
            info!(collection, id, "document deleted");
            self.notify(collection);
        }
        Ok(())
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| {
            Ok(Document {
                id: id.to_string(),
                fields: parse_fields(&j)?,
            })
        })
        .transpose()
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Document>> {
        self.read_collection(collection)
    }

    fn find_where(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        let path = format!("$.{field}");
        let mut stmt = self.conn.prepare(
            "SELECT id, fields FROM documents WHERE collection = ?1 \
             AND lower(json_extract(fields, ?2)) = lower(?3) ORDER BY rowid",
        )?;
        let raw: Vec<(String, String)> = stmt
            .query_map(rusqlite::params![collection, path, value], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(id, json)| Ok(Document { id, fields: parse_fields(&json)? }))
            .collect()
    }
}

/// Build a `Fields` map from a `json!({...})` literal.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> (tempfile::TempDir, SqliteStore) {
    let (dir, conn) = crate::db::test_db();
    (dir, SqliteStore::new(conn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Seen = Rc<RefCell<Vec<Vec<String>>>>;

    fn recorder() -> (Seen, SnapshotFn) {
        let seen: Seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let cb: SnapshotFn = Box::new(move |docs: &[Document]| {
            s.borrow_mut().push(docs.iter().map(|d| d.id.clone()).collect())
        });
        (seen, cb)
    }

    #[test]
    fn test_write_and_get() {
        let (_dir, store) = test_store();
        store
            .write_document("vehicles", "v1", fields(json!({"plate": "ABC 123"})), false)
            .unwrap();
        let doc = store.get_document("vehicles", "v1").unwrap().unwrap();
        assert_eq!(doc.str_field("plate"), Some("ABC 123"));
        assert!(store.get_document("vehicles", "nope").unwrap().is_none());
    }

    #[test]
    fn test_merge_keeps_other_fields() {
        let (_dir, store) = test_store();
        store
            .write_document("system", "Status", fields(json!({"status": "Operational Mode", "message": "ok"})), false)
            .unwrap();
        store
            .write_document("system", "Status", fields(json!({"status": "Maintenance Mode"})), true)
            .unwrap();
        let doc = store.get_document("system", "Status").unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some("Maintenance Mode"));
        assert_eq!(doc.str_field("message"), Some("ok"));

        store
            .write_document("system", "Status", fields(json!({"status": "Operational Mode"})), false)
            .unwrap();
        let doc = store.get_document("system", "Status").unwrap().unwrap();
        assert!(doc.fields.get("message").is_none());
    }

    #[test]
    fn test_subscribe_delivers_current_then_each_write() {
        let (_dir, store) = test_store();
        store.write_document("transactions", "a", fields(json!({})), false).unwrap();
        let (seen, cb) = recorder();
        let _sub = store.subscribe_collection("transactions", cb, Box::new(|_| {}));
        store.write_document("transactions", "b", fields(json!({})), false).unwrap();
        store.write_document("other", "x", fields(json!({})), false).unwrap();
        store.delete_document("transactions", "a").unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], vec!["a"]);
        assert_eq!(seen[1], vec!["a", "b"]);
        assert_eq!(seen[2], vec!["b"]);
    }

    #[test]
    fn test_unsubscribe_stops_callbacks() {
        let (_dir, store) = test_store();
        let (seen, cb) = recorder();
        let mut sub = store.subscribe_collection("transactions", cb, Box::new(|_| {}));
        sub.unsubscribe();
        sub.unsubscribe();
        store.write_document("transactions", "a", fields(json!({})), false).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_corrupt_document_reports_error() {
        let (_dir, store) = test_store();
        store
            .connection()
            .execute(
                "INSERT INTO documents (collection, id, fields) VALUES ('transactions', 'bad', '[1,2]')",
                [],
            )
            .unwrap();
        let errors = Rc::new(Cell::new(0));
        let e = errors.clone();
        let (seen, cb) = recorder();
        let _sub = store.subscribe_collection(
            "transactions",
            cb,
            Box::new(move |_| e.set(e.get() + 1)),
        );
        assert_eq!(errors.get(), 1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_read_failure_ends_subscription() {
        let (_dir, store) = test_store();
        store
            .connection()
            .execute(
                "INSERT INTO documents (collection, id, fields) VALUES ('transactions', 'bad', '[1,2]')",
                [],
            )
            .unwrap();
        let errors = Rc::new(Cell::new(0));
        let e = errors.clone();
        let (seen, cb) = recorder();
        let _sub = store.subscribe_collection(
            "transactions",
            cb,
            Box::new(move |_| e.set(e.get() + 1)),
        );
        store.write_document("transactions", "x", fields(json!({})), false).unwrap();
        store.write_document("transactions", "y", fields(json!({})), false).unwrap();
        store.delete_document("transactions", "bad").unwrap();

        assert_eq!(errors.get(), 1);
        assert!(seen.borrow().is_empty());

        // A new subscription over the repaired collection works again.
        let (fresh, cb) = recorder();
        let _again = store.subscribe_collection("transactions", cb, Box::new(|_| {}));
        assert_eq!(fresh.borrow().last().unwrap(), &vec!["x", "y"]);
    }

    #[test]
    fn test_write_from_callback_leaves_everyone_on_latest() {
        let (_dir, store) = test_store();
        let store = Rc::new(store);

        let writer = Rc::downgrade(&store);
        let (a_seen, mut a_record) = recorder();
        let _a = store.subscribe_collection(
            "transactions",
            Box::new(move |docs: &[Document]| {
                a_record(docs);
                if docs.len() == 1 {
                    if let Some(s) = writer.upgrade() {
                        s.write_document("transactions", "second", fields(json!({})), false)
                            .unwrap();
                    }
                }
            }),
            Box::new(|_| {}),
        );
        let (b_seen, b_record) = recorder();
        let _b = store.subscribe_collection("transactions", b_record, Box::new(|_| {}));

        store.write_document("transactions", "first", fields(json!({})), false).unwrap();

        let latest = vec!["first", "second"];
        assert_eq!(store.list_collection("transactions").unwrap().len(), 2);
        assert_eq!(a_seen.borrow().last().unwrap(), &latest);
        assert_eq!(b_seen.borrow().last().unwrap(), &latest);
        assert_eq!(b_seen.borrow().len(), 3);
    }

    #[test]
    fn test_find_where_ignores_case() {
        let (_dir, store) = test_store();
        store
            .insert_document("users", fields(json!({"email": "Ana@Fleet.ph", "role": "Admin"})))
            .unwrap();
        store
            .insert_document("users", fields(json!({"email": "ben@fleet.ph", "role": "Cashier"})))
            .unwrap();
        let found = store.find_where("users", "email", "ana@fleet.ph").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].str_field("role"), Some("Admin"));
    }

    #[test]
    fn test_auto_id_shape() {
        let id = auto_id();
        assert_eq!(id.len(), AUTO_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, auto_id());
    }
}
