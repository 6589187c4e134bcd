use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dates::{parse_instant, BoundaryZone};
use crate::error::FleetError;
use crate::export::ExportRow;
use crate::models::{PaymentMethod, TransactionRecord};
use crate::store::{Document, DocumentStore};
use crate::subscription::Subscription;

pub const TRANSACTIONS_COLLECTION: &str = "transactions";
pub const DEFAULT_PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Build a record from raw document fields. Never fails: every malformed
/// field falls back to its default.
pub fn normalize(id: &str, raw: &Value, zone: BoundaryZone) -> TransactionRecord {
    let text = |key: &str| {
        raw.get(key)
            .and_then(value_as_text)
            .filter(|s| !s.trim().is_empty())
    };
    TransactionRecord {
        id: id.to_string(),
        timestamp: raw.get("timestamp").and_then(|v| parse_instant(v, zone)),
        fare_price: raw.get("farePrice").map(parse_fare).unwrap_or(0.0),
        payment_method: PaymentMethod::parse(
            raw.get("paymentMethod").and_then(Value::as_str).unwrap_or(""),
        ),
        is_voided: raw.get("isVoided").and_then(Value::as_bool).unwrap_or(false),
        pick_up: text("pickUp"),
        drop_off: text("dropOff"),
        driver_name: text("driverName"),
        invoice_num: text("invoiceNum"),
    }
}

pub fn normalize_documents(docs: &[Document], zone: BoundaryZone) -> Vec<TransactionRecord> {
    docs.iter()
        .map(|d| normalize(&d.id, &Value::Object(d.fields.clone()), zone))
        .collect()
}

fn value_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fares arrive as numbers or numeric strings. Anything unparseable,
/// negative or non-finite counts as zero.
pub fn parse_fare(v: &Value) -> f64 {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s.trim()),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() && f > 0.0 => f,
        _ => 0.0,
    }
}

/// Parse the longest numeric prefix, so `"25.50 PHP"` reads as 25.5.
fn leading_number(s: &str) -> Option<f64> {
    if let Ok(f) = s.parse::<f64>() {
        return Some(f);
    }
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// Date filter
// ---------------------------------------------------------------------------

/// Inclusive calendar-date window. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn is_open(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn label(&self) -> String {
        match (self.start_date, self.end_date) {
            (None, None) => "All dates".to_string(),
            (Some(s), None) => format!("From {s}"),
            (None, Some(e)) => format!("Through {e}"),
            (Some(s), Some(e)) if s == e => s.to_string(),
            (Some(s), Some(e)) => format!("{s} to {e}"),
        }
    }
}

/// Keep the records inside `filter`. With no bounds every record is kept,
/// including those without a timestamp; with any bound those are dropped.
pub fn filter_by_date_range(
    records: &[TransactionRecord],
    filter: &ReportFilter,
    zone: BoundaryZone,
) -> Vec<TransactionRecord> {
    if filter.is_open() {
        return records.to_vec();
    }
    let start = filter.start_date.map(|d| zone.start_of_day(d));
    let end = filter.end_date.map(|d| zone.end_of_day(d));
    records
        .iter()
        .filter(|r| match r.timestamp {
            Some(ts) => start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e),
            None => false,
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportStats {
    pub total_fare: f64,
    pub total_tickets: usize,
    pub cash_payments: usize,
    pub card_payments: usize,
    pub cash_amount: f64,
    pub card_amount: f64,
    pub voided_tickets: usize,
}

impl ReportStats {
    /// Tickets sold with a method other than cash or card.
    pub fn other_payments(&self) -> usize {
        self.total_tickets - self.cash_payments - self.card_payments
    }
}

/// Voided tickets are only counted; they contribute no fare and no payment
/// tally. Unknown payment methods count toward tickets and fare only.
pub fn compute_stats(records: &[TransactionRecord]) -> ReportStats {
    let mut stats = ReportStats::default();
    for r in records {
        if r.is_voided {
            stats.voided_tickets += 1;
            continue;
        }
        stats.total_tickets += 1;
        stats.total_fare += r.fare_price;
        match r.payment_method {
            PaymentMethod::Cash => {
                stats.cash_payments += 1;
                stats.cash_amount += r.fare_price;
            }
            PaymentMethod::Card => {
                stats.card_payments += 1;
                stats.card_amount += r.fare_price;
            }
            PaymentMethod::Other(_) => {}
        }
    }
    stats
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Last valid 1-based page for `len` items, or `None` when there are none.
fn last_page(len: usize, page_size: usize) -> Option<usize> {
    (len > 0).then(|| len.div_ceil(page_size))
}

/// Slice out 1-based `page`. A page past the end yields the last page; a
/// page of zero yields the first.
pub fn paginate<T>(records: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let Some(last) = last_page(records.len(), page_size) else {
        return &records[..0];
    };
    let page = page.clamp(1, last);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(records.len());
    &records[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn has_next(&self, len: usize) -> bool {
        self.page * self.page_size < len
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&mut self, len: usize) {
        if self.has_next(len) {
            self.page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        if self.has_previous() {
            self.page -= 1;
        }
    }

    /// Pull the page back inside `len` items. An empty list leaves it alone.
    pub fn clamp(&mut self, len: usize) {
        if let Some(last) = last_page(len, self.page_size) {
            self.page = self.page.clamp(1, last);
        }
    }

    pub fn page_count(&self, len: usize) -> usize {
        last_page(len, self.page_size).unwrap_or(1)
    }
}

// ---------------------------------------------------------------------------
// Report view
// ---------------------------------------------------------------------------

/// Newest first; records without a timestamp sink to the end.
fn newest_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// State behind one transaction report screen: the latest snapshot, the date
/// filter and the page. Everything shown is derived from those three.
#[derive(Debug)]
pub struct ReportView {
    zone: BoundaryZone,
    records: Vec<TransactionRecord>,
    filter: ReportFilter,
    pager: Pager,
    loading: bool,
    error: Option<String>,
}

impl ReportView {
    pub fn new(zone: BoundaryZone, page_size: usize) -> Self {
        Self {
            zone,
            records: Vec::new(),
            filter: ReportFilter::default(),
            pager: Pager::new(page_size),
            loading: true,
            error: None,
        }
    }

    /// Replace the snapshot wholesale.
    pub fn apply_snapshot(&mut self, docs: &[Document]) {
        let mut records = normalize_documents(docs, self.zone);
        records.sort_by(newest_first);
        debug!(count = records.len(), "report snapshot applied");
        self.records = records;
        self.loading = false;
        self.error = None;
        self.clamp_page();
    }

    /// Record a failed delivery. Whatever was shown before stays visible.
    pub fn apply_error(&mut self, err: &FleetError) {
        warn!(error = %err, "report data unavailable");
        self.loading = false;
        self.error = Some(err.to_string());
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<FleetError> {
        self.error.clone().map(FleetError::DataFetch)
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn filter(&self) -> ReportFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ReportFilter) {
        self.filter = filter;
        self.clamp_page();
    }

    pub fn reset_filters(&mut self) {
        self.set_filter(ReportFilter::default());
    }

    pub fn filtered(&self) -> Vec<TransactionRecord> {
        filter_by_date_range(&self.records, &self.filter, self.zone)
    }

    pub fn stats(&self) -> ReportStats {
        compute_stats(&self.filtered())
    }

    pub fn page(&self) -> usize {
        self.pager.page()
    }

    pub fn page_count(&self) -> usize {
        self.pager.page_count(self.filtered().len())
    }

    pub fn set_page(&mut self, page: usize) {
        self.pager.set_page(page);
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        let len = self.filtered().len();
        self.pager.next_page(len);
    }

    pub fn previous_page(&mut self) {
        self.pager.previous_page();
    }

    pub fn current_page(&self) -> Vec<TransactionRecord> {
        let filtered = self.filtered();
        paginate(&filtered, self.pager.page(), self.pager.page_size()).to_vec()
    }

    /// The whole filtered list, numbered from 1, ready for an exporter.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.filtered()
            .iter()
            .enumerate()
            .map(|(i, r)| ExportRow::from_record(i + 1, r, self.zone))
            .collect()
    }

    fn clamp_page(&mut self) {
        let len = self.filtered().len();
        self.pager.clamp(len);
    }

    /// Feed `view` from a live collection until the returned subscription is
    /// released.
    pub fn attach<S>(view: &Rc<RefCell<ReportView>>, store: &S, collection: &str) -> Subscription
    where
        S: DocumentStore + ?Sized,
    {
        let on_snapshot = Rc::downgrade(view);
        let on_error = Rc::downgrade(view);
        store.subscribe_collection(
            collection,
            Box::new(move |docs| {
                if let Some(v) = on_snapshot.upgrade() {
                    v.borrow_mut().apply_snapshot(docs);
                }
            }),
            Box::new(move |err| {
                if let Some(v) = on_error.upgrade() {
                    v.borrow_mut().apply_error(err);
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{fields, test_store};
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn utc() -> BoundaryZone {
        BoundaryZone::utc()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(fare: f64, method: &str, voided: bool) -> TransactionRecord {
        normalize(
            "t",
            &json!({"farePrice": fare, "paymentMethod": method, "isVoided": voided}),
            utc(),
        )
    }

    fn at(id: &str, ts: &str) -> TransactionRecord {
        normalize(id, &json!({"timestamp": ts, "farePrice": 10, "paymentMethod": "Cash"}), utc())
    }

    fn ids(records: &[TransactionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_normalize_defaults() {
        let r = normalize("x1", &json!({}), utc());
        assert_eq!(r.id, "x1");
        assert!(r.timestamp.is_none());
        assert_eq!(r.fare_price, 0.0);
        assert_eq!(r.payment_method, PaymentMethod::Other(String::new()));
        assert!(!r.is_voided);
        assert_eq!(r.pick_up_or_placeholder(), "N/A");
        assert_eq!(r.invoice_or_placeholder(), "N/A");
    }

    #[test]
    fn test_normalize_full_record() {
        let r = normalize(
            "x2",
            &json!({
                "timestamp": {"seconds": 1_704_931_140, "nanoseconds": 0},
                "farePrice": "45.50",
                "paymentMethod": "Card",
                "isVoided": false,
                "pickUp": "Cubao",
                "dropOff": "Ortigas",
                "driverName": "R. Santos",
                "invoiceNum": 10023,
            }),
            utc(),
        );
        assert_eq!(r.timestamp.map(|t| t.to_rfc3339()).as_deref(), Some("2024-01-10T23:59:00+00:00"));
        assert_eq!(r.fare_price, 45.5);
        assert_eq!(r.payment_method, PaymentMethod::Card);
        assert_eq!(r.pick_up.as_deref(), Some("Cubao"));
        assert_eq!(r.driver_or_placeholder(), "R. Santos");
        assert_eq!(r.invoice_num.as_deref(), Some("10023"));
    }

    #[test]
    fn test_fare_parsing() {
        assert_eq!(parse_fare(&json!("abc")), 0.0);
        assert_eq!(parse_fare(&json!("")), 0.0);
        assert_eq!(parse_fare(&json!(null)), 0.0);
        assert_eq!(parse_fare(&json!(-20)), 0.0);
        assert_eq!(parse_fare(&json!("13")), 13.0);
        assert_eq!(parse_fare(&json!(" 12.75 ")), 12.75);
        assert_eq!(parse_fare(&json!("25.50 PHP")), 25.5);
        assert_eq!(parse_fare(&json!("NaN")), 0.0);
        assert_eq!(parse_fare(&json!("inf")), 0.0);
    }

    #[test]
    fn test_stats_scenario() {
        let records = vec![
            rec(100.0, "Cash", false),
            rec(50.0, "Card", false),
            rec(75.0, "Cash", true),
        ];
        let stats = compute_stats(&records);
        assert_eq!(
            stats,
            ReportStats {
                total_fare: 150.0,
                total_tickets: 2,
                cash_payments: 1,
                card_payments: 1,
                cash_amount: 100.0,
                card_amount: 50.0,
                voided_tickets: 1,
            }
        );
    }

    #[test]
    fn test_garbage_fare_still_counts_ticket() {
        let r = normalize("g", &json!({"farePrice": "abc", "paymentMethod": "Cash"}), utc());
        let stats = compute_stats(&[r, rec(20.0, "Cash", false)]);
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.total_fare, 20.0);
        assert_eq!(stats.cash_payments, 2);
    }

    #[test]
    fn test_other_methods_count_toward_totals_only() {
        let records = vec![
            rec(30.0, "GCash", false),
            rec(20.0, "Cash", false),
            rec(10.0, "Card", true),
        ];
        let stats = compute_stats(&records);
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.total_fare, 50.0);
        assert_eq!(stats.other_payments(), 1);
        assert!(stats.cash_amount + stats.card_amount < stats.total_fare);
        assert_eq!(stats.total_tickets + stats.voided_tickets, records.len());
    }

    #[test]
    fn test_ticket_accounting_invariant() {
        let methods = ["Cash", "Card", "", "Cheque"];
        let records: Vec<_> = (0..37)
            .map(|i| rec(i as f64 * 1.5, methods[i % 4], i % 5 == 0))
            .collect();
        let stats = compute_stats(&records);
        assert_eq!(stats.total_tickets + stats.voided_tickets, records.len());
        assert!(stats.cash_amount + stats.card_amount <= stats.total_fare);
    }

    #[test]
    fn test_same_day_window_is_inclusive_through_end_of_day() {
        let records = vec![
            at("in", "2024-01-10T23:59:00"),
            at("out", "2024-01-11T00:00:01"),
            at("before", "2024-01-09T23:59:59"),
        ];
        let f = ReportFilter::new(Some(date("2024-01-10")), Some(date("2024-01-10")));
        assert_eq!(ids(&filter_by_date_range(&records, &f, utc())), vec!["in"]);
    }

    #[test]
    fn test_half_open_windows() {
        let records = vec![
            at("a", "2024-01-05T10:00:00"),
            at("b", "2024-01-10T00:00:00"),
            at("c", "2024-01-20T23:59:59.999"),
        ];
        let from = ReportFilter::new(Some(date("2024-01-10")), None);
        assert_eq!(ids(&filter_by_date_range(&records, &from, utc())), vec!["b", "c"]);
        let through = ReportFilter::new(None, Some(date("2024-01-10")));
        assert_eq!(ids(&filter_by_date_range(&records, &through, utc())), vec!["a", "b"]);
    }

    #[test]
    fn test_open_filter_returns_everything() {
        let records = vec![at("a", "2024-01-05T10:00:00"), normalize("undated", &json!({}), utc())];
        let all = filter_by_date_range(&records, &ReportFilter::default(), utc());
        assert_eq!(all, records);

        let windowed = ReportFilter::new(Some(date("2000-01-01")), None);
        assert_eq!(ids(&filter_by_date_range(&records, &windowed, utc())), vec!["a"]);
    }

    #[test]
    fn test_filter_respects_zone() {
        // 2024-01-10T17:00Z is already the 11th in Manila.
        let records = vec![at("late", "2024-01-10T17:00:00Z")];
        let manila = BoundaryZone::Fixed(chrono::FixedOffset::east_opt(8 * 3600).unwrap());
        let day10 = ReportFilter::new(Some(date("2024-01-10")), Some(date("2024-01-10")));
        assert_eq!(filter_by_date_range(&records, &day10, utc()).len(), 1);
        assert_eq!(filter_by_date_range(&records, &day10, manila).len(), 0);
    }

    #[test]
    fn test_paginate_bounds() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(paginate(&items, 1, 10), &items[0..10]);
        assert_eq!(paginate(&items, 3, 10), &items[20..25]);
        assert_eq!(paginate(&items, 9, 10), &items[20..25]);
        assert_eq!(paginate(&items, 0, 10), &items[0..10]);
        assert_eq!(paginate(&items, 2, 10), paginate(&items, 2, 10));
        let empty: Vec<u32> = Vec::new();
        assert!(paginate(&empty, 4, 10).is_empty());
    }

    #[test]
    fn test_pager_navigation_guards() {
        let mut p = Pager::new(10);
        p.previous_page();
        assert_eq!(p.page(), 1);
        p.next_page(25);
        p.next_page(25);
        assert_eq!(p.page(), 3);
        p.next_page(25);
        assert_eq!(p.page(), 3);
        p.next_page(30);
        assert_eq!(p.page(), 3);
        p.clamp(11);
        assert_eq!(p.page(), 2);
        p.clamp(0);
        assert_eq!(p.page(), 2);
        assert_eq!(p.page_count(0), 1);
        assert_eq!(p.page_count(21), 3);
    }

    fn txn_docs() -> Vec<Document> {
        vec![
            Document {
                id: "old".into(),
                fields: fields(json!({"timestamp": "2024-01-01T08:00:00Z", "farePrice": 15, "paymentMethod": "Cash"})),
            },
            Document {
                id: "new".into(),
                fields: fields(json!({"timestamp": "2024-01-03T08:00:00Z", "farePrice": "20", "paymentMethod": "Card"})),
            },
            Document {
                id: "void".into(),
                fields: fields(json!({"timestamp": "2024-01-02T08:00:00Z", "farePrice": 99, "paymentMethod": "Cash", "isVoided": true})),
            },
            Document {
                id: "undated".into(),
                fields: fields(json!({"farePrice": 5, "paymentMethod": "Cash"})),
            },
        ]
    }

    #[test]
    fn test_view_sorts_and_derives() {
        let mut view = ReportView::new(utc(), 2);
        assert!(view.is_loading());
        view.apply_snapshot(&txn_docs());
        assert!(!view.is_loading());
        assert_eq!(ids(view.records()), vec!["new", "void", "old", "undated"]);
        assert_eq!(ids(&view.current_page()), vec!["new", "void"]);
        view.next_page();
        assert_eq!(ids(&view.current_page()), vec!["old", "undated"]);
        view.next_page();
        assert_eq!(view.page(), 2);

        let stats = view.stats();
        assert_eq!(stats.total_tickets, 3);
        assert_eq!(stats.voided_tickets, 1);
        assert_eq!(stats.total_fare, 40.0);
        assert_eq!(view.stats(), stats);
    }

    #[test]
    fn test_view_filter_clamps_page() {
        let mut view = ReportView::new(utc(), 2);
        view.apply_snapshot(&txn_docs());
        view.set_page(2);
        view.set_filter(ReportFilter::new(Some(date("2024-01-03")), None));
        assert_eq!(view.page(), 1);
        assert_eq!(ids(&view.current_page()), vec!["new"]);
        view.reset_filters();
        assert_eq!(view.filtered().len(), 4);
    }

    #[test]
    fn test_view_empty_filter_keeps_page() {
        let mut view = ReportView::new(utc(), 2);
        view.apply_snapshot(&txn_docs());
        view.set_page(2);
        view.set_filter(ReportFilter::new(Some(date("2030-01-01")), None));
        assert!(view.current_page().is_empty());
        assert_eq!(view.page(), 2);
        view.previous_page();
        assert_eq!(view.page(), 1);
        view.previous_page();
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_view_error_keeps_prior_data() {
        let mut view = ReportView::new(utc(), 10);
        view.apply_snapshot(&txn_docs());
        view.apply_error(&FleetError::Other("connection reset".into()));
        assert_eq!(view.records().len(), 4);
        let err = view.error().unwrap();
        assert!(err.to_string().contains("connection reset"), "got: {err}");

        view.apply_snapshot(&txn_docs()[..1]);
        assert!(view.error().is_none());
        assert_eq!(view.records().len(), 1);
    }

    #[test]
    fn test_export_rows_are_numbered_from_filtered() {
        let mut view = ReportView::new(utc(), 1);
        view.apply_snapshot(&txn_docs());
        view.set_filter(ReportFilter::new(Some(date("2024-01-02")), Some(date("2024-01-03"))));
        let rows = view.export_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 1);
        assert_eq!(rows[1].number, 2);
        assert_eq!(rows[1].status, "Voided");
    }

    #[test]
    fn test_attach_follows_live_collection() {
        let (_dir, store) = test_store();
        let view = Rc::new(RefCell::new(ReportView::new(utc(), 10)));
        let mut sub = ReportView::attach(&view, &store, TRANSACTIONS_COLLECTION);
        assert!(!view.borrow().is_loading());
        assert!(view.borrow().records().is_empty());

        store
            .write_document(
                TRANSACTIONS_COLLECTION,
                "t1",
                fields(json!({"timestamp": "2024-01-10T09:00:00Z", "farePrice": 13, "paymentMethod": "Cash"})),
                false,
            )
            .unwrap();
        assert_eq!(view.borrow().stats().total_fare, 13.0);

        sub.unsubscribe();
        store
            .write_document(TRANSACTIONS_COLLECTION, "t2", fields(json!({"farePrice": 50})), false)
            .unwrap();
        assert_eq!(view.borrow().records().len(), 1);
    }

    #[test]
    fn test_timestamps_compare_as_instants() {
        let a: DateTime<Utc> = "2024-01-10T00:00:00Z".parse().unwrap();
        let r = normalize("n", &json!({"timestamp": 1_704_844_800_000i64}), utc());
        assert_eq!(r.timestamp, Some(a));
    }
}
