use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sql_mapper::prelude::*;
use sql_mapper::{ResultSet, ResultSetCursor, ScanTarget, parse_db_result};

fn result_set(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let mut rs = ResultSet::new(columns.iter().map(|c| (*c).to_string()).collect());
    for row in rows {
        rs.add_row_values(row).expect("row width matches columns");
    }
    rs
}

/// Cursor that counts how often it was closed.
struct TrackingCursor {
    inner: ResultSetCursor,
    closes: Arc<AtomicUsize>,
}

impl RowCursor for TrackingCursor {
    fn column_names(&mut self) -> Result<Vec<String>, SqlMapperDbError> {
        self.inner.column_names()
    }

    fn next_row(&mut self) -> bool {
        self.inner.next_row()
    }

    fn scan_into(&mut self, dest: &mut [&mut dyn ScanTarget]) -> Result<(), SqlMapperDbError> {
        self.inner.scan_into(dest)
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }

    fn terminal_error(&mut self) -> Option<SqlMapperDbError> {
        self.inner.terminal_error()
    }
}

/// Session that replays one canned result for every query.
struct CannedSession {
    columns: Vec<&'static str>,
    rows: Vec<Vec<RowValues>>,
    terminal: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl CannedSession {
    fn new(columns: &[&'static str], rows: Vec<Vec<RowValues>>) -> Self {
        Self {
            columns: columns.to_vec(),
            rows,
            terminal: None,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_after_rows(mut self, message: &str) -> Self {
        self.terminal = Some(message.to_string());
        self
    }

    fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Session for CannedSession {
    fn query_context<'s>(
        &'s self,
        _ctx: &CancellationToken,
        _query: &str,
        _args: &[RowValues],
    ) -> Result<Box<dyn RowCursor + 's>, SqlMapperDbError> {
        let mut inner = ResultSetCursor::new(result_set(&self.columns, self.rows.clone()));
        if let Some(message) = &self.terminal {
            inner = inner.with_terminal_error(SqlMapperDbError::ConnectionError(message.clone()));
        }
        Ok(Box::new(TrackingCursor {
            inner,
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct UnreachableSession;

impl Session for UnreachableSession {
    fn query_context<'s>(
        &'s self,
        _ctx: &CancellationToken,
        _query: &str,
        _args: &[RowValues],
    ) -> Result<Box<dyn RowCursor + 's>, SqlMapperDbError> {
        Err(SqlMapperDbError::ConnectionError("connection refused".into()))
    }
}

#[derive(Debug, Default, PartialEq)]
struct User {
    id: i64,
    name: String,
}
impl_record!(User { id => "id", name => "name" });

#[derive(Debug, Default, PartialEq)]
struct Address {
    street: String,
}
impl_record!(Address { street });

#[derive(Debug, Default, PartialEq)]
struct Customer {
    id: i64,
    address: Address,
}
impl_record!(Customer { id, address => "address" });

#[derive(Debug, Default, PartialEq)]
struct Audit {
    created_by: String,
    revision: i32,
}
impl_record!(Audit { created_by, revision });

#[derive(Debug, Default, PartialEq)]
struct Document {
    id: i64,
    title: String,
    audit: Audit,
}
impl_record!(Document { id, title, ..audit });

#[derive(Debug, Default, PartialEq)]
struct Coordinates {
    lat: f64,
}
impl_record!(Coordinates { lat });

#[derive(Debug, Default, PartialEq)]
struct Site {
    coords: Coordinates,
}
impl_record!(Site { coords });

#[derive(Debug, Default, PartialEq)]
struct Region {
    name: String,
    site: Site,
}
impl_record!(Region { name, site => "main" });

#[derive(Debug, Default, PartialEq)]
struct Unmapped {
    value: i64,
}
impl_record!(Unmapped {});

#[derive(Debug, Default, PartialEq)]
#[allow(non_snake_case)]
struct Account {
    Email: String,
    Handle: String,
    nickname: Option<String>,
}
impl_record!(Account { Email, Handle => "UserName", nickname });

#[test]
fn rows_map_in_cursor_order() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "name"],
        vec![
            vec![RowValues::Int(1), RowValues::Text("a".into())],
            vec![RowValues::Int(2), RowValues::Text("b".into())],
        ],
    );
    let users: Vec<User> = query(&ctx, &session, "SELECT id, name FROM users", &[])?;
    assert_eq!(
        users,
        vec![
            User {
                id: 1,
                name: "a".into()
            },
            User {
                id: 2,
                name: "b".into()
            },
        ]
    );
    assert_eq!(session.close_count(), 1);
    Ok(())
}

#[test]
fn nested_record_columns_are_prefixed() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "address_street"],
        vec![vec![RowValues::Int(1), RowValues::Text("Main St".into())]],
    );
    let customers: Vec<Customer> = query(&ctx, &session, "SELECT ...", &[])?;
    assert_eq!(
        customers,
        vec![Customer {
            id: 1,
            address: Address {
                street: "Main St".into()
            }
        }]
    );
    Ok(())
}

#[test]
fn prefixes_compose_through_several_levels() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["name", "main_coords_lat", "coords_lat", "lat"],
        vec![vec![
            RowValues::Text("north".into()),
            RowValues::Float(59.9),
            RowValues::Float(1.0),
            RowValues::Float(2.0),
        ]],
    );
    let regions: Vec<Region> = query(&ctx, &session, "SELECT ...", &[])?;
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].name, "north");
    assert!((regions[0].site.coords.lat - 59.9).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn embedded_record_binds_without_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "title", "created_by", "revision", "audit_created_by"],
        vec![vec![
            RowValues::Int(7),
            RowValues::Text("Quarterly report".into()),
            RowValues::Text("ada".into()),
            RowValues::Int(3),
            RowValues::Text("should not bind".into()),
        ]],
    );
    let docs: Vec<Document> = query(&ctx, &session, "SELECT ...", &[])?;
    assert_eq!(
        docs,
        vec![Document {
            id: 7,
            title: "Quarterly report".into(),
            audit: Audit {
                created_by: "ada".into(),
                revision: 3
            }
        }]
    );
    Ok(())
}

#[test]
fn unmapped_columns_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["extra_blob", "id", "surprise", "name"],
        vec![vec![
            RowValues::Blob(vec![0xde, 0xad]),
            RowValues::Int(5),
            RowValues::Null,
            RowValues::Text("e".into()),
        ]],
    );
    let users: Vec<User> = query(&ctx, &session, "SELECT *", &[])?;
    assert_eq!(
        users,
        vec![User {
            id: 5,
            name: "e".into()
        }]
    );
    Ok(())
}

#[test]
fn repeated_column_takes_the_last_value() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "name", "id"],
        vec![vec![
            RowValues::Int(1),
            RowValues::Text("joined".into()),
            RowValues::Int(2),
        ]],
    );
    let users: Vec<User> = query(&ctx, &session, "SELECT a.id, a.name, b.id", &[])?;
    assert_eq!(
        users,
        vec![User {
            id: 2,
            name: "joined".into()
        }]
    );

    // earlier repeats are dropped unread, so their type does not matter
    let mut cursor = ResultSetCursor::new(result_set(
        &["id", "id"],
        vec![vec![RowValues::Text("not a number".into()), RowValues::Int(7)]],
    ));
    let users: Vec<User> = parse_db_result(&mut cursor)?;
    assert_eq!(users[0].id, 7);
    Ok(())
}

#[test]
fn missing_columns_leave_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(&["name"], vec![vec![RowValues::Text("only".into())]]);
    let users: Vec<User> = query(&ctx, &session, "SELECT name", &[])?;
    assert_eq!(
        users,
        vec![User {
            id: 0,
            name: "only".into()
        }]
    );
    Ok(())
}

#[test]
fn zero_rows_is_an_empty_vec() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(&["id", "name"], Vec::new());
    let users: Vec<User> = query(&ctx, &session, "SELECT id, name", &[])?;
    assert!(users.is_empty());
    Ok(())
}

#[test]
fn record_without_mapped_fields_yields_defaults_per_row() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["value"],
        vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
    );
    let rows: Vec<Unmapped> = query(&ctx, &session, "SELECT value", &[])?;
    assert_eq!(rows, vec![Unmapped::default(), Unmapped::default()]);
    Ok(())
}

#[test]
fn tags_are_case_sensitive_and_defaults_are_lowercased() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["email", "Email", "username", "UserName", "nickname"],
        vec![vec![
            RowValues::Text("lower@example.com".into()),
            RowValues::Text("Upper@example.com".into()),
            RowValues::Text("wrong".into()),
            RowValues::Text("right".into()),
            RowValues::Null,
        ]],
    );
    let accounts: Vec<Account> = query(&ctx, &session, "SELECT ...", &[])?;
    assert_eq!(
        accounts,
        vec![Account {
            Email: "lower@example.com".into(),
            Handle: "right".into(),
            nickname: None,
        }]
    );
    Ok(())
}

#[test]
fn scan_failure_aborts_without_partial_results_and_closes_cursor() {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "name"],
        vec![
            vec![RowValues::Int(1), RowValues::Text("ok".into())],
            vec![RowValues::Text("not a number".into()), RowValues::Text("bad".into())],
            vec![RowValues::Int(3), RowValues::Text("never".into())],
        ],
    );
    let result: Result<Vec<User>, _> = query(&ctx, &session, "SELECT id, name", &[]);
    let err = result.expect_err("text cannot scan into i64");
    assert!(err.is_mapping_error(), "unexpected error: {err}");
    assert_eq!(session.close_count(), 1);
}

#[test]
fn terminal_cursor_error_is_surfaced() {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "name"],
        vec![vec![RowValues::Int(1), RowValues::Text("a".into())]],
    )
    .failing_after_rows("connection reset");
    let result: Result<Vec<User>, _> = query(&ctx, &session, "SELECT id, name", &[]);
    match result {
        Err(SqlMapperDbError::ConnectionError(msg)) => assert_eq!(msg, "connection reset"),
        other => panic!("expected terminal error, got {other:?}"),
    }
    assert_eq!(session.close_count(), 1);
}

#[test]
fn session_errors_propagate_unchanged() {
    let ctx = CancellationToken::new();
    let result: Result<Vec<User>, _> = query(&ctx, &UnreachableSession, "SELECT 1", &[]);
    assert!(matches!(
        result,
        Err(SqlMapperDbError::ConnectionError(msg)) if msg == "connection refused"
    ));
}

#[test]
fn parse_db_result_drains_a_cursor_directly() -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = ResultSetCursor::new(result_set(
        &["id", "name"],
        vec![vec![RowValues::Int(9), RowValues::Text("direct".into())]],
    ));
    let users: Vec<User> = parse_db_result(&mut cursor)?;
    assert_eq!(users[0].name, "direct");
    assert!(!cursor.next_row());
    Ok(())
}

#[test]
fn same_shape_and_columns_bind_identically() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = CancellationToken::new();
    let session = CannedSession::new(
        &["id", "title", "created_by", "revision"],
        vec![vec![
            RowValues::Int(1),
            RowValues::Text("t".into()),
            RowValues::Text("c".into()),
            RowValues::Int(2),
        ]],
    );
    let first: Vec<Document> = query(&ctx, &session, "SELECT ...", &[])?;
    let second: Vec<Document> = query(&ctx, &session, "SELECT ...", &[])?;
    assert_eq!(first, second);
    Ok(())
}
