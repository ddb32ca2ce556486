/// SqliteHelper Facade Module
///
/// The public surface of the crate: a handle that owns one rusqlite
/// connection and exposes table-existence checks, table creation, CRUD
/// operations, raw execution and transaction control, keyed by table name,
/// field list and value sequences.
///
/// Every operation returns a bool success indicator and maintains the
/// last-error / last-SQL diagnostic state; failures never panic and never
/// cross the boundary as errors. Internals use the crate `Result` type and
/// convert once, here.
///
/// The helper is strictly single-threaded and synchronous: one live result
/// cursor per handle, invalidated whenever the next statement is issued.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rusqlite::{Connection, ToSql};
use tracing::{debug, error};

use crate::builder;
use crate::core::{Result, SqlitekitError};
use crate::schema;
use crate::value::Value;

/// Process-wide registry of open connection names.
///
/// `open` takes a connection name so that multiple helpers in the same
/// process can be told apart; the registry enforces that a name is only
/// in use by one open helper at a time.
static OPEN_CONNECTIONS: Lazy<Mutex<HashSet<String>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

/// The materialized result of the most recent select.
///
/// A result set is stamped with the statement generation it was produced
/// under. Issuing any further statement on the same helper bumps the
/// generation, after which the cursor is stale and `rows()`/`size()` report
/// it as empty instead of serving outdated data.
#[derive(Debug, Clone)]
pub struct ResultSet {
    /// Field names, in the caller-requested order
    pub fields: Vec<String>,
    /// Row values, one `Vec<Value>` per row, in field order
    pub rows: Vec<Vec<Value>>,
    generation: u64,
}

/// A convenience wrapper around a single synchronous SQLite connection.
///
/// Lifecycle: `Closed` (initial) -> `Open` (after a successful [`open`]) ->
/// `Closed` again (after [`close`] or drop). Data operations invoked while
/// closed fail and record a connection error; they never panic.
///
/// [`open`]: SqliteHelper::open
/// [`close`]: SqliteHelper::close
#[derive(Debug)]
pub struct SqliteHelper {
    conn: Option<Connection>,
    connect_name: String,
    last_error: String,
    last_sql: String,
    generation: u64,
    result: Option<ResultSet>,
}

impl SqliteHelper {
    /// Creates a helper in the closed state.
    pub fn new() -> Self {
        SqliteHelper {
            conn: None,
            connect_name: String::new(),
            last_error: String::new(),
            last_sql: String::new(),
            generation: 0,
            result: None,
        }
    }

    /// Opens a database file (or `":memory:"`) under the given connection
    /// name and registers the name process-wide.
    ///
    /// Fails if this helper is already open, if the name is already in use
    /// by another open helper, or if the driver cannot open the file.
    pub fn open(&mut self, db_path: &str, connect_name: &str) -> bool {
        let outcome = (|| -> Result<Connection> {
            if self.conn.is_some() {
                return Err(SqlitekitError::Connection(format!(
                    "connection '{}' is already open",
                    self.connect_name
                )));
            }
            let mut registry = OPEN_CONNECTIONS.lock().map_err(|_| {
                SqlitekitError::Connection("connection registry lock poisoned".to_string())
            })?;
            if !registry.insert(connect_name.to_string()) {
                return Err(SqlitekitError::Connection(format!(
                    "connection name '{}' is already in use",
                    connect_name
                )));
            }
            match Connection::open(db_path) {
                Ok(conn) => Ok(conn),
                Err(e) => {
                    registry.remove(connect_name);
                    Err(e.into())
                }
            }
        })();

        match outcome {
            Ok(conn) => {
                self.conn = Some(conn);
                self.connect_name = connect_name.to_string();
                self.last_error.clear();
                debug!(name = %connect_name, path = %db_path, "opened connection");
                true
            }
            Err(e) => {
                error!(name = %connect_name, path = %db_path, error = %e, "open failed");
                self.last_error = e.to_string();
                false
            }
        }
    }

    /// Closes the connection and unregisters its name. Idempotent; also
    /// invalidates the current result cursor.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn);
            if let Ok(mut registry) = OPEN_CONNECTIONS.lock() {
                registry.remove(&self.connect_name);
            }
            debug!(name = %self.connect_name, "closed connection");
        }
        self.generation += 1;
        self.result = None;
    }

    /// The connection name passed to the most recent successful [`open`].
    ///
    /// [`open`]: SqliteHelper::open
    pub fn connect_name(&self) -> &str {
        &self.connect_name
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Checks whether a table exists, by exact case-sensitive name match
    /// against the catalog. Side-effect-free: the diagnostic state of the
    /// helper is left untouched.
    pub fn is_exist_table(&self, table: &str) -> bool {
        match self.conn.as_ref() {
            Some(conn) => schema::table_exists(conn, table).unwrap_or(false),
            None => false,
        }
    }

    /// Returns the column names of a table, or `None` on failure (table
    /// missing, connection closed). Failures set the last-error state.
    pub fn table_fields(&mut self, table: &str) -> Option<Vec<String>> {
        let outcome = self
            .connection()
            .and_then(|conn| schema::table_columns(conn, table));
        match outcome {
            Ok(columns) => {
                self.last_error.clear();
                Some(columns)
            }
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    /// Creates a table from ordered `(name, sql_type)` field descriptors and
    /// an optional composite primary key.
    ///
    /// Columns are emitted in slice order, but callers must not rely on the
    /// physical column order of the created table. Fails gracefully if the
    /// table already exists.
    pub fn create_table(
        &mut self,
        table: &str,
        fields: &[(&str, &str)],
        primary_keys: &[&str],
    ) -> bool {
        let sql = builder::create_table_sql(table, fields, primary_keys);
        self.generation += 1;
        let outcome = (|| -> Result<()> {
            if fields.is_empty() {
                return Err(SqlitekitError::Query(
                    "create_table requires at least one field".to_string(),
                ));
            }
            let conn = self.connection()?;
            if schema::table_exists(conn, table)? {
                return Err(SqlitekitError::Schema(format!(
                    "table '{}' already exists",
                    table
                )));
            }
            conn.execute_batch(&sql)?;
            Ok(())
        })();
        self.finish(sql, outcome)
    }

    /// Selects the given fields from a single table, no filter.
    ///
    /// On success the rows are available through [`rows`] and [`size`]
    /// until the next statement is issued; on failure the cursor is cleared
    /// and no partial rows are exposed.
    ///
    /// [`rows`]: SqliteHelper::rows
    /// [`size`]: SqliteHelper::size
    pub fn select_data(&mut self, table: &str, fields: &[&str]) -> bool {
        self.select_data_where(table, fields, &[])
    }

    /// Selects the given fields from a single table with an implicit-AND
    /// equality filter. Where values are bound positionally in slice order.
    ///
    /// The table and every referenced field (selected and filtered) are
    /// validated against the catalog before execution. Output rows carry
    /// values in the requested `fields` order: each value is extracted from
    /// the result row by name, not by position.
    pub fn select_data_where(
        &mut self,
        table: &str,
        fields: &[&str],
        where_conditions: &[(&str, Value)],
    ) -> bool {
        let where_fields: Vec<&str> = where_conditions.iter().map(|(k, _)| *k).collect();
        let sql = builder::select_sql(table, fields, &where_fields);
        self.generation += 1;
        let outcome = (|| -> Result<Vec<Vec<Value>>> {
            let conn = self.connection()?;
            let mut referenced: Vec<&str> = fields.to_vec();
            referenced.extend_from_slice(&where_fields);
            schema::check_table(conn, table, &referenced)?;
            let params: Vec<&dyn ToSql> = where_conditions
                .iter()
                .map(|(_, v)| v as &dyn ToSql)
                .collect();
            run_select(conn, &sql, fields, &params)
        })();
        self.store_select(sql, fields, outcome)
    }

    /// Runs a caller-written SELECT (joins, expressions, anything) and
    /// marshals the result by field name, exactly like the single-table
    /// form. No schema validation: the statement is already fully specified
    /// by the caller.
    pub fn select_data_by_sql(&mut self, sql: &str, fields: &[&str]) -> bool {
        self.generation += 1;
        let outcome = (|| -> Result<Vec<Vec<Value>>> {
            let conn = self.connection()?;
            run_select(conn, sql, fields, &[])
        })();
        self.store_select(sql.to_string(), fields, outcome)
    }

    /// Inserts a single row. `data` is bound positionally and must have one
    /// value per field.
    pub fn insert_row_data(&mut self, table: &str, fields: &[&str], data: &[Value]) -> bool {
        let sql = builder::insert_sql(table, fields);
        self.generation += 1;
        let outcome = (|| -> Result<()> {
            let conn = self.connection()?;
            schema::check_table(conn, table, fields)?;
            let mut stmt = conn.prepare(&sql)?;
            bind_and_execute(&mut stmt, fields.len(), data)
        })();
        self.finish(sql, outcome)
    }

    /// Inserts multiple rows through one prepared statement, re-bound per
    /// row. Stops at the first row that fails; rows already inserted stay
    /// inserted. There is no implicit transaction here: callers that need
    /// all-or-nothing semantics bracket this with [`transaction`] and
    /// [`commit`]/[`rollback`] themselves.
    ///
    /// [`transaction`]: SqliteHelper::transaction
    /// [`commit`]: SqliteHelper::commit
    /// [`rollback`]: SqliteHelper::rollback
    pub fn insert_rows_data(&mut self, table: &str, fields: &[&str], rows: &[Vec<Value>]) -> bool {
        let sql = builder::insert_sql(table, fields);
        self.generation += 1;
        let outcome = (|| -> Result<()> {
            let conn = self.connection()?;
            schema::check_table(conn, table, fields)?;
            let mut stmt = conn.prepare(&sql)?;
            for row in rows {
                bind_and_execute(&mut stmt, fields.len(), row)?;
            }
            Ok(())
        })();
        self.finish(sql, outcome)
    }

    /// Updates rows matching the where conditions. Set values are bound
    /// first, then where values, each in slice order. An empty where set
    /// updates every row in the table; that hazard is the caller's to
    /// manage.
    pub fn update_data(
        &mut self,
        table: &str,
        set_values: &[(&str, Value)],
        where_conditions: &[(&str, Value)],
    ) -> bool {
        let set_fields: Vec<&str> = set_values.iter().map(|(k, _)| *k).collect();
        let where_fields: Vec<&str> = where_conditions.iter().map(|(k, _)| *k).collect();
        let sql = builder::update_sql(table, &set_fields, &where_fields);
        self.generation += 1;
        let outcome = (|| -> Result<()> {
            if set_values.is_empty() {
                return Err(SqlitekitError::Query(
                    "update_data requires at least one set value".to_string(),
                ));
            }
            let conn = self.connection()?;
            let mut referenced = set_fields.clone();
            referenced.extend_from_slice(&where_fields);
            schema::check_table(conn, table, &referenced)?;
            let params: Vec<&dyn ToSql> = set_values
                .iter()
                .chain(where_conditions.iter())
                .map(|(_, v)| v as &dyn ToSql)
                .collect();
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })();
        self.finish(sql, outcome)
    }

    /// Deletes rows matching the where conditions. An empty where set
    /// deletes every row in the table.
    pub fn delete_data(&mut self, table: &str, where_conditions: &[(&str, Value)]) -> bool {
        let where_fields: Vec<&str> = where_conditions.iter().map(|(k, _)| *k).collect();
        let sql = builder::delete_sql(table, &where_fields);
        self.generation += 1;
        let outcome = (|| -> Result<()> {
            let conn = self.connection()?;
            schema::check_table(conn, table, &where_fields)?;
            let params: Vec<&dyn ToSql> = where_conditions
                .iter()
                .map(|(_, v)| v as &dyn ToSql)
                .collect();
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })();
        self.finish(sql, outcome)
    }

    /// Executes caller-supplied SQL verbatim: no validation, no binding, no
    /// result marshaling. Intended for DDL and maintenance statements;
    /// multiple `;`-separated statements are accepted.
    pub fn exec(&mut self, sql: &str) -> bool {
        self.generation += 1;
        let outcome = self
            .connection()
            .and_then(|conn| conn.execute_batch(sql).map_err(Into::into));
        self.finish(sql.to_string(), outcome)
    }

    /// Whether the underlying driver supports transactions. SQLite always
    /// does, so this reports true exactly when a connection is open.
    pub fn has_transactions(&self) -> bool {
        self.conn.is_some()
    }

    /// Begins a transaction. No nesting bookkeeping is done here; beginning
    /// a transaction inside a transaction is whatever SQLite makes of it
    /// (an error).
    pub fn transaction(&mut self) -> bool {
        self.run_transaction_stmt("BEGIN")
    }

    /// Commits the current transaction.
    pub fn commit(&mut self) -> bool {
        self.run_transaction_stmt("COMMIT")
    }

    /// Rolls back the current transaction.
    pub fn rollback(&mut self) -> bool {
        self.run_transaction_stmt("ROLLBACK")
    }

    /// Row count of the current result cursor. Valid immediately after a
    /// successful select; once any other statement is issued the cursor is
    /// stale and this returns 0.
    pub fn size(&self) -> usize {
        self.current_result().map(|r| r.rows.len()).unwrap_or(0)
    }

    /// Rows of the current result cursor, in the field order that was
    /// requested by the select. Empty once the cursor is stale.
    pub fn rows(&self) -> &[Vec<Value>] {
        self.current_result()
            .map(|r| r.rows.as_slice())
            .unwrap_or(&[])
    }

    /// The current result cursor, if one exists and is not stale.
    pub fn result(&self) -> Option<&ResultSet> {
        self.current_result()
    }

    /// The most recently attempted statement text, kept for diagnostics and
    /// overwritten by every operation that synthesizes or executes SQL.
    pub fn last_query_sql(&self) -> &str {
        &self.last_sql
    }

    /// Human-readable message from the most recent failure. Cleared to
    /// empty by every successful operation, so read it right after the
    /// failing call.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| SqlitekitError::Connection("database is not open".to_string()))
    }

    fn current_result(&self) -> Option<&ResultSet> {
        self.result
            .as_ref()
            .filter(|r| r.generation == self.generation)
    }

    fn run_transaction_stmt(&mut self, sql: &str) -> bool {
        self.generation += 1;
        let outcome = self.connection().and_then(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| SqlitekitError::Transaction(e.to_string()))
        });
        self.finish(sql.to_string(), outcome)
    }

    fn store_select(
        &mut self,
        sql: String,
        fields: &[&str],
        outcome: Result<Vec<Vec<Value>>>,
    ) -> bool {
        match outcome {
            Ok(rows) => {
                self.result = Some(ResultSet {
                    fields: fields.iter().map(|f| f.to_string()).collect(),
                    rows,
                    generation: self.generation,
                });
                self.finish(sql, Ok(()))
            }
            Err(e) => {
                self.result = None;
                self.finish(sql, Err(e))
            }
        }
    }

    fn finish(&mut self, sql: String, outcome: Result<()>) -> bool {
        self.last_sql = sql;
        match outcome {
            Ok(()) => {
                self.last_error.clear();
                debug!(sql = %self.last_sql, "statement executed");
                true
            }
            Err(e) => {
                error!(sql = %self.last_sql, error = %e, "statement failed");
                self.last_error = e.to_string();
                false
            }
        }
    }
}

impl Default for SqliteHelper {
    fn default() -> Self {
        SqliteHelper::new()
    }
}

impl Drop for SqliteHelper {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_select(
    conn: &Connection,
    sql: &str,
    fields: &[&str],
    params: &[&dyn ToSql],
) -> Result<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            values.push(Value::from(row.get_ref(*field)?));
        }
        out.push(values);
    }
    Ok(out)
}

fn bind_and_execute(
    stmt: &mut rusqlite::Statement<'_>,
    field_count: usize,
    data: &[Value],
) -> Result<()> {
    if data.len() != field_count {
        return Err(SqlitekitError::Query(format!(
            "expected {} values, got {}",
            field_count,
            data.len()
        )));
    }
    let params: Vec<&dyn ToSql> = data.iter().map(|v| v as &dyn ToSql).collect();
    stmt.execute(params.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_on_closed_helper_fail() {
        let mut helper = SqliteHelper::new();

        assert!(!helper.is_open());
        assert!(!helper.is_exist_table("anything"));
        assert!(!helper.select_data("t", &["a"]));
        assert!(!helper.last_error().is_empty());
        assert!(!helper.insert_row_data("t", &["a"], &[Value::Integer(1)]));
        assert!(!helper.exec("CREATE TABLE t (a)"));
        assert!(!helper.transaction());
        assert!(!helper.has_transactions());
        assert_eq!(helper.size(), 0);
        assert!(helper.rows().is_empty());
    }

    #[test]
    fn test_open_close_lifecycle() {
        let mut helper = SqliteHelper::new();
        assert!(helper.open(":memory:", "helper_unit_lifecycle"));
        assert!(helper.is_open());
        assert_eq!(helper.connect_name(), "helper_unit_lifecycle");
        assert!(helper.has_transactions());

        helper.close();
        assert!(!helper.is_open());
        // Idempotent
        helper.close();
        assert!(!helper.is_open());

        // The name is free again after close
        let mut second = SqliteHelper::new();
        assert!(second.open(":memory:", "helper_unit_lifecycle"));
    }

    #[test]
    fn test_duplicate_connection_name_rejected() {
        let mut first = SqliteHelper::new();
        assert!(first.open(":memory:", "helper_unit_dup"));

        let mut second = SqliteHelper::new();
        assert!(!second.open(":memory:", "helper_unit_dup"));
        assert!(second.last_error().contains("already in use"));
    }

    #[test]
    fn test_reopen_while_open_fails() {
        let mut helper = SqliteHelper::new();
        assert!(helper.open(":memory:", "helper_unit_reopen"));
        assert!(!helper.open(":memory:", "helper_unit_reopen_b"));
        assert!(helper.last_error().contains("already open"));
        // Original connection is untouched
        assert!(helper.is_open());
        assert_eq!(helper.connect_name(), "helper_unit_reopen");
    }

    #[test]
    fn test_open_bad_path_fails() {
        let mut helper = SqliteHelper::new();
        assert!(!helper.open("/nonexistent/dir/db.sqlite", "helper_unit_badpath"));
        assert!(!helper.last_error().is_empty());
        assert!(!helper.is_open());

        // A failed open releases the name
        let mut retry = SqliteHelper::new();
        assert!(retry.open(":memory:", "helper_unit_badpath"));
    }

    #[test]
    fn test_cursor_goes_stale_after_next_statement() {
        let mut helper = SqliteHelper::new();
        assert!(helper.open(":memory:", "helper_unit_stale"));
        assert!(helper.exec("CREATE TABLE t (a INTEGER)"));
        assert!(helper.insert_row_data("t", &["a"], &[Value::Integer(1)]));

        assert!(helper.select_data("t", &["a"]));
        assert_eq!(helper.size(), 1);
        assert!(helper.result().is_some());

        // Any subsequent statement invalidates the cursor
        assert!(helper.insert_row_data("t", &["a"], &[Value::Integer(2)]));
        assert_eq!(helper.size(), 0);
        assert!(helper.rows().is_empty());
        assert!(helper.result().is_none());
    }

    #[test]
    fn test_value_count_mismatch_is_reported() {
        let mut helper = SqliteHelper::new();
        assert!(helper.open(":memory:", "helper_unit_mismatch"));
        assert!(helper.exec("CREATE TABLE t (a INTEGER, b INTEGER)"));

        assert!(!helper.insert_row_data("t", &["a", "b"], &[Value::Integer(1)]));
        assert!(helper.last_error().contains("expected 2 values"));
    }

    #[test]
    fn test_table_fields() {
        let mut helper = SqliteHelper::new();
        assert!(helper.open(":memory:", "helper_unit_fields"));
        assert!(helper.exec("CREATE TABLE t (a INTEGER, b TEXT)"));

        assert_eq!(
            helper.table_fields("t"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(helper.last_error().is_empty());

        assert_eq!(helper.table_fields("missing"), None);
        assert!(helper.last_error().contains("missing"));
    }
}
