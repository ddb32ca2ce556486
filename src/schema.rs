/// Schema Introspection Module
///
/// Catalog lookups used to validate CRUD requests before any statement is
/// executed: table existence via `sqlite_master`, column listing via
/// `PRAGMA table_info`, and the combined table+field check that guards the
/// single-table select/insert/update/delete paths.

use crate::builder::quote_ident;
use crate::core::{Result, SqlitekitError};
use rusqlite::Connection;

/// Checks whether a table with the given name exists. The comparison is an
/// exact, case-sensitive match against the catalog's table list.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
    )?;
    Ok(stmt.exists([table])?)
}

/// Returns the column names of a table, in physical column order.
///
/// Fails with a schema error if the table does not exist; `PRAGMA
/// table_info` alone would silently report zero columns in that case.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    if !table_exists(conn, table)? {
        return Err(SqlitekitError::Schema(format!(
            "table '{}' does not exist",
            table
        )));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let column_iter = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = Vec::new();
    for column_result in column_iter {
        columns.push(column_result?);
    }
    Ok(columns)
}

/// Validates that the table exists and that every requested field is one of
/// its columns. Runs before statement execution so that a bad request never
/// touches the database.
pub fn check_table(conn: &Connection, table: &str, fields: &[&str]) -> Result<()> {
    let columns = table_columns(conn, table)?;
    for field in fields {
        if !columns.iter().any(|c| c == field) {
            return Err(SqlitekitError::Schema(format!(
                "field '{}' does not exist in table '{}'",
                field, table
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_schema(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER
            );
        ",
        )
        .unwrap();
    }

    #[test]
    fn test_table_exists() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_schema(&conn);

        assert!(table_exists(&conn, "users").unwrap());
        assert!(!table_exists(&conn, "missing").unwrap());
        // Exact match is case-sensitive
        assert!(!table_exists(&conn, "Users").unwrap());
    }

    #[test]
    fn test_table_columns() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_schema(&conn);

        let columns = table_columns(&conn, "users").unwrap();
        assert_eq!(columns, vec!["id", "name", "age"]);

        let err = table_columns(&conn, "missing").unwrap_err();
        match err {
            SqlitekitError::Schema(msg) => assert!(msg.contains("missing")),
            _ => panic!("Expected Schema error"),
        }
    }

    #[test]
    fn test_check_table() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_schema(&conn);

        assert!(check_table(&conn, "users", &["name", "age"]).is_ok());
        assert!(check_table(&conn, "users", &[]).is_ok());

        let err = check_table(&conn, "users", &["name", "email"]).unwrap_err();
        match err {
            SqlitekitError::Schema(msg) => {
                assert!(msg.contains("email"));
                assert!(msg.contains("users"));
            }
            _ => panic!("Expected Schema error"),
        }

        assert!(check_table(&conn, "missing", &["name"]).is_err());
    }

    #[test]
    fn test_quoted_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE \"order\" (id INTEGER)", [])
            .unwrap();

        assert!(table_exists(&conn, "order").unwrap());
        assert_eq!(table_columns(&conn, "order").unwrap(), vec!["id"]);
    }
}
