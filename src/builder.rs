/// Statement Builder Module
///
/// Pure SQL-text synthesis. Every function here turns structured parameters
/// (table name, ordered field lists) into a parameterized statement string
/// with `?` placeholders; nothing in this module touches the database.
///
/// Identifiers are double-quoted with embedded quotes doubled, so table and
/// field names that collide with keywords or contain unusual characters
/// still produce valid SQL. Values are never interpolated into the text;
/// binding is always positional.

/// Quotes a single identifier for safe inclusion in SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ident_list(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| quote_ident(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the `k1 = ? AND k2 = ?` portion of a statement. Placeholder order
/// follows the slice order, which is the binding contract for every caller.
fn where_clause(where_fields: &[&str]) -> String {
    where_fields
        .iter()
        .map(|f| format!("{} = ?", quote_ident(f)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Builds `SELECT f1,f2 FROM table [WHERE k1 = ? AND k2 = ?]`.
pub fn select_sql(table: &str, fields: &[&str], where_fields: &[&str]) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        ident_list(fields),
        quote_ident(table)
    );
    if !where_fields.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(where_fields));
    }
    sql
}

/// Builds `INSERT INTO table (f1,f2) VALUES (?,?)` with one placeholder
/// per field.
pub fn insert_sql(table: &str, fields: &[&str]) -> String {
    let placeholders = vec!["?"; fields.len()].join(",");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        ident_list(fields),
        placeholders
    )
}

/// Builds `UPDATE table SET f1 = ?,f2 = ? [WHERE k1 = ? AND ...]`.
/// Set placeholders come first, then where placeholders.
pub fn update_sql(table: &str, set_fields: &[&str], where_fields: &[&str]) -> String {
    let assignments = set_fields
        .iter()
        .map(|f| format!("{} = ?", quote_ident(f)))
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!("UPDATE {} SET {}", quote_ident(table), assignments);
    if !where_fields.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(where_fields));
    }
    sql
}

/// Builds `DELETE FROM table [WHERE k1 = ? AND ...]`. An empty where list
/// yields an unconditional delete over the whole table.
pub fn delete_sql(table: &str, where_fields: &[&str]) -> String {
    let mut sql = format!("DELETE FROM {}", quote_ident(table));
    if !where_fields.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(where_fields));
    }
    sql
}

/// Builds `CREATE TABLE table (f1 T1, f2 T2, PRIMARY KEY (k1,k2))`.
///
/// Column order follows the field slice, but callers must not rely on the
/// physical column order of the created table; rows are always read back
/// by field name, never by position.
pub fn create_table_sql(table: &str, fields: &[(&str, &str)], primary_keys: &[&str]) -> String {
    let mut parts: Vec<String> = fields
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect();
    if !primary_keys.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", ident_list(primary_keys)));
    }
    format!("CREATE TABLE {} ({})", quote_ident(table), parts.join(", "))
}
