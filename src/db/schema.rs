use duckdb::{params, Connection};
use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::db::db_pool::DbPool;

/// Returned in place of a schema description when the catalog can't be read.
pub const SCHEMA_UNAVAILABLE: &str = "Could not retrieve schema from the database.";

/// Tables of one namespace mapped to their columns in ordinal order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaDescription {
    pub tables: BTreeMap<String, Vec<String>>,
}

impl SchemaDescription {
    /// One line per table: `Table '<name>' has columns: <c1>, <c2>, ...`
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(|(table, columns)| {
                format!("Table '{}' has columns: {}", table, columns.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reads base tables and their columns for `namespace` from the catalog.
pub fn inspect(conn: &Connection, namespace: &str) -> Result<SchemaDescription, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT c.table_name, c.column_name
         FROM information_schema.columns c
         JOIN information_schema.tables t
           ON t.table_catalog = c.table_catalog
          AND t.table_schema = c.table_schema
          AND t.table_name = c.table_name
         WHERE c.table_schema = ? AND t.table_type = 'BASE TABLE'
         ORDER BY c.table_name, c.ordinal_position",
    )?;

    let rows = stmt.query_map(params![namespace], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut description = SchemaDescription::default();
    for row in rows {
        let (table, column) = row?;
        description.tables.entry(table).or_default().push(column);
    }

    debug!(
        "Found {} tables in namespace {}",
        description.tables.len(),
        namespace
    );
    Ok(description)
}

/// Renders the live schema of `namespace`, or [`SCHEMA_UNAVAILABLE`] if the
/// pool or the catalog query fails.
pub fn describe(pool: &DbPool, namespace: &str) -> String {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Error retrieving schema: {}", e);
            return SCHEMA_UNAVAILABLE.to_string();
        }
    };

    match inspect(&conn, namespace) {
        Ok(description) => description.render(),
        Err(e) => {
            error!("Error retrieving schema: {}", e);
            SCHEMA_UNAVAILABLE.to_string()
        }
    }
}

pub fn is_unavailable(schema: &str) -> bool {
    schema.contains("Could not retrieve")
}
