use std::path::Path;

use rusqlite::types::ToSql;
use rusqlite::{named_params, Connection, OpenFlags, OptionalExtension, Statement};
use tracing::{debug, info, warn};

use crate::config::DataStoreConfig;
use crate::error::{DataStoreError, Result};
use crate::value::{Row, Value};

/// Generic CRUD façade over one SQLite connection.
///
/// Every operation is a single blocking statement against the connection
/// opened in [`DataStore::new`]. Data values are bound as named parameters.
/// Table and column names are spliced into the SQL text as given, unless the
/// config selects [`crate::IdentifierPolicy::Strict`].
///
/// The read/update/delete operations assume an integer primary key column
/// named `id`.
#[derive(Debug)]
pub struct DataStore {
    config: DataStoreConfig,
    conn: Connection,
}

impl DataStore {
    /// Open the database described by `config`.
    ///
    /// The file header is read once so that an unreadable or non-database
    /// file fails here rather than on the first query.
    pub fn new(config: DataStoreConfig) -> Result<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&config.path, flags)
            .map_err(|e| DataStoreError::connection(&config.path, e))?;
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DataStoreError::connection(&config.path, e))?;

        info!(path = %config.path.display(), "opened data store");
        Ok(Self { config, conn })
    }

    /// Open the database file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(DataStoreConfig::new(path.as_ref()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(DataStoreConfig::new(":memory:"))
    }

    pub fn path(&self) -> &Path {
        self.config.path()
    }

    pub fn config(&self) -> &DataStoreConfig {
        &self.config
    }

    /// Close the connection, reporting any failure to release it.
    pub fn close(self) -> Result<()> {
        let Self { config, conn } = self;
        conn.close()
            .map_err(|(_, e)| DataStoreError::connection(&config.path, e))?;
        info!(path = %config.path.display(), "closed data store");
        Ok(())
    }

    /// Run raw SQL without parameter binding.
    ///
    /// `sql` may hold several `;`-separated statements. Returns the number of
    /// rows the engine reports as changed by the last one.
    pub fn execute(&self, sql: &str) -> Result<u64> {
        debug!(sql, "execute");
        self.conn.execute_batch(sql).map_err(|e| self.fail(e))?;
        Ok(self.conn.changes() as u64)
    }

    /// Run a raw read query and collect every row.
    pub fn fetch(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql, "fetch");
        let mut stmt = self.conn.prepare(sql).map_err(|e| self.fail(e))?;
        let columns = column_names(&stmt);
        let rows = stmt
            .query_map([], |row| read_row(&columns, row))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| self.fail(e))?;
        Ok(rows)
    }

    /// Insert `data` into `table` and return the generated id.
    pub fn create(&self, table: &str, data: &Row) -> Result<i64> {
        self.check_identifiers(table, data)?;

        let columns: Vec<&str> = data.columns().collect();
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let params: Vec<(&str, &dyn ToSql)> = placeholders
            .iter()
            .map(String::as_str)
            .zip(data.iter().map(|(_, value)| value as &dyn ToSql))
            .collect();

        debug!(table, sql = %sql, "create");
        self.conn
            .execute(&sql, params.as_slice())
            .map_err(|e| self.fail(e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch the row of `table` whose `id` equals `id`.
    pub fn read(&self, table: &str, id: i64) -> Result<Option<Row>> {
        self.check_table(table)?;

        let sql = format!("SELECT * FROM {table} WHERE id = :id");
        debug!(table, id, sql = %sql, "read");
        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.fail(e))?;
        let columns = column_names(&stmt);
        let row = stmt
            .query_row(named_params! { ":id": id }, |row| read_row(&columns, row))
            .optional()
            .map_err(|e| self.fail(e))?;
        Ok(row)
    }

    /// Overwrite the given columns of row `id`. Returns whether a row changed.
    ///
    /// An `id` entry in `data` is ignored in favour of the `id` argument.
    pub fn update(&self, table: &str, id: i64, data: &Row) -> Result<bool> {
        self.check_identifiers(table, data)?;

        let set = data
            .columns()
            .map(|c| format!("{c} = :{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {set} WHERE id = :id");

        let names: Vec<(String, &Value)> = data
            .iter()
            .filter(|(column, _)| *column != "id")
            .map(|(column, value)| (format!(":{column}"), value))
            .collect();
        let mut params: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
            .collect();
        params.push((":id", &id));

        debug!(table, id, sql = %sql, "update");
        let changed = self
            .conn
            .execute(&sql, params.as_slice())
            .map_err(|e| self.fail(e))?;
        Ok(changed > 0)
    }

    /// Remove row `id` from `table`. Returns whether a row was removed.
    pub fn delete(&self, table: &str, id: i64) -> Result<bool> {
        self.check_table(table)?;

        let sql = format!("DELETE FROM {table} WHERE id = :id");
        debug!(table, id, sql = %sql, "delete");
        let changed = self
            .conn
            .execute(&sql, named_params! { ":id": id })
            .map_err(|e| self.fail(e))?;
        Ok(changed > 0)
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: &str) -> Result<i64> {
        self.check_table(table)?;

        let sql = format!("SELECT COUNT(*) AS count FROM {table}");
        debug!(table, sql = %sql, "count");
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| self.fail(e))
    }

    /// Id generated by the most recent successful insert on this connection.
    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn check_table(&self, table: &str) -> Result<()> {
        self.config.identifier_policy.check(table)
    }

    fn check_identifiers(&self, table: &str, data: &Row) -> Result<()> {
        let policy = self.config.identifier_policy;
        policy.check(table)?;
        data.columns().try_for_each(|column| policy.check(column))
    }

    fn fail(&self, err: rusqlite::Error) -> DataStoreError {
        let err = DataStoreError::from(err);
        if err.is_constraint() {
            warn!(path = %self.config.path.display(), error = %err, "write rejected");
        }
        err
    }
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

// A repeated column name keeps the last value, as in a keyed fetch.
fn read_row(columns: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| Ok::<_, rusqlite::Error>((name.as_str(), Value::from(row.get_ref(i)?))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DataStore {
        let store = DataStore::open_in_memory().unwrap();
        store
            .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, qty INTEGER)")
            .unwrap();
        store
    }

    #[test]
    fn update_ignores_id_column_in_data() {
        let store = store();
        let id = store.create("items", &Row::new().with_value("name", "pen")).unwrap();

        let data = Row::new().with_value("id", 99).with_value("name", "ink");
        assert!(store.update("items", id, &data).unwrap());

        let row = store.read("items", id).unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Integer(id)));
        assert_eq!(row.get("name"), Some(&Value::from("ink")));
        assert!(store.read("items", 99).unwrap().is_none());
    }

    #[test]
    fn fetch_keeps_engine_column_order() {
        let store = store();
        store
            .create("items", &Row::new().with_value("qty", 3).with_value("name", "cup"))
            .unwrap();

        let rows = store.fetch("SELECT qty, name, id FROM items").unwrap();
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["qty", "name", "id"]);
    }

    #[test]
    fn duplicate_column_names_keep_last_value() {
        let store = store();
        let rows = store.fetch("SELECT 1 AS a, 2 AS a").unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn last_insert_id_tracks_create() {
        let store = store();
        let id = store.create("items", &Row::new().with_value("name", "a")).unwrap();
        assert_eq!(store.last_insert_id(), id);
    }
}
