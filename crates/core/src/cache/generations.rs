//! SQLite implementation of the generation store.
//!
//! Generations live in the `generations` table; entries reference their
//! generation with `ON DELETE CASCADE`, so deleting a generation drops every
//! entry it held in one statement.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::entry::{CacheRequest, ResponseSnapshot, ResponseType, VaryKey, ensure_storable};
use super::hash::request_key;
use super::store::{CacheGeneration, CacheStorage};
use crate::Error;

/// Handle to one generation of a [`CacheDb`].
///
/// Writing through a handle whose generation was deleted recreates it.
#[derive(Clone, Debug)]
pub struct SqliteGeneration {
    db: CacheDb,
    name: String,
}

fn ensure_generation(conn: &rusqlite::Connection, name: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    conn.query_row("SELECT id FROM generations WHERE name = ?1", params![name], |row| row.get(0))
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    type Generation = SqliteGeneration;

    async fn open(&self, name: &str) -> Result<SqliteGeneration, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| ensure_generation(conn, &owned))
            .await
            .map_err(Error::Database)?;
        Ok(SqliteGeneration { db: self.clone(), name: name.to_string() })
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row("SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)", params![name], |row| {
                    row.get(0)
                })
            })
            .await
            .map_err(Error::Database)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY id ASC")?;
                let names = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::Database)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::Database)
    }
}

#[async_trait::async_trait]
impl CacheGeneration for SqliteGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error> {
        ensure_storable(request)?;
        let vary_json = serde_json::to_string(&VaryKey::capture(request, response)?)?;
        let headers_json = serde_json::to_string(&response.headers)?;
        let name = self.name.clone();
        let key = request_key(request);
        let method = request.method.clone();
        let url = request.url.to_string();
        let response = response.clone();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let generation_id = ensure_generation(conn, &name)?;
                conn.execute(
                    "INSERT OR REPLACE INTO entries (
                    generation_id, request_key, method, url, vary_json,
                    response_url, status, status_text, response_type, headers_json,
                    body, fetched_at, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        generation_id,
                        key,
                        method,
                        url,
                        vary_json,
                        &response.url,
                        response.status,
                        &response.status_text,
                        response.response_type.as_str(),
                        headers_json,
                        response.body.to_vec(),
                        &response.fetched_at,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let name = self.name.clone();
        let key = request_key(request);

        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.vary_json, e.response_url, e.status, e.status_text, e.response_type,
                                e.headers_json, e.body, e.fetched_at
                         FROM entries e JOIN generations g ON g.id = e.generation_id
                         WHERE g.name = ?1 AND e.request_key = ?2",
                        params![name, key],
                        |row| {
                            Ok(StoredRow {
                                vary_json: row.get(0)?,
                                response_url: row.get(1)?,
                                status: row.get(2)?,
                                status_text: row.get(3)?,
                                response_type: row.get(4)?,
                                headers_json: row.get(5)?,
                                body: row.get(6)?,
                                fetched_at: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let vary: VaryKey = serde_json::from_str(&row.vary_json)?;
        if !vary.matches(request) {
            return Ok(None);
        }
        row.into_snapshot().map(Some)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.url FROM entries e JOIN generations g ON g.id = e.generation_id
                     WHERE g.name = ?1 ORDER BY e.rowid ASC",
                )?;
                let urls = stmt.query_map(params![name], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::Database)
    }
}

struct StoredRow {
    vary_json: String,
    response_url: String,
    status: u16,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
    fetched_at: String,
}

impl StoredRow {
    fn into_snapshot(self) -> Result<ResponseSnapshot, Error> {
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)?;
        Ok(ResponseSnapshot {
            url: self.response_url,
            status: self.status,
            status_text: self.status_text,
            response_type: self.response_type.parse::<ResponseType>()?,
            headers,
            body: Bytes::from(self.body),
            fetched_at: self.fetched_at,
        })
    }
}
