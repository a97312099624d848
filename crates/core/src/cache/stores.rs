//! Named store and entry operations.
//!
//! Each store holds request/response pairs keyed by request identity.
//! Deleting a store cascades to its entries.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::CacheStorage;
use crate::Error;
use crate::http::{Headers, Request, Response, ResponseType};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A response flattened into column values.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    status_text: String,
    response_type: String,
    response_url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: Response) -> Result<Self, Error> {
        let url = request.url().to_string();
        let headers_json = serde_json::to_string(response.headers())?;
        Ok(Self {
            key_hash: compute_request_key(request.method(), &url),
            method: request.method().to_string(),
            url,
            status: i64::from(response.status()),
            status_text: response.status_text().to_string(),
            response_type: response.kind().as_str().to_string(),
            response_url: response.url().map(|u| u.to_string()),
            headers_json,
            body: response.into_body().to_vec(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, store: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (
                store_name, key_hash, method, url, status, status_text,
                response_type, response_url, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(store_name, key_hash) DO UPDATE SET
                status = excluded.status,
                status_text = excluded.status_text,
                response_type = excluded.response_type,
                response_url = excluded.response_url,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                store,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.response_type,
                &self.response_url,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )?;
        Ok(())
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Headers = serde_json::from_str(&self.headers_json)?;
        let kind: ResponseType = self.response_type.parse().map_err(Error::CorruptEntry)?;
        let url = self
            .response_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(Response::from_parts(status, self.status_text, headers, kind, url, Bytes::from(self.body)))
    }
}

fn ensure_store(conn: &rusqlite::Connection, name: &str, now: &str) -> Result<(), Error> {
    conn.execute("INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)", params![name, now])?;
    Ok(())
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_store(conn, &name, &now) })
            .await
            .map_err(Error::from)
    }

    async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key_hash = compute_request_key(request.method(), request.url().as_str());
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status, status_text,
                        response_type, response_url, headers_json, body
                    FROM entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok(EntryRow {
                        key_hash: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        status_text: row.get(4)?,
                        response_type: row.get(5)?,
                        response_url: row.get(6)?,
                        headers_json: row.get(7)?,
                        body: row.get(8)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error> {
        let store = store.to_string();
        let row = EntryRow::new(request, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store, &now)?;
                row.insert(conn, &store, &now)
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, store: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let store = store.to_string();
        let rows = entries
            .into_iter()
            .map(|(request, response)| EntryRow::new(&request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store, &now)?;
                for row in &rows {
                    row.insert(&tx, &store, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                if !conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![store], |row| {
                    row.get::<_, bool>(0)
                })? {
                    return Err(Error::StoreNotFound(store));
                }

                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store_name = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
