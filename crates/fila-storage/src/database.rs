// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Migrations run on a blocking connection before the async handle
//! is opened, so every `Database` starts on the current schema.

use std::path::Path;

use fila_core::FilaError;

/// Handle to the single SQLite writer connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    ///
    /// `wal_mode` selects the journal mode: WAL for concurrent readers in
    /// production, rollback journal for callers that need a single plain
    /// file (network filesystems).
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, FilaError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(FilaError::storage)?;
        }

        let journal_mode = if wal_mode { "WAL" } else { "DELETE" };

        // Migrations run synchronously before the async wrapper takes over
        // the file, so queries never observe a partially migrated schema.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), FilaError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(FilaError::storage)?;
            conn.pragma_update(None, "journal_mode", journal_mode)
                .map_err(FilaError::storage)?;
            crate::migrations::run_migrations(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| FilaError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(FilaError::storage)?;
        conn.call(move |conn| {
            conn.pragma_update(None, "journal_mode", journal_mode)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// this; see `writer.rs` for the single-writer contract.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), FilaError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error) -> FilaError {
    FilaError::Storage {
        source: Box::new(err),
    }
}
