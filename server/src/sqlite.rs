use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use kernel::{DeleteResult, ImageView, Interaction, PageView};
use rusqlite::{params, Connection, OpenFlags, Transaction};

use crate::domain::{EventStore, ObjectStore, StorageError, StoredObject};

const CACHE_SIZE: &str = "4096";

pub enum Mode {
    ReadWrite,
    ReadOnly,
}

pub struct Sqlite {
    conn: Connection,
}

impl Sqlite {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self, StorageError> {
        let c = match mode {
            Mode::ReadWrite => Connection::open(path),
            Mode::ReadOnly => Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY),
        };
        Ok(Self { conn: c? })
    }

    pub fn new_database(&self) -> Result<(), StorageError> {
        self.pragma_update("encoding", "UTF-8")?;

        self.conn.execute(
            "CREATE TABLE object (
                  id             INTEGER PRIMARY KEY AUTOINCREMENT,
                  path           TEXT NOT NULL,
                  content_type   TEXT NOT NULL,
                  size           INTEGER NOT NULL,
                  time_created   TEXT NOT NULL,
                  data           BLOB NOT NULL
                  )",
            [],
        )?;
        self.conn
            .execute("CREATE UNIQUE INDEX unique_object_path_ix ON object(path)", [])?;

        self.conn.execute(
            "CREATE TABLE object_meta (
                  object_id  INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
                  key        TEXT NOT NULL,
                  value      TEXT NOT NULL
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE UNIQUE INDEX unique_object_meta_ix ON object_meta(object_id, key)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE page_view (
                  id          INTEGER PRIMARY KEY AUTOINCREMENT,
                  timestamp   TEXT NOT NULL,
                  visitor_id  TEXT NOT NULL,
                  session_id  TEXT NOT NULL,
                  page_name   TEXT NOT NULL,
                  referrer    TEXT,
                  user_agent  TEXT
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE image_view (
                  id           INTEGER PRIMARY KEY AUTOINCREMENT,
                  timestamp    TEXT NOT NULL,
                  visitor_id   TEXT NOT NULL,
                  session_id   TEXT NOT NULL,
                  image_title  TEXT NOT NULL,
                  referrer     TEXT,
                  user_agent   TEXT
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE interaction (
                  id                INTEGER PRIMARY KEY AUTOINCREMENT,
                  timestamp         TEXT NOT NULL,
                  visitor_id        TEXT NOT NULL,
                  session_id        TEXT NOT NULL,
                  interaction_type  TEXT NOT NULL,
                  target            TEXT
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE visitor (
                  visitor_id  TEXT PRIMARY KEY,
                  first_seen  TEXT NOT NULL,
                  last_seen   TEXT NOT NULL
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE session (
                  session_id  TEXT PRIMARY KEY,
                  visitor_id  TEXT NOT NULL,
                  started_at  TEXT NOT NULL,
                  last_seen   TEXT NOT NULL
                  )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE daily_stat (
                  date         TEXT PRIMARY KEY,
                  page_views   INTEGER NOT NULL DEFAULT 0,
                  image_views  INTEGER NOT NULL DEFAULT 0
                  )",
            [],
        )?;

        Ok(())
    }

    fn enable_foreign_keys(&self) -> Result<(), StorageError> {
        self.pragma_update("foreign_keys", "ON")
    }

    fn assign_cache_size(&self) -> Result<(), StorageError> {
        self.pragma_update("cache_size", CACHE_SIZE)
    }

    fn prepare_write(&self) -> Result<(), StorageError> {
        self.assign_cache_size()?;
        self.enable_foreign_keys()?;
        self.pragma_update("synchronous", "FULL")
    }

    fn pragma_update(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.conn.pragma_update(None, name, value)?;
        Ok(())
    }
}

impl ObjectStore for Sqlite {
    type Err = StorageError;

    fn list_objects(&mut self, folder: &str) -> Result<Vec<StoredObject>, Self::Err> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, path, content_type, size, time_created
             FROM object
             WHERE path LIKE ?1 || '/%'
             ORDER BY path",
        )?;
        let rows = stmt.query_map(params![folder], |row| {
            Ok(StoredObject {
                id: row.get(0)?,
                path: row.get(1)?,
                content_type: row.get(2)?,
                size: row.get(3)?,
                time_created: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn object_metadata(&mut self, path: &str) -> Result<HashMap<String, String>, Self::Err> {
        let fetch = || -> Result<HashMap<String, String>, rusqlite::Error> {
            let mut stmt = self.conn.prepare_cached(
                "SELECT m.key, m.value
                 FROM object_meta m
                 JOIN object o ON o.id = m.object_id
                 WHERE o.path = ?1",
            )?;
            let rows = stmt.query_map(params![path], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut map = HashMap::new();
            for row in rows {
                let (key, value) = row?;
                map.insert(key, value);
            }
            Ok(map)
        };
        fetch().map_err(|source| StorageError::MetadataFetch {
            path: path.to_owned(),
            source,
        })
    }

    fn insert_object(
        &mut self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<i64, Self::Err> {
        self.prepare_write()?;
        let now = Utc::now();
        self.conn
            .prepare_cached(
                "INSERT INTO object (path, content_type, size, time_created, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![path, content_type, data.len() as i64, now, data])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn object_data(&mut self, path: &str) -> Result<(StoredObject, Vec<u8>), Self::Err> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, path, content_type, size, time_created, data
             FROM object
             WHERE path = ?1",
        )?;
        let result = stmt.query_row(params![path], |row| {
            Ok((
                StoredObject {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    content_type: row.get(2)?,
                    size: row.get(3)?,
                    time_created: row.get(4)?,
                },
                row.get::<_, Vec<u8>>(5)?,
            ))
        });
        match result {
            Ok(found) => Ok(found),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StorageError::NotFound(path.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_metadata(
        &mut self,
        path: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), Self::Err> {
        self.prepare_write()?;
        let tx = self.conn.transaction()?;
        let object_id: i64 = {
            let result = tx.query_row(
                "SELECT id FROM object WHERE path = ?1",
                params![path],
                |row| row.get(0),
            );
            match result {
                Ok(id) => id,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(StorageError::NotFound(path.to_owned()))
                }
                Err(e) => return Err(e.into()),
            }
        };
        for (key, value) in entries {
            tx.prepare_cached(
                "INSERT INTO object_meta (object_id, key, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(object_id, key) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![object_id, key, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn increment_likes(&mut self, path: &str) -> Result<i64, Self::Err> {
        self.prepare_write()?;
        // Single in-store statement so concurrent likes cannot lose an
        // increment.
        let result = self.conn.query_row(
            "INSERT INTO object_meta (object_id, key, value)
             SELECT id, 'likes', '1' FROM object WHERE path = ?1
             ON CONFLICT(object_id, key)
             DO UPDATE SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
             RETURNING CAST(value AS INTEGER)",
            params![path],
            |row| row.get(0),
        );
        match result {
            Ok(likes) => Ok(likes),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StorageError::NotFound(path.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete_object(&mut self, path: &str) -> Result<DeleteResult, Self::Err> {
        self.prepare_write()?;
        let tx = self.conn.transaction()?;
        let meta_entries = tx.execute(
            "DELETE FROM object_meta
             WHERE object_id IN (SELECT id FROM object WHERE path = ?1)",
            params![path],
        )?;
        let objects = tx.execute("DELETE FROM object WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(DeleteResult {
            objects: objects as u64,
            meta_entries: meta_entries as u64,
        })
    }
}

impl EventStore for Sqlite {
    type Err = StorageError;

    fn record_page_view(&mut self, view: &PageView) -> Result<(), Self::Err> {
        self.prepare_write()?;
        let tx = self.conn.transaction()?;
        tx.prepare_cached(
            "INSERT INTO page_view (timestamp, visitor_id, session_id, page_name, referrer, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            view.timestamp,
            view.visitor_id,
            view.session_id,
            view.page_name,
            view.referrer,
            view.user_agent
        ])?;
        upsert_presence(&tx, view.timestamp, &view.visitor_id, &view.session_id)?;
        bump_daily(&tx, view.timestamp, "page_views")?;
        tx.commit()?;
        Ok(())
    }

    fn record_image_view(&mut self, view: &ImageView) -> Result<(), Self::Err> {
        self.prepare_write()?;
        let tx = self.conn.transaction()?;
        tx.prepare_cached(
            "INSERT INTO image_view (timestamp, visitor_id, session_id, image_title, referrer, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            view.timestamp,
            view.visitor_id,
            view.session_id,
            view.image_title,
            view.referrer,
            view.user_agent
        ])?;
        upsert_presence(&tx, view.timestamp, &view.visitor_id, &view.session_id)?;
        bump_daily(&tx, view.timestamp, "image_views")?;
        tx.commit()?;
        Ok(())
    }

    fn record_interaction(&mut self, event: &Interaction) -> Result<(), Self::Err> {
        self.prepare_write()?;
        let tx = self.conn.transaction()?;
        tx.prepare_cached(
            "INSERT INTO interaction (timestamp, visitor_id, session_id, interaction_type, target)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![
            event.timestamp,
            event.visitor_id,
            event.session_id,
            event.interaction_type,
            event.target
        ])?;
        upsert_presence(&tx, event.timestamp, &event.visitor_id, &event.session_id)?;
        tx.commit()?;
        Ok(())
    }

    fn page_views_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<PageView>, Self::Err> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, visitor_id, session_id, page_name, referrer, user_agent
             FROM page_view
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![start, end, cap_limit(cap)], |row| {
            Ok(PageView {
                timestamp: row.get(0)?,
                visitor_id: row.get(1)?,
                session_id: row.get(2)?,
                page_name: row.get(3)?,
                referrer: row.get(4)?,
                user_agent: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn image_views_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<ImageView>, Self::Err> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, visitor_id, session_id, image_title, referrer, user_agent
             FROM image_view
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![start, end, cap_limit(cap)], |row| {
            Ok(ImageView {
                timestamp: row.get(0)?,
                visitor_id: row.get(1)?,
                session_id: row.get(2)?,
                image_title: row.get(3)?,
                referrer: row.get(4)?,
                user_agent: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn interactions_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<Interaction>, Self::Err> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, visitor_id, session_id, interaction_type, target
             FROM interaction
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![start, end, cap_limit(cap)], |row| {
            Ok(Interaction {
                timestamp: row.get(0)?,
                visitor_id: row.get(1)?,
                session_id: row.get(2)?,
                interaction_type: row.get(3)?,
                target: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn clear_collection(&mut self, collection: &str) -> Result<usize, Self::Err> {
        let table = match collection {
            "pageViews" => "page_view",
            "imageViews" => "image_view",
            "interactions" => "interaction",
            "sessions" => "session",
            "visitors" => "visitor",
            "dailyStats" => "daily_stat",
            other => return Err(StorageError::UnknownCollection(other.to_owned())),
        };
        self.prepare_write()?;
        let deleted = self.conn.execute(&format!("DELETE FROM {table}"), [])?;
        Ok(deleted)
    }
}

fn upsert_presence(
    tx: &Transaction<'_>,
    timestamp: DateTime<Utc>,
    visitor_id: &str,
    session_id: &str,
) -> Result<(), rusqlite::Error> {
    tx.prepare_cached(
        "INSERT INTO visitor (visitor_id, first_seen, last_seen)
         VALUES (?1, ?2, ?2)
         ON CONFLICT(visitor_id) DO UPDATE SET last_seen = excluded.last_seen",
    )?
    .execute(params![visitor_id, timestamp])?;
    tx.prepare_cached(
        "INSERT INTO session (session_id, visitor_id, started_at, last_seen)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(session_id) DO UPDATE SET last_seen = excluded.last_seen",
    )?
    .execute(params![session_id, visitor_id, timestamp])?;
    Ok(())
}

fn bump_daily(
    tx: &Transaction<'_>,
    timestamp: DateTime<Utc>,
    column: &str,
) -> Result<(), rusqlite::Error> {
    let date = timestamp.date_naive().to_string();
    tx.execute(
        &format!(
            "INSERT INTO daily_stat (date, {column})
             VALUES (?1, 1)
             ON CONFLICT(date) DO UPDATE SET {column} = {column} + 1"
        ),
        params![date],
    )?;
    Ok(())
}

fn cap_limit(cap: usize) -> i64 {
    i64::try_from(cap).unwrap_or(i64::MAX)
}
