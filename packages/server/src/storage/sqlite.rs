//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `nodes`: one row per graph node: UUIDv7 id, label, and the scalar
//!   payload as a JSON blob (nested relations stripped).
//! - `edges`: one row per typed edge: `(from_id, rel, to_id)`.
//! - `users`: registered accounts with unique name and email.
//!
//! Name lookups and dedup queries go through `json_extract` on the payload;
//! multi-statement writes (event and group saves, cascade deletes) run in a
//! transaction.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use terrograph::types::{
    City, Country, Event, Group, Label, Province, Region, Relation, Target, User, Victim,
};

use super::{PageOf, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id    TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    data  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

CREATE TABLE IF NOT EXISTS edges (
    from_id TEXT NOT NULL,
    rel     TEXT NOT NULL,
    to_id   TEXT NOT NULL,
    PRIMARY KEY (from_id, rel, to_id)
);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    roles         TEXT NOT NULL
);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread-pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("blocking task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn map_json_err(e: serde_json::Error) -> StorageError {
    StorageError::Internal(format!("JSON error: {e}"))
}

// ---------------------------------------------------------------------------
// Synchronous graph operations
// ---------------------------------------------------------------------------

mod ops {
    use super::*;
    use rusqlite::{params, OptionalExtension};
    use serde::{de::DeserializeOwned, Serialize};

    pub fn put_node<T: Serialize>(
        conn: &Connection,
        label: Label,
        id: &str,
        payload: &T,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_string(payload).map_err(map_json_err)?;
        conn.execute(
            "INSERT INTO nodes (id, label, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET label = ?2, data = ?3",
            params![id, label.to_string(), data],
        )
        .map_err(map_err)?;
        Ok(())
    }

    pub fn get_node<T: DeserializeOwned>(
        conn: &Connection,
        label: Label,
        id: &str,
    ) -> Result<Option<T>, StorageError> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM nodes WHERE id = ?1 AND label = ?2",
                params![id, label.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_err)?;
        data.map(|d| serde_json::from_str(&d).map_err(map_json_err))
            .transpose()
    }

    pub fn node_exists(conn: &Connection, label: Label, id: &str) -> Result<bool, StorageError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM nodes WHERE id = ?1 AND label = ?2",
                params![id, label.to_string()],
                |row| row.get(0),
            )
            .map_err(map_err)?;
        Ok(count > 0)
    }

    /// Delete a node row and every edge touching it. Returns `false` when
    /// the id is unknown under `label`.
    pub fn delete_node(conn: &Connection, label: Label, id: &str) -> Result<bool, StorageError> {
        let changed = conn
            .execute(
                "DELETE FROM nodes WHERE id = ?1 AND label = ?2",
                params![id, label.to_string()],
            )
            .map_err(map_err)?;
        if changed == 0 {
            return Ok(false);
        }
        detach(conn, id)?;
        Ok(true)
    }

    pub fn list_nodes<T: DeserializeOwned>(
        conn: &Connection,
        label: Label,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<T>, StorageError> {
        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM nodes WHERE label = ?1",
                params![label.to_string()],
                |row| row.get(0),
            )
            .map_err(map_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT data FROM nodes WHERE label = ?1
                 ORDER BY id LIMIT ?2 OFFSET ?3",
            )
            .map_err(map_err)?;
        let rows = stmt
            .query_map(
                params![label.to_string(), limit as i64, offset as i64],
                |row| row.get::<_, String>(0),
            )
            .map_err(map_err)?;

        let mut items = Vec::new();
        for row in rows {
            let data = row.map_err(map_err)?;
            items.push(serde_json::from_str(&data).map_err(map_json_err)?);
        }
        Ok((items, total as usize))
    }

    /// Page through the ids a relation points at, in id order.
    pub fn list_node_ids(
        conn: &Connection,
        label: Label,
    ) -> Result<Vec<String>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT id FROM nodes WHERE label = ?1 ORDER BY id")
            .map_err(map_err)?;
        let rows = stmt
            .query_map(params![label.to_string()], |row| row.get::<_, String>(0))
            .map_err(map_err)?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(map_err)?);
        }
        Ok(ids)
    }

    pub fn find_id_by_name(
        conn: &Connection,
        label: Label,
        name: &str,
    ) -> Result<Option<String>, StorageError> {
        conn.query_row(
            "SELECT id FROM nodes
             WHERE label = ?1 AND json_extract(data, '$.name') = ?2
             ORDER BY id LIMIT 1",
            params![label.to_string(), name],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_err)
    }

    // --- edges ---------------------------------------------------------------

    pub fn link(
        conn: &Connection,
        from: &str,
        rel: Relation,
        to: &str,
    ) -> Result<(), StorageError> {
        conn.execute(
            "INSERT OR IGNORE INTO edges (from_id, rel, to_id) VALUES (?1, ?2, ?3)",
            params![from, rel.to_string(), to],
        )
        .map_err(map_err)?;
        Ok(())
    }

    pub fn unlink(conn: &Connection, from: &str, rel: Relation) -> Result<(), StorageError> {
        conn.execute(
            "DELETE FROM edges WHERE from_id = ?1 AND rel = ?2",
            params![from, rel.to_string()],
        )
        .map_err(map_err)?;
        Ok(())
    }

    pub fn detach(conn: &Connection, id: &str) -> Result<(), StorageError> {
        conn.execute(
            "DELETE FROM edges WHERE from_id = ?1 OR to_id = ?1",
            params![id],
        )
        .map_err(map_err)?;
        Ok(())
    }

    pub fn out(
        conn: &Connection,
        from: &str,
        rel: Relation,
    ) -> Result<Option<String>, StorageError> {
        conn.query_row(
            "SELECT to_id FROM edges WHERE from_id = ?1 AND rel = ?2
             ORDER BY to_id LIMIT 1",
            params![from, rel.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_err)
    }

    pub fn outs(
        conn: &Connection,
        from: &str,
        rel: Relation,
    ) -> Result<Vec<String>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT to_id FROM edges WHERE from_id = ?1 AND rel = ?2 ORDER BY to_id",
            )
            .map_err(map_err)?;
        let rows = stmt
            .query_map(params![from, rel.to_string()], |row| row.get::<_, String>(0))
            .map_err(map_err)?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(map_err)?);
        }
        Ok(ids)
    }

    // --- assembly ------------------------------------------------------------

    pub fn assemble_country(
        conn: &Connection,
        id: &str,
    ) -> Result<Option<Country>, StorageError> {
        let Some(mut country) = get_node::<Country>(conn, Label::Country, id)? else {
            return Ok(None);
        };
        country.region = match out(conn, id, Relation::InRegion)? {
            Some(rid) => get_node::<Region>(conn, Label::Region, &rid)?,
            None => None,
        };
        Ok(Some(country))
    }

    pub fn assemble_province(
        conn: &Connection,
        id: &str,
    ) -> Result<Option<Province>, StorageError> {
        let Some(mut province) = get_node::<Province>(conn, Label::Province, id)? else {
            return Ok(None);
        };
        province.country = match out(conn, id, Relation::PartOf)? {
            Some(cid) => assemble_country(conn, &cid)?,
            None => None,
        };
        Ok(Some(province))
    }

    pub fn assemble_city(conn: &Connection, id: &str) -> Result<Option<City>, StorageError> {
        let Some(mut city) = get_node::<City>(conn, Label::City, id)? else {
            return Ok(None);
        };
        city.province = match out(conn, id, Relation::LocatedIn)? {
            Some(pid) => assemble_province(conn, &pid)?,
            None => None,
        };
        Ok(Some(city))
    }

    pub fn assemble_target(conn: &Connection, id: &str) -> Result<Option<Target>, StorageError> {
        let Some(mut target) = get_node::<Target>(conn, Label::Target, id)? else {
            return Ok(None);
        };
        target.country_of_origin = match out(conn, id, Relation::Origin)? {
            Some(cid) => assemble_country(conn, &cid)?,
            None => None,
        };
        Ok(Some(target))
    }

    pub fn assemble_event(conn: &Connection, id: &str) -> Result<Option<Event>, StorageError> {
        let Some(mut event) = get_node::<Event>(conn, Label::Event, id)? else {
            return Ok(None);
        };
        event.target = match out(conn, id, Relation::Targeted)? {
            Some(tid) => assemble_target(conn, &tid)?,
            None => None,
        };
        event.city = match out(conn, id, Relation::OccurredIn)? {
            Some(cid) => assemble_city(conn, &cid)?,
            None => None,
        };
        event.victim = match out(conn, id, Relation::Casualties)? {
            Some(vid) => get_node::<Victim>(conn, Label::Victim, &vid)?,
            None => None,
        };
        Ok(Some(event))
    }

    pub fn assemble_group(conn: &Connection, id: &str) -> Result<Option<Group>, StorageError> {
        let Some(mut group) = get_node::<Group>(conn, Label::Group, id)? else {
            return Ok(None);
        };
        let mut events = Vec::new();
        for eid in outs(conn, id, Relation::CarriedOut)? {
            if let Some(event) = assemble_event(conn, &eid)? {
                events.push(event);
            }
        }
        group.events = events;
        Ok(Some(group))
    }

    // --- resolution and dedup ------------------------------------------------

    pub fn resolve_country(conn: &Connection, country: &Country) -> Result<String, StorageError> {
        find_id_by_name(conn, Label::Country, &country.name)?.ok_or_else(|| {
            StorageError::Internal(format!("country {:?} is not seeded", country.name))
        })
    }

    pub fn store_province(conn: &Connection, province: &Province) -> Result<String, StorageError> {
        let country_id = match &province.country {
            Some(country) => Some(resolve_country(conn, country)?),
            None => None,
        };
        let mut flat = province.clone();
        flat.country = None;
        put_node(conn, Label::Province, &flat.id, &flat)?;
        unlink(conn, &province.id, Relation::PartOf)?;
        if let Some(cid) = country_id {
            link(conn, &province.id, Relation::PartOf, &cid)?;
        }
        Ok(province.id.clone())
    }

    pub fn dedup_province(conn: &Connection, province: &Province) -> Result<String, StorageError> {
        let wanted_country = province.country.as_ref().map(|c| c.name.clone());
        for pid in list_node_ids(conn, Label::Province)? {
            let Some(candidate) = get_node::<Province>(conn, Label::Province, &pid)? else {
                continue;
            };
            if candidate.name != province.name {
                continue;
            }
            let candidate_country = match out(conn, &pid, Relation::PartOf)? {
                Some(cid) => get_node::<Country>(conn, Label::Country, &cid)?.map(|c| c.name),
                None => None,
            };
            if candidate_country == wanted_country {
                return Ok(pid);
            }
        }
        store_province(conn, province)
    }

    pub fn store_city(conn: &Connection, city: &City) -> Result<String, StorageError> {
        let province_id = match &city.province {
            Some(province) => Some(dedup_province(conn, province)?),
            None => None,
        };
        let mut flat = city.clone();
        flat.province = None;
        put_node(conn, Label::City, &flat.id, &flat)?;
        unlink(conn, &city.id, Relation::LocatedIn)?;
        if let Some(pid) = province_id {
            link(conn, &city.id, Relation::LocatedIn, &pid)?;
        }
        Ok(city.id.clone())
    }

    pub fn dedup_city(conn: &Connection, city: &City) -> Result<String, StorageError> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM nodes
                 WHERE label = 'city'
                   AND json_extract(data, '$.name') = ?1
                   AND json_extract(data, '$.latitude') = ?2
                   AND json_extract(data, '$.longitude') = ?3
                 ORDER BY id LIMIT 1",
                rusqlite::params![city.name, city.latitude, city.longitude],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_err)?;
        match existing {
            Some(id) => Ok(id),
            None => store_city(conn, city),
        }
    }

    pub fn store_target(conn: &Connection, target: &Target) -> Result<String, StorageError> {
        let country_id = match &target.country_of_origin {
            Some(country) => Some(resolve_country(conn, country)?),
            None => None,
        };
        let mut flat = target.clone();
        flat.country_of_origin = None;
        put_node(conn, Label::Target, &flat.id, &flat)?;
        unlink(conn, &target.id, Relation::Origin)?;
        if let Some(cid) = country_id {
            link(conn, &target.id, Relation::Origin, &cid)?;
        }
        Ok(target.id.clone())
    }

    // --- event and group writes ---------------------------------------------

    /// Delete the satellite nodes an event owns (target, victim).
    pub fn delete_event_satellites(conn: &Connection, event_id: &str) -> Result<(), StorageError> {
        if let Some(tid) = out(conn, event_id, Relation::Targeted)? {
            delete_node(conn, Label::Target, &tid)?;
        }
        if let Some(vid) = out(conn, event_id, Relation::Casualties)? {
            delete_node(conn, Label::Victim, &vid)?;
        }
        Ok(())
    }

    pub fn store_event(conn: &Connection, event: &Event) -> Result<String, StorageError> {
        if node_exists(conn, Label::Event, &event.id)? {
            delete_event_satellites(conn, &event.id)?;
            unlink(conn, &event.id, Relation::Targeted)?;
            unlink(conn, &event.id, Relation::OccurredIn)?;
            unlink(conn, &event.id, Relation::Casualties)?;
        }

        let target_id = match &event.target {
            Some(target) => Some(store_target(conn, target)?),
            None => None,
        };
        let city_id = match &event.city {
            Some(city) => Some(dedup_city(conn, city)?),
            None => None,
        };
        let victim_id = match &event.victim {
            Some(victim) => {
                put_node(conn, Label::Victim, &victim.id, victim)?;
                Some(victim.id.clone())
            }
            None => None,
        };

        let mut flat = event.clone();
        flat.target = None;
        flat.city = None;
        flat.victim = None;
        put_node(conn, Label::Event, &flat.id, &flat)?;

        if let Some(tid) = target_id {
            link(conn, &event.id, Relation::Targeted, &tid)?;
        }
        if let Some(cid) = city_id {
            link(conn, &event.id, Relation::OccurredIn, &cid)?;
        }
        if let Some(vid) = victim_id {
            link(conn, &event.id, Relation::Casualties, &vid)?;
        }
        Ok(event.id.clone())
    }

    pub fn remove_event(conn: &Connection, id: &str) -> Result<bool, StorageError> {
        if !node_exists(conn, Label::Event, id)? {
            return Ok(false);
        }
        delete_event_satellites(conn, id)?;
        delete_node(conn, Label::Event, id)?;
        Ok(true)
    }

    pub fn remove_group(conn: &Connection, id: &str) -> Result<bool, StorageError> {
        if !node_exists(conn, Label::Group, id)? {
            return Ok(false);
        }
        for eid in outs(conn, id, Relation::CarriedOut)? {
            remove_event(conn, &eid)?;
        }
        delete_node(conn, Label::Group, id)?;
        Ok(true)
    }
}

/// Run `f` inside a transaction, committing on success.
fn in_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection) -> Result<T, StorageError>,
) -> Result<T, StorageError> {
    let tx = conn.transaction().map_err(map_err)?;
    let out = f(&tx)?;
    tx.commit().map_err(map_err)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Regions -------------------------------------------------------------

    async fn put_region(&self, region: &Region) -> Result<Region, StorageError> {
        let region = region.clone();
        self.blocking(move |conn| {
            if let Some(id) = ops::find_id_by_name(conn, Label::Region, &region.name)? {
                return ops::get_node::<Region>(conn, Label::Region, &id)?
                    .ok_or_else(|| StorageError::Internal("region vanished during upsert".into()));
            }
            ops::put_node(conn, Label::Region, &region.id, &region)?;
            Ok(region)
        })
        .await
    }

    async fn get_region(&self, id: &str) -> Result<Option<Region>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::get_node(conn, Label::Region, &id)).await
    }

    async fn list_regions(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Region>, StorageError> {
        self.blocking(move |conn| ops::list_nodes(conn, Label::Region, offset, limit))
            .await
    }

    // --- Countries -----------------------------------------------------------

    async fn put_country(&self, country: &Country) -> Result<Country, StorageError> {
        let country = country.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if let Some(id) = ops::find_id_by_name(tx, Label::Country, &country.name)? {
                    return ops::assemble_country(tx, &id)?.ok_or_else(|| {
                        StorageError::Internal("country vanished during upsert".into())
                    });
                }
                let region_id = match &country.region {
                    Some(region) => Some(
                        ops::find_id_by_name(tx, Label::Region, &region.name)?.ok_or_else(
                            || {
                                StorageError::Internal(format!(
                                    "region {:?} is not seeded",
                                    region.name
                                ))
                            },
                        )?,
                    ),
                    None => None,
                };
                let mut flat = country.clone();
                flat.region = None;
                ops::put_node(tx, Label::Country, &flat.id, &flat)?;
                if let Some(rid) = region_id {
                    ops::link(tx, &country.id, Relation::InRegion, &rid)?;
                }
                ops::assemble_country(tx, &country.id)?
                    .ok_or_else(|| StorageError::Internal("country vanished during upsert".into()))
            })
        })
        .await
    }

    async fn get_country(&self, id: &str) -> Result<Option<Country>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_country(conn, &id)).await
    }

    async fn list_countries(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Country>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<Country>, usize) =
                ops::list_nodes(conn, Label::Country, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for country in flat {
                match ops::assemble_country(conn, &country.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(country),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        let name = name.to_string();
        self.blocking(move |conn| {
            match ops::find_id_by_name(conn, Label::Country, &name)? {
                Some(id) => ops::assemble_country(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }

    // --- Provinces -----------------------------------------------------------

    async fn save_province(&self, province: &Province) -> Result<Province, StorageError> {
        let province = province.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                let id = ops::store_province(tx, &province)?;
                ops::assemble_province(tx, &id)?
                    .ok_or_else(|| StorageError::Internal("province vanished during save".into()))
            })
        })
        .await
    }

    async fn get_province(&self, id: &str) -> Result<Option<Province>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_province(conn, &id)).await
    }

    async fn list_provinces(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Province>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<Province>, usize) =
                ops::list_nodes(conn, Label::Province, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for province in flat {
                match ops::assemble_province(conn, &province.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(province),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn delete_province(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            in_tx(conn, |tx| ops::delete_node(tx, Label::Province, &id))
        })
        .await
    }

    // --- Cities --------------------------------------------------------------

    async fn save_city(&self, city: &City) -> Result<City, StorageError> {
        let city = city.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                let id = ops::store_city(tx, &city)?;
                ops::assemble_city(tx, &id)?
                    .ok_or_else(|| StorageError::Internal("city vanished during save".into()))
            })
        })
        .await
    }

    async fn get_city(&self, id: &str) -> Result<Option<City>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_city(conn, &id)).await
    }

    async fn list_cities(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<City>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<City>, usize) =
                ops::list_nodes(conn, Label::City, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for city in flat {
                match ops::assemble_city(conn, &city.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(city),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn delete_city(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| in_tx(conn, |tx| ops::delete_node(tx, Label::City, &id)))
            .await
    }

    // --- Targets -------------------------------------------------------------

    async fn save_target(&self, target: &Target) -> Result<Target, StorageError> {
        let target = target.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                let id = ops::store_target(tx, &target)?;
                ops::assemble_target(tx, &id)?
                    .ok_or_else(|| StorageError::Internal("target vanished during save".into()))
            })
        })
        .await
    }

    async fn get_target(&self, id: &str) -> Result<Option<Target>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_target(conn, &id)).await
    }

    async fn list_targets(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Target>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<Target>, usize) =
                ops::list_nodes(conn, Label::Target, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for target in flat {
                match ops::assemble_target(conn, &target.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(target),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn delete_target(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| in_tx(conn, |tx| ops::delete_node(tx, Label::Target, &id)))
            .await
    }

    // --- Victims -------------------------------------------------------------

    async fn save_victim(&self, victim: &Victim) -> Result<Victim, StorageError> {
        let victim = victim.clone();
        self.blocking(move |conn| {
            ops::put_node(conn, Label::Victim, &victim.id, &victim)?;
            Ok(victim)
        })
        .await
    }

    async fn get_victim(&self, id: &str) -> Result<Option<Victim>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::get_node(conn, Label::Victim, &id)).await
    }

    async fn list_victims(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Victim>, StorageError> {
        self.blocking(move |conn| ops::list_nodes(conn, Label::Victim, offset, limit))
            .await
    }

    async fn delete_victim(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| in_tx(conn, |tx| ops::delete_node(tx, Label::Victim, &id)))
            .await
    }

    // --- Events --------------------------------------------------------------

    async fn save_event(&self, event: &Event) -> Result<Event, StorageError> {
        let event = event.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                let id = ops::store_event(tx, &event)?;
                ops::assemble_event(tx, &id)?
                    .ok_or_else(|| StorageError::Internal("event vanished during save".into()))
            })
        })
        .await
    }

    async fn get_event(&self, id: &str) -> Result<Option<Event>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_event(conn, &id)).await
    }

    async fn list_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<Event>, usize) =
                ops::list_nodes(conn, Label::Event, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for event in flat {
                match ops::assemble_event(conn, &event.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(event),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn delete_event(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| in_tx(conn, |tx| ops::remove_event(tx, &id)))
            .await
    }

    async fn set_event_target(
        &self,
        event_id: &str,
        target: &Target,
    ) -> Result<Target, StorageError> {
        let event_id = event_id.to_string();
        let target = target.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if !ops::node_exists(tx, Label::Event, &event_id)? {
                    return Err(StorageError::NotFound);
                }
                if let Some(old) = ops::out(tx, &event_id, Relation::Targeted)? {
                    ops::delete_node(tx, Label::Target, &old)?;
                }
                let tid = ops::store_target(tx, &target)?;
                ops::link(tx, &event_id, Relation::Targeted, &tid)?;
                ops::assemble_target(tx, &tid)?
                    .ok_or_else(|| StorageError::Internal("target vanished during save".into()))
            })
        })
        .await
    }

    async fn delete_event_target(&self, event_id: &str) -> Result<bool, StorageError> {
        let event_id = event_id.to_string();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if !ops::node_exists(tx, Label::Event, &event_id)? {
                    return Err(StorageError::NotFound);
                }
                match ops::out(tx, &event_id, Relation::Targeted)? {
                    Some(tid) => ops::delete_node(tx, Label::Target, &tid),
                    None => Ok(false),
                }
            })
        })
        .await
    }

    // --- Groups --------------------------------------------------------------

    async fn save_group(&self, group: &Group) -> Result<Group, StorageError> {
        let group = group.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if ops::node_exists(tx, Label::Group, &group.id)? {
                    for eid in ops::outs(tx, &group.id, Relation::CarriedOut)? {
                        ops::remove_event(tx, &eid)?;
                    }
                    ops::unlink(tx, &group.id, Relation::CarriedOut)?;
                }
                let mut flat = group.clone();
                flat.events = Vec::new();
                ops::put_node(tx, Label::Group, &flat.id, &flat)?;
                for event in &group.events {
                    let eid = ops::store_event(tx, event)?;
                    ops::link(tx, &group.id, Relation::CarriedOut, &eid)?;
                }
                ops::assemble_group(tx, &group.id)?
                    .ok_or_else(|| StorageError::Internal("group vanished during save".into()))
            })
        })
        .await
    }

    async fn get_group(&self, id: &str) -> Result<Option<Group>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| ops::assemble_group(conn, &id)).await
    }

    async fn list_groups(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Group>, StorageError> {
        self.blocking(move |conn| {
            let (flat, total): (Vec<Group>, usize) =
                ops::list_nodes(conn, Label::Group, offset, limit)?;
            let mut assembled = Vec::with_capacity(flat.len());
            for group in flat {
                match ops::assemble_group(conn, &group.id)? {
                    Some(full) => assembled.push(full),
                    None => assembled.push(group),
                }
            }
            Ok((assembled, total))
        })
        .await
    }

    async fn delete_group(&self, id: &str) -> Result<bool, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| in_tx(conn, |tx| ops::remove_group(tx, &id)))
            .await
    }

    async fn list_group_events(
        &self,
        group_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError> {
        let group_id = group_id.to_string();
        self.blocking(move |conn| {
            if !ops::node_exists(conn, Label::Group, &group_id)? {
                return Err(StorageError::NotFound);
            }
            let ids = ops::outs(conn, &group_id, Relation::CarriedOut)?;
            let total = ids.len();
            let mut events = Vec::new();
            for eid in ids.into_iter().skip(offset).take(limit) {
                if let Some(event) = ops::assemble_event(conn, &eid)? {
                    events.push(event);
                }
            }
            Ok((events, total))
        })
        .await
    }

    async fn add_group_event(
        &self,
        group_id: &str,
        event: &Event,
    ) -> Result<Event, StorageError> {
        let group_id = group_id.to_string();
        let event = event.clone();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if !ops::node_exists(tx, Label::Group, &group_id)? {
                    return Err(StorageError::NotFound);
                }
                let eid = ops::store_event(tx, &event)?;
                ops::link(tx, &group_id, Relation::CarriedOut, &eid)?;
                ops::assemble_event(tx, &eid)?
                    .ok_or_else(|| StorageError::Internal("event vanished during save".into()))
            })
        })
        .await
    }

    async fn delete_group_events(&self, group_id: &str) -> Result<usize, StorageError> {
        let group_id = group_id.to_string();
        self.blocking(move |conn| {
            in_tx(conn, |tx| {
                if !ops::node_exists(tx, Label::Group, &group_id)? {
                    return Err(StorageError::NotFound);
                }
                let mut removed = 0;
                for eid in ops::outs(tx, &group_id, Relation::CarriedOut)? {
                    if ops::remove_event(tx, &eid)? {
                        removed += 1;
                    }
                }
                Ok(removed)
            })
        })
        .await
    }

    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.blocking(move |conn| {
            use rusqlite::params;
            let name_taken: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM users WHERE name = ?1",
                    params![user.name],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            if name_taken > 0 {
                return Err(StorageError::Conflict(format!(
                    "account name {:?} is already taken",
                    user.name
                )));
            }
            let email_taken: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM users WHERE email = ?1",
                    params![user.email],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            if email_taken > 0 {
                return Err(StorageError::Conflict(format!(
                    "email {:?} is already registered",
                    user.email
                )));
            }
            let roles = serde_json::to_string(&user.roles).map_err(map_json_err)?;
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, roles)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.id, user.name, user.email, user.password_hash, roles],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StorageError> {
        let name = name.to_string();
        self.blocking(move |conn| {
            use rusqlite::{params, OptionalExtension};
            let row: Option<(String, String, String, String, String)> = conn
                .query_row(
                    "SELECT id, name, email, password_hash, roles
                     FROM users WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(map_err)?;
            match row {
                Some((id, name, email, password_hash, roles)) => Ok(Some(User {
                    id,
                    name,
                    email,
                    password_hash,
                    roles: serde_json::from_str(&roles).map_err(map_json_err)?,
                })),
                None => Ok(None),
            }
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use terrograph::types::new_id;

    async fn seeded() -> SqliteStorage {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let region = storage
            .put_region(&Region::new("South Asia"))
            .await
            .unwrap();
        storage
            .put_country(&Country::new("Afghanistan", Some(region)))
            .await
            .unwrap();
        storage
    }

    fn event(summary: &str) -> Event {
        Event {
            id: new_id(),
            summary: summary.into(),
            motive: "Unknown".into(),
            date: NaiveDate::from_ymd_opt(2015, 8, 1).unwrap(),
            part_of_multiple_incidents: false,
            successful: true,
            suicidal: true,
            target: Some(Target {
                id: new_id(),
                name: "Checkpoint".into(),
                country_of_origin: Some(Country::new("Afghanistan", None)),
            }),
            city: Some(City {
                id: new_id(),
                name: "Kabul".into(),
                latitude: 34.52,
                longitude: 69.18,
                province: Some(Province {
                    id: new_id(),
                    name: "Kabul".into(),
                    country: Some(Country::new("Afghanistan", None)),
                }),
            }),
            victim: Some(Victim {
                id: new_id(),
                total_fatalities: 1,
                perpetrator_fatalities: 1,
                total_injured: 3,
                perpetrator_injured: 0,
                property_damage: 0,
            }),
        }
    }

    #[tokio::test]
    async fn event_roundtrip_reassembles_the_chain() {
        let storage = seeded().await;
        let saved = storage.save_event(&event("First")).await.unwrap();
        let loaded = storage.get_event(&saved.id).await.unwrap().unwrap();
        let country = loaded
            .city
            .unwrap()
            .province
            .unwrap()
            .country
            .unwrap();
        assert_eq!(country.name, "Afghanistan");
        assert_eq!(country.region.unwrap().name, "South Asia");
    }

    #[tokio::test]
    async fn dedup_matches_memory_backend_semantics() {
        let storage = seeded().await;
        let first = storage.save_event(&event("First")).await.unwrap();
        let second = storage.save_event(&event("Second")).await.unwrap();
        assert_eq!(
            first.city.as_ref().unwrap().id,
            second.city.as_ref().unwrap().id
        );
        let (_, provinces) = storage.list_provinces(0, 100).await.unwrap();
        assert_eq!(provinces, 1);
    }

    #[tokio::test]
    async fn delete_event_cascades() {
        let storage = seeded().await;
        let saved = storage.save_event(&event("First")).await.unwrap();
        assert!(storage.delete_event(&saved.id).await.unwrap());
        assert!(!storage.delete_event(&saved.id).await.unwrap());
        let (_, targets) = storage.list_targets(0, 100).await.unwrap();
        let (_, victims) = storage.list_victims(0, 100).await.unwrap();
        assert_eq!(targets, 0);
        assert_eq!(victims, 0);
        let (_, cities) = storage.list_cities(0, 100).await.unwrap();
        assert_eq!(cities, 1);
    }

    #[tokio::test]
    async fn group_save_and_cascade() {
        let storage = seeded().await;
        let group = Group {
            id: new_id(),
            name: "Northern Cell".into(),
            events: vec![event("One"), event("Two")],
        };
        let saved = storage.save_group(&group).await.unwrap();
        assert_eq!(saved.events.len(), 2);
        let (events, total) = storage.list_group_events(&saved.id, 0, 10).await.unwrap();
        assert_eq!((events.len(), total), (2, 2));
        assert!(storage.delete_group(&saved.id).await.unwrap());
        let (_, events) = storage.list_events(0, 100).await.unwrap();
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn users_unique_by_name_and_email() {
        let storage = seeded().await;
        let user = User {
            id: new_id(),
            name: "analyst7".into(),
            email: "analyst7@example.com".into(),
            password_hash: "hash".into(),
            roles: vec![terrograph::types::Role::User],
        };
        storage.put_user(&user).await.unwrap();
        let loaded = storage.get_user_by_name("analyst7").await.unwrap().unwrap();
        assert_eq!(loaded.roles, vec![terrograph::types::Role::User]);

        let mut dup = user.clone();
        dup.id = new_id();
        assert!(matches!(
            storage.put_user(&dup).await,
            Err(StorageError::Conflict(_))
        ));
    }
}
