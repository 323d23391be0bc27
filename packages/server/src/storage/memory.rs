//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests and ephemeral servers.
//!
//! Nodes are stored flat (nested relations stripped) in [`BTreeMap`]s keyed
//! by UUIDv7 id, so plain map iteration yields creation order and offset
//! pagination needs no secondary index. Relations live in one ordered edge
//! set of `(from, relation, to)` triples; reads reassemble the object graph
//! by following edges.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;

use terrograph::types::{
    City, Country, Event, Group, Province, Region, Relation, Target, User, Victim,
};

use super::{PageOf, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    regions: BTreeMap<String, Region>,
    countries: BTreeMap<String, Country>,
    provinces: BTreeMap<String, Province>,
    cities: BTreeMap<String, City>,
    targets: BTreeMap<String, Target>,
    victims: BTreeMap<String, Victim>,
    events: BTreeMap<String, Event>,
    groups: BTreeMap<String, Group>,
    /// (from id, relation, to id); ordered so out-edge scans are ranges.
    edges: BTreeSet<(String, Relation, String)>,
    /// Accounts keyed by name.
    users: BTreeMap<String, User>,
}

impl Inner {
    // --- edge helpers --------------------------------------------------------

    fn link(&mut self, from: &str, rel: Relation, to: &str) {
        self.edges.insert((from.into(), rel, to.into()));
    }

    /// The single out-edge of `from` with `rel`, if any.
    fn out(&self, from: &str, rel: Relation) -> Option<String> {
        self.outs(from, rel).into_iter().next()
    }

    /// All out-edges of `from` with `rel`, in target-id order.
    fn outs(&self, from: &str, rel: Relation) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(f, r, _)| f == from && *r == rel)
            .map(|(_, _, t)| t.clone())
            .collect()
    }

    fn unlink(&mut self, from: &str, rel: Relation) {
        self.edges.retain(|(f, r, _)| !(f == from && *r == rel));
    }

    /// Remove every edge touching `id`, in either direction.
    fn detach(&mut self, id: &str) {
        self.edges.retain(|(f, _, t)| f != id && t != id);
    }

    // --- assembly ------------------------------------------------------------

    fn assemble_country(&self, id: &str) -> Option<Country> {
        let mut country = self.countries.get(id).cloned()?;
        country.region = self
            .out(id, Relation::InRegion)
            .and_then(|rid| self.regions.get(&rid).cloned());
        Some(country)
    }

    fn assemble_province(&self, id: &str) -> Option<Province> {
        let mut province = self.provinces.get(id).cloned()?;
        province.country = self
            .out(id, Relation::PartOf)
            .and_then(|cid| self.assemble_country(&cid));
        Some(province)
    }

    fn assemble_city(&self, id: &str) -> Option<City> {
        let mut city = self.cities.get(id).cloned()?;
        city.province = self
            .out(id, Relation::LocatedIn)
            .and_then(|pid| self.assemble_province(&pid));
        Some(city)
    }

    fn assemble_target(&self, id: &str) -> Option<Target> {
        let mut target = self.targets.get(id).cloned()?;
        target.country_of_origin = self
            .out(id, Relation::Origin)
            .and_then(|cid| self.assemble_country(&cid));
        Some(target)
    }

    fn assemble_event(&self, id: &str) -> Option<Event> {
        let mut event = self.events.get(id).cloned()?;
        event.target = self
            .out(id, Relation::Targeted)
            .and_then(|tid| self.assemble_target(&tid));
        event.city = self
            .out(id, Relation::OccurredIn)
            .and_then(|cid| self.assemble_city(&cid));
        event.victim = self
            .out(id, Relation::Casualties)
            .and_then(|vid| self.victims.get(&vid).cloned());
        Some(event)
    }

    fn assemble_group(&self, id: &str) -> Option<Group> {
        let mut group = self.groups.get(id).cloned()?;
        group.events = self
            .outs(id, Relation::CarriedOut)
            .iter()
            .filter_map(|eid| self.assemble_event(eid))
            .collect();
        Some(group)
    }

    // --- resolution and dedup ------------------------------------------------

    /// Resolve a country placeholder to the seeded node's id by name.
    fn resolve_country(&self, country: &Country) -> Result<String, StorageError> {
        self.countries
            .values()
            .find(|c| c.name == country.name)
            .map(|c| c.id.clone())
            .ok_or_else(|| {
                StorageError::Internal(format!("country {:?} is not seeded", country.name))
            })
    }

    /// Store (or relink) a province under its own id.
    fn store_province(&mut self, province: &Province) -> Result<String, StorageError> {
        let country_id = match &province.country {
            Some(country) => Some(self.resolve_country(country)?),
            None => None,
        };
        let mut flat = province.clone();
        flat.country = None;
        self.provinces.insert(flat.id.clone(), flat);
        self.unlink(&province.id, Relation::PartOf);
        if let Some(cid) = country_id {
            self.link(&province.id, Relation::PartOf, &cid);
        }
        Ok(province.id.clone())
    }

    /// Reuse a stored province matching (name, country name), else store the
    /// given one.
    fn dedup_province(&mut self, province: &Province) -> Result<String, StorageError> {
        let wanted_country = province.country.as_ref().map(|c| c.name.as_str());
        let existing = self.provinces.values().find(|p| {
            p.name == province.name
                && self
                    .out(&p.id, Relation::PartOf)
                    .and_then(|cid| self.countries.get(&cid))
                    .map(|c| c.name.as_str())
                    == wanted_country
        });
        match existing {
            Some(p) => Ok(p.id.clone()),
            None => self.store_province(province),
        }
    }

    /// Store (or relink) a city under its own id. Nested provinces dedup.
    fn store_city(&mut self, city: &City) -> Result<String, StorageError> {
        let province_id = match &city.province {
            Some(province) => Some(self.dedup_province(province)?),
            None => None,
        };
        let mut flat = city.clone();
        flat.province = None;
        self.cities.insert(flat.id.clone(), flat);
        self.unlink(&city.id, Relation::LocatedIn);
        if let Some(pid) = province_id {
            self.link(&city.id, Relation::LocatedIn, &pid);
        }
        Ok(city.id.clone())
    }

    /// Reuse a stored city matching (name, latitude, longitude), else store
    /// the given one.
    fn dedup_city(&mut self, city: &City) -> Result<String, StorageError> {
        let existing = self.cities.values().find(|c| {
            c.name == city.name && c.latitude == city.latitude && c.longitude == city.longitude
        });
        match existing {
            Some(c) => Ok(c.id.clone()),
            None => self.store_city(city),
        }
    }

    fn store_target(&mut self, target: &Target) -> Result<String, StorageError> {
        let country_id = match &target.country_of_origin {
            Some(country) => Some(self.resolve_country(country)?),
            None => None,
        };
        let mut flat = target.clone();
        flat.country_of_origin = None;
        self.targets.insert(flat.id.clone(), flat);
        self.unlink(&target.id, Relation::Origin);
        if let Some(cid) = country_id {
            self.link(&target.id, Relation::Origin, &cid);
        }
        Ok(target.id.clone())
    }

    // --- event and group writes ---------------------------------------------

    /// Delete the satellite nodes an event owns (target, victim).
    fn delete_event_satellites(&mut self, event_id: &str) {
        if let Some(tid) = self.out(event_id, Relation::Targeted) {
            self.targets.remove(&tid);
            self.detach(&tid);
        }
        if let Some(vid) = self.out(event_id, Relation::Casualties) {
            self.victims.remove(&vid);
            self.detach(&vid);
        }
    }

    fn store_event(&mut self, event: &Event) -> Result<String, StorageError> {
        if self.events.contains_key(&event.id) {
            // Replacing: the old owned satellites would otherwise be orphaned.
            self.delete_event_satellites(&event.id);
            self.unlink(&event.id, Relation::Targeted);
            self.unlink(&event.id, Relation::OccurredIn);
            self.unlink(&event.id, Relation::Casualties);
        }

        let target_id = match &event.target {
            Some(target) => Some(self.store_target(target)?),
            None => None,
        };
        let city_id = match &event.city {
            Some(city) => Some(self.dedup_city(city)?),
            None => None,
        };
        let victim_id = event.victim.as_ref().map(|victim| {
            self.victims.insert(victim.id.clone(), victim.clone());
            victim.id.clone()
        });

        let mut flat = event.clone();
        flat.target = None;
        flat.city = None;
        flat.victim = None;
        self.events.insert(flat.id.clone(), flat);

        if let Some(tid) = target_id {
            self.link(&event.id, Relation::Targeted, &tid);
        }
        if let Some(cid) = city_id {
            self.link(&event.id, Relation::OccurredIn, &cid);
        }
        if let Some(vid) = victim_id {
            self.link(&event.id, Relation::Casualties, &vid);
        }
        Ok(event.id.clone())
    }

    fn remove_event(&mut self, id: &str) -> bool {
        if !self.events.contains_key(id) {
            return false;
        }
        self.delete_event_satellites(id);
        self.detach(id);
        self.events.remove(id);
        true
    }

    fn remove_group(&mut self, id: &str) -> bool {
        if !self.groups.contains_key(id) {
            return false;
        }
        for eid in self.outs(id, Relation::CarriedOut) {
            self.remove_event(&eid);
        }
        self.detach(id);
        self.groups.remove(id);
        true
    }
}

/// Slice `items` into `(page, total)`.
fn page_of<T>(items: Vec<T>, offset: usize, limit: usize) -> PageOf<T> {
    let total = items.len();
    (items.into_iter().skip(offset).take(limit).collect(), total)
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Regions -------------------------------------------------------------

    async fn put_region(&self, region: &Region) -> Result<Region, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.regions.values().find(|r| r.name == region.name) {
            return Ok(existing.clone());
        }
        inner.regions.insert(region.id.clone(), region.clone());
        Ok(region.clone())
    }

    async fn get_region(&self, id: &str) -> Result<Option<Region>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.regions.get(id).cloned())
    }

    async fn list_regions(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Region>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(page_of(inner.regions.values().cloned().collect(), offset, limit))
    }

    // --- Countries -----------------------------------------------------------

    async fn put_country(&self, country: &Country) -> Result<Country, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.countries.values().find(|c| c.name == country.name) {
            let id = existing.id.clone();
            return inner
                .assemble_country(&id)
                .ok_or_else(|| StorageError::Internal("country vanished during upsert".into()));
        }
        let region_id = match &country.region {
            Some(region) => Some(
                inner
                    .regions
                    .values()
                    .find(|r| r.name == region.name)
                    .map(|r| r.id.clone())
                    .ok_or_else(|| {
                        StorageError::Internal(format!("region {:?} is not seeded", region.name))
                    })?,
            ),
            None => None,
        };
        let mut flat = country.clone();
        flat.region = None;
        inner.countries.insert(flat.id.clone(), flat);
        if let Some(rid) = region_id {
            inner.link(&country.id, Relation::InRegion, &rid);
        }
        inner
            .assemble_country(&country.id)
            .ok_or_else(|| StorageError::Internal("country vanished during upsert".into()))
    }

    async fn get_country(&self, id: &str) -> Result<Option<Country>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_country(id))
    }

    async fn list_countries(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Country>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.countries.keys().cloned().collect();
        let all: Vec<Country> = ids.iter().filter_map(|id| inner.assemble_country(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        let inner = self.inner.read().unwrap();
        let id = inner.countries.values().find(|c| c.name == name).map(|c| c.id.clone());
        Ok(id.and_then(|id| inner.assemble_country(&id)))
    }

    // --- Provinces -----------------------------------------------------------

    async fn save_province(&self, province: &Province) -> Result<Province, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.store_province(province)?;
        inner
            .assemble_province(&id)
            .ok_or_else(|| StorageError::Internal("province vanished during save".into()))
    }

    async fn get_province(&self, id: &str) -> Result<Option<Province>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_province(id))
    }

    async fn list_provinces(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Province>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.provinces.keys().cloned().collect();
        let all: Vec<Province> =
            ids.iter().filter_map(|id| inner.assemble_province(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn delete_province(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.provinces.remove(id).is_none() {
            return Ok(false);
        }
        inner.detach(id);
        Ok(true)
    }

    // --- Cities --------------------------------------------------------------

    async fn save_city(&self, city: &City) -> Result<City, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.store_city(city)?;
        inner
            .assemble_city(&id)
            .ok_or_else(|| StorageError::Internal("city vanished during save".into()))
    }

    async fn get_city(&self, id: &str) -> Result<Option<City>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_city(id))
    }

    async fn list_cities(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<City>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.cities.keys().cloned().collect();
        let all: Vec<City> = ids.iter().filter_map(|id| inner.assemble_city(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn delete_city(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.cities.remove(id).is_none() {
            return Ok(false);
        }
        inner.detach(id);
        Ok(true)
    }

    // --- Targets -------------------------------------------------------------

    async fn save_target(&self, target: &Target) -> Result<Target, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.store_target(target)?;
        inner
            .assemble_target(&id)
            .ok_or_else(|| StorageError::Internal("target vanished during save".into()))
    }

    async fn get_target(&self, id: &str) -> Result<Option<Target>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_target(id))
    }

    async fn list_targets(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Target>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.targets.keys().cloned().collect();
        let all: Vec<Target> = ids.iter().filter_map(|id| inner.assemble_target(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn delete_target(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.targets.remove(id).is_none() {
            return Ok(false);
        }
        inner.detach(id);
        Ok(true)
    }

    // --- Victims -------------------------------------------------------------

    async fn save_victim(&self, victim: &Victim) -> Result<Victim, StorageError> {
        let mut inner = self.inner.write().unwrap();
        inner.victims.insert(victim.id.clone(), victim.clone());
        Ok(victim.clone())
    }

    async fn get_victim(&self, id: &str) -> Result<Option<Victim>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.victims.get(id).cloned())
    }

    async fn list_victims(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Victim>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(page_of(inner.victims.values().cloned().collect(), offset, limit))
    }

    async fn delete_victim(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.victims.remove(id).is_none() {
            return Ok(false);
        }
        inner.detach(id);
        Ok(true)
    }

    // --- Events --------------------------------------------------------------

    async fn save_event(&self, event: &Event) -> Result<Event, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.store_event(event)?;
        inner
            .assemble_event(&id)
            .ok_or_else(|| StorageError::Internal("event vanished during save".into()))
    }

    async fn get_event(&self, id: &str) -> Result<Option<Event>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_event(id))
    }

    async fn list_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.events.keys().cloned().collect();
        let all: Vec<Event> = ids.iter().filter_map(|id| inner.assemble_event(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn delete_event(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.remove_event(id))
    }

    async fn set_event_target(
        &self,
        event_id: &str,
        target: &Target,
    ) -> Result<Target, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.events.contains_key(event_id) {
            return Err(StorageError::NotFound);
        }
        if let Some(old) = inner.out(event_id, Relation::Targeted) {
            inner.targets.remove(&old);
            inner.detach(&old);
        }
        let tid = inner.store_target(target)?;
        inner.link(event_id, Relation::Targeted, &tid);
        inner
            .assemble_target(&tid)
            .ok_or_else(|| StorageError::Internal("target vanished during save".into()))
    }

    async fn delete_event_target(&self, event_id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.events.contains_key(event_id) {
            return Err(StorageError::NotFound);
        }
        match inner.out(event_id, Relation::Targeted) {
            Some(tid) => {
                inner.targets.remove(&tid);
                inner.detach(&tid);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Groups --------------------------------------------------------------

    async fn save_group(&self, group: &Group) -> Result<Group, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.groups.contains_key(&group.id) {
            for eid in inner.outs(&group.id, Relation::CarriedOut) {
                inner.remove_event(&eid);
            }
            inner.unlink(&group.id, Relation::CarriedOut);
        }
        let mut flat = group.clone();
        flat.events = Vec::new();
        inner.groups.insert(flat.id.clone(), flat);
        for event in &group.events {
            let eid = inner.store_event(event)?;
            inner.link(&group.id, Relation::CarriedOut, &eid);
        }
        inner
            .assemble_group(&group.id)
            .ok_or_else(|| StorageError::Internal("group vanished during save".into()))
    }

    async fn get_group(&self, id: &str) -> Result<Option<Group>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.assemble_group(id))
    }

    async fn list_groups(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Group>, StorageError> {
        let inner = self.inner.read().unwrap();
        let ids: Vec<String> = inner.groups.keys().cloned().collect();
        let all: Vec<Group> = ids.iter().filter_map(|id| inner.assemble_group(id)).collect();
        Ok(page_of(all, offset, limit))
    }

    async fn delete_group(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.remove_group(id))
    }

    async fn list_group_events(
        &self,
        group_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError> {
        let inner = self.inner.read().unwrap();
        if !inner.groups.contains_key(group_id) {
            return Err(StorageError::NotFound);
        }
        let all: Vec<Event> = inner
            .outs(group_id, Relation::CarriedOut)
            .iter()
            .filter_map(|eid| inner.assemble_event(eid))
            .collect();
        Ok(page_of(all, offset, limit))
    }

    async fn add_group_event(
        &self,
        group_id: &str,
        event: &Event,
    ) -> Result<Event, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.groups.contains_key(group_id) {
            return Err(StorageError::NotFound);
        }
        let eid = inner.store_event(event)?;
        inner.link(group_id, Relation::CarriedOut, &eid);
        inner
            .assemble_event(&eid)
            .ok_or_else(|| StorageError::Internal("event vanished during save".into()))
    }

    async fn delete_group_events(&self, group_id: &str) -> Result<usize, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.groups.contains_key(group_id) {
            return Err(StorageError::NotFound);
        }
        let ids = inner.outs(group_id, Relation::CarriedOut);
        let mut removed = 0;
        for eid in ids {
            if inner.remove_event(&eid) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.users.contains_key(&user.name) {
            return Err(StorageError::Conflict(format!(
                "account name {:?} is already taken",
                user.name
            )));
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "email {:?} is already registered",
                user.email
            )));
        }
        inner.users.insert(user.name.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(name).cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
