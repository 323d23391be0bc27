//! Storage abstraction layer for the terrograph server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and the graph store. Authorization, validation, and rendering live in the
//! handlers; storage is purely a data access layer over nodes and typed
//! edges.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! # Persistence model
//!
//! Every entity is a node: its scalar payload is stored with nested
//! relations stripped, and each relation is a typed edge
//! (`TARGETED`, `OCCURRED_IN`, `PART_OF`, ...). Reads reassemble the object
//! graph by following edges, so a province update is visible through every
//! city that links to it.
//!
//! # Write semantics
//!
//! - `save_*` is an upsert by id; the returned value is the stored record
//!   with all name references resolved against the seeded reference data.
//! - Nested provinces dedup by (name, country name) and event cities by
//!   (name, latitude, longitude): a matching stored node is linked instead
//!   of inserting a duplicate.
//! - Deleting an event also deletes its owned target and victim nodes;
//!   deleting a group cascades through its events. Cities, provinces,
//!   countries, and regions are shared and never cascade-deleted.
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use terrograph::types::{City, Country, Event, Group, Province, Region, Target, User, Victim};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A referenced item does not exist (e.g. adding an event to an unknown
    /// group).
    #[error("not found")]
    NotFound,

    /// An item with the same unique key already exists (e.g. duplicate
    /// account name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// A page of items plus the total match count across all pages.
pub type PageOf<T> = (Vec<T>, usize);

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for the terrograph server.
///
/// All methods are `async` and return `Result<_, StorageError>`.
/// Implementations must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn Storage>`. Listing is offset-paginated in UUIDv7 id order
/// (creation order).
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Regions (reference data) -------------------------------------------

    /// Upsert a region by name, returning the stored node. Seeding only;
    /// there is no write endpoint for regions.
    async fn put_region(&self, region: &Region) -> Result<Region, StorageError>;

    async fn get_region(&self, id: &str) -> Result<Option<Region>, StorageError>;

    async fn list_regions(&self, offset: usize, limit: usize)
        -> Result<PageOf<Region>, StorageError>;

    // --- Countries (reference data) -----------------------------------------

    /// Upsert a country by name, linking its `IN_REGION` edge. Seeding only.
    async fn put_country(&self, country: &Country) -> Result<Country, StorageError>;

    async fn get_country(&self, id: &str) -> Result<Option<Country>, StorageError>;

    async fn list_countries(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Country>, StorageError>;

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, StorageError>;

    // --- Provinces -----------------------------------------------------------

    async fn save_province(&self, province: &Province) -> Result<Province, StorageError>;

    async fn get_province(&self, id: &str) -> Result<Option<Province>, StorageError>;

    async fn list_provinces(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Province>, StorageError>;

    /// Remove a province node and its edges. Returns `false` when the id is
    /// unknown.
    async fn delete_province(&self, id: &str) -> Result<bool, StorageError>;

    // --- Cities --------------------------------------------------------------

    async fn save_city(&self, city: &City) -> Result<City, StorageError>;

    async fn get_city(&self, id: &str) -> Result<Option<City>, StorageError>;

    async fn list_cities(&self, offset: usize, limit: usize)
        -> Result<PageOf<City>, StorageError>;

    async fn delete_city(&self, id: &str) -> Result<bool, StorageError>;

    // --- Targets -------------------------------------------------------------

    async fn save_target(&self, target: &Target) -> Result<Target, StorageError>;

    async fn get_target(&self, id: &str) -> Result<Option<Target>, StorageError>;

    async fn list_targets(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Target>, StorageError>;

    async fn delete_target(&self, id: &str) -> Result<bool, StorageError>;

    // --- Victims -------------------------------------------------------------

    async fn save_victim(&self, victim: &Victim) -> Result<Victim, StorageError>;

    async fn get_victim(&self, id: &str) -> Result<Option<Victim>, StorageError>;

    async fn list_victims(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Victim>, StorageError>;

    async fn delete_victim(&self, id: &str) -> Result<bool, StorageError>;

    // --- Events --------------------------------------------------------------

    /// Upsert an event. Replacing an existing event deletes the previously
    /// owned target and victim nodes before linking the new ones.
    async fn save_event(&self, event: &Event) -> Result<Event, StorageError>;

    async fn get_event(&self, id: &str) -> Result<Option<Event>, StorageError>;

    async fn list_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError>;

    /// Remove an event, cascading to its owned target and victim nodes.
    async fn delete_event(&self, id: &str) -> Result<bool, StorageError>;

    /// Replace the event's target, deleting the previous target node if any.
    /// Returns [`StorageError::NotFound`] when the event does not exist.
    async fn set_event_target(&self, event_id: &str, target: &Target)
        -> Result<Target, StorageError>;

    /// Remove and delete the event's target. Returns `false` when the event
    /// exists but has no target; [`StorageError::NotFound`] when the event
    /// does not exist.
    async fn delete_event_target(&self, event_id: &str) -> Result<bool, StorageError>;

    // --- Groups --------------------------------------------------------------

    /// Upsert a group together with its events (each saved like
    /// [`save_event`](Storage::save_event) and linked with `CARRIED_OUT`).
    /// Replacing an existing group cascade-deletes the events it previously
    /// carried.
    async fn save_group(&self, group: &Group) -> Result<Group, StorageError>;

    async fn get_group(&self, id: &str) -> Result<Option<Group>, StorageError>;

    async fn list_groups(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Group>, StorageError>;

    /// Remove a group, cascading through its events.
    async fn delete_group(&self, id: &str) -> Result<bool, StorageError>;

    /// Page through one group's events. [`StorageError::NotFound`] when the
    /// group does not exist.
    async fn list_group_events(
        &self,
        group_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PageOf<Event>, StorageError>;

    /// Save a new event and link it to the group. [`StorageError::NotFound`]
    /// when the group does not exist.
    async fn add_group_event(&self, group_id: &str, event: &Event)
        -> Result<Event, StorageError>;

    /// Cascade-delete every event the group carried out. Returns the number
    /// of events removed; [`StorageError::NotFound`] when the group does not
    /// exist.
    async fn delete_group_events(&self, group_id: &str) -> Result<usize, StorageError>;

    // --- Users ---------------------------------------------------------------

    /// Insert a new account. Returns [`StorageError::Conflict`] when the name
    /// or email is already taken.
    async fn put_user(&self, user: &User) -> Result<(), StorageError>;

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StorageError>;
}
