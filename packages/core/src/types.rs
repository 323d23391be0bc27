//! Core data types for the terrograph domain model.
//!
//! This module defines the graph node structures the service records:
//! [`Region`], [`Country`], [`Province`], [`City`], [`Target`], [`Victim`],
//! [`Event`], [`Group`], and [`User`]. Nested fields are the graph edges;
//! storage persists each node's scalar payload separately and reassembles
//! the object graph on read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Generate a fresh UUIDv7 node id.
///
/// UUIDv7 ids sort lexicographically in creation order, which storage
/// backends rely on for stable listing without a secondary index.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// An authorization role attached to a [`User`].
///
/// Serialises as a lowercase string (e.g. `"user"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account created through registration. Required by every
    /// domain endpoint.
    User,
    /// Operator account, accepted wherever `user` is required.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role {s:?}; expected one of: user, admin")),
        }
    }
}

// ---------------------------------------------------------------------------
// Edge relations
// ---------------------------------------------------------------------------

/// The typed relationship an edge carries between two stored nodes.
///
/// Serialises as the upper snake-case string used in the edge table
/// (e.g. `"IN_REGION"`). Ordered so edge triples can live in ordered sets.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// country → region
    InRegion,
    /// province → country
    PartOf,
    /// city → province
    LocatedIn,
    /// target → country of origin
    Origin,
    /// event → target
    Targeted,
    /// event → city
    OccurredIn,
    /// event → victim
    Casualties,
    /// group → event
    CarriedOut,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relation::InRegion => "IN_REGION",
            Relation::PartOf => "PART_OF",
            Relation::LocatedIn => "LOCATED_IN",
            Relation::Origin => "ORIGIN",
            Relation::Targeted => "TARGETED",
            Relation::OccurredIn => "OCCURRED_IN",
            Relation::Casualties => "CASUALTIES",
            Relation::CarriedOut => "CARRIED_OUT",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Relation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_REGION" => Ok(Relation::InRegion),
            "PART_OF" => Ok(Relation::PartOf),
            "LOCATED_IN" => Ok(Relation::LocatedIn),
            "ORIGIN" => Ok(Relation::Origin),
            "TARGETED" => Ok(Relation::Targeted),
            "OCCURRED_IN" => Ok(Relation::OccurredIn),
            "CASUALTIES" => Ok(Relation::Casualties),
            "CARRIED_OUT" => Ok(Relation::CarriedOut),
            _ => Err(format!("unknown edge relation {s:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Node labels
// ---------------------------------------------------------------------------

/// The label (type tag) a stored node carries in the graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Region,
    Country,
    Province,
    City,
    Target,
    Victim,
    Event,
    Group,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Label::Region => "region",
            Label::Country => "country",
            Label::Province => "province",
            Label::City => "city",
            Label::Target => "target",
            Label::Victim => "victim",
            Label::Event => "event",
            Label::Group => "group",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Label {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "region" => Ok(Label::Region),
            "country" => Ok(Label::Country),
            "province" => Ok(Label::Province),
            "city" => Ok(Label::City),
            "target" => Ok(Label::Target),
            "victim" => Ok(Label::Victim),
            "event" => Ok(Label::Event),
            "group" => Ok(Label::Group),
            _ => Err(format!("unknown node label {s:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference data nodes
// ---------------------------------------------------------------------------

/// A geographic region (e.g. "Middle East & North Africa").
///
/// Reference data: seeded at startup, read-only over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
        }
    }
}

/// A country, linked to its [`Region`] by an `IN_REGION` edge.
///
/// Reference data: seeded at startup, read-only over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl Country {
    pub fn new(name: impl Into<String>, region: Option<Region>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            region,
        }
    }
}

// ---------------------------------------------------------------------------
// Writable domain nodes
// ---------------------------------------------------------------------------

/// An administrative province, linked to its [`Country`] by a `PART_OF` edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Province {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

/// A city with coordinates, linked to its [`Province`] by a `LOCATED_IN` edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<Province>,
}

/// The target of an event, linked to its country of origin by an
/// `ORIGIN` edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<Country>,
}

/// Casualty and damage figures for one event.
///
/// Counts are stored as signed integers so that out-of-range values arriving
/// through a patch document survive deserialization and are rejected by
/// validation with a proper violation report instead of a JSON type error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Victim {
    pub id: String,
    pub total_fatalities: i64,
    pub perpetrator_fatalities: i64,
    pub total_injured: i64,
    pub perpetrator_injured: i64,
    /// Property damage in whole US dollars.
    pub property_damage: i64,
}

/// A recorded terrorism event.
///
/// Edges: `TARGETED` → [`Target`], `OCCURRED_IN` → [`City`],
/// `CASUALTIES` → [`Victim`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub motive: String,
    /// Date the event occurred (ISO 8601 calendar date).
    pub date: NaiveDate,
    pub part_of_multiple_incidents: bool,
    pub successful: bool,
    pub suicidal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim: Option<Victim>,
}

/// A named group and the events it carried out (`CARRIED_OUT` edges).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered account. Never rendered over HTTP; the password is stored
/// as a bcrypt hash only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl User {
    /// `true` if the account carries `role`, with `admin` accepted wherever
    /// `user` is required.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role) || (role == Role::User && self.roles.contains(&Role::Admin))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
