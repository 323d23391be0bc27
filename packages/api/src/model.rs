//! Output representations (Models) returned to clients.
//!
//! Models mirror the domain nodes but carry hypermedia `links` and render
//! nested relations only down to the client-requested depth. The server's
//! assembler constructs them; this crate only defines the wire shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// A hypermedia link.
///
/// ```json
/// { "rel": "self", "href": "http://localhost:3000/api/v1/events/0195..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionModel {
    pub id: String,
    pub name: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryModel {
    pub id: String,
    pub name: String,
    /// Absent when the relation is missing or the render depth is exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionModel>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvinceModel {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryModel>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CityModel {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<ProvinceModel>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetModel {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<CountryModel>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VictimModel {
    pub id: String,
    pub total_fatalities: i64,
    pub perpetrator_fatalities: i64,
    pub total_injured: i64,
    pub perpetrator_injured: i64,
    pub property_damage: i64,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventModel {
    pub id: String,
    pub summary: String,
    pub motive: String,
    pub date: NaiveDate,
    pub part_of_multiple_incidents: bool,
    pub successful: bool,
    pub suicidal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<CityModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim: Option<VictimModel>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupModel {
    pub id: String,
    pub name: String,
    /// `None` when the render depth is exhausted; an empty list means the
    /// group genuinely has no recorded events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventModel>>,
    pub links: Vec<Link>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
