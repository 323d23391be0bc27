//! Model assembly: domain nodes to hypermedia models.
//!
//! The assembler owns the configured base URL and turns stored nodes into
//! the output models defined in `terrograph-api`, attaching `self` and
//! relation links and rendering nested relations down to the requested
//! depth. Depth `0` renders only the node itself; each nested level consumes
//! one unit. Beyond the limit the nested object is omitted while its link
//! remains, so clients can still navigate.

use terrograph::types::{City, Country, Event, Group, Province, Region, Target, Victim};
use terrograph_api::model::{
    CityModel, CountryModel, EventModel, GroupModel, Link, ProvinceModel, RegionModel,
    TargetModel, VictimModel,
};
use terrograph_api::page::Page;

/// Builds output models with absolute link hrefs.
#[derive(Debug, Clone)]
pub struct Assembler {
    base: String,
}

impl Assembler {
    pub fn new(api_base: &str) -> Self {
        Self {
            base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn href(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base)
    }

    // --- entity models -------------------------------------------------------

    pub fn region(&self, node: &Region) -> RegionModel {
        RegionModel {
            id: node.id.clone(),
            name: node.name.clone(),
            links: vec![Link::new("self", self.href(&format!("/regions/{}", node.id)))],
        }
    }

    pub fn country(&self, node: &Country, depth: usize) -> CountryModel {
        CountryModel {
            id: node.id.clone(),
            name: node.name.clone(),
            region: match (depth, &node.region) {
                (0, _) | (_, None) => None,
                (_, Some(region)) => Some(self.region(region)),
            },
            links: vec![Link::new(
                "self",
                self.href(&format!("/countries/{}", node.id)),
            )],
        }
    }

    pub fn province(&self, node: &Province, depth: usize) -> ProvinceModel {
        ProvinceModel {
            id: node.id.clone(),
            name: node.name.clone(),
            country: match (depth, &node.country) {
                (0, _) | (_, None) => None,
                (_, Some(country)) => Some(self.country(country, depth - 1)),
            },
            links: vec![Link::new(
                "self",
                self.href(&format!("/provinces/{}", node.id)),
            )],
        }
    }

    pub fn city(&self, node: &City, depth: usize) -> CityModel {
        CityModel {
            id: node.id.clone(),
            name: node.name.clone(),
            latitude: node.latitude,
            longitude: node.longitude,
            province: match (depth, &node.province) {
                (0, _) | (_, None) => None,
                (_, Some(province)) => Some(self.province(province, depth - 1)),
            },
            links: vec![Link::new("self", self.href(&format!("/cities/{}", node.id)))],
        }
    }

    pub fn target(&self, node: &Target, depth: usize) -> TargetModel {
        TargetModel {
            id: node.id.clone(),
            name: node.name.clone(),
            country_of_origin: match (depth, &node.country_of_origin) {
                (0, _) | (_, None) => None,
                (_, Some(country)) => Some(self.country(country, depth - 1)),
            },
            links: vec![Link::new(
                "self",
                self.href(&format!("/targets/{}", node.id)),
            )],
        }
    }

    pub fn victim(&self, node: &Victim) -> VictimModel {
        VictimModel {
            id: node.id.clone(),
            total_fatalities: node.total_fatalities,
            perpetrator_fatalities: node.perpetrator_fatalities,
            total_injured: node.total_injured,
            perpetrator_injured: node.perpetrator_injured,
            property_damage: node.property_damage,
            links: vec![Link::new(
                "self",
                self.href(&format!("/victims/{}", node.id)),
            )],
        }
    }

    pub fn event(&self, node: &Event, depth: usize) -> EventModel {
        EventModel {
            id: node.id.clone(),
            summary: node.summary.clone(),
            motive: node.motive.clone(),
            date: node.date,
            part_of_multiple_incidents: node.part_of_multiple_incidents,
            successful: node.successful,
            suicidal: node.suicidal,
            target: match (depth, &node.target) {
                (0, _) | (_, None) => None,
                (_, Some(target)) => Some(self.target(target, depth - 1)),
            },
            city: match (depth, &node.city) {
                (0, _) | (_, None) => None,
                (_, Some(city)) => Some(self.city(city, depth - 1)),
            },
            victim: match (depth, &node.victim) {
                (0, _) | (_, None) => None,
                (_, Some(victim)) => Some(self.victim(victim)),
            },
            links: vec![
                Link::new("self", self.href(&format!("/events/{}", node.id))),
                Link::new("target", self.href(&format!("/events/{}/targets", node.id))),
            ],
        }
    }

    pub fn group(&self, node: &Group, depth: usize) -> GroupModel {
        GroupModel {
            id: node.id.clone(),
            name: node.name.clone(),
            events: if depth == 0 {
                None
            } else {
                Some(
                    node.events
                        .iter()
                        .map(|event| self.event(event, depth - 1))
                        .collect(),
                )
            },
            links: vec![
                Link::new("self", self.href(&format!("/groups/{}", node.id))),
                Link::new("events", self.href(&format!("/groups/{}/events", node.id))),
            ],
        }
    }

    // --- page links ----------------------------------------------------------

    /// Attach `first` / `self` / `next` / `last` links to a page envelope.
    ///
    /// `path` is the collection path relative to `/api/v1`
    /// (e.g. `"/events"`).
    pub fn paged<T>(&self, path: &str, mut page: Page<T>) -> Page<T> {
        let size = page.page.size;
        let page_href =
            |n: usize| self.href(&format!("{path}?page={n}&size={size}"));

        let mut links = vec![Link::new("first", page_href(0))];
        links.push(Link::new("self", page_href(page.page.number)));
        if let Some(next) = page.next_page() {
            links.push(Link::new("next", page_href(next)));
        }
        if let Some(last) = page.last_page() {
            links.push(Link::new("last", page_href(last)));
        }
        page.links = links;
        page
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
