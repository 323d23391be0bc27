//! Input representations (DTOs) for write endpoints.
//!
//! Every field a client must supply is an `Option` behind `serde(default)`:
//! a missing member deserializes instead of failing, and presence is then
//! enforced by [`Validate`] so one 422 response can report the complete set
//! of violations, nested fields included, with dotted paths.
//!
//! `try_into_node` converts a DTO into its domain node after validating it,
//! assigning fresh UUIDv7 ids. Country and region names are carried through
//! as placeholder nodes; the server resolves them against the seeded
//! reference data when persisting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use terrograph::types::{new_id, City, Country, Event, Group, Province, Target, Victim};
use terrograph::validation::{
    ConstraintViolation, ConstraintViolations, Validate, Violations,
};

/// Unwrap a field that [`Validate`] already proved present.
///
/// Kept as a `Result` so conversion never panics even when called without a
/// prior validation pass.
fn require<T>(value: Option<T>, field: &str) -> Result<T, ConstraintViolations> {
    value.ok_or_else(|| {
        ConstraintViolations(vec![ConstraintViolation {
            field: field.into(),
            message: "is required".into(),
        }])
    })
}

fn is_blank(s: &Option<String>) -> bool {
    matches!(s, Some(v) if v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Country
// ---------------------------------------------------------------------------

/// Reference to a seeded country by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CountryDto {
    #[serde(default)]
    pub name: Option<String>,
}

impl Validate for CountryDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.name.is_none(), "name", "is required");
        v.check(is_blank(&self.name), "name", "must not be blank");
        v.finish()
    }
}

impl CountryDto {
    pub fn try_into_node(self) -> Result<Country, ConstraintViolations> {
        self.validate()?;
        let name = require(self.name, "name")?;
        Ok(Country::new(name.trim().to_string(), None))
    }

    pub fn from_node(node: &Country) -> Self {
        Self {
            name: Some(node.name.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Province
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProvinceDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<CountryDto>,
}

impl Validate for ProvinceDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.name.is_none(), "name", "is required");
        v.check(is_blank(&self.name), "name", "must not be blank");
        match &self.country {
            Some(country) => v.nested("country", country),
            None => v.add("country", "is required"),
        }
        v.finish()
    }
}

impl ProvinceDto {
    pub fn try_into_node(self) -> Result<Province, ConstraintViolations> {
        self.validate()?;
        let name = require(self.name, "name")?;
        let country = require(self.country, "country")?.try_into_node()?;
        Ok(Province {
            id: new_id(),
            name: name.trim().to_string(),
            country: Some(country),
        })
    }

    pub fn from_node(node: &Province) -> Self {
        Self {
            name: Some(node.name.clone()),
            country: node.country.as_ref().map(CountryDto::from_node),
        }
    }
}

// ---------------------------------------------------------------------------
// City
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CityDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub province: Option<ProvinceDto>,
}

impl Validate for CityDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.name.is_none(), "name", "is required");
        v.check(is_blank(&self.name), "name", "must not be blank");
        match self.latitude {
            None => v.add("latitude", "is required"),
            Some(lat) if !(-90.0..=90.0).contains(&lat) => {
                v.add("latitude", "must be between -90 and 90")
            }
            _ => {}
        }
        match self.longitude {
            None => v.add("longitude", "is required"),
            Some(lon) if !(-180.0..=180.0).contains(&lon) => {
                v.add("longitude", "must be between -180 and 180")
            }
            _ => {}
        }
        match &self.province {
            Some(province) => v.nested("province", province),
            None => v.add("province", "is required"),
        }
        v.finish()
    }
}

impl CityDto {
    pub fn try_into_node(self) -> Result<City, ConstraintViolations> {
        self.validate()?;
        let name = require(self.name, "name")?;
        let latitude = require(self.latitude, "latitude")?;
        let longitude = require(self.longitude, "longitude")?;
        let province = require(self.province, "province")?.try_into_node()?;
        Ok(City {
            id: new_id(),
            name: name.trim().to_string(),
            latitude,
            longitude,
            province: Some(province),
        })
    }

    pub fn from_node(node: &City) -> Self {
        Self {
            name: Some(node.name.clone()),
            latitude: Some(node.latitude),
            longitude: Some(node.longitude),
            province: node.province.as_ref().map(ProvinceDto::from_node),
        }
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TargetDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_of_origin: Option<CountryDto>,
}

impl Validate for TargetDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.name.is_none(), "name", "is required");
        v.check(is_blank(&self.name), "name", "must not be blank");
        match &self.country_of_origin {
            Some(country) => v.nested("country_of_origin", country),
            None => v.add("country_of_origin", "is required"),
        }
        v.finish()
    }
}

impl TargetDto {
    pub fn try_into_node(self) -> Result<Target, ConstraintViolations> {
        self.validate()?;
        let name = require(self.name, "name")?;
        let country = require(self.country_of_origin, "country_of_origin")?.try_into_node()?;
        Ok(Target {
            id: new_id(),
            name: name.trim().to_string(),
            country_of_origin: Some(country),
        })
    }

    pub fn from_node(node: &Target) -> Self {
        Self {
            name: Some(node.name.clone()),
            country_of_origin: node.country_of_origin.as_ref().map(CountryDto::from_node),
        }
    }
}

// ---------------------------------------------------------------------------
// Victim
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VictimDto {
    #[serde(default)]
    pub total_fatalities: Option<i64>,
    #[serde(default)]
    pub perpetrator_fatalities: Option<i64>,
    #[serde(default)]
    pub total_injured: Option<i64>,
    #[serde(default)]
    pub perpetrator_injured: Option<i64>,
    #[serde(default)]
    pub property_damage: Option<i64>,
}

impl Validate for VictimDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        let non_negative = [
            ("total_fatalities", self.total_fatalities),
            ("perpetrator_fatalities", self.perpetrator_fatalities),
            ("total_injured", self.total_injured),
            ("perpetrator_injured", self.perpetrator_injured),
            ("property_damage", self.property_damage),
        ];
        for (field, value) in non_negative {
            match value {
                None => v.add(field, "is required"),
                Some(n) if n < 0 => v.add(field, "must not be negative"),
                _ => {}
            }
        }
        if let (Some(perp), Some(total)) = (self.perpetrator_fatalities, self.total_fatalities) {
            v.check(
                perp > total && perp >= 0 && total >= 0,
                "perpetrator_fatalities",
                "must not exceed total_fatalities",
            );
        }
        if let (Some(perp), Some(total)) = (self.perpetrator_injured, self.total_injured) {
            v.check(
                perp > total && perp >= 0 && total >= 0,
                "perpetrator_injured",
                "must not exceed total_injured",
            );
        }
        v.finish()
    }
}

impl VictimDto {
    pub fn try_into_node(self) -> Result<Victim, ConstraintViolations> {
        self.validate()?;
        Ok(Victim {
            id: new_id(),
            total_fatalities: require(self.total_fatalities, "total_fatalities")?,
            perpetrator_fatalities: require(
                self.perpetrator_fatalities,
                "perpetrator_fatalities",
            )?,
            total_injured: require(self.total_injured, "total_injured")?,
            perpetrator_injured: require(self.perpetrator_injured, "perpetrator_injured")?,
            property_damage: require(self.property_damage, "property_damage")?,
        })
    }

    pub fn from_node(node: &Victim) -> Self {
        Self {
            total_fatalities: Some(node.total_fatalities),
            perpetrator_fatalities: Some(node.perpetrator_fatalities),
            total_injured: Some(node.total_injured),
            perpetrator_injured: Some(node.perpetrator_injured),
            property_damage: Some(node.property_damage),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventDto {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub motive: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub part_of_multiple_incidents: Option<bool>,
    #[serde(default)]
    pub successful: Option<bool>,
    #[serde(default)]
    pub suicidal: Option<bool>,
    #[serde(default)]
    pub target: Option<TargetDto>,
    #[serde(default)]
    pub city: Option<CityDto>,
    #[serde(default)]
    pub victim: Option<VictimDto>,
}

impl Validate for EventDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.summary.is_none(), "summary", "is required");
        v.check(is_blank(&self.summary), "summary", "must not be blank");
        v.check(self.motive.is_none(), "motive", "is required");
        v.check(is_blank(&self.motive), "motive", "must not be blank");
        match self.date {
            None => v.add("date", "is required"),
            Some(d) if d > chrono::Utc::now().date_naive() => {
                v.add("date", "must not be in the future")
            }
            _ => {}
        }
        v.check(
            self.part_of_multiple_incidents.is_none(),
            "part_of_multiple_incidents",
            "is required",
        );
        v.check(self.successful.is_none(), "successful", "is required");
        v.check(self.suicidal.is_none(), "suicidal", "is required");
        match &self.target {
            Some(target) => v.nested("target", target),
            None => v.add("target", "is required"),
        }
        match &self.city {
            Some(city) => v.nested("city", city),
            None => v.add("city", "is required"),
        }
        match &self.victim {
            Some(victim) => v.nested("victim", victim),
            None => v.add("victim", "is required"),
        }
        v.finish()
    }
}

impl EventDto {
    pub fn try_into_node(self) -> Result<Event, ConstraintViolations> {
        self.validate()?;
        let target = require(self.target, "target")?.try_into_node()?;
        let city = require(self.city, "city")?.try_into_node()?;
        let victim = require(self.victim, "victim")?.try_into_node()?;
        Ok(Event {
            id: new_id(),
            summary: require(self.summary, "summary")?.trim().to_string(),
            motive: require(self.motive, "motive")?.trim().to_string(),
            date: require(self.date, "date")?,
            part_of_multiple_incidents: require(
                self.part_of_multiple_incidents,
                "part_of_multiple_incidents",
            )?,
            successful: require(self.successful, "successful")?,
            suicidal: require(self.suicidal, "suicidal")?,
            target: Some(target),
            city: Some(city),
            victim: Some(victim),
        })
    }

    pub fn from_node(node: &Event) -> Self {
        Self {
            summary: Some(node.summary.clone()),
            motive: Some(node.motive.clone()),
            date: Some(node.date),
            part_of_multiple_incidents: Some(node.part_of_multiple_incidents),
            successful: Some(node.successful),
            suicidal: Some(node.suicidal),
            target: node.target.as_ref().map(TargetDto::from_node),
            city: node.city.as_ref().map(CityDto::from_node),
            victim: node.victim.as_ref().map(VictimDto::from_node),
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GroupDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub events: Vec<EventDto>,
}

impl Validate for GroupDto {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(self.name.is_none(), "name", "is required");
        v.check(is_blank(&self.name), "name", "must not be blank");
        v.check(self.events.is_empty(), "events", "must contain at least one event");
        for (i, event) in self.events.iter().enumerate() {
            v.nested(&format!("events[{i}]"), event);
        }
        v.finish()
    }
}

impl GroupDto {
    pub fn try_into_node(self) -> Result<Group, ConstraintViolations> {
        self.validate()?;
        let name = require(self.name, "name")?;
        let events = self
            .events
            .into_iter()
            .map(EventDto::try_into_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Group {
            id: new_id(),
            name: name.trim().to_string(),
            events,
        })
    }

    pub fn from_node(node: &Group) -> Self {
        Self {
            name: Some(node.name.clone()),
            events: node.events.iter().map(EventDto::from_node).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn victim_dto() -> VictimDto {
        VictimDto {
            total_fatalities: Some(2),
            perpetrator_fatalities: Some(1),
            total_injured: Some(9),
            perpetrator_injured: Some(0),
            property_damage: Some(10_000),
        }
    }

    fn city_dto() -> CityDto {
        CityDto {
            name: Some("Mosul".into()),
            latitude: Some(36.34),
            longitude: Some(43.13),
            province: Some(ProvinceDto {
                name: Some("Nineveh".into()),
                country: Some(CountryDto {
                    name: Some("Iraq".into()),
                }),
            }),
        }
    }

    fn event_dto() -> EventDto {
        EventDto {
            summary: Some("IED attack on a market.".into()),
            motive: Some("Unknown".into()),
            date: Some(chrono::NaiveDate::from_ymd_opt(2016, 5, 20).unwrap()),
            part_of_multiple_incidents: Some(false),
            successful: Some(true),
            suicidal: Some(false),
            target: Some(TargetDto {
                name: Some("Market".into()),
                country_of_origin: Some(CountryDto {
                    name: Some("Iraq".into()),
                }),
            }),
            city: Some(city_dto()),
            victim: Some(victim_dto()),
        }
    }

    #[test]
    fn valid_event_converts_with_fresh_ids() {
        let node = event_dto().try_into_node().unwrap();
        assert_eq!(node.summary, "IED attack on a market.");
        assert!(!node.id.is_empty());
        assert_ne!(node.id, node.target.as_ref().unwrap().id);
        assert_eq!(node.city.unwrap().province.unwrap().name, "Nineveh");
    }

    #[test]
    fn empty_event_reports_every_missing_field() {
        let err = EventDto::default().validate().unwrap_err();
        let fields: Vec<&str> = err.0.iter().map(|v| v.field.as_str()).collect();
        for expected in [
            "summary",
            "motive",
            "date",
            "part_of_multiple_incidents",
            "successful",
            "suicidal",
            "target",
            "city",
            "victim",
        ] {
            assert!(fields.contains(&expected), "missing violation for {expected}");
        }
    }

    #[test]
    fn nested_violations_carry_dotted_paths() {
        let mut dto = event_dto();
        dto.target = Some(TargetDto {
            name: Some("  ".into()),
            country_of_origin: Some(CountryDto { name: None }),
        });
        let err = dto.validate().unwrap_err();
        let fields: Vec<&str> = err.0.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"target.name"));
        assert!(fields.contains(&"target.country_of_origin.name"));
    }

    #[test]
    fn future_date_rejected() {
        let mut dto = event_dto();
        dto.date = Some(chrono::Utc::now().date_naive() + chrono::Days::new(2));
        let err = dto.validate().unwrap_err();
        assert_eq!(err.0[0].field, "date");
    }

    #[test]
    fn victim_counts_must_be_consistent() {
        let mut dto = victim_dto();
        dto.perpetrator_fatalities = Some(5);
        let err = dto.validate().unwrap_err();
        assert_eq!(err.0[0].field, "perpetrator_fatalities");

        let mut dto = victim_dto();
        dto.total_injured = Some(-1);
        let err = dto.validate().unwrap_err();
        assert_eq!(err.0[0].field, "total_injured");
    }

    #[test]
    fn city_coordinates_are_bounded() {
        let mut dto = city_dto();
        dto.latitude = Some(91.0);
        dto.longitude = Some(-200.0);
        let err = dto.validate().unwrap_err();
        let fields: Vec<&str> = err.0.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"latitude"));
        assert!(fields.contains(&"longitude"));
    }

    #[test]
    fn group_requires_at_least_one_event() {
        let dto = GroupDto {
            name: Some("Black Banner".into()),
            events: vec![],
        };
        let err = dto.validate().unwrap_err();
        assert_eq!(err.0[0].field, "events");
    }

    #[test]
    fn group_event_violations_are_indexed() {
        let dto = GroupDto {
            name: Some("Black Banner".into()),
            events: vec![event_dto(), EventDto::default()],
        };
        let err = dto.validate().unwrap_err();
        assert!(err.0.iter().all(|v| v.field.starts_with("events[1].")));
    }

    #[test]
    fn missing_members_deserialize_then_fail_validation() {
        let dto: EventDto = serde_json::from_value(json!({
            "summary": "Something happened."
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn from_node_roundtrip_revalidates() {
        let node = event_dto().try_into_node().unwrap();
        let dto = EventDto::from_node(&node);
        assert!(dto.validate().is_ok());
    }
}
