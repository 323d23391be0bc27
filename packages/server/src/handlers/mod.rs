//! HTTP request handlers for all terrograph endpoints.
//!
//! Each submodule covers one resource. Handlers are pure async functions
//! that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`. Validation, referential checks
//! against the seeded countries, and patch application all happen here;
//! storage stays a data access layer.

pub mod auth;
pub mod cities;
pub mod countries;
pub mod events;
pub mod groups;
pub mod patching;
pub mod provinces;
pub mod regions;
pub mod targets;
pub mod victims;

use std::sync::Arc;

use terrograph::validation::{ConstraintViolation, ConstraintViolations, Validate};
use terrograph_api::dto::{CityDto, CountryDto, EventDto, GroupDto, ProvinceDto, TargetDto};

use crate::{
    assembler::Assembler, auth::TokenService, config::Config, error::AppError, storage::Storage,
};

/// Shared application state threaded through all Axum handlers via
/// [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Config,
    pub tokens: Arc<TokenService>,
    pub assembler: Assembler,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.token_ttl_secs));
        let assembler = Assembler::new(&config.api_base);
        Self {
            storage,
            config,
            tokens,
            assembler,
        }
    }
}

// ---------------------------------------------------------------------------
// Referential validation against the seeded countries
// ---------------------------------------------------------------------------
//
// Country names inside a write body must name seeded countries. The check is
// folded into the same aggregated violation list the DTO validation
// produces, so a client sees constraint and referential problems in one 422.

/// Validate `dto` and check every referenced country name it carries,
/// aggregating all violations into one error.
pub(crate) async fn validate_against_countries<D: Validate>(
    state: &AppState,
    dto: &D,
    country_refs: Vec<(String, String)>,
) -> Result<(), AppError> {
    let mut violations = match dto.validate() {
        Ok(()) => Vec::new(),
        Err(ConstraintViolations(found)) => found,
    };
    for (field, name) in country_refs {
        if state.storage.find_country_by_name(&name).await?.is_none() {
            violations.push(ConstraintViolation {
                field,
                message: format!("{name:?} is not a seeded country"),
            });
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(ConstraintViolations(violations)))
    }
}

fn country_ref(prefix: &str, country: &Option<CountryDto>) -> Vec<(String, String)> {
    match country.as_ref().and_then(|c| c.name.clone()) {
        Some(name) => vec![(format!("{prefix}.name"), name)],
        None => Vec::new(),
    }
}

pub(crate) fn province_country_refs(prefix: &str, dto: &ProvinceDto) -> Vec<(String, String)> {
    country_ref(&format!("{prefix}country"), &dto.country)
}

pub(crate) fn city_country_refs(prefix: &str, dto: &CityDto) -> Vec<(String, String)> {
    match &dto.province {
        Some(province) => province_country_refs(&format!("{prefix}province."), province),
        None => Vec::new(),
    }
}

pub(crate) fn target_country_refs(prefix: &str, dto: &TargetDto) -> Vec<(String, String)> {
    country_ref(&format!("{prefix}country_of_origin"), &dto.country_of_origin)
}

pub(crate) fn event_country_refs(prefix: &str, dto: &EventDto) -> Vec<(String, String)> {
    let mut refs = Vec::new();
    if let Some(target) = &dto.target {
        refs.extend(target_country_refs(&format!("{prefix}target."), target));
    }
    if let Some(city) = &dto.city {
        refs.extend(city_country_refs(&format!("{prefix}city."), city));
    }
    refs
}

pub(crate) fn group_country_refs(dto: &GroupDto) -> Vec<(String, String)> {
    dto.events
        .iter()
        .enumerate()
        .flat_map(|(i, event)| event_country_refs(&format!("events[{i}]."), event))
        .collect()
}
