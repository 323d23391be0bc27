//! Request and response types for the terrograph HTTP API.
//!
//! This crate encodes the HTTP contract as Rust types: validation-bearing
//! input DTOs, hypermedia output models, pagination envelopes, auth
//! requests, and the error body. It is shared by the server and by clients
//! that want typed access to the API.
//!
//! # Endpoints covered
//!
//! | Method | Path | Types |
//! |--------|------|-------|
//! | POST | `/api/v1/registration` | [`RegistrationRequest`] → [`TokenResponse`] |
//! | POST | `/api/v1/authentication` | [`AuthenticationRequest`] → [`TokenResponse`] |
//! | GET | `/api/v1/regions[/{id}]` | → [`RegionModel`] / [`Page`] |
//! | GET | `/api/v1/countries[/{id}]` | → [`CountryModel`] / [`Page`] |
//! | CRUD | `/api/v1/provinces[/{id}]` | [`ProvinceDto`] → [`ProvinceModel`] |
//! | CRUD | `/api/v1/cities[/{id}]` | [`CityDto`] → [`CityModel`] |
//! | CRUD | `/api/v1/targets[/{id}]` | [`TargetDto`] → [`TargetModel`] |
//! | CRUD | `/api/v1/victims[/{id}]` | [`VictimDto`] → [`VictimModel`] |
//! | CRUD | `/api/v1/events[/{id}]` | [`EventDto`] → [`EventModel`] |
//! | CRUD | `/api/v1/groups[/{id}]` | [`GroupDto`] → [`GroupModel`] |
//! | GET/PUT/DELETE | `/api/v1/events/{id}/targets` | [`TargetDto`] → [`TargetModel`] |
//! | GET/POST/DELETE | `/api/v1/groups/{id}/events` | [`EventDto`] → [`EventModel`] |

pub mod auth;
pub mod dto;
pub mod error;
pub mod model;
pub mod page;

pub use auth::{AuthenticationRequest, RegistrationRequest, TokenResponse};
pub use dto::{CityDto, CountryDto, EventDto, GroupDto, ProvinceDto, TargetDto, VictimDto};
pub use error::ErrorResponse;
pub use model::{
    CityModel, CountryModel, EventModel, GroupModel, Link, ProvinceModel, RegionModel,
    TargetModel, VictimModel,
};
pub use page::{DepthParams, Page, PageMeta, PageParams};
