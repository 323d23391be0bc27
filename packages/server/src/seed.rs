//! Startup seeding of the read-only reference data (regions and countries).
//!
//! Seeding is idempotent: both `put_region` and `put_country` upsert by
//! name, so restarting against a persistent database neither duplicates nor
//! reassigns ids.

use std::sync::Arc;

use terrograph::types::{Country, Region};

use crate::storage::{Storage, StorageError};

/// Region names with the countries seeded under each.
const SEED: &[(&str, &[&str])] = &[
    (
        "North America",
        &["United States", "Canada", "Mexico"],
    ),
    (
        "Central America & Caribbean",
        &["Guatemala", "Honduras", "Nicaragua", "Haiti"],
    ),
    (
        "South America",
        &["Colombia", "Peru", "Chile", "Argentina", "Brazil", "Venezuela"],
    ),
    (
        "Western Europe",
        &[
            "United Kingdom",
            "Ireland",
            "France",
            "Spain",
            "Germany",
            "Italy",
            "Greece",
        ],
    ),
    (
        "Eastern Europe",
        &["Russia", "Ukraine", "Bosnia-Herzegovina", "Kosovo"],
    ),
    (
        "Middle East & North Africa",
        &[
            "Iraq",
            "Syria",
            "Yemen",
            "Egypt",
            "Libya",
            "Algeria",
            "Lebanon",
            "Israel",
            "Turkey",
            "Saudi Arabia",
            "Iran",
        ],
    ),
    (
        "Sub-Saharan Africa",
        &[
            "Nigeria",
            "Somalia",
            "Kenya",
            "Mali",
            "Cameroon",
            "Sudan",
            "South Sudan",
            "Democratic Republic of the Congo",
            "Burkina Faso",
        ],
    ),
    ("Central Asia", &["Tajikistan", "Kazakhstan", "Uzbekistan"]),
    (
        "South Asia",
        &["Afghanistan", "Pakistan", "India", "Sri Lanka", "Bangladesh", "Nepal"],
    ),
    (
        "Southeast Asia",
        &["Philippines", "Thailand", "Indonesia", "Myanmar", "Malaysia"],
    ),
    ("East Asia", &["China", "Japan"]),
    ("Australasia & Oceania", &["Australia", "New Zealand"]),
];

/// Upsert every seeded region and country. Runs before the server binds.
pub async fn run(storage: &Arc<dyn Storage>) -> Result<(), StorageError> {
    let mut countries = 0usize;
    for (region_name, country_names) in SEED {
        let region = storage.put_region(&Region::new(*region_name)).await?;
        for country_name in *country_names {
            storage
                .put_country(&Country::new(*country_name, Some(region.clone())))
                .await?;
            countries += 1;
        }
    }
    tracing::info!(
        "seeded {} regions and {countries} countries",
        SEED.len()
    );
    Ok(())
}
