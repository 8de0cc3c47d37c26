pub mod decode;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::models::{CatalogStatus, Country};
use crate::store::{self, Db, COUNTRIES_KEY, DATA_URL_KEY};

pub use decode::decode_countries;

pub const DEFAULT_DATA_URL: &str = "https://raw.githubusercontent.com/Nariman05Manas/countries_example.json/refs/heads/main/countries_example.json";

pub const FETCH_FAILED_MESSAGE: &str =
    "Could not load countries. Check your internet connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "count", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The fetched document replaced the catalog.
    Loaded(usize),
    /// The fetch failed and the existing catalog was kept.
    KeptExisting,
    /// The fetch failed on an empty catalog, so the built-in countries were seeded.
    SeededDefaults,
    /// Another refresh was still running.
    AlreadyRunning,
}

/// Owns the country collection and keeps it in sync with the remote document.
pub struct Catalog {
    conn: Db,
    http: reqwest::Client,
    countries: Mutex<Vec<Country>>,
    loading: AtomicBool,
    error_message: Mutex<Option<String>>,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Catalog {
    pub fn load(conn: Db, http: reqwest::Client) -> Self {
        let countries: Vec<Country> = store::load(&conn, COUNTRIES_KEY).unwrap_or_default();
        info!("Loaded {} saved countries", countries.len());
        Self {
            conn,
            http,
            countries: Mutex::new(countries),
            loading: AtomicBool::new(false),
            error_message: Mutex::new(None),
        }
    }

    pub fn data_source_url(&self) -> String {
        store::load(&self.conn, DATA_URL_KEY).unwrap_or_else(|| DEFAULT_DATA_URL.to_string())
    }

    pub fn set_data_source_url(&self, url: &str) -> Result<()> {
        store::save(&self.conn, DATA_URL_KEY, url)?;
        info!("Countries data URL set to {url}");
        Ok(())
    }

    pub fn countries(&self) -> Vec<Country> {
        guard(&self.countries).clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Country> {
        guard(&self.countries).iter().find(|c| c.id == id).cloned()
    }

    /// Case-insensitive match on name, capital or language. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Country> {
        let query = query.trim().to_lowercase();
        let countries = guard(&self.countries);
        if query.is_empty() {
            return countries.clone();
        }
        countries
            .iter()
            .filter(|c| {
                [&c.name, &c.capital, &c.language]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    pub fn status(&self) -> CatalogStatus {
        CatalogStatus {
            loading: self.loading.load(Ordering::Acquire),
            error: guard(&self.error_message).clone(),
            count: guard(&self.countries).len(),
        }
    }

    /// Returns `None` when a country with the same id is already in the catalog.
    pub fn add_country(&self, country: Country) -> Result<Option<Country>> {
        let mut countries = guard(&self.countries);
        if countries.iter().any(|c| c.id == country.id) {
            warn!("Country id {} already exists", country.id);
            return Ok(None);
        }
        let mut next = countries.clone();
        next.push(country.clone());
        store::save(&self.conn, COUNTRIES_KEY, &next)?;
        *countries = next;
        info!("Added country {} ({})", country.name, country.id);
        Ok(Some(country))
    }

    /// Returns false when no country has `id`.
    pub fn delete_country(&self, id: Uuid) -> Result<bool> {
        let mut countries = guard(&self.countries);
        let next: Vec<Country> = countries.iter().filter(|c| c.id != id).cloned().collect();
        if next.len() == countries.len() {
            return Ok(false);
        }
        store::save(&self.conn, COUNTRIES_KEY, &next)?;
        *countries = next;
        Ok(true)
    }

    /// One GET against the configured URL, decoded with the first matching strategy.
    pub async fn fetch_countries(&self) -> Result<Vec<Country>, CatalogError> {
        let url = self.data_source_url();
        info!("Fetching countries from {url}");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        let body = response.bytes().await?;
        decode_countries(&body)
    }

    /// Fetches and applies the remote catalog. Used both at startup and for manual refreshes;
    /// a call made while another is in flight returns immediately.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Countries refresh already in progress");
            return RefreshOutcome::AlreadyRunning;
        }
        let _loading = LoadingGuard(&self.loading);
        *guard(&self.error_message) = None;

        match self.fetch_countries().await {
            Ok(fetched) => {
                let count = fetched.len();
                let mut countries = guard(&self.countries);
                *countries = fetched;
                if let Err(e) = store::save(&self.conn, COUNTRIES_KEY, &*countries) {
                    error!("Failed to persist countries: {e}");
                }
                info!("Loaded {count} countries");
                RefreshOutcome::Loaded(count)
            }
            Err(e) => {
                warn!("Failed to load countries: {e}");
                *guard(&self.error_message) = Some(FETCH_FAILED_MESSAGE.to_string());

                let mut countries = guard(&self.countries);
                if !countries.is_empty() {
                    return RefreshOutcome::KeptExisting;
                }
                *countries = default_countries();
                if let Err(e) = store::save(&self.conn, COUNTRIES_KEY, &*countries) {
                    error!("Failed to persist default countries: {e}");
                }
                info!("Seeded {} default countries", countries.len());
                RefreshOutcome::SeededDefaults
            }
        }
    }
}

pub fn default_countries() -> Vec<Country> {
    vec![
        Country {
            id: Uuid::new_v4(),
            name: "France".to_string(),
            capital: "Paris".to_string(),
            currency: "Euro (EUR)".to_string(),
            currency_code: "EUR".to_string(),
            language: "French".to_string(),
            time_zone: "UTC+1 (CET)".to_string(),
            visa_required: false,
            visa_office: None,
            required_documents: None,
            attractions: vec![
                "Eiffel Tower".to_string(),
                "Louvre".to_string(),
                "Versailles".to_string(),
                "Notre-Dame de Paris".to_string(),
            ],
            useful_info: "France is one of the most visited countries in the world and its cuisine is famous everywhere. Try the croissants, baguettes and wine.".to_string(),
            flag: "🇫🇷".to_string(),
            image_url: None,
        },
        Country {
            id: Uuid::new_v4(),
            name: "Italy".to_string(),
            capital: "Rome".to_string(),
            currency: "Euro (EUR)".to_string(),
            currency_code: "EUR".to_string(),
            language: "Italian".to_string(),
            time_zone: "UTC+1 (CET)".to_string(),
            visa_required: false,
            visa_office: None,
            required_documents: None,
            attractions: vec![
                "Colosseum".to_string(),
                "Leaning Tower of Pisa".to_string(),
                "Venice".to_string(),
                "Vatican".to_string(),
            ],
            useful_info: "Italy is the home of pizza, pasta and great coffee. Visit the Colosseum, the Leaning Tower of Pisa and Venice. Italians are friendly, talk loudly and gesture a lot.".to_string(),
            flag: "🇮🇹".to_string(),
            image_url: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::load(store::open_in_memory().unwrap(), reqwest::Client::new())
    }

    #[test]
    fn data_source_url_falls_back_to_default_until_set() {
        let catalog = catalog();
        assert_eq!(catalog.data_source_url(), DEFAULT_DATA_URL);

        catalog.set_data_source_url("http://localhost:9000/c.json").unwrap();
        assert_eq!(catalog.data_source_url(), "http://localhost:9000/c.json");
    }

    #[test]
    fn add_and_delete_persist_the_collection() {
        let conn = store::open_in_memory().unwrap();
        let catalog = Catalog::load(conn.clone(), reqwest::Client::new());
        let [france, italy] = <[Country; 2]>::try_from(default_countries()).unwrap();

        catalog.add_country(france.clone()).unwrap();
        catalog.add_country(italy.clone()).unwrap();
        assert!(catalog.delete_country(france.id).unwrap());
        assert!(!catalog.delete_country(france.id).unwrap());

        let reloaded = Catalog::load(conn, reqwest::Client::new());
        assert_eq!(reloaded.countries(), vec![italy.clone()]);
        assert_eq!(reloaded.get(italy.id), Some(italy));
    }

    #[test]
    fn adding_a_duplicate_id_is_rejected_and_not_persisted() {
        let conn = store::open_in_memory().unwrap();
        let catalog = Catalog::load(conn.clone(), reqwest::Client::new());
        let [france, italy] = <[Country; 2]>::try_from(default_countries()).unwrap();
        catalog.add_country(france.clone()).unwrap();

        let clash = Country {
            id: france.id,
            ..italy
        };
        assert_eq!(catalog.add_country(clash).unwrap(), None);

        assert_eq!(catalog.countries(), vec![france.clone()]);
        let stored: Vec<Country> = store::load(&conn, COUNTRIES_KEY).unwrap();
        assert_eq!(stored, vec![france]);
    }

    #[test]
    fn failed_save_leaves_the_catalog_untouched() {
        let conn = store::open_in_memory().unwrap();
        let catalog = Catalog::load(conn.clone(), reqwest::Client::new());
        let [france, italy] = <[Country; 2]>::try_from(default_countries()).unwrap();
        catalog.add_country(france.clone()).unwrap();

        conn.lock().unwrap().execute_batch("DROP TABLE kv_store").unwrap();

        assert!(catalog.add_country(italy).is_err());
        assert!(catalog.delete_country(france.id).is_err());
        assert_eq!(catalog.countries(), vec![france]);
    }

    #[test]
    fn search_matches_name_capital_and_language() {
        let catalog = catalog();
        for country in default_countries() {
            catalog.add_country(country).unwrap();
        }

        assert_eq!(catalog.search("").len(), 2);
        assert_eq!(catalog.search("paris")[0].name, "France");
        assert_eq!(catalog.search("ITALIAN")[0].name, "Italy");
        assert!(catalog.search("tokyo").is_empty());
    }

    #[test]
    fn default_countries_are_two_distinct_records() {
        let defaults = default_countries();
        assert_eq!(defaults.len(), 2);
        assert_ne!(defaults[0].id, defaults[1].id);
    }
}
