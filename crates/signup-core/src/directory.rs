//! State and city lists for one country, memoized per state.

use std::collections::HashMap;

use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::models::{CityName, StateName};

pub struct RegionDirectory {
    api: ApiClient,
    country: String,
    states: Option<Vec<StateName>>,
    cities: HashMap<String, Vec<CityName>>,
}

impl RegionDirectory {
    pub fn new(api: ApiClient, country: &str) -> Self {
        Self {
            api,
            country: country.to_string(),
            states: None,
            cities: HashMap::new(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// States of the country, fetched on first use
    pub async fn states(&mut self) -> Result<&[StateName], ApiError> {
        if self.states.is_none() {
            let states = self.api.fetch_states(&self.country).await?;
            debug!(country = %self.country, count = states.len(), "Loaded states");
            self.states = Some(states);
        }
        Ok(self.states.as_deref().unwrap_or_default())
    }

    /// Cities of `state`. A state whose cities are already known is not
    /// fetched again.
    pub async fn cities(&mut self, state: &str) -> Result<&[CityName], ApiError> {
        if !self.cities.contains_key(state) {
            let cities = self.api.fetch_cities(state).await?;
            debug!(state = %state, count = cities.len(), "Loaded cities");
            self.cities.insert(state.to_string(), cities);
        }
        Ok(self.cities.get(state).map(Vec::as_slice).unwrap_or_default())
    }

    /// Cities already loaded for `state`, without fetching
    pub fn cached_cities(&self, state: &str) -> Option<&[CityName]> {
        self.cities.get(state).map(Vec::as_slice)
    }

    /// Record a city list obtained elsewhere (e.g. from a `DataLoader`)
    pub fn remember_cities(&mut self, state: &str, cities: Vec<CityName>) {
        self.cities.insert(state.to_string(), cities);
    }
}
