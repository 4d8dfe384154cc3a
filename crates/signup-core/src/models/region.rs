use serde::{Deserialize, Serialize};

/// One entry of `GET /states/{country}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateName {
    pub state_name: String,
}

/// One entry of `GET /cities/{state}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityName {
    pub city_name: String,
}

impl StateName {
    pub fn as_str(&self) -> &str {
        &self.state_name
    }
}

impl CityName {
    pub fn as_str(&self) -> &str {
        &self.city_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_states_response() {
        let json = r#"[{"state_name": "Alabama"}, {"state_name": "Alaska"}]"#;
        let states: Vec<StateName> = serde_json::from_str(json).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].as_str(), "Alabama");
        assert_eq!(states[1].as_str(), "Alaska");
    }

    #[test]
    fn test_parse_cities_ignores_extra_fields() {
        let json = r#"[{"city_name": "Juneau", "population": 32000}]"#;
        let cities: Vec<CityName> = serde_json::from_str(json).unwrap();
        assert_eq!(cities[0].as_str(), "Juneau");
    }
}
