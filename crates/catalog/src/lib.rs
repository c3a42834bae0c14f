use foundation::math::GeoPoint;
use serde::{Deserialize, Serialize};

const BUNDLED_CITIES: &str = include_str!("../data/cities.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl City {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            country_code: None,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Corrupt(String),
    InvalidCity { index: usize, name: String },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Corrupt(msg) => write!(f, "city catalog corrupt: {msg}"),
            CatalogError::InvalidCity { index, name } => {
                write!(f, "city #{index} ({name}) has out-of-range coordinates")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Ordered, immutable city list. A city's identity is its index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CityCatalog {
    cities: Vec<City>,
}

impl CityCatalog {
    pub fn new(cities: Vec<City>) -> Result<Self, CatalogError> {
        for (index, city) in cities.iter().enumerate() {
            if !city.location().is_valid() {
                return Err(CatalogError::InvalidCity {
                    index,
                    name: city.name.clone(),
                });
            }
        }
        Ok(Self { cities })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let cities: Vec<City> =
            serde_json::from_str(json).map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        Self::new(cities)
    }

    /// The catalog compiled into the crate.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CITIES)
    }

    /// The first `n` cities (or all of them when fewer).
    pub fn prefix(&self, n: usize) -> &[City] {
        &self.cities[..n.min(self.cities.len())]
    }

    pub fn get(&self, index: usize) -> Option<&City> {
        self.cities.get(index)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, City, CityCatalog};
    use pretty_assertions::assert_eq;

    #[test]
    fn bundled_catalog_parses() {
        let catalog = CityCatalog::bundled().unwrap();
        assert!(catalog.len() >= 20);
        let tokyo = catalog.iter().find(|c| c.name == "Tokyo").unwrap();
        assert_eq!(tokyo.country_code.as_deref(), Some("JP"));
    }

    #[test]
    fn country_code_is_optional() {
        let catalog = CityCatalog::from_json(r#"[{"name":"Nowhere","lat":1.0,"lon":2.0}]"#).unwrap();
        assert_eq!(catalog.get(0), Some(&City::new("Nowhere", 1.0, 2.0)));
    }

    #[test]
    fn prefix_is_clamped_and_ordered() {
        let catalog = CityCatalog::new(vec![
            City::new("a", 0.0, 0.0),
            City::new("b", 1.0, 1.0),
            City::new("c", 2.0, 2.0),
        ])
        .unwrap();
        let names: Vec<_> = catalog.prefix(2).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(catalog.prefix(10).len(), 3);
    }

    #[test]
    fn rejects_out_of_range_city() {
        let err = CityCatalog::new(vec![City::new("ok", 0.0, 0.0), City::new("bad", 91.0, 0.0)])
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidCity {
                index: 1,
                name: "bad".to_string()
            }
        );
    }

    #[test]
    fn malformed_json_is_corrupt() {
        assert!(matches!(
            CityCatalog::from_json("{not json"),
            Err(CatalogError::Corrupt(_))
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let mut city = City::new("Oslo", 59.91, 10.75);
        city.country_code = Some("NO".to_string());
        let json = serde_json::to_string(&city).unwrap();
        assert!(json.contains("\"countryCode\":\"NO\""));
    }
}
