use serde::{Deserialize, Serialize};

/// A person held by the recommendation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub age: u32,
    pub latitude: f64,
    pub longitude: f64,
}

/// A recommended neighbor, as carried in the `result` array of `/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub name: String,
    pub age: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Haversine distance to the query point in kilometers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Neighbor {
    pub fn from_person(person: Person, distance: f64) -> Self {
        Neighbor {
            name: person.name,
            age: person.age,
            latitude: person.latitude,
            longitude: person.longitude,
            distance: Some(distance),
        }
    }
}

/// Query string of `GET /query`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub latitude: f64,
    pub longitude: f64,
    pub age: u32,
}

/// Body of a successful `GET /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: Vec<Neighbor>,
}

/// Query string of `GET /profile`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    pub num_loops: usize,
    pub num_neighbors: usize,
    pub age_proximity: u32,
}

/// Descriptive statistics over k-NN query timings, in seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    pub nobs: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub fraction_over_one_second: f64,
}

/// Body of a successful `GET /profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub stats: ProfileStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_deserializes_without_distance() {
        let json = r#"{"result":[{"name":"jane doe","age":30,"latitude":51.5,"longitude":-0.11}]}"#;
        let resp: QueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.len(), 1);
        assert_eq!(resp.result[0].name, "jane doe");
        assert_eq!(resp.result[0].age, 30);
        assert!(resp.result[0].distance.is_none());
    }

    #[test]
    fn test_neighbor_from_person_keeps_fields() {
        let person = Person {
            id: 7,
            name: "agent,smith".to_string(),
            age: 33,
            latitude: 10.5,
            longitude: -3.25,
        };
        let neighbor = Neighbor::from_person(person, 12.5);
        assert_eq!(neighbor.name, "agent,smith");
        assert_eq!(neighbor.age, 33);
        assert_eq!(neighbor.latitude, 10.5);
        assert_eq!(neighbor.longitude, -3.25);
        assert_eq!(neighbor.distance, Some(12.5));
    }

    #[test]
    fn test_neighbor_serializes_distance_when_present() {
        let neighbor = Neighbor {
            name: "a".to_string(),
            age: 1,
            latitude: 0.0,
            longitude: 0.0,
            distance: Some(2.0),
        };
        let json = serde_json::to_value(&neighbor).unwrap();
        assert_eq!(json["distance"], 2.0);
    }

    #[test]
    fn test_query_response_rejects_missing_result() {
        let parsed = serde_json::from_str::<QueryResponse>(r#"{"neighbors":[]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_query_response_rejects_non_array_result() {
        let parsed = serde_json::from_str::<QueryResponse>(r#"{"result":"oops"}"#);
        assert!(parsed.is_err());
    }
}
