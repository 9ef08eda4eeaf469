use geo_recommender_shared::models::{Neighbor, QueryParams, QueryResponse};

/// Recommendation endpoint, fixed at build time.
pub const DEFAULT_RECOMMENDER_URL: &str = "http://localhost:5001";

fn recommender_url() -> &'static str {
    option_env!("RECOMMENDER_URL").unwrap_or(DEFAULT_RECOMMENDER_URL)
}

/// Build the `/query` URL for a position and age.
pub fn build_query_url(base: &str, latitude: f64, longitude: f64, age: u32) -> String {
    format!(
        "{}/query?latitude={}&longitude={}&age={}",
        base.trim_end_matches('/'),
        latitude,
        longitude,
        age
    )
}

/// One GET against the recommender. No retry, timeout or caching.
pub async fn fetch_recommendations(params: &QueryParams) -> Result<Vec<Neighbor>, String> {
    let url = build_query_url(
        recommender_url(),
        params.latitude,
        params.longitude,
        params.age,
    );

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    // A missing or non-array `result` fails to decode
    let body: QueryResponse = resp.json().await.map_err(|e| e.to_string())?;
    Ok(body.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_url() {
        let url = build_query_url("http://localhost:5001", 51.515366, -0.1109577, 20);
        assert_eq!(
            url,
            "http://localhost:5001/query?latitude=51.515366&longitude=-0.1109577&age=20"
        );
    }

    #[test]
    fn test_build_query_url_trims_trailing_slash() {
        let url = build_query_url("http://example.com/", 1.5, 2.0, 30);
        assert_eq!(url, "http://example.com/query?latitude=1.5&longitude=2&age=30");
    }
}
