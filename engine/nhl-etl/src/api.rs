use crate::config::ApiConfig;
use crate::error::{EtlError, Result};
use crate::models::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the NHL stats API
///
/// Every fetch returns `Ok(None)` when the resource could not be retrieved
/// (non-2xx status or transport failure). The failure is logged once here and
/// the caller skips that entity. A 2xx body that does not decode is an error.
pub struct NhlApiClient {
    client: Client,
    base_url: String,
}

impl NhlApiClient {
    /// Create a new API client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Unable to query {}: {}", what, e);
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Unable to query {}: HTTP {}", what, status);
            return Ok(None);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Unable to read {} response: {}", what, e);
                return Ok(None);
            }
        };

        serde_json::from_slice(&body).map(Some).map_err(|source| EtlError::Decode { url, source })
    }

    /// `GET /teams`
    pub async fn fetch_teams(&self) -> Result<Option<Vec<ApiTeam>>> {
        let response: Option<TeamsResponse> = self.get_json("/teams", "teams").await?;
        Ok(response.map(|r| r.teams))
    }

    /// `GET /teams/{id}/roster`
    pub async fn fetch_roster(&self, team_id: i32) -> Result<Option<Vec<RosterEntry>>> {
        let response: Option<RosterResponse> = self
            .get_json(&format!("/teams/{team_id}/roster"), &format!("roster for team id {team_id}"))
            .await?;
        Ok(response.map(|r| r.roster))
    }

    /// `GET /people/{id}`
    pub async fn fetch_person(&self, player_id: i32) -> Result<Option<ApiPerson>> {
        let what = format!("player id {player_id}");
        let response: Option<PeopleResponse> =
            self.get_json(&format!("/people/{player_id}"), &what).await?;

        Ok(response.and_then(|r| {
            let person = r.people.into_iter().next();
            if person.is_none() {
                warn!("Unable to query {}: empty people list", what);
            }
            person
        }))
    }

    /// `GET /people/{id}/stats?stats=yearByYear`
    pub async fn fetch_year_by_year(&self, player_id: i32) -> Result<Option<Vec<StatSplit>>> {
        let response: Option<StatsResponse> = self
            .get_json(
                &format!("/people/{player_id}/stats?stats=yearByYear"),
                &format!("stats for player id {player_id}"),
            )
            .await?;

        Ok(response.map(|r| r.stats.into_iter().next().map(|g| g.splits).unwrap_or_default()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> NhlApiClient {
        let config = ApiConfig { base_url: server.uri(), timeout_secs: 5, ..ApiConfig::default() };
        NhlApiClient::new(&config).unwrap()
    }

    pub(crate) fn team_json(id: i32, name: &str, abbr: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "link": format!("/api/v1/teams/{id}"),
            "venue": { "name": "Arena", "link": "/api/v1/venues/null", "city": "City" },
            "abbreviation": abbr,
            "teamName": name,
            "locationName": "City",
            "firstYearOfPlay": "1917",
            "division": { "id": 17, "name": "Atlantic", "nameShort": "ATL" },
            "conference": { "id": 6, "name": "Eastern" },
            "franchise": { "franchiseId": id },
            "shortName": name,
            "officialSiteUrl": "https://www.nhl.com",
            "active": true
        })
    }

    #[tokio::test]
    async fn test_fetch_teams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "copyright": "NHL",
                "teams": [
                    team_json(1, "New Jersey Devils", "NJD"),
                    team_json(10, "Toronto Maple Leafs", "TOR")
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let teams = client_for(&server).fetch_teams().await.unwrap().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[1].abbreviation, "TOR");
        assert_eq!(teams[0].division.name, "Atlantic");
    }

    #[tokio::test]
    async fn test_non_success_status_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teams"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let teams = client_for(&server).fetch_teams().await.unwrap();
        assert!(teams.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_skipped() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        };
        let client = NhlApiClient::new(&config).unwrap();
        assert!(client.fetch_teams().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teams"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "teams": [{ "id": 1 }] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_teams().await.unwrap_err();
        assert!(matches!(err, EtlError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_year_by_year_uses_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/8478402/stats"))
            .and(query_param("stats", "yearByYear"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stats": [{
                    "type": { "displayName": "yearByYear" },
                    "splits": [
                        { "season": "20152016", "league": { "name": "National Hockey League" },
                          "team": { "id": 22 }, "stat": { "goals": 16, "assists": 32 } }
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let splits = client_for(&server).fetch_year_by_year(8478402).await.unwrap().unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].stat.assists, Some(32));
    }

    #[tokio::test]
    async fn test_empty_people_list_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "people": [] })))
            .mount(&server)
            .await;

        assert!(client_for(&server).fetch_person(1).await.unwrap().is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost/api/v1/".to_string(),
            ..ApiConfig::default()
        };
        let client = NhlApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost/api/v1");
    }
}
