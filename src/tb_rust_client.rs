use reqwest::{Client, Response, StatusCode};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TbError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("API error (Status: {status}): {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityId {
    pub id: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
}

impl EntityId {
    pub fn device(id: &str) -> Self {
        Self {
            id: id.to_string(),
            entity_type: "DEVICE".to_string(),
        }
    }
}

// Subset of the platform's DeviceInfo; everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageData<T> {
    pub data: Vec<T>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: i64,
    #[serde(rename = "totalElements", default)]
    pub total_elements: i64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

/// One telemetry sample as returned by the values/timeseries endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TsPoint {
    pub ts: i64,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Response of the values/timeseries endpoint: key name to its points.
///
/// Keys are kept in the order the server sent them so that the exported
/// columns come out in that same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeseriesData {
    series: Vec<(String, Vec<TsPoint>)>,
}

impl TimeseriesData {
    pub fn from_series(series: Vec<(String, Vec<TsPoint>)>) -> Self {
        Self { series }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TsPoint])> {
        self.series
            .iter()
            .map(|(key, points)| (key.as_str(), points.as_slice()))
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|(_, points)| points.len()).sum()
    }
}

impl<'de> Deserialize<'de> for TimeseriesData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SeriesVisitor;

        impl<'de> Visitor<'de> for SeriesVisitor {
            type Value = TimeseriesData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of telemetry key to a list of data points")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut series = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, points)) = map.next_entry::<String, Vec<TsPoint>>()? {
                    series.push((key, points));
                }
                Ok(TimeseriesData { series })
            }
        }

        deserializer.deserialize_map(SeriesVisitor)
    }
}

pub struct ThingsBoardClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ThingsBoardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), TbError> {
        let login_request = LoginRequest { username, password };

        let response = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&login_request)
            .send()
            .await?;

        if response.status().is_success() {
            let login_response: LoginResponse = response.json().await?;
            self.token = Some(login_response.token);
            debug!("Logged in to {} as {}", self.base_url, username);
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            Err(TbError::Auth(format!("Login failed: {}", error_text)))
        }
    }

    /// Ends the session on the server and forgets the token.
    ///
    /// The token is dropped locally even when the server call fails.
    /// Calling this without an active session is a no-op.
    pub async fn logout(&mut self) -> Result<(), TbError> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/api/auth/logout", self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        Self::ensure_success(response, "Logout").await?;
        debug!("Logged out from {}", self.base_url);
        Ok(())
    }

    fn get_auth_header(&self) -> Result<String, TbError> {
        match &self.token {
            Some(token) => Ok(format!("Bearer {}", token)),
            None => Err(TbError::Auth("Not authenticated".to_string())),
        }
    }

    pub fn get_token(&self) -> Option<String> {
        self.token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response, TbError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            Err(TbError::Api {
                status,
                message: format!("{} failed: {}", action, error_text),
            })
        }
    }

    // one page of the tenant's devices
    pub async fn get_tenant_device_infos(&self, page_size: u32, page: u32) -> Result<PageData<DeviceInfo>, TbError> {
        let auth_header = self.get_auth_header()?;

        let response = self
            .client
            .get(format!("{}/api/tenant/deviceInfos", self.base_url))
            .query(&[("pageSize", page_size), ("page", page)])
            .header("Authorization", auth_header)
            .send()
            .await?;

        let response = Self::ensure_success(response, "Get tenant devices").await?;
        Ok(response.json().await?)
    }

    /// Lazily walks the tenant's device pages, starting at page 0.
    pub fn device_pages(&self, page_size: u32) -> DevicePager<'_> {
        DevicePager {
            client: self,
            page_size,
            next_page: Some(0),
        }
    }

    pub async fn get_timeseries_keys(&self, entity_id: &EntityId) -> Result<Vec<String>, TbError> {
        let auth_header = self.get_auth_header()?;

        let response = self
            .client
            .get(format!(
                "{}/api/plugins/telemetry/{}/{}/keys/timeseries",
                self.base_url, entity_id.entity_type, entity_id.id
            ))
            .header("Authorization", auth_header)
            .send()
            .await?;

        let response = Self::ensure_success(response, "Get timeseries keys").await?;
        Ok(response.json().await?)
    }

    /// Fetches raw (non-aggregated) values of `keys` (comma separated) in `[start_ts, end_ts]`.
    pub async fn get_timeseries(
        &self,
        entity_id: &EntityId,
        keys: &str,
        start_ts: i64,
        end_ts: i64,
        limit: u64,
    ) -> Result<TimeseriesData, TbError> {
        let auth_header = self.get_auth_header()?;

        let response = self
            .client
            .get(format!(
                "{}/api/plugins/telemetry/{}/{}/values/timeseries",
                self.base_url, entity_id.entity_type, entity_id.id
            ))
            .query(&[
                ("keys", keys.to_string()),
                ("startTs", start_ts.to_string()),
                ("endTs", end_ts.to_string()),
                ("limit", limit.to_string()),
            ])
            .header("Authorization", auth_header)
            .send()
            .await?;

        let response = Self::ensure_success(response, "Get timeseries").await?;
        Ok(response.json().await?)
    }
}

pub struct DevicePager<'a> {
    client: &'a ThingsBoardClient,
    page_size: u32,
    next_page: Option<u32>,
}

impl DevicePager<'_> {
    /// Returns the next page of devices, or `None` once the server reported no further pages.
    pub async fn next_page(&mut self) -> Result<Option<Vec<DeviceInfo>>, TbError> {
        let Some(page) = self.next_page else {
            return Ok(None);
        };

        let response = self.client.get_tenant_device_infos(self.page_size, page).await?;
        debug!(
            "Received {} devices on page {} ({} total)",
            response.data.len(),
            page,
            response.total_elements
        );

        self.next_page = if response.has_next { Some(page + 1) } else { None };
        Ok(Some(response.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeseries_response_keeps_server_key_order() {
        let body = r#"{
            "temp": [{"ts": 2, "value": "21"}, {"ts": 1, "value": "20"}],
            "battery": [],
            "humidity": [{"ts": 1, "value": "55", "extra": true}]
        }"#;

        let data: TimeseriesData = serde_json::from_str(body).unwrap();

        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["temp", "battery", "humidity"]);
        assert_eq!(data.point_count(), 3);
        let (_, humidity) = data.iter().nth(2).unwrap();
        assert_eq!(humidity, &[TsPoint { ts: 1, value: serde_json::json!("55") }]);
    }

    #[test]
    fn point_without_value_reads_as_null() {
        let data: TimeseriesData = serde_json::from_str(r#"{"k": [{"ts": 5}]}"#).unwrap();
        let (_, points) = data.iter().next().unwrap();
        assert_eq!(points[0].value, serde_json::Value::Null);
    }

    #[test]
    fn device_page_parses_platform_payload() {
        let body = r#"{
            "data": [
                {"id": {"id": "d1", "entityType": "DEVICE"}, "name": "Boiler", "label": null, "type": "default", "active": true}
            ],
            "totalPages": 3,
            "totalElements": 21,
            "hasNext": true
        }"#;

        let page: PageData<DeviceInfo> = serde_json::from_str(body).unwrap();

        assert!(page.has_next);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data[0].id, EntityId::device("d1"));
        assert_eq!(page.data[0].name, "Boiler");
        assert_eq!(page.data[0].label, None);
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = ThingsBoardClient::new("http://10.100.40.2:8080/");
        assert_eq!(client.base_url(), "http://10.100.40.2:8080");
        assert!(!client.is_authenticated());
    }
}
