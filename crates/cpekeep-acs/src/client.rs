// NBI HTTP client
//
// Wraps `reqwest::Client` with ACS-specific URL construction, device
// queries and task submission. Responses are decoded here; nothing above
// this module sees a `reqwest::Response`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::models::{DeviceIdRow, Task, TaskAck, TaskEcho};
use crate::transport::TransportConfig;

/// HTTP basic credentials for an NBI that sits behind authentication.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// Raw HTTP client for the ACS northbound interface.
///
/// All device identifiers are ACS device ids (`_id`), e.g.
/// `00259E-EG8145V5-48575443`. Ids are percent-encoded as a single path
/// segment when building task URLs.
pub struct NbiClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Option<BasicAuth>,
    timeout: Duration,
}

impl NbiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the NBI root, e.g. `http://acs.local:7557`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            auth: None,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            auth: None,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// Attach basic credentials sent with every request.
    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// The NBI base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Fetch the full parameter tree of one device.
    pub async fn get_device(&self, device_id: &str) -> Result<Value, Error> {
        let query = serde_json::json!({ "_id": device_id }).to_string();
        let mut url = self.url(&["devices", ""])?;
        url.query_pairs_mut().append_pair("query", &query);

        let mut docs: Vec<Value> = self.get_json(url).await?;
        if docs.is_empty() {
            return Err(Error::DeviceNotFound {
                device_id: device_id.to_owned(),
            });
        }
        Ok(docs.swap_remove(0))
    }

    /// Look a device up by the serial number reported in its `_deviceId`.
    ///
    /// Returns `None` when the ACS has no device with that serial.
    pub async fn find_device_by_serial(&self, serial: &str) -> Result<Option<Value>, Error> {
        let query = serde_json::json!({ "_deviceId._SerialNumber": serial }).to_string();
        let mut url = self.url(&["devices", ""])?;
        url.query_pairs_mut().append_pair("query", &query);

        let mut docs: Vec<Value> = self.get_json(url).await?;
        if docs.len() > 1 {
            warn!(serial, matches = docs.len(), "serial matches several devices, using the first");
        }
        if docs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(docs.swap_remove(0)))
        }
    }

    /// List the ids of every device the ACS knows about.
    pub async fn list_device_ids(&self) -> Result<Vec<String>, Error> {
        let mut url = self.url(&["devices", ""])?;
        url.query_pairs_mut().append_pair("projection", "_id");

        let rows: Vec<DeviceIdRow> = self.get_json(url).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Submit a task for a device.
    ///
    /// With `connection_request` set the ACS pokes the device immediately;
    /// otherwise the task waits for the next periodic inform. HTTP 200 and
    /// 202 both count as accepted.
    pub async fn submit_task(
        &self,
        device_id: &str,
        task: &Task,
        connection_request: bool,
    ) -> Result<TaskAck, Error> {
        let mut url = self.url(&["devices", device_id, "tasks"])?;
        if connection_request {
            url.set_query(Some("connection_request"));
        }
        debug!(device_id, task = task.name(), "POST {}", url);

        let builder = self.authorize(self.http.post(url).json(task));
        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status().as_u16();

        match status {
            200 | 202 => {
                let body = resp.text().await.map_err(Error::Transport)?;
                trace!(status, body = %body, "task accepted");
                let task_id = serde_json::from_str::<TaskEcho>(&body)
                    .ok()
                    .and_then(|echo| echo.id);
                Ok(TaskAck {
                    task_id,
                    queued: status == 202,
                })
            }
            404 => Err(Error::DeviceNotFound {
                device_id: device_id.to_owned(),
            }),
            _ => {
                let message = resp.text().await.unwrap_or_default();
                Err(Error::Rejected { status, message })
            }
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => builder.basic_auth(&auth.username, Some(auth.password.expose_secret())),
            None => builder,
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn task_url_encodes_device_id_as_one_segment() {
        let client = NbiClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://acs.local:7557/").unwrap(),
        );
        let url = client
            .url(&["devices", "00259E-HG 8245/Q2-4857", "tasks"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://acs.local:7557/devices/00259E-HG%208245%2FQ2-4857/tasks"
        );
    }
}
