//! HTTP client for the admin authority.
//!
//! Request: `GET {endpoint}/api/v1/config/{server_id}[?since={token}]`,
//! basic-auth when credentials are configured.
//! Response: `{"unchanged": true}` or `{"version": "...", "config": {...}}`.
//! HTTP 404 is the distinguished "this server is unknown" condition.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use contracts::{
    AdminConfigClient, AgentError, ConfigOverlay, ConfigSnapshot, VersionToken,
};

/// Connection settings for the admin authority.
#[derive(Debug, Clone)]
pub struct AdminEndpoint {
    /// Base URL, e.g. `http://admin.internal:8089`.
    pub endpoint: String,
    /// Identity this process is registered under.
    pub server_id: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// [`AdminConfigClient`] over HTTP.
pub struct HttpAdminClient {
    http: reqwest::Client,
    settings: AdminEndpoint,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    unchanged: bool,
    version: Option<String>,
    #[serde(default)]
    config: HashMap<String, String>,
}

impl HttpAdminClient {
    pub fn new(settings: AdminEndpoint) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AgentError::admin_unavailable(format!("http client build: {e}")))?;
        Ok(Self { http, settings })
    }

    pub fn server_id(&self) -> &str {
        &self.settings.server_id
    }

    fn config_url(&self) -> String {
        format!(
            "{}/api/v1/config/{}",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.server_id
        )
    }

    fn register_url(&self) -> String {
        format!("{}/register", self.config_url())
    }

    /// Register this server with the authority.
    ///
    /// Idempotent on the authority side; used at startup when
    /// `auto_register` is set, so a fresh server does not need to be created
    /// by an operator before first contact.
    #[instrument(name = "admin_register", skip(self), fields(server_id = %self.settings.server_id))]
    pub async fn register(&self) -> Result<(), AgentError> {
        let mut request = self.http.put(self.register_url());
        if let (Some(key), Some(secret)) =
            (&self.settings.access_key, &self.settings.secret_key)
        {
            request = request.basic_auth(key, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::admin_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::admin_unavailable(format!(
                "registration failed with {}",
                response.status()
            )));
        }

        debug!("server registered with authority");
        Ok(())
    }
}

impl AdminConfigClient for HttpAdminClient {
    #[instrument(
        name = "admin_fetch",
        skip(self, since),
        fields(server_id = %self.settings.server_id, conditional = since.is_some())
    )]
    async fn fetch(
        &self,
        since: Option<&VersionToken>,
    ) -> Result<Option<ConfigSnapshot>, AgentError> {
        let mut request = self.http.get(self.config_url());
        if let Some(token) = since {
            request = request.query(&[("since", token.as_str())]);
        }
        if let (Some(key), Some(secret)) =
            (&self.settings.access_key, &self.settings.secret_key)
        {
            request = request.basic_auth(key, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::admin_unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::not_registered(&self.settings.server_id));
        }
        if !response.status().is_success() {
            return Err(AgentError::admin_unavailable(format!(
                "authority returned {}",
                response.status()
            )));
        }

        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| AgentError::admin_unavailable(format!("malformed response: {e}")))?;

        if body.unchanged {
            return Ok(None);
        }

        let version = body
            .version
            .ok_or_else(|| AgentError::admin_unavailable("response missing version token"))?;
        let config = ConfigOverlay::from_key_map(&body.config)?;

        debug!(version = %version, options = body.config.len(), "fetched config snapshot");
        Ok(Some(ConfigSnapshot::new(config, VersionToken::new(version))))
    }
}
