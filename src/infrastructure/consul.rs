use crate::domain::ports::RegistryClient;
use crate::domain::registration::{ServiceNode, ServiceRegistration};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:8500";
const TOKEN_HEADER: &str = "X-Consul-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry client speaking the Consul HTTP API (`/v1/kv`, `/v1/agent`, `/v1/catalog`).
#[derive(Clone, Debug)]
pub struct ConsulClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ConsulClient {
    /// `base_url` may omit the scheme (`127.0.0.1:8500`), as `CONSUL_HTTP_ADDR` usually does.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into();
        let base_url = if base_url.contains("://") {
            base_url
        } else {
            format!("http://{}", base_url)
        };
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path);
        debug!(%method, %url, "registry request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .request(Method::GET, &format!("kv/{}", key))
            .query(&[("raw", "true")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.error_for_status()?.bytes().await?;
        Ok(Some(body.to_vec()))
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()> {
        self.request(Method::PUT, "agent/service/register")
            .json(registration)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str) -> Result<()> {
        self.request(
            Method::PUT,
            &format!("agent/service/deregister/{}", service_id),
        )
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }

    async fn list_service_nodes(&self, service_name: &str) -> Result<Vec<ServiceNode>> {
        let nodes = self
            .request(Method::GET, &format!("catalog/service/{}", service_name))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ServiceNode>>()
            .await?;
        Ok(nodes)
    }
}
