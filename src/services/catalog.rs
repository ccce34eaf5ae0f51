use anyhow::Context;
use async_trait::async_trait;

use crate::models::ServiceInfo;

/// Read-only lookup into the external service/price catalog. Bookings
/// snapshot the result at creation time.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn lookup(&self, service_id: &str) -> anyhow::Result<Option<ServiceInfo>>;
}

/// Built-in catalog used when no CATALOG_URL is configured.
pub struct StaticCatalog {
    services: Vec<ServiceInfo>,
}

impl StaticCatalog {
    pub fn new(services: Vec<ServiceInfo>) -> Self {
        Self { services }
    }

    pub fn with_defaults() -> Self {
        Self::new(vec![
            ServiceInfo {
                id: "basic-wash".to_string(),
                name: "Basic Wash".to_string(),
                price: 15.0,
            },
            ServiceInfo {
                id: "deluxe-wash".to_string(),
                name: "Deluxe Wash".to_string(),
                price: 25.0,
            },
            ServiceInfo {
                id: "interior-clean".to_string(),
                name: "Interior Cleaning".to_string(),
                price: 35.0,
            },
            ServiceInfo {
                id: "full-detail".to_string(),
                name: "Full Detailing".to_string(),
                price: 60.0,
            },
        ])
    }
}

#[async_trait]
impl ServiceCatalog for StaticCatalog {
    async fn lookup(&self, service_id: &str) -> anyhow::Result<Option<ServiceInfo>> {
        Ok(self.services.iter().find(|s| s.id == service_id).cloned())
    }
}

/// Catalog served by an external HTTP service: GET {base}/services/{id}.
pub struct HttpCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ServiceCatalog for HttpCatalog {
    async fn lookup(&self, service_id: &str) -> anyhow::Result<Option<ServiceInfo>> {
        let url = format!("{}/services/{}", self.base_url, service_id);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to call service catalog")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("catalog error ({}): {}", status, url);
        }

        let info: ServiceInfo = resp
            .json()
            .await
            .context("failed to parse catalog response")?;
        Ok(Some(info))
    }
}
