use reqwest::Client;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

use crate::config::{Config, DEFAULT_RECOMMENDED_LIMIT};
use crate::error::{LyraError, Result};
use crate::state::AppDescriptor;

/// Apps shown when the catalog endpoint cannot be reached. Empty for now:
/// the desktop simply starts without icons.
pub fn fallback_apps() -> Vec<AppDescriptor> {
    Vec::new()
}

/// Client for `GET /api/apps` plus the last list it loaded
#[derive(Clone)]
pub struct AppCatalog {
    client: Client,
    endpoint: String,
    cache: Arc<RwLock<Vec<AppDescriptor>>>,
}

impl AppCatalog {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            cache: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.apps_endpoint())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn try_fetch_apps(&self) -> Result<Vec<AppDescriptor>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LyraError::http(&self.endpoint, e))?;

        if !response.status().is_success() {
            return Err(LyraError::Status {
                url: self.endpoint.clone(),
                status: response.status(),
            });
        }

        let apps: Vec<AppDescriptor> = response
            .json()
            .await
            .map_err(|e| LyraError::http(&self.endpoint, e))?;
        debug!(count = apps.len(), "Fetched app catalog");
        Ok(apps)
    }

    /// Fetch the catalog, degrading to [`fallback_apps`] on any failure
    pub async fn fetch_apps(&self) -> Vec<AppDescriptor> {
        match self.try_fetch_apps().await {
            Ok(apps) => apps,
            Err(e) => {
                error!(error = %e, "Error fetching apps");
                fallback_apps()
            }
        }
    }

    /// Fetch and replace the cached list
    pub async fn load(&self) -> Vec<AppDescriptor> {
        let apps = self.fetch_apps().await;
        if let Ok(mut cache) = self.cache.write() {
            *cache = apps.clone();
        }
        apps
    }

    /// Snapshot of the last loaded list
    pub fn apps(&self) -> Vec<AppDescriptor> {
        self.cache
            .read()
            .map(|cache| cache.clone())
            .unwrap_or_default()
    }

    pub async fn get_app_by_id(&self, id: &str) -> Option<AppDescriptor> {
        let apps = self.fetch_apps().await;
        find_app(&apps, id).cloned()
    }

    pub async fn get_recommended_apps(&self, limit: Option<usize>) -> Vec<AppDescriptor> {
        let apps = self.fetch_apps().await;
        recommend(&apps, limit.unwrap_or(DEFAULT_RECOMMENDED_LIMIT)).to_vec()
    }
}

pub fn find_app<'a>(apps: &'a [AppDescriptor], id: &str) -> Option<&'a AppDescriptor> {
    apps.iter().find(|app| app.id == id)
}

/// The first `limit` apps in catalog order
pub fn recommend(apps: &[AppDescriptor], limit: usize) -> &[AppDescriptor] {
    &apps[..limit.min(apps.len())]
}

/// Case-insensitive substring match on name or description.
/// An empty query matches nothing.
pub fn filter_apps(apps: &[AppDescriptor], query: &str) -> Vec<AppDescriptor> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    apps.iter()
        .filter(|app| {
            app.name.to_lowercase().contains(&needle)
                || app
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_app(id: &str, name: &str, description: Option<&str>) -> AppDescriptor {
    AppDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        icon: "apps".to_string(),
        color: "#4285f4".to_string(),
        description: description.map(str::to_string),
        chat_title: None,
    }
}
