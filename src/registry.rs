use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use url::Url;

use crate::error::RegistrationError;
use crate::stats::EndpointCounts;
use crate::types::{Endpoint, EndpointId, EndpointRegistration};

/// Values applied to registrations that leave them unset.
#[derive(Debug, Clone)]
pub(crate) struct EndpointDefaults {
    pub secret: Option<String>,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// Endpoint configurations keyed by id.
///
/// Reads (matching, listing) run concurrently with each other; writes
/// take the lock exclusively. Callers only ever get copies out.
pub(crate) struct EndpointRegistry {
    endpoints: RwLock<HashMap<EndpointId, Endpoint>>,
    defaults: EndpointDefaults,
}

impl EndpointRegistry {
    pub fn new(defaults: EndpointDefaults) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    /// Insert or replace an endpoint. Re-registering an id overwrites the
    /// previous configuration wholesale.
    pub async fn add(&self, registration: EndpointRegistration) -> Result<(), RegistrationError> {
        validate_url(&registration.url)?;

        let endpoint = Endpoint {
            id: registration.id,
            url: registration.url,
            event_types: registration.event_types,
            secret: registration
                .secret
                .filter(|secret| !secret.is_empty())
                .or_else(|| self.defaults.secret.clone()),
            enabled: registration.enabled,
            max_retries: registration.max_retries.unwrap_or(self.defaults.max_retries),
            timeout: registration.timeout.unwrap_or(self.defaults.timeout),
            headers: registration.headers,
        };

        let mut guard = self.endpoints.write().await;
        guard.insert(endpoint.id.clone(), endpoint);
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut guard = self.endpoints.write().await;
        guard.remove(id).is_some()
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut guard = self.endpoints.write().await;
        match guard.get_mut(id) {
            Some(endpoint) => {
                endpoint.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Endpoint> {
        let guard = self.endpoints.read().await;
        guard.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Endpoint> {
        let guard = self.endpoints.read().await;
        let mut endpoints: Vec<Endpoint> = guard.values().cloned().collect();
        endpoints.sort_by(|a, b| a.id.cmp(&b.id));
        endpoints
    }

    /// Enabled endpoints subscribed to `event_type`.
    pub async fn matching(&self, event_type: &str) -> Vec<Endpoint> {
        let guard = self.endpoints.read().await;
        guard
            .values()
            .filter(|endpoint| endpoint.accepts(event_type))
            .cloned()
            .collect()
    }

    pub async fn counts(&self) -> EndpointCounts {
        let guard = self.endpoints.read().await;
        let enabled = guard.values().filter(|e| e.enabled).count();
        EndpointCounts {
            total: guard.len(),
            enabled,
            disabled: guard.len() - enabled,
        }
    }
}

/// Accept only absolute URLs that carry a host.
///
/// The parser fills in a host for `http:example.com` style input, so the
/// raw text must also spell out the `://` authority marker.
pub(crate) fn validate_url(raw: &str) -> Result<Url, RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let has_authority = raw
        .get(url.scheme().len()..)
        .map_or(false, |rest| rest.starts_with("://"));
    if !has_authority {
        return Err(invalid("missing authority".to_string()));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid("missing host".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> EndpointDefaults {
        EndpointDefaults {
            secret: Some("default-secret".to_string()),
            max_retries: 3,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("http://localhost:9/hook").is_ok());
        assert!(validate_url("https://example.com").is_ok());

        assert!(validate_url("localhost:9/hook").is_err());
        assert!(validate_url("/relative/path").is_err());
        assert!(validate_url("mailto:ops@example.com").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("http:example.com/hook").is_err());
        assert!(validate_url("http:/example.com/hook").is_err());
        assert!(validate_url("https:\\\\example.com").is_err());
    }

    #[tokio::test]
    async fn empty_secret_takes_the_default() {
        let registry = EndpointRegistry::new(defaults());
        registry
            .add(EndpointRegistration::new("ep1", "http://localhost/hook", ["alert"]).with_secret(""))
            .await
            .unwrap();

        let endpoint = registry.get("ep1").await.unwrap();
        assert_eq!(endpoint.secret.as_deref(), Some("default-secret"));
    }

    #[tokio::test]
    async fn unset_fields_take_defaults() {
        let registry = EndpointRegistry::new(defaults());
        registry
            .add(EndpointRegistration::new("ep1", "http://localhost/hook", ["alert"]))
            .await
            .unwrap();

        let endpoint = registry.get("ep1").await.unwrap();
        assert_eq!(endpoint.secret.as_deref(), Some("default-secret"));
        assert_eq!(endpoint.max_retries, 3);
        assert_eq!(endpoint.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn explicit_zero_retries_is_kept() {
        let registry = EndpointRegistry::new(defaults());
        registry
            .add(EndpointRegistration::new("ep1", "http://localhost/hook", ["alert"]).with_max_retries(0))
            .await
            .unwrap();

        assert_eq!(registry.get("ep1").await.unwrap().max_retries, 0);
    }

    #[tokio::test]
    async fn rejected_url_leaves_registry_untouched() {
        let registry = EndpointRegistry::new(defaults());
        registry
            .add(EndpointRegistration::new("ep1", "http://localhost/hook", ["alert"]))
            .await
            .unwrap();

        let err = registry
            .add(EndpointRegistration::new("ep1", "not-a-url", ["status"]))
            .await;
        assert!(err.is_err());

        let endpoint = registry.get("ep1").await.unwrap();
        assert_eq!(endpoint.url, "http://localhost/hook");
    }

    #[tokio::test]
    async fn counts_track_enabled_flag() {
        let registry = EndpointRegistry::new(defaults());
        for id in ["a", "b", "c"] {
            registry
                .add(EndpointRegistration::new(id, "http://localhost/hook", ["alert"]))
                .await
                .unwrap();
        }
        assert!(registry.set_enabled("b", false).await);
        assert!(!registry.set_enabled("missing", false).await);

        assert_eq!(registry.counts().await, EndpointCounts {
            total: 3,
            enabled: 2,
            disabled: 1,
        });
        assert_eq!(registry.matching("alert").await.len(), 2);
    }
}
