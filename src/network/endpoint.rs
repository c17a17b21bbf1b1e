// Endpoint, token and proxy resolution
// Author: kelexine (https://github.com/kelexine)

use crate::config::{NetworkConfig, ProxyConfig, Secret};
use crate::error::{CompletionError, Result};
use crate::models::AssistantSettings;
use reqwest::Url;

/// Path used when the configured URL names only a host.
pub const DEFAULT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Everything needed to reach the provider for one assistant.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: Url,
    pub token: Secret,
    pub proxy: Option<ProxyRoute>,
}

/// HTTP proxy every request is routed through.
///
/// `https` targets are tunnelled with CONNECT; plain `http` targets are
/// forwarded to the proxy in absolute form.
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    /// `http://address:port`
    pub url: String,
    /// Basic credentials, present only when both halves are configured.
    pub credentials: Option<(String, Secret)>,
}

impl Endpoint {
    /// Assistant-level token and URL win over the global settings.
    pub fn resolve(network: &NetworkConfig, assistant: &AssistantSettings) -> Result<Self> {
        let token = assistant
            .token
            .as_ref()
            .filter(|t| !t.is_empty())
            .or_else(|| network.token.as_ref().filter(|t| !t.is_empty()))
            .cloned()
            .ok_or_else(|| {
                CompletionError::Config(format!(
                    "no API token configured for assistant {:?} or globally",
                    assistant.name
                ))
            })?;

        let raw_url = assistant
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(network.url.as_str());

        Ok(Self {
            url: parse_url(raw_url)?,
            token,
            proxy: ProxyRoute::from_config(&network.proxy),
        })
    }

    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl ProxyRoute {
    /// A route exists only when both address and port are set.
    pub fn from_config(proxy: &ProxyConfig) -> Option<Self> {
        let address = proxy.address.as_deref().filter(|a| !a.is_empty())?;
        let port = proxy.port?;

        let credentials = match (proxy.username.as_deref(), proxy.password.as_ref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user.to_string(), password.clone()))
            }
            _ => None,
        };

        Some(Self {
            url: format!("http://{}:{}", address, port),
            credentials,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| CompletionError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CompletionError::InvalidUrl(format!(
            "{}: unsupported scheme {:?}",
            raw,
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(CompletionError::InvalidUrl(format!("{}: missing host", raw)));
    }

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_COMPLETIONS_PATH);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(token: Option<&str>, url: &str) -> NetworkConfig {
        NetworkConfig {
            token: token.map(Secret::new),
            url: url.to_string(),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_assistant_overrides_win() {
        let assistant = AssistantSettings {
            token: Some(Secret::new("sk-assistant")),
            url: Some("http://local.test:8000/custom".to_string()),
            ..AssistantSettings::default()
        };

        let endpoint =
            Endpoint::resolve(&network(Some("sk-global"), "https://api.openai.com"), &assistant)
                .unwrap();

        assert_eq!(endpoint.token.expose(), "sk-assistant");
        assert_eq!(endpoint.url.as_str(), "http://local.test:8000/custom");
        assert!(!endpoint.is_tls());
    }

    #[test]
    fn test_falls_back_to_global_settings() {
        let assistant = AssistantSettings {
            token: Some(Secret::new("")),
            url: Some(String::new()),
            ..AssistantSettings::default()
        };

        let endpoint =
            Endpoint::resolve(&network(Some("sk-global"), "https://api.openai.com"), &assistant)
                .unwrap();

        assert_eq!(endpoint.token.expose(), "sk-global");
        assert_eq!(endpoint.url.as_str(), "https://api.openai.com/v1/chat/completions");
        assert!(endpoint.is_tls());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let result = Endpoint::resolve(
            &network(None, "https://api.openai.com"),
            &AssistantSettings::default(),
        );
        assert!(matches!(result, Err(CompletionError::Config(_))));
    }

    #[test]
    fn test_bad_urls_are_rejected() {
        for raw in ["not a url", "ftp://files.example.com/x", "unix:/tmp/socket"] {
            let result = Endpoint::resolve(
                &network(Some("sk"), raw),
                &AssistantSettings::default(),
            );
            assert!(matches!(result, Err(CompletionError::InvalidUrl(_))), "{}", raw);
        }
    }

    #[test]
    fn test_proxy_needs_address_and_port() {
        let mut proxy = ProxyConfig {
            address: Some("10.0.0.1".to_string()),
            ..ProxyConfig::default()
        };
        assert!(ProxyRoute::from_config(&proxy).is_none());

        proxy.port = Some(3128);
        let route = ProxyRoute::from_config(&proxy).unwrap();
        assert_eq!(route.url, "http://10.0.0.1:3128");
        assert!(route.credentials.is_none());
    }

    #[test]
    fn test_proxy_credentials_need_both_halves() {
        let mut proxy = ProxyConfig {
            address: Some("proxy.local".to_string()),
            port: Some(8080),
            username: Some("alice".to_string()),
            password: None,
        };
        assert!(ProxyRoute::from_config(&proxy).unwrap().credentials.is_none());

        proxy.password = Some(Secret::new("s3cret"));
        let (user, password) = ProxyRoute::from_config(&proxy).unwrap().credentials.unwrap();
        assert_eq!(user, "alice");
        assert_eq!(password.expose(), "s3cret");
    }
}
