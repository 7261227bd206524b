//! The constant application identity attached to every outbound call.

use crate::config::ServerConfig;
use base64::Engine as _;
use hdx_http_tools::ClientConfig;

/// Query parameter carrying the identity. Hidden from every advertised tool schema.
pub const IDENTITY_PARAMETER: &str = "app_identifier";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-HDX-HAPI-APP-IDENTIFIER";

/// `base64("{app_name}:{app_email}")`, standard alphabet, padded.
#[must_use]
pub fn app_identifier(app_name: &str, app_email: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{app_name}:{app_email}"))
}

/// Client configuration: API key header, fixed JSON content negotiation, identity query param.
#[must_use]
pub fn client_config(config: &ServerConfig) -> ClientConfig {
    ClientConfig {
        base_url: config.base_url.clone(),
        default_headers: vec![
            (API_KEY_HEADER.to_string(), config.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ],
        default_query: vec![(
            IDENTITY_PARAMETER.to_string(),
            app_identifier(&config.app_name, &config.app_email),
        )],
        timeout: config.timeout,
    }
}
