//! Configuration for the demo tool-provider server.
//!
//! All configuration is driven by environment variables.

/// Server configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    pub gateway_listen: String,
    /// Consumer key expected on incoming launches.
    pub consumer_key: String,
    /// Shared secret registered for the consumer key.
    pub secret: String,
    /// Absolute launch URL that incoming requests are signed against. Tool
    /// consumers sign against the URL they post to, so this must match what
    /// they were given, including scheme and trailing slash.
    pub launch_url: String,
    /// Log level.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:5001".to_owned(),
            consumer_key: "12345".to_owned(),
            secret: "secret".to_owned(),
            launch_url: "http://localhost:5001/".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LTI_CONSUMER_KEY") {
            config.consumer_key = v;
        }
        if let Ok(v) = std::env::var("LTI_SECRET") {
            config.secret = v;
        }
        if let Ok(v) = std::env::var("LTI_LAUNCH_URL") {
            config.launch_url = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.gateway_listen, "0.0.0.0:5001");
        assert_eq!(config.launch_url, "http://localhost:5001/");
        assert_eq!(config.log_level, "info");
    }
}
