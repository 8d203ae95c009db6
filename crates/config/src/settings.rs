//! Main settings structure

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{default_true, ConfigError, CrisisConfig, EscalationConfig, ProvidersConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Provider credentials and fallback order
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Crisis detection policy
    #[serde(default)]
    pub crisis: CrisisConfig,

    /// Escalation resources and emergency notification
    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.providers.order.validate()?;
        self.crisis.validate()?;
        self.escalation.validate()?;
        self.validate_production()?;

        if self.providers.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "providers.request_timeout_secs".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        if self.server.timeout_seconds < self.providers.request_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: format!(
                    "Must be at least providers.request_timeout_secs ({} s)",
                    self.providers.request_timeout_secs
                ),
            });
        }

        if self.session.max_context_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_context_turns".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.server.max_body_bytes < 1024 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_body_bytes".to_string(),
                message: format!("Too small ({} bytes)", self.server.max_body_bytes),
            });
        }

        Ok(())
    }

    /// Simulated notifications would silently drop real emergencies
    fn validate_production(&self) -> Result<(), ConfigError> {
        if self.environment.is_production() && self.escalation.simulate_notifications {
            return Err(ConfigError::InvalidValue {
                field: "escalation.simulate_notifications".to_string(),
                message: "Not allowed in production".to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Upper bound on request bodies (base64 audio can be large)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_timeout() -> u64 {
    120
}
fn default_max_body_bytes() -> usize {
    // 50 MiB of audio, base64 encoded, plus envelope
    70 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Session state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Conversation turns sent back to the chat model as context
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

fn default_max_context_turns() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_context_turns: default_max_context_turns(),
        }
    }
}

/// Therapist persona used in the chat system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,

    #[serde(default = "default_persona_role")]
    pub role: String,
}

fn default_persona_name() -> String {
    "Dr. Emily Hartman".to_string()
}
fn default_persona_role() -> String {
    "a warm, experienced clinical psychologist".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            role: default_persona_role(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("SAFESPACE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.session.max_context_turns, 20);
        assert_eq!(settings.persona.name, "Dr. Emily Hartman");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        settings.server.port = 8000;
        settings.server.max_body_bytes = 10;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_production_rejects_simulated_notifications() {
        let mut settings = Settings::default();
        settings.escalation.simulate_notifications = true;
        assert!(settings.validate().is_ok());

        settings.environment = RuntimeEnvironment::Production;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("simulate_notifications"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.providers.request_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_server_timeout_must_cover_one_attempt() {
        let mut settings = Settings::default();
        settings.server.timeout_seconds = 10;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("server.timeout_seconds"));

        settings.server.timeout_seconds = settings.providers.request_timeout_secs;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_from_json_sections() {
        let json = r#"{
            "environment": "staging",
            "crisis": { "thresholds": { "critical": 12.0 } },
            "session": { "max_context_turns": 8 }
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.environment, RuntimeEnvironment::Staging);
        assert_eq!(settings.crisis.thresholds.critical, 12.0);
        assert_eq!(settings.crisis.thresholds.high, 5.0);
        assert_eq!(settings.session.max_context_turns, 8);
        assert!(!settings.crisis.phrases.is_empty());
    }
}
