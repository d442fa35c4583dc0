//! Service configuration module
//! Loads server, mail and template settings from the environment once at startup.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_SMTP_HOST: &str = "smtp.zoho.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SENDER_NAME: &str = "Luai";
const DEFAULT_TEMPLATE_PATH: &str = "templates/email.html";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Login for one SMTP sender identity
#[derive(Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Mail transport and sender identity configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub timeout: Duration,
    /// Relay identity used for the admin notification
    pub admin_credentials: SmtpCredentials,
    /// Identity used for the submitter confirmation
    pub no_reply_credentials: SmtpCredentials,
    pub admin_email: String,
    pub admin_sender_email: String,
    pub no_reply_email: String,
    pub sender_name: String,
    /// Record messages in memory and log them instead of talking SMTP
    pub dry_run: bool,
}

impl MailConfig {
    /// Load mail configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let dry_run = env_bool("MAIL_DRY_RUN")?;

        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| DEFAULT_SMTP_PORT.to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid SMTP_PORT: {}", e)))?;

        let timeout_secs = env::var("SMTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_SMTP_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid SMTP_TIMEOUT_SECS: {}", e)))?;

        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::InvalidConfig(
                "SMTP timeout must be between 1 and 120 seconds".to_string(),
            ));
        }

        let admin_credentials = credentials("SMTP_USER", "SMTP_PASS", dry_run)?;
        let no_reply_credentials = credentials("NOREPLY_SMTP_USER", "NOREPLY_SMTP_PASS", dry_run)?;

        let admin_sender_email = if admin_credentials.username.is_empty() {
            env::var("ADMIN_EMAIL").map_err(|_| ConfigError::MissingEnv("ADMIN_EMAIL".to_string()))?
        } else {
            admin_credentials.username.clone()
        };
        let admin_email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| admin_sender_email.clone());

        let no_reply_email = match env::var("NOREPLY_EMAIL") {
            Ok(value) => value,
            Err(_) => default_no_reply_address(&admin_sender_email)?,
        };

        let sender_name =
            env::var("SENDER_NAME").unwrap_or_else(|_| DEFAULT_SENDER_NAME.to_string());

        info!(
            "Mail configuration loaded: host={}, port={}, timeout={}s, admin={}, no_reply={}, dry_run={}",
            smtp_host, smtp_port, timeout_secs, admin_email, no_reply_email, dry_run
        );

        Ok(MailConfig {
            smtp_host,
            smtp_port,
            timeout: Duration::from_secs(timeout_secs),
            admin_credentials,
            no_reply_credentials,
            admin_email,
            admin_sender_email,
            no_reply_email,
            sender_name,
            dry_run,
        })
    }
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub template_path: PathBuf,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("API_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid API_HOST: {}", e)))?;
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid API_PORT: {}", e)))?;

        let allowed_origins = parse_origins(
            &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGIN.to_string()),
        );

        let template_path = PathBuf::from(
            env::var("TEMPLATE_PATH").unwrap_or_else(|_| DEFAULT_TEMPLATE_PATH.to_string()),
        );

        let mail = MailConfig::from_env()?;

        debug!(
            "Server configuration loaded: bind={}:{}, origins={:?}, template={}",
            host,
            port,
            allowed_origins,
            template_path.display()
        );

        Ok(AppConfig {
            bind_addr: SocketAddr::new(host, port),
            allowed_origins,
            template_path,
            mail,
        })
    }
}

fn credentials(user_key: &str, pass_key: &str, optional: bool) -> Result<SmtpCredentials, ConfigError> {
    let lookup = |key: &str| match env::var(key) {
        Ok(value) => Ok(value),
        Err(_) if optional => Ok(String::new()),
        Err(_) => Err(ConfigError::MissingEnv(key.to_string())),
    };

    Ok(SmtpCredentials {
        username: lookup(user_key)?,
        password: lookup(pass_key)?,
    })
}

fn default_no_reply_address(sender: &str) -> Result<String, ConfigError> {
    match sender.rsplit_once('@') {
        Some((_, domain)) if !domain.is_empty() => Ok(format!("no-reply@{domain}")),
        _ => Err(ConfigError::InvalidConfig(format!(
            "Cannot derive NOREPLY_EMAIL from sender address '{sender}'"
        ))),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_bool(key: &str) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(ConfigError::InvalidConfig(format!("Invalid {key}: {other}"))),
        },
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_no_reply_address() {
        assert_eq!(
            default_no_reply_address("contact@example.com").unwrap(),
            "no-reply@example.com"
        );
        assert!(default_no_reply_address("not-an-address").is_err());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_credentials_are_redacted_in_debug() {
        let creds = SmtpCredentials {
            username: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_optional_credentials_default_to_empty() {
        let creds = credentials("CONTACT_TEST_UNSET_USER", "CONTACT_TEST_UNSET_PASS", true).unwrap();
        assert!(creds.username.is_empty());
        assert!(matches!(
            credentials("CONTACT_TEST_UNSET_USER", "CONTACT_TEST_UNSET_PASS", false),
            Err(ConfigError::MissingEnv(key)) if key == "CONTACT_TEST_UNSET_USER"
        ));
    }
}
