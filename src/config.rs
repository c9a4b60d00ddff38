use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Passphrase the credential vault stretches into its AES key.
    pub master_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub attachment_dir: PathBuf,
    pub max_attachment_size: usize,
    /// Deadline for one relay send or handshake attempt.
    pub send_timeout_secs: u64,
    pub log_level: String,
    /// Process-wide relay used when an owner has no registered accounts.
    pub fallback_smtp: Option<FallbackSmtp>,
}

#[derive(Debug, Clone)]
pub struct FallbackSmtp {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let master_key = env_required("MAILPORT_MASTER_KEY")?;

        let host: IpAddr = env_or("MAILPORT_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid MAILPORT_HOST: {e}"))?;

        let port: u16 = env_or("MAILPORT_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid MAILPORT_PORT: {e}"))?;

        // Body limit covers multipart sends; default leaves headroom over the
        // per-file attachment cap.
        let max_body_size: usize = env_or("MAILPORT_MAX_BODY_SIZE", "26214400")
            .parse()
            .map_err(|e| format!("Invalid MAILPORT_MAX_BODY_SIZE: {e}"))?;

        let attachment_dir = PathBuf::from(env_or("MAILPORT_ATTACHMENT_DIR", "uploads"));

        // 10 MiB per file unless overridden
        let max_attachment_size: usize = env_or("MAILPORT_MAX_ATTACHMENT_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid MAILPORT_MAX_ATTACHMENT_SIZE: {e}"))?;

        let send_timeout_secs: u64 = env_or("MAILPORT_SEND_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid MAILPORT_SEND_TIMEOUT_SECS: {e}"))?;

        let log_level = env_or("MAILPORT_LOG_LEVEL", "info");

        let fallback_smtp = match (
            std::env::var("MAILPORT_SMTP_HOST").ok(),
            std::env::var("MAILPORT_SMTP_PORT").ok(),
            std::env::var("MAILPORT_SMTP_USER").ok(),
            std::env::var("MAILPORT_SMTP_PASS").ok(),
        ) {
            (Some(host), Some(port), Some(username), Some(password)) => Some(FallbackSmtp {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid MAILPORT_SMTP_PORT: {e}"))?,
                secure: env_or("MAILPORT_SMTP_SECURE", "false") == "true",
                username,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            master_key,
            host,
            port,
            max_body_size,
            attachment_dir,
            max_attachment_size,
            send_timeout_secs,
            log_level,
            fallback_smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
