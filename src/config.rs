use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Exact origins allowed by CORS; empty means a permissive layer.
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Reads and validates every configuration input. Required inputs that
    /// are missing make startup fail here, before anything binds or connects.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must not be empty");
        let jwt = JwtConfig {
            secret,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };

        let http = HttpConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };

        Ok(Self {
            database_url,
            jwt,
            http,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_split_on_commas_and_ignore_blanks() {
        let origins = parse_origins("http://localhost:3000, https://app.example.com ,,");
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.example.com".to_string()
            ]
        );
    }

    #[test]
    fn empty_origin_list_parses_to_empty() {
        assert!(parse_origins("").is_empty());
        assert!(parse_origins("  ").is_empty());
    }
}
