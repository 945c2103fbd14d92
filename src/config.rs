use std::env;
use std::path::PathBuf;

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters long")]
    WeakJwtSecret,
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub port: u16,
    pub frontend_url: String,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub bcrypt_cost: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }

        let settings = Self {
            bind_addr: env::var("VEIL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("VEIL_PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            data_dir: env::var("VEIL_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("data")),
            database_url: env::var("DATABASE_URL").ok(),
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };

        if cfg!(feature = "postgres-store") && settings.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(settings)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // env is process-global; keep every mutation inside one test
    #[test]
    #[serial_test::serial]
    fn reads_env_with_defaults_and_rejects_weak_secret() {
        env::remove_var("JWT_SECRET");
        assert_eq!(Settings::from_env().unwrap_err(), ConfigError::Missing("JWT_SECRET"));

        env::set_var("JWT_SECRET", "short");
        assert_eq!(Settings::from_env().unwrap_err(), ConfigError::WeakJwtSecret);

        env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        env::set_var("VEIL_PORT", "not-a-port");
        assert!(matches!(Settings::from_env(), Err(ConfigError::Invalid { var: "VEIL_PORT", .. })));

        env::set_var("VEIL_PORT", "9090");
        if cfg!(feature = "postgres-store") {
            env::set_var("DATABASE_URL", "postgres://localhost/veil");
        }
        let s = Settings::from_env().unwrap();
        assert_eq!(s.port, 9090);
        assert_eq!(s.bcrypt_cost, bcrypt::DEFAULT_COST);
        env::remove_var("VEIL_PORT");
    }
}
