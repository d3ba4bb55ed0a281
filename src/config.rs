use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub secret_key: String,
    #[serde(default = "default_payment_base_url")]
    pub base_url: String,
}

fn default_payment_base_url() -> String {
    "https://api.stripe.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Seconds between sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Grace period before a past_due subscription is expired.
    #[serde(default = "default_past_due_grace")]
    pub past_due_grace_days: i64,
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_past_due_grace() -> i64 {
    7
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            past_due_grace_days: default_past_due_grace(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // Read the config file if present; fall back to env vars only.
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // DATABASE_URL is mandatory when there is no config file
                let database_url = get_env("DATABASE_URL")
                    .ok_or("Missing DATABASE_URL env var and no config.toml found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    payment: PaymentConfig {
                        secret_key: get_env("PAYMENT_SECRET_KEY").unwrap_or_default(),
                        base_url: get_env("PAYMENT_BASE_URL")
                            .unwrap_or_else(default_payment_base_url),
                    },
                    billing: BillingConfig {
                        sweep_interval_secs: get_env_parse(
                            "BILLING_SWEEP_INTERVAL_SECS",
                            default_sweep_interval(),
                        ),
                        past_due_grace_days: get_env_parse(
                            "BILLING_PAST_DUE_GRACE_DAYS",
                            default_past_due_grace(),
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // env overrides apply even when the file exists
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("PAYMENT_SECRET_KEY") {
            config.payment.secret_key = v;
        }
        if let Ok(v) = env::var("PAYMENT_BASE_URL") {
            config.payment.base_url = v;
        }
        if let Ok(v) = env::var("BILLING_SWEEP_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.billing.sweep_interval_secs = n;
        }
        if let Ok(v) = env::var("BILLING_PAST_DUE_GRACE_DAYS")
            && let Ok(n) = v.parse()
        {
            config.billing.past_due_grace_days = n;
        }

        Ok(config)
    }
}
