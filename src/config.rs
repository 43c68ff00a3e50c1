use std::env;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_PHONEPE_API_BASE: &str = "https://api.phonepe.com/apis/hermes";
pub const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct PhonePeConfig {
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// ISO currency code sent to providers (e.g. "INR")
    pub currency: String,
    /// How long processed webhook event ids are kept (0 = forever)
    pub webhook_event_retention_days: i64,
    pub dev_mode: bool,
    pub stripe: Option<StripeConfig>,
    pub phonepe: Option<PhonePeConfig>,
    pub razorpay: Option<RazorpayConfig>,
}

/// Read a variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl StripeConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            secret_key: var("STRIPE_SECRET_KEY")?,
            webhook_secret: var("STRIPE_WEBHOOK_SECRET")?,
            api_base: var("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
        })
    }
}

impl PhonePeConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            merchant_id: var("PHONEPE_MERCHANT_ID")?,
            salt_key: var("PHONEPE_SALT_KEY")?,
            salt_index: var("PHONEPE_SALT_INDEX").unwrap_or_else(|| "1".to_string()),
            api_base: var("PHONEPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_PHONEPE_API_BASE.to_string()),
        })
    }
}

impl RazorpayConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            key_id: var("RAZORPAY_KEY_ID")?,
            key_secret: var("RAZORPAY_KEY_SECRET")?,
            api_base: var("RAZORPAY_API_BASE")
                .unwrap_or_else(|| DEFAULT_RAZORPAY_API_BASE.to_string()),
        })
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("ORDERPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let webhook_event_retention_days = env::var("WEBHOOK_EVENT_RETENTION_DAYS")
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(30);

        let config = Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "orderpay.db".to_string()),
            base_url,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            webhook_event_retention_days,
            dev_mode,
            stripe: StripeConfig::from_env(),
            phonepe: PhonePeConfig::from_env(),
            razorpay: RazorpayConfig::from_env(),
        };

        for (name, enabled) in [
            ("stripe", config.stripe.is_some()),
            ("phonepe", config.phonepe.is_some()),
            ("razorpay", config.razorpay.is_some()),
        ] {
            if enabled {
                tracing::info!("Payment provider enabled: {}", name);
            } else {
                tracing::warn!("Payment provider disabled (missing credentials): {}", name);
            }
        }

        config
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
