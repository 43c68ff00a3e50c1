pub mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::{Config, PhonePeConfig, RazorpayConfig, StripeConfig};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Public base URL used for redirect and callback URLs (no trailing slash)
    pub base_url: String,
    /// ISO currency code sent to providers
    pub currency: String,
    pub stripe: Option<StripeConfig>,
    pub phonepe: Option<PhonePeConfig>,
    pub razorpay: Option<RazorpayConfig>,
    /// Shared outbound HTTP client (connection pooling across providers)
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: DbPool, config: &Config) -> Self {
        Self {
            db,
            base_url: config.base_url.clone(),
            currency: config.currency.clone(),
            stripe: config.stripe.clone(),
            phonepe: config.phonepe.clone(),
            razorpay: config.razorpay.clone(),
            http: reqwest::Client::new(),
        }
    }
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
