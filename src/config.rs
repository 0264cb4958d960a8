use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Facility sync
    pub sync_interval_minutes: u64,
    pub sync_startup_delay_secs: u64,
    pub sync_facility_timeout_secs: u64,
    pub device_http_timeout_secs: u64,
    pub write_retry_limit: u32,

    // Reporting
    pub absent_synthesis_max_days: i64,

    // Rate limiting
    pub rate_breaks_per_min: u32,
    pub rate_query_per_min: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            sync_interval_minutes: env::var("SYNC_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap(),
            sync_startup_delay_secs: env::var("SYNC_STARTUP_DELAY_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            sync_facility_timeout_secs: env::var("SYNC_FACILITY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap(),
            device_http_timeout_secs: env::var("DEVICE_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            write_retry_limit: env::var("WRITE_RETRY_LIMIT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap(),

            absent_synthesis_max_days: env::var("ABSENT_SYNTHESIS_MAX_DAYS")
                .unwrap_or_else(|_| "31".to_string())
                .parse()
                .unwrap(),

            rate_breaks_per_min: env::var("RATE_BREAKS_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_query_per_min: env::var("RATE_QUERY_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
        }
    }
}
