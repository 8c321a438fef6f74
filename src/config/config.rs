use dotenv::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Path to a CA bundle; when set, connections are established over TLS.
    pub database_ca_cert: Option<String>,
    pub pool_max_size: usize,
}

impl Config {
    pub fn init() -> Config {
        dotenv().ok();
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let database_ca_cert = std::env::var("DATABASE_CA_CERT").ok();
        let pool_max_size = std::env::var("POOL_MAX_SIZE").unwrap_or_else(|_| String::new());

        let pool_max_size = if pool_max_size.is_empty() {
            10 // Default value of 10 if environment variable is not set
        } else {
            pool_max_size
                .parse::<usize>()
                .expect("Failed to parse POOL_MAX_SIZE as usize")
        };

        Config {
            database_url,
            database_ca_cert,
            pool_max_size,
        }
    }
}
