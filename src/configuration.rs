use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub security: SecuritySettings,
    pub email_client: EmailClientSettings,
    pub mock_feed: MockFeedSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public URL used when building links in outgoing mail
    pub base_url: String,
    /// Allowed CORS origins; a single "*" allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_story_purge_interval")]
    pub story_purge_interval_seconds: u64,
}

fn default_story_purge_interval() -> u64 {
    300
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
///
/// Access and refresh tokens are signed with different secrets so a leaked
/// refresh secret cannot mint access tokens and vice versa.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

/// Rate limiting and brute-force settings
#[derive(serde::Deserialize, Clone)]
pub struct SecuritySettings {
    pub requests_per_minute: u32,
    pub max_content_length: u64,
    /// 0 disables account locking
    pub max_login_attempts: i32,
    pub lock_duration_seconds: i64,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct MockFeedSettings {
    pub enabled: bool,
    pub min_interval_seconds: u64,
    pub max_interval_seconds: u64,
}

/// Loads `configuration.yaml` (optional) and overlays `APP__SECTION__KEY`
/// environment variables, e.g. `APP__JWT__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("application.cors_origins")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
