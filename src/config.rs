use validator::Validate;

/// NFL regular season
const DEFAULT_SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

#[derive(Deserialize, Debug, Validate)]
pub struct Config {
    database_url: String,
    api_host: Option<String>,
    api_port: Option<usize>,
    #[validate(length(min = 32))]
    session_private_key: String,
    /// shared secret the scheduler presents on /api/trigger calls
    #[validate(length(min = 16))]
    trigger_secret: String,
    /// scoreboard endpoint of the external sports-data provider
    scoreboard_url: Option<String>,
    /// timeout in seconds for outbound provider fetches
    provider_timeout: Option<u64>,
}

lazy_static! {
    static ref CONFIG: Config = match envy::from_env::<Config>() {
        Ok(config) => {
            match config.validate() {
                Ok(()) => config,
                Err(e) => panic!("invalid environment variable: {}", e),
            }
        }
        Err(error) => panic!("Missing or incorrect environment variable: {}", error),
    };
}

impl Config {
    pub fn database_url() -> &'static str {
        CONFIG.database_url.as_ref()
    }

    pub fn api_host() -> &'static str {
        match &CONFIG.api_host {
            Some(host) => host.as_ref(),
            None => "localhost",
        }
    }

    pub fn api_port() -> usize {
        CONFIG.api_port.unwrap_or(8080)
    }

    pub fn session_private_key() -> &'static str {
        CONFIG.session_private_key.as_ref()
    }

    pub fn trigger_secret() -> &'static str {
        CONFIG.trigger_secret.as_ref()
    }

    pub fn scoreboard_url() -> &'static str {
        match &CONFIG.scoreboard_url {
            Some(url) => url.as_ref(),
            None => DEFAULT_SCOREBOARD_URL,
        }
    }

    pub fn provider_timeout() -> u64 {
        CONFIG.provider_timeout.unwrap_or(10)
    }
}
