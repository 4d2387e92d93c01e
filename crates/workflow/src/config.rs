use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read from the environment. The binary loads
/// `.env` via dotenvy before calling `from_env`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the remote record system.
    pub records_base_url: String,
    /// Bearer credential attached to every records request.
    pub api_token: String,
    /// Identity-verification widget parameters.
    pub verify_client_id: String,
    pub verify_redirect_uri: String,
    /// Bound on every records call; expiry surfaces as a transport error.
    pub request_timeout: Duration,
    /// Override for the durable session file location.
    pub session_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let records_base_url = env::var("RECORDS_API_URL")
            .unwrap_or("http://localhost:5000/api".to_string());

        let api_token = env::var("RECORDS_API_TOKEN").unwrap_or_default();

        let verify_client_id =
            env::var("VERIFY_CLIENT_ID").unwrap_or("rxledger-workstation".to_string());

        let verify_redirect_uri = env::var("VERIFY_REDIRECT_URI")
            .unwrap_or("http://localhost:3000/verify/callback".to_string());

        let request_timeout = env::var("RECORDS_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let session_file = env::var("SESSION_FILE").ok().map(PathBuf::from);

        Self {
            records_base_url,
            api_token,
            verify_client_id,
            verify_redirect_uri,
            request_timeout,
            session_file,
        }
    }
}
