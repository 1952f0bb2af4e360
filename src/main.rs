mod jsonp_parser;
mod portal_b64;
mod portal_client;
mod signature;
mod utils;
mod xencode;

use clap::Parser;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use portal_client::{PortalConfig, PortalError};

const DEFAULT_HOST: &str = "http://219.242.208.131";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    headers
});

// Custom Application Error Type
#[derive(Debug)]
enum AppError {
    Portal(PortalError),
    Http(reqwest::Error),
    UrlParse(url::ParseError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Portal(err) => write!(f, "Portal error: {}", err),
            AppError::Http(err) => write!(f, "HTTP client error: {}", err),
            AppError::UrlParse(err) => write!(f, "URL parsing error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Portal(err) => Some(err),
            AppError::Http(err) => Some(err),
            AppError::UrlParse(err) => Some(err),
        }
    }
}

impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        AppError::Portal(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Http(err)
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::UrlParse(err)
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "SRun campus network portal client", long_about = None)]
struct Args {
    /// Portal base URL.
    #[clap(long, default_value = DEFAULT_HOST)]
    host: String,

    #[clap(long, default_value = "")]
    username: String,

    #[clap(long, default_value = "")]
    password: String,

    /// Access controller handling the request.
    #[clap(long = "ac-id", default_value = "2")]
    ac_id: String,

    /// Client IP. Optional for login; the server's reported IP wins.
    #[clap(long, default_value = "")]
    ip: String,

    /// Log out instead of logging in. Requires --username or --ip.
    #[clap(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    env_logger::init();

    let host_url = Url::parse(&args.host)?; // url::ParseError converted via From trait
    info!("Portal host: {}", host_url);

    let client = Client::builder()
        .default_headers(BASE_HEADERS.clone())
        .timeout(REQUEST_TIMEOUT)
        .build()?; // reqwest::Error converted via From trait

    let config = PortalConfig {
        host: args.host.trim_end_matches('/').to_string(),
        username: args.username,
        password: args.password,
        ac_id: args.ac_id,
        ip: args.ip,
    };

    let result = if args.logout {
        info!("Submitting logout request...");
        portal_client::logout(&client, &config).await
    } else {
        info!("Starting login flow for {}...", config.username);
        portal_client::login(&client, &config).await
    };

    match result {
        Ok(body) => {
            println!("{:#}", body);
            Ok(())
        }
        // The server's rejection body is informational for the user, so it
        // is printed before the error propagates to the exit code.
        Err(PortalError::LoginRejected(body)) => {
            warn!("Portal rejected the login request");
            println!("{:#}", body);
            Err(AppError::Portal(PortalError::LoginRejected(body)))
        }
        Err(PortalError::LogoutRejected(body)) => {
            warn!("Portal rejected the logout request");
            println!("{:#}", body);
            Err(AppError::Portal(PortalError::LogoutRejected(body)))
        }
        Err(err) => {
            error!("{}", err);
            Err(err.into())
        }
    }
}
