use log::{debug, info};
use reqwest::{Client, Error as ReqwestError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

use crate::jsonp_parser::{self, ParseError};
use crate::signature;
use crate::utils;

const CHALLENGE_ENDPOINT: &str = "/cgi-bin/get_challenge";
const PORTAL_ENDPOINT: &str = "/cgi-bin/srun_portal";
const STATUS_OK: &str = "ok";

/// Everything one login or logout invocation needs. Passed explicitly;
/// nothing is read from ambient globals and nothing persists across calls.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub ac_id: String,
    pub ip: String,
}

/// Server-issued challenge, valid for the single login attempt that
/// requested it.
#[derive(Debug)]
pub struct Challenge {
    pub token: String,
    pub client_ip: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    error: String,
    challenge: Option<String>,
    client_ip: Option<String>,
}

#[derive(Debug)]
pub enum PortalError {
    Network(ReqwestError),
    Parse(ParseError),
    ChallengeRejected(Value),
    MissingChallenge(Value),
    LoginRejected(Value),
    LogoutRejected(Value),
    InvalidInput(String),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalError::Network(e) => write!(f, "HTTP request error: {}", e),
            PortalError::Parse(e) => write!(f, "Malformed portal response: {}", e),
            PortalError::ChallengeRejected(body) => {
                write!(f, "get_challenge failed: {}", body)
            }
            PortalError::MissingChallenge(body) => {
                write!(f, "challenge response carries no token: {}", body)
            }
            PortalError::LoginRejected(body) => write!(f, "login rejected: {}", body),
            PortalError::LogoutRejected(body) => write!(f, "logout rejected: {}", body),
            PortalError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            PortalError::Serialize(e) => write!(f, "failed to serialize login info: {}", e),
        }
    }
}

impl std::error::Error for PortalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PortalError::Network(e) => Some(e),
            PortalError::Parse(e) => Some(e),
            PortalError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReqwestError> for PortalError {
    fn from(err: ReqwestError) -> PortalError {
        PortalError::Network(err)
    }
}

impl From<ParseError> for PortalError {
    fn from(err: ParseError) -> PortalError {
        PortalError::Parse(err)
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> PortalError {
        PortalError::Serialize(err)
    }
}

/// GET the given portal URL and decode the JSONP body.
async fn get_jsonp(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<Value, PortalError> {
    debug!("[API] Sending GET to {} with params: {:?}", url, params);

    let start_time = Instant::now();
    let response = client.get(url).query(params).send().await?;
    info!("[TIMING] GET {} took {:.2?}", url, start_time.elapsed());

    let text = response.text().await?;
    debug!("[API] response body: {}", text);
    Ok(jsonp_parser::unwrap_jsonp(&text)?)
}

fn status_of(value: &Value) -> Option<&str> {
    value.get("error").and_then(Value::as_str)
}

/// Requests a challenge token for the given account. The server may report
/// its own view of the client IP, which supersedes the requested one; an
/// absent or empty `client_ip` falls back to the caller's value unchanged.
pub async fn fetch_challenge(
    client: &Client,
    host: &str,
    username: &str,
    ip: &str,
) -> Result<Challenge, PortalError> {
    let callback = utils::fresh_callback();
    let stamp = utils::unix_millis().to_string();
    let url = format!("{}{}", host, CHALLENGE_ENDPOINT);

    let value = get_jsonp(
        client,
        &url,
        &[
            ("callback", callback.as_str()),
            ("username", username),
            ("ip", ip),
            ("_", stamp.as_str()),
        ],
    )
    .await?;

    let decoded: ChallengeResponse = serde_json::from_value(value.clone())?;
    if decoded.error != STATUS_OK {
        return Err(PortalError::ChallengeRejected(value));
    }
    let token = match decoded.challenge {
        Some(token) if !token.is_empty() => token,
        _ => return Err(PortalError::MissingChallenge(value)),
    };
    let client_ip = decoded
        .client_ip
        .filter(|reported| !reported.is_empty())
        .unwrap_or_else(|| ip.to_string());

    info!("Challenge token obtained for {} (client ip: {})", username, client_ip);
    Ok(Challenge { token, client_ip })
}

/// Full login flow: challenge, signature, portal submission. Exactly one
/// challenge call and one action call; nothing is retried.
pub async fn login(client: &Client, config: &PortalConfig) -> Result<Value, PortalError> {
    if config.username.is_empty() || config.password.is_empty() {
        return Err(PortalError::InvalidInput(
            "login requires a username and a password".to_string(),
        ));
    }

    let challenge =
        fetch_challenge(client, &config.host, &config.username, &config.ip).await?;
    let params = signature::build_login_params(
        &config.username,
        &config.password,
        &config.ac_id,
        &challenge.client_ip,
        &challenge.token,
    )?;

    let callback = utils::fresh_callback();
    let stamp = utils::unix_millis().to_string();
    let url = format!("{}{}", config.host, PORTAL_ENDPOINT);
    debug!("[API] Sending login GET to {}", url);

    let start_time = Instant::now();
    let response = client
        .get(&url)
        .query(&params)
        .query(&[("callback", callback.as_str()), ("_", stamp.as_str())])
        .send()
        .await?;
    info!("[TIMING] login GET {} took {:.2?}", url, start_time.elapsed());

    let text = response.text().await?;
    debug!("[API] login response body: {}", text);
    let value = jsonp_parser::unwrap_jsonp(&text)?;

    if status_of(&value) != Some(STATUS_OK) {
        return Err(PortalError::LoginRejected(value));
    }
    Ok(value)
}

/// Logout submission. No challenge or signature step; the portal accepts
/// the action keyed on username or IP alone.
pub async fn logout(client: &Client, config: &PortalConfig) -> Result<Value, PortalError> {
    if config.username.is_empty() && config.ip.is_empty() {
        return Err(PortalError::InvalidInput(
            "logout requires a username or an ip".to_string(),
        ));
    }

    let callback = utils::fresh_callback();
    let stamp = utils::unix_millis().to_string();
    let url = format!("{}{}", config.host, PORTAL_ENDPOINT);

    let mut params: Vec<(&str, &str)> = vec![
        ("callback", callback.as_str()),
        ("action", "logout"),
        ("ac_id", config.ac_id.as_str()),
        ("_", stamp.as_str()),
    ];
    if !config.ip.is_empty() {
        params.push(("ip", config.ip.as_str()));
    }
    if !config.username.is_empty() {
        params.push(("username", config.username.as_str()));
    }

    let value = get_jsonp(client, &url, &params).await?;
    if status_of(&value) != Some(STATUS_OK) {
        return Err(PortalError::LogoutRejected(value));
    }
    Ok(value)
}
