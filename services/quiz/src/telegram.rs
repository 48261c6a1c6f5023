//! Telegram login data verification
//!
//! Telegram signs login payloads with a key derived from the bot token:
//! `secret = HMAC_SHA256(key = "WebAppData", message = bot_token)`, then
//! `hash = hex(HMAC_SHA256(key = secret, message = data_check_string))`, where
//! the data check string is every field except `hash`, rendered `key=value`,
//! sorted by key and joined with `\n`.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the per-bot secret
const WEBAPP_KEY_SEED: &[u8] = b"WebAppData";

/// Login payloads older than this are rejected
pub const MAX_AUTH_AGE_SECS: i64 = 86_400;

/// Signed login fields, ordered by key
pub type LoginPayload = BTreeMap<String, String>;

/// Why a payload failed verification
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("login payload has no hash")]
    MissingHash,

    #[error("login payload hash is not hex")]
    MalformedHash,

    #[error("login payload has no numeric auth_date")]
    MissingAuthDate,

    #[error("login payload signature does not match")]
    SignatureMismatch,

    #[error("login payload is {age} seconds old")]
    Expired { age: i64 },
}

/// Build the newline-joined `key=value` string Telegram signs
pub fn data_check_string(payload: &LoginPayload) -> String {
    payload
        .iter()
        .filter(|(key, _)| key.as_str() != "hash")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn payload_mac(payload: &LoginPayload, bot_token: &str) -> HmacSha256 {
    let mut secret_mac =
        HmacSha256::new_from_slice(WEBAPP_KEY_SEED).expect("HMAC can take key of any size");
    secret_mac.update(bot_token.as_bytes());
    let secret = secret_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC can take key of any size");
    mac.update(data_check_string(payload).as_bytes());
    mac
}

/// Compute the lowercase hex signature Telegram would attach to `payload`
pub fn sign(payload: &LoginPayload, bot_token: &str) -> String {
    hex::encode(payload_mac(payload, bot_token).finalize().into_bytes())
}

/// Check a payload against the bot token at the given unix time
pub fn check_at(payload: &LoginPayload, bot_token: &str, now: i64) -> Result<(), CredentialError> {
    let hash = payload.get("hash").ok_or(CredentialError::MissingHash)?;
    let expected = hex::decode(hash).map_err(|_| CredentialError::MalformedHash)?;

    let auth_date = payload
        .get("auth_date")
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or(CredentialError::MissingAuthDate)?;

    payload_mac(payload, bot_token)
        .verify_slice(&expected)
        .map_err(|_| CredentialError::SignatureMismatch)?;

    let age = now - auth_date;
    if age >= MAX_AUTH_AGE_SECS {
        return Err(CredentialError::Expired { age });
    }

    Ok(())
}

/// Check a payload against the bot token at the current time
pub fn check(payload: &LoginPayload, bot_token: &str) -> Result<(), CredentialError> {
    check_at(payload, bot_token, chrono::Utc::now().timestamp())
}

/// `true` iff the payload is signed for this bot and fresh
pub fn verify(payload: &LoginPayload, bot_token: &str) -> bool {
    check(payload, bot_token).is_ok()
}

/// Flatten a JSON login object into signed fields
///
/// Strings, numbers and booleans are rendered the way the client sent them.
/// Any other value makes the payload unverifiable and yields `None`.
pub fn payload_from_json(object: &Map<String, Value>) -> Option<LoginPayload> {
    object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// Parse a WebApp `initData` query string into signed fields
///
/// Returns `None` when a pair is malformed or a value is not valid UTF-8
/// after percent-decoding.
pub fn parse_init_data(init_data: &str) -> Option<LoginPayload> {
    init_data
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}
