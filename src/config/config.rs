use std::env;
use std::path::PathBuf;

use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use block_modes::{BlockMode, Cbc};
use block_padding::Pkcs7;
use chrono_tz::Tz;
use reqwest::header::HeaderValue;

use crate::error::ConfigError;

type Aes128Cbc = Cbc<Aes128, Pkcs7>;

#[derive(Debug, Clone)]
pub struct Config {
    pub domain_api: String,
    pub user_id: String,
    pub user_name: String,
    pub api_token: String,
    pub timezone: Tz,
    pub log_dir: PathBuf,
    pub device_profile_path: PathBuf,
    pub default_project_id: Option<String>,
    pub default_work_site_id: Option<String>,
    pub note_required_before_schedule: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let domain_api = get("DOMAIN_API")
            .ok_or(ConfigError::Missing("DOMAIN_API"))?
            .trim_end_matches('/')
            .to_string();
        let user_id = get("USER_ID").ok_or(ConfigError::Missing("USER_ID"))?;
        let user_name = get("USER_NAME").unwrap_or_else(|| user_id.clone());

        let api_token = match (get("AES_KEY"), get("AES_IV"), get("API_TOKEN_ENC")) {
            (Some(key_b64), Some(iv_b64), Some(enc_b64)) => {
                decrypt_token(&key_b64, &iv_b64, &enc_b64)?
            }
            _ => get("API_TOKEN").ok_or(ConfigError::Missing("API_TOKEN"))?,
        };
        if HeaderValue::from_str(&format!("Bearer {}", api_token)).is_err() {
            return Err(ConfigError::Invalid {
                key: "API_TOKEN",
                value: "<not a valid header value>".to_string(),
            });
        }

        let timezone = match get("TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::Timezone(name))?,
            None => Tz::UTC,
        };

        let note_required_before_schedule = match get("NOTE_REQUIRED_BEFORE_SCHEDULE") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                key: "NOTE_REQUIRED_BEFORE_SCHEDULE",
                value,
            })?,
            None => false,
        };

        Ok(Config {
            domain_api,
            user_id,
            user_name,
            api_token,
            timezone,
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            device_profile_path: get("DEVICE_PROFILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("device_profile.json")),
            default_project_id: get("DEFAULT_PROJECT_ID"),
            default_work_site_id: get("DEFAULT_WORK_SITE_ID"),
            note_required_before_schedule,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Base64 AES-128-CBC/PKCS7 token, as stored in the deployment env.
fn decrypt_token(key_b64: &str, iv_b64: &str, enc_b64: &str) -> Result<String, ConfigError> {
    let decode = |what: &str, value: &str| {
        STANDARD
            .decode(value.trim())
            .map_err(|e| ConfigError::Decrypt(format!("{} badly encoded: {}", what, e)))
    };
    let key = decode("key", key_b64)?;
    let iv = decode("iv", iv_b64)?;
    let ciphertext = decode("token", enc_b64)?;

    let cipher = Aes128Cbc::new_from_slices(&key, &iv)
        .map_err(|e| ConfigError::Decrypt(e.to_string()))?;
    let decrypted = cipher
        .decrypt_vec(&ciphertext)
        .map_err(|e| ConfigError::Decrypt(e.to_string()))?;

    String::from_utf8(decrypted).map_err(|_| ConfigError::Decrypt("token is not UTF-8".into()))
}
