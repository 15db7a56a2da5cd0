//! OS keychain storage for the Gemini credential
//!
//! Credentials live in a single keychain entry as JSON so new secrets can be
//! added later without another keychain prompt.

use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

const KEYRING_SERVICE: &str = "reporecon-credentials";
const KEYRING_USERNAME: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    gemini_api_key: Option<String>,
}

type KeyringResult<T> = Result<T, String>;

static CREDENTIALS_CACHE: OnceLock<Mutex<Option<StoredCredentials>>> = OnceLock::new();
static KEYRING_ERROR_WARNED: AtomicBool = AtomicBool::new(false);

fn credentials_cache() -> &'static Mutex<Option<StoredCredentials>> {
    CREDENTIALS_CACHE.get_or_init(|| Mutex::new(None))
}

/// The keychain is never touched from tests or when
/// `REPORECON_DISABLE_KEYRING` is set.
pub fn keyring_disabled() -> bool {
    if cfg!(test) {
        return true;
    }
    matches!(
        std::env::var("REPORECON_DISABLE_KEYRING")
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    )
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

/// Warn about keychain errors only once per process
pub fn warn_keychain_error_once(context: &str, err: &str) {
    if KEYRING_ERROR_WARNED.swap(true, Ordering::Relaxed) {
        return;
    }
    log::warn!("Couldn't access system keychain for {}: {}", context, err);
    log::warn!("Set GEMINI_API_KEY to bypass the keychain.");
}

fn decode(json: &str) -> KeyringResult<StoredCredentials> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse credentials: {}", e))
}

fn encode(creds: &StoredCredentials) -> KeyringResult<String> {
    serde_json::to_string(creds).map_err(|e| format!("Failed to serialize credentials: {}", e))
}

fn read_credentials_uncached() -> KeyringResult<StoredCredentials> {
    if keyring_disabled() {
        return Ok(StoredCredentials::default());
    }
    let entry = keyring_entry().map_err(|e| e.to_string())?;
    match entry.get_password() {
        Ok(json) => decode(&json),
        Err(keyring::Error::NoEntry) => Ok(StoredCredentials::default()),
        Err(err) => Err(err.to_string()),
    }
}

fn read_credentials_cached() -> KeyringResult<StoredCredentials> {
    let mut guard = match credentials_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(creds) = guard.as_ref() {
        return Ok(creds.clone());
    }
    let creds = read_credentials_uncached()?;
    *guard = Some(creds.clone());
    Ok(creds)
}

fn write_credentials(creds: &StoredCredentials) -> KeyringResult<()> {
    if keyring_disabled() {
        return Err("System keychain is disabled (REPORECON_DISABLE_KEYRING)".to_string());
    }
    let entry = keyring_entry().map_err(|e| e.to_string())?;
    entry.set_password(&encode(creds)?).map_err(|e| e.to_string())?;

    let mut guard = match credentials_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Some(creds.clone());
    Ok(())
}

// ============================================================================
// Public API
// ============================================================================

/// Get the Gemini API key from the keychain
pub fn get_api_key() -> KeyringResult<Option<String>> {
    Ok(read_credentials_cached()?.gemini_api_key)
}

/// Store the Gemini API key in the keychain and read it back to confirm.
pub fn set_api_key(key: &str) -> KeyringResult<()> {
    let mut creds = read_credentials_cached().unwrap_or_default();
    creds.gemini_api_key = Some(key.to_string());
    write_credentials(&creds)?;

    match read_credentials_uncached()?.gemini_api_key {
        Some(stored) if stored == key => Ok(()),
        Some(_) => Err("API key verification failed: stored key doesn't match".to_string()),
        None => Err("API key verification failed: key was not persisted to keychain".to_string()),
    }
}
