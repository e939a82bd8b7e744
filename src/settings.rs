use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ticket cache location, as in `KRB5CCNAME`
pub const CACHE_NAME_VAR: &str = "KRB5CCNAME";
/// Forces a decoy cache at an explicitly configured file location
pub const FAKE_CACHE_VAR: &str = "GSS_MEDIATOR_FAKE_KRB5_CC";
/// Octal unix mode of a decoy cache file
pub const FAKE_CACHE_MODE_VAR: &str = "GSS_MEDIATOR_FAKE_KRB5_CC_MODE";
pub const KRB5_CONFIG_VAR: &str = "KRB5_CONFIG";
const DEFAULT_KRB5_CONFIG: &str = "/etc/krb5.conf";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[default]
    Unix,
}
impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
    /// Whether an unset cache location means a cache that isn't a file
    pub fn default_cache_in_memory(self) -> bool {
        matches!(self, Self::Windows)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ticket_cache: Option<String>,
    pub fake_cache: bool,
    pub fake_cache_mode: Option<u32>,
    pub user: Option<String>,
    pub realm: Option<String>,
    pub krb5_config: Option<PathBuf>,
    pub platform: Platform,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            ticket_cache: None,
            fake_cache: false,
            fake_cache_mode: None,
            user: None,
            realm: None,
            krb5_config: None,
            platform: Platform::current(),
        }
    }
}
impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(|var| std::env::var(var).ok())
    }
    /// Build the settings from any variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let fake_cache = var(FAKE_CACHE_VAR).is_some_and(|value| parse_flag(&value));
        let fake_cache_mode = var(FAKE_CACHE_MODE_VAR).and_then(|value| match u32::from_str_radix(value.trim(), 8) {
            Ok(mode) => Some(mode),
            Err(_) => {
                warn!(%value, "ignoring {FAKE_CACHE_MODE_VAR}, not an octal file mode");
                None
            }
        });
        Self {
            ticket_cache: var(CACHE_NAME_VAR).filter(|cache| !cache.is_empty()),
            fake_cache,
            fake_cache_mode,
            krb5_config: var(KRB5_CONFIG_VAR).filter(|path| !path.is_empty()).map(PathBuf::from),
            ..Self::default()
        }
    }
    #[must_use]
    pub fn ticket_cache(self, ticket_cache: impl Into<String>) -> Self {
        Self {
            ticket_cache: Some(ticket_cache.into()),
            ..self
        }
    }
    #[must_use]
    pub fn fake_cache(self, fake_cache: bool) -> Self {
        Self { fake_cache, ..self }
    }
    #[must_use]
    /// Only applied on unix
    pub fn fake_cache_mode(self, mode: u32) -> Self {
        Self {
            fake_cache_mode: Some(mode),
            ..self
        }
    }
    #[must_use]
    pub fn user(self, user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..self
        }
    }
    #[must_use]
    pub fn realm(self, realm: impl Into<String>) -> Self {
        Self {
            realm: Some(realm.into()),
            ..self
        }
    }
    #[must_use]
    pub fn krb5_config(self, path: impl Into<PathBuf>) -> Self {
        Self {
            krb5_config: Some(path.into()),
            ..self
        }
    }
    #[must_use]
    pub fn platform(self, platform: Platform) -> Self {
        Self { platform, ..self }
    }

    /// The Kerberos configuration consulted for the default realm
    pub fn krb5_config_path(&self) -> &Path {
        self.krb5_config.as_deref().unwrap_or(Path::new(DEFAULT_KRB5_CONFIG))
    }
    pub fn current_user(&self) -> Option<String> {
        self.user.clone().or_else(login_name)
    }
    pub fn default_realm(&self) -> Option<String> {
        if let Some(realm) = &self.realm {
            return Some(realm.clone());
        }
        let path = self.krb5_config_path();
        match std::fs::read_to_string(path) {
            Ok(config) => libdefaults_realm(&config),
            Err(err) => {
                debug!(path = %path.display(), %err, "could not read Kerberos configuration");
                None
            }
        }
    }
    /// `user@REALM`, if both parts are known
    pub fn user_principal(&self) -> Option<(String, String)> {
        Some((self.current_user()?, self.default_realm()?))
    }
}

fn parse_flag(value: &str) -> bool {
    ["true", "1", "yes"].iter().any(|t| value.trim().eq_ignore_ascii_case(t))
}

fn libdefaults_realm(config: &str) -> Option<String> {
    let mut in_libdefaults = false;
    for line in config.lines().map(str::trim) {
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_libdefaults = line == "[libdefaults]";
            continue;
        }
        if !in_libdefaults {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if key.trim() == "default_realm" && !value.trim().is_empty() => {
                return Some(value.trim().to_owned());
            }
            _ => {}
        }
    }
    None
}

#[cfg(unix)]
fn login_name() -> Option<String> {
    ["USER", "LOGNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|name| !name.is_empty()))
}

#[cfg(windows)]
fn login_name() -> Option<String> {
    use windows::{Win32::System::WindowsProgramming::GetUserNameW, core::PWSTR};
    // UNLEN + 1
    let mut buffer = [0u16; 257];
    let mut len = buffer.len() as u32;
    unsafe { GetUserNameW(Some(PWSTR(buffer.as_mut_ptr())), &mut len) }.ok()?;
    // len counts the terminating null
    let name = buffer.get(..(len as usize).saturating_sub(1))?;
    String::from_utf16(name).ok()
}

#[cfg(not(any(unix, windows)))]
fn login_name() -> Option<String> {
    None
}
