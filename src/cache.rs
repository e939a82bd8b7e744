//! Decoy credential caches for login modules that insist on reading one.
//!
//! A login module validates that a ticket cache exists before handing over to the mechanism, which
//! then never uses it. When the real cache can't be read as a file (it lives in LSA, the kernel keyring
//! or a daemon), a syntactically valid cache with a worthless ticket is written instead and the login
//! module is pointed at it.
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use parking_lot::RwLock;
use tempfile::TempPath;
use tracing::{debug, info};

pub use time::{CacheTime, DECOY_LIFETIME};

use crate::settings::{Platform, Settings};

pub mod ccache;
mod time;

/// Cache name prefixes of caches that are not plain files
pub const IN_MEMORY_SCHEMES: [&str; 5] = ["MSLSA:", "MEMORY:", "KEYRING:", "KCM:", "API:"];
const FILE_SCHEME: &str = "FILE:";
const TEMP_PREFIX: &str = "krb5cc_";
const TEMP_SUFFIX: &str = "_fake";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cannot create credentials cache file at {path}, {reason}")]
    Unwritable { path: PathBuf, reason: &'static str },
    #[error("failed to write credentials cache at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize credentials cache for {path}: {message}")]
    Serialize { path: PathBuf, message: String },
    #[error("time stamp overflow: {start}s since epoch plus {offset:?} is past 2106-02-07T06:28:15Z")]
    TimestampOverflow { start: u64, offset: Duration },
    #[error("could not determine the current user")]
    UnknownUser,
    #[error("could not determine the default realm, {0} has none")]
    UnknownRealm(String),
    #[error("failed to create temporary credentials cache")]
    TempFile(#[source] io::Error),
}

/// Where the mechanism finds real tickets and where the login module is sent
#[derive(Debug, Default)]
pub struct CachePaths {
    ticket_cache: RwLock<Option<String>>,
    login_cache: RwLock<Option<String>>,
}
impl CachePaths {
    pub fn new(ticket_cache: Option<String>) -> Self {
        Self {
            login_cache: RwLock::new(ticket_cache.clone()),
            ticket_cache: RwLock::new(ticket_cache),
        }
    }
    /// The real cache, `None` for the platform default
    pub fn ticket_cache(&self) -> Option<String> {
        self.ticket_cache.read().clone()
    }
    /// The cache handed to login modules
    pub fn login_cache(&self) -> Option<String> {
        self.login_cache.read().clone()
    }
    pub fn set_ticket_cache(&self, ticket_cache: Option<String>) {
        *self.ticket_cache.write() = ticket_cache;
    }
    pub fn bind_login_cache(&self, login_cache: Option<String>) {
        *self.login_cache.write() = login_cache;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLocation {
    /// Not a file, a login module can't read it
    InMemory,
    File(String),
    /// Unset, and the platform keeps its default cache in a file
    PlatformDefault,
}
impl CacheLocation {
    pub fn classify(location: Option<&str>, platform: Platform) -> Self {
        match location {
            None if platform.default_cache_in_memory() => Self::InMemory,
            None => Self::PlatformDefault,
            Some(location) if IN_MEMORY_SCHEMES.iter().any(|scheme| has_prefix(location, scheme)) => Self::InMemory,
            Some(location) => Self::File(location.to_owned()),
        }
    }
}

fn has_prefix(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// The cache the login module was pointed at. A temporary decoy is deleted on drop.
#[derive(Debug)]
pub struct LoginCache {
    path: Option<String>,
    temp: Option<TempPath>,
}
impl LoginCache {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
    pub fn bind(&self, paths: &CachePaths) {
        paths.bind_login_cache(self.path.clone());
    }
}

/// Decide on the cache for login modules, writing a decoy where needed.
///
/// A decoy at the configured location clears the ticket cache in `paths`. Binding the result is up
/// to the caller.
pub fn prepare_login_cache(settings: &Settings, paths: &CachePaths) -> Result<LoginCache, CacheError> {
    let location = paths.ticket_cache();
    let login = match CacheLocation::classify(location.as_deref(), settings.platform) {
        CacheLocation::InMemory => {
            let temp = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(TEMP_SUFFIX)
                .tempfile()
                .map_err(CacheError::TempFile)?
                .into_temp_path();
            write_decoy(settings, &temp)?;
            LoginCache {
                path: Some(temp.to_string_lossy().into_owned()),
                temp: Some(temp),
            }
        }
        CacheLocation::File(location) if settings.fake_cache => {
            write_decoy(settings, Path::new(strip_file_scheme(&location)))?;
            // the mechanism falls back to its default cache, the configured one is a decoy now
            paths.set_ticket_cache(None);
            LoginCache {
                path: Some(location),
                temp: None,
            }
        }
        CacheLocation::File(location) => {
            info!(cache = %location, "skipped creating fake credentials cache for login");
            LoginCache {
                path: Some(location),
                temp: None,
            }
        }
        CacheLocation::PlatformDefault => {
            debug!("no ticket cache configured, login modules use the platform default");
            LoginCache { path: None, temp: None }
        }
    };
    Ok(login)
}

fn strip_file_scheme(location: &str) -> &str {
    if has_prefix(location, FILE_SCHEME) {
        &location[FILE_SCHEME.len()..]
    } else {
        location
    }
}

/// Write a decoy cache for the current user to `path`
pub fn write_decoy(settings: &Settings, path: &Path) -> Result<(), CacheError> {
    check_writable(path)?;
    let user = settings.current_user().ok_or(CacheError::UnknownUser)?;
    let realm = settings
        .default_realm()
        .ok_or_else(|| CacheError::UnknownRealm(settings.krb5_config_path().display().to_string()))?;

    let file = ccache::decoy(&user, &realm, CacheTime::now()?)?;
    let bytes = file.to_bytes().map_err(|err| CacheError::Serialize {
        path: path.to_owned(),
        message: err.to_string(),
    })?;
    let io_err = |source| CacheError::Io {
        path: path.to_owned(),
        source,
    };
    fs::write(path, bytes).map_err(io_err)?;
    #[cfg(unix)]
    if let Some(mode) = settings.fake_cache_mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(io_err)?;
    }
    info!(
        path = %path.display(),
        client = %format!("{user}@{realm}"),
        "created fake credentials cache for login"
    );
    Ok(())
}

/// Checks what this process can actually do, not just the mode bits
fn check_writable(path: &Path) -> Result<(), CacheError> {
    let unwritable = |reason| CacheError::Unwritable {
        path: path.to_owned(),
        reason,
    };
    let no_permission = "this process doesn't have permission to modify or create it";
    if let Ok(meta) = fs::metadata(path) {
        if meta.is_dir() {
            return Err(unwritable("it is a directory"));
        }
        return match fs::OpenOptions::new().write(true).open(path) {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(path = %path.display(), %err, "credentials cache is not writable");
                Err(unwritable(no_permission))
            }
        };
    }
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(unwritable("parent doesn't exist or is not a directory")),
    };
    match fs::metadata(parent) {
        Ok(meta) if !meta.is_dir() => Err(unwritable("parent doesn't exist or is not a directory")),
        // a scratch file tells whether this process may create entries here
        Ok(_) => match tempfile::NamedTempFile::new_in(parent) {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(parent = %parent.display(), %err, "cannot create files next to credentials cache");
                Err(unwritable(no_permission))
            }
        },
        Err(_) => Err(unwritable("parent doesn't exist or is not a directory")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_locations() {
        assert_eq!(
            CacheLocation::classify(Some("mslsa:"), Platform::Unix),
            CacheLocation::InMemory
        );
        assert_eq!(
            CacheLocation::classify(Some("KEYRING:persistent:1000"), Platform::Unix),
            CacheLocation::InMemory
        );
        assert_eq!(CacheLocation::classify(None, Platform::Windows), CacheLocation::InMemory);
        assert_eq!(CacheLocation::classify(None, Platform::Unix), CacheLocation::PlatformDefault);
        assert_eq!(
            CacheLocation::classify(Some("FILE:/tmp/cc1"), Platform::Windows),
            CacheLocation::File("FILE:/tmp/cc1".to_owned())
        );
        // shorter than any scheme
        assert_eq!(
            CacheLocation::classify(Some("KC"), Platform::Unix),
            CacheLocation::File("KC".to_owned())
        );
    }

    #[test]
    fn file_scheme_is_stripped() {
        assert_eq!(strip_file_scheme("FILE:/tmp/cc1"), "/tmp/cc1");
        assert_eq!(strip_file_scheme("file:/tmp/cc1"), "/tmp/cc1");
        assert_eq!(strip_file_scheme("/tmp/cc1"), "/tmp/cc1");
    }

    #[test]
    fn missing_parent_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_writable(&dir.path().join("missing").join("cc")).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Unwritable {
                reason: "parent doesn't exist or is not a directory",
                ..
            }
        ));
        let file = dir.path().join("plain");
        fs::write(&file, b"").unwrap();
        assert!(check_writable(&file.join("cc")).is_err());
        assert!(check_writable(&file).is_ok());
        assert!(check_writable(&dir.path().join("new")).is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn permission_is_checked_by_access_not_mode_bits() {
        // procfs refuses new files even to root, whatever its mode says
        let err = check_writable(Path::new("/proc/krb5cc_decoy")).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Unwritable {
                reason: "this process doesn't have permission to modify or create it",
                ..
            }
        ));
    }

    #[test]
    fn unbound_paths_start_equal() {
        let paths = CachePaths::new(Some("/tmp/cc1".to_owned()));
        assert_eq!(paths.login_cache().as_deref(), Some("/tmp/cc1"));
        paths.set_ticket_cache(None);
        assert_eq!(paths.ticket_cache(), None);
        assert_eq!(paths.login_cache().as_deref(), Some("/tmp/cc1"));
    }
}
