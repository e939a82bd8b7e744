mod common;

use std::{path::PathBuf, sync::Arc};

use binrw::BinRead;
use common::{MockEngine, init_tracing, quiet_settings};
use gss_mediator::{
    cache::{
        self, CachePaths, CacheTime,
        ccache::{CacheFile, ETYPE_AES128_CTS_HMAC_SHA1_96, NT_PRINCIPAL, Principal},
    },
    login::{ControlFlag, LoginConfiguration, LoginModuleEntry, StaticConfiguration, TICKET_CACHE_OPTION},
    provider::Provider,
    registry::MechanismRegistry,
    settings::Platform,
};

fn read_cache(path: &std::path::Path) -> CacheFile {
    let bytes = std::fs::read(path).unwrap();
    CacheFile::read(&mut std::io::Cursor::new(bytes)).unwrap()
}

#[test]
fn fake_cache_at_configured_location() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cc_decoy");
    let location = format!("FILE:{}", path.display());
    let provider = Provider::new(
        Arc::new(MechanismRegistry::with_platform_defaults()),
        quiet_settings().ticket_cache(location.clone()).fake_cache(true),
        MockEngine::new_ok,
    );
    let configuration = provider.login_configuration(StaticConfiguration::new().with_entry(
        "client",
        LoginModuleEntry::new("Krb5LoginModule", ControlFlag::Required),
    ));

    let before = CacheTime::now().unwrap();
    provider.install().unwrap();

    let file = read_cache(&path);
    assert_eq!(file.default_principal, Principal::new(NT_PRINCIPAL, "EXAMPLE.ORG", &["alice"]));
    let credential = &file.credentials[0];
    assert_eq!(credential.key.enctype, ETYPE_AES128_CTS_HMAC_SHA1_96);
    assert!(credential.times.starttime >= before.as_secs());
    assert!(credential.times.endtime > credential.times.starttime);

    // the mechanism must not read the decoy
    assert_eq!(provider.paths().ticket_cache(), None);
    assert_eq!(provider.paths().login_cache(), Some(location.clone()));
    assert_eq!(
        configuration.entries("client").unwrap()[0].options[TICKET_CACHE_OPTION],
        location
    );
}

#[cfg(unix)]
#[test]
fn fake_cache_mode_is_applied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cc_mode");
    let paths = CachePaths::new(Some(path.display().to_string()));
    let settings = quiet_settings().fake_cache(true).fake_cache_mode(0o640);
    cache::prepare_login_cache(&settings, &paths).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
}

#[test]
fn real_file_cache_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cc_real");
    std::fs::write(&path, b"real tickets").unwrap();
    let paths = CachePaths::new(Some(path.display().to_string()));

    let login = cache::prepare_login_cache(&quiet_settings(), &paths).unwrap();
    assert_eq!(login.path(), Some(path.display().to_string().as_str()));
    assert!(!login.is_temporary());
    assert_eq!(std::fs::read(&path).unwrap(), b"real tickets");
    assert_eq!(paths.ticket_cache(), Some(path.display().to_string()));
}

#[test]
fn in_memory_cache_gets_temporary_decoy() {
    init_tracing();
    let provider = Provider::new(
        Arc::new(MechanismRegistry::with_platform_defaults()),
        quiet_settings().ticket_cache("kcm:1000"),
        MockEngine::new_ok,
    );
    provider.install().unwrap();

    let bound = PathBuf::from(provider.paths().login_cache().unwrap());
    let file_name = bound.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("krb5cc_"), "{file_name}");
    assert!(file_name.ends_with("_fake"), "{file_name}");
    assert_eq!(read_cache(&bound).credentials.len(), 1);
    // the real in-memory cache is still what the mechanism uses
    assert_eq!(provider.paths().ticket_cache().as_deref(), Some("kcm:1000"));

    drop(provider);
    assert!(!bound.exists());
}

#[test]
fn unset_location_on_windows_is_in_memory() {
    let paths = CachePaths::new(None);
    let login = cache::prepare_login_cache(&quiet_settings().platform(Platform::Windows), &paths).unwrap();
    assert!(login.is_temporary());
    let path = PathBuf::from(login.path().unwrap());
    assert!(path.exists());
    drop(login);
    assert!(!path.exists());
}

#[test]
fn unknown_realm_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = quiet_settings()
        .krb5_config(dir.path().join("krb5.conf"))
        .ticket_cache(dir.path().join("cc").display().to_string())
        .fake_cache(true);
    settings.realm = None;
    let err = cache::prepare_login_cache(&settings, &CachePaths::new(settings.ticket_cache.clone())).unwrap_err();
    assert!(matches!(err, cache::CacheError::UnknownRealm(_)));

    std::fs::write(
        dir.path().join("krb5.conf"),
        "[libdefaults]\n  default_realm = CONF.ORG\n",
    )
    .unwrap();
    cache::prepare_login_cache(&settings, &CachePaths::new(settings.ticket_cache.clone())).unwrap();
    let file = read_cache(&dir.path().join("cc"));
    assert_eq!(file.default_principal.realm.value, b"CONF.ORG");
}
