use chrono::Utc;
use timeguard::access_log::{log_access, AccessLog};
use timeguard::settings::{ClockTime, RehabMode, Settings};
use timeguard::{Decision, Gatekeeper, Navigation, SqliteStore, TabId};
use url::Url;

#[test]
fn settings_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeguard.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        let mut settings = Settings::default();
        settings.add_site("reddit.com").unwrap();
        settings.add_site("https://www.youtube.com/feed").unwrap();
        settings.delay_seconds = 90;
        settings.rehab_mode = RehabMode {
            enabled: true,
            start_time: ClockTime::new(21, 0).unwrap(),
            end_time: ClockTime::new(6, 0).unwrap(),
        };
        settings.save(&store).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let settings = Settings::load(&store);
    assert_eq!(settings.blocked_sites, vec!["reddit.com", "youtube.com"]);
    assert_eq!(settings.delay_seconds, 90);
    assert!(settings.rehab_mode.enabled);
    assert_eq!(settings.rehab_mode.end_time.to_string(), "06:00");
}

#[test]
fn fresh_database_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("empty.db")).unwrap();

    assert_eq!(Settings::load(&store), Settings::default());
    assert_eq!(AccessLog::load(&store).unwrap(), AccessLog::default());
}

#[test]
fn gatekeeper_reads_block_list_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeguard.db");
    let store = SqliteStore::open(&path).unwrap();

    let mut settings = Settings::default();
    settings.add_site("reddit.com").unwrap();
    settings.save(&store).unwrap();

    let mut gate = Gatekeeper::new(store, Url::parse("chrome-extension://timeguard/").unwrap());
    let nav = Navigation::main_frame(TabId(1), "https://reddit.com/");
    assert!(gate.before_navigate(&nav).is_redirect());

    let mut settings = Settings::load(gate.store());
    settings.remove_site("reddit.com").unwrap();
    settings.save(gate.store()).unwrap();
    assert_eq!(gate.before_navigate(&nav), Decision::Allow);
}

#[test]
fn access_log_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeguard.db");
    let now = Utc::now();

    {
        let store = SqliteStore::open(&path).unwrap();
        log_access(&store, "reddit.com", now).unwrap();
        log_access(&store, "reddit.com", now).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let log = AccessLog::load(&store).unwrap();
    assert_eq!(log.recent_visits("www.reddit.com", now), 2);
}
