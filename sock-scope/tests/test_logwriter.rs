use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sock_scope::host::ModuleHost;
use sock_scope::probe::ProbeSource;
use sock_scope::session::{bootstrap, AgentContext, Session};

struct NoopProbe;

impl ProbeSource for NoopProbe {
    fn needs_instrument(&self, _identity: &str) -> bool {
        false
    }
    fn pre_code(&self, _method_long_name: &str) -> String {
        String::new()
    }
    fn post_code(&self, _method_long_name: &str) -> String {
        String::new()
    }
}

fn start_session(arguments: &str) -> Arc<Session> {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());
    bootstrap(arguments, &context, &host, vec![Arc::new(NoopProbe) as Arc<dyn ProbeSource>])
        .expect("bootstrap should succeed")
}

fn report_path(session: &Session, direction: &str) -> PathBuf {
    let config = session.config();
    PathBuf::from(format!("{}.{}.{}.log", config.log_prefix, config.uuid, direction))
}

#[test]
fn test_reports_appear_for_enabled_directions_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    let prefix = dir.path().join("lat");
    let session = start_session(&format!("-lp={},-si=50,-mode=i2o", prefix.display()));

    // A few intervals worth of wall time.
    std::thread::sleep(Duration::from_millis(300));
    session.stop();

    let i2o = report_path(&session, "i2o");
    let contents = std::fs::read_to_string(&i2o)
        .unwrap_or_else(|e| panic!("expected reports at {}: {e}", i2o.display()));
    let first = contents.lines().next().expect("at least one report line");
    // "<epoch millis> count=..."
    let (epoch, summary) = first.split_once(' ').expect("timestamped line");
    epoch.parse::<u64>().expect("leading epoch timestamp");
    assert!(summary.starts_with("count="), "got line: {first}");

    assert!(!report_path(&session, "o2i").exists(), "disabled direction got a report");
}

#[test]
fn test_working_time_of_one_interval_writes_one_report() {
    let dir = tempfile::tempdir().expect("temp dir");
    let prefix = dir.path().join("lat");
    let session = start_session(&format!("-lp={},-si=50,-fin=50", prefix.display()));

    // Long enough that a writer ignoring the window would write several.
    std::thread::sleep(Duration::from_millis(400));
    session.stop();

    for direction in ["i2o", "o2i"] {
        let path = report_path(&session, direction);
        let contents = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("expected one report at {}: {e}", path.display()));
        assert_eq!(contents.lines().count(), 1, "{direction} contents: {contents:?}");
    }
}

#[test]
fn test_start_delay_holds_reports_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    let prefix = dir.path().join("lat");
    let session = start_session(&format!("-lp={},-si=10,-start=60000", prefix.display()));

    std::thread::sleep(Duration::from_millis(100));
    assert!(!report_path(&session, "i2o").exists(), "report written during start delay");

    // Stopping mid-delay returns promptly and still writes nothing.
    session.stop();
    assert!(!report_path(&session, "i2o").exists());
    assert!(!report_path(&session, "o2i").exists());
}
