use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sock_scope::domain::{Direction, SocketDescription};
use sock_scope::host::ModuleHost;
use sock_scope::probe::ProbeSource;
use sock_scope::rewrite::ModuleDef;
use sock_scope::session::{bootstrap, AgentContext};

/// A probe source for a made-up socket class, enough to watch bytes change.
struct NetProbe {
    inits: AtomicUsize,
}

impl NetProbe {
    fn new() -> Arc<Self> {
        Arc::new(NetProbe { inits: AtomicUsize::new(0) })
    }
}

impl ProbeSource for NetProbe {
    fn init(&self, _session: &Arc<sock_scope::session::Session>) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn needs_instrument(&self, identity: &str) -> bool {
        identity.starts_with("net/")
    }

    fn class_new_fields(&self, _identity: &str) -> Vec<String> {
        vec!["long ioStart".to_string()]
    }

    fn pre_code(&self, _method_long_name: &str) -> String {
        "probe_enter();".to_string()
    }

    fn post_code(&self, _method_long_name: &str) -> String {
        "probe_exit();".to_string()
    }
}

fn socket_module_bytes() -> Vec<u8> {
    let def: ModuleDef = serde_json::from_str(
        r#"{
            "name": "net/Socket",
            "kind": "class",
            "methods": [{"long_name": "net/Socket.read(byte[])", "body": "do_read();"}]
        }"#,
    )
    .expect("valid module definition");
    def.to_bytes().expect("serializable module definition")
}

#[test]
fn test_bootstrap_instruments_later_loads() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());
    let probe = NetProbe::new();

    let session = bootstrap(
        "-lport=8080,-mode=o2i,-si=5000",
        &context,
        &host,
        vec![probe.clone() as Arc<dyn ProbeSource>],
    )
    .expect("bootstrap should accept a valid argument string");

    assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
    assert!(!session.config().i2o_enabled);
    assert!(session.config().o2i_enabled);
    assert_eq!(session.config().log_writer_interval, Duration::from_millis(5000));

    // An eligible module loaded after bootstrap comes back rewritten.
    let raw = socket_module_bytes();
    let installed = host.load_module("net/Socket", &raw);
    assert_ne!(installed, raw);
    let rewritten = ModuleDef::from_bytes(&installed).expect("rewritten bytes stay parseable");
    let body = rewritten.methods[0].body.as_deref().unwrap();
    assert!(body.starts_with("probe_enter();"), "got body: {body}");
    assert!(body.ends_with("probe_exit();"), "got body: {body}");
    assert!(rewritten.fields.iter().any(|f| f.name == "ioStart"));

    // An ineligible module passes through byte for byte.
    assert_eq!(host.load_module("util/ArrayList", b"whatever"), b"whatever");

    session.stop();
}

#[test]
fn test_bootstrap_retransforms_already_loaded_modules() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());

    // Simulate the attach case: the module was loaded before the agent.
    let raw = socket_module_bytes();
    host.load_module("net/Socket", &raw);
    host.load_sealed_module("net/CoreChannel", b"sealed-bytes");
    assert_eq!(host.module_bytes("net/Socket").unwrap(), raw);

    let session = bootstrap("", &context, &host, vec![NetProbe::new()])
        .expect("empty argument string is valid");

    let installed = host.module_bytes("net/Socket").unwrap();
    assert_ne!(installed, raw, "already-loaded module should be retransformed");

    // The sealed module refuses retransformation but bootstrap survives.
    assert_eq!(host.module_bytes("net/CoreChannel").unwrap(), b"sealed-bytes");

    session.stop();
}

#[test]
fn test_bootstrap_registers_session_by_uuid() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());

    let session = bootstrap("-id=abc-123,-d", &context, &host, vec![NetProbe::new()])
        .expect("bootstrap should succeed");
    assert_eq!(session.config().uuid, "abc-123");
    assert!(session.config().debug);

    let found = context.session("abc-123").expect("session is registered");
    assert!(Arc::ptr_eq(&found, &session));
    assert!(context.session("missing").is_none());

    session.stop();
}

#[test]
fn test_bootstrap_rejects_bad_arguments() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());

    let result = bootstrap("-si=soon", &context, &host, vec![NetProbe::new()]);
    assert!(result.is_err());
    assert!(context.sessions().is_empty());
}

#[test]
fn test_fatal_config_error_suppresses_summaries() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());

    let session = bootstrap("", &context, &host, vec![NetProbe::new()])
        .expect("bootstrap should succeed");
    assert_eq!(context.summaries().len(), 1);

    // The embedder hits a fatal configuration error and marks the context
    // before terminating; the exit summary must stay suppressed.
    bootstrap("-si=soon", &context, &host, vec![NetProbe::new()])
        .expect_err("bad arguments must fail");
    context.mark_finish_by_error();
    assert!(context.finished_by_error());
    assert!(context.summaries().is_empty());

    session.stop();
}

#[test]
fn test_io_lifecycle_feeds_the_sink() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());
    let session = bootstrap("-lport=8080", &context, &host, vec![NetProbe::new()])
        .expect("bootstrap should succeed");

    let matching = SocketDescription {
        local_port: "8080".to_string(),
        remote_addr: "10.0.0.5".to_string(),
        remote_port: "55123".to_string(),
    };
    let other = SocketDescription {
        local_port: "9090".to_string(),
        remote_addr: "10.0.0.5".to_string(),
        remote_port: "55124".to_string(),
    };

    assert!(session.socket_opened(1, matching));
    assert!(!session.socket_opened(2, other), "filtered socket must not be tracked");
    assert_eq!(session.stats.processed_sockets(), 1);

    session.io_started(1, Direction::I2o);
    session.io_finished(1, Direction::I2o);
    assert_eq!(session.sink(Direction::I2o).unwrap().sample_count(), 1);

    // A completion with no matching start records nothing.
    session.io_finished(1, Direction::O2i);
    assert_eq!(session.sink(Direction::O2i).unwrap().sample_count(), 0);

    // Untracked sockets are ignored everywhere.
    session.io_started(2, Direction::I2o);
    session.io_finished(2, Direction::I2o);
    assert_eq!(session.sink(Direction::I2o).unwrap().sample_count(), 1);

    session.socket_closed(1);
    assert!(session.tracked_socket(1).is_none());

    let summary = session.summary();
    assert!(summary.contains("1 sockets were processed"), "got: {summary}");
    assert!(summary.contains("i2o count=1"), "got: {summary}");

    session.stop();
}

#[test]
fn test_disabled_direction_has_no_sink() {
    let context = AgentContext::new();
    let host = Arc::new(ModuleHost::new());
    let session = bootstrap("-mode=i2o", &context, &host, vec![NetProbe::new()])
        .expect("bootstrap should succeed");

    assert!(session.sink(Direction::I2o).is_some());
    assert!(session.sink(Direction::O2i).is_none());

    session.socket_opened(
        7,
        SocketDescription {
            local_port: "80".to_string(),
            remote_addr: "192.168.1.9".to_string(),
            remote_port: "40000".to_string(),
        },
    );

    // Timestamps for the disabled direction are dropped on the floor.
    session.io_started(7, Direction::O2i);
    session.io_finished(7, Direction::O2i);
    let track = session.tracked_socket(7).expect("socket is tracked");
    assert!(track.end(Direction::O2i, Instant::now()).is_none());

    session.stop();
}
