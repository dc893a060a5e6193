//! End-to-end runs of the ip-up hook against temporary config and log files

use ppp_split_routes::platform::{PlatformError, RouteOutcome, RoutingManager};
use ppp_split_routes::ppp::{handle_ip_up, run, HookError, HookOutcome, InvocationArgs};
use ppp_split_routes::HookLog;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingManager {
    calls: RefCell<Vec<(String, String)>>,
    failures: HashMap<String, i32>,
}

impl RoutingManager for RecordingManager {
    fn command_line(&self, network: &str, interface: &str) -> String {
        format!("route add -net {} -interface {}", network, interface)
    }

    fn add_network_route(
        &self,
        network: &str,
        interface: &str,
    ) -> Result<RouteOutcome, PlatformError> {
        self.calls
            .borrow_mut()
            .push((network.to_string(), interface.to_string()));
        Ok(RouteOutcome {
            code: self.failures.get(network).copied().unwrap_or(0),
            output: String::new(),
        })
    }
}

#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    config: PathBuf,
    stderr: Captured,
    log: HookLog,
}

impl Fixture {
    fn new(config: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("routes.json");
        if let Some(content) = config {
            fs::write(&config_path, content).unwrap();
        }
        let stderr = Captured::default();
        let log = HookLog::with_stderr(dir.path().join("ppp.ip-up.log"), stderr.clone());
        Self {
            dir,
            config: config_path,
            stderr,
            log,
        }
    }

    fn logged(&self) -> String {
        fs::read_to_string(self.log.path()).unwrap_or_default()
    }
}

fn pppd_args(interface: &str, remote_ip: &str) -> InvocationArgs {
    InvocationArgs::from_args([
        "/etc/ppp/ip-up",
        interface,
        "/dev/ttys001",
        "0",
        "10.8.0.6",
        remote_ip,
        "office",
    ])
}

const ONE_ROUTE: &str = r#"{ "remotes": { "1.2.3.4": ["9.8.7"] } }"#;

#[test]
fn test_configured_remote_gets_route() {
    let mut fx = Fixture::new(Some(ONE_ROUTE));
    let manager = RecordingManager::default();

    let outcome = handle_ip_up(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager)
        .unwrap();

    assert_eq!(outcome, HookOutcome::RoutesAdded(1));
    assert_eq!(
        *manager.calls.borrow(),
        vec![("9.8.7".to_string(), "ppp0".to_string())]
    );

    let logged = fx.logged();
    assert!(logged.starts_with("VPN Connection at "));
    assert!(logged.contains("System arguments:\n\t[0] path to this script: '/etc/ppp/ip-up'\n"));
    assert!(logged.contains("\t[6] pppd ipparam option: 'office'\n"));
    assert!(logged.contains("Configuring routes for 1.2.3.4\n"));
    assert!(logged.contains("Exec: route add -net 9.8.7 -interface ppp0\n"));
    assert!(fx.stderr.text().is_empty());
}

#[test]
fn test_flag_like_ipparam_logged_and_routed() {
    for ipparam in ["-v", "--help", "--config", "--"] {
        let mut fx = Fixture::new(Some(ONE_ROUTE));
        let manager = RecordingManager::default();
        let args = InvocationArgs::from_args([
            "/etc/ppp/ip-up",
            "ppp0",
            "/dev/ttys001",
            "0",
            "10.8.0.6",
            "1.2.3.4",
            ipparam,
        ]);

        let code = run(&args, &fx.config, &mut fx.log, &manager);

        assert_eq!(code, 0, "ipparam {}", ipparam);
        assert_eq!(manager.calls.borrow().len(), 1);
        assert!(fx
            .logged()
            .contains(&format!("\t[6] pppd ipparam option: '{}'\n", ipparam)));
    }
}

#[test]
fn test_unknown_remote_is_not_an_error() {
    let mut fx = Fixture::new(Some(ONE_ROUTE));
    let manager = RecordingManager::default();

    let code = run(&pppd_args("ppp0", "5.6.7.8"), &fx.config, &mut fx.log, &manager);

    assert_eq!(code, 0);
    assert!(manager.calls.borrow().is_empty());
    assert!(fx
        .logged()
        .contains("Notice: No routes configured for remote 5.6.7.8\n"));
}

#[test]
fn test_missing_config_exits_1() {
    let mut fx = Fixture::new(None);
    let manager = RecordingManager::default();

    let result = handle_ip_up(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert!(matches!(result, Err(HookError::ConfigUnavailable(_))));
    assert_eq!(result.unwrap_err().exit_code(), 1);
    assert!(manager.calls.borrow().is_empty());

    // The invocation is on record even though nothing else happened
    let logged = fx.logged();
    assert!(logged.contains("System arguments:"));
    assert!(logged.contains("Warning: No config data found in "));
    assert!(fx.stderr.text().contains("or file is not readable"));
}

#[test]
fn test_empty_config_exits_1() {
    let mut fx = Fixture::new(Some(""));
    let manager = RecordingManager::default();

    let code = run(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert_eq!(code, 1);
    assert!(manager.calls.borrow().is_empty());
}

#[test]
fn test_invalid_json_exits_1_with_warning() {
    let mut fx = Fixture::new(Some("{ \"remotes\": { \"1.2.3.4\": [\"9.8.7\" }"));
    let manager = RecordingManager::default();

    let code = run(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert_eq!(code, 1);
    assert!(manager.calls.borrow().is_empty());
    assert!(fx.stderr.text().contains("Warning: Cannot parse json data in "));
    assert!(fx.logged().contains("Warning: Cannot parse json data in "));
}

#[test]
fn test_failure_stops_remaining_routes() {
    let config = r#"{ "remotes": { "1.2.3.4": ["10.1", "10.2", "10.3", "10.4", "10.5"] } }"#;
    let mut fx = Fixture::new(Some(config));
    let manager = RecordingManager {
        failures: HashMap::from([("10.3".to_string(), 65)]),
        ..Default::default()
    };

    let code = run(&pppd_args("ppp2", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert_eq!(code, 65);
    let called: Vec<String> = manager.calls.borrow().iter().map(|c| c.0.clone()).collect();
    assert_eq!(called, vec!["10.1", "10.2", "10.3"]);
    assert!(fx.stderr.text().contains("ERROR: ABORT: route add failed"));
}

#[test]
fn test_commented_config() {
    let config = "// split tunnel routes\n{ \"remotes\": {\n    \"1.2.3.4\": [\n        \"9.8.7\", // lab\n        \"9.8.6\"  // office\n    ]\n}}\n";
    let mut fx = Fixture::new(Some(config));
    let manager = RecordingManager::default();

    let outcome = handle_ip_up(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager)
        .unwrap();

    assert_eq!(outcome, HookOutcome::RoutesAdded(2));
}

#[test]
fn test_remotes_not_an_object() {
    let mut fx = Fixture::new(Some(r#"{ "remotes": ["1.2.3.4"] }"#));
    let manager = RecordingManager::default();

    let code = run(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert_eq!(code, 0);
    assert!(manager.calls.borrow().is_empty());
    assert!(fx
        .stderr
        .text()
        .contains("Invalid remotes value in routes.json, expected an object, found array"));
}

#[test]
fn test_invalid_entry_for_remote() {
    let mut fx = Fixture::new(Some(r#"{ "remotes": { "1.2.3.4": { "net": "9.8.7" } } }"#));
    let manager = RecordingManager::default();

    let result = handle_ip_up(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

    assert_eq!(result.unwrap(), HookOutcome::NotConfigured);
    assert!(fx
        .stderr
        .text()
        .contains("Invalid routes for remote 1.2.3.4, expected an array, found object"));
}

#[test]
fn test_unwritable_log_still_routes() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("routes.json");
    fs::write(&config, ONE_ROUTE).unwrap();
    let stderr = Captured::default();
    let mut log = HookLog::with_stderr(dir.path().join("no-such-dir").join("x.log"), stderr.clone());
    let manager = RecordingManager::default();

    let code = run(&pppd_args("ppp0", "1.2.3.4"), &config, &mut log, &manager);

    assert_eq!(code, 0);
    assert_eq!(manager.calls.borrow().len(), 1);
    assert_eq!(stderr.text().matches("Cannot open log file").count(), 1);
}

#[cfg(unix)]
mod route_command {
    use super::*;
    use ppp_split_routes::platform::mac::MacRoutingManager;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Write a stand-in for route(8) that records its argv, one per line,
    /// followed by a `--` separator. Networks starting with `fail` exit 42.
    fn fake_route(dir: &Path) -> (PathBuf, PathBuf) {
        let script = dir.join("route");
        let record = dir.join("argv.txt");
        let body = format!(
            "#!/bin/sh\n\
             printf '%s\\n' \"$@\" >> '{record}'\n\
             echo -- >> '{record}'\n\
             echo \"adding $3\"\n\
             echo \"route: note about $3\" >&2\n\
             case \"$3\" in fail*) exit 42 ;; esac\n\
             exit 0\n",
            record = record.display()
        );
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (script, record)
    }

    fn recorded_calls(record: &Path) -> Vec<Vec<String>> {
        let text = fs::read_to_string(record).unwrap_or_default();
        text.split("--\n")
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| chunk.lines().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_route_command_arguments_and_output() {
        let dir = TempDir::new().unwrap();
        let (script, record) = fake_route(dir.path());
        let manager = MacRoutingManager::with_program(&script);

        let outcome = manager.add_network_route("9.8.7", "ppp0").unwrap();

        assert!(outcome.success());
        assert!(outcome.output.contains("adding 9.8.7\n"));
        assert!(outcome.output.contains("route: note about 9.8.7\n"));
        assert_eq!(
            recorded_calls(&record),
            vec![vec!["add", "-net", "9.8.7", "-interface", "ppp0"]]
        );
    }

    #[test]
    fn test_route_command_inherits_only_stdio() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("route");
        // Report every descriptor above stderr that the child can duplicate.
        // sh keeps its own script descriptor at 10 or above.
        fs::write(
            &script,
            "#!/bin/sh\n\
             for fd in 3 4 5 6 7 8 9; do\n\
             if (exec 2>/dev/null; : >&$fd); then echo \"open $fd\"; fi\n\
             done\n\
             exit 0\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let manager = MacRoutingManager::with_program(&script);

        let outcome = manager.add_network_route("9.8.7", "ppp0").unwrap();

        assert!(outcome.success());
        assert!(
            !outcome.output.contains("open "),
            "leaked descriptors: {}",
            outcome.output
        );
    }

    #[test]
    fn test_route_command_failure_status() {
        let dir = TempDir::new().unwrap();
        let (script, _) = fake_route(dir.path());
        let manager = MacRoutingManager::with_program(&script);

        let outcome = manager.add_network_route("fail.1", "ppp0").unwrap();
        assert_eq!(outcome.code, 42);
    }

    #[test]
    fn test_metacharacters_stay_single_arguments() {
        let dir = TempDir::new().unwrap();
        let (script, record) = fake_route(dir.path());
        let manager = MacRoutingManager::with_program(&script);
        let marker = dir.path().join("pwned");
        let network = format!("9.8.7; touch {}", marker.display());
        let interface = format!("ppp0 $(touch {})", marker.display());

        manager.add_network_route(&network, &interface).unwrap();

        assert!(!marker.exists());
        assert_eq!(
            recorded_calls(&record),
            vec![vec![
                "add".to_string(),
                "-net".to_string(),
                network.clone(),
                "-interface".to_string(),
                interface.clone(),
            ]]
        );
    }

    #[test]
    fn test_hook_with_real_command() {
        let config = r#"{ "remotes": { "1.2.3.4": ["9.8.7", "fail.2", "9.8.5"] } }"#;
        let mut fx = Fixture::new(Some(config));
        let (script, record) = fake_route(fx.dir.path());
        let manager = MacRoutingManager::with_program(&script);

        let code = run(&pppd_args("ppp0", "1.2.3.4"), &fx.config, &mut fx.log, &manager);

        assert_eq!(code, 42);
        let calls = recorded_calls(&record);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1][2], "fail.2");

        let logged = fx.logged();
        assert!(logged.contains(&format!(
            "Exec: {} add -net '9.8.7' -interface 'ppp0'\n",
            script.display()
        )));
        assert!(logged.contains("adding 9.8.7\n"));
        assert!(logged.contains("route: note about fail.2\n"));
        assert!(!logged.contains("9.8.5"));
    }
}
