use ppp_split_routes::log::DEFAULT_PROGRAM_NAME;
use ppp_split_routes::platform::get_routing_manager;
use ppp_split_routes::ppp::{self, InvocationArgs, Settings};
use ppp_split_routes::HookLog;
use std::path::Path;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let invocation = InvocationArgs::from_env();

    // A bad setting must not stop the connection from being logged
    let (settings, settings_error) = match Settings::from_env() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    // pppd throws stdout away; diagnostics go to stderr
    let level = if settings.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let subscriber_error = tracing::subscriber::set_global_default(subscriber).err();

    let program = Path::new(&invocation.script_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string());
    let mut log = HookLog::new(&settings.log_file).with_program(program);
    debug!("logging to {}", log.path().display());

    if let Some(e) = subscriber_error {
        log.warn(format!("Cannot set up diagnostics: {}", e));
    }
    if let Some(e) = settings_error {
        log.warn(format!("Ignoring invalid settings, using defaults: {:?}", e.kind()));
    }

    let code = match get_routing_manager(&settings.route_command) {
        Ok(manager) => ppp::run(&invocation, &settings.config, &mut log, manager.as_ref()),
        Err(e) => {
            log.err(e.to_string());
            1
        }
    };

    std::process::exit(code);
}
