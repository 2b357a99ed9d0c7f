use crate::adb::BackendKind;
use crate::config::split_list;
use crate::game_automation::PlaybookKind;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run the playbook on every device
    #[default]
    Run,
    ListDevices,
    Screenshot,
}

/// Command line flags. `None` fields fall back to the environment.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub debug: bool,
    pub playbook: Option<PlaybookKind>,
    pub devices: Option<Vec<String>>,
    pub package: Option<String>,
    pub backend: Option<BackendKind>,
    pub res_dir: Option<PathBuf>,
    pub iterations: Option<u64>,
}

/// What the command line asks for.
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Args(Args),
    Help,
    Version,
}

impl Args {
    /// Parse the process arguments. `Ok(None)` means help or version was
    /// printed and there is nothing left to do.
    pub fn parse() -> Result<Option<Self>, String> {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args)? {
            Parsed::Args(args) => Ok(Some(args)),
            Parsed::Help => {
                print_help();
                Ok(None)
            }
            Parsed::Version => {
                println!("Android ADB Bot v{}", env!("APP_VERSION_DISPLAY"));
                Ok(None)
            }
        }
    }

    pub fn parse_from(args: &[String]) -> Result<Parsed, String> {
        let mut parsed = Args::default();

        for arg in args {
            if arg == "--help" || arg == "-h" {
                return Ok(Parsed::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Parsed::Version);
            } else if arg == "--debug" {
                parsed.debug = true;
            } else if arg == "--list-devices" || arg == "-l" {
                parsed.mode = Mode::ListDevices;
            } else if arg == "--screenshot" || arg == "-s" {
                parsed.mode = Mode::Screenshot;
            } else if let Some(val) = arg.strip_prefix("--playbook=") {
                parsed.playbook = Some(val.parse().map_err(|e| format!("{e}"))?);
            } else if let Some(val) = arg.strip_prefix("--devices=") {
                parsed.devices = Some(split_list(val));
            } else if let Some(val) = arg.strip_prefix("--package=") {
                parsed.package = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--impl=") {
                parsed.backend = Some(val.parse()?);
            } else if let Some(val) = arg.strip_prefix("--res-dir=") {
                parsed.res_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--iterations=") {
                match val.parse::<u64>() {
                    Ok(n) => parsed.iterations = Some(n),
                    Err(_) => return Err(format!("Invalid iterations value: {val}")),
                }
            } else {
                return Err(format!("Unknown argument: {arg}"));
            }
        }

        Ok(Parsed::Args(parsed))
    }
}

pub fn print_help() {
    println!("🤖 Android ADB Bot");
    println!();
    println!("USAGE:");
    println!("    android-adb-bot [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)              Run the playbook on every configured device");
    println!("    --playbook=<name>       basic_play (default), init_game or unlock_phone");
    println!("    --devices=<a,b,..>      Device serials or host:port (default: all attached)");
    println!("    --package=<pkg>         Android package of the app");
    println!("    --impl=<shell|rust>     ADB implementation (default: rust)");
    println!("    --res-dir=<dir>         Reference image directory (default: actions)");
    println!("    --iterations=N          Stop each device after N playbook iterations");
    println!("    --list-devices, -l      List attached devices and exit");
    println!("    --screenshot, -s        Save a screenshot of the first device (cli-screenshot.png)");
    println!("    --debug                 Enable debug logging");
    println!("    --help, -h              Show this help message");
    println!("    --version, -v           Show version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    APP_PACKAGE, IP_LIST, TOOL_TYPE, ADB_IMPL, RES_DIR, MAX_ITERATIONS");
    println!("    Flags take precedence. RUST_LOG overrides the log level.");
    println!();
    println!("EXAMPLES:");
    println!("    android-adb-bot --playbook=init_game --package=com.example.game");
    println!("    android-adb-bot --devices=192.168.1.20:5555 --impl=shell");
    println!("    android-adb-bot --screenshot");
}
