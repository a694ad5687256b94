use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use std::sync::Arc;

use deviceid::{DeviceIdConfig, DeviceIdManager, Platform, ShellExecutor};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
struct Opts {
    config: Option<PathBuf>,
    json: bool,
    platform: Option<Platform>,
}

fn default_config_path() -> Option<PathBuf> {
    env::var("DEVICEID_CONFIG").ok().map(PathBuf::from)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DEVICEID_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_help() {
    eprintln!(
        "deviceid - stable device identifier\n\n\
         Usage:\n  \
         deviceid [id] [OPTIONS]\n  \
         deviceid components [OPTIONS]\n  \
         deviceid validate <id> [OPTIONS]\n  \
         deviceid config\n\n\
         Options:\n  \
         --config <path>      settings file\n  \
         --json               machine-readable output\n  \
         --platform <name>    windows, linux, macos or other (default: host)\n\n\
         Environment:\n  \
         DEVICEID_CONFIG  default for --config\n  \
         DEVICEID_LOG     log filter (default: warn)\n"
    );
}

fn parse_flags(args: &[String]) -> Result<Opts, String> {
    let mut opts = Opts {
        config: default_config_path(),
        json: false,
        platform: None,
    };
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --config".to_string());
                }
                opts.config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--platform" => {
                let Some(name) = args.get(i + 1) else {
                    return Err("missing value for --platform".to_string());
                };
                let platform =
                    Platform::parse(name).ok_or_else(|| format!("unknown platform: {name}"))?;
                opts.platform = Some(platform);
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn load_manager(opts: &Opts) -> Result<DeviceIdManager, String> {
    let config = match &opts.config {
        Some(path) => DeviceIdConfig::from_file(path)
            .map_err(|e| format!("failed to load {}: {e}", path.display()))?,
        None => DeviceIdConfig::default(),
    };
    Ok(match opts.platform {
        Some(platform) => {
            config.into_manager_for(platform, Arc::new(ShellExecutor::for_platform(platform)))
        }
        None => config.into_manager(),
    })
}

fn run_id(args: &[String]) -> Result<(), String> {
    let opts = parse_flags(args)?;
    let manager = load_manager(&opts)?;
    let (version, id) = manager
        .device_id_with_version()
        .ok_or_else(|| "no signal available to build a device id".to_string())?;

    if opts.json {
        let platform = opts.platform.unwrap_or_else(Platform::current);
        println!(
            "{}",
            json!({ "version": version, "device_id": id, "platform": platform.as_str() })
        );
    } else {
        println!("{id}");
    }
    Ok(())
}

fn run_components(args: &[String]) -> Result<(), String> {
    let opts = parse_flags(args)?;
    let manager = load_manager(&opts)?;
    let mut report = Vec::new();

    for version in manager.versions() {
        let Some(builder) = manager.builder(version) else {
            continue;
        };
        let values = builder.evaluate();
        if opts.json {
            report.push(json!({ "version": version, "components": values }));
        } else {
            println!("v{version}");
            for v in &values {
                let shown = if v.is_empty() { "-" } else { v.value.as_str() };
                println!("  {:<28} {}", v.name, shown);
            }
        }
    }

    if opts.json {
        println!("{}", serde_json::Value::Array(report));
    }
    Ok(())
}

fn run_validate(args: &[String]) -> Result<(), String> {
    let Some(id) = args.first() else {
        return Err("validate requires <id>".to_string());
    };
    let opts = parse_flags(&args[1..])?;
    let manager = load_manager(&opts)?;
    let version = manager.validate(id);

    if opts.json {
        println!("{}", json!({ "valid": version.is_some(), "version": version }));
    } else {
        match version {
            Some(v) => println!("valid (v{v})"),
            None => println!("invalid"),
        }
    }
    if version.is_some() {
        Ok(())
    } else {
        Err("device id does not match this host".to_string())
    }
}

fn run_config() -> Result<(), String> {
    let text = DeviceIdConfig::default()
        .to_json()
        .map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();

    let res = match args.first().map(String::as_str) {
        None => run_id(&[]),
        Some("-h" | "--help" | "help") => {
            print_help();
            return;
        }
        Some(flag) if flag.starts_with("--") => run_id(&args),
        Some("id") => run_id(&args[1..]),
        Some("components") => run_components(&args[1..]),
        Some("validate") => run_validate(&args[1..]),
        Some("config") => run_config(),
        Some(cmd) => {
            print_help();
            Err(format!("unknown command: {cmd}"))
        }
    };

    if let Err(err) = res {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
