use std::env;
use std::path::PathBuf;

use asset_sync::AppConfig;
use asset_sync::cli::Command;

const DEFAULT_MANIFEST: &str = "asset-manifest.json";

struct CliArgs {
    command: Command,
    manifest: PathBuf,
    origin: Option<String>,
    store: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: asset-sync [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  sync                Install the manifest's shell and activate it");
    eprintln!("  get <URL>           Fetch one URL through the cache, body to stdout");
    eprintln!("  offline             Download every resource missing from the cache");
    eprintln!("  status              Compare the cache with the manifest");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --manifest <FILE>   Build manifest (default: {DEFAULT_MANIFEST})");
    eprintln!("  --origin <URL>      Origin resource keys are relative to");
    eprintln!("  --store <DIR>       Cache store directory");
    eprintln!("  --config <FILE>     Configuration file");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG            Log filter (default: info)");
    eprintln!("  STATE_DIRECTORY     Base directory for the default store");
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    eprintln!();
    print_usage();
    std::process::exit(1);
}

fn option_value(args: &[String], i: &mut usize) -> String {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .unwrap_or_else(|| fail(&format!("{flag} requires a value")))
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut positional = Vec::new();
    let mut manifest = PathBuf::from(DEFAULT_MANIFEST);
    let mut origin = None;
    let mut store = None;
    let mut config = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--manifest" => manifest = PathBuf::from(option_value(&args, &mut i)),
            "--origin" => origin = Some(option_value(&args, &mut i)),
            "--store" => store = Some(PathBuf::from(option_value(&args, &mut i))),
            "--config" => config = Some(PathBuf::from(option_value(&args, &mut i))),
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => positional.push(arg.to_string()),
            other => fail(&format!("unknown option: {other}")),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("sync") => Command::Sync,
        Some("get") => Command::Get {
            url: positional
                .next()
                .unwrap_or_else(|| fail("get requires a URL")),
        },
        Some("offline") => Command::Offline,
        Some("status") => Command::Status,
        Some(other) => fail(&format!("unknown command: {other}")),
        None => {
            print_usage();
            std::process::exit(1);
        }
    };
    if let Some(extra) = positional.next() {
        fail(&format!("unexpected argument: {extra}"));
    }

    CliArgs {
        command,
        manifest,
        origin,
        store,
        config,
    }
}

#[tokio::main]
async fn main() -> asset_sync::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(origin) = &args.origin {
        config.sync = config.sync.with_origin(origin);
    }
    if let Some(store) = args.store {
        config.paths.store_dir = store;
    }

    asset_sync::cli::run(config, &args.manifest, args.command).await
}
