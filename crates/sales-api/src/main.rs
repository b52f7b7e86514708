//! sales-api entry point.

use std::path::PathBuf;

use warden_config::ConfigLoader;
use warden_telemetry::init_telemetry;

/// Default configuration file, read when present.
const DEFAULT_CONFIG: &str = "zarf/sales-api.toml";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("sales-api {}", sales_api::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Sales API

USAGE:
    sales-api [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

Without --config, zarf/sales-api.toml is read if it exists.

ENVIRONMENT VARIABLES:
    WARDEN__SERVER__HTTP_ADDR              API listen address (default: 0.0.0.0:3000)
    WARDEN__SERVER__DEBUG_ADDR             Probe listen address (default: 0.0.0.0:4000)
    WARDEN__AUTH__KEYS_DIR                 Directory of <kid>.pem files (default: zarf/keys)
    WARDEN__AUTH__ACTIVE_KID               Key id new tokens are signed with
    WARDEN__TELEMETRY__LOGGING__LEVEL      Log filter (default: info)
    WARDEN__TELEMETRY__LOGGING__FORMAT     json or pretty (default: json)

A .env file in the working directory is loaded first if present.
"
    );
}

fn load_config(args: &Args) -> Result<warden_config::WardenConfig, warden_config::ConfigError> {
    let loader = ConfigLoader::new().with_dotenv()?;
    let loader = match &args.config {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file(DEFAULT_CONFIG)?,
    };
    loader.with_env_prefix("WARDEN").load()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging is not up yet; report config failures on stderr.
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.telemetry.to_telemetry_config()) {
        eprintln!("Failed to initialize telemetry: {e}");
        std::process::exit(1);
    }

    if let Err(e) = sales_api::run(config).await {
        tracing::error!(error = %e, "sales-api failed");
        std::process::exit(1);
    }
}
