//! flashdrop - An Ephemeral File-Sharing Storage Engine
//!
//! This is the command-line entry point. It drives a local store directory
//! directly: `put` streams stdin (or a file) into a fresh key, `get`
//! streams a stored payload to stdout, `meta` prints the metadata record,
//! and `sweep` runs one eager expiry pass.

use flashdrop::service::{ExpiryPolicy, ShareService};
use flashdrop::storage::{LocalStorage, Sweep};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// What the invocation asked for.
enum Command {
    Put { file: Option<PathBuf> },
    Get { key: String },
    Meta { key: String },
    Sweep,
}

/// Parsed command line.
struct Config {
    /// Store directory
    dir: PathBuf,
    /// Expiry policy string for `put` (default: "never")
    expiry: String,
    /// MIME type for `put`
    mime: Option<String>,
    command: Command,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let mut dir = PathBuf::from(flashdrop::DEFAULT_STORE_DIR);
        let mut expiry = "never".to_string();
        let mut mime = None;
        let mut command = None;
        let mut positional = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--dir" | "-d" => {
                    if i + 1 < args.len() {
                        dir = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --dir requires a value");
                        std::process::exit(1);
                    }
                }
                "--expiry" | "-e" => {
                    if i + 1 < args.len() {
                        expiry = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --expiry requires a value");
                        std::process::exit(1);
                    }
                }
                "--mime" | "-m" => {
                    if i + 1 < args.len() {
                        mime = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        eprintln!("Error: --mime requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flashdrop version {}", flashdrop::VERSION);
                    std::process::exit(0);
                }
                "put" | "get" | "meta" | "sweep" if command.is_none() => {
                    command = Some(args[i].clone());
                    i += 1;
                }
                arg if !arg.starts_with('-') => {
                    positional.push(arg.to_string());
                    i += 1;
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        let command = match command.as_deref() {
            Some("put") => Command::Put {
                file: positional.first().map(PathBuf::from),
            },
            Some("get") => Command::Get {
                key: require_key(&positional),
            },
            Some("meta") => Command::Meta {
                key: require_key(&positional),
            },
            Some("sweep") => Command::Sweep,
            _ => {
                print_help();
                std::process::exit(1);
            }
        };

        Self {
            dir,
            expiry,
            mime,
            command,
        }
    }
}

fn require_key(positional: &[String]) -> String {
    match positional.first() {
        Some(key) => key.clone(),
        None => {
            eprintln!("Error: missing <key> argument");
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
flashdrop - An Ephemeral File-Sharing Storage Engine

USAGE:
    flashdrop [OPTIONS] <COMMAND>

COMMANDS:
    put [FILE]     Store a payload (FILE or stdin), print its key
    get <KEY>      Stream a stored payload to stdout
    meta <KEY>     Print the metadata record for a key as JSON
    sweep          Run one eager expiry pass and print what it removed

OPTIONS:
    -d, --dir <DIR>        Store directory (default: drops)
    -e, --expiry <EXPIRY>  Expiry for put: "never" or a duration in
                           [1m, 365d], e.g. 90s, 5m, 12h, 7d (default: never)
    -m, --mime <TYPE>      MIME type for put (default: text/plain)
    -v, --version          Print version information
        --help             Print this help message

EXAMPLES:
    echo hello | flashdrop put --expiry 1h
    flashdrop put report.pdf --mime application/pdf --expiry 7d
    flashdrop get lozuvakemirodatupesy > report.pdf
    flashdrop meta lozuvakemirodatupesy
    flashdrop sweep
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Log to stderr so payloads on stdout stay clean.
    FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let store = Arc::new(LocalStorage::open(&config.dir).await?);
    let service = ShareService::new(Arc::clone(&store));

    match config.command {
        Command::Put { file } => {
            let policy: ExpiryPolicy = config.expiry.parse()?;

            let mut reader: Box<dyn AsyncRead + Send + Unpin> = match file {
                Some(path) => Box::new(tokio::fs::File::open(path).await?),
                None => Box::new(tokio::io::stdin()),
            };

            let (key, meta) = service
                .upload(policy, config.mime.as_deref(), &mut reader)
                .await?;
            eprintln!("{} bytes stored", meta.file_size);
            println!("{key}");
        }
        Command::Get { key } => {
            let mut stdout = tokio::io::stdout();
            service.fetch_raw(&key, &mut stdout).await?;
        }
        Command::Meta { key } => {
            let meta = service.fetch_metadata(&key).await?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Command::Sweep => {
            let stats = store.sweep_expired().await?;
            println!(
                "scanned {} objects, removed {} expired and {} corrupt",
                stats.scanned, stats.expired, stats.corrupt
            );
        }
    }

    Ok(())
}
