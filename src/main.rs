use clap::{Parser, Subcommand};
use sleeve::batch::{self, BatchOptions};
use sleeve::config::{self, Config};
use sleeve::serve::{self, CacheMode, ServeOptions};
use sleeve::sizes::SizePolicy;
use sleeve::{clean, output, scan};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sleeve")]
#[command(about = "Cover-art derivatives for a static record collection")]
#[command(long_about = "\
Cover-art derivatives for a static record collection

Every album and artist directory holds one source image. Sleeve makes the
square resized copies the site asks for, either on demand from a development
server or ahead of time for static hosting.

Collection structure:

  public/
  ├── album/
  │   └── kind-of-blue-1959/
  │       ├── kind-of-blue-1959-hi-res.jpg   # Source image
  │       ├── kind-of-blue-1959-medium.jpg   # Derived (800×800)
  │       └── kind-of-blue-1959.json         # Metadata (ignored)
  └── artist/
      └── miles-davis/
          └── miles-davis-hi-res.jpg

Derived images are requested as /{album|artist}/{slug}/{slug}-{size}.jpg.

Run 'sleeve gen-config' to generate a documented sleeve.toml.")]
#[command(version)]
struct Cli {
    /// Collection root (overrides `root` in the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file [default: sleeve.toml, optional]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging; `clean` also lists every file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the development server with on-demand derived images
    Serve(ServeArgs),
    /// Write derived images for every entity
    Derive(DeriveArgs),
    /// Delete derived images, keeping sources and metadata
    Clean(CleanArgs),
    /// Validate config and report on the collection without writing anything
    Check,
    /// Print a stock sleeve.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
    /// Interface to bind
    #[arg(long)]
    interface: Option<IpAddr>,
    /// Send long-lived immutable Cache-Control headers
    #[arg(long)]
    production: bool,
}

#[derive(clap::Args)]
struct DeriveArgs {
    /// Write into this directory instead of in place (always regenerates)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Regenerate in place even when outputs are up to date
    #[arg(long)]
    force: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct CleanArgs {
    /// Report what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Cli {
        root,
        config: config_path,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let resolve = || setup(root.as_deref(), config_path.as_deref());

    match command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve(args) => {
            let (config, policy, root) = resolve()?;
            let options = ServeOptions {
                interface: args.interface.unwrap_or(config.serve.interface),
                port: args.port.unwrap_or(config.serve.port),
                cache: if args.production {
                    CacheMode::Production
                } else {
                    config.serve.cache
                },
                static_files: config.serve.static_files,
                threads: config::effective_threads(&config.processing),
            };
            serve::serve(&root, policy, &options)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Derive(args) => {
            let (config, policy, root) = resolve()?;
            init_thread_pool(&config.processing);
            let options = BatchOptions {
                output: args.output,
                force: args.force,
            };

            let summary = if args.json {
                batch::derive_all(&root, &policy, &options, None)?
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_batch_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let summary = batch::derive_all(&root, &policy, &options, Some(tx));
                if printer.join().is_err() {
                    warn!("progress printer panicked");
                }
                summary?
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_batch_summary(&summary);
            }
            Ok(exit_code(summary.is_success()))
        }
        Command::Clean(args) => {
            let (_, policy, root) = resolve()?;
            let summary = clean::clean(&root, &policy, args.dry_run)?;
            output::print_clean_summary(&summary, &root, verbose);
            Ok(exit_code(summary.is_success()))
        }
        Command::Check => {
            let (_, policy, root) = resolve()?;
            info!(root = %root.display(), "checking collection");
            let entities = scan::scan(&root)?;
            output::print_check_report(&entities, &root, &policy);
            println!("==> Collection is valid");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// INFO by default, DEBUG with `--verbose`; `RUST_LOG` wins when set.
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load config and resolve the size policy and collection root.
fn setup(
    root: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(Config, SizePolicy, PathBuf), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let policy = config.policy()?;
    let root = root.map_or_else(|| config.root.clone(), Path::to_path_buf);
    Ok((config, policy, root))
}

/// An explicitly named config file must exist; the default one is optional.
fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    match path {
        Some(path) => config::load_required_config(path),
        None => config::load_config(Path::new(config::DEFAULT_CONFIG_FILE)),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
