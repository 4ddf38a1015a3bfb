//! Model daemon - serves lazily loaded models over RESP

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use modelstore::Manifest;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use modeld::{build_registries, env_filter, parse_model_ref, serve, CommandHandler};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    bind: String,

    /// Model manifest
    #[arg(short, long)]
    manifest: PathBuf,

    /// Capacity of the default cache (number of models)
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    capacity: u64,

    /// Build a model at startup, as `namespace/variant` (repeatable)
    #[arg(short, long)]
    preload: Vec<String>,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives.as_deref()))
        .init();

    let args = Args::parse();

    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    info!("Starting modeld v{}", env!("CARGO_PKG_VERSION"));
    info!("Manifest: {}", args.manifest.display());
    info!("Default cache capacity: {}", args.capacity);

    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let registries = Arc::new(build_registries(&manifest, args.capacity as usize));

    for spec in &args.preload {
        let Some((namespace, variant)) = parse_model_ref(spec) else {
            bail!("invalid --preload '{}', expected namespace/variant", spec);
        };
        let registries = Arc::clone(&registries);
        let (ns, var) = (namespace.to_string(), variant.to_string());
        tokio::task::spawn_blocking(move || match registries.registry(&ns) {
            Some(registry) => registry.preload(&var),
            None => registries.get(&ns, &var).map(|_| ()),
        })
        .await?
        .with_context(|| format!("preloading {}", spec))?;
    }

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!("Server listening on {}", args.bind);

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║          modeld ready                                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("   Connection String: redis://{}", args.bind);
    println!("   Namespaces:        {}", registries.namespaces().collect::<Vec<_>>().join(", "));
    println!("   Try:               redis-cli -u redis://{} LOAD <namespace> <variant>", args.bind);
    println!("\n🛑 Press Ctrl+C to stop\n");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    serve(listener, CommandHandler::new(registries), shutdown).await
}
