//! # lineseek CLI
//!
//! ## Usage
//!
//! ```bash
//! lineseek [--settings ./lineseek.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lineseek serve` | Start the lookup server (runs until Ctrl-C) |
//! | `lineseek query "<text>"` | Send one query and print the response |
//!
//! ## Examples
//!
//! ```bash
//! # Re-read the data file on every request
//! lineseek serve --lookup-config ./config.txt
//!
//! # Load the data file once, serve from memory
//! lineseek serve --policy cached --port 9000
//!
//! # Query over TLS
//! lineseek query "banana" --addr localhost:8000 --tls --ca ./certs/ca.pem
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lineseek::client::{self, ClientTls};
use lineseek::config::{self, Policy, Settings};
use lineseek::{logging, server};

/// lineseek: answers whether an exact line exists in a reference text file.
#[derive(Parser)]
#[command(name = "lineseek", version)]
struct Cli {
    /// Path to the server settings file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the lookup server.
    ///
    /// Flags override the matching fields of the settings file.
    Serve {
        /// Listening address.
        #[arg(long)]
        bind: Option<String>,

        /// Listening port.
        #[arg(long)]
        port: Option<u16>,

        /// Lookup config declaring `linuxpath=` and `ENABLE_SSL=`.
        #[arg(long)]
        lookup_config: Option<PathBuf>,

        /// Search policy.
        #[arg(long, value_enum)]
        policy: Option<Policy>,

        /// PEM certificate chain used when TLS is enabled.
        #[arg(long, requires = "key")]
        cert: Option<PathBuf>,

        /// PEM private key used when TLS is enabled.
        #[arg(long, requires = "cert")]
        key: Option<PathBuf>,

        /// Maximum concurrent connections (0 = unbounded).
        #[arg(long)]
        max_connections: Option<usize>,
    },

    /// Send one query and print the server's response.
    Query {
        /// The line to look up.
        text: String,

        /// Server address.
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,

        /// Negotiate TLS before sending.
        #[arg(long, requires = "ca")]
        tls: bool,

        /// CA certificate (PEM) that signed the server certificate.
        #[arg(long)]
        ca: Option<PathBuf>,

        /// Name expected on the server certificate.
        #[arg(long, default_value = "localhost")]
        server_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level)?;

    let mut settings = match &cli.settings {
        Some(path) => config::load_settings(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Serve {
            bind,
            port,
            lookup_config,
            policy,
            cert,
            key,
            max_connections,
        } => {
            if let Some(bind) = bind {
                settings.server.bind = bind;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(path) = lookup_config {
                settings.search.lookup_config = path;
            }
            if let Some(policy) = policy {
                settings.search.policy = policy;
            }
            if cert.is_some() {
                settings.tls.cert = cert;
                settings.tls.key = key;
            }
            if let Some(n) = max_connections {
                settings.server.max_connections = n;
            }
            server::run_server(&settings).await?;
        }
        Commands::Query {
            text,
            addr,
            tls,
            ca,
            server_name,
        } => {
            let tls = match (tls, ca) {
                (true, Some(ca)) => Some(ClientTls { ca, server_name }),
                _ => None,
            };
            let reply = client::send_query(&addr, &text, tls.as_ref()).await?;
            print!("{}", reply);
        }
    }

    Ok(())
}
