//! LWM2M bootstrap/registration CLI.
//!
//! # Commands
//!
//! Runs a single bootstrap or registration round-trip against a CoAP/DTLS
//! server and exits; see `--mode`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use lwm2m_client::cert::TlsCertPair;
use lwm2m_client::config::{Config, StoreBackend};
use lwm2m_client::device::Device;
use lwm2m_client::session::{bootstrap::bootstrap, register::register};
use lwm2m_client::store::{BlobStore, FilesystemStore, MemoryStore};

#[derive(Parser)]
#[command(name = "lwm2m-client")]
#[command(about = "LWM2M bootstrap/registration client over CoAP-over-DTLS", long_about = None)]
struct Cli {
    /// Bootstrap or LWM2M URL (`coaps://host:port?aid=...`).
    #[arg(long)]
    coap_url: String,

    /// Path to a DER or PEM certificate.
    #[arg(long)]
    coap_cert: PathBuf,

    /// Path to a DER or PEM PKCS#8 private key.
    #[arg(long)]
    coap_key: PathBuf,

    /// Which credential round to run.
    #[arg(long, value_enum)]
    mode: Mode,

    /// Blob store backend.
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreBackend,

    /// Directory root for the filesystem store.
    #[arg(long)]
    store_filesystem_dir: Option<PathBuf>,

    /// Optional TOML config file, layered under environment and CLI
    /// overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional path to write the post-bootstrap certificate, PEM-encoded.
    #[arg(long)]
    dump_cert: Option<PathBuf>,

    /// Optional path to write the post-bootstrap private key, PEM-encoded.
    #[arg(long)]
    dump_key: Option<PathBuf>,

    /// Log level (passed to `RUST_LOG` if that variable is unset).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Bootstrap,
    Lwm2m,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut config = file_config.merge(Config::from_env());
    config.store.backend = cli.store;
    if let Some(dir) = cli.store_filesystem_dir.clone() {
        config.store.filesystem_dir = dir;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn BlobStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Filesystem => Arc::new(FilesystemStore::new(config.store.filesystem_dir)?),
    };

    match cli.mode {
        Mode::Bootstrap => {
            let mut device = Device::from_bootstrap_credentials(
                store,
                &cli.coap_url,
                &cli.coap_cert,
                &cli.coap_key,
            )?;

            tracing::info!(account_id = %device.account_id, "starting bootstrap");
            bootstrap(&mut device, CancellationToken::new()).await?;
            tracing::info!(endpoint_name = ?device.endpoint_name, "bootstrap finished");

            if let (Some(cert_path), Some(key_path)) = (&cli.dump_cert, &cli.dump_key) {
                dump_credentials(device.lwm2m_cert.as_ref().expect("register-ready"), cert_path, key_path)?;
            }
        }
        Mode::Lwm2m => {
            let device = Device::from_lwm2m_credentials(
                store,
                &cli.coap_url,
                &cli.coap_cert,
                &cli.coap_key,
            )?;

            tracing::info!(endpoint_name = ?device.endpoint_name, "starting registration");
            register(&device).await?;
            tracing::info!("registration finished");
        }
    }

    Ok(())
}

fn dump_credentials(cert: &TlsCertPair, cert_path: &PathBuf, key_path: &PathBuf) -> anyhow::Result<()> {
    let mut cert_file = std::fs::File::create(cert_path)?;
    write_pem(&mut cert_file, "CERTIFICATE", &cert.cert_der)?;

    let mut key_file = std::fs::File::create(key_path)?;
    write_pem(&mut key_file, "PRIVATE KEY", &cert.key_der)?;

    Ok(())
}

fn write_pem(file: &mut std::fs::File, tag: &str, der: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let encoded = base64_encode(der);
    writeln!(file, "-----BEGIN {tag}-----")?;
    for chunk in encoded.as_bytes().chunks(64) {
        file.write_all(chunk)?;
        file.write_all(b"\n")?;
    }
    writeln!(file, "-----END {tag}-----")?;
    Ok(())
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
