//! Main entry point for the Rust Frag Proxy

use clap::Parser;
use rust_frag_proxy::{
    cli::Cli,
    init_logger_with_config,
    log_info,
    proxy::server::{shutdown_signal, ProxyServer},
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    init_logger_with_config(&config.log_level);

    log_info!("Starting TLS-fragmenting forward proxy");
    if let Some(bind) = config.outbound.bind_addr {
        log_info!("Outgoing connections bound to {}", bind);
    }
    log_info!(
        "Fragmenting tunneled TLS handshakes on ports {:?}",
        config.fragment.ports
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = ProxyServer::bind(&config)?;
        server.serve(shutdown_signal()).await?;
        Ok::<(), anyhow::Error>(())
    })
}
