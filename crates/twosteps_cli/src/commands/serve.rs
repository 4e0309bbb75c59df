//! Serve command implementation.

use twosteps_server::ServerConfig;

/// Runs the HTTP server on a fresh multi-threaded runtime until Ctrl-C.
pub fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(twosteps_server::serve(config))?;
    Ok(())
}
