use clap::Parser;
use server::network::ServerNetworkManager;
use server::server_dispatcher::ServerDispatcher;
use std::sync::Arc;

/// Parses command-line arguments, builds the dispatcher and runs the
/// accept loop until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
    }

    env_logger::init();
    let args = Args::parse();

    let dispatcher = Arc::new(ServerDispatcher::new());
    let address = format!("{}:{}", args.host, args.port);
    let manager = ServerNetworkManager::bind(&address, dispatcher).await?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = manager.run().await {
            eprintln!("Server accept loop failed: {}", e);
        }
    });

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                eprintln!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
