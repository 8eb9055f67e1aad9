//! Tail a log stream from an Arrow Flight endpoint and print each view as a
//! JSON line.
//!
//! ```text
//! RUST_LOG=livetail_client=debug cargo run --example tail -- --stream app-logs --port 8815
//! ```

use clap::Parser;
use livetail_client::{FlightTransport, SessionController, SessionStatus};

#[derive(Parser, Debug)]
#[command(name = "tail", about = "Live-tail a log stream")]
struct Args {
    /// Flight server host
    #[arg(long, env = "LIVETAIL_HOST", default_value = "localhost")]
    host: String,

    /// Flight server port
    #[arg(long, env = "LIVETAIL_PORT")]
    port: u16,

    /// Log stream to tail
    #[arg(long)]
    stream: String,

    /// Rows kept in the window
    #[arg(long, default_value_t = 100)]
    capacity: usize,

    /// Only print rows containing this text
    #[arg(long, default_value = "")]
    query: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,livetail_client=debug".into()),
        )
        .init();

    let args = Args::parse();

    let session = SessionController::builder()
        .host(args.host)
        .capacity(args.capacity)
        .build(FlightTransport::new());
    session.set_search_query(&args.query);

    let mut updates = session.updates();
    session.start(&args.stream, args.port).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.abort();
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = session.view();
                println!("{}", serde_json::to_string(&view)?);
                if !view.status.is_active() {
                    break;
                }
            }
        }
    }

    if session.status() == SessionStatus::Errored {
        std::process::exit(1);
    }
    Ok(())
}
