use std::env;

use thermite_schedule::{protocol, Result};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let usage = "Usage: thermd\n\nReads codec requests from stdin, one per line:\n  \
                 decode_daily:<12 bytes>\n  encode_daily:<48 slots>\n  \
                 decode_weekly:<int>\n  encode_weekly:<7 slots>";
    if let Some(arg) = env::args().nth(1) {
        eprintln!("{usage}");
        std::process::exit(if arg == "-h" || arg == "--help" { 0 } else { 1 });
    }

    // Logs go to stderr so stdout only carries responses
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("thermite_schedule=warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    // Inform about successful initialization
    stdout.write_all(b"OK\n").await?;
    stdout.flush().await?;

    // Mainloop: answer requests line by line until stdin closes
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = protocol::respond(&line);
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
