use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trading_mate::{config::AppConfig, TradingMate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("{}", e);
        e
    })?;

    let mate = TradingMate::from_config(&config)?;
    let mut session = mate.start_session();
    info!(session_id = %session.id(), "Trading Mate session started");

    println!("Trading Mate (Lite)");
    let models: Vec<&str> = config.model_candidates.iter().map(|m| m.as_str()).collect();
    println!("Powered by Google Gemini ({} fallback)", models.join(" / "));

    let snapshot = mate.market_snapshot().await;
    println!("Live {} Snapshot: {}", config.market_label, snapshot);
    println!("Type a question, or 'exit' to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        println!("Thinking...");
        match mate.handle_turn(&mut session, input).await {
            Ok(reply) => {
                println!("Model used: {}", reply.model_used);
                if let Some(thought) = &reply.thought {
                    println!("(thought) {}", thought);
                }
                println!("{}\n", reply.answer);
            }
            Err(e) => {
                warn!("Turn failed: {}", e);
                println!("Error: {}", e);
                if let Some(hint) = e.user_hint() {
                    println!("{}", hint);
                }
                println!();
            }
        }
    }

    info!(
        session_id = %session.id(),
        messages = session.store().message_count(),
        "Session ended"
    );
    Ok(())
}
