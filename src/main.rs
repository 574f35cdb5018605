use anyhow::Context;
use clap::Parser;
use gridjoin::cli::{Args, setup_logging};
use gridjoin::{GridJoinError, JoinStats, Joiner};
use std::process;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(&args) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(GridJoinError::Interrupted {
                    reason: "Processing interrupted by user".to_string(),
                }
                .into())
            }
        }
    });

    match result {
        Ok(stats) => {
            if args.summary_json {
                match serde_json::to_string_pretty(&stats) {
                    Ok(json) => println!("{}", json),
                    Err(error) => {
                        eprintln!("Error: failed to serialize summary: {}", error);
                        process::exit(1);
                    }
                }
            }
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<JoinStats> {
    let config = args.to_config().context("Invalid options")?;

    let joiner = Joiner::new(
        args.grid_path.clone(),
        args.stations_path.clone(),
        args.output.clone(),
    )?
    .with_config(config);

    let stats = joiner
        .run()
        .await
        .with_context(|| format!("Failed to join {}", args.grid_path.display()))?;

    Ok(stats)
}
