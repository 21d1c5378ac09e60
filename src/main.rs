use clap::{Parser, Subcommand};
use govoptima::config::Config;
use govoptima::pipeline::loader::{CsvFeedReader, FeedReader};
use govoptima::server::AppState;
use govoptima::snapshot::AnalysisSnapshot;
use govoptima::{logging, observability, pipeline, report, server};
use std::path::Path;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "govoptima")]
#[command(about = "Governance stress intelligence platform")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and serve the analytics API
    Serve {
        /// Port to listen on (PORT env variable and config.toml also apply)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the pipeline once and print a summary
    Run,
    /// Generate the master analysis report files
    Report {
        /// Directory the report sections are written to
        #[arg(long, default_value = "analysis_outputs")]
        output_dir: String,
    },
}

fn print_summary(snapshot: &AnalysisSnapshot) {
    println!("\n📊 Pipeline summary:");
    println!("   Aggregated rows: {}", snapshot.rows().len());
    println!("   Districts: {}", snapshot.districts().len());
    for stats in &snapshot.load_report().sources {
        println!(
            "   {} feed: {} rows, {} invalid dates{}",
            stats.source.label(),
            stats.rows,
            stats.invalid_dates,
            if stats.degraded { " (DEGRADED)" } else { "" }
        );
    }
    let degraded = snapshot.degraded_sources();
    if !degraded.is_empty() {
        println!("\n⚠️  {} source(s) substituted with empty frames", degraded.len());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();
    observability::init_metrics();

    let cli = Cli::parse();
    let config = Config::load_or_default();
    let reader: Arc<dyn FeedReader> = Arc::new(CsvFeedReader::new(&config.data));

    match cli.command {
        Commands::Serve { port } => {
            println!("🔄 Building analysis snapshot...");
            let snapshot = pipeline::run(reader.as_ref()).await;
            print_summary(&snapshot);

            let port = port.unwrap_or_else(|| config.effective_port());
            let state = Arc::new(AppState::new(snapshot, reader));
            println!("🚀 Serving analytics API on port {}", port);
            if let Err(e) = server::serve(state, port).await {
                error!("Server failed: {}", e);
                return Err(e.into());
            }
        }
        Commands::Run => {
            println!("🔄 Running analytics pipeline...");
            let snapshot = pipeline::run(reader.as_ref()).await;
            print_summary(&snapshot);
        }
        Commands::Report { output_dir } => {
            println!("🔄 Building analysis snapshot...");
            let snapshot = pipeline::run(reader.as_ref()).await;
            print_summary(&snapshot);

            match report::write_master_report(&snapshot, Path::new(&output_dir)) {
                Ok(written) => {
                    println!("\n✅ Master report generated:");
                    for path in written {
                        println!("   {}", path.display());
                    }
                }
                Err(e) => {
                    error!("Report generation failed: {}", e);
                    println!("❌ Report generation failed: {}", e);
                }
            }
        }
    }

    Ok(())
}
