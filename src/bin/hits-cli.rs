use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "hits-cli")]
#[command(about = "Inspect endpoint hit counts of a running hit-router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Base path of the introspection routes
    #[arg(short, long, default_value = "/endpoints")]
    path: String,

    /// Exit with status 1 when any endpoint was never hit
    #[arg(long)]
    fail_on_unhit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every endpoint with its hit count
    All,
    /// List endpoints that were never hit
    Unhit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Endpoint {
    method: String,
    path: String,
    hits: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = match cli.command {
        Commands::All => format!("{}{}", cli.url, cli.path),
        Commands::Unhit => format!("{}{}/unhit", cli.url, cli.path),
    };

    let res = client.get(&url).send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: {} returned status {}", url, status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(2);
    }

    let mut endpoints: Vec<Endpoint> = res.json().await?;
    endpoints.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));

    for e in &endpoints {
        println!("{:<8} {:<40} {:>8}", e.method, e.path, e.hits);
    }

    let unhit = endpoints.iter().filter(|e| e.hits == 0).count();
    println!("{} endpoints, {} never hit", endpoints.len(), unhit);

    if cli.fail_on_unhit && unhit > 0 {
        std::process::exit(1);
    }
    Ok(())
}
