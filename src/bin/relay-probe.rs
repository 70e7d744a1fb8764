//! Reachability probe for upstream endpoints.
//!
//! Sends a GET to each URL and prints the status code, or the classified
//! failure when the request does not complete.

use std::time::Duration;

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use api_relay::config::schema::DESKTOP_USER_AGENT;
use api_relay::relay::error::{error_chain, FailureKind};

const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://now.gg/api/user/v2/auth",
    "https://api.now.gg/user/v2/auth",
    "https://account.api.now.gg/user/v2/auth",
    "https://now.gg/api/v1/auth",
    "https://api.now.gg/v1/auth",
];

#[derive(Parser)]
#[command(name = "relay-probe")]
#[command(about = "Check which upstream endpoints are reachable", long_about = None)]
struct Cli {
    /// URLs to probe. Defaults to the known now.gg auth endpoints.
    urls: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// User-Agent header sent with each probe.
    #[arg(long, default_value = DESKTOP_USER_AGENT)]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&cli.user_agent)?);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(cli.timeout))
        .no_proxy()
        .build()?;

    let urls: Vec<String> = if cli.urls.is_empty() {
        DEFAULT_ENDPOINTS.iter().map(|u| u.to_string()).collect()
    } else {
        cli.urls
    };

    println!("Testing {} endpoint(s)...\n", urls.len());

    for url in &urls {
        println!("Testing: {url}");
        match client.get(url).send().await {
            Ok(response) => {
                println!("  ✓ Status: {}", response.status().as_u16());
                println!("  ✓ Reachable\n");
            }
            Err(e) => {
                println!("  ✗ Error: {}", error_chain(&e));
                println!("  ✗ Code: {}\n", FailureKind::classify(&e).code());
            }
        }
    }

    Ok(())
}
