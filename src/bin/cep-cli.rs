use anyhow::{bail, Context};
use clap::Parser;

use cep_weather::model::{CompositeResult, PostalCodeRequest};

#[derive(Parser)]
#[command(name = "cep-cli")]
#[command(about = "Look up the current temperature for a postal code", long_about = None)]
struct Cli {
    /// Eight-digit postal code, e.g. 29902555
    code: String,

    /// Gateway base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let endpoint = format!("{}/cep", cli.url.trim_end_matches('/'));

    let res = reqwest::Client::new()
        .post(&endpoint)
        .json(&PostalCodeRequest::new(cli.code))
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        eprintln!("Response: {}", text.trim());
        bail!("gateway returned status {status}");
    }

    let result: CompositeResult = res.json().await.context("unexpected response body")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
