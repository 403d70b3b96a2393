use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the admission gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    /// Actor id recorded on audit trails.
    #[arg(short, long)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitoring stats summary
    Stats,
    /// Recent security events
    Activity {
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Active block lists
    Blocked,
    /// Behavioral analysis for an IP
    AnalyzeIp { ip: String },
    /// Behavioral analysis for a user
    AnalyzeUser { user_id: String },
    /// Block an IP
    BlockIp {
        ip: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Unblock an IP
    UnblockIp { ip: String },
    /// Block a user
    BlockUser {
        user_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Unblock a user
    UnblockUser { user_id: String },
    /// Export logs and events (json or csv)
    Export {
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        minimal: bool,
    },
    /// Clear stored data (logs, events, or all). Destructive.
    Clear {
        target: String,
        /// Required confirmation flag.
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    if let Some(actor) = &cli.actor {
        headers.insert("x-actor-id", HeaderValue::from_str(actor)?);
    }

    match cli.command {
        Commands::Stats => {
            let res = client
                .get(format!("{}/admin/stats", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Activity {
            severity,
            kind,
            ip,
            limit,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(severity) = severity {
                query.push(("severity", severity));
            }
            if let Some(kind) = kind {
                query.push(("kind", kind));
            }
            if let Some(ip) = ip {
                query.push(("ip", ip));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            let res = client
                .get(format!("{}/admin/activity", cli.url))
                .query(&query)
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Blocked => {
            let res = client
                .get(format!("{}/admin/blocked", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::AnalyzeIp { ip } => {
            let res = client
                .get(format!("{}/admin/analysis/ip/{}", cli.url, ip))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::AnalyzeUser { user_id } => {
            let res = client
                .get(format!("{}/admin/analysis/user/{}", cli.url, user_id))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::BlockIp { ip, reason } => {
            let res = client
                .post(format!("{}/admin/block/ip", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "identifier": ip, "reason": reason }))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::UnblockIp { ip } => {
            let res = client
                .post(format!("{}/admin/unblock/ip", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "identifier": ip }))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::BlockUser { user_id, reason } => {
            let res = client
                .post(format!("{}/admin/block/user", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "identifier": user_id, "reason": reason }))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::UnblockUser { user_id } => {
            let res = client
                .post(format!("{}/admin/unblock/user", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "identifier": user_id }))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Export { format, minimal } => {
            let res = client
                .get(format!("{}/admin/export", cli.url))
                .query(&[
                    ("format", format.as_str()),
                    ("include_context", if minimal { "false" } else { "true" }),
                ])
                .headers(headers)
                .send()
                .await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: Admin API returned status {}", status);
                return Ok(());
            }
            println!("{}", res.text().await?);
        }
        Commands::Clear { target, confirm } => {
            let res = client
                .delete(format!("{}/admin/data", cli.url))
                .query(&[("target", target.as_str()), ("confirm", if confirm { "true" } else { "false" })])
                .headers(headers)
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                println!("cleared: {}", target);
            } else {
                eprintln!("Error: Admin API returned status {}", status);
            }
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
