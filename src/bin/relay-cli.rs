use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the shop media relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image file
    Upload {
        path: PathBuf,
        /// Name to store the file under (defaults to the file's own name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Recheck an upload that was still processing
    Status { file_id: String },
    /// Delete every stored file whose name contains PATTERN
    Remove {
        pattern: String,
        #[arg(short, long, env = "ADMIN_PASSWORD")]
        password: String,
    },
    /// Check relay liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Upload { path, name } => {
            let mime = mime_for(&path).ok_or_else(|| {
                format!("{}: not a recognised image extension", path.display())
            })?;
            let bytes = tokio::fs::read(&path).await?;
            let filename = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or("path has no file name")?,
            };
            let image = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
            client
                .post(format!("{}/api/upload", cli.url))
                .json(&json!({ "filename": filename, "image": image }))
                .send()
                .await?
        }
        Commands::Status { file_id } => {
            client
                .post(format!("{}/api/upload", cli.url))
                .json(&json!({ "fileId": file_id }))
                .send()
                .await?
        }
        Commands::Remove { pattern, password } => {
            client
                .post(format!("{}/api/remove", cli.url))
                .json(&json!({ "searchPattern": pattern, "adminPassword": password }))
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
    };

    print_response(res).await
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
