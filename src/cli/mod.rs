pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gallery")]
#[command(about = "Gallery CLI - Sign in, upload images and render your gallery")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "GALLERY_SERVER",
        help = "Server base URL (defaults to the signed-in server, then http://localhost:3000)"
    )]
    pub server: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Exchange an identity provider ID token for a session")]
    SignIn {
        #[arg(long, env = "GALLERY_ID_TOKEN", help = "ID token issued by the identity provider")]
        id_token: String,
    },

    #[command(about = "Forget the stored session")]
    SignOut,

    #[command(about = "Show the signed-in user")]
    Whoami,

    #[command(about = "Upload an image file")]
    Upload {
        #[arg(help = "Path to the image file")]
        path: PathBuf,
    },

    #[command(about = "Attach an externally hosted image by URL")]
    Attach {
        #[arg(help = "http(s) URL of the image")]
        url: String,
    },

    #[command(about = "List your image references")]
    List,

    #[command(about = "Render your gallery as HTML")]
    Render {
        #[arg(long, help = "Write the HTML to this file instead of stdout")]
        out: Option<PathBuf>,
    },

    #[command(about = "Check server health")]
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let server = cli.server;

    match cli.command {
        Commands::SignIn { id_token } => commands::auth::sign_in(server, &id_token, output_format).await,
        Commands::SignOut => commands::auth::sign_out(output_format),
        Commands::Whoami => commands::auth::whoami(server, output_format).await,
        Commands::Health => commands::auth::health(server, output_format).await,
        Commands::Upload { path } => commands::images::upload(server, &path, output_format).await,
        Commands::Attach { url } => commands::images::attach(server, &url, output_format).await,
        Commands::List => commands::images::list(server, output_format).await,
        Commands::Render { out } => commands::images::render(server, out.as_deref(), output_format).await,
    }
}
