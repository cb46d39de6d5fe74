use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gatekeeper::config::load_config;
use gatekeeper::security::TokenKeys;

#[derive(Parser)]
#[command(name = "gatekeeper-token")]
#[command(about = "Issue and inspect session tokens for gatekeeper", long_about = None)]
struct Cli {
    /// Same configuration file the server uses (JWT_SECRET also applies).
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a token and print it with the matching cookie header
    Sign {
        #[arg(long)]
        uid: i64,
        #[arg(long)]
        user: String,
        #[arg(long)]
        role: String,
    },
    /// Verify a token and print its claims
    Verify { token: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let keys = TokenKeys::from_config(&config.auth);

    match cli.command {
        Commands::Sign { uid, user, role } => {
            let token = keys.sign(uid, &user, &role)?;
            println!("{}", token);
            eprintln!("Cookie: {}={}", config.auth.cookie_name, token);
        }
        Commands::Verify { token } => match keys.verify(&token) {
            Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
