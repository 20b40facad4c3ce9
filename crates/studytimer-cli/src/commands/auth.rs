use clap::Subcommand;
use studytimer_core::{KeyringTokenProvider, TokenProvider};

use crate::context::TOKEN_ENV;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the progress service token in the OS keyring
    Login {
        /// Bearer token issued by the study-plan service
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Check whether a token is available
    Status,
}

pub async fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let keyring = KeyringTokenProvider::new();
    match action {
        AuthAction::Login { token } => {
            if token.trim().is_empty() {
                return Err("token must not be empty".into());
            }
            keyring.save(token.trim())?;
            println!("token saved");
        }
        AuthAction::Logout => {
            keyring.remove()?;
            println!("token removed");
        }
        AuthAction::Status => {
            let from_env = std::env::var(TOKEN_ENV).is_ok_and(|t| !t.is_empty());
            let stored = matches!(keyring.get_token().await, Ok(Some(_)));
            let status = serde_json::json!({
                "authenticated": from_env || stored,
                "source": if from_env { "env" } else if stored { "keyring" } else { "none" },
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
