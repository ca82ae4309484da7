use std::sync::Arc;

use super::credentials::{Credentials, credentials_path, load_credentials, save_credentials};
use super::pickers::value_or_prompt;
use crate::auth::{IdentityProvider, LocalIdentity, SessionStore};

fn normalize_server_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    // Default to http:// for localhost/127.0.0.1, https:// for others
    if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}

pub fn run_auth_login(
    server: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    token: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let server = value_or_prompt(server, "server", "API base URL:", non_interactive)?;
    let server_url = normalize_server_url(&server);
    let user_id = value_or_prompt(user_id, "user-id", "User ID:", non_interactive)?;
    let token = value_or_prompt(token, "token", "Token:", non_interactive)?;

    if token.contains(char::is_whitespace) {
        anyhow::bail!("Invalid token format. Tokens cannot contain whitespace");
    }

    let creds = Credentials {
        server_url: server_url.clone(),
        user_id: user_id.clone(),
        email: email.filter(|e| !e.trim().is_empty()),
        token,
        workspace: None,
    };
    save_credentials(&creds)?;

    println!();
    println!("Logged in to {server_url} as {user_id}");
    println!();

    Ok(())
}

pub async fn run_auth_logout() -> anyhow::Result<()> {
    let Ok(creds) = load_credentials() else {
        println!();
        println!("No credentials found.");
        println!();
        return Ok(());
    };

    let identity = Arc::new(
        LocalIdentity::signed_in(creds.principal(), creds.token.clone())
            .with_credentials_file(credentials_path()?),
    );
    let session = SessionStore::new(identity as Arc<dyn IdentityProvider>);
    session.sign_out().await?;

    println!();
    println!("Logged out successfully.");
    println!();
    Ok(())
}

pub fn run_auth_status() -> anyhow::Result<()> {
    let Ok(creds) = load_credentials() else {
        println!("Not logged in.");
        return Ok(());
    };

    println!();
    println!("Signed in as {}", creds.principal().label());
    println!("User ID:    {}", creds.user_id);
    println!("Server:     {}", creds.server_url);
    if let Some(workspace) = &creds.workspace {
        println!("Workspace:  {workspace}");
    }
    println!();
    Ok(())
}
