//! Credential lookup for the sync command

use crate::config::{CredentialStore, Credentials};
use crate::error::{GarminError, Result};
use std::io::{self, IsTerminal, Write};

/// Load stored credentials, prompting for and saving new ones if the store is empty
pub fn resolve_credentials(store: &mut CredentialStore) -> Result<Credentials> {
    if !store.is_empty() {
        return store.get();
    }

    if !io::stdin().is_terminal() {
        return Err(GarminError::credentials(format!(
            "no credentials stored in {} and stdin is not a terminal",
            store.path().display()
        )));
    }

    println!("No Garmin Connect credentials found in {}", store.path().display());

    print!("Email: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let username = input.trim().to_string();

    let password = rpassword_prompt("Password: ")?;

    if username.is_empty() || password.is_empty() {
        return Err(GarminError::credentials("username and password must not be empty"));
    }

    store.store(&username, &password)?;
    tracing::info!(path = %store.path().display(), "Saved credentials");

    Ok(Credentials { username, password })
}

/// Prompt for password without echoing
fn rpassword_prompt(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    rpassword::read_password().map_err(GarminError::Io)
}
