//! Signup command implementation.

use anyhow::{Context, Result};
use clap::Args;

use memoria_core::Credentials;

use crate::cli::StoreArgs;
use crate::output;
use crate::session::{CliAuth, CliSession, storage};

#[derive(Args, Debug)]
pub struct SignupArgs {
    /// Email address of the new account
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,

    /// Name shown to other users (defaults to the part of the email before '@')
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run(args: SignupArgs, store: StoreArgs) -> Result<()> {
    let (url, auth) = CliAuth::from_args(&store)?;
    let credentials = Credentials::new(&args.email, &args.password);

    output::note("Creating account...");

    let session = auth
        .sign_up(&credentials, args.name.as_deref())
        .await
        .context("Failed to create account")?;
    let session = CliSession::new(url, session);

    storage::save_session(&session).context("Failed to save session")?;

    output::success("Account created");
    println!();
    output::field("User ID", &session.identity().user_id);
    output::field("Name", &session.identity().display_name);
    output::field("Store", session.store_url().as_str());

    Ok(())
}
