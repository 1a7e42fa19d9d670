//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;

use memoria_core::Credentials;

use crate::cli::StoreArgs;
use crate::output;
use crate::session::{CliAuth, CliSession, storage};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, store: StoreArgs) -> Result<()> {
    let (url, auth) = CliAuth::from_args(&store)?;
    let credentials = Credentials::new(&args.email, &args.password);

    output::note("Logging in...");

    let session = auth
        .sign_in(&credentials)
        .await
        .context("Failed to login")?;
    let session = CliSession::new(url, session);

    storage::save_session(&session).context("Failed to save session")?;

    output::success("Logged in successfully");
    println!();
    output::field("User ID", &session.identity().user_id);
    output::field("Name", &session.identity().display_name);
    output::field("Store", session.store_url().as_str());

    Ok(())
}
