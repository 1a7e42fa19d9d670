//! Whoami command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::output;
use crate::session::storage;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs) -> Result<()> {
    let session = storage::require_session()?;
    let identity = session.identity();

    if args.json {
        output::json_pretty(&json!({
            "userId": identity.user_id,
            "displayName": identity.display_name,
            "email": identity.email,
            "store": session.store_url().as_str(),
        }))?;
    } else {
        output::field("User ID", &identity.user_id);
        output::field("Name", &identity.display_name);
        if let Some(email) = &identity.email {
            output::field("Email", email);
        }
        output::field("Store", session.store_url().as_str());
    }

    Ok(())
}
