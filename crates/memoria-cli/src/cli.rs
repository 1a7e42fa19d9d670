//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::commands::{add, delete, list, login, logout, signup, update, watch, whoami};

/// Memoria command-line client.
#[derive(Parser, Debug)]
#[command(name = "memoria")]
#[command(author, version = env!("MEMORIA_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to sign in. Ignored by commands that use the saved session.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Store URL: file:///path/to/dir or https://<db>.firebaseio.com
    #[arg(long, env = "MEMORIA_STORE", global = true)]
    pub store: Option<String>,

    /// Web API key for hosted accounts
    #[arg(long, env = "MEMORIA_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Identity toolkit base URL, for emulators
    #[arg(long, env = "MEMORIA_AUTH_ENDPOINT", global = true, hide = true)]
    pub auth_endpoint: Option<String>,
}

/// A list addressed by resource name.
#[derive(Args, Debug, Clone)]
pub struct ListTarget {
    /// Resource name, e.g. ideas, familyMembers, commonNotes
    pub resource: String,

    /// Treat the resource as a shared list (implied for commonNotes)
    #[arg(long)]
    pub global: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and sign in
    Signup(signup::SignupArgs),

    /// Sign in to an existing account
    Login(login::LoginArgs),

    /// Forget the saved session
    Logout(logout::LogoutArgs),

    /// Display the signed-in identity
    Whoami(whoami::WhoamiArgs),

    /// Print the records of a list
    List(list::ListArgs),

    /// Add a record to a list
    Add(add::AddArgs),

    /// Change fields of a record
    Update(update::UpdateArgs),

    /// Delete a record
    Delete(delete::DeleteArgs),

    /// Follow a list and print it whenever it changes
    Watch(watch::WatchArgs),
}
