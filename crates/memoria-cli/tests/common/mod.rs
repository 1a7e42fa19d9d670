#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use url::Url;

/// A file store and one home directory per user, all under a temp dir.
pub struct TestEnv {
    dir: TempDir,
    store_url: String,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let store_url = Url::from_directory_path(&store)
            .expect("Failed to convert path to file URL")
            .to_string();
        Self { dir, store_url }
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Home directory for `user`, so each user keeps their own session.
    pub fn home(&self, user: &str) -> PathBuf {
        let home = self.dir.path().join("homes").join(user);
        std::fs::create_dir_all(&home).unwrap();
        home
    }

    /// Run the CLI as `user`.
    pub fn run(&self, user: &str, args: &[&str]) -> Output {
        run_cli_with_env(args, &self.home(user), &self.store_url)
    }

    /// Run the CLI as `user` and expect success. Returns stdout.
    pub fn run_success(&self, user: &str, args: &[&str]) -> String {
        let output = self.run(user, args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI as `user` and expect failure. Returns stderr.
    pub fn run_failure(&self, user: &str, args: &[&str]) -> String {
        let output = self.run(user, args);
        assert!(
            !output.status.success(),
            "CLI command unexpectedly succeeded: {:?}\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Create an account for `user` and sign them in.
    pub fn signup(&self, user: &str, name: &str) {
        let email = format!("{}@example.com", user);
        self.run_success(
            user,
            &["signup", "--email", &email, "--password", "hunter22", "--name", name],
        );
    }
}

/// Run the CLI binary with an isolated HOME and a store URL.
pub fn run_cli_with_env(args: &[&str], home: &Path, store_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_memoria"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("MEMORIA_STORE", store_url);
    cmd.env_remove("MEMORIA_API_KEY");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Parse one JSON record per line.
pub fn records(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect()
}
