use std::path::PathBuf;

use clap::Args;

/// Settings shared by every command. Each can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// SQLite connection URL.
    #[arg(long, env, default_value = "sqlite://studybank.db?mode=rwc")]
    pub database_url: String,

    /// Directory uploads are staged in while being imported.
    #[arg(long, env, default_value = "./uploads")]
    pub upload_dir: PathBuf,
}
