pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod import;
pub mod models;
pub mod services;

pub use error::{Error, Result};

use config::Config;
use db::Db;
use import::UploadDir;
use services::{AnalyticsService, HierarchyService, ImportService};

#[derive(Clone)]
pub struct App {
    pub db: Db,
    pub uploads: UploadDir,
}

impl App {
    /// Connects, migrates and provisions the upload directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Db::new(&config.database_url).await?;
        let uploads = UploadDir::provision(&config.upload_dir)?;
        Ok(Self { db, uploads })
    }

    pub fn hierarchy(&self) -> HierarchyService {
        HierarchyService::new(self.db.clone())
    }

    pub fn importer(&self) -> ImportService {
        ImportService::new(self.db.clone(), self.uploads.clone())
    }

    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self.db.clone())
    }
}
