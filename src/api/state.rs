// Shared application state handed to every handler through `web::Data`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database_ops::db::Db;
use crate::database_ops::refresh::RefreshService;
use crate::database_ops::source::CountryDataSource;

pub const SUMMARY_FILE: &str = "summary.png";

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub refresh: RefreshService,
}

impl AppState {
    pub fn new(db: Db, source: Arc<dyn CountryDataSource>, cache_dir: &Path) -> Self {
        let summary_path = summary_path(cache_dir);
        Self {
            refresh: RefreshService::new(db.clone(), source, summary_path),
            db,
        }
    }

    pub fn summary_path(&self) -> &Path {
        self.refresh.summary_path()
    }
}

pub fn summary_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(SUMMARY_FILE)
}
