pub mod accounts;
pub mod config;
pub mod db;
pub mod lists;
pub mod notifications;
pub mod ui;

pub use db::DbPool;

use config::Config;
use notifications::Mailer;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, db, mailer }
    }
}
