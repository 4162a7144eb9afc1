//! Application state management

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use simplechat_core::{App, Config, Database, EntraClient, Page, Result};

pub struct AppState {
    app: App,
    /// Concrete identity client, for delivering redirect responses
    entra: Arc<EntraClient>,
    page: RwLock<Arc<Page>>,
    /// Bumped on every page load
    generation: AtomicU64,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(config.database_path())?;

        let entra = Arc::new(EntraClient::new(config.entra_config(), db));
        let app = App::new(config, entra.clone());
        let page = Arc::new(app.new_page());

        Ok(Self {
            app,
            entra,
            page: RwLock::new(page),
            generation: AtomicU64::new(0),
        })
    }

    pub fn entra(&self) -> &EntraClient {
        &self.entra
    }

    pub fn page(&self) -> Arc<Page> {
        self.page.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the current page with a fresh one
    pub fn reload(&self) -> Arc<Page> {
        let page = Arc::new(self.app.new_page());
        *self.page.write() = page.clone();
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(generation = self.generation(), "Page reloaded");
        page
    }
}
