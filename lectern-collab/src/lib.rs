mod db;
mod live;
mod media;
mod signal;
mod util;

use std::sync::Arc;

pub use db::*;
pub use live::*;
pub use media::*;
pub use signal::*;
pub use util::*;

/// The lectern collab system, facilitating live classes, signaling, and more.
pub struct Classroom<Db = MemoryDatabase> {
    database: Arc<Db>,

    pub live_classes: LiveClassManager<Db>,
}

impl<Db> Classroom<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);
        let live_classes = LiveClassManager::new(&database);

        Self {
            database,
            live_classes,
        }
    }

    /// Returns a session if it exists.
    ///
    /// Tokens are issued elsewhere; the collab system only verifies them.
    pub async fn session(&self, token: &str) -> Result<SessionData> {
        self.database.session_by_token(token).await
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}
