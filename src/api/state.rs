use derive_new::new;

use crate::auth::Authenticator;
use crate::database::Database;
use crate::service::{Audit, Progress, Reconciler};

#[derive(Debug, Clone, new)]
pub struct App {
    pub database: Database,
    pub authenticator: Authenticator,
    pub reconciler: Reconciler,
    pub progress: Progress,
    pub audit: Audit,
}

impl<'a> From<&'a App> for &'a Database {
    fn from(app: &'a App) -> Self {
        &app.database
    }
}

pub fn create_app(database: Database, authenticator: Authenticator) -> App {
    let audit = Audit::new(database.clone());
    let reconciler = Reconciler::new(database.clone(), audit.clone());
    let progress = Progress::new(database.clone(), audit.clone());

    App {
        database,
        authenticator,
        reconciler,
        progress,
        audit,
    }
}
