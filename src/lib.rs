pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod service;

mod macros;

pub mod prelude {
    pub use derive_new::new;
    pub use serde::{Deserialize, Serialize};
    pub use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};

    pub use crate::database::{Database, DatabaseError, Record};
    pub use crate::model::{now, Timestamp};
    pub use crate::{define_model, define_relation, define_table};
}
