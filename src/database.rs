use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::{
        auth::{self, Credentials, Jwt, Signin},
        IntoQuery, IntoResource, QueryResult,
    },
    Surreal,
};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use url::Url;

pub use surrealdb::sql::Thing;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

const SETUP: &str = include_str!("../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Represents an identifier for a database record.
pub trait Id {
    /// Returns the ID of the record.
    fn id(&self) -> &Thing;

    /// Returns the name of the table associated with the record.
    fn table() -> &'static str;
}

impl<T: Id> Id for &T {
    fn id(&self) -> &Thing {
        (*self).id()
    }

    fn table() -> &'static str {
        T::table()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_namespace")]
    pub namespace: String,
    #[serde(rename = "surreal_database")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_username")]
    username: String,
    #[serde(rename = "surreal_password")]
    password: String,
}

impl DatabaseConfig {
    fn auth<'a>(&'a self, credentials: &'a DatabaseCredentials) -> impl Credentials<Signin, Jwt> + 'a {
        auth::Database {
            namespace: &self.namespace,
            database: &self.database,
            username: &credentials.username,
            password: &credentials.password,
        }
    }
}

/// A wrapper around the SurrealDB connection that every query goes through.
#[derive(Debug, Clone, new)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    /// Connects to the store, signs in when credentials are configured, and
    /// applies the table schema. The initial connection is retried a few
    /// times so the service survives the store coming up after it.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let strategy = FixedInterval::from_millis(500).take(5);
        let database = Retry::spawn(strategy, || async {
            surrealdb::engine::any::connect(config.url.as_str()).await
        })
        .await
        .context(DatabaseConnectionSnafu {
            url: config.url.clone(),
        })?;

        if let Some(credentials) = &config.credentials {
            database
                .signin(config.auth(credentials))
                .await
                .context(DatabaseConnectionSnafu {
                    url: config.url.clone(),
                })?;
        }

        database
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(DatabaseConnectionSnafu {
                url: config.url.clone(),
            })?;

        database.query(SETUP).await.context(DatabaseQuerySnafu)?;

        Ok(Self { database })
    }

    #[cfg(test)]
    pub(crate) async fn memory() -> Self {
        let database = surrealdb::engine::any::connect("mem://")
            .await
            .expect("in-memory engine is always available");

        database
            .use_ns("test")
            .use_db("test")
            .await
            .expect("selecting a namespace on the in-memory engine cannot fail");

        database
            .query(SETUP)
            .await
            .expect("the bundled schema is valid");

        Self { database }
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let edges: Vec<Assignment> = db.sql("SELECT * FROM assignments WHERE user = $user")
    ///     .bind(("user", &user_id))
    ///     .fetch().await?;
    /// ```
    ///
    /// The `fetch` method can deserialize the result into either a single value (`Option<T>`) or a collection of values (`Vec<T>`).
    pub fn sql(&self, query: impl IntoQuery) -> Query<'_> {
        let query = self.database.query(query);
        Query { query }
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}

#[derive(Debug)]
pub struct Query<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Query<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    pub async fn fetch<T: serde::de::DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.query.await.context(DatabaseQuerySnafu)?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}

/// A typed record id for a database record. type `T` must implement [Id] trait so that the table name can be inferred.
///
/// This type implements [Default] which creates a new record with a random string identifier.
pub struct Record<T> {
    inner: Thing,
    _marker: std::marker::PhantomData<T>,
}

impl<T> std::cmp::PartialEq for Record<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> std::cmp::Eq for Record<T> {}

impl<T: Id> Record<T> {
    /// Creates a new `Record` from the specified `id` and inferred the table's name from `T`.
    pub fn new(id: impl Into<surrealdb::sql::Id>) -> Self {
        let inner = Thing {
            tb: T::table().to_string(),
            id: id.into(),
        };

        Record {
            inner,
            _marker: std::marker::PhantomData,
        }
    }

    /// Creates a new `Record` with a random string identifier.
    pub fn random() -> Self {
        Self::new(surrealdb::sql::Id::rand())
    }

    /// The bare record key, without the table prefix.
    pub fn content(&self) -> String {
        self.inner.id.to_string()
    }
}

impl<T: Id> std::default::Default for Record<T> {
    fn default() -> Self {
        Self::random()
    }
}

impl<T> std::ops::Deref for Record<T> {
    type Target = Thing;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> std::fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T> std::fmt::Display for Record<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T> std::clone::Clone for Record<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> serde::Serialize for Record<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, T: Id> serde::Deserialize<'de> for Record<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let thing = Thing::deserialize(deserializer)?;

        let expected = T::table();
        let actual = &thing.tb;

        if expected != actual {
            return Err(serde::de::Error::custom(format!(
                "table name mismatch, expected '{expected}' but got '{actual}'"
            )));
        }

        Ok(Record {
            inner: thing,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T> std::hash::Hash for Record<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}

impl<T, R> IntoResource<R> for Record<T>
where
    Thing: IntoResource<R>,
{
    fn into_resource(self) -> std::result::Result<surrealdb::opt::Resource, surrealdb::Error> {
        self.inner.into_resource()
    }
}
