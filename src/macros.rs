use crate::database::Id;

pub fn table<T: Id>() -> &'static str {
    T::table()
}

pub fn id<T: Id>(t: &T) -> &crate::database::Thing {
    T::id(t)
}

#[macro_export]
macro_rules! define_table {
    ($table:literal : $model:ty = $id:ident) => {
        impl $crate::database::Id for $model {
            fn id(&self) -> &$crate::database::Thing {
                &self.$id
            }

            fn table() -> &'static str {
                $table
            }
        }
    };
}

#[macro_export]
macro_rules! define_model {
    ($model:ty) => {
        impl $model {
            pub async fn find(
                id: impl ::surrealdb::opt::IntoResource<Option<Self>>,
                db: impl Into<&Database>,
            ) -> $crate::database::Result<Option<Self>> {
                db.into()
                    .select(id)
                    .await
                    .context($crate::database::DatabaseQuerySnafu)
            }

            pub async fn create(&self, db: impl Into<&Database>) -> $crate::database::Result<Vec<Self>> {
                db.into()
                    .create($crate::macros::table::<Self>())
                    .content(self)
                    .await
                    .context($crate::database::DatabaseQuerySnafu)
            }

            pub async fn update(&self, db: impl Into<&Database>) -> $crate::database::Result<Option<Self>> {
                db.into()
                    .update($crate::macros::id(self))
                    .merge(self)
                    .await
                    .context($crate::database::DatabaseQuerySnafu)
            }

            pub async fn delete(&self, db: impl Into<&Database>) -> $crate::database::Result<Option<Self>> {
                db.into()
                    .delete($crate::macros::id(self))
                    .await
                    .context($crate::database::DatabaseQuerySnafu)
            }
        }
    };
}

/// Defines a method to query the database using SQL.
///
/// # Syntax
/// ```text
/// [Base Type] > method_name(...arguments) > [Output Type] where "sql query"
/// ```
/// Where the `Base Type` is the type that the method is being defined for and the `Output Type` is the type that the method will return.
///
/// # Example
///
/// ```ignore
/// define_relation! {
///     Assignment > by_user(user: &Record<User>) > Vec<Assignment>
///         where "SELECT * FROM assignments WHERE user = $user"
/// }
///
/// let edges = Assignment::by_user(&user_id, &db).await?;
/// ```
#[macro_export]
macro_rules! define_relation {
    ($model:ty > $relation:ident ($($binding:ident : $binding_type:ty),*) > $export:ty where $query:literal) => {
        impl $model {
            pub async fn $relation($($binding : $binding_type ,)* db: impl Into<&$crate::database::Database>) -> $crate::database::Result<$export> {
                db.into().sql($query)
                    $(.bind((stringify!($binding), $binding)))*
                    .fetch()
                    .await
            }
        }
    };
}
