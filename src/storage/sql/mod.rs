//! Unified SQL storage implementation.
//!
//! This module provides one `DashboardStore` implementation for SQL-based
//! backends (PostgreSQL, SQLite). The implementation is parameterized by
//! database type using the `SqlDatabase` trait.

mod dashboard_store;
mod query;

pub use dashboard_store::SqlDashboardStore;
pub use query::SqlDatabase;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::PostgresQueryBuilder;
    use sqlx::PgPool;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        const CREATE_TABLES: &'static str = crate::storage::schema::CREATE_TABLES_POSTGRES;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }
    }

    /// PostgreSQL dashboard store.
    pub type PostgresDashboardStore = super::SqlDashboardStore<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::SqlitePool;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        const CREATE_TABLES: &'static str = crate::storage::schema::CREATE_TABLES_SQLITE;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }
    }

    /// SQLite dashboard store.
    pub type SqliteDashboardStore = super::SqlDashboardStore<Sqlite>;
}
