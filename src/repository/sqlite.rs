use std::{fmt::Debug, str::FromStr};

use async_trait::async_trait;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::{
    migrate::{MigrateError, Migrator},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Row, Sqlite,
};

use crate::data_types::FunctionId;
use crate::wasm_udf::data_types::FunctionSignature;

use super::interface::{Error, FunctionRecord, Repository, Result};

#[derive(Debug)]
pub struct SqliteRepository {
    pub executor: Pool<Sqlite>,
}

impl SqliteRepository {
    pub const MIGRATOR: Migrator = sqlx::migrate!("migrations/sqlite");

    pub async fn try_new(
        dsn: String,
        journal_mode: SqliteJournalMode,
    ) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&dsn)?
            .create_if_missing(true)
            .journal_mode(journal_mode);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let repo = Self { executor: pool };
        repo.setup().await?;
        Ok(repo)
    }

    ///
    /// Create a new `SqliteRepository` in read-only mode: assumes the
    /// database already exists and doesn't run migrations. Intended for
    /// replicas that only ever reload the function catalog.
    pub async fn try_new_read_only(
        dsn: String,
        journal_mode: SqliteJournalMode,
    ) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&dsn)?
            .read_only(true)
            .journal_mode(journal_mode);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { executor: pool })
    }

    pub fn interpret_error(error: sqlx::Error) -> Error {
        if let sqlx::Error::Database(ref d) = error {
            // Reference: https://www.sqlite.org/rescode.html
            if d.message().contains("UNIQUE constraint failed") {
                return Error::UniqueConstraintViolation(error);
            }
        }
        Error::SqlxError(error)
    }
}

const SELECT_FUNCTIONS: &str = r#"
    SELECT id, namespace, name, bytecode, return_type, param_types
    FROM "function"
"#;

#[async_trait]
impl Repository for SqliteRepository {
    async fn setup(&self) -> Result<(), MigrateError> {
        SqliteRepository::MIGRATOR.run(&self.executor).await
    }

    async fn create_function(
        &self,
        namespace: &str,
        function_name: &str,
        or_replace: bool,
        checksum: &str,
        bytecode: &[u8],
        signature: &FunctionSignature,
    ) -> Result<FunctionId, Error> {
        let query = format!(
            r#"
        INSERT INTO "function" (namespace, name, checksum, bytecode, return_type, param_types)
        VALUES ($1, $2, $3, $4, $5, $6){} RETURNING (id);
        "#,
            if or_replace {
                " ON CONFLICT (namespace, name) DO UPDATE SET checksum = EXCLUDED.checksum, \
                bytecode = EXCLUDED.bytecode, \
                return_type = EXCLUDED.return_type, \
                param_types = EXCLUDED.param_types"
            } else {
                ""
            }
        );

        let new_function_id: i64 = sqlx::query(query.as_str())
            .bind(namespace)
            .bind(function_name)
            .bind(checksum)
            .bind(bytecode)
            .bind(signature.serialize_return())
            .bind(signature.serialize_params())
            .fetch_one(&self.executor)
            .await
            .map_err(Self::interpret_error)?
            .try_get("id")
            .map_err(Self::interpret_error)?;

        Ok(new_function_id)
    }

    async fn get_all_functions(&self) -> Result<Vec<FunctionRecord>, Error> {
        let query = format!("{SELECT_FUNCTIONS} ORDER BY id");
        let functions = sqlx::query_as::<_, FunctionRecord>(&query)
            .fetch_all(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        Ok(functions)
    }

    async fn get_functions_in_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<FunctionRecord>, Error> {
        let query = format!("{SELECT_FUNCTIONS} WHERE namespace = $1 ORDER BY id");
        let functions = sqlx::query_as::<_, FunctionRecord>(&query)
            .bind(namespace)
            .fetch_all(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        Ok(functions)
    }

    async fn drop_function(
        &self,
        namespace: &str,
        func_names: &[String],
    ) -> Result<(), Error> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(r#"DELETE FROM "function" WHERE namespace = "#);
        builder.push_bind(namespace.to_string());
        builder.push(" AND name IN (");
        let mut separated = builder.separated(", ");
        for name in func_names {
            separated.push_bind(name.clone());
        }
        separated.push_unseparated(") RETURNING id");

        let deleted: Vec<FunctionId> = builder
            .build_query_scalar()
            .fetch_all(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        if deleted.is_empty() {
            return Err(Error::SqlxError(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}
