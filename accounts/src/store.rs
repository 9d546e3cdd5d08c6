use crate::errors::AccountError;
use crate::types::{Account, NewAccount};
use sqlx::PgPool;

const ACCOUNT_COLUMNS: &str =
    "id, external_id, login, display_name, access_token, refresh_token, created_at";

#[derive(Clone)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        AccountStore { pool }
    }

    pub async fn find(&self, id: i64) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Insert the account or update the existing row for the same external
    /// id. Profile fields are only filled in when the stored value is empty;
    /// tokens always take the freshly issued pair. The row lock and the
    /// write commit together; any failure rolls the transaction back.
    pub async fn upsert(&self, new: NewAccount) -> Result<Account, AccountError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = $1 FOR UPDATE"
        ))
        .bind(&new.external_id)
        .fetch_optional(&mut *tx)
        .await?;

        let account = match existing {
            Some(existing) => {
                let login = if existing.login.is_empty() {
                    &new.login
                } else {
                    &existing.login
                };
                let display_name = if existing.display_name.is_empty() {
                    &new.display_name
                } else {
                    &existing.display_name
                };

                sqlx::query_as::<_, Account>(&format!(
                    "UPDATE accounts
                     SET login = $2, display_name = $3, access_token = $4, refresh_token = $5
                     WHERE id = $1
                     RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(existing.id)
                .bind(login)
                .bind(display_name)
                .bind(&new.access_token)
                .bind(&new.refresh_token)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Account>(&format!(
                    "INSERT INTO accounts
                         (external_id, login, display_name, access_token, refresh_token)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {ACCOUNT_COLUMNS}"
                ))
                .bind(&new.external_id)
                .bind(&new.login)
                .bind(&new.display_name)
                .bind(&new.access_token)
                .bind(&new.refresh_token)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(account)
    }

    /// Accounts that currently hold a bearer token. The scheduled refresher
    /// sweeps over exactly this set.
    pub async fn list_authorized(&self) -> Result<Vec<Account>, AccountError> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE access_token <> '' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }
}
