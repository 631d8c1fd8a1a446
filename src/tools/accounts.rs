//! Account MCP Tools
//!
//! Account CRUD and the active-account pointer. Mutations that touch more
//! than one table run in a transaction.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Account, AccountCreate, AccountDeletion, AccountUpdate, Preferences};

/// Response for list_accounts
#[derive(Debug, Serialize)]
pub struct ListAccountsResponse {
    pub accounts: Vec<Account>,
    pub active_account_id: Option<String>,
    pub total: usize,
}

pub fn list_accounts(db: &Database, owner: &str) -> Result<ListAccountsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let accounts = Account::list(&conn, owner).map_err(|e| format!("Failed to list accounts: {}", e))?;
    let active_account_id = accounts.iter().find(|a| a.is_active).map(|a| a.account_id.clone());

    Ok(ListAccountsResponse {
        total: accounts.len(),
        accounts,
        active_account_id,
    })
}

/// Create an account, making it the active one unless `activate` is false
pub fn create_account(
    db: &Database,
    owner: &str,
    account_name: &str,
    account_id: &str,
    activate: bool,
) -> Result<Account, String> {
    let data = AccountCreate {
        account_name: account_name.to_string(),
        account_id: account_id.to_string(),
    };

    let account = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created = Account::create(&tx, owner, &data)?;
            if activate {
                Preferences::set_active(&tx, owner, Some(&created.account_id))?;
            }
            let account = Account::get(&tx, owner, &created.account_id)?.unwrap_or(created);
            tx.commit()?;
            Ok(account)
        })
        .map_err(|e| format!("Failed to create account: {}", e))?;

    tracing::info!(account_id = %account.account_id, active = account.is_active, "Created account");
    Ok(account)
}

pub fn get_account(db: &Database, owner: &str, account_id: &str) -> Result<Option<Account>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Account::get(&conn, owner, account_id).map_err(|e| format!("Failed to get account: {}", e))
}

/// Rename an account; its entries pick up the new name
pub fn update_account(
    db: &Database,
    owner: &str,
    account_id: &str,
    account_name: Option<String>,
) -> Result<Option<Account>, String> {
    let data = AccountUpdate { account_name };

    let updated = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = Account::update(&tx, owner, account_id, &data)?;
            tx.commit()?;
            Ok(updated)
        })
        .map_err(|e| format!("Failed to update account: {}", e))?;

    if updated.is_some() {
        tracing::info!(account_id = %account_id, "Updated account");
    }
    Ok(updated)
}

/// Delete an account and every entry recorded for it
pub fn delete_account(db: &Database, owner: &str, account_id: &str) -> Result<Option<AccountDeletion>, String> {
    let deletion = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let deletion = Account::delete(&tx, owner, account_id)?;
            tx.commit()?;
            Ok(deletion)
        })
        .map_err(|e| format!("Failed to delete account: {}", e))?;

    if let Some(ref d) = deletion {
        tracing::info!(
            account_id = %d.account_id,
            entries_deleted = d.entries_deleted,
            active_account_id = ?d.active_account_id,
            "Deleted account"
        );
    }
    Ok(deletion)
}

pub fn set_active_account(db: &Database, owner: &str, account_id: &str) -> Result<Account, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Account::get(&conn, owner, account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Account '{}' not found", account_id));
    }

    Preferences::set_active(&conn, owner, Some(account_id))
        .map_err(|e| format!("Failed to set active account: {}", e))?;

    tracing::info!(account_id = %account_id, "Switched active account");

    Account::get(&conn, owner, account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Account '{}' not found", account_id))
}

pub fn get_active_account(db: &Database, owner: &str) -> Result<Option<Account>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Account::active(&conn, owner).map_err(|e| format!("Failed to get active account: {}", e))
}
