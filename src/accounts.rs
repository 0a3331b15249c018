use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::{LogbookError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub username: String,
    pub full_name: String,
}

/// Unsalted SHA-256, lowercase hex. Existing account tables store this form.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LogbookError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn register(
    conn: &Connection,
    username: &str,
    password: &str,
    full_name: &str,
) -> Result<UserAccount> {
    require(username, "username")?;
    require(password, "password")?;
    require(full_name, "full name")?;

    let inserted = conn.execute(
        "INSERT INTO users(username, password_hash, full_name) VALUES(?, ?, ?)
         ON CONFLICT(username) DO NOTHING",
        (username, hash_password(password), full_name),
    )?;
    if inserted == 0 {
        return Err(LogbookError::auth("username already taken"));
    }
    Ok(UserAccount {
        username: username.to_string(),
        full_name: full_name.to_string(),
    })
}

pub fn verify(conn: &Connection, username: &str, password: &str) -> Result<UserAccount> {
    require(username, "username")?;
    require(password, "password")?;

    let stored: Option<(String, String)> = conn
        .query_row(
            "SELECT password_hash, full_name FROM users WHERE username = ?",
            [username],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match stored {
        Some((hash, full_name)) if hash == hash_password(password) => Ok(UserAccount {
            username: username.to_string(),
            full_name,
        }),
        _ => Err(LogbookError::auth("invalid username or password")),
    }
}

/// Single-password deployments have no account table entries.
pub fn verify_shared(expected: &str, password: &str) -> Result<()> {
    require(password, "password")?;
    if password != expected {
        return Err(LogbookError::auth("invalid password"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        ensure_schema(&conn, "2025-2").expect("schema");
        conn
    }

    fn stored_hash(conn: &Connection, username: &str) -> String {
        conn.query_row(
            "SELECT password_hash FROM users WHERE username = ?",
            [username],
            |r| r.get(0),
        )
        .expect("stored hash")
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn register_then_verify() {
        let conn = open();
        register(&conn, "monitor", "s3cret", "Kysil Yana").expect("register");
        let account = verify(&conn, "monitor", "s3cret").expect("verify");
        assert_eq!(account.full_name, "Kysil Yana");
        assert_ne!(stored_hash(&conn, "monitor"), "s3cret");
    }

    #[test]
    fn duplicate_username_keeps_first_hash() {
        let conn = open();
        register(&conn, "monitor", "first", "One").expect("register");
        let before = stored_hash(&conn, "monitor");
        let err = register(&conn, "monitor", "second", "Two").unwrap_err();
        assert_eq!(err.code(), "auth_failed");
        assert_eq!(stored_hash(&conn, "monitor"), before);
        assert_eq!(verify(&conn, "monitor", "first").expect("verify").full_name, "One");
    }

    #[test]
    fn wrong_password_and_unknown_user_fail() {
        let conn = open();
        register(&conn, "monitor", "right", "Name").expect("register");
        assert_eq!(verify(&conn, "monitor", "wrong").unwrap_err().code(), "auth_failed");
        assert_eq!(verify(&conn, "nobody", "right").unwrap_err().code(), "auth_failed");
    }

    #[test]
    fn empty_fields_are_validation_errors() {
        let conn = open();
        assert_eq!(
            register(&conn, "", "pw", "Name").unwrap_err().code(),
            "validation_failed"
        );
        assert_eq!(
            register(&conn, "user", "pw", "  ").unwrap_err().code(),
            "validation_failed"
        );
        assert_eq!(verify(&conn, "user", "").unwrap_err().code(), "validation_failed");
    }

    #[test]
    fn legacy_account_table_logs_in_after_migration() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE users(username TEXT PRIMARY KEY, password TEXT, full_name TEXT)",
            [],
        )
        .expect("create old users");
        conn.execute(
            "INSERT INTO users(username, password, full_name) VALUES(?, ?, ?)",
            ("monitor", hash_password("s3cret"), "Kysil Yana"),
        )
        .expect("insert old user");
        ensure_schema(&conn, "2025-2").expect("migrate");

        let account = verify(&conn, "monitor", "s3cret").expect("verify");
        assert_eq!(account.full_name, "Kysil Yana");
        assert!(register(&conn, "second", "pw", "Other Name").is_ok());
        assert_eq!(stored_hash(&conn, "second"), hash_password("pw"));
    }

    #[test]
    fn shared_password_check() {
        assert!(verify_shared("class-pass", "class-pass").is_ok());
        assert_eq!(
            verify_shared("class-pass", "nope").unwrap_err().code(),
            "auth_failed"
        );
    }
}
