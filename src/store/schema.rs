//! Bundled DDL for the relational backend.

/// Schema for the `users` table.
///
/// Uniqueness of `username` is enforced here, at the storage layer, so a
/// racing duplicate insert fails atomically instead of relying on a
/// prior existence check.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT DEFAULT 'user',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;
