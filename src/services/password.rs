// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing with bcrypt.
//!
//! Hashing is CPU-bound, so both operations run on the blocking pool.

use anyhow::Context;

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(plain: &str, cost: u32) -> anyhow::Result<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .context("password hashing task failed")?
        .context("bcrypt hash failed")
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .context("password verification task failed")?;

    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}
