use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::JsonStore;

pub const USERS: &str = "users";
pub const RESET_CODES: &str = "reset_codes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Empty for externally-authenticated accounts; password login is
    /// disabled for those.
    #[serde(default)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetCode {
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Snapshot of the user's phone at request time, for the hint shown to
    /// the client.
    pub phone: String,
}

impl User {
    pub async fn find(store: &JsonStore, email: &str) -> Option<User> {
        let mut users = store.load::<User>(USERS).await;
        users.remove(email)
    }

    /// Inserts the user unless the email is already registered. The check
    /// and the insert share the collection guard.
    pub async fn create(store: &JsonStore, user: &User) -> anyhow::Result<bool> {
        let _guard = store.guard(USERS).await;
        let mut users = store.load::<User>(USERS).await;
        if users.contains_key(&user.email) {
            return Ok(false);
        }
        users.insert(user.email.clone(), user.clone());
        store.save(USERS, &users).await?;
        Ok(true)
    }

    /// Replaces the password hash. Returns false if the email is unknown.
    pub async fn set_password(
        store: &JsonStore,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let _guard = store.guard(USERS).await;
        let mut users = store.load::<User>(USERS).await;
        let Some(user) = users.get_mut(email) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        store.save(USERS, &users).await?;
        Ok(true)
    }
}

impl ResetCode {
    /// Stores the code, overwriting any live code for the same email.
    pub async fn put(store: &JsonStore, email: &str, code: ResetCode) -> anyhow::Result<()> {
        let _guard = store.guard(RESET_CODES).await;
        let mut codes = store.load::<ResetCode>(RESET_CODES).await;
        codes.insert(email.to_string(), code);
        store.save(RESET_CODES, &codes).await?;
        Ok(())
    }

    pub async fn find(store: &JsonStore, email: &str) -> Option<ResetCode> {
        let mut codes = store.load::<ResetCode>(RESET_CODES).await;
        codes.remove(email)
    }

    /// Purges the code for an email; no-op when none is on file.
    pub async fn purge(store: &JsonStore, email: &str) -> anyhow::Result<()> {
        let _guard = store.guard(RESET_CODES).await;
        let mut codes = store.load::<ResetCode>(RESET_CODES).await;
        if codes.remove(email).is_some() {
            store.save(RESET_CODES, &codes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            name: "Alice".into(),
            email: email.into(),
            phone: "5551234567".into(),
            password_hash: "hash".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    async fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_find() {
        let (_dir, store) = store().await;
        assert!(User::create(&store, &user("alice@example.com")).await.unwrap());
        let found = User::find(&store, "alice@example.com").await.unwrap();
        assert_eq!(found.name, "Alice");
    }

    #[tokio::test]
    async fn create_rejects_registered_email() {
        let (_dir, store) = store().await;
        assert!(User::create(&store, &user("alice@example.com")).await.unwrap());
        assert!(!User::create(&store, &user("alice@example.com")).await.unwrap());
    }

    #[tokio::test]
    async fn set_password_requires_existing_user() {
        let (_dir, store) = store().await;
        assert!(!User::set_password(&store, "ghost@example.com", "h").await.unwrap());

        User::create(&store, &user("alice@example.com")).await.unwrap();
        assert!(User::set_password(&store, "alice@example.com", "new-hash")
            .await
            .unwrap());
        let found = User::find(&store, "alice@example.com").await.unwrap();
        assert_eq!(found.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn new_reset_code_overwrites_prior() {
        let (_dir, store) = store().await;
        let make = |code: &str| ResetCode {
            code: code.into(),
            expires_at: OffsetDateTime::UNIX_EPOCH,
            phone: "5551234567".into(),
        };
        ResetCode::put(&store, "alice@example.com", make("111111"))
            .await
            .unwrap();
        ResetCode::put(&store, "alice@example.com", make("222222"))
            .await
            .unwrap();
        let live = ResetCode::find(&store, "alice@example.com").await.unwrap();
        assert_eq!(live.code, "222222");
    }

    #[tokio::test]
    async fn purge_removes_the_code() {
        let (_dir, store) = store().await;
        ResetCode::put(
            &store,
            "alice@example.com",
            ResetCode {
                code: "111111".into(),
                expires_at: OffsetDateTime::UNIX_EPOCH,
                phone: "5551234567".into(),
            },
        )
        .await
        .unwrap();
        ResetCode::purge(&store, "alice@example.com").await.unwrap();
        assert!(ResetCode::find(&store, "alice@example.com").await.is_none());
    }
}
