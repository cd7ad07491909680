//! Identity resolution: map a verified provider identity onto a local user.

use std::sync::Arc;

use crate::directory::{IdentityDirectory, NewUser, User};
use crate::error::DirectoryError;
use crate::roles::Role;

/// Finds or creates the local user for an external identity, keyed by email.
///
/// Concurrent first logins of the same identity both miss the lookup and both
/// insert; the directory's unique constraint on `email` is what keeps a single
/// record, and the losing request fails instead of duplicating the user.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, email: &str, name: &str) -> Result<User, DirectoryError> {
        match self.directory.find_user_by_email(email).await {
            Ok(user) => Ok(user),
            Err(e) if e.is_not_found() => {
                let user = self
                    .directory
                    .insert_user(NewUser {
                        email: email.to_string(),
                        name: name.to_string(),
                        role: Role::DEFAULT,
                    })
                    .await?;
                tracing::info!(user_id = %user.id, "Created user on first login");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Directory that answers lookups with a fixed result and records inserts.
    struct ScriptedDirectory {
        lookup: fn(&str) -> Result<User, DirectoryError>,
        inserted: Mutex<Vec<NewUser>>,
    }

    #[async_trait]
    impl IdentityDirectory for ScriptedDirectory {
        async fn find_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
            (self.lookup)(email)
        }

        async fn insert_user(&self, user: NewUser) -> Result<User, DirectoryError> {
            self.inserted.lock().unwrap().push(user.clone());
            Ok(user_record("created", user.role.as_str()))
        }
    }

    fn user_record(id: &str, role: &str) -> User {
        User {
            id: id.into(),
            role: role.into(),
            name: None,
            email: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn scripted(
        lookup: fn(&str) -> Result<User, DirectoryError>,
    ) -> (IdentityResolver, Arc<ScriptedDirectory>) {
        let directory = Arc::new(ScriptedDirectory {
            lookup,
            inserted: Mutex::new(Vec::new()),
        });
        (IdentityResolver::new(directory.clone()), directory)
    }

    #[tokio::test]
    async fn existing_user_is_returned_without_insert() {
        let (resolver, directory) = scripted(|_| Ok(user_record("u1", "admin")));
        let user = resolver.resolve("a@example.com", "A").await.unwrap();
        assert_eq!(user.id, "u1");
        assert!(directory.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_user_is_created_with_default_role() {
        let (resolver, directory) =
            scripted(|email| Err(DirectoryError::NotFound(email.to_string())));
        let user = resolver.resolve("new@example.com", "New").await.unwrap();
        assert_eq!(user.id, "created");

        let inserted = directory.inserted.lock().unwrap();
        assert_eq!(
            *inserted,
            vec![NewUser {
                email: "new@example.com".into(),
                name: "New".into(),
                role: Role::Student,
            }]
        );
    }

    #[tokio::test]
    async fn other_directory_errors_propagate() {
        let (resolver, directory) =
            scripted(|_| Err(DirectoryError::UnexpectedResponse("empty output".into())));
        let err = resolver.resolve("a@example.com", "A").await.unwrap_err();
        assert!(matches!(err, DirectoryError::UnexpectedResponse(_)));
        assert!(directory.inserted.lock().unwrap().is_empty());
    }
}
