//! Identity Directory client.
//!
//! The user directory is a Hasura GraphQL endpoint, addressed with the admin
//! secret. Only the two operations login needs are exposed.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use url::Url;

use crate::config::GraphqlConfig;
use crate::error::DirectoryError;
use crate::roles::Role;

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

const USER_BY_EMAIL_QUERY: &str = r#"
query ($email: String!) {
  users(where: {email: {_eq: $email}}, limit: 1) {
    id
    role
  }
}"#;

const INSERT_USER_MUTATION: &str = r#"
mutation ($email: String!, $name: String!, $role: String!) {
  insert_users(objects: {email: $email, name: $name, role: $role}) {
    returning {
      id
      role
      name
      email
      created_at
      updated_at
    }
  }
}"#;

/// A user record as the directory returns it. Lookups only select `id` and
/// `role`, so every other field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look a user up by email. A miss is reported as [`DirectoryError::NotFound`].
    async fn find_user_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, DirectoryError>;
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Deserialize)]
struct UsersData {
    users: Option<Vec<User>>,
}

#[derive(Deserialize)]
struct InsertUsersData {
    insert_users: Option<Returning>,
}

#[derive(Deserialize)]
struct Returning {
    returning: Vec<User>,
}

/// Hasura-backed directory.
#[derive(Clone)]
pub struct GraphqlDirectory {
    http: reqwest::Client,
    url: Url,
    admin_secret: String,
}

impl GraphqlDirectory {
    pub fn new(http: reqwest::Client, config: &GraphqlConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
            admin_secret: config.admin_secret.clone(),
        }
    }

    async fn run<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, DirectoryError> {
        let response: GraphqlResponse<T> = self
            .http
            .post(self.url.clone())
            .header(ADMIN_SECRET_HEADER, &self.admin_secret)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.errors.is_empty() {
            return Err(DirectoryError::Graphql(
                response.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        response
            .data
            .ok_or_else(|| DirectoryError::UnexpectedResponse("missing data".into()))
    }
}

#[async_trait]
impl IdentityDirectory for GraphqlDirectory {
    #[tracing::instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let data: UsersData = self
            .run(USER_BY_EMAIL_QUERY, json!({ "email": email }))
            .await?;

        let users = data
            .users
            .ok_or_else(|| DirectoryError::UnexpectedResponse("empty output".into()))?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::NotFound(email.to_string()))
    }

    #[tracing::instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    async fn insert_user(&self, user: NewUser) -> Result<User, DirectoryError> {
        let data: InsertUsersData = self
            .run(
                INSERT_USER_MUTATION,
                json!({
                    "email": user.email,
                    "name": user.name,
                    "role": user.role.as_str(),
                }),
            )
            .await?;

        data.insert_users
            .and_then(|inserted| inserted.returning.into_iter().next())
            .ok_or_else(|| DirectoryError::UnexpectedResponse("empty output".into()))
    }
}
