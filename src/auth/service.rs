//! Signup, login and credential verification.
//!
//! These flows only raise typed errors; turning them into HTTP responses is
//! left to [`crate::errors`].

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::auth::errors::AuthError;
use crate::auth::jwt::{IssuedToken, JwtService};
use crate::auth::models::{CurrentUser, SignupRequest};
use crate::auth::password::PasswordVerifier;
use crate::database::{NewUser, User, UserStore};
use crate::errors::{AppError, AppResult};

/// Prefix of a credential carrier value: `Bearer <token>`
pub const BEARER_SCHEME: &str = "Bearer";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    passwords: Arc<dyn PasswordVerifier>,
    jwt: Arc<JwtService>,
    // Compared against when the username is unknown so both login failures cost the same.
    decoy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        passwords: Arc<dyn PasswordVerifier>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            passwords,
            jwt,
            decoy_hash: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Register a new account.
    pub async fn signup(&self, request: SignupRequest) -> AppResult<User> {
        if request.username.is_empty() || request.password.is_empty() {
            return Err(AppError::InvalidRequest(
                "username and password must not be empty".to_string(),
            ));
        }

        if self.users.find_by_username(&request.username).await?.is_some() {
            tracing::info!("Signup refused, username {} exists", request.username);
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = self.passwords.hash(&request.password).await?;
        let user = self
            .users
            .create(NewUser {
                username: request.username,
                password_hash,
                nickname: request.nickname,
            })
            .await?;

        tracing::info!("User signed up: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check a username/password pair and mint a token for it.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        let user = self.users.find_by_username(username).await?;

        let matched = match &user {
            Some(user) => self.passwords.verify(password, &user.password_hash).await?,
            None => {
                let decoy = self
                    .decoy_hash
                    .get_or_try_init(|| self.passwords.hash("decoy-password"))
                    .await?;
                self.passwords.verify(password, decoy).await?;
                false
            }
        };

        let user = match user {
            Some(user) if matched => user,
            _ => {
                tracing::info!("Login failed for username {}", username);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let issued = self.jwt.create_token(user.id)?;
        tracing::info!("User logged in: {} ({})", user.username, user.id);
        Ok(issued)
    }

    /// Resolve a raw `Bearer <token>` carrier value to an existing user.
    pub async fn verify_credential(&self, credential: &str) -> AppResult<CurrentUser> {
        let (scheme, token) = credential.split_once(' ').unwrap_or((credential, ""));
        if scheme != BEARER_SCHEME {
            return Err(AuthError::InvalidTokenScheme.into());
        }

        let claims = self.jwt.validate_token(token).map_err(AuthError::from)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::Argon2Verifier;
    use crate::config::AuthConfig;
    use crate::database::MemoryUserStore;
    use chrono::Duration;

    fn fixture() -> (AuthService, Arc<MemoryUserStore>) {
        let users = Arc::new(MemoryUserStore::new());
        let passwords = Arc::new(Argon2Verifier::with_params(8, 1, 1).unwrap());
        let jwt = Arc::new(JwtService::new(&AuthConfig::new(
            "test-secret",
            Duration::seconds(60),
        )));
        (AuthService::new(users.clone(), passwords, jwt), users)
    }

    fn signup_request(username: &str, password: &str, nickname: &str) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
        }
    }

    fn auth_error(err: AppError) -> AuthError {
        match err {
            AppError::Auth(auth) => auth,
            other => panic!("expected an auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signup_stores_hashed_password() {
        let (service, users) = fixture();
        let user = service
            .signup(signup_request("u1", "p1", "n1"))
            .await
            .unwrap();

        let stored = users.find_by_username("u1").await.unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        assert_ne!(stored.password_hash, "p1");
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let (service, _) = fixture();
        service.signup(signup_request("u1", "p1", "n1")).await.unwrap();

        let err = service
            .signup(signup_request("u1", "p2", "n2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn empty_fields_are_invalid() {
        let (service, _) = fixture();
        let err = service.signup(signup_request("", "p1", "n1")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn login_token_resolves_to_same_user() {
        let (service, _) = fixture();
        let user = service.signup(signup_request("u1", "p1", "n1")).await.unwrap();

        let issued = service.login("u1", "p1").await.unwrap();
        let current = service
            .verify_credential(&format!("Bearer {}", issued.token))
            .await
            .unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.username, "u1");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_identically() {
        let (service, _) = fixture();
        service.signup(signup_request("u1", "p1", "n1")).await.unwrap();

        let wrong_password = auth_error(service.login("u1", "nope").await.unwrap_err());
        let unknown_user = auth_error(service.login("ghost", "p1").await.unwrap_err());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let (service, _) = fixture();
        for credential in ["Basic abc", "bearer abc", "token", ""] {
            let err = auth_error(service.verify_credential(credential).await.unwrap_err());
            assert!(matches!(err, AuthError::InvalidTokenScheme), "{credential}");
        }
    }

    #[tokio::test]
    async fn bearer_without_token_is_malformed() {
        let (service, _) = fixture();
        for credential in ["Bearer", "Bearer ", "Bearer garbage"] {
            let err = auth_error(service.verify_credential(credential).await.unwrap_err());
            assert!(matches!(err, AuthError::TokenMalformed), "{credential}");
        }
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let (service, _) = fixture();
        let user = service.signup(signup_request("u1", "p1", "n1")).await.unwrap();
        let issued = service.jwt().issue(user.id, Duration::seconds(-5)).unwrap();

        let err = auth_error(
            service
                .verify_credential(&format!("Bearer {}", issued.token))
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn deleted_user_is_not_authenticated() {
        let (service, users) = fixture();
        let user = service.signup(signup_request("u1", "p1", "n1")).await.unwrap();
        let issued = service.login("u1", "p1").await.unwrap();
        users.remove(user.id);

        let err = auth_error(
            service
                .verify_credential(&format!("Bearer {}", issued.token))
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
