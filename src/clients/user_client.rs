use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::actor_framework::ResourceClient;
use crate::domain::{LoginRequest, Role, SignupRequest, User, UserCreate, UserPatch, UserProfile};
use crate::user_actor::password::{hash_password, verify_password};
use crate::user_actor::UserError;
use crate::validation;

/// Client for the user store: signup, login and profile edits.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
}

impl UserClient {
    /// Registers a new account.
    ///
    /// # Errors
    /// `ValidationError` for bad input, `AlreadyExists` when the email is taken.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<UserProfile, UserError> {
        let signup = request.validate().map_err(UserError::ValidationError)?;

        // Argon2 is deliberately slow; keep it off the async workers.
        let password = signup.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| UserError::PasswordHash(e.to_string()))?
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;

        let payload = UserCreate {
            full_name: signup.full_name,
            email: signup.email,
            password_hash,
            role: Role::User,
        };
        let user = self.inner.create(Uuid::new_v4().to_string(), payload).await.map_err(|e| {
            warn!(error = %e, "Signup rejected");
            UserError::from(e)
        })?;

        info!(user_id = %user.id, "User signed up");
        Ok(UserProfile::from(&user))
    }

    /// Checks credentials and returns the account's public profile.
    ///
    /// Unknown email and wrong password produce the same error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<UserProfile, UserError> {
        let email = validation::email(&request.email).map_err(|_| UserError::InvalidCredentials)?;
        let user = self
            .find_users(move |u| u.email == email)
            .await?
            .into_iter()
            .next()
            .ok_or(UserError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let password = request.password;
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;
        if !verified {
            warn!("Login failed");
            return Err(UserError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "Login to deactivated account");
            return Err(UserError::Inactive);
        }

        info!(user_id = %user.id, "User logged in");
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self))]
    pub async fn update_user(&self, id: String, patch: UserPatch) -> Result<UserProfile, UserError> {
        let user = self.inner.update(id, patch).await?;
        info!(user_id = %user.id, "User updated");
        Ok(UserProfile::from(&user))
    }

    /// Resolves the display name stored on products and orders.
    pub async fn display_name(&self, id: &str) -> Result<Option<String>, UserError> {
        Ok(self.get_user(id.to_string()).await?.map(|u| u.full_name))
    }
}

crate::impl_basic_client!(UserClient, User, UserError, user);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;

    fn start() -> UserClient {
        let (actor, client) = ResourceActor::<User>::new(16);
        tokio::spawn(actor.run());
        UserClient::new(client)
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            full_name: " Alice Doe ".into(),
            email: email.into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let users = start();
        let profile = users.signup(signup("Alice@Example.com")).await.unwrap();
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.full_name, "Alice Doe");
        assert_eq!(profile.role, Role::User);

        let logged_in = users
            .login(LoginRequest { email: "ALICE@example.com".into(), password: "secret1".into() })
            .await
            .unwrap();
        assert_eq!(logged_in.id, profile.id);
        assert_eq!(users.display_name(&profile.id).await.unwrap().as_deref(), Some("Alice Doe"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let users = start();
        users.signup(signup("a@b.co")).await.unwrap();
        let err = users.signup(signup(" A@B.CO ")).await.unwrap_err();
        assert!(matches!(err, UserError::AlreadyExists(_)));
        assert_eq!(err.to_string(), "User with this email already exists");
    }

    #[tokio::test]
    async fn test_bad_credentials_and_inactive() {
        let users = start();
        let profile = users.signup(signup("a@b.co")).await.unwrap();

        let wrong = LoginRequest { email: "a@b.co".into(), password: "nope!!".into() };
        assert_eq!(users.login(wrong).await, Err(UserError::InvalidCredentials));
        let unknown = LoginRequest { email: "x@y.zz".into(), password: "secret1".into() };
        assert_eq!(users.login(unknown).await, Err(UserError::InvalidCredentials));

        users
            .update_user(profile.id, UserPatch { is_active: Some(false), ..Default::default() })
            .await
            .unwrap();
        let right = LoginRequest { email: "a@b.co".into(), password: "secret1".into() };
        assert_eq!(users.login(right).await, Err(UserError::Inactive));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let users = start();
        let mut request = signup("not-an-email");
        assert!(matches!(users.signup(request.clone()).await, Err(UserError::ValidationError(_))));
        request.email = "a@b.co".into();
        request.password = "123".into();
        assert!(matches!(users.signup(request).await, Err(UserError::ValidationError(_))));
    }
}
