use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{User, UserCreate, UserPatch};
use crate::validation;

impl Entity for User {
    const KIND: &'static str = "User";

    type Id = String;
    type CreateParams = UserCreate;
    type Patch = UserPatch;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new User from creation parameters.
    ///
    /// Name and email are re-checked here so the store never holds an account
    /// that would fail signup validation.
    fn from_create_params(id: String, params: UserCreate) -> Result<Self, String> {
        let now = Utc::now();
        Ok(Self {
            id,
            full_name: validation::required_text(&params.full_name, "Name", validation::MAX_FULL_NAME_LEN)?,
            email: validation::email(&params.email)?,
            password_hash: params.password_hash,
            role: params.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Emails are unique across accounts.
    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }

    fn on_update(&mut self, patch: UserPatch) -> Result<(), String> {
        if let Some(full_name) = patch.full_name {
            self.full_name = validation::required_text(&full_name, "Name", validation::MAX_FULL_NAME_LEN)?;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Currently, no custom actions are defined for users.
    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Ok(())
    }
}
