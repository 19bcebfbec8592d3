//! Field and uniqueness rules for user payloads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateArgs, ValidationError, ValidationErrors};

use crate::config::{NicknameRule, UserRules};
use crate::crypto::PasswordPolicy;
use crate::error::Result;
use crate::user::{Field, UserStore};

/// Raw body of a create or update request.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
#[validate(context = NicknameRule)]
pub struct UserPayload {
    pub id: Option<i64>,
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, message = "The name field is required.")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "The nickname field is required."),
        custom(function = "validate_nickname", use_context)
    )]
    pub nickname: Option<String>,
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl UserPayload {
    /// Trim strings and canonicalize case. Passwords are left untouched.
    fn normalize(mut self, rule: &NicknameRule) -> Self {
        fn trim(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_owned())
        }

        self.name = trim(self.name);
        self.nickname = trim(self.nickname).map(|nickname| {
            if rule.lowercase {
                nickname.to_lowercase()
            } else {
                nickname
            }
        });
        self.email = trim(self.email).map(|email| email.to_lowercase());
        self
    }
}

fn validate_nickname(
    nickname: &str,
    rule: &NicknameRule,
) -> std::result::Result<(), ValidationError> {
    let length = nickname.chars().count();

    if length < rule.min || length > rule.max {
        let message = format!(
            "The nickname must be between {} and {} characters.",
            rule.min, rule.max
        );
        return Err(ValidationError::new("length").with_message(message.into()));
    }

    Ok(())
}

/// Error reported when `field` is held by another user.
pub fn taken(field: Field) -> ValidationError {
    ValidationError::new("unique")
        .with_message(format!("The {field} has already been taken.").into())
}

/// Operation a payload is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    /// Update of the user with this id.
    Update(i64),
}

impl Mode {
    fn target(self) -> Option<i64> {
        match self {
            Mode::Create => None,
            Mode::Update(id) => Some(id),
        }
    }
}

/// Payload accepted by [`UserValidator`], safe to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUser {
    pub name: String,
    pub nickname: String,
    pub email: String,
    /// Plain password, only set for [`Mode::Create`].
    pub password: Option<String>,
}

/// Checks user payloads against the configured rules.
#[derive(Clone)]
pub struct UserValidator {
    rules: UserRules,
    policy: Arc<dyn PasswordPolicy>,
}

impl UserValidator {
    /// Create a new [`UserValidator`].
    pub fn new(rules: UserRules, policy: Arc<dyn PasswordPolicy>) -> Self {
        Self { rules, policy }
    }

    /// Validate `payload` for `mode`.
    ///
    /// Every rule is evaluated and every failure reported. Uniqueness of a
    /// field is only looked up once its format is valid. The store is
    /// only read.
    pub async fn validate(
        &self,
        store: &dyn UserStore,
        payload: UserPayload,
        mode: Mode,
    ) -> Result<NormalizedUser> {
        let payload = payload.normalize(&self.rules.nickname);
        let mut errors = payload
            .validate_with_args(&self.rules.nickname)
            .err()
            .unwrap_or_else(ValidationErrors::new);

        for (field, value) in [
            (Field::Nickname, payload.nickname.as_deref()),
            (Field::Email, payload.email.as_deref()),
        ] {
            let Some(value) = value else { continue };
            if errors.field_errors().contains_key(field.as_str()) {
                continue;
            }

            if store.exists_by_field(field, value, mode.target()).await? {
                errors.add(field.as_str(), taken(field));
            }
        }

        match mode {
            Mode::Create => match payload.password.as_deref() {
                None | Some("") => errors.add(
                    "password",
                    ValidationError::new("required")
                        .with_message("The password field is required.".into()),
                ),
                Some(password) => {
                    if let Err(message) = self.policy.check(password) {
                        errors.add(
                            "password",
                            ValidationError::new("weak").with_message(message),
                        );
                    }
                },
            },
            Mode::Update(id) => {
                if payload.id.is_some_and(|body_id| body_id != id) {
                    errors.add(
                        "id",
                        ValidationError::new("immutable").with_message(
                            "The id does not match the updated user.".into(),
                        ),
                    );
                }
            },
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(NormalizedUser {
            name: payload.name.unwrap_or_default(),
            nickname: payload.nickname.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            password: match mode {
                Mode::Create => payload.password,
                Mode::Update(_) => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordRule;
    use crate::crypto::DefaultPolicy;
    use crate::error::ServerError;
    use crate::user::{MemoryUserStore, NewUser};

    const MIN: usize = 3;
    const MAX: usize = 12;

    fn validator(lowercase: bool) -> UserValidator {
        let rules = UserRules {
            nickname: NicknameRule {
                min: MIN,
                max: MAX,
                lowercase,
            },
            password: PasswordRule::default(),
        };
        UserValidator::new(rules, Arc::new(DefaultPolicy::new(PasswordRule::default())))
    }

    fn payload(nickname: &str) -> UserPayload {
        UserPayload {
            id: None,
            name: Some("Ann".into()),
            nickname: Some(nickname.into()),
            email: Some("ann@example.com".into()),
            password: Some("correcthorsebattery".into()),
        }
    }

    async fn seeded() -> MemoryUserStore {
        let store = MemoryUserStore::new();
        store
            .create(NewUser {
                name: "Bob".into(),
                nickname: "bob".into(),
                email: "bob@example.com".into(),
                password: "$argon2id$hash".into(),
            })
            .await
            .unwrap();
        store
    }

    /// Field names rejected by the validator.
    fn rejected(result: Result<NormalizedUser>) -> Vec<String> {
        match result {
            Err(ServerError::Validation(errors)) => {
                let mut fields = errors
                    .field_errors()
                    .keys()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>();
                fields.sort();
                fields
            },
            Err(err) => panic!("unexpected error: {err}"),
            Ok(user) => panic!("unexpectedly accepted: {user:?}"),
        }
    }

    #[tokio::test]
    async fn test_accepts_and_normalizes() {
        let store = MemoryUserStore::new();
        let mut body = payload("  ann01 ");
        body.email = Some(" Ann@Example.COM ".into());

        let user = validator(false)
            .validate(&store, body, Mode::Create)
            .await
            .unwrap();

        assert_eq!(user.name, "Ann");
        assert_eq!(user.nickname, "ann01");
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.password.as_deref(), Some("correcthorsebattery"));
    }

    #[tokio::test]
    async fn test_nickname_length_bounds() {
        let store = MemoryUserStore::new();
        let validator = validator(false);

        for length in [MIN, MAX] {
            let nickname = "n".repeat(length);
            let user = validator
                .validate(&store, payload(&nickname), Mode::Create)
                .await
                .unwrap();
            assert_eq!(user.nickname, nickname);
        }

        for length in [MIN - 1, MAX + 1, MAX + 255] {
            let result = validator
                .validate(&store, payload(&"n".repeat(length)), Mode::Create)
                .await;
            assert_eq!(rejected(result), ["nickname"]);
        }

        // Characters are counted, not bytes.
        let user = validator
            .validate(&store, payload(&"é".repeat(MAX)), Mode::Update(1))
            .await
            .unwrap();
        assert_eq!(user.nickname.chars().count(), MAX);
    }

    #[tokio::test]
    async fn test_nickname_taken() {
        let store = seeded().await;
        let validator = validator(false);

        let result = validator.validate(&store, payload("bob"), Mode::Create).await;
        assert_eq!(rejected(result), ["nickname"]);

        let result = validator
            .validate(&store, payload("bob"), Mode::Update(2))
            .await;
        assert_eq!(rejected(result), ["nickname"]);

        // Bob keeps his own nickname.
        let mut body = payload("bob");
        body.email = Some("bob@example.com".into());
        assert!(validator.validate(&store, body, Mode::Update(1)).await.is_ok());

        // Byte-exact by default.
        assert!(validator.validate(&store, payload("Bob"), Mode::Create).await.is_ok());
    }

    #[tokio::test]
    async fn test_lowercase_nickname() {
        let store = seeded().await;

        let result = validator(true)
            .validate(&store, payload("BOB"), Mode::Create)
            .await;
        assert_eq!(rejected(result), ["nickname"]);

        let user = validator(true)
            .validate(&store, payload("Ann01"), Mode::Create)
            .await
            .unwrap();
        assert_eq!(user.nickname, "ann01");
    }

    #[tokio::test]
    async fn test_collects_every_error() {
        let store = seeded().await;
        let body = UserPayload {
            id: None,
            name: Some("   ".into()),
            nickname: Some("x".into()),
            email: Some("not-an-email".into()),
            password: None,
        };

        let result = validator(false).validate(&store, body, Mode::Create).await;
        assert_eq!(rejected(result), ["email", "name", "nickname", "password"]);

        let result = validator(false)
            .validate(&store, UserPayload::default(), Mode::Update(1))
            .await;
        assert_eq!(rejected(result), ["email", "name", "nickname"]);
    }

    #[tokio::test]
    async fn test_email_taken() {
        let store = seeded().await;
        let mut body = payload("ann01");
        body.email = Some("BOB@example.com".into());

        let result = validator(false).validate(&store, body, Mode::Create).await;
        assert_eq!(rejected(result), ["email"]);
    }

    #[tokio::test]
    async fn test_password_policy_on_create_only() {
        let store = MemoryUserStore::new();
        let mut body = payload("ann01");
        body.password = Some("weak".into());

        let result = validator(false)
            .validate(&store, body.clone(), Mode::Create)
            .await;
        assert_eq!(rejected(result), ["password"]);

        let user = validator(false)
            .validate(&store, body, Mode::Update(1))
            .await
            .unwrap();
        assert_eq!(user.password, None);
    }

    #[tokio::test]
    async fn test_update_id_mismatch() {
        let store = seeded().await;
        let mut body = payload("bobby");
        body.id = Some(7);

        let result = validator(false).validate(&store, body, Mode::Update(1)).await;
        assert_eq!(rejected(result), ["id"]);
    }
}
