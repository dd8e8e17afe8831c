use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use model::user::{Account, User, EMAIL_MAX_LEN, NAME_MAX_LEN, PASSWORD_MAX_LEN, USERNAME_MAX_LEN};
use serde::Deserialize;
use uuid::Uuid;

use crate::{RequestError, RequestResult};

pub const INVALID_CREDENTIALS: &str = "Invalid username/password";
pub const PASSWORD_MISMATCH: &str = "Passwords did not match.";
pub const USERNAME_TAKEN: &str = "Username is already taken.";

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn check_field(label: &str, value: &str, max_len: usize) -> RequestResult<()> {
    if value.trim().is_empty() {
        Err(RequestError::invalid(format!("{} is required.", label)))
    } else if value.chars().count() > max_len {
        Err(RequestError::invalid(format!(
            "{} must have at most {} characters.",
            label, max_len
        )))
    } else {
        Ok(())
    }
}

impl Registration {
    pub fn validate(&self) -> RequestResult<()> {
        check_field("Username", &self.username, USERNAME_MAX_LEN)?;
        check_field("Password", &self.password, PASSWORD_MAX_LEN)?;
        check_field("Confirm", &self.confirm_password, PASSWORD_MAX_LEN)?;
        check_field("Email", &self.email, EMAIL_MAX_LEN)?;
        check_field("First name", &self.first_name, NAME_MAX_LEN)?;
        check_field("Last name", &self.last_name, NAME_MAX_LEN)?;
        if self.password != self.confirm_password {
            return Err(RequestError::invalid(PASSWORD_MISMATCH));
        }
        Ok(())
    }

    /// Validates the form and hashes the password.
    pub fn into_account(self) -> RequestResult<Account> {
        self.validate()?;
        let password_hash = hash_password(&self.password)?;
        Ok(Account {
            user: User {
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
            },
            password_hash,
        })
    }
}

impl Credentials {
    pub fn validate(&self) -> RequestResult<()> {
        check_field("Username", &self.username, USERNAME_MAX_LEN)?;
        check_field("Password", &self.password, PASSWORD_MAX_LEN)
    }
}

pub fn hash_password(password: &str) -> RequestResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|why| RequestError::Other(why.to_string().into()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(why) => {
            log::warn!("stored password hash can not be parsed: {}", why);
            false
        }
    }
}

pub fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "mechanic".to_owned(),
            password: "hunter22".to_owned(),
            confirm_password: "hunter22".to_owned(),
            email: "mechanic@example.org".to_owned(),
            first_name: "Robin".to_owned(),
            last_name: "Fischer".to_owned(),
        }
    }

    #[test]
    fn hashes_verify_only_the_right_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("correct horse", "not a hash"));
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let mut form = registration();
        form.confirm_password = "hunter23".to_owned();
        match form.validate() {
            Err(RequestError::Invalid(message)) => assert_eq!(message, PASSWORD_MISMATCH),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn registration_enforces_field_lengths() {
        let mut form = registration();
        form.username = "u".repeat(USERNAME_MAX_LEN + 1);
        assert!(matches!(form.validate(), Err(RequestError::Invalid(_))));

        let mut form = registration();
        form.email = " ".to_owned();
        assert!(matches!(form.validate(), Err(RequestError::Invalid(_))));

        let account = registration().into_account().unwrap();
        assert_eq!(account.user.username, "mechanic");
        assert!(verify_password("hunter22", &account.password_hash));
    }

    #[test]
    fn session_tokens_are_unique() {
        assert_ne!(new_session_token(), new_session_token());
        assert_eq!(new_session_token().len(), 32);
    }
}
