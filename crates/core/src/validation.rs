//! Client-side form validation
//!
//! Checks run before any request is made. A form that fails validation never
//! reaches the session store.

use crate::types::RegisterData;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is a valid regex"));

/// Characters that satisfy the special-character rule
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Minimum password length for new passwords
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Form field a validation message is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    FirstName,
    LastName,
    Token,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation messages keyed by field, in the order they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<(Field, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; a field keeps only its first message
    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push((field, message.into()));
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Which strength criteria a password meets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordStrength {
    pub has_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_number: bool,
    pub has_special: bool,
}

impl PasswordStrength {
    pub fn of(password: &str) -> Self {
        Self {
            has_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            has_lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
            has_number: password.chars().any(|c| c.is_ascii_digit()),
            has_special: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
        }
    }

    pub fn is_strong(&self) -> bool {
        self.has_length
            && self.has_uppercase
            && self.has_lowercase
            && self.has_number
            && self.has_special
    }

    /// Criteria with their labels, for rendering a checklist
    pub fn checklist(&self) -> [(&'static str, bool); 5] {
        [
            ("At least 8 characters", self.has_length),
            ("One uppercase letter", self.has_uppercase),
            ("One lowercase letter", self.has_lowercase),
            ("One number", self.has_number),
            ("One special character", self.has_special),
        ]
    }
}

/// Whether the value looks like an email address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn check_email(errors: &mut FieldErrors, email: &str, invalid_message: &str) {
    if email.is_empty() {
        errors.add(Field::Email, "Email is required");
    } else if !is_valid_email(email) {
        errors.add(Field::Email, invalid_message);
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.add(Field::Password, "Password is required");
    } else if !PasswordStrength::of(password).is_strong() {
        errors.add(Field::Password, "Password does not meet requirements");
    }

    if confirm.is_empty() {
        errors.add(Field::ConfirmPassword, "Please confirm your password");
    } else if password != confirm {
        errors.add(Field::ConfirmPassword, "Passwords do not match");
    }
}

/// Sign-in form
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email, "Please enter a valid email");
        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required");
        }
        errors.into_result()
    }
}

/// Account creation form
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.first_name.trim().is_empty() {
            errors.add(Field::FirstName, "First name is required");
        }
        if self.last_name.trim().is_empty() {
            errors.add(Field::LastName, "Last name is required");
        }
        check_email(&mut errors, &self.email, "Please enter a valid email");
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors.into_result()
    }

    /// Validate and build the registration payload, trimming the names
    pub fn into_register_data(self) -> Result<RegisterData, FieldErrors> {
        self.validate()?;
        Ok(RegisterData {
            email: self.email,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password,
        })
    }
}

/// Password reset request form
#[derive(Debug, Clone, Default)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email, "Please enter a valid email address");
        errors.into_result()
    }
}

/// New password form reached from the reset link
#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.token.is_empty() {
            errors.add(Field::Token, "Invalid or missing reset token");
        }
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors.into_result()
    }
}
