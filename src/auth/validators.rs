// src/auth/validators.rs

use super::models::LoginRequest;
use crate::common::{ValidationResult, Validator};

const MAX_EMAIL_LEN: usize = 254;

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.email.as_deref().map(str::trim) {
            None | Some("") => result.add_error("email", "Email and password required"),
            Some(email) if !looks_like_email(email) => {
                result.add_error("email", "Enter a valid email address")
            }
            Some(_) => {}
        }

        if data.password.as_deref().map_or(true, str::is_empty) {
            result.add_error("password", "Email and password required");
        }

        result
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
