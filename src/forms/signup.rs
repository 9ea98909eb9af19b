use chrono::{Datelike, Local, NaiveDate};

use super::{is_valid_email, shorter_than, ValidationErrors, MIN_FULL_NAME_LEN, MIN_PASSWORD_LEN};
use crate::services::auth::SignupRequest;

const MIN_SIGNUP_PHONE_LEN: usize = 10;

/// Raw signup form input. The birth date is entered as three text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub birth_day: String,
    pub birth_month: String,
    pub birth_year: String,
    pub confirm_password: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub phone: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupRequest, ValidationErrors> {
        self.validate_on(Local::now().date_naive())
    }

    /// Validate against `today`, producing the request with a
    /// `YYYY-MM-DD` birthday.
    pub fn validate_on(&self, today: NaiveDate) -> Result<SignupRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !is_valid_email(&self.email) {
            errors.add("email", "Invalid email address.");
        }
        if shorter_than(&self.password, MIN_PASSWORD_LEN) {
            errors.add("password", "Password must be at least 6 characters.");
        }
        if shorter_than(&self.phone, MIN_SIGNUP_PHONE_LEN) {
            errors.add("phone", "Please enter a valid phone number.");
        }
        if shorter_than(&self.full_name, MIN_FULL_NAME_LEN) {
            errors.add("fullName", "Full name is required.");
        }

        let day = two_digits(&self.birth_day).filter(|d| (1..=31).contains(d));
        if day.is_none() {
            errors.add("birthDay", "Invalid day");
        }
        let month = two_digits(&self.birth_month).filter(|m| (1..=12).contains(m));
        if month.is_none() {
            errors.add("birthMonth", "Invalid month");
        }
        let year = four_digits(&self.birth_year);
        match year {
            None => errors.add("birthYear", "Invalid year"),
            Some(y) if y > today.year() => {
                errors.add("birthYear", "Birth year cannot be in the future")
            }
            Some(_) => {}
        }

        if self.password != self.confirm_password {
            errors.add("confirmPassword", "Passwords do not match.");
        }

        let birthday = match (year, month, day) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        };
        if birthday.is_none() && year.is_some() && month.is_some() && day.is_some() {
            errors.add("birthYear", "Please enter a valid birth date.");
        }

        errors.finish(|| SignupRequest {
            birthday: birthday
                .map(|b| b.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            password: self.password.clone(),
            phone: self.phone.clone(),
        })
    }
}

fn two_digits(value: &str) -> Option<u32> {
    (value.len() == 2 && value.bytes().all(|b| b.is_ascii_digit()))
        .then(|| value.parse().ok())
        .flatten()
}

fn four_digits(value: &str) -> Option<i32> {
    (value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()))
        .then(|| value.parse().ok())
        .flatten()
}
