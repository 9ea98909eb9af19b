use chrono::{Datelike, Local, NaiveDate};

use super::{is_valid_email, shorter_than, ValidationErrors, MIN_FULL_NAME_LEN, MIN_PASSWORD_LEN};
use crate::services::auth::UpdateUserRequest;
use crate::storage::models::Account;

const MIN_PROFILE_PHONE_LEN: usize = 6;

/// Optional password change. Left entirely blank it is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChange {
    pub confirm_new_password: String,
    pub new_password: String,
    pub old_password: String,
}

impl PasswordChange {
    pub fn is_blank(&self) -> bool {
        self.old_password.is_empty()
            && self.new_password.is_empty()
            && self.confirm_new_password.is_empty()
    }
}

/// Profile edit form, prefilled from the signed-in account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// `YYYY-MM-DD`
    pub birthday: String,
    pub email: String,
    pub full_name: String,
    pub password: PasswordChange,
    pub phone: String,
}

impl ProfileForm {
    pub fn from_account(account: &Account) -> Self {
        Self {
            birthday: account.birthday.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            password: PasswordChange::default(),
            phone: account.phone.clone(),
        }
    }

    /// True when any field differs from `account` or a password change was
    /// started
    pub fn is_changed(&self, account: &Account) -> bool {
        self.full_name != account.full_name
            || self.phone != account.phone
            || self.birthday != account.birthday
            || !self.password.is_blank()
    }

    pub fn validate(&self) -> Result<UpdateUserRequest, ValidationErrors> {
        self.validate_on(Local::now().date_naive())
    }

    /// Validate against `today`, producing the profile update. The e-mail
    /// is checked but not sent; the password pair is sent only when both
    /// old and new passwords are given.
    pub fn validate_on(&self, today: NaiveDate) -> Result<UpdateUserRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !is_valid_email(&self.email) {
            errors.add("email", "Invalid email address.");
        }
        if shorter_than(&self.phone, MIN_PROFILE_PHONE_LEN) {
            errors.add("phone", "Please enter a valid phone number.");
        }
        if shorter_than(&self.full_name, MIN_FULL_NAME_LEN) {
            errors.add("fullName", "Full name is required.");
        }

        if !is_iso_date_shape(&self.birthday) {
            errors.add("birthday", "Birthday must be in YYYY-MM-DD format");
        } else {
            match NaiveDate::parse_from_str(&self.birthday, "%Y-%m-%d") {
                Err(_) => errors.add("birthday", "Invalid date. Please enter a real date."),
                Ok(date) if date.year() > today.year() => {
                    errors.add("birthday", "Birth year cannot be in the future")
                }
                Ok(_) => {}
            }
        }

        let password = &self.password;
        if !password.is_blank() {
            const TOO_SHORT: &str = "Password must be at least 6 characters.";
            if shorter_than(&password.old_password, MIN_PASSWORD_LEN) {
                errors.add("password.oldPassword", TOO_SHORT);
            }
            if shorter_than(&password.new_password, MIN_PASSWORD_LEN) {
                errors.add("password.newPassword", TOO_SHORT);
            }
            if shorter_than(&password.confirm_new_password, MIN_PASSWORD_LEN) {
                errors.add("password.confirmNewPassword", TOO_SHORT);
            }
            if password.new_password != password.confirm_new_password {
                errors.add("password.confirmNewPassword", "Passwords do not match.");
            }
        }

        errors.finish(|| {
            let change_password =
                !password.old_password.is_empty() && !password.new_password.is_empty();
            UpdateUserRequest {
                birthday: Some(self.birthday.clone()),
                email: None,
                full_name: Some(self.full_name.clone()),
                new_password: change_password.then(|| password.new_password.clone()),
                old_password: change_password.then(|| password.old_password.clone()),
                phone: Some(self.phone.clone()),
            }
        })
    }
}

fn is_iso_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
