use std::collections::BTreeMap;

use crate::api::ApiError;

/// A failed signup, flattened for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupErrorReport {
    /// First server message per wire field name
    pub field_errors: BTreeMap<String, String>,
    pub message: String,
}

/// Turn a signup failure into a readable summary.
///
/// A `{field: [messages]}` error body becomes one line per field, in body
/// order, under a `Signup failed:` heading.
pub fn format_signup_errors(err: &ApiError) -> SignupErrorReport {
    let fallback = match err {
        ApiError::Status { .. } => "Signup failed".to_string(),
        ApiError::Transport(e) => e.to_string(),
        _ => {
            return SignupErrorReport {
                field_errors: BTreeMap::new(),
                message: "An unexpected error occurred during signup".to_string(),
            }
        }
    };

    let mut field_errors = BTreeMap::new();
    let mut lines = Vec::new();

    if let Some(fields) = err.body().and_then(serde_json::Value::as_object) {
        for (field, messages) in fields {
            let Some(messages) = messages.as_array() else {
                continue;
            };
            let messages: Vec<String> = messages
                .iter()
                .map(|m| match m.as_str() {
                    Some(s) => s.to_string(),
                    None => m.to_string(),
                })
                .collect();
            let Some(first) = messages.first() else {
                continue;
            };

            field_errors.insert(field.clone(), first.clone());
            lines.push(format!("{}: {}", field_label(field), messages.join(", ")));
        }
    }

    let message = if lines.is_empty() {
        fallback
    } else {
        format!("Signup failed:\n{}", lines.join("\n"))
    };

    SignupErrorReport {
        field_errors,
        message,
    }
}

fn field_label(field: &str) -> String {
    let known = match field {
        "email" => "Email",
        "password" => "Password",
        "phone" => "Phone",
        "fullName" => "Full Name",
        "birthday" => "Birthday",
        "birthDay" => "Birth Day",
        "birthMonth" => "Birth Month",
        "birthYear" => "Birth Year",
        _ => "",
    };
    if !known.is_empty() {
        return known.to_string();
    }

    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn bad_request(body: &str) -> ApiError {
        ApiError::from_response(StatusCode::BAD_REQUEST, body.as_bytes())
    }

    #[test]
    fn test_field_errors_in_body_order() {
        let err = bad_request(
            r#"{"phone":["Phone is taken"],"email":["Enter a valid email.","Email exists."],"fullName":[]}"#,
        );
        let report = format_signup_errors(&err);

        assert_eq!(
            report.message,
            "Signup failed:\nPhone: Phone is taken\nEmail: Enter a valid email., Email exists."
        );
        assert_eq!(report.field_errors.len(), 2);
        assert_eq!(report.field_errors["email"], "Enter a valid email.");
    }

    #[test]
    fn test_unknown_fields_are_humanized() {
        let err = bad_request(r#"{"non_field_errors":["Try again"],"birthYear":["Too old"]}"#);
        let report = format_signup_errors(&err);
        assert_eq!(
            report.message,
            "Signup failed:\nNon field errors: Try again\nBirth Year: Too old"
        );
    }

    #[test]
    fn test_body_without_field_lists() {
        let report = format_signup_errors(&bad_request(r#"{"message":"Bad","status":400}"#));
        assert_eq!(report.message, "Signup failed");
        assert!(report.field_errors.is_empty());

        let report = format_signup_errors(&bad_request("not json"));
        assert_eq!(report.message, "Signup failed");
    }

    #[test]
    fn test_non_http_failure() {
        let report = format_signup_errors(&ApiError::RefreshAbandoned);
        assert_eq!(report.message, "An unexpected error occurred during signup");
    }
}
