//! Client-side input checks for login and registration
//!
//! Run before any network call so obviously bad input never reaches the
//! backend.

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    FieldRequired(&'static str),

    #[error("{field} must be {expected}")]
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::FieldRequired("Email"));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(ValidationError::InvalidFormat {
            field: "Email",
            expected: "like example@domain.com",
        });
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::FieldRequired("Password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "Password",
            expected: "at least 6 characters",
        });
    }
    Ok(())
}

/// Name-like fields (first name, surname).
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::FieldRequired(field));
    }
    if value.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::InvalidFormat {
            field,
            expected: "at least 2 characters",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert_eq!(validate_email("  "), Err(ValidationError::FieldRequired("Email")));
        assert!(matches!(
            validate_email("ada.example.com"),
            Err(ValidationError::InvalidFormat { field: "Email", .. })
        ));
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email(" ada@example.com ").is_ok());
    }

    #[test]
    fn password_rules() {
        assert_eq!(
            validate_password(""),
            Err(ValidationError::FieldRequired("Password"))
        );
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn name_rules() {
        assert_eq!(
            validate_name("Surname", " "),
            Err(ValidationError::FieldRequired("Surname"))
        );
        assert!(validate_name("Name", "A").is_err());
        assert!(validate_name("Name", "Al").is_ok());
    }

    #[test]
    fn messages_read_naturally() {
        assert_eq!(
            ValidationError::FieldRequired("Email").to_string(),
            "Email is required"
        );
        assert_eq!(
            validate_password("abc").unwrap_err().to_string(),
            "Password must be at least 6 characters"
        );
    }
}
