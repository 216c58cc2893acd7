use crate::{
    models::{NewUser, ProfileImage, User, UserRole},
    utils::{ValidationErrors, ValidatorKind},
};
use lazy_static::lazy_static;
use regex::Regex;

pub const USER_NAME_MIN: usize = 3;
pub const USER_NAME_MAX: usize = 40;
pub const PASSWORD_MIN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_.-]+@([A-Za-z0-9_-]+\.)+[A-Za-z0-9_-]{2,4}$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^[6-9][0-9]{9}$").unwrap();
    static ref IFSC_RE: Regex = Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_ifsc(code: &str) -> bool {
    IFSC_RE.is_match(code)
}

/// Borrowed view of the validated fields, shared by typed records and raw input.
/// `password` is `None` when the password is not being written.
struct UserFields<'a> {
    user_name: Option<&'a str>,
    password: Option<Option<&'a str>>,
    email: Option<&'a str>,
    phone: Option<&'a str>,
    profile_image: &'a ProfileImage,
    ifsc_code: Option<&'a str>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn check_required<'a>(
    errors: &mut ValidationErrors,
    path: &str,
    value: Option<&'a str>,
    message: &str,
) -> Option<&'a str> {
    let value = present(value);
    if value.is_none() {
        errors.add(path, ValidatorKind::Required, message);
    }
    value
}

fn check_pattern(
    errors: &mut ValidationErrors,
    path: &str,
    value: Option<&str>,
    matches: fn(&str) -> bool,
    message: &str,
) {
    if let Some(value) = present(value) {
        if !matches(value) {
            errors.add(path, ValidatorKind::Regexp, message);
        }
    }
}

/// Length in UTF-16 code units, as browsers and JS runtimes count it
fn text_length(value: &str) -> usize {
    value.encode_utf16().count()
}

fn check_fields(fields: &UserFields<'_>, errors: &mut ValidationErrors) {
    if let Some(name) = check_required(errors, "userName", fields.user_name, "Username is required") {
        let len = text_length(name);
        if len < USER_NAME_MIN {
            errors.add(
                "userName",
                ValidatorKind::MinLength,
                "Username must contain at least 3 characters",
            );
        } else if len > USER_NAME_MAX {
            errors.add(
                "userName",
                ValidatorKind::MaxLength,
                "Username cannot exceed 40 characters",
            );
        }
    }

    if let Some(password) = fields.password {
        if let Some(password) = check_required(errors, "password", password, "Password is required") {
            if text_length(password) < PASSWORD_MIN {
                errors.add(
                    "password",
                    ValidatorKind::MinLength,
                    "Password must contain at least 8 characters",
                );
            }
        }
    }

    if check_required(errors, "email", fields.email, "Email is required").is_some() {
        check_pattern(errors, "email", fields.email, is_valid_email, "Please enter a valid email");
    }

    if check_required(errors, "phone", fields.phone, "Phone number is required").is_some() {
        check_pattern(
            errors,
            "phone",
            fields.phone,
            is_valid_phone,
            "Please enter a valid 10-digit Indian mobile number",
        );
    }

    check_required(
        errors,
        "profileImage.public_id",
        Some(fields.profile_image.public_id.as_str()),
        "Path `profileImage.public_id` is required.",
    );
    check_required(
        errors,
        "profileImage.url",
        Some(fields.profile_image.url.as_str()),
        "Path `profileImage.url` is required.",
    );

    check_pattern(
        errors,
        "paymentMethods.bankTransfer.ifscCode",
        fields.ifsc_code,
        is_valid_ifsc,
        "Invalid IFSC code",
    );
}

fn check_role(errors: &mut ValidationErrors, role: Option<&str>) -> Option<UserRole> {
    match present(role) {
        None => {
            errors.add("role", ValidatorKind::Required, "Path `role` is required.");
            None
        }
        Some(raw) => match raw.parse::<UserRole>() {
            Ok(role) => Some(role),
            Err(value) => {
                errors.add(
                    "role",
                    ValidatorKind::Enum,
                    format!("`{}` is not a valid enum value for path `role`.", value),
                );
                None
            }
        },
    }
}

/// Validates a typed record before it is written.
///
/// The password is checked only while it still holds plaintext (new record or
/// changed in memory); a stored hash or a password left out of the read is skipped.
pub fn validate_user(user: &User) -> Result<(), ValidationErrors> {
    let password = if user.is_new() || user.is_password_modified() {
        Some(user.password())
    } else {
        None
    };

    let fields = UserFields {
        user_name: Some(user.user_name.as_str()),
        password,
        email: Some(user.email.as_str()),
        phone: Some(user.phone.as_str()),
        profile_image: &user.profile_image,
        ifsc_code: user.payment_methods.bank_transfer.ifsc_code.as_deref(),
    };

    let mut errors = ValidationErrors::new();
    check_fields(&fields, &mut errors);
    errors.into_result()
}

/// Validates registration input and builds the unsaved record with schema defaults
pub fn build_user(new_user: NewUser) -> Result<User, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let fields = UserFields {
        user_name: new_user.user_name.as_deref(),
        password: Some(new_user.password.as_deref()),
        email: new_user.email.as_deref(),
        phone: new_user.phone.as_deref(),
        profile_image: &new_user.profile_image,
        ifsc_code: new_user.payment_methods.bank_transfer.ifsc_code.as_deref(),
    };
    check_fields(&fields, &mut errors);
    let role = check_role(&mut errors, new_user.role.as_deref());

    match role {
        Some(role) if errors.is_empty() => Ok(User::from_new(new_user, role)),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BankTransfer;

    fn valid_input() -> NewUser {
        NewUser {
            user_name: Some("Asha Kumari".to_string()),
            password: Some("correct-horse".to_string()),
            email: Some("asha.k@example.in".to_string()),
            address: Some("12 MG Road, Bengaluru".to_string()),
            phone: Some("9123456780".to_string()),
            profile_image: ProfileImage {
                public_id: "avatars/asha".to_string(),
                url: "https://cdn.example.com/asha.png".to_string(),
            },
            role: Some("Auctioneer".to_string()),
            ..Default::default()
        }
    }

    fn errors_for(input: NewUser) -> ValidationErrors {
        build_user(input).expect_err("input should be rejected")
    }

    #[test]
    fn accepts_valid_input() {
        let user = build_user(valid_input()).unwrap();
        assert_eq!(user.role, UserRole::Auctioneer);
        assert_eq!(user.user_name, "Asha Kumari");
        assert!(validate_user(&user).is_ok());
    }

    #[test]
    fn rejects_short_passwords() {
        for password in ["", "a", "1234567", "short!!"] {
            let mut input = valid_input();
            input.password = Some(password.to_string());
            let errors = errors_for(input);
            assert!(errors.has("password"), "password {:?} should fail", password);
        }

        let mut input = valid_input();
        input.password = Some("1234567".to_string());
        let errors = errors_for(input);
        assert_eq!(
            errors.get("password").unwrap().message,
            "Password must contain at least 8 characters"
        );
    }

    #[test]
    fn lengths_count_utf16_code_units() {
        // each emoji is a surrogate pair, so four of them reach the minimum
        let mut input = valid_input();
        input.password = Some("🔑🔑🔑🔑".to_string());
        assert!(build_user(input).is_ok());

        let mut input = valid_input();
        input.password = Some("ééééééé".to_string());
        assert!(errors_for(input).has("password"));

        let mut input = valid_input();
        input.user_name = Some("🦀".repeat(21));
        assert_eq!(
            errors_for(input).get("userName").unwrap().kind,
            ValidatorKind::MaxLength
        );
    }

    #[test]
    fn missing_password_is_required() {
        let mut input = valid_input();
        input.password = None;
        let errors = errors_for(input);
        let err = errors.get("password").unwrap();
        assert_eq!(err.kind, ValidatorKind::Required);
        assert_eq!(err.message, "Password is required");
    }

    #[test]
    fn rejects_invalid_phones() {
        for phone in ["5123456789", "912345678", "91234567890", "+919123456789", "98765x4321", "９１２３４５６７８０"] {
            let mut input = valid_input();
            input.phone = Some(phone.to_string());
            let errors = errors_for(input);
            assert_eq!(
                errors.get("phone").map(|e| e.message.as_str()),
                Some("Please enter a valid 10-digit Indian mobile number"),
                "phone {:?} should fail",
                phone
            );
        }
    }

    #[test]
    fn accepts_every_leading_mobile_digit() {
        for lead in ['6', '7', '8', '9'] {
            assert!(is_valid_phone(&format!("{}000000000", lead)));
        }
    }

    #[test]
    fn rejects_invalid_emails() {
        for email in ["plainaddress", "a@b", "a@b.c", "a@b.toolong", "a b@c.com", "@example.com", "ü@example.com"] {
            let mut input = valid_input();
            input.email = Some(email.to_string());
            let errors = errors_for(input);
            assert_eq!(
                errors.get("email").map(|e| e.message.as_str()),
                Some("Please enter a valid email"),
                "email {:?} should fail",
                email
            );
        }
    }

    #[test]
    fn accepts_common_emails() {
        assert!(is_valid_email("first.last@example.com"));
        assert!(is_valid_email("user-name_1@mail.example.co.in"));
    }

    #[test]
    fn user_name_length_bounds() {
        let mut input = valid_input();
        input.user_name = Some("ab".to_string());
        assert_eq!(
            errors_for(input).get("userName").unwrap().message,
            "Username must contain at least 3 characters"
        );

        let mut input = valid_input();
        input.user_name = Some("x".repeat(41));
        assert_eq!(
            errors_for(input).get("userName").unwrap().message,
            "Username cannot exceed 40 characters"
        );

        let mut input = valid_input();
        input.user_name = Some("x".repeat(40));
        assert!(build_user(input).is_ok());
    }

    #[test]
    fn rejects_unknown_roles() {
        for role in ["Admin", "bidder", "SuperAdmin", "Super  Admin"] {
            let mut input = valid_input();
            input.role = Some(role.to_string());
            let errors = errors_for(input);
            let err = errors.get("role").unwrap();
            assert_eq!(err.kind, ValidatorKind::Enum);
            assert_eq!(
                err.message,
                format!("`{}` is not a valid enum value for path `role`.", role)
            );
        }
    }

    #[test]
    fn accepts_every_defined_role() {
        for role in UserRole::ALL {
            let mut input = valid_input();
            input.role = Some(role.as_str().to_string());
            assert_eq!(build_user(input).unwrap().role, role);
        }
    }

    #[test]
    fn missing_role_is_required() {
        let mut input = valid_input();
        input.role = None;
        assert_eq!(
            errors_for(input).get("role").unwrap().kind,
            ValidatorKind::Required
        );
    }

    #[test]
    fn profile_image_parts_are_required() {
        let mut input = valid_input();
        input.profile_image = ProfileImage::default();
        let errors = errors_for(input);
        assert!(errors.has("profileImage.public_id"));
        assert!(errors.has("profileImage.url"));
    }

    #[test]
    fn ifsc_code_is_checked_only_when_given() {
        let mut input = valid_input();
        input.payment_methods.bank_transfer = BankTransfer {
            ifsc_code: Some("SBIN0001234".to_string()),
            ..Default::default()
        };
        assert!(build_user(input).is_ok());

        let mut input = valid_input();
        input.payment_methods.bank_transfer.ifsc_code = Some("sbin0001234".to_string());
        assert_eq!(
            errors_for(input)
                .get("paymentMethods.bankTransfer.ifscCode")
                .unwrap()
                .message,
            "Invalid IFSC code"
        );
    }

    #[test]
    fn reports_every_failing_field_once() {
        let errors = errors_for(NewUser::default());
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "userName",
                "password",
                "email",
                "phone",
                "profileImage.public_id",
                "profileImage.url",
                "role",
            ]
        );
        assert!(errors.iter().all(|e| e.kind == ValidatorKind::Required));
    }

    #[test]
    fn stored_hash_is_not_revalidated() {
        let mut user = build_user(valid_input()).unwrap();
        user.store_password_hash("$2b$10$hash".to_string());
        user.mark_persisted();
        assert!(validate_user(&user).is_ok());

        let user = user.without_password();
        assert!(validate_user(&user).is_ok());
    }

    #[test]
    fn changed_password_is_revalidated() {
        let mut user = build_user(valid_input()).unwrap();
        user.mark_persisted();
        user.set_password("short");
        assert!(validate_user(&user).unwrap_err().has("password"));
    }
}
