/// Registration input as it arrives from the caller, before trimming.
/// `None` means the field was missing from the request.
#[derive(Debug, Default)]
pub struct RegistrationInput<'a> {
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub grade_section: Option<&'a str>,
    pub lrn: Option<&'a str>,
    pub adviser: Option<&'a str>,
    pub qr_code_in: Option<&'a str>,
    pub qr_code_out: Option<&'a str>,
}

/// Returns every violation, not just the first, so the caller can surface
/// the full list in one round trip.
pub fn validate_registration(input: &RegistrationInput<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    match input.email {
        None | Some("") => errors.push("Email is required".to_string()),
        Some(email) if !is_valid_email(email) => {
            errors.push("Invalid email format".to_string());
        }
        Some(_) => {}
    }

    match input.name.map(str::trim) {
        None | Some("") => errors.push("Name is required".to_string()),
        Some(name) if name.len() > 100 => {
            errors.push("Name too long (max 100 characters)".to_string());
        }
        Some(_) => {}
    }

    match input.lrn {
        None | Some("") => errors.push("LRN is required".to_string()),
        Some(lrn) if !is_valid_lrn(lrn) => {
            errors.push("Invalid LRN format (must be 11-12 digits)".to_string());
        }
        Some(_) => {}
    }

    let has_in = input.qr_code_in.map(|s| !s.is_empty()).unwrap_or(false);
    let has_out = input.qr_code_out.map(|s| !s.is_empty()).unwrap_or(false);
    if !has_in || !has_out {
        errors.push("QR codes are required".to_string());
    }

    if let Some(section) = input.grade_section {
        if section.len() > 50 {
            errors.push("Grade section too long (max 50 characters)".to_string());
        }
    }
    if let Some(adviser) = input.adviser {
        if adviser.len() > 100 {
            errors.push("Adviser name too long (max 100 characters)".to_string());
        }
    }

    errors
}

/// Shape check only: `local@domain.tld`, no whitespace, one `@`.
pub fn is_valid_email(s: &str) -> bool {
    if s.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Learner Reference Number: 11 or 12 ASCII digits, nothing else.
pub fn is_valid_lrn(s: &str) -> bool {
    (11..=12).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

pub fn sanitize(s: &str) -> String {
    s.trim().to_string()
}
