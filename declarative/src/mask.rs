//! Masked display of claim values.
//!
//! OTP steps echo the delivery target back to the client so the user
//! knows where to look, but never the full value.

/// Mask an email address, keeping a short local-part prefix and the
/// full domain: `jo****@example.com`.
#[must_use]
pub fn mask_email(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => {
            let keep = local.chars().take(2).collect::<String>();
            format!("{keep}****@{domain}")
        }
        None => "****".to_string(),
    }
}

/// Mask an E.164 phone number, keeping the prefix and the last two
/// digits: `+852****32`.
#[must_use]
pub fn mask_phone(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 6 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_keep_domain() {
        assert_eq!(mask_email("johndoe@example.com"), "jo****@example.com");
        assert_eq!(mask_email("a@example.com"), "a****@example.com");
        assert_eq!(mask_email("not-an-email"), "****");
    }

    #[test]
    fn phones_keep_prefix_and_suffix() {
        assert_eq!(mask_phone("+85298765432"), "+852****32");
        assert_eq!(mask_phone("+123"), "****");
    }
}
