//! Validation and normalization helpers applied before anything reaches the
//! store. Every function here is pure: it takes text as typed by the user and
//! either vouches for it or rewrites it into the canonical form the database
//! keeps. The store trusts these helpers for format rules and only enforces
//! presence and uniqueness itself.

use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use rand::Rng;
use regex::Regex;

use crate::models::Grade;

/// Hard cap on the whole address (64 local + `@` + 255 domain).
const MAX_EMAIL_LEN: usize = 320;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 255;

/// Characters stripped by [`sanitize_input`] before whitespace is collapsed.
const FORBIDDEN_CHARS: &[char] = &['<', '>', '&', ';', '\'', '"'];

static LOCAL_PART: OnceLock<Regex> = OnceLock::new();
static DOMAIN_PART: OnceLock<Regex> = OnceLock::new();

fn local_part_regex() -> &'static Regex {
    LOCAL_PART.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$")
            .expect("local part pattern is valid")
    })
}

fn domain_part_regex() -> &'static Regex {
    DOMAIN_PART.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
        )
        .expect("domain pattern is valid")
    })
}

/// Check an email address: exactly one `@`, RFC-style length caps on both
/// sides, dot-separated atoms in the local part, and a domain whose labels
/// neither start nor end with a hyphen and that ends in an alphabetic TLD of
/// at least two characters.
pub fn validate_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if domain.contains('@') || local.is_empty() || domain.is_empty() {
        return false;
    }
    if local.len() > MAX_LOCAL_LEN || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    local_part_regex().is_match(local) && domain_part_regex().is_match(domain)
}

/// Keep only digits and plus signs; every other character is noise from
/// user formatting (spaces, hyphens, parentheses).
fn collapse_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '+')
        .collect()
}

/// Promote a local `0XXXXXXXXX` number to its international form. Any other
/// shape passes through untouched.
fn promote_local_prefix(digits: String) -> String {
    if digits.starts_with('0') && digits.len() == 10 {
        format!("+233{}", &digits[1..])
    } else {
        digits
    }
}

/// Check a phone number. Formatting characters are ignored, a local
/// `0XXXXXXXXX` shape counts as its international equivalent, and what
/// remains must be 10 to 15 digits. A plus sign anywhere but the front makes
/// the number invalid.
pub fn validate_phone(phone: &str) -> bool {
    let digits = promote_local_prefix(collapse_phone(phone));
    let rest = digits.strip_prefix('+').unwrap_or(&digits);
    rest.bytes().all(|b| b.is_ascii_digit()) && (10..=15).contains(&rest.len())
}

/// Rewrite a phone number into the canonical `+233-XX-XXX-XXXX` layout.
/// Local `0XXXXXXXXX` and bare nine-digit inputs are promoted to the +233
/// country code first. Numbers that do not land on the thirteen-character
/// international shape are returned as their bare digit run instead of being
/// guessed at.
pub fn format_phone_number(phone: &str) -> String {
    let mut digits = collapse_phone(phone);
    if digits.starts_with('0') && digits.len() == 10 {
        digits = format!("+233{}", &digits[1..]);
    } else if !digits.starts_with('+') && digits.len() == 9 {
        digits = format!("+233{digits}");
    }
    if digits.starts_with("+233") && digits.len() == 13 {
        return format!(
            "{}-{}-{}-{}",
            &digits[..4],
            &digits[4..6],
            &digits[6..9],
            &digits[9..]
        );
    }
    digits
}

/// Check the public student identifier shape: exactly seven ASCII digits.
pub fn validate_student_id(student_id: &str) -> bool {
    student_id.len() == 7 && student_id.bytes().all(|b| b.is_ascii_digit())
}

/// Check that text parses as a number between 0 and 100 inclusive.
pub fn validate_attendance(attendance: &str) -> bool {
    match attendance.trim().parse::<f64>() {
        Ok(value) => (0.0..=100.0).contains(&value),
        Err(_) => false,
    }
}

/// Strip markup and quoting characters, then collapse runs of whitespace to
/// single spaces and trim the ends. Stripping happens first so the collapse
/// also swallows any whitespace the removal exposes, which keeps the function
/// idempotent: running it twice gives the same text as running it once.
pub fn sanitize_input(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|ch| !FORBIDDEN_CHARS.contains(ch))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join the trimmed names with a single space, capitalizing the head of
/// every run of letters and lowercasing the rest. A letter after any
/// non-letter starts a new run, so "mary-jane" comes out as "Mary-Jane".
pub fn format_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", title_case(first_name), title_case(last_name))
}

fn title_case(name: &str) -> String {
    let mut titled = String::with_capacity(name.len());
    let mut word_start = true;
    for ch in name.trim().chars() {
        if ch.is_alphabetic() {
            if word_start {
                titled.extend(ch.to_uppercase());
            } else {
                titled.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            titled.push(ch);
            word_start = true;
        }
    }
    titled
}

/// Produce a candidate student identifier: the admission year followed by a
/// random three-digit sequence, zero-padded. The generator knows nothing
/// about identifiers already in use; callers resolve collisions against the
/// store's unique index and simply draw again.
pub fn generate_student_id(year: Option<i32>) -> String {
    let year = year.unwrap_or_else(|| Utc::now().year());
    let sequence = rand::thread_rng().gen_range(1..=999);
    format!("{year}{sequence:03}")
}

/// Map a numeric score to a letter grade on the fixed 90/80/70/60 scale.
pub fn calculate_grade(score: f64) -> Grade {
    if score >= 90.0 {
        Grade::A
    } else if score >= 80.0 {
        Grade::B
    } else if score >= 70.0 {
        Grade::C
    } else if score >= 60.0 {
        Grade::D
    } else {
        Grade::F
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("ada@example.com"));
        assert!(validate_email("first.last@sub.example.org"));
        assert!(validate_email("user+tag@example.co.uk"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!validate_email(""));
        assert!(!validate_email("plainaddress"));
        assert!(!validate_email("two@@example.com"));
        assert!(!validate_email("a@b@example.com"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user..dots@example.com"));
        assert!(!validate_email(".leading@example.com"));
        assert!(!validate_email("trailing.@example.com"));
        assert!(!validate_email("user@example"));
        assert!(!validate_email("user@-example.com"));
        assert!(!validate_email("user@example-.com"));
        assert!(!validate_email("user@example.c"));
    }

    #[test]
    fn rejects_overlong_emails() {
        let local = "a".repeat(65);
        assert!(!validate_email(&format!("{local}@example.com")));
        assert!(validate_email(&format!("{}@example.com", "a".repeat(64))));

        let domain = format!("{}.com", "a".repeat(300));
        assert!(!validate_email(&format!("user@{domain}")));
    }

    #[test]
    fn validates_phone_shapes() {
        assert!(validate_phone("0545678910"));
        assert!(validate_phone("+233545678910"));
        assert!(validate_phone("+233 54 567 8910"));
        assert!(validate_phone("(054) 567-8910"));
        assert!(!validate_phone(""));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("1234567890123456"));
        assert!(!validate_phone("054AB78910"));
        assert!(!validate_phone("054+678910"));
    }

    #[test]
    fn formats_phone_to_canonical_layout() {
        assert_eq!(format_phone_number("0545678910"), "+233-54-567-8910");
        assert_eq!(format_phone_number("+233545678910"), "+233-54-567-8910");
        assert_eq!(format_phone_number("545678910"), "+233-54-567-8910");
        assert_eq!(format_phone_number("+233 54 567 8910"), "+233-54-567-8910");
    }

    #[test]
    fn phone_formatting_is_idempotent() {
        let once = format_phone_number("0545678910");
        assert_eq!(format_phone_number(&once), once);
    }

    #[test]
    fn leaves_unrecognized_phones_as_digits() {
        assert_eq!(format_phone_number("+14155550123"), "+14155550123");
        assert_eq!(format_phone_number("020-1234"), "0201234");
    }

    #[test]
    fn validates_student_id_shape() {
        assert!(validate_student_id("2024001"));
        assert!(!validate_student_id("24001"));
        assert!(!validate_student_id("20240011"));
        assert!(!validate_student_id("2O24001"));
        assert!(!validate_student_id(""));
    }

    #[test]
    fn validates_attendance_bounds() {
        assert!(validate_attendance("0"));
        assert!(validate_attendance("100"));
        assert!(validate_attendance("55.5"));
        assert!(validate_attendance(" 75 "));
        assert!(!validate_attendance("-1"));
        assert!(!validate_attendance("101"));
        assert!(!validate_attendance("abc"));
        assert!(!validate_attendance(""));
        assert!(!validate_attendance("nan"));
    }

    #[test]
    fn sanitize_strips_and_collapses() {
        assert_eq!(sanitize_input("  Ada   Lovelace  "), "Ada Lovelace");
        assert_eq!(sanitize_input("Rob'; DROP TABLE--"), "Rob DROP TABLE--");
        assert_eq!(sanitize_input("<b>bold</b>"), "bbold/b");
        assert_eq!(sanitize_input("a <\n> b"), "a b");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["  Ada   Lovelace  ", "a <\u{9}> b", "x;y&z", "plain"] {
            let once = sanitize_input(raw);
            assert_eq!(sanitize_input(&once), once);
        }
    }

    #[test]
    fn formats_names_with_word_capitalization() {
        assert_eq!(format_name("ada", "lovelace"), "Ada Lovelace");
        assert_eq!(format_name(" GRACE ", "HOPPER"), "Grace Hopper");
        assert_eq!(format_name("mary jane", "watson"), "Mary Jane Watson");
    }

    #[test]
    fn capitalizes_after_internal_punctuation() {
        assert_eq!(format_name("mary-jane", "smith"), "Mary-Jane Smith");
        assert_eq!(format_name("o'connor", "D'ARCY"), "O'Connor D'Arcy");
    }

    #[test]
    fn generates_seven_digit_identifiers() {
        for _ in 0..50 {
            let id = generate_student_id(Some(2024));
            assert!(validate_student_id(&id));
            assert!(id.starts_with("2024"));
        }
        assert!(validate_student_id(&generate_student_id(None)));
    }

    #[test]
    fn maps_scores_to_grades() {
        assert_eq!(calculate_grade(95.0), Grade::A);
        assert_eq!(calculate_grade(90.0), Grade::A);
        assert_eq!(calculate_grade(89.9), Grade::B);
        assert_eq!(calculate_grade(80.0), Grade::B);
        assert_eq!(calculate_grade(70.0), Grade::C);
        assert_eq!(calculate_grade(60.0), Grade::D);
        assert_eq!(calculate_grade(59.9), Grade::F);
        assert_eq!(calculate_grade(0.0), Grade::F);
    }
}
