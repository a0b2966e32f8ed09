//! Canonicalization of user-supplied strings.
//!
//! Profession and city names are stored twice: a canonical form (lowercase,
//! single-spaced) that carries the uniqueness constraint, and a display form
//! (title case). Emails and phone numbers are reduced to the form stored in
//! their unique columns.

/// Trims and collapses internal whitespace runs to a single space.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, single-spaced form used for lookups. `None` for blank input.
pub fn canonical_name(input: &str) -> Option<String> {
    let collapsed = collapse_whitespace(input);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

/// Title-cased form shown to users. `None` for blank input.
pub fn display_name(input: &str) -> Option<String> {
    let collapsed = collapse_whitespace(input);
    if collapsed.is_empty() {
        return None;
    }

    let words: Vec<String> = collapsed.split(' ').map(title_case_word).collect();
    Some(words.join(" "))
}

fn title_case_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut capitalize_next = true;

    for c in word.chars() {
        if capitalize_next {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        // Hyphenated and apostrophe parts get their own capital letter
        capitalize_next = c == '-' || c == '\'';
    }

    out
}

/// True when the trimmed input is made only of ASCII digits.
pub fn is_numeric(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Interprets the input as a numeric record id.
pub fn parse_id(input: &str) -> Option<i32> {
    if !is_numeric(input) {
        return None;
    }
    input.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

/// Lowercased, trimmed email, or `None` when it does not look like one.
pub fn normalize_email(input: &str) -> Option<String> {
    let email = input.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;

    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    valid.then_some(email)
}

/// Strips separators from a phone number. Accepts an optional leading `+`
/// followed by 7 to 15 digits.
pub fn normalize_phone(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            _ => return None,
        }
    }

    (7..=15)
        .contains(&digits.len())
        .then(|| format!("{}{}", plus, digits))
}
