// File: src/inflect.rs
// Purpose: Turn field names into display labels

/// Title-case a field name: `email_address` → `Email Address`,
/// `passwordConfirm` → `Password Confirm`, `user_id` → `User`.
pub fn titleize(field: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in field.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    // A trailing "id" names the key, not the thing
    if words.len() > 1 && words.last().is_some_and(|w| w.eq_ignore_ascii_case("id")) {
        words.pop();
    }

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("email_address", "Email Address")]
    #[case("password_confirm", "Password Confirm")]
    #[case("passwordConfirm", "Password Confirm")]
    #[case("avatar", "Avatar")]
    #[case("user_id", "User")]
    #[case("FIRST_NAME", "First Name")]
    #[case("", "")]
    fn test_titleize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(titleize(input), expected);
    }
}
