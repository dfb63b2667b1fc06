//! Scenario names

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// `snake_case` form of an identifier in any casing convention
#[must_use]
pub fn snake_case(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "symbol".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out scenario names, unique per source file
#[derive(Debug, Default)]
pub struct ScenarioNamer {
    taken: HashMap<PathBuf, HashSet<String>>,
}

impl ScenarioNamer {
    /// Empty namer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `<owner>_<symbol>_<suffix>`, with `_2`, `_3`, ... appended on reuse within `file`
    pub fn name(&mut self, file: &Path, owner: Option<&str>, symbol: &str, suffix: &str) -> String {
        let base = match owner {
            Some(owner) => format!("{}_{}_{suffix}", snake_case(owner), snake_case(symbol)),
            None => format!("{}_{suffix}", snake_case(symbol)),
        };
        let taken = self.taken.entry(file.to_path_buf()).or_default();
        if taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_common_casings() {
        assert_eq!(snake_case("getUser"), "get_user");
        assert_eq!(snake_case("PaymentService"), "payment_service");
        assert_eq!(snake_case("HTTPClient"), "http_client");
        assert_eq!(snake_case("add_user"), "add_user");
        assert_eq!(snake_case("parseV2Config"), "parse_v2_config");
        assert_eq!(snake_case("#secret"), "secret");
        assert_eq!(snake_case("$"), "symbol");
    }

    #[test]
    fn names_are_unique_per_file() {
        let mut namer = ScenarioNamer::new();
        let a = Path::new("a.py");
        assert_eq!(namer.name(a, None, "add", "declared_name"), "add_declared_name");
        assert_eq!(namer.name(a, None, "add", "declared_name"), "add_declared_name_2");
        assert_eq!(namer.name(a, None, "add", "declared_name"), "add_declared_name_3");
        assert_eq!(namer.name(Path::new("b.py"), None, "add", "declared_name"), "add_declared_name");
        assert_eq!(
            namer.name(a, Some("UserStore"), "addUser", "happy_path"),
            "user_store_add_user_happy_path"
        );
    }
}
