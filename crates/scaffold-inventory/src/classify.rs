//! Language classification
//!
//! Precedence:
//! 1. A recognised file extension decides the language.
//! 2. Files without an extension are classified by their shebang line,
//!    looking through `/usr/bin/env` to the interpreter.
//!
//! Anything else is not source and is skipped. TypeScript declaration files
//! (`*.d.ts`) carry no bodies and are skipped too.

use std::path::{Component, Path};

use scaffold_model::Language;

/// Classify by extension alone. `None` for extension-less or unknown files.
#[must_use]
pub fn classify_extension(path: &Path) -> Option<Language> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    Language::from_extension(ext)
}

/// Whether the path has no extension and is worth a shebang check
#[must_use]
pub fn needs_shebang(path: &Path) -> bool {
    path.extension().is_none()
}

/// Classify from the first bytes of a file
#[must_use]
pub fn classify_shebang(head: &[u8]) -> Option<Language> {
    let line_end = head.iter().position(|b| *b == b'\n').unwrap_or(head.len());
    let line = std::str::from_utf8(&head[..line_end]).ok()?;
    let command = line.strip_prefix("#!")?.trim();
    let mut words = command.split_whitespace();
    let program = words.next()?;
    let program_name = program.rsplit('/').next().unwrap_or(program);
    if program_name == "env" {
        let interpreter = words.find(|w| !w.starts_with('-') && !w.contains('='))?;
        Language::from_interpreter(interpreter)
    } else {
        Language::from_interpreter(program_name)
    }
}

/// Full classification with documented precedence
#[must_use]
pub fn classify(path: &Path, head: Option<&[u8]>) -> Option<Language> {
    if let Some(lang) = classify_extension(path) {
        return Some(lang);
    }
    if needs_shebang(path) {
        return head.and_then(classify_shebang);
    }
    None
}

/// Whether a repository-relative path is itself a test by naming convention
#[must_use]
pub fn is_test_file(relative: &Path) -> bool {
    let in_test_dir = relative.parent().is_some_and(|parent| {
        let dirs: Vec<&str> = parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();
        dirs.iter().any(|d| matches!(*d, "tests" | "test" | "__tests__" | "spec"))
            || dirs.windows(2).any(|w| w == ["src", "test"])
    });
    if in_test_dir {
        return true;
    }

    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let stem = name.split('.').next().unwrap_or(name);
    name == "conftest.py"
        || (name.ends_with(".py") && (stem.starts_with("test_") || stem.ends_with("_test")))
        || name.contains(".test.")
        || name.contains(".spec.")
        || (name.ends_with(".java") && (stem.ends_with("Test") || stem.ends_with("Tests")))
}
