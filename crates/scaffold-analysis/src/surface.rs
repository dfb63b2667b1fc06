//! Public surface by language convention

use scaffold_model::{FileSummary, Language, QualifiedName, SymbolDescriptor, SymbolKind, Visibility};

fn hidden_segment(segment: &str) -> bool {
    segment.starts_with('_') || segment.starts_with('#')
}

fn owner_of<'a>(file: &'a FileSummary, symbol: &SymbolDescriptor) -> Option<&'a SymbolDescriptor> {
    let owner = symbol.name.owner()?;
    file.symbol(&owner)
}

/// Whether `symbol` is part of its file's public surface
#[must_use]
pub fn is_public(file: &FileSummary, symbol: &SymbolDescriptor) -> bool {
    if symbol.visibility == Visibility::Private || symbol.name.segments().iter().any(|s| hidden_segment(s)) {
        return false;
    }
    match file.language {
        Language::Python => true,
        Language::JavaScript | Language::TypeScript => {
            if symbol.name.is_member() {
                owner_of(file, symbol).is_some_and(|owner| owner.export.is_exported())
            } else {
                symbol.export.is_exported()
            }
        }
        Language::Java => {
            if symbol.name.is_member() {
                owner_of(file, symbol).is_some_and(|owner| owner.visibility == Visibility::Public)
            } else {
                symbol.kind == SymbolKind::Class
            }
        }
    }
}

/// Public symbols of one file in declaration order
#[must_use]
pub fn file_surface(file: &FileSummary) -> Vec<QualifiedName> {
    file.symbols
        .iter()
        .filter(|s| is_public(file, s))
        .map(|s| s.name.clone())
        .collect()
}

/// Public symbols of every file, file order then declaration order
#[must_use]
pub fn public_surface<'a>(files: impl IntoIterator<Item = &'a FileSummary>) -> Vec<QualifiedName> {
    files.into_iter().flat_map(file_surface).collect()
}

#[cfg(test)]
mod tests {
    use scaffold_model::ExportStyle;
    use scaffold_test_utils::{class, function, method, summary};

    use super::*;

    fn names(file: &FileSummary) -> Vec<String> {
        file_surface(file).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn python_underscores_are_private() {
        let file = summary("app/users.py", Language::Python)
            .with_symbol(class("app.users", "Store", &[]))
            .with_symbol(method("app.users", "Store", "get", &["key"]))
            .with_symbol(method("app.users", "Store", "_cache", &[]))
            .with_symbol(method("app.users", "Store", "__len__", &[]))
            .with_symbol(class("app.users", "_Impl", &[]))
            .with_symbol(method("app.users", "_Impl", "run", &[]))
            .with_symbol(function("app.users", "helper", &[]));
        assert_eq!(names(&file), vec!["app.users:Store", "app.users:Store.get", "app.users:helper"]);
    }

    #[test]
    fn javascript_needs_an_export() {
        let file = summary("web/api.js", Language::JavaScript)
            .with_symbol(function("web.api", "exported", &[]).with_export(ExportStyle::EsModule))
            .with_symbol(function("web.api", "local", &[]))
            .with_symbol(class("web.api", "Client", &[]).with_export(ExportStyle::CommonJs))
            .with_symbol(method("web.api", "Client", "send", &[]).with_export(ExportStyle::CommonJs))
            .with_symbol(
                method("web.api", "Client", "reset", &[])
                    .with_export(ExportStyle::CommonJs)
                    .with_visibility(Visibility::Private),
            )
            .with_symbol(method("web.api", "Client", "#secret", &[]).with_export(ExportStyle::CommonJs));
        assert_eq!(names(&file), vec!["web.api:exported", "web.api:Client", "web.api:Client.send"]);
    }

    #[test]
    fn java_needs_public_class_and_member() {
        let file = summary("src/main/java/com/acme/Invoice.java", Language::Java)
            .with_symbol(class("com.acme.Invoice", "Invoice", &[]))
            .with_symbol(method("com.acme.Invoice", "Invoice", "total", &[]))
            .with_symbol(method("com.acme.Invoice", "Invoice", "audit", &[]).with_visibility(Visibility::Private));
        assert_eq!(names(&file), vec!["com.acme.Invoice:Invoice", "com.acme.Invoice:Invoice.total"]);

        let hidden = summary("src/main/java/com/acme/Helper.java", Language::Java)
            .with_symbol(class("com.acme.Helper", "Helper", &[]).with_visibility(Visibility::Private))
            .with_symbol(method("com.acme.Helper", "Helper", "run", &[]));
        assert!(file_surface(&hidden).is_empty());
    }
}
