//! Default input values
//!
//! Every parameter is assigned a value class: from its annotation, then from
//! its default literal, then from hints in its name. Each class yields a
//! zero, a representative and a boundary value.

use scaffold_model::{Parameter, Value};

/// What kind of value a parameter takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueClass {
    /// Whole number
    Int,
    /// Floating point
    Float,
    /// String
    Text,
    /// Boolean
    Bool,
    /// Sequence of the inner class
    Collection(Box<ValueClass>),
    /// Text-keyed mapping
    Mapping,
    /// May be absent
    Optional(Box<ValueClass>),
    /// Instance of a named type
    Object(String),
    /// Collaborator replaced by a mock
    Dependency(String),
}

impl ValueClass {
    /// Zero value
    #[must_use]
    pub fn zero(&self) -> Value {
        match self {
            ValueClass::Int => Value::Int(0),
            ValueClass::Float => Value::Float(0.0),
            ValueClass::Text => Value::Text(String::new()),
            ValueClass::Bool => Value::Bool(false),
            ValueClass::Collection(_) => Value::List(Vec::new()),
            ValueClass::Mapping => Value::Map(Vec::new()),
            ValueClass::Optional(_) => Value::Null,
            ValueClass::Object(name) => Value::Stub(name.clone()),
            ValueClass::Dependency(name) => Value::Mock(name.clone()),
        }
    }

    /// Representative value
    #[must_use]
    pub fn representative(&self) -> Value {
        match self {
            ValueClass::Int => Value::Int(42),
            ValueClass::Float => Value::Float(1.5),
            ValueClass::Text => Value::Text("sample".to_string()),
            ValueClass::Bool => Value::Bool(true),
            ValueClass::Collection(inner) => Value::List(vec![inner.representative()]),
            ValueClass::Mapping => Value::Map(vec![("key".to_string(), Value::Text("value".to_string()))]),
            ValueClass::Optional(inner) => inner.representative(),
            ValueClass::Object(_) | ValueClass::Dependency(_) => self.zero(),
        }
    }

    /// Boundary value
    #[must_use]
    pub fn boundary(&self) -> Value {
        match self {
            ValueClass::Int => Value::Int(-1),
            ValueClass::Float => Value::Float(-1.5),
            ValueClass::Text => Value::Text("  sample  ".to_string()),
            ValueClass::Bool => Value::Bool(true),
            ValueClass::Collection(inner) => Value::List(vec![inner.representative(), inner.boundary()]),
            ValueClass::Mapping => Value::Map(vec![
                ("key".to_string(), Value::Text("value".to_string())),
                ("other".to_string(), Value::Text(String::new())),
            ]),
            ValueClass::Optional(inner) => inner.boundary(),
            ValueClass::Object(_) | ValueClass::Dependency(_) => self.zero(),
        }
    }
}

/// Value class of a parameter. `dependency` names the mock when the
/// parameter is the receiver of a dependency call.
#[must_use]
pub fn classify(parameter: &Parameter, dependency: Option<&str>) -> ValueClass {
    if let Some(name) = dependency {
        return ValueClass::Dependency(name.to_string());
    }
    parameter
        .annotation
        .as_deref()
        .and_then(from_annotation)
        .or_else(|| parameter.default.as_deref().and_then(from_default))
        .or_else(|| from_name(&parameter.name))
        .unwrap_or(ValueClass::Int)
}

/// Outer type name and its generic arguments: `List<String>` gives `("List", ["String"])`
fn split_generic(text: &str) -> (&str, Vec<&str>) {
    let Some(open) = text.find(['[', '<']) else {
        return (text, Vec::new());
    };
    let close = text.rfind([']', '>']).unwrap_or(text.len());
    if close <= open {
        return (text, Vec::new());
    }
    let inner = &text[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '[' | '<' => depth += 1,
            ']' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    (text[..open].trim(), args.into_iter().filter(|a| !a.is_empty()).collect())
}

/// Value class for a type annotation in any supported language
#[must_use]
pub fn from_annotation(annotation: &str) -> Option<ValueClass> {
    let text = annotation.trim().trim_start_matches(':').trim();
    if text.is_empty() {
        return None;
    }

    let union: Vec<&str> = text.split('|').map(str::trim).collect();
    if union.len() > 1 {
        let present: Vec<&str> = union
            .iter()
            .copied()
            .filter(|t| !matches!(*t, "None" | "null" | "undefined"))
            .collect();
        let inner = present.first().and_then(|t| from_annotation(t))?;
        return Some(if present.len() < union.len() {
            ValueClass::Optional(Box::new(inner))
        } else {
            inner
        });
    }

    if let Some(element) = text.strip_suffix("[]") {
        let inner = from_annotation(element).unwrap_or(ValueClass::Int);
        return Some(ValueClass::Collection(Box::new(inner)));
    }

    let (outer, args) = split_generic(text);
    let outer = outer.rsplit('.').next().unwrap_or(outer);
    let first_arg = || args.first().and_then(|a| from_annotation(a)).unwrap_or(ValueClass::Int);
    let class = match outer {
        "int" | "long" | "short" | "byte" | "Integer" | "Long" | "Short" | "Byte" | "BigInteger" | "number"
        | "bigint" => ValueClass::Int,
        "float" | "double" | "Float" | "Double" | "Decimal" | "BigDecimal" => ValueClass::Float,
        "str" | "bytes" | "String" | "string" | "char" | "Character" | "CharSequence" => ValueClass::Text,
        "bool" | "boolean" | "Boolean" => ValueClass::Bool,
        "list" | "List" | "tuple" | "Tuple" | "set" | "Set" | "frozenset" | "Sequence" | "Iterable" | "Collection"
        | "Array" | "ReadonlyArray" | "ArrayList" | "HashSet" => ValueClass::Collection(Box::new(first_arg())),
        "dict" | "Dict" | "Mapping" | "Map" | "HashMap" | "Record" | "object" => ValueClass::Mapping,
        "Optional" => ValueClass::Optional(Box::new(first_arg())),
        "Any" | "any" | "unknown" | "Object" | "var" => return None,
        _ if text.starts_with('{') => ValueClass::Mapping,
        other if other.chars().next().is_some_and(char::is_uppercase) => ValueClass::Object(other.to_string()),
        _ => return None,
    };
    Some(class)
}

/// Value class implied by a default literal
#[must_use]
pub fn from_default(default: &str) -> Option<ValueClass> {
    let text = default.trim();
    let class = match text {
        "True" | "False" | "true" | "false" => ValueClass::Bool,
        "None" | "null" | "undefined" => ValueClass::Optional(Box::new(ValueClass::Int)),
        _ if text.starts_with(['"', '\'', '`']) => ValueClass::Text,
        _ if text.starts_with(['[', '(']) => ValueClass::Collection(Box::new(ValueClass::Int)),
        _ if text.starts_with('{') => ValueClass::Mapping,
        _ if text.parse::<i64>().is_ok() => ValueClass::Int,
        _ if text.parse::<f64>().is_ok() => ValueClass::Float,
        _ => return None,
    };
    Some(class)
}

const TEXT_NAMES: [&str; 18] = [
    "name", "email", "path", "text", "message", "msg", "title", "url", "uri", "key", "label", "description",
    "username", "password", "token", "query", "filename", "content",
];
const MAPPING_NAMES: [&str; 7] = ["options", "opts", "config", "settings", "params", "kwargs", "headers"];
const BOOL_NAMES: [&str; 6] = ["enabled", "disabled", "flag", "force", "verbose", "debug"];
const NOT_PLURAL: [&str; 6] = ["status", "address", "class", "process", "alias", "bonus"];

/// Value class suggested by a parameter name
#[must_use]
pub fn from_name(name: &str) -> Option<ValueClass> {
    let lower = name.trim_start_matches(['_', '$']).to_ascii_lowercase();
    if lower.is_empty() {
        return None;
    }
    let class = if ["is_", "has_", "can_", "should_"].iter().any(|p| lower.starts_with(p))
        || (["is", "has", "can", "should"].iter().any(|p| {
            name.strip_prefix(p).is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        }))
        || BOOL_NAMES.contains(&lower.as_str())
    {
        ValueClass::Bool
    } else if MAPPING_NAMES.contains(&lower.as_str()) || lower.ends_with("_map") || name.ends_with("Map") {
        ValueClass::Mapping
    } else if TEXT_NAMES.contains(&lower.as_str())
        || ["_name", "_path", "_url", "_text", "_email", "_message"].iter().any(|s| lower.ends_with(s))
        || ["Name", "Path", "Url", "Text", "Email", "Message"].iter().any(|s| name.ends_with(s))
    {
        ValueClass::Text
    } else if lower.ends_with("_list")
        || name.ends_with("List")
        || (lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") && !NOT_PLURAL.contains(&lower.as_str()))
    {
        ValueClass::Collection(Box::new(ValueClass::Int))
    } else {
        return None;
    };
    Some(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str) -> Parameter {
        Parameter::new(name)
    }

    #[test]
    fn untyped_names_default_to_numbers() {
        assert_eq!(classify(&param("a"), None), ValueClass::Int);
        assert_eq!(classify(&param("count"), None), ValueClass::Int);
        assert_eq!(classify(&param("a"), None).representative(), Value::Int(42));
    }

    #[test]
    fn annotations_win_over_names() {
        assert_eq!(classify(&param("items").with_annotation("str"), None), ValueClass::Text);
        assert_eq!(
            classify(&param("ids").with_annotation("List<Long>"), None),
            ValueClass::Collection(Box::new(ValueClass::Int))
        );
        assert_eq!(
            from_annotation("Optional[str]"),
            Some(ValueClass::Optional(Box::new(ValueClass::Text)))
        );
        assert_eq!(
            from_annotation("string | undefined"),
            Some(ValueClass::Optional(Box::new(ValueClass::Text)))
        );
        assert_eq!(from_annotation("dict[str, list[int]]"), Some(ValueClass::Mapping));
        assert_eq!(
            from_annotation("number[]"),
            Some(ValueClass::Collection(Box::new(ValueClass::Int)))
        );
        assert_eq!(from_annotation("Database"), Some(ValueClass::Object("Database".to_string())));
        assert_eq!(from_annotation("Any"), None);
    }

    #[test]
    fn defaults_then_names() {
        assert_eq!(classify(&param("note").with_default("'none'"), None), ValueClass::Text);
        assert_eq!(classify(&param("retries").with_default("3"), None), ValueClass::Int);
        assert_eq!(classify(&param("ratio").with_default("0.5"), None), ValueClass::Float);
        assert_eq!(classify(&param("is_admin"), None), ValueClass::Bool);
        assert_eq!(classify(&param("hasAccess"), None), ValueClass::Bool);
        assert_eq!(classify(&param("email"), None), ValueClass::Text);
        assert_eq!(classify(&param("userName"), None), ValueClass::Text);
        assert_eq!(classify(&param("options"), None), ValueClass::Mapping);
        assert_eq!(classify(&param("items"), None), ValueClass::Collection(Box::new(ValueClass::Int)));
        assert_eq!(classify(&param("status"), None), ValueClass::Int);
    }

    #[test]
    fn dependencies_are_mocks_everywhere() {
        let class = classify(&param("paymentClient").with_annotation("str"), Some("paymentClient"));
        assert_eq!(class.zero(), Value::Mock("paymentClient".to_string()));
        assert_eq!(class.boundary(), Value::Mock("paymentClient".to_string()));
    }

    #[test]
    fn value_table() {
        let list = ValueClass::Collection(Box::new(ValueClass::Text));
        assert_eq!(list.zero(), Value::List(vec![]));
        assert_eq!(list.representative(), Value::List(vec![Value::Text("sample".into())]));
        assert_eq!(
            list.boundary(),
            Value::List(vec![Value::Text("sample".into()), Value::Text("  sample  ".into())])
        );
        let optional = ValueClass::Optional(Box::new(ValueClass::Float));
        assert_eq!(optional.zero(), Value::Null);
        assert_eq!(optional.representative(), Value::Float(1.5));
        assert_eq!(optional.boundary(), Value::Float(-1.5));
        assert_eq!(ValueClass::Object("Db".into()).representative(), Value::Stub("Db".into()));
    }
}
