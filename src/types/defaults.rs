//! Default value literals
//!
//! Schemas carry `default` in string form. It is parsed into a literal that
//! matches the field's target type; anything that does not fit is rejected
//! with a reason and the caller records a diagnostic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Primitive, TargetType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultLiteral {
    Boolean(bool),
    Char(char),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<DefaultLiteral>),
    Set(Vec<DefaultLiteral>),
}

/// Parse a default value's string form as a literal of type `ty`
pub fn parse_default(text: &str, ty: &TargetType) -> Result<DefaultLiteral, String> {
    let text = text.trim();
    match ty {
        TargetType::Primitive(Primitive::Boolean) => match text {
            "true" => Ok(DefaultLiteral::Boolean(true)),
            "false" => Ok(DefaultLiteral::Boolean(false)),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        TargetType::Primitive(Primitive::Integer) => parse_integer(text),
        TargetType::Primitive(Primitive::Number) => text
            .parse::<f64>()
            .map(DefaultLiteral::Float)
            .map_err(|_| format!("'{}' is not a number", text)),
        TargetType::Primitive(Primitive::String) => Ok(DefaultLiteral::String(text.to_string())),
        TargetType::Primitive(Primitive::Named(name)) if name == "char" => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(DefaultLiteral::Char(c)),
                _ => Err(format!("'{}' is not a single character", text)),
            }
        }
        TargetType::Collection { element, unique } => {
            let value: Value =
                serde_json::from_str(text).map_err(|e| format!("'{}' is not a JSON list: {}", text, e))?;
            list_literal(&value, element, *unique)
        }
        TargetType::Primitive(Primitive::Any)
        | TargetType::Primitive(Primitive::Named(_))
        | TargetType::Map(_)
        | TargetType::Class(_) => Err("no literal form for this type".to_string()),
    }
}

fn parse_integer(text: &str) -> Result<DefaultLiteral, String> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(DefaultLiteral::Integer(value));
    }
    // "4.0" is a common spelling of an integral default
    match text.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
            Ok(DefaultLiteral::Integer(value as i64))
        }
        _ => Err(format!("'{}' is not an integer", text)),
    }
}

fn list_literal(value: &Value, element: &TargetType, unique: bool) -> Result<DefaultLiteral, String> {
    let Value::Array(items) = value else {
        return Err(format!("'{}' is not a list", value));
    };
    let items = items
        .iter()
        .map(|item| match (element, item) {
            (TargetType::Collection { element, unique }, _) => list_literal(item, element, *unique),
            (_, Value::String(s)) => parse_default(s, element),
            (_, other) => parse_default(&other.to_string(), element),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if unique {
        DefaultLiteral::Set(items)
    } else {
        DefaultLiteral::List(items)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(element: Primitive, unique: bool) -> TargetType {
        TargetType::Collection {
            element: Box::new(TargetType::Primitive(element)),
            unique,
        }
    }

    #[test]
    fn test_scalars() {
        let p = |p: Primitive| TargetType::Primitive(p);
        assert_eq!(parse_default("true", &p(Primitive::Boolean)), Ok(DefaultLiteral::Boolean(true)));
        assert_eq!(parse_default("10", &p(Primitive::Integer)), Ok(DefaultLiteral::Integer(10)));
        assert_eq!(parse_default("4.0", &p(Primitive::Integer)), Ok(DefaultLiteral::Integer(4)));
        assert_eq!(parse_default("0.5", &p(Primitive::Number)), Ok(DefaultLiteral::Float(0.5)));
        assert_eq!(
            parse_default("OPAQUE", &p(Primitive::String)),
            Ok(DefaultLiteral::String("OPAQUE".to_string()))
        );
        assert_eq!(
            parse_default("x", &p(Primitive::Named("char".to_string()))),
            Ok(DefaultLiteral::Char('x'))
        );
    }

    #[test]
    fn test_lists_and_sets() {
        assert_eq!(
            parse_default("[1.0,0.0,0.0,1.0]", &list_of(Primitive::Number, false)),
            Ok(DefaultLiteral::List(vec![
                DefaultLiteral::Float(1.0),
                DefaultLiteral::Float(0.0),
                DefaultLiteral::Float(0.0),
                DefaultLiteral::Float(1.0),
            ]))
        );
        assert_eq!(
            parse_default(r#"["a, b","c"]"#, &list_of(Primitive::String, true)),
            Ok(DefaultLiteral::Set(vec![
                DefaultLiteral::String("a, b".to_string()),
                DefaultLiteral::String("c".to_string()),
            ]))
        );
        assert_eq!(parse_default("[]", &list_of(Primitive::Integer, false)), Ok(DefaultLiteral::List(vec![])));
        assert_eq!(
            parse_default(r#"["say \"hi\"", "a]b"]"#, &list_of(Primitive::String, false)),
            Ok(DefaultLiteral::List(vec![
                DefaultLiteral::String("say \"hi\"".to_string()),
                DefaultLiteral::String("a]b".to_string()),
            ]))
        );
    }

    #[test]
    fn test_nested_lists() {
        let nested = TargetType::Collection {
            element: Box::new(list_of(Primitive::Integer, false)),
            unique: false,
        };
        assert_eq!(
            parse_default("[[1,2],[3]]", &nested),
            Ok(DefaultLiteral::List(vec![
                DefaultLiteral::List(vec![DefaultLiteral::Integer(1), DefaultLiteral::Integer(2)]),
                DefaultLiteral::List(vec![DefaultLiteral::Integer(3)]),
            ]))
        );
    }

    #[test]
    fn test_unparsable_defaults_are_rejected() {
        assert!(parse_default("yes", &TargetType::Primitive(Primitive::Boolean)).is_err());
        assert!(parse_default("1.5", &TargetType::Primitive(Primitive::Integer)).is_err());
        assert!(parse_default("1,2", &list_of(Primitive::Integer, false)).is_err());
        assert!(parse_default("[1,[2]", &list_of(Primitive::Integer, false)).is_err());
        assert!(parse_default("{}", &TargetType::any()).is_err());
        assert!(parse_default(r#"{"a": 1}"#, &list_of(Primitive::Integer, false)).is_err());
        assert!(parse_default(r#"[1, "two"]"#, &list_of(Primitive::Integer, false)).is_err());
    }
}
