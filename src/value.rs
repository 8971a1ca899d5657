//! Argument values passed to native driver calls.
//!
//! Hooks always receive a flattened positional value list, regardless of
//! whether the native call used named or positional parameters.

use std::fmt;

/// A single SQL argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// A possibly named parameter as supplied to the native call.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    /// Parameter name for drivers with named placeholders; `None` for
    /// positional parameters.
    pub name: Option<String>,
    pub value: SqlValue,
}

impl SqlParam {
    /// A positional parameter.
    pub fn positional(value: impl Into<SqlValue>) -> Self {
        SqlParam {
            name: None,
            value: value.into(),
        }
    }

    /// A named parameter.
    pub fn named(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        SqlParam {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

impl From<SqlValue> for SqlParam {
    fn from(value: SqlValue) -> Self {
        SqlParam::positional(value)
    }
}

/// Flatten named/positional parameters into the uniform value list the
/// hooks receive.
pub(crate) fn flatten(params: &[SqlParam]) -> Vec<SqlValue> {
    params.iter().map(|p| p.value.clone()).collect()
}

/// Render an argument list for span attributes, `[]` when empty.
pub(crate) fn args_to_string(args: &[SqlValue]) -> String {
    if args.is_empty() {
        return "[]".to_string();
    }
    let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_strips_names() {
        let params = vec![
            SqlParam::named("id", 7),
            SqlParam::positional("alice"),
        ];
        assert_eq!(
            flatten(&params),
            vec![SqlValue::Int(7), SqlValue::Text("alice".into())]
        );
    }

    #[test]
    fn test_args_to_string() {
        assert_eq!(args_to_string(&[]), "[]");
        assert_eq!(
            args_to_string(&[
                SqlValue::Text("a".into()),
                SqlValue::Int(1),
                SqlValue::Null,
            ]),
            "[a, 1, NULL]"
        );
        assert_eq!(
            args_to_string(&[SqlValue::Bytes(vec![1, 2, 3])]),
            "[<3 bytes>]"
        );
    }
}
