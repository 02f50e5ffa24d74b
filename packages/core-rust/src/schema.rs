//! Parameter schemas for operations and argument validation against them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Number, Value};

/// Declared type of a single operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON Schema type keyword for this parameter type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Coerces a JSON value into this type, or returns `None` if it cannot be.
    ///
    /// Accepted conversions: integral numbers and integer strings for
    /// `Integer`; numbers and numeric strings for `Number`; `"true"`/`"false"`
    /// for `Boolean`; numbers and booleans rendered as text for `String`.
    /// Arrays and objects must already have the right shape.
    #[must_use]
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamType::String, Value::String(_))
            | (ParamType::Boolean, Value::Bool(_))
            | (ParamType::Array, Value::Array(_))
            | (ParamType::Object, Value::Object(_))
            | (ParamType::Number, Value::Number(_)) => Some(value.clone()),
            (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (ParamType::Integer, Value::Number(n)) => integral(n).map(Value::from),
            (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (ParamType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (ParamType::Boolean, Value::String(s)) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer value of a JSON number, accepting floats with no fractional part.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// JSON type name of a value, for error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a single parameter.
///
/// Matches the registration format `{"type": ..., "description": ...,
/// "optional": true, "default": ...}`. A parameter is required unless it is
/// marked optional or carries a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    #[must_use]
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            description: None,
            optional: false,
            default: None,
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// What went wrong with a single argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// A required parameter was absent or null.
    Missing,
    /// The value could not be coerced to the declared type.
    TypeMismatch {
        expected: ParamType,
        found: &'static str,
    },
    /// The parameter is not declared by the schema.
    Unexpected,
    /// The arguments themselves were not a JSON object.
    NotAnObject { found: &'static str },
    /// Well-typed, but not an accepted value.
    InvalidValue { reason: String },
}

/// A validation failure attributed to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "`{}`: missing required parameter", self.field),
            IssueKind::TypeMismatch { expected, found } => {
                write!(f, "`{}`: expected {expected}, got {found}", self.field)
            }
            IssueKind::Unexpected => write!(f, "`{}`: unexpected parameter", self.field),
            IssueKind::NotAnObject { found } => {
                write!(f, "arguments must be an object, got {found}")
            }
            IssueKind::InvalidValue { reason } => write!(f, "`{}`: {reason}", self.field),
        }
    }
}

/// Ordered mapping of parameter name to declaration.
///
/// Declaration order is preserved through (de)serialization so listings show
/// parameters the way they were registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<(String, ParamSpec)>,
}

impl ParameterSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a parameter declaration, keeping its original slot.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.params.push((name, spec)),
        }
        self
    }

    #[must_use]
    pub fn required(self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.param(name, ParamSpec::new(param_type))
    }

    #[must_use]
    pub fn optional(self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.param(name, ParamSpec::new(param_type).optional())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(n, s)| (n.as_str(), s))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Validates call arguments, returning the coerced argument object.
    ///
    /// `null` arguments are treated as an empty object and `null` values as
    /// absent. Defaults are filled in for absent parameters. All issues are
    /// collected rather than stopping at the first one.
    ///
    /// # Errors
    ///
    /// Returns every [`FieldIssue`] found: missing required parameters, values
    /// that cannot be coerced, undeclared parameters, or a non-object payload.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>, Vec<FieldIssue>> {
        let empty = Map::new();
        let provided = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(vec![FieldIssue {
                    field: "arguments".to_string(),
                    kind: IssueKind::NotAnObject {
                        found: json_type_name(other),
                    },
                }])
            }
        };

        let mut issues = Vec::new();
        let mut coerced = Map::new();

        for (name, spec) in &self.params {
            match provided.get(name).filter(|v| !v.is_null()) {
                Some(value) => match spec.param_type.coerce(value) {
                    Some(v) => {
                        coerced.insert(name.clone(), v);
                    }
                    None => issues.push(FieldIssue {
                        field: name.clone(),
                        kind: IssueKind::TypeMismatch {
                            expected: spec.param_type,
                            found: json_type_name(value),
                        },
                    }),
                },
                None => {
                    if let Some(default) = &spec.default {
                        coerced.insert(name.clone(), default.clone());
                    } else if !spec.optional {
                        issues.push(FieldIssue {
                            field: name.clone(),
                            kind: IssueKind::Missing,
                        });
                    }
                }
            }
        }

        for key in provided.keys() {
            if self.get(key).is_none() {
                issues.push(FieldIssue {
                    field: key.clone(),
                    kind: IssueKind::Unexpected,
                });
            }
        }

        if issues.is_empty() {
            Ok(coerced)
        } else {
            Err(issues)
        }
    }

    /// Renders the schema as a JSON Schema object for MCP `inputSchema`.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.params {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::from(spec.param_type.as_str()));
            if let Some(description) = &spec.description {
                prop.insert("description".into(), Value::from(description.clone()));
            }
            if let Some(default) = &spec.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(name.clone(), Value::Object(prop));
            if spec.is_required() {
                required.push(Value::from(name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl Serialize for ParameterSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len()))?;
        for (name, spec) in &self.params {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ParameterSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter name to parameter declaration")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params: Vec<(String, ParamSpec)> = Vec::new();
                while let Some((name, spec)) = access.next_entry::<String, ParamSpec>()? {
                    if params.iter().any(|(n, _)| *n == name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate parameter `{name}`"
                        )));
                    }
                    params.push((name, spec));
                }
                Ok(ParameterSchema { params })
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
