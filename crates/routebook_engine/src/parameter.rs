/* 📖 # Why is the parameter kind fixed at construction?

A parameter's kind says where it lives in the request (path, query, body, header or form).
The only way to pick a kind is one of the kind-specific factories, each of which also seeds
the defaults that go with it. `ParameterData` exposes every other field for later adjustment
but keeps `kind` private, so a parameter never changes location once declared.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Location of a documented request parameter.
///
/// Serialized as an integer code (0 Path, 1 Query, 2 Body, 3 Header, 4 Form). Codes outside
/// that range deserialize into [`ParameterKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ParameterKind {
    Path,
    Query,
    Body,
    Header,
    Form,
    /// A code of 5 or above. A lower code names a known kind: `Unknown(2)` is encoded as `2`,
    /// labeled and decoded as [`ParameterKind::Body`].
    Unknown(u8),
}

impl ParameterKind {
    /// Documentation label for this kind, taken from its integer code.
    pub fn as_str(&self) -> &'static str {
        match Self::from(u8::from(*self)) {
            Self::Path => "Path",
            Self::Query => "Query",
            Self::Body => "Body",
            Self::Header => "Header",
            Self::Form => "Form",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for ParameterKind {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Path,
            1 => Self::Query,
            2 => Self::Body,
            3 => Self::Header,
            4 => Self::Form,
            other => Self::Unknown(other),
        }
    }
}

impl From<ParameterKind> for u8 {
    fn from(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Path => 0,
            ParameterKind::Query => 1,
            ParameterKind::Body => 2,
            ParameterKind::Header => 3,
            ParameterKind::Form => 4,
            ParameterKind::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The documented state of a [`Parameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterData {
    pub name: String,
    pub description: String,
    #[serde(rename = "datatype")]
    pub data_type: String,
    #[serde(rename = "dataformat")]
    pub data_format: Option<String>,
    kind: ParameterKind,
    pub required: bool,
    #[serde(rename = "allowablevalues")]
    pub allowable_values: Option<BTreeMap<String, String>>,
    #[serde(rename = "allowmultiple")]
    pub allow_multiple: bool,
    #[serde(rename = "defaultvalue")]
    pub default_value: String,
}

impl ParameterData {
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Documentation label of the kind, "Unknown" for unrecognized codes.
    pub fn parameter_kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Documentation for one request parameter of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    data: ParameterData,
}

impl Parameter {
    fn new(
        kind: ParameterKind,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
        data_type: &str,
    ) -> Self {
        Self {
            data: ParameterData {
                name: name.into(),
                description: description.into(),
                data_type: data_type.to_string(),
                data_format: None,
                kind,
                required,
                allowable_values: None,
                allow_multiple: false,
                default_value: String::new(),
            },
        }
    }

    /// A path parameter, required and typed "string".
    pub fn path(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ParameterKind::Path, name, description, true, "string")
    }

    /// A query parameter, optional and typed "string".
    pub fn query(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ParameterKind::Query, name, description, false, "string")
    }

    /// A body parameter, required and untyped.
    pub fn body(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ParameterKind::Body, name, description, true, "")
    }

    /// A header parameter, optional and typed "string".
    pub fn header(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ParameterKind::Header, name, description, false, "string")
    }

    /// A form parameter (application/x-www-form-urlencoded), optional and typed "string".
    pub fn form(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ParameterKind::Form, name, description, false, "string")
    }

    pub fn required(mut self, required: bool) -> Self {
        self.data.required = required;
        self
    }

    pub fn allow_multiple(mut self, multiple: bool) -> Self {
        self.data.allow_multiple = multiple;
        self
    }

    pub fn allowable_values<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.data.allowable_values = Some(
            values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn data_type(mut self, type_name: impl Into<String>) -> Self {
        self.data.data_type = type_name.into();
        self
    }

    pub fn data_format(mut self, format_name: impl Into<String>) -> Self {
        self.data.data_format = Some(format_name.into());
        self
    }

    /// Sets the default value, given in its string representation.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.data.default_value = value.into();
        self
    }

    pub fn description(mut self, doc: impl Into<String>) -> Self {
        self.data.description = doc.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn kind(&self) -> ParameterKind {
        self.data.kind
    }

    /// Documentation label of the kind, "Unknown" for unrecognized codes.
    pub fn parameter_kind(&self) -> &'static str {
        self.data.parameter_kind()
    }

    pub fn data(&self) -> &ParameterData {
        &self.data
    }

    /// Mutable access to everything but the kind, for parameters already attached to a builder.
    pub fn data_mut(&mut self) -> &mut ParameterData {
        &mut self.data
    }
}
