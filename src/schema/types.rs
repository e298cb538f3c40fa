//! Schema definitions declared as immutable data.
//!
//! A schema is either a flat object schema or a discriminated union of
//! branches selected by a boolean discriminator field. Every constraint
//! (required sets, field bounds, branch literals) lives here as data and is
//! consumed both by the structural validator and by the store's
//! per-collection constraint check, so no invariant is re-derived ad hoc.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Supported field types and their inline constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// UTF-8 string with optional length bounds (in characters)
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Numeric value with optional bounds
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// Array with optional size bounds and a homogeneous element type
    Array {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
        items: Box<FieldType>,
    },
    /// A reference to another document.
    ///
    /// Structurally unconstrained; syntactic identifier validity is the
    /// reference validator's concern, existence is the catalog store's.
    Reference,
    /// Unconstrained
    Any,
}

impl FieldType {
    /// Bounded string
    pub fn string(min_length: usize, max_length: usize) -> Self {
        FieldType::String {
            min_length: Some(min_length),
            max_length: Some(max_length),
        }
    }

    /// Unbounded string
    pub fn plain_string() -> Self {
        FieldType::String {
            min_length: None,
            max_length: None,
        }
    }

    /// Bounded number
    pub fn number(minimum: f64, maximum: f64) -> Self {
        FieldType::Number {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    /// Bounded array of the given element type
    pub fn array(min_items: usize, max_items: usize, items: FieldType) -> Self {
        FieldType::Array {
            min_items: Some(min_items),
            max_items: Some(max_items),
            items: Box::new(items),
        }
    }

    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Bool => "boolean",
            FieldType::Int => "integer",
            FieldType::String { .. } => "string",
            FieldType::Number { .. } => "number",
            FieldType::Array { .. } => "array",
            FieldType::Reference => "reference",
            FieldType::Any => "any",
        }
    }
}

/// A flat object schema: named properties plus a required-field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, FieldType>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn new(properties: BTreeMap<String, FieldType>, required: &[&str]) -> Self {
        Self {
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One alternative of a discriminated union, selected by a boolean literal
/// on the union's discriminator field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionBranch {
    /// The literal the discriminator must hold for this branch to apply
    pub discriminator_value: bool,
    pub schema: ObjectSchema,
}

/// A discriminated union of object schemas.
///
/// Branches must encode mutually exclusive discriminator literals; the
/// error filter relies on exactly one branch surviving disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionSchema {
    pub discriminator: String,
    pub branches: Vec<UnionBranch>,
}

/// A document schema: flat object or discriminated union.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentSchema {
    Object(ObjectSchema),
    Union(UnionSchema),
}

impl DocumentSchema {
    /// The discriminator field name, for union schemas
    pub fn discriminator(&self) -> Option<&str> {
        match self {
            DocumentSchema::Object(_) => None,
            DocumentSchema::Union(u) => Some(&u.discriminator),
        }
    }

    /// All property names declared by any branch.
    ///
    /// A document field outside this set is outside the modeled schema
    /// regardless of which branch applies.
    pub fn declared_fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        match self {
            DocumentSchema::Object(o) => {
                out.extend(o.properties.keys().map(|k| k.as_str()));
            }
            DocumentSchema::Union(u) => {
                for branch in &u.branches {
                    for key in branch.schema.properties.keys() {
                        if !out.contains(&key.as_str()) {
                            out.push(key);
                        }
                    }
                }
            }
        }
        out
    }

    /// Reference-typed fields declared by this schema.
    ///
    /// Returns `(field, is_list)` pairs; a list entry means an array whose
    /// elements are references.
    pub fn reference_fields(&self) -> Vec<(String, bool)> {
        fn collect(schema: &ObjectSchema, out: &mut Vec<(String, bool)>) {
            for (name, ftype) in &schema.properties {
                let entry = match ftype {
                    FieldType::Reference => Some((name.clone(), false)),
                    FieldType::Array { items, .. } if **items == FieldType::Reference => {
                        Some((name.clone(), true))
                    }
                    _ => None,
                };
                if let Some(entry) = entry {
                    if !out.contains(&entry) {
                        out.push(entry);
                    }
                }
            }
        }

        let mut out: Vec<(String, bool)> = Vec::new();
        match self {
            DocumentSchema::Object(o) => collect(o, &mut out),
            DocumentSchema::Union(u) => {
                for branch in &u.branches {
                    collect(&branch.schema, &mut out);
                }
            }
        }
        out
    }
}

/// A named, versioned, immutable schema definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDef {
    /// Schema identifier, e.g. "product"
    pub name: String,
    /// Schema generation, e.g. "2"
    pub version: String,
    pub document: DocumentSchema,
}

impl SchemaDef {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        document: DocumentSchema,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            document,
        }
    }
}

/// The keyword a violation fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Keyword {
    Required,
    Type,
    Enum,
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
    MinItems,
    MaxItems,
    /// Undeclared field. Raised as a hard internal error before any report
    /// is built; must never appear in a violation list.
    AdditionalProperties,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Required => "required",
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::MinLength => "minLength",
            Keyword::MaxLength => "maxLength",
            Keyword::Minimum => "minimum",
            Keyword::Maximum => "maximum",
            Keyword::MinItems => "minItems",
            Keyword::MaxItems => "maxItems",
            Keyword::AdditionalProperties => "additionalProperties",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A path prefix identifying the union branch a violation belongs to,
/// ending at the nearest enclosing branch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPath(String);

impl BranchPath {
    /// The branch path for the `index`-th union alternative
    pub fn one_of(index: usize) -> Self {
        BranchPath(format!("/oneOf/{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One step of an instance path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// An instance path locating a violation inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FieldPath(pub Vec<PathSegment>);

impl FieldPath {
    /// The document root
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    /// A single top-level field
    pub fn field(name: impl Into<String>) -> Self {
        FieldPath(vec![PathSegment::Field(name.into())])
    }

    /// Extends the path with an array index
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// The field name of a single-segment path, if it is one
    pub fn as_field(&self) -> Option<&str> {
        match self.0.as_slice() {
            [PathSegment::Field(name)] => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) => write!(f, "/{name}")?,
                PathSegment::Index(i) => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

/// A flat structural violation with full branch provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: FieldPath,
    pub keyword: Keyword,
    /// Which union branch the violation belongs to; `None` for flat schemas
    pub branch: Option<BranchPath>,
    pub message: String,
}

impl Violation {
    pub fn new(
        path: FieldPath,
        keyword: Keyword,
        branch: Option<BranchPath>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            keyword,
            branch,
            message: message.into(),
        }
    }
}
