//! Structural document validator.
//!
//! Evaluates a JSON document against a schema definition and reports every
//! violation it finds. For union schemas, every branch is tried and all of
//! their violations are returned with branch provenance attached: the
//! downstream error filter needs the full fan-out to identify which branch
//! the caller intended, so the validator never stops at the first match.
//!
//! Undeclared fields are a hard failure raised before any branch is tried;
//! see `SchemaError::UndeclaredField`.

use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::{
    BranchPath, DocumentSchema, FieldPath, FieldType, Keyword, ObjectSchema, SchemaDef,
    UnionSchema, Violation,
};

/// Validates a document against a schema definition.
///
/// Returns the full list of structural violations, empty when the document
/// conforms. For union schemas a conforming document is one that satisfies
/// at least one branch; violations of non-selected branches are still
/// reported when the document conforms to no branch.
pub fn validate_document(def: &SchemaDef, doc: &Value) -> SchemaResult<Vec<Violation>> {
    let obj = match doc.as_object() {
        Some(obj) => obj,
        None => {
            return Ok(vec![Violation::new(
                FieldPath::root(),
                Keyword::Type,
                None,
                "must be object",
            )])
        }
    };

    // Undeclared fields abort validation outright.
    let declared = def.document.declared_fields();
    for key in obj.keys() {
        if !declared.contains(&key.as_str()) {
            return Err(SchemaError::UndeclaredField { field: key.clone() });
        }
    }

    let mut violations = Vec::new();
    match &def.document {
        DocumentSchema::Object(schema) => {
            validate_object(schema, None, doc, &mut violations);
        }
        DocumentSchema::Union(union) => {
            validate_union(union, doc, &mut violations)?;
        }
    }
    Ok(violations)
}

fn validate_union(
    union: &UnionSchema,
    doc: &Value,
    violations: &mut Vec<Violation>,
) -> SchemaResult<()> {
    let mut satisfied = Vec::new();

    for (i, branch) in union.branches.iter().enumerate() {
        let branch_path = BranchPath::one_of(i);
        let mut branch_violations = Vec::new();

        validate_object(
            &branch.schema,
            Some(&branch_path),
            doc,
            &mut branch_violations,
        );

        // The discriminator's enum constraint is branch-level data: the
        // branch applies only when the discriminator holds its literal.
        if let Some(value) = doc.get(&union.discriminator) {
            if let Some(flag) = value.as_bool() {
                if flag != branch.discriminator_value {
                    branch_violations.push(Violation::new(
                        FieldPath::field(&union.discriminator),
                        Keyword::Enum,
                        Some(branch_path.clone()),
                        "must be equal to one of the allowed values",
                    ));
                }
            }
        }

        satisfied.push(branch_violations.is_empty());
        violations.extend(branch_violations);
    }

    // A document satisfying any branch conforms; discard the fan-out.
    if satisfied.iter().any(|ok| *ok) {
        violations.clear();
    }
    Ok(())
}

fn validate_object(
    schema: &ObjectSchema,
    branch: Option<&BranchPath>,
    doc: &Value,
    violations: &mut Vec<Violation>,
) {
    for field in &schema.required {
        if doc.get(field).is_none() {
            violations.push(Violation::new(
                FieldPath::field(field),
                Keyword::Required,
                branch.cloned(),
                format!("must have required property '{field}'"),
            ));
        }
    }

    for (field, ftype) in &schema.properties {
        if let Some(value) = doc.get(field) {
            check_field(FieldPath::field(field), ftype, value, branch, violations);
        }
    }
}

fn check_field(
    path: FieldPath,
    ftype: &FieldType,
    value: &Value,
    branch: Option<&BranchPath>,
    violations: &mut Vec<Violation>,
) {
    let mut push = |keyword: Keyword, message: String| {
        violations.push(Violation::new(path.clone(), keyword, branch.cloned(), message));
    };

    match ftype {
        FieldType::Any => {}
        // Reference validity is checked by the reference validator, after
        // structural validation succeeds.
        FieldType::Reference => {}
        FieldType::Bool => {
            if !value.is_boolean() {
                push(Keyword::Type, "must be boolean".to_string());
            }
        }
        FieldType::Int => {
            if !value.is_i64() && !value.is_u64() {
                push(Keyword::Type, "must be integer".to_string());
            }
        }
        FieldType::String {
            min_length,
            max_length,
        } => match value.as_str() {
            None => push(Keyword::Type, "must be string".to_string()),
            Some(s) => {
                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        push(
                            Keyword::MinLength,
                            format!("must NOT have fewer than {min} characters"),
                        );
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        push(
                            Keyword::MaxLength,
                            format!("must NOT have more than {max} characters"),
                        );
                    }
                }
            }
        },
        FieldType::Number { minimum, maximum } => match value.as_f64() {
            None => push(Keyword::Type, "must be number".to_string()),
            Some(n) => {
                if let Some(min) = minimum {
                    if n < *min {
                        push(Keyword::Minimum, format!("must be >= {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        push(Keyword::Maximum, format!("must be <= {max}"));
                    }
                }
            }
        },
        FieldType::Array {
            min_items,
            max_items,
            items: _,
        } => match value.as_array() {
            None => push(Keyword::Type, "must be array".to_string()),
            Some(arr) => {
                if let Some(min) = min_items {
                    if arr.len() < *min {
                        push(
                            Keyword::MinItems,
                            format!("must NOT have fewer than {min} items"),
                        );
                    }
                }
                if let Some(max) = max_items {
                    if arr.len() > *max {
                        push(
                            Keyword::MaxItems,
                            format!("must NOT have more than {max} items"),
                        );
                    }
                }
            }
        },
    }
}
