//! The catalog validation pipeline.
//!
//! A write request passes through: structural validation → error-tree
//! build → discriminator filter → (only when structurally valid)
//! reference validation → merge. Reference validation of malformed-shape
//! data is meaningless, so it never runs on a structurally invalid
//! document.

use serde_json::Value;
use uuid::Uuid;

use crate::report::{
    self, ErrorDescriptor, ErrorKind, ErrorTree, IndexedTree, TreeNode,
};
use crate::schema::{self, DocumentSchema, SchemaDef};

use super::errors::CatalogResult;
use super::schemas::CatalogSchemas;
use super::types::PhotoDraft;

/// Runs the full pipeline for a document against a schema definition.
///
/// `None` means the document is valid at both layers.
pub fn validate_with(def: &SchemaDef, doc: &Value) -> CatalogResult<Option<ErrorTree>> {
    let violations = schema::validate_document(def, doc)?;
    let structural = report::build_tree(&violations, report::classify)?;

    // The filter applies to branch fan-out only; a root-level error (the
    // document is not an object) has no branches to disambiguate.
    let structural = match (structural, def.document.discriminator()) {
        (Some(tree), Some(discriminator)) if tree.errors.is_empty() => {
            report::filter_branch_errors(tree, discriminator)?
        }
        (tree, _) => tree,
    };

    let reference = if structural.is_none() {
        validate_references(&def.document, doc)
    } else {
        None
    };

    Ok(report::merge(structural, reference)?)
}

/// Validates caller input for a product write.
pub fn validate_product(schemas: &CatalogSchemas, fields: &Value) -> CatalogResult<Option<ErrorTree>> {
    validate_with(&schemas.product_input, fields)
}

/// Second-pass validation of a stored product document, used when the
/// store rejects a write the domain already accepted.
pub fn validate_stored_product(
    schemas: &CatalogSchemas,
    doc: &Value,
) -> CatalogResult<Option<ErrorTree>> {
    validate_with(&schemas.product_stored, doc)
}

/// Second-pass validation of a stored photo document.
pub fn validate_stored_photo(
    schemas: &CatalogSchemas,
    doc: &Value,
) -> CatalogResult<Option<ErrorTree>> {
    validate_with(&schemas.photo_stored, doc)
}

/// Validates a batch of photo drafts. Failures are reported per draft
/// under an indexed node, so the caller can tell which entry is broken.
pub fn validate_photo_drafts(
    schemas: &CatalogSchemas,
    drafts: &[PhotoDraft],
) -> CatalogResult<Option<ErrorTree>> {
    let mut items: Vec<IndexedTree> = Vec::new();

    for (index, draft) in drafts.iter().enumerate() {
        let doc = serde_json::to_value(draft)
            .map_err(|e| super::errors::CatalogError::Internal(e.to_string()))?;
        if let Some(tree) = validate_with(&schemas.photo_input, &doc)? {
            items.push(IndexedTree { index, tree });
        }
    }

    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(ErrorTree {
        errors: Vec::new(),
        node: Some(TreeNode::Items(items)),
    }))
}

/// Checks reference-typed fields for syntactic identifier validity.
///
/// Which fields are references is read off the schema itself; existence
/// of the referenced documents is the store's concern, not this one's.
/// Absent fields are skipped — requiredness is the structural layer's job.
pub fn validate_references(schema: &DocumentSchema, doc: &Value) -> Option<ErrorTree> {
    let mut root = ErrorTree::new();

    for (field, is_list) in schema.reference_fields() {
        let value = match doc.get(&field) {
            Some(value) => value,
            None => continue,
        };

        if is_list {
            let elements = match value.as_array() {
                Some(elements) => elements,
                // shape errors belong to the structural layer
                None => continue,
            };
            let mut items: Vec<IndexedTree> = Vec::new();
            for (index, element) in elements.iter().enumerate() {
                if let Some(message) = reference_error(element) {
                    items.push(IndexedTree {
                        index,
                        tree: ErrorTree {
                            errors: vec![ErrorDescriptor::bare(ErrorKind::ValidationError, message)],
                            node: None,
                        },
                    });
                }
            }
            if !items.is_empty() {
                insert_field(
                    &mut root,
                    &field,
                    ErrorTree {
                        errors: Vec::new(),
                        node: Some(TreeNode::Items(items)),
                    },
                );
            }
        } else if let Some(message) = reference_error(value) {
            insert_field(
                &mut root,
                &field,
                ErrorTree {
                    errors: vec![ErrorDescriptor::bare(ErrorKind::ValidationError, message)],
                    node: None,
                },
            );
        }
    }

    root.into_option()
}

fn insert_field(root: &mut ErrorTree, field: &str, tree: ErrorTree) {
    let map = match root
        .node
        .get_or_insert_with(|| TreeNode::Fields(Default::default()))
    {
        TreeNode::Fields(map) => map,
        // the root of a reference report is always a field map
        TreeNode::Items(_) => unreachable!("reference report root is a field map"),
    };
    map.insert(field.to_string(), tree);
}

/// `None` when the value is a well-formed identifier, the failure message
/// otherwise.
fn reference_error(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("id cannot be null".to_string()),
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(_) => None,
            Err(_) => Some(format!("invalid reference id '{s}'")),
        },
        other => Some(format!("id must be a string, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn schemas() -> CatalogSchemas {
        CatalogSchemas::latest()
    }

    fn exposed_product(cover: &str, photos: Vec<String>) -> Value {
        json!({
            "expose": true,
            "name": "lamp",
            "price": 40,
            "is_in_stock": true,
            "photos": photos,
            "cover_photo": cover,
            "description": "a lamp"
        })
    }

    #[test]
    fn test_valid_unexposed_product() {
        let result = validate_product(&schemas(), &json!({"expose": false})).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_valid_exposed_product() {
        let doc = exposed_product(&valid_id(), vec![valid_id(), valid_id()]);
        assert_eq!(validate_product(&schemas(), &doc).unwrap(), None);
    }

    #[test]
    fn test_missing_fields_reported_without_other_branch_artifacts() {
        let doc = json!({"expose": true, "name": "lamp"});
        let tree = validate_product(&schemas(), &doc).unwrap().unwrap();

        let mut fields = tree.field_names();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec!["cover_photo", "description", "is_in_stock", "photos", "price"]
        );
        for field in fields {
            let sub = tree.field(field).unwrap();
            assert_eq!(sub.errors.len(), 1, "one error per missing field");
            assert_eq!(sub.errors[0].kind, ErrorKind::FieldMissing);
        }
    }

    #[test]
    fn test_missing_discriminator_reports_only_the_discriminator() {
        let doc = json!({"name": "lamp"});
        let tree = validate_product(&schemas(), &doc).unwrap().unwrap();

        assert_eq!(tree.field_names(), vec!["expose"]);
        let expose = tree.field("expose").unwrap();
        assert_eq!(expose.errors.len(), 1);
        assert_eq!(expose.errors[0].kind, ErrorKind::FieldMissing);
        assert!(tree.errors.is_empty());
    }

    #[test]
    fn test_reference_validation_runs_only_when_structurally_valid() {
        // structurally broken (name too short) AND with a bad reference:
        // only the structural report surfaces
        let mut doc = exposed_product("not-an-id", vec![valid_id()]);
        doc["name"] = json!("ab");
        let tree = validate_product(&schemas(), &doc).unwrap().unwrap();
        assert!(tree.field("name").is_some());
        assert!(tree.field("cover_photo").is_none());
    }

    #[test]
    fn test_bad_references_reported_per_index() {
        let doc = exposed_product(&valid_id(), vec![valid_id(), "junk".to_string()]);
        let tree = validate_product(&schemas(), &doc).unwrap().unwrap();

        let photos = tree.field("photos").unwrap();
        match &photos.node {
            Some(TreeNode::Items(items)) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].index, 1);
                assert_eq!(items[0].tree.errors[0].kind, ErrorKind::ValidationError);
            }
            other => panic!("expected indexed items, got {other:?}"),
        }
    }

    #[test]
    fn test_null_reference_is_reported() {
        let mut doc = exposed_product(&valid_id(), vec![valid_id()]);
        doc["cover_photo"] = Value::Null;
        // null is tolerated structurally (reference fields are loose) but
        // not by the reference validator
        let tree = validate_product(&schemas(), &doc).unwrap().unwrap();
        let cover = tree.field("cover_photo").unwrap();
        assert_eq!(cover.errors[0].message, "id cannot be null");
    }

    #[test]
    fn test_non_object_document_reports_at_root() {
        let tree = validate_product(&schemas(), &json!(42)).unwrap().unwrap();
        assert_eq!(tree.errors.len(), 1);
        assert_eq!(tree.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(tree.node, None);
    }

    #[test]
    fn test_photo_draft_batch_reports_by_index() {
        let drafts = vec![
            PhotoDraft { path: "a.jpg".to_string() },
            PhotoDraft { path: String::new() },
        ];
        let tree = validate_photo_drafts(&schemas(), &drafts).unwrap().unwrap();
        match &tree.node {
            Some(TreeNode::Items(items)) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].index, 1);
                assert!(items[0].tree.field("path").is_some());
            }
            other => panic!("expected indexed items, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_drafts_produce_no_report() {
        let drafts = vec![PhotoDraft { path: "a.jpg".to_string() }];
        assert_eq!(validate_photo_drafts(&schemas(), &drafts).unwrap(), None);
    }
}
