//! Builds the error tree from flat violations.
//!
//! Violations are grouped by instance path; array-indexed paths produce
//! indexed child lists rather than field maps. Classification of raw
//! keywords into error kinds is injected so callers can override it, with
//! `classify` providing the standard mapping.

use std::collections::BTreeMap;

use crate::schema::{Keyword, PathSegment, Violation};

use super::errors::{ReportError, ReportResult};
use super::tree::{ErrorDescriptor, ErrorKind, ErrorTree, IndexedTree, Provenance, TreeNode};

/// The standard keyword classification:
/// `required` becomes `FieldMissing`, `type` becomes `TypeMismatch`, and
/// every other constraint keyword becomes a generic `ValidationError`.
///
/// `additionalProperties` is never classified; it is intercepted upstream
/// as an internal invariant violation, and this function refuses it too in
/// case that interception is ever bypassed.
pub fn classify(violation: &Violation) -> ReportResult<ErrorDescriptor> {
    let kind = match violation.keyword {
        Keyword::AdditionalProperties => return Err(ReportError::UndeclaredField),
        Keyword::Required => ErrorKind::FieldMissing,
        Keyword::Type => ErrorKind::TypeMismatch,
        Keyword::Enum
        | Keyword::MinLength
        | Keyword::MaxLength
        | Keyword::Minimum
        | Keyword::Maximum
        | Keyword::MinItems
        | Keyword::MaxItems => ErrorKind::ValidationError,
    };
    Ok(ErrorDescriptor::new(
        kind,
        violation.message.clone(),
        Some(Provenance {
            keyword: violation.keyword,
            branch: violation.branch.clone(),
        }),
    ))
}

/// Builds an error tree from flat violations, classifying each one with
/// the given function. Returns `None` when the violation list is empty.
pub fn build_tree<F>(violations: &[Violation], classify: F) -> ReportResult<Option<ErrorTree>>
where
    F: Fn(&Violation) -> ReportResult<ErrorDescriptor>,
{
    let mut root = ErrorTree::new();

    for violation in violations {
        let descriptor = classify(violation)?;
        let target = descend(&mut root, violation.path.segments())?;
        target.errors.push(descriptor);
    }

    Ok(root.into_option())
}

/// Walks (and creates) the path down to the node a violation belongs to.
fn descend<'a>(
    mut tree: &'a mut ErrorTree,
    segments: &[PathSegment],
) -> ReportResult<&'a mut ErrorTree> {
    for segment in segments {
        match segment {
            PathSegment::Field(name) => {
                let map = match tree.node.get_or_insert_with(|| TreeNode::Fields(BTreeMap::new()))
                {
                    TreeNode::Fields(map) => map,
                    TreeNode::Items(_) => {
                        return Err(ReportError::SchemaDefect(format!(
                            "field '{name}' addressed inside an array node"
                        )))
                    }
                };
                tree = map.entry(name.clone()).or_insert_with(ErrorTree::new);
            }
            PathSegment::Index(index) => {
                let items = match tree.node.get_or_insert_with(|| TreeNode::Items(Vec::new())) {
                    TreeNode::Items(items) => items,
                    TreeNode::Fields(_) => {
                        return Err(ReportError::SchemaDefect(format!(
                            "index {index} addressed inside an object node"
                        )))
                    }
                };
                let pos = match items.iter().position(|it| it.index >= *index) {
                    Some(pos) if items[pos].index == *index => pos,
                    Some(pos) => {
                        items.insert(
                            pos,
                            IndexedTree {
                                index: *index,
                                tree: ErrorTree::new(),
                            },
                        );
                        pos
                    }
                    None => {
                        items.push(IndexedTree {
                            index: *index,
                            tree: ErrorTree::new(),
                        });
                        items.len() - 1
                    }
                };
                tree = &mut items[pos].tree;
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BranchPath, FieldPath};

    #[test]
    fn test_no_violations_builds_nothing() {
        assert_eq!(build_tree(&[], classify).unwrap(), None);
    }

    #[test]
    fn test_groups_by_field() {
        let violations = vec![
            Violation::new(
                FieldPath::field("name"),
                Keyword::Required,
                Some(BranchPath::one_of(0)),
                "must have required property 'name'",
            ),
            Violation::new(
                FieldPath::field("name"),
                Keyword::MinLength,
                Some(BranchPath::one_of(1)),
                "must NOT have fewer than 3 characters",
            ),
        ];

        let tree = build_tree(&violations, classify).unwrap().unwrap();
        let name = tree.field("name").unwrap();
        assert_eq!(name.errors.len(), 2);
        assert_eq!(name.errors[0].kind, ErrorKind::FieldMissing);
        assert_eq!(name.errors[1].kind, ErrorKind::ValidationError);
    }

    #[test]
    fn test_indexed_paths_build_item_lists() {
        let violations = vec![
            Violation::new(
                FieldPath::field("photos").index(4),
                Keyword::Type,
                None,
                "must be string",
            ),
            Violation::new(
                FieldPath::field("photos").index(1),
                Keyword::Type,
                None,
                "must be string",
            ),
        ];

        let tree = build_tree(&violations, classify).unwrap().unwrap();
        let photos = tree.field("photos").unwrap();
        match &photos.node {
            Some(TreeNode::Items(items)) => {
                // sorted by index regardless of arrival order
                let indexes: Vec<_> = items.iter().map(|it| it.index).collect();
                assert_eq!(indexes, vec![1, 4]);
            }
            other => panic!("expected indexed items, got {other:?}"),
        }
    }

    #[test]
    fn test_root_violation_lands_on_root() {
        let violations = vec![Violation::new(
            FieldPath::root(),
            Keyword::Type,
            None,
            "must be object",
        )];

        let tree = build_tree(&violations, classify).unwrap().unwrap();
        assert_eq!(tree.errors.len(), 1);
        assert_eq!(tree.errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_additional_properties_never_classified() {
        let violation = Violation::new(
            FieldPath::field("smuggled"),
            Keyword::AdditionalProperties,
            None,
            "must NOT have additional properties",
        );
        assert_eq!(
            build_tree(&[violation], classify).unwrap_err(),
            ReportError::UndeclaredField
        );
    }

    #[test]
    fn test_classification_keeps_provenance() {
        let violation = Violation::new(
            FieldPath::field("expose"),
            Keyword::Enum,
            Some(BranchPath::one_of(1)),
            "must be equal to one of the allowed values",
        );
        let descriptor = classify(&violation).unwrap();
        assert_eq!(descriptor.keyword(), Some(Keyword::Enum));
        assert_eq!(descriptor.branch(), Some(&BranchPath::one_of(1)));
    }
}
