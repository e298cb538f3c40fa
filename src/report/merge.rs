//! Merges reports from independent validation layers.
//!
//! Field-wise union: where both layers report on the same field, the
//! second layer's descriptors are appended after the first layer's; fields
//! present on only one side pass through unchanged.

use super::errors::{ReportError, ReportResult};
use super::tree::{ErrorTree, IndexedTree, TreeNode};

/// Merges a structural report with a reference-integrity report.
///
/// Either side may be absent; `None` on both sides merges to `None`.
pub fn merge(
    structural: Option<ErrorTree>,
    reference: Option<ErrorTree>,
) -> ReportResult<Option<ErrorTree>> {
    match (structural, reference) {
        (None, None) => Ok(None),
        (Some(tree), None) | (None, Some(tree)) => Ok(tree.into_option()),
        (Some(mut a), Some(b)) => {
            merge_into(&mut a, b)?;
            Ok(a.into_option())
        }
    }
}

fn merge_into(a: &mut ErrorTree, b: ErrorTree) -> ReportResult<()> {
    a.errors.extend(b.errors);

    match (&mut a.node, b.node) {
        (_, None) => {}
        (node @ None, Some(other)) => *node = Some(other),
        (Some(TreeNode::Fields(map)), Some(TreeNode::Fields(other))) => {
            for (field, subtree) in other {
                match map.get_mut(&field) {
                    Some(existing) => merge_into(existing, subtree)?,
                    None => {
                        map.insert(field, subtree);
                    }
                }
            }
        }
        (Some(TreeNode::Items(items)), Some(TreeNode::Items(other))) => {
            for item in other {
                match items.iter_mut().find(|it| it.index == item.index) {
                    Some(existing) => merge_into(&mut existing.tree, item.tree)?,
                    None => {
                        let pos = items
                            .iter()
                            .position(|it| it.index > item.index)
                            .unwrap_or(items.len());
                        items.insert(
                            pos,
                            IndexedTree {
                                index: item.index,
                                tree: item.tree,
                            },
                        );
                    }
                }
            }
        }
        (Some(_), Some(_)) => {
            return Err(ReportError::SchemaDefect(
                "validation layers disagree on a node's shape".to_string(),
            ))
        }
    }
    Ok(())
}
