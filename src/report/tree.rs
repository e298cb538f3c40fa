//! The error tree: a hierarchical, field-addressed validation report.
//!
//! Wire shape: `{errors: [{kind, message, context}], node: map | list}`.
//! A report with no errors at any level is never represented as an empty
//! tree; callers pass `Option<ErrorTree>` around and `None` is the single
//! "no errors" sentinel.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::schema::{BranchPath, Keyword};

/// The closed set of error kinds surfaced to callers.
///
/// Every boundary switches on this exhaustively; no code branches on the
/// structural identity of an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// A required field is absent
    FieldMissing,
    /// A field holds a value of the wrong type
    TypeMismatch,
    /// A generic constraint violation
    ValidationError,
    /// The caller attempted to write an immutable or identity field
    FieldUnknown,
    /// A referenced resource does not exist
    ResourceNotFound,
    /// A malformed identifier argument
    InvalidCriterion,
    /// The persistence layer rejected data that passes domain validation
    ValidationConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FieldMissing => "FieldMissing",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::FieldUnknown => "FieldUnknown",
            ErrorKind::ResourceNotFound => "ResourceNotFound",
            ErrorKind::InvalidCriterion => "InvalidCriterion",
            ErrorKind::ValidationConflict => "ValidationConflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured provenance carried by a descriptor: which keyword fired and,
/// for union schemas, which branch the violation belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub keyword: Keyword,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchPath>,
}

/// A single error entry in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Provenance>,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: Option<Provenance>) -> Self {
        Self {
            kind,
            message: message.into(),
            context,
        }
    }

    /// A descriptor with no structural provenance
    pub fn bare(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None)
    }

    /// The keyword this descriptor originated from, if it has provenance
    pub fn keyword(&self) -> Option<Keyword> {
        self.context.as_ref().map(|c| c.keyword)
    }

    /// The union branch this descriptor belongs to, if any
    pub fn branch(&self) -> Option<&BranchPath> {
        self.context.as_ref().and_then(|c| c.branch.as_ref())
    }
}

/// Child nodes of a tree: a field map for objects, an indexed list for
/// array elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TreeNode {
    Fields(BTreeMap<String, ErrorTree>),
    Items(Vec<IndexedTree>),
}

/// An array-element subtree, tagged with the element index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedTree {
    pub index: usize,
    #[serde(flatten)]
    pub tree: ErrorTree,
}

/// A validation report node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTree {
    pub errors: Vec<ErrorDescriptor>,
    pub node: Option<TreeNode>,
}

impl ErrorTree {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            node: None,
        }
    }

    /// True when no error exists at this level or below
    pub fn is_empty(&self) -> bool {
        if !self.errors.is_empty() {
            return false;
        }
        match &self.node {
            None => true,
            Some(TreeNode::Fields(map)) => map.values().all(ErrorTree::is_empty),
            Some(TreeNode::Items(items)) => items.iter().all(|it| it.tree.is_empty()),
        }
    }

    /// `None` for an empty tree, the tree itself otherwise
    pub fn into_option(self) -> Option<ErrorTree> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// The subtree of a named field, if present
    pub fn field(&self, name: &str) -> Option<&ErrorTree> {
        match &self.node {
            Some(TreeNode::Fields(map)) => map.get(name),
            _ => None,
        }
    }

    /// Named child fields at this level
    pub fn field_names(&self) -> Vec<&str> {
        match &self.node {
            Some(TreeNode::Fields(map)) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Keeps only descriptors the predicate accepts, then prunes empty
    /// subtrees. The predicate receives the nearest enclosing field name
    /// (`None` for root-level descriptors; array elements inherit the name
    /// of the field holding the array).
    pub fn retain<F>(&mut self, predicate: &mut F)
    where
        F: FnMut(Option<&str>, &ErrorDescriptor) -> bool,
    {
        self.retain_inner(None, predicate);
    }

    fn retain_inner<F>(&mut self, field: Option<&str>, predicate: &mut F)
    where
        F: FnMut(Option<&str>, &ErrorDescriptor) -> bool,
    {
        self.errors.retain(|d| predicate(field, d));

        let drop_node = match &mut self.node {
            None => false,
            Some(TreeNode::Fields(map)) => {
                for (name, child) in map.iter_mut() {
                    let name = name.clone();
                    child.retain_inner(Some(&name), predicate);
                }
                map.retain(|_, child| !child.is_empty());
                map.is_empty()
            }
            Some(TreeNode::Items(items)) => {
                for item in items.iter_mut() {
                    item.tree.retain_inner(field, predicate);
                }
                items.retain(|item| !item.tree.is_empty());
                items.is_empty()
            }
        };
        if drop_node {
            self.node = None;
        }
    }
}

impl Default for ErrorTree {
    fn default() -> Self {
        Self::new()
    }
}
