//! Discriminator disambiguation.
//!
//! Validating against every union branch reports errors for the branch the
//! caller did not intend. This filter removes them, in two regimes:
//!
//! 1. The discriminator itself failed `required` or `type`: the intended
//!    branch is unknowable. Drop every error sharing the triggering
//!    error's branch, every `required` error on other fields, and every
//!    `enum` error (an enum failure only ever means "wrong literal for
//!    this branch" and is never actionable once the branch is
//!    undetermined). What survives is the discriminator's own error.
//!
//! 2. The discriminator is syntactically valid: exactly one branch did not
//!    fire its `enum` constraint on the discriminator and is therefore the
//!    selected one. Drop every error belonging to a branch that did.
//!
//! Branches encode mutually exclusive literals, so a valid discriminator
//! excludes all branches but one. A union where that does not hold is a
//! schema-authoring defect, not a runtime case.

use crate::schema::{BranchPath, Keyword};

use super::errors::{ReportError, ReportResult};
use super::tree::ErrorTree;

/// Filters branch-foreign errors out of a freshly built tree.
pub fn filter_branch_errors(
    mut tree: ErrorTree,
    discriminator: &str,
) -> ReportResult<Option<ErrorTree>> {
    let trigger_branch = tree.field(discriminator).and_then(|sub| {
        sub.errors
            .iter()
            .find(|d| matches!(d.keyword(), Some(Keyword::Required) | Some(Keyword::Type)))
            .map(|d| d.branch().cloned())
    });

    if let Some(trigger_branch) = trigger_branch {
        tree.retain(&mut |field, descriptor| {
            if trigger_branch.is_some() && descriptor.branch() == trigger_branch.as_ref() {
                return false;
            }
            if descriptor.keyword() == Some(Keyword::Required) && field != Some(discriminator) {
                return false;
            }
            if descriptor.keyword() == Some(Keyword::Enum) {
                return false;
            }
            true
        });
        return Ok(tree.into_option());
    }

    let mut excluded: Vec<BranchPath> = Vec::new();
    if let Some(sub) = tree.field(discriminator) {
        for descriptor in &sub.errors {
            if descriptor.keyword() == Some(Keyword::Enum) {
                if let Some(branch) = descriptor.branch() {
                    if !excluded.contains(branch) {
                        excluded.push(branch.clone());
                    }
                }
            }
        }
    }

    if excluded.is_empty() {
        return Err(ReportError::SchemaDefect(
            "discriminator is valid but no branch fired its enum constraint".to_string(),
        ));
    }

    tree.retain(&mut |_, descriptor| {
        descriptor
            .branch()
            .map_or(true, |branch| !excluded.contains(branch))
    });
    Ok(tree.into_option())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::builder::{build_tree, classify};
    use crate::report::tree::ErrorKind;
    use crate::schema::{FieldPath, Violation};

    fn violation(
        field: &str,
        keyword: Keyword,
        branch: Option<usize>,
        message: &str,
    ) -> Violation {
        Violation::new(
            FieldPath::field(field),
            keyword,
            branch.map(BranchPath::one_of),
            message,
        )
    }

    /// The fan-out for a document missing the discriminator entirely,
    /// against a union whose first branch requires several fields.
    fn missing_discriminator_violations() -> Vec<Violation> {
        vec![
            violation("expose", Keyword::Required, Some(0), "must have required property 'expose'"),
            violation("name", Keyword::Required, Some(0), "must have required property 'name'"),
            violation("price", Keyword::Required, Some(0), "must have required property 'price'"),
            violation("expose", Keyword::Required, Some(1), "must have required property 'expose'"),
        ]
    }

    #[test]
    fn test_missing_discriminator_keeps_only_its_own_error() {
        let tree = build_tree(&missing_discriminator_violations(), classify)
            .unwrap()
            .unwrap();
        let filtered = filter_branch_errors(tree, "expose").unwrap().unwrap();

        assert_eq!(filtered.field_names(), vec!["expose"]);
        let expose = filtered.field("expose").unwrap();
        assert_eq!(expose.errors.len(), 1);
        assert_eq!(expose.errors[0].kind, ErrorKind::FieldMissing);
    }

    #[test]
    fn test_wrong_discriminator_type_discards_branch_noise() {
        let violations = vec![
            violation("expose", Keyword::Type, Some(0), "must be boolean"),
            violation("name", Keyword::Required, Some(0), "must have required property 'name'"),
            violation("expose", Keyword::Type, Some(1), "must be boolean"),
        ];
        let tree = build_tree(&violations, classify).unwrap().unwrap();
        let filtered = filter_branch_errors(tree, "expose").unwrap().unwrap();

        assert_eq!(filtered.field_names(), vec!["expose"]);
        let expose = filtered.field("expose").unwrap();
        assert_eq!(expose.errors.len(), 1);
        assert_eq!(expose.errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_valid_discriminator_drops_non_selected_branch() {
        // expose=true selects branch 0; branch 1 fired its enum constraint.
        let violations = vec![
            violation("name", Keyword::Required, Some(0), "must have required property 'name'"),
            violation("price", Keyword::Minimum, Some(0), "must be >= 0"),
            violation("price", Keyword::Minimum, Some(1), "must be >= 0"),
            violation(
                "expose",
                Keyword::Enum,
                Some(1),
                "must be equal to one of the allowed values",
            ),
        ];
        let tree = build_tree(&violations, classify).unwrap().unwrap();
        let filtered = filter_branch_errors(tree, "expose").unwrap().unwrap();

        // everything from branch 1 is gone, including the enum error itself
        let mut fields = filtered.field_names();
        fields.sort_unstable();
        assert_eq!(fields, vec!["name", "price"]);
        assert_eq!(filtered.field("price").unwrap().errors.len(), 1);
        assert!(filtered.field("expose").is_none());
    }

    #[test]
    fn test_valid_discriminator_with_no_excluded_branch_is_a_defect() {
        let violations = vec![violation(
            "name",
            Keyword::Required,
            Some(0),
            "must have required property 'name'",
        )];
        let tree = build_tree(&violations, classify).unwrap().unwrap();

        let err = filter_branch_errors(tree, "expose").unwrap_err();
        assert!(matches!(err, ReportError::SchemaDefect(_)));
    }

    #[test]
    fn test_fully_filtered_tree_collapses_to_none() {
        // Only an enum error on the non-selected branch: nothing survives.
        let violations = vec![violation(
            "expose",
            Keyword::Enum,
            Some(1),
            "must be equal to one of the allowed values",
        )];
        let tree = build_tree(&violations, classify).unwrap().unwrap();
        assert_eq!(filter_branch_errors(tree, "expose").unwrap(), None);
    }
}
