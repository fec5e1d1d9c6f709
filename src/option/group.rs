//! Group-level options and their resolved configuration.

use super::SecurityRequirement;
use super::operation::OperationOption;

/// One group-level configuration mutation.
///
/// Applied left to right: sequences accumulate, booleans are last-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOption {
    /// Tags for every operation in the group.
    Tags(Vec<String>),
    /// Security requirement for every operation in the group.
    Security(SecurityRequirement),
    /// Removes the whole subtree from the document when `true`.
    Hide(bool),
    /// Marks every operation in the subtree deprecated when `true`.
    Deprecated(bool),
}

/// Group metadata resolved from an ordered list of [`GroupOption`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupConfig {
    /// Accumulated tags, duplicates kept.
    pub tags: Vec<String>,
    /// Accumulated security requirements.
    pub security: Vec<SecurityRequirement>,
    /// Subtree is hidden.
    pub hide: bool,
    /// Subtree is deprecated.
    pub deprecated: bool,
}

impl GroupConfig {
    /// Folds `options` in order.
    #[must_use]
    pub fn resolve<'a>(options: impl IntoIterator<Item = &'a GroupOption>) -> Self {
        let mut config = Self::default();
        for option in options {
            config.apply(option);
        }
        config
    }

    /// Applies one option.
    pub fn apply(&mut self, option: &GroupOption) {
        match option {
            GroupOption::Tags(tags) => self.tags.extend(tags.iter().cloned()),
            GroupOption::Security(requirement) => self.security.push(requirement.clone()),
            GroupOption::Hide(hide) => self.hide = *hide,
            GroupOption::Deprecated(deprecated) => self.deprecated = *deprecated,
        }
    }

    /// Operation options every route of the group inherits, to be placed
    /// before the route's own options.
    #[must_use]
    pub fn operation_options(&self) -> Vec<OperationOption> {
        let mut options = Vec::new();
        if !self.tags.is_empty() {
            options.push(OperationOption::Tags(self.tags.clone()));
        }
        options.extend(self.security.iter().cloned().map(OperationOption::Security));
        if self.deprecated {
            options.push(OperationOption::Deprecated(true));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(name: &str) -> SecurityRequirement {
        SecurityRequirement {
            name: name.to_string(),
            scopes: Vec::new(),
        }
    }

    #[test]
    fn empty_options_are_transparent() {
        let config = GroupConfig::resolve(std::iter::empty());
        assert_eq!(config, GroupConfig::default());
        assert!(config.operation_options().is_empty());
    }

    #[test]
    fn sequences_accumulate_booleans_overwrite() {
        let options = vec![
            GroupOption::Tags(vec!["a".to_string()]),
            GroupOption::Deprecated(true),
            GroupOption::Security(requirement("key")),
            GroupOption::Tags(vec!["a".to_string(), "b".to_string()]),
            GroupOption::Deprecated(false),
        ];
        let config = GroupConfig::resolve(&options);
        assert_eq!(config.tags, vec!["a", "a", "b"]);
        assert_eq!(config.security, vec![requirement("key")]);
        assert!(!config.deprecated);
    }

    #[test]
    fn inherited_operation_options_in_fixed_order() {
        let config = GroupConfig {
            tags: vec!["pets".to_string()],
            security: vec![requirement("a"), requirement("b")],
            hide: false,
            deprecated: true,
        };
        let options = config.operation_options();
        assert_eq!(options.len(), 4);
        assert!(matches!(options.first(), Some(OperationOption::Tags(tags)) if tags == &["pets"]));
        assert!(matches!(options.last(), Some(OperationOption::Deprecated(true))));
    }
}
