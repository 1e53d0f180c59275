//! What a run should check.

use crate::error::ReadallError;
use crate::tap::TapId;

/// Which taps to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TapSelection {
    /// Every installed tap.
    #[default]
    All,
    /// Only these, as typed by the user.
    Named(Vec<String>),
}

impl TapSelection {
    /// `All` for an empty list, otherwise `Named`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            TapSelection::All
        } else {
            TapSelection::Named(names)
        }
    }

    /// Parse the named taps. `All` parses to an empty list.
    pub fn ids(&self) -> Result<Vec<TapId>, ReadallError> {
        match self {
            TapSelection::All => Ok(Vec::new()),
            TapSelection::Named(names) => names.iter().map(|n| n.parse()).collect(),
        }
    }
}

/// Options for [`crate::Readall::run_validation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Scan the library's own source tree with the syntax oracle.
    pub check_syntax: bool,
    /// Resolve every alias of each selected tap.
    pub check_aliases: bool,
    pub taps: TapSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_mean_all() {
        assert_eq!(TapSelection::from_names(Vec::<String>::new()), TapSelection::All);
        assert!(TapSelection::All.ids().unwrap().is_empty());
    }

    #[test]
    fn named_taps_parse() {
        let sel = TapSelection::from_names(["core", "foo/homebrew-bar"]);
        let ids: Vec<String> = sel.ids().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["homebrew/core", "foo/bar"]);
    }

    #[test]
    fn bad_name_is_fatal() {
        let sel = TapSelection::from_names(["nope"]);
        assert!(matches!(sel.ids(), Err(ReadallError::InvalidTapName { .. })));
    }
}
