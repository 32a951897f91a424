//! Project identifiers.

use crate::config::ProjectConfig;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Draw a fresh random project id.
///
/// `rand::rng()` is a CSPRNG reseeded from the OS, so ids are not guessable
/// from earlier ones.
pub fn generate_project_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ProjectConfig::ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Whether `id` could name a directory directly under the project root.
///
/// Path separators, `.` and `..` and NUL are never valid. This is a
/// first filter; deletion additionally checks the resolved path.
pub fn is_single_component(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_alphanumeric() {
        let id = generate_project_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_ids_differ() {
        let ids: HashSet<String> = (0..200).map(|_| generate_project_id()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_single_component() {
        assert!(is_single_component("aB3dE5fG"));
        assert!(is_single_component("legacy-project_1"));
        assert!(!is_single_component(""));
        assert!(!is_single_component(".."));
        assert!(!is_single_component("../etc"));
        assert!(!is_single_component("a/b"));
        assert!(!is_single_component("a\\b"));
    }
}
