//! Resource clients for the platform REST API.

pub mod environments;
pub mod repos;
pub mod users;
pub mod variables;

// Re-exports
pub use environments::EnvironmentsClient;
pub use repos::ReposClient;
pub use users::UsersClient;
pub use variables::VariablesClient;

/// Percent-encode one path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("staging"), "staging");
        assert_eq!(segment("QA env/1"), "QA%20env%2F1");
    }
}
