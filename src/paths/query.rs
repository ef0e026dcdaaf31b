/// Split a URI into its path and any `?query` / `#fragment` suffix.
///
/// The suffix keeps its leading delimiter so that it can be reattached verbatim.
pub fn split_query(uri: &str) -> (&str, &str) {
    match uri.find(['?', '#']) {
        Some(index) => uri.split_at(index),
        None => (uri, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::split_query;

    #[test]
    fn detaches_query_strings() {
        assert_eq!(split_query("a.png?v=2"), ("a.png", "?v=2"));
    }

    #[test]
    fn detaches_fragments_after_queries() {
        assert_eq!(
            split_query("fonts/icons.svg?v=1#iefix"),
            ("fonts/icons.svg", "?v=1#iefix")
        );
        assert_eq!(split_query("sprite.svg#logo"), ("sprite.svg", "#logo"));
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(split_query("img/x.png"), ("img/x.png", ""));
    }
}
