//! Path parameter extraction.

use indexmap::IndexMap;

/// Path parameters of a matched request, keyed by name, in pattern order.
pub type Params = IndexMap<String, String>;

/// Extract `:name` bindings from `path` according to `pattern`.
///
/// Segment counts must agree; otherwise an empty map is returned. Literal
/// segments are not compared, matching is the router's job.
pub fn extract(pattern: &str, path: &str) -> Params {
    let pattern_parts: Vec<&str> = pattern.split('/').collect();
    let path_parts: Vec<&str> = path.split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return Params::new();
    }

    pattern_parts
        .iter()
        .zip(path_parts.iter())
        .filter_map(|(pattern_part, value)| {
            pattern_part
                .strip_prefix(':')
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_named_segments() {
        let params = extract("/users/:id/:name", "/users/42/ana");
        assert_eq!(params.len(), 2);
        assert_eq!(params["id"], "42");
        assert_eq!(params["name"], "ana");
    }

    #[test]
    fn test_bindings_keep_pattern_order() {
        let params = extract("/a/:z/:y/:x/:w/:v", "/a/1/2/3/4/5");
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "y", "x", "w", "v"]);

        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"z":"1","y":"2","x":"3","w":"4","v":"5"}"#);
    }

    #[test]
    fn test_ignores_literal_segments() {
        let params = extract("/users/:id/profile", "/users/7/profile");
        assert_eq!(params.len(), 1);
        assert_eq!(params["id"], "7");
    }

    #[test]
    fn test_mismatched_length_is_empty() {
        assert!(extract("/users/:id", "/a/b/c").is_empty());
        assert!(extract("/users/:id/:name", "/users/1").is_empty());
    }

    #[test]
    fn test_no_params() {
        assert!(extract("/ping", "/ping").is_empty());
    }
}
