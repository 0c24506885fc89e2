//! Object retrieval URL composition

/// Compose the native retrieval URL of an object.
///
/// Segments are inserted verbatim. Object names containing reserved URL
/// characters (`?`, `#`, `%`, spaces) produce an invalid URL; callers that
/// need a fetchable link must encode the name first.
pub fn compose_object_url(
    region: &str,
    namespace: &str,
    bucket_name: &str,
    resource_name: &str,
) -> String {
    format!(
        "https://objectstorage.{}.oraclecloud.com/n/{}/b/{}/o/{}",
        region, namespace, bucket_name, resource_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_known_value() {
        assert_eq!(
            compose_object_url("us-phoenix-1", "ns1", "bkt1", "obj1"),
            "https://objectstorage.us-phoenix-1.oraclecloud.com/n/ns1/b/bkt1/o/obj1"
        );
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose_object_url("eu-frankfurt-1", "acme", "images", "2024/cat.png");
        let b = compose_object_url("eu-frankfurt-1", "acme", "images", "2024/cat.png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_inputs_distinct_urls() {
        let base = ("us-ashburn-1", "ns", "bkt", "obj");
        let variants = [
            ("us-phoenix-1", "ns", "bkt", "obj"),
            ("us-ashburn-1", "ns2", "bkt", "obj"),
            ("us-ashburn-1", "ns", "bkt2", "obj"),
            ("us-ashburn-1", "ns", "bkt", "obj2"),
        ];
        let base_url = compose_object_url(base.0, base.1, base.2, base.3);
        for (r, n, b, o) in variants {
            assert_ne!(compose_object_url(r, n, b, o), base_url);
        }
    }

    #[test]
    fn test_reserved_characters_pass_through() {
        let url = compose_object_url("us-ashburn-1", "ns", "bkt", "a b?c");
        assert!(url.ends_with("/o/a b?c"));
    }
}
