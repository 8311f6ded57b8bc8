//! External-ID extraction
//!
//! For a request and its matched section, produce the ordered list of
//! external IDs, consulting in order: the URL path tail, configured headers,
//! the structured body, and finally (for creating requests under a pattern
//! that admits a tail segment) a freshly minted UUID.

use crate::pattern::split_segments;
use crate::section::Section;
use crate::{Error, Result};
use axum::http::{HeaderMap, Method};
use std::collections::HashSet;
use uuid::Uuid;

impl Section {
    /// Extract every external ID the request carries. Empty strings are
    /// discarded and duplicates removed, preserving first occurrence.
    ///
    /// Body extraction only runs for POST and PUT, only when the section
    /// configures body paths, and only for a declared JSON or XML content
    /// type; a malformed body is then an invalid request. Other content
    /// types skip the body without failing.
    pub fn extract_ids(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        if matches!(*method, Method::GET | Method::PUT | Method::DELETE) {
            if let Some(id) = path_tail_id(path) {
                ids.push(id.to_string());
            }
        }

        for name in &self.header_id_names {
            let value = headers
                .get_all(name.as_str())
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find(|v| !v.trim().is_empty());
            if let Some(value) = value {
                ids.push(value.to_string());
            }
        }

        if matches!(*method, Method::POST | Method::PUT) && !self.body_id_paths.is_empty() {
            self.extract_body_ids(content_type, body, &mut ids)?;
        }

        let mut seen = HashSet::new();
        ids.retain(|id| !id.is_empty() && seen.insert(id.clone()));

        if ids.is_empty() && *method == Method::POST && self.admits_tail_id(path) {
            ids.push(Uuid::new_v4().to_string());
        }

        Ok(ids)
    }

    fn extract_body_ids(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        ids: &mut Vec<String>,
    ) -> Result<()> {
        let Some(content_type) = content_type else {
            return Ok(());
        };
        let content_type = content_type.to_ascii_lowercase();

        if content_type.contains("json") {
            let value: serde_json::Value = serde_json::from_slice(body)
                .map_err(|e| Error::invalid_request(format!("malformed JSON body: {e}")))?;
            for expr in &self.body_id_paths {
                ids.extend(expr.eval_json(&value));
            }
        } else if content_type.contains("xml") {
            let text = std::str::from_utf8(body)
                .map_err(|e| Error::invalid_request(format!("XML body is not UTF-8: {e}")))?;
            let doc = roxmltree::Document::parse(text)
                .map_err(|e| Error::invalid_request(format!("malformed XML body: {e}")))?;
            for expr in &self.body_id_paths {
                ids.extend(expr.eval_xml(&doc));
            }
        }
        Ok(())
    }
}

/// The path tail is an ID only when the path has more than one segment;
/// a single-segment path is a collection request.
pub fn path_tail_id(path: &str) -> Option<&str> {
    let segments = split_segments(path);
    if segments.len() > 1 {
        segments.last().copied()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionConfig;

    fn section(pattern: &str, body_paths: &[&str], header_names: &[&str]) -> Section {
        let config = SectionConfig {
            path_pattern: pattern.to_string(),
            body_id_paths: body_paths.iter().map(|s| s.to_string()).collect(),
            header_id_names: header_names.iter().map(|s| s.to_string()).collect(),
            case_sensitive: false,
            strict_path: false,
            return_body: false,
        };
        Section::compile("test", &config).unwrap()
    }

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.append(
                axum::http::HeaderName::try_from(*name).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_path_tail_id() {
        assert_eq!(path_tail_id("/products/tok-1"), Some("tok-1"));
        assert_eq!(path_tail_id("/a/b/c"), Some("c"));
        assert_eq!(path_tail_id("/products"), None);
        assert_eq!(path_tail_id("/products/"), None);
    }

    #[test]
    fn test_get_uses_path_tail() {
        let s = section("/products/*", &[], &[]);
        let ids = s
            .extract_ids(&Method::GET, "/products/tok-1", &HeaderMap::new(), None, &[])
            .unwrap();
        assert_eq!(ids, vec!["tok-1"]);
    }

    #[test]
    fn test_get_collection_has_no_ids() {
        let s = section("/products/*", &[], &[]);
        let ids = s
            .extract_ids(&Method::GET, "/products", &HeaderMap::new(), None, &[])
            .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_header_ids_in_configured_order() {
        let s = section("/products/*", &[], &["X-Primary", "X-Secondary"]);
        let ids = s
            .extract_ids(
                &Method::POST,
                "/products",
                &headers(&[("x-secondary", "two"), ("x-primary", "one")]),
                None,
                &[],
            )
            .unwrap();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_header_first_non_empty_value_wins() {
        let s = section("/products/*", &[], &["X-Token"]);
        let ids = s
            .extract_ids(
                &Method::POST,
                "/products",
                &headers(&[("x-token", ""), ("x-token", "real")]),
                None,
                &[],
            )
            .unwrap();
        assert_eq!(ids, vec!["real"]);
    }

    #[test]
    fn test_json_body_ids() {
        let s = section("/products/*", &["/product/sku"], &["X-Product-Token"]);
        let body = br#"{"product":{"sku":"sku-A"},"name":"P"}"#;
        let ids = s
            .extract_ids(
                &Method::POST,
                "/products",
                &headers(&[("x-product-token", "tok-1")]),
                Some("application/json"),
                body,
            )
            .unwrap();
        assert_eq!(ids, vec!["tok-1", "sku-A"]);
    }

    #[test]
    fn test_multiple_body_paths_in_order() {
        let s = section("/documents/*", &["/meta/uuid", "/alt_id"], &[]);
        let body = br#"{"meta":{"uuid":"docU"},"alt_id":"docA","content":"x"}"#;
        let ids = s
            .extract_ids(&Method::POST, "/documents", &HeaderMap::new(), Some("application/json"), body)
            .unwrap();
        assert_eq!(ids, vec!["docU", "docA"]);
    }

    #[test]
    fn test_xml_body_ids() {
        let s = section("/products/*", &["/product/sku"], &[]);
        let body = b"<product><sku>sku-X</sku></product>";
        let ids = s
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), Some("text/xml"), body)
            .unwrap();
        assert_eq!(ids, vec!["sku-X"]);
    }

    #[test]
    fn test_malformed_json_fails_when_paths_configured() {
        let s = section("/products/*", &["/id"], &[]);
        let err = s
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), Some("application/json"), b"{")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn test_malformed_body_ignored_without_configured_paths() {
        let s = section("/products/*", &[], &[]);
        let ids = s
            .extract_ids(&Method::PUT, "/products/p1", &HeaderMap::new(), Some("application/json"), b"{")
            .unwrap();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_unknown_content_type_skips_body() {
        let s = section("/products/*", &["/id"], &[]);
        let ids = s
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), Some("application/octet-stream"), b"junk")
            .unwrap();
        // No body extraction, so the POST falls through to auto-generation.
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_get_never_reads_body() {
        let s = section("/products/*", &["/id"], &[]);
        let ids = s
            .extract_ids(&Method::GET, "/products/p1", &HeaderMap::new(), Some("application/json"), b"{")
            .unwrap();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_duplicates_removed_preserving_first() {
        let s = section("/products/*", &["/sku", "/dup"], &["X-Token"]);
        let body = br#"{"sku":"same","dup":"same"}"#;
        let ids = s
            .extract_ids(
                &Method::POST,
                "/products",
                &headers(&[("x-token", "same")]),
                Some("application/json"),
                body,
            )
            .unwrap();
        assert_eq!(ids, vec!["same"]);
    }

    #[test]
    fn test_empty_results_discarded() {
        let s = section("/products/*", &["/blank"], &[]);
        let body = br#"{"blank":""}"#;
        let ids = s
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), Some("application/json"), body)
            .unwrap();
        // The empty match is dropped; auto-generation takes over.
        assert_eq!(ids.len(), 1);
        assert!(!ids[0].is_empty());
    }

    #[test]
    fn test_autogen_only_when_pattern_admits_tail() {
        let tailed = section("/products/*", &[], &[]);
        let ids = tailed
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), None, &[])
            .unwrap();
        assert_eq!(ids.len(), 1);

        let flat = section("/products", &[], &[]);
        let ids = flat
            .extract_ids(&Method::POST, "/products", &HeaderMap::new(), None, &[])
            .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_autogen_not_for_put() {
        let s = section("/products/*", &[], &[]);
        let ids = s
            .extract_ids(&Method::PUT, "/products", &HeaderMap::new(), None, &[])
            .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_put_path_id_comes_first() {
        let s = section("/products/*", &["/sku"], &[]);
        let body = br#"{"sku":"body-id"}"#;
        let ids = s
            .extract_ids(&Method::PUT, "/products/path-id", &HeaderMap::new(), Some("application/json"), body)
            .unwrap();
        assert_eq!(ids, vec!["path-id", "body-id"]);
    }
}
