//! Sections: configured URL families
//!
//! A section owns one compiled path pattern plus the ID-extraction and
//! response policy for requests it claims. Sections are built once from
//! configuration and immutable afterwards; transformation hooks are the one
//! exception, attached by embedders before the server starts.

use crate::body_path::BodyPath;
use crate::config::SectionConfig;
use crate::pattern::PathPattern;
use crate::transform::Transformations;
use crate::Result;
use std::collections::HashMap;

/// One compiled section
#[derive(Debug, Clone)]
pub struct Section {
    /// Section name from configuration
    pub name: String,
    /// Compiled path pattern
    pub pattern: PathPattern,
    /// Compiled body-path expressions, in configured order
    pub body_id_paths: Vec<BodyPath>,
    /// Header names consulted for IDs, in configured order
    pub header_id_names: Vec<String>,
    /// Reserved; not enforced
    pub strict_path: bool,
    /// Echo the stored body in the POST response
    pub return_body: bool,
    /// Request/response hook chains
    pub transformations: Transformations,
}

impl Section {
    /// Compile a section from its configuration.
    pub fn compile(name: &str, config: &SectionConfig) -> Result<Self> {
        let pattern = PathPattern::compile(&config.path_pattern, config.case_sensitive)?;
        let body_id_paths = config
            .body_id_paths
            .iter()
            .map(|expr| BodyPath::compile(expr))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            body_id_paths,
            header_id_names: config.header_id_names.clone(),
            strict_path: config.strict_path,
            return_body: config.return_body,
            transformations: Transformations::new(),
        })
    }

    /// Whether the section's pattern still matches after appending one more
    /// segment to `path` — i.e. the pattern admits a tail ID for resources
    /// created under this collection path.
    pub fn admits_tail_id(&self, path: &str) -> bool {
        let base = crate::pattern::normalize_path(path);
        let probe = if base == "/" {
            "/autogen-probe".to_string()
        } else {
            format!("{base}/autogen-probe")
        };
        self.pattern.matches(&probe)
    }
}

/// All configured sections, resolving request paths to the winning section
#[derive(Debug, Default)]
pub struct SectionRegistry {
    sections: Vec<Section>,
}

impl SectionRegistry {
    /// Compile every configured section. Sections are ordered by name so
    /// resolution is deterministic when specificities tie.
    pub fn from_config(configs: &HashMap<String, SectionConfig>) -> Result<Self> {
        let mut names: Vec<&String> = configs.keys().collect();
        names.sort();
        let sections = names
            .iter()
            .map(|name| Section::compile(name, &configs[*name]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sections })
    }

    /// Resolve a request path to its section. Exact patterns win outright;
    /// among wildcard matches the most specific pattern wins (`*` beats `**`
    /// at equal segment count).
    pub fn match_path(&self, path: &str) -> Option<&Section> {
        self.sections
            .iter()
            .filter(|s| s.pattern.matches(path))
            .max_by(|a, b| {
                a.pattern
                    .specificity()
                    .cmp(&b.pattern.specificity())
                    // Equal specificity: first by name, deterministically.
                    .then_with(|| b.name.cmp(&a.name))
            })
    }

    /// Mutable access to one section, for attaching transformation hooks
    /// before the server starts.
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Number of configured sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no sections are configured.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section_config(pattern: &str) -> SectionConfig {
        SectionConfig {
            path_pattern: pattern.to_string(),
            body_id_paths: Vec::new(),
            header_id_names: Vec::new(),
            case_sensitive: false,
            strict_path: false,
            return_body: false,
        }
    }

    fn registry(entries: &[(&str, &str)]) -> SectionRegistry {
        let configs = entries
            .iter()
            .map(|(name, pattern)| (name.to_string(), section_config(pattern)))
            .collect();
        SectionRegistry::from_config(&configs).unwrap()
    }

    #[test]
    fn test_match_path_exact_wins() {
        let registry = registry(&[("wild", "/api/*"), ("exact", "/api/users")]);
        assert_eq!(registry.match_path("/api/users").unwrap().name, "exact");
        assert_eq!(registry.match_path("/api/other").unwrap().name, "wild");
    }

    #[test]
    fn test_match_path_longer_pattern_wins() {
        let registry = registry(&[("deep", "/api/**"), ("narrow", "/api/*/v1/users")]);
        assert_eq!(registry.match_path("/api/x/v1/users").unwrap().name, "narrow");
        assert_eq!(registry.match_path("/api/anything").unwrap().name, "deep");
    }

    #[test]
    fn test_match_path_any_beats_deep() {
        let registry = registry(&[("deep", "/api/**"), ("single", "/api/*")]);
        assert_eq!(registry.match_path("/api/users").unwrap().name, "single");
        assert_eq!(registry.match_path("/api/a/b").unwrap().name, "deep");
    }

    #[test]
    fn test_match_path_none() {
        let registry = registry(&[("products", "/products/*")]);
        assert!(registry.match_path("/users").is_none());
    }

    #[test]
    fn test_match_path_is_deterministic() {
        let registry = registry(&[("a", "/x/*"), ("b", "/x/*")]);
        for _ in 0..8 {
            assert_eq!(registry.match_path("/x/1").unwrap().name, "a");
        }
    }

    #[test]
    fn test_invalid_pattern_fails_compile() {
        let mut configs = HashMap::new();
        configs.insert("bad".to_string(), section_config("/a/b**"));
        assert!(SectionRegistry::from_config(&configs).is_err());
    }

    #[test]
    fn test_admits_tail_id() {
        let registry = registry(&[
            ("flat", "/products"),
            ("tailed", "/users/*"),
            ("deep", "/api/**"),
        ]);
        assert!(!registry.match_path("/products").unwrap().admits_tail_id("/products"));
        assert!(registry.match_path("/users").unwrap().admits_tail_id("/users"));
        assert!(registry.match_path("/api/users/7").unwrap().admits_tail_id("/api/users/7"));
    }
}
