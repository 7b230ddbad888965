use leakscan_core::SearchConfig;

/// Marks matches in boilerplate file types (minified assets, binaries,
/// lockfiles) as low priority. Matches are flagged, never dropped.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
    discarded: usize,
}

impl ExtensionFilter {
    /// Empty suffixes are discarded with a warning; they would match every path.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for ext in extensions.into_iter().map(Into::into) {
            if ext.is_empty() {
                filter.discarded += 1;
            } else {
                filter.extensions.push(ext);
            }
        }

        if filter.discarded > 0 {
            tracing::warn!(
                "Ignoring {} empty entries in search.ignored_extensions",
                filter.discarded
            );
        }

        filter
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.ignored_extensions.iter().cloned())
    }

    /// Case-sensitive suffix match against the configured deny-list.
    pub fn is_low_priority(&self, full_path: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| full_path.ends_with(ext.as_str()))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Empty suffixes dropped at construction.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_match() {
        let filter = ExtensionFilter::new([".min.js", ".lock"]);
        assert!(filter.is_low_priority("app/foo.min.js"));
        assert!(filter.is_low_priority("Cargo.lock"));
        assert!(!filter.is_low_priority("app/foo.go"));
        assert!(!filter.is_low_priority("app/foo.js"));
    }

    #[test]
    fn test_case_sensitive() {
        let filter = ExtensionFilter::new([".png"]);
        assert!(filter.is_low_priority("logo.png"));
        assert!(!filter.is_low_priority("logo.PNG"));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = ExtensionFilter::default();
        assert!(!filter.is_low_priority("anything.min.js"));

        let filter = ExtensionFilter::new([""]);
        assert!(filter.extensions().is_empty());
        assert!(!filter.is_low_priority("src/main.rs"));
    }

    #[test]
    fn test_empty_suffixes_are_discarded_and_counted() {
        let config = SearchConfig {
            ignored_extensions: vec![".lock".to_string(), String::new(), String::new()],
            ..SearchConfig::default()
        };
        let filter = ExtensionFilter::from_config(&config);

        assert_eq!(filter.discarded(), 2);
        assert_eq!(filter.extensions(), &[".lock".to_string()]);
        assert!(filter.is_low_priority("Cargo.lock"));
        assert!(!filter.is_low_priority("README.md"));

        assert_eq!(ExtensionFilter::from_config(&SearchConfig::default()).discarded(), 0);
    }

    #[test]
    fn test_from_default_config() {
        let filter = ExtensionFilter::from_config(&SearchConfig::default());
        assert!(filter.is_low_priority("dist/vendor.min.js"));
        assert!(filter.is_low_priority("yarn.lock"));
        assert!(!filter.is_low_priority("config/secrets.yml"));
    }
}
