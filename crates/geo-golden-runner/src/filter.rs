//! Test selection by name and tag.

use geo_golden_core::TestDefinition;

/// Name and tag filters.
///
/// The two filters combine as a union: a definition is selected when its
/// name is listed or it carries any listed tag. With both lists empty every
/// definition is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    /// Selected test names
    pub names: Vec<String>,
    /// Selected tags
    pub tags: Vec<String>,
}

impl TestFilter {
    /// Filter that selects everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from comma-separated lists, as given on the command line.
    pub fn from_lists(names: Option<&str>, tags: Option<&str>) -> Self {
        Self {
            names: names.map(parse_list).unwrap_or_default(),
            tags: tags.map(parse_list).unwrap_or_default(),
        }
    }

    /// Whether no filter is active.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.tags.is_empty()
    }

    /// Whether a definition passes the filter.
    pub fn matches(&self, definition: &TestDefinition) -> bool {
        self.is_empty()
            || self.names.iter().any(|n| *n == definition.name)
            || definition.has_any_tag(&self.tags)
    }

    /// Selected definitions, sorted by name.
    pub fn select<'a>(&self, definitions: &'a [TestDefinition]) -> Vec<&'a TestDefinition> {
        let mut selected: Vec<&TestDefinition> =
            definitions.iter().filter(|d| self.matches(d)).collect();
        selected.sort_by(|a, b| a.name.cmp(&b.name));
        selected
    }
}

impl std::fmt::Display for TestFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("no filters");
        }
        let mut parts = Vec::new();
        if !self.names.is_empty() {
            parts.push(format!("names=[{}]", self.names.join(", ")));
        }
        if !self.tags.is_empty() {
            parts.push(format!("tags=[{}]", self.tags.join(", ")));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Split a comma-separated list, dropping blank entries.
pub fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_golden_core::ContentSnapshot;

    fn definition(name: &str, tags: &[&str]) -> TestDefinition {
        TestDefinition {
            name: name.to_string(),
            description: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            command_template: "gpt".to_string(),
            expectation: ContentSnapshot::default(),
        }
    }

    /// Deliberately unsorted.
    fn definitions() -> Vec<TestDefinition> {
        vec![
            definition("test3", &["hasi", "ABC"]),
            definition("test1", &["ABC"]),
            definition("test4", &["hundi"]),
            definition("test2", &[]),
        ]
    }

    fn names(selected: Vec<&TestDefinition>) -> Vec<&str> {
        selected.into_iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_filter_by_tag() {
        let defs = definitions();
        let filter = TestFilter::from_lists(None, Some("ABC"));
        assert_eq!(names(filter.select(&defs)), vec!["test1", "test3"]);
    }

    #[test]
    fn test_names_and_tags_are_a_union() {
        let defs = definitions();
        let filter = TestFilter::from_lists(Some("test2"), Some("ABC"));
        assert_eq!(names(filter.select(&defs)), vec!["test1", "test2", "test3"]);
    }

    #[test]
    fn test_no_filter_selects_all_sorted() {
        let defs = definitions();
        assert_eq!(
            names(TestFilter::all().select(&defs)),
            vec!["test1", "test2", "test3", "test4"]
        );
    }

    #[test]
    fn test_unknown_name_selects_nothing() {
        let defs = definitions();
        let filter = TestFilter::from_lists(Some("nope"), None);
        assert!(filter.select(&defs).is_empty());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list(" , ").is_empty());
        assert!(TestFilter::from_lists(Some(""), Some(" ")).is_empty());
    }

    #[test]
    fn test_display_echoes_filters() {
        let filter = TestFilter::from_lists(Some("t1,t2"), Some("ABC"));
        assert_eq!(filter.to_string(), "names=[t1, t2] tags=[ABC]");
        assert_eq!(TestFilter::all().to_string(), "no filters");
    }
}
