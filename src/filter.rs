//! Export-time column selection by color group

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::model::TypeHeader;

/// Table-name pattern → group names to export
///
/// An exact table name wins over wildcard patterns; among wildcards (`*` and
/// `?`) the first one declared wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "IndexMap<String, Vec<String>>")]
pub struct GroupFilter {
    rules: Vec<FilterRule>,
}

#[derive(Debug, Clone)]
struct FilterRule {
    pattern: String,
    wildcard: Option<Regex>,
    groups: Vec<String>,
}

impl From<IndexMap<String, Vec<String>>> for GroupFilter {
    fn from(map: IndexMap<String, Vec<String>>) -> Self {
        let mut filter = GroupFilter::default();
        for (pattern, groups) in map {
            filter = filter.with_rule(pattern, groups);
        }
        filter
    }
}

impl GroupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule<S: Into<String>>(
        mut self,
        pattern: impl Into<String>,
        groups: impl IntoIterator<Item = S>,
    ) -> Self {
        let pattern = pattern.into();
        let wildcard = if pattern.contains(['*', '?']) {
            let body = regex::escape(&pattern)
                .replace(r"\*", ".*")
                .replace(r"\?", ".");
            Regex::new(&format!("^{}$", body)).ok()
        } else {
            None
        };
        self.rules.push(FilterRule {
            pattern,
            wildcard,
            groups: groups.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Groups selected for a table, `None` when no pattern matches
    pub fn groups_for(&self, table_name: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|r| r.wildcard.is_none() && r.pattern == table_name)
            .or_else(|| {
                self.rules.iter().find(|r| {
                    r.wildcard
                        .as_ref()
                        .is_some_and(|re| re.is_match(table_name))
                })
            })
            .map(|r| r.groups.as_slice())
    }
}

/// Ordered subset of headers to export for one table
///
/// Comment columns never survive. An empty result means there is nothing to
/// export, not an error.
pub fn filter_headers<'a, I>(
    table_name: &str,
    headers: I,
    filter: Option<&GroupFilter>,
) -> Vec<&'a TypeHeader>
where
    I: IntoIterator<Item = &'a TypeHeader>,
{
    let groups = filter.and_then(|f| f.groups_for(table_name));
    headers
        .into_iter()
        .filter(|h| !h.is_comment)
        .filter(|h| groups.map_or(true, |g| g.iter().any(|name| *name == h.group)))
        .collect()
}
