//! Tag Sets and Tag Queries
//!
//! Stages and actions carry an unordered, deduplicated set of tags. Queries
//! come in three flavours: a single tag, all of several tags (AND) and any of
//! several tags (OR). Results always keep the order of the collection queried.

use std::collections::BTreeSet;

/// Unordered, deduplicated set of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag. Returns false if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True if every tag in `tags` is present. An empty query matches.
    pub fn contains_all<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().all(|tag| self.contains(tag.as_ref()))
    }

    /// True if at least one tag in `tags` is present.
    pub fn contains_any<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.contains(tag.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for TagSet {
    fn from(tags: [S; N]) -> Self {
        tags.into_iter().collect()
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<&[&str]> for TagSet {
    fn from(tags: &[&str]) -> Self {
        tags.iter().copied().collect()
    }
}

/// Anything that exposes a tag set.
pub trait Tagged {
    fn tags(&self) -> &TagSet;

    fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(tag)
    }
}

/// Items carrying `tag`, in input order.
pub fn filter_by_tag<'a, T, I>(items: I, tag: &str) -> Vec<&'a T>
where
    T: Tagged + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().filter(|item| item.has_tag(tag)).collect()
}

/// Items carrying every tag in `tags`, in input order.
pub fn filter_by_all_tags<'a, T, I, S>(items: I, tags: &[S]) -> Vec<&'a T>
where
    T: Tagged + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter(|item| item.tags().contains_all(tags))
        .collect()
}

/// Items carrying at least one tag in `tags`, in input order.
pub fn filter_by_any_tag<'a, T, I, S>(items: I, tags: &[S]) -> Vec<&'a T>
where
    T: Tagged + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter(|item| item.tags().contains_any(tags))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        tags: TagSet,
    }

    impl Tagged for Item {
        fn tags(&self) -> &TagSet {
            &self.tags
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "first", tags: TagSet::from(["tag1", "common"]) },
            Item { name: "second", tags: TagSet::from(["tag2", "common"]) },
            Item { name: "third", tags: TagSet::from(["tag3"]) },
        ]
    }

    fn names(found: Vec<&Item>) -> Vec<&'static str> {
        found.into_iter().map(|item| item.name).collect()
    }

    #[test]
    fn test_tag_set_deduplicates() {
        let mut tags = TagSet::from(["a", "b", "a"]);
        assert_eq!(tags.len(), 2);
        assert!(!tags.insert("b"));
        assert!(tags.insert("c"));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(tags.remove("a"));
        assert!(!tags.contains("a"));
    }

    #[test]
    fn test_contains_all_and_any() {
        let tags = TagSet::from(["tag1", "common"]);
        assert!(tags.contains_all(&["common", "tag1"]));
        assert!(!tags.contains_all(&["common", "tag2"]));
        assert!(tags.contains_all::<&str>(&[]));
        assert!(tags.contains_any(&["tag3", "tag1"]));
        assert!(!tags.contains_any::<&str>(&[]));
    }

    #[test]
    fn test_filter_by_tag_keeps_order() {
        let items = items();
        assert_eq!(names(filter_by_tag(&items, "common")), vec!["first", "second"]);
        assert_eq!(names(filter_by_tag(&items, "tag3")), vec!["third"]);
        assert!(filter_by_tag(&items, "missing").is_empty());
    }

    #[test]
    fn test_filter_by_all_tags() {
        let items = items();
        assert_eq!(names(filter_by_all_tags(&items, &["common", "tag1"])), vec!["first"]);
    }

    #[test]
    fn test_filter_by_any_tag() {
        let items = items();
        assert_eq!(
            names(filter_by_any_tag(&items, &["tag1", "tag3"])),
            vec!["first", "third"]
        );
    }

    #[test]
    fn test_conversions() {
        let from_vec = TagSet::from(vec!["x".to_string(), "y".to_string()]);
        let from_slice = TagSet::from(&["y", "x"][..]);
        assert_eq!(from_vec, from_slice);
        assert!(TagSet::new().is_empty());
    }
}
