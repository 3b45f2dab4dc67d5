use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "/{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug)]
struct PathNode {
    parent: ResultPath,
    segment: PathSegment,
    len: usize,
    level: usize,
}

/// Position of a value in the response tree.
///
/// Paths are immutable linked lists: appending a segment allocates one node
/// and shares the whole prefix with the parent path.
#[derive(Clone, Debug, Default)]
pub struct ResultPath {
    node: Option<Arc<PathNode>>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PathParseError {
    #[error("path must start with '/', got '{0}'")]
    MissingLeadingSlash(String),
    #[error("invalid list index '{0}' in path")]
    InvalidIndex(String),
    #[error("unterminated list index in path '{0}'")]
    UnterminatedIndex(String),
    #[error("empty field name in path '{0}'")]
    EmptySegment(String),
}

impl ResultPath {
    pub fn root() -> Self {
        ResultPath { node: None }
    }

    pub fn is_root(&self) -> bool {
        self.node.is_none()
    }

    fn append(&self, segment: PathSegment) -> Self {
        let (len, level) = match &self.node {
            Some(node) => (node.len, node.level),
            None => (0, 0),
        };
        let level = match segment {
            PathSegment::Key(_) => level + 1,
            PathSegment::Index(_) => level,
        };

        ResultPath {
            node: Some(Arc::new(PathNode {
                parent: self.clone(),
                segment,
                len: len + 1,
                level,
            })),
        }
    }

    pub fn segment(&self, key: impl Into<String>) -> Self {
        self.append(PathSegment::Key(key.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.append(PathSegment::Index(index))
    }

    pub fn parent(&self) -> Option<&ResultPath> {
        self.node.as_ref().map(|node| &node.parent)
    }

    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.node.as_ref().map(|node| &node.segment)
    }

    /// Number of segments, named and indexed.
    pub fn len(&self) -> usize {
        self.node.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Number of named segments. List indexes do not add a level.
    pub fn level(&self) -> usize {
        self.node.as_ref().map_or(0, |node| node.level)
    }

    /// Path with the last segment replaced by `key`.
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        match self.parent() {
            Some(parent) => parent.segment(key),
            None => ResultPath::root().segment(key),
        }
    }

    /// Path with every list index removed.
    pub fn keys_only(&self) -> Self {
        self.segments()
            .filter(|segment| matches!(segment, PathSegment::Key(_)))
            .cloned()
            .fold(ResultPath::root(), |path, segment| path.append(segment))
    }

    pub fn to_list(&self) -> Vec<PathSegment> {
        self.segments().cloned().collect()
    }

    /// Segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        let mut reversed = Vec::with_capacity(self.len());
        let mut current = self;
        while let Some(node) = &current.node {
            reversed.push(&node.segment);
            current = &node.parent;
        }
        reversed.into_iter().rev()
    }

    pub fn from_segments<I: IntoIterator<Item = PathSegment>>(segments: I) -> Self {
        segments
            .into_iter()
            .fold(ResultPath::root(), |path, segment| path.append(segment))
    }

    /// Parses the textual form produced by `Display`, for example `/users[0]/name`.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        let mut path = ResultPath::root();
        if input.is_empty() {
            return Ok(path);
        }
        if !input.starts_with('/') {
            return Err(PathParseError::MissingLeadingSlash(input.to_string()));
        }

        let mut rest = input;
        while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix('/') {
                let end = stripped.find(['/', '[']).unwrap_or(stripped.len());
                let key = &stripped[..end];
                if key.is_empty() {
                    return Err(PathParseError::EmptySegment(input.to_string()));
                }
                path = path.segment(key);
                rest = &stripped[end..];
            } else if let Some(stripped) = rest.strip_prefix('[') {
                let end = stripped
                    .find(']')
                    .ok_or_else(|| PathParseError::UnterminatedIndex(input.to_string()))?;
                let index = stripped[..end]
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(stripped[..end].to_string()))?;
                path = path.index(index);
                rest = &stripped[end + 1..];
            } else {
                return Err(PathParseError::MissingLeadingSlash(rest.to_string()));
            }
        }

        Ok(path)
    }
}

impl PartialEq for ResultPath {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut left = self;
        let mut right = other;
        loop {
            match (&left.node, &right.node) {
                (None, None) => return true,
                (Some(l), Some(r)) => {
                    if Arc::ptr_eq(l, r) {
                        return true;
                    }
                    if l.segment != r.segment {
                        return false;
                    }
                    left = &l.parent;
                    right = &r.parent;
                }
                _ => return false,
            }
        }
    }
}

impl Eq for ResultPath {}

impl Hash for ResultPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PathParseError, PathSegment, ResultPath};

    #[test]
    fn appending_shares_prefix_and_counts_levels() {
        let users = ResultPath::root().segment("users");
        let first = users.index(0);
        let name = first.segment("name");

        assert_eq!(name.to_string(), "/users[0]/name");
        assert_eq!(name.len(), 3);
        assert_eq!(name.level(), 2);
        assert_eq!(first.level(), 1);
        assert_eq!(name.parent(), Some(&first));
        assert_eq!(users.to_string(), "/users");
        assert!(ResultPath::root().is_root());
        assert_eq!(ResultPath::root().to_string(), "");
    }

    #[test]
    fn equality_is_structural() {
        let a = ResultPath::root().segment("a").index(1);
        let b = ResultPath::from_segments(vec![
            PathSegment::Key("a".to_string()),
            PathSegment::Index(1),
        ]);

        assert_eq!(a, b);
        assert_ne!(a, ResultPath::root().segment("a").index(2));
        assert_ne!(a, ResultPath::root().segment("a"));
    }

    #[test]
    fn sibling_and_keys_only() {
        let path = ResultPath::root().segment("a").index(3).segment("b");

        assert_eq!(path.sibling("c").to_string(), "/a[3]/c");
        assert_eq!(path.keys_only().to_string(), "/a/b");
        assert_eq!(
            ResultPath::root().segment("x").sibling("y").to_string(),
            "/y"
        );
    }

    #[test]
    fn parses_display_form() {
        let path = ResultPath::parse("/pets[10]/owner/name").unwrap();

        assert_eq!(
            path.to_list(),
            vec![
                PathSegment::Key("pets".to_string()),
                PathSegment::Index(10),
                PathSegment::Key("owner".to_string()),
                PathSegment::Key("name".to_string()),
            ]
        );
        assert_eq!(ResultPath::parse("").unwrap(), ResultPath::root());
        assert_eq!(
            ResultPath::parse("pets"),
            Err(PathParseError::MissingLeadingSlash("pets".to_string()))
        );
        assert_eq!(
            ResultPath::parse("/pets[x]"),
            Err(PathParseError::InvalidIndex("x".to_string()))
        );
        assert_eq!(
            ResultPath::parse("/pets[1"),
            Err(PathParseError::UnterminatedIndex("/pets[1".to_string()))
        );
    }
}
