use crate::{Error, Result};

use std::fmt;

/// One segment of a compiled JSON path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JsonPathSegment {
    /// `.name`
    Property(String),

    /// `[*]`
    AnyArrayElement,
}

/// A compiled JSONPath restricted to the forms the schema uses: a `$` root
/// followed by `.property` and `[*]` segments.
///
/// Equality, ordering and hashing all follow the canonical text.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPath {
    canonical: String,
    segments: Vec<JsonPathSegment>,
}

impl Default for JsonPath {
    fn default() -> Self {
        JsonPath::root()
    }
}

impl JsonPath {
    pub fn root() -> JsonPath {
        JsonPath {
            canonical: "$".to_string(),
            segments: vec![],
        }
    }

    /// Compiles `src`, rejecting anything outside the supported subset.
    pub fn compile(src: &str) -> Result<JsonPath> {
        let Some(mut rest) = src.strip_prefix('$') else {
            return Err(Error::invalid_schema(format!(
                "JSONPath '{src}' must start with '$'"
            )));
        };

        let mut segments = vec![];

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("[*]") {
                segments.push(JsonPathSegment::AnyArrayElement);
                rest = after;
            } else if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let name = &after[..end];

                if name.is_empty() || name.contains(['*', ']', '\'', '"', ' ']) {
                    return Err(Error::invalid_schema(format!(
                        "JSONPath '{src}' contains an invalid property segment"
                    )));
                }

                segments.push(JsonPathSegment::Property(name.to_string()));
                rest = &after[end..];
            } else {
                return Err(Error::invalid_schema(format!(
                    "JSONPath '{src}' contains unsupported syntax at '{rest}'"
                )));
            }
        }

        Ok(JsonPath::from_segments(segments))
    }

    pub fn from_segments(segments: Vec<JsonPathSegment>) -> JsonPath {
        let mut canonical = String::from("$");
        for segment in &segments {
            match segment {
                JsonPathSegment::Property(name) => {
                    canonical.push('.');
                    canonical.push_str(name);
                }
                JsonPathSegment::AnyArrayElement => canonical.push_str("[*]"),
            }
        }

        JsonPath {
            canonical,
            segments,
        }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn segments(&self) -> &[JsonPathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn property(&self, name: &str) -> JsonPath {
        self.child(JsonPathSegment::Property(name.to_string()))
    }

    pub fn any_element(&self) -> JsonPath {
        self.child(JsonPathSegment::AnyArrayElement)
    }

    fn child(&self, segment: JsonPathSegment) -> JsonPath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        JsonPath::from_segments(segments)
    }

    /// Appends the segments of `relative`, ignoring its `$` root.
    pub fn join(&self, relative: &JsonPath) -> JsonPath {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        JsonPath::from_segments(segments)
    }

    /// The path without its last segment. The root has no parent.
    pub fn parent(&self) -> Option<JsonPath> {
        let (_, init) = self.segments.split_last()?;
        Some(JsonPath::from_segments(init.to_vec()))
    }

    /// The name of the last segment when it is a property.
    pub fn last_property(&self) -> Option<&str> {
        match self.segments.last() {
            Some(JsonPathSegment::Property(name)) => Some(name),
            _ => None,
        }
    }

    pub fn ends_with_array(&self) -> bool {
        matches!(self.segments.last(), Some(JsonPathSegment::AnyArrayElement))
    }

    /// Segment-wise prefix test; every path starts with itself.
    pub fn starts_with(&self, prefix: &JsonPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The segments after `prefix`, or `None` when `prefix` does not apply.
    pub fn strip_prefix(&self, prefix: &JsonPath) -> Option<&[JsonPathSegment]> {
        self.starts_with(prefix)
            .then(|| &self.segments[prefix.segments.len()..])
    }

    /// Segments of `self` below the table scope `scope`.
    ///
    /// An extension scope `{owner}._ext.{key}` also contains paths that reach
    /// `_ext.{key}` through plain objects below `owner`. The intermediate
    /// property segments are kept in the result.
    pub fn relative_to_scope(&self, scope: &JsonPath) -> Option<Vec<JsonPathSegment>> {
        if let Some(rest) = self.strip_prefix(scope) {
            return Some(rest.to_vec());
        }

        let [owner @ .., JsonPathSegment::Property(ext), key] = scope.segments() else {
            return None;
        };
        if ext != "_ext" {
            return None;
        }

        let rest = self.segments.get(owner.len()..)?;
        if self.segments[..owner.len()] != *owner {
            return None;
        }

        let ext_at = rest
            .iter()
            .position(|segment| matches!(segment, JsonPathSegment::Property(name) if name == "_ext"))?;
        let (between, tail) = rest.split_at(ext_at);

        if between
            .iter()
            .any(|segment| matches!(segment, JsonPathSegment::AnyArrayElement))
            || tail.get(1) != Some(key)
        {
            return None;
        }

        let mut out = between.to_vec();
        out.extend(tail[2..].iter().cloned());
        Some(out)
    }

    /// True when any property segment is `_ext`.
    pub fn is_extension(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, JsonPathSegment::Property(name) if name == "_ext"))
    }

    pub fn array_depth(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, JsonPathSegment::AnyArrayElement))
            .count()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonPath({})", self.canonical)
    }
}

impl serde::Serialize for JsonPath {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}
