//! Naming conventions shared by every pass.

use super::{JsonPath, JsonPathSegment};

/// Reduces a project endpoint name to a physical schema name.
///
/// Keeps ASCII alphanumerics, lowercased. The result always starts with a
/// letter: `p` is prepended otherwise.
pub fn normalize_schema_name(src: &str) -> String {
    let mut name: String = src
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert(0, 'p');
    }

    name
}

/// Upper-cases the first character and each character following a
/// separator, dropping the separators. Other characters are unchanged, so
/// `schoolId` becomes `SchoolId`.
pub fn to_pascal_case(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut upper_next = true;

    for c in src.chars() {
        if !c.is_alphanumeric() {
            upper_next = true;
            continue;
        }

        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Singularizes a collection property name.
pub fn singularize(src: &str) -> String {
    let lower = src.to_ascii_lowercase();

    if lower.ends_with("ies") && src.len() > 3 {
        return format!("{}y", &src[..src.len() - 3]);
    }

    for suffix in ["ches", "shes", "xes", "zes", "ses"] {
        if lower.ends_with(suffix) && src.len() > suffix.len() {
            return src[..src.len() - 2].to_string();
        }
    }

    if lower.ends_with('s') && !lower.ends_with("ss") && src.len() > 1 {
        return src[..src.len() - 1].to_string();
    }

    src.to_string()
}

/// Default base name for the table derived from an array property.
pub fn collection_base_name(property: &str) -> String {
    to_pascal_case(&singularize(property))
}

/// Concatenated PascalCase of the property segments in `segments`.
pub fn property_base_name(segments: &[JsonPathSegment]) -> String {
    segments
        .iter()
        .filter_map(|segment| match segment {
            JsonPathSegment::Property(name) => Some(to_pascal_case(name)),
            JsonPathSegment::AnyArrayElement => None,
        })
        .collect()
}

/// Base name for a column sourced from `path`, relative to the owning
/// table's JSON scope.
pub fn column_base_name(scope: &JsonPath, path: &JsonPath) -> String {
    match path.relative_to_scope(scope) {
        Some(relative) => property_base_name(&relative),
        None => property_base_name(path.segments()),
    }
}

pub fn descriptor_id_column_name(base: &str) -> String {
    format!("{base}_DescriptorId")
}

pub fn document_id_column_name(base: &str) -> String {
    format!("{base}_DocumentId")
}

pub fn ordinal_column_name(base: &str) -> String {
    format!("{base}Ordinal")
}

/// Builds the compact token list used in generated constraint and index
/// names.
///
/// Each column splits at its last `_` into a prefix and a suffix. Columns are
/// grouped by prefix with the prefix written once; groups and suffixes are
/// sorted ordinally.
pub fn column_tokens<S: AsRef<str>>(columns: &[S]) -> String {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for column in columns {
        let column = column.as_ref();
        let (prefix, suffix) = match column.rsplit_once('_') {
            Some((prefix, suffix)) if !prefix.is_empty() && !suffix.is_empty() => (prefix, suffix),
            _ => ("", column),
        };
        groups.entry(prefix).or_default().push(suffix);
    }

    let mut parts = vec![];
    for (prefix, mut suffixes) in groups {
        suffixes.sort_unstable();
        suffixes.dedup();

        if !prefix.is_empty() {
            parts.push(prefix);
        }
        parts.extend(suffixes);
    }

    parts.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names() {
        assert_eq!(normalize_schema_name("ed-fi"), "edfi");
        assert_eq!(normalize_schema_name("TPDM"), "tpdm");
        assert_eq!(normalize_schema_name("2024-ext"), "p2024ext");
        assert_eq!(normalize_schema_name("--"), "p");
    }

    #[test]
    fn pascal_case() {
        assert_eq!(to_pascal_case("schoolId"), "SchoolId");
        assert_eq!(to_pascal_case("ed-fi"), "EdFi");
        assert_eq!(to_pascal_case("grade_level descriptor"), "GradeLevelDescriptor");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn singular_forms() {
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("matches"), "match");
        assert_eq!(singularize("scores"), "score");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("gradeLevels"), "gradeLevel");
        assert_eq!(collection_base_name("telephones"), "Telephone");
    }

    #[test]
    fn tokens_group_by_prefix() {
        assert_eq!(column_tokens(&["Subject"]), "Subject");
        assert_eq!(
            column_tokens(&["Session_SessionName", "School_SchoolId", "Session_SchoolYear"]),
            "School_SchoolId_Session_SchoolYear_SessionName"
        );
        assert_eq!(
            column_tokens(&["Ordinal", "Student_DocumentId"]),
            "Ordinal_Student_DocumentId"
        );
    }

    #[test]
    fn base_name_is_relative_to_scope() {
        let scope = JsonPath::compile("$.addresses[*]").unwrap();
        let path = JsonPath::compile("$.addresses[*].period.beginDate").unwrap();
        assert_eq!(column_base_name(&scope, &path), "PeriodBeginDate");
    }
}
