//! Slash-separated metadata attribute paths.
//!
//! `Processing_Graph/node[1]/operator` names the attribute `operator` of the
//! second `node` element below the first `Processing_Graph` element. The `[k]`
//! index is positional among same-named siblings and defaults to 0.

use tracing::debug;

use geo_golden_core::{MetadataAttribute, MetadataElement};

/// One element step of a metadata path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Element name
    pub name: String,
    /// Index among siblings with the same name
    pub index: usize,
}

/// A parsed metadata attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPath {
    /// Element steps from the root
    pub elements: Vec<PathSegment>,
    /// Attribute name
    pub attribute: String,
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The path text is not well formed
    Malformed(String),
    /// The attribute, or one of the elements leading to it, does not exist
    MissingAttribute(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Malformed(path) => write!(f, "malformed metadata path '{path}'"),
            ResolveError::MissingAttribute(path) => {
                write!(f, "metadata attribute '{path}' not found")
            }
        }
    }
}

impl MetadataPath {
    /// Parse a path such as `Global[1]/attr`.
    pub fn parse(path: &str) -> Result<Self, ResolveError> {
        let malformed = || ResolveError::Malformed(path.to_string());

        let mut parts: Vec<&str> = path.split('/').collect();
        let attribute = parts.pop().filter(|a| !a.is_empty()).ok_or_else(malformed)?;
        if attribute.contains('[') {
            return Err(malformed());
        }

        let elements = parts
            .into_iter()
            .map(|part| parse_segment(part).ok_or_else(malformed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            elements,
            attribute: attribute.to_string(),
        })
    }

    /// Resolve this path below `root`, returning the attribute.
    ///
    /// A missing element anywhere along the path is reported like a missing
    /// attribute, naming the full path.
    pub fn resolve<'a>(
        &self,
        root: &'a MetadataElement,
    ) -> Result<&'a MetadataAttribute, ResolveError> {
        let mut current = root;
        let mut walked = String::new();

        for segment in &self.elements {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(&render_segment(segment, current.element_count(&segment.name)));

            current = match current.element(&segment.name, segment.index) {
                Some(element) => element,
                None => {
                    debug!("Metadata element '{}' not found", walked);
                    return Err(ResolveError::MissingAttribute(self.to_string()));
                }
            };
        }

        current
            .attribute(&self.attribute)
            .ok_or_else(|| ResolveError::MissingAttribute(self.to_string()))
    }
}

impl std::fmt::Display for MetadataPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.elements {
            if segment.index == 0 {
                write!(f, "{}/", segment.name)?;
            } else {
                write!(f, "{}[{}]/", segment.name, segment.index)?;
            }
        }
        f.write_str(&self.attribute)
    }
}

fn parse_segment(part: &str) -> Option<PathSegment> {
    if part.is_empty() {
        return None;
    }
    match part.find('[') {
        None => Some(PathSegment {
            name: part.to_string(),
            index: 0,
        }),
        Some(open) => {
            let name = &part[..open];
            let index = part[open + 1..].strip_suffix(']')?.parse().ok()?;
            if name.is_empty() {
                return None;
            }
            Some(PathSegment {
                name: name.to_string(),
                index,
            })
        }
    }
}

/// Render a segment, adding `[k]` only when siblings share the name.
pub fn render_segment(segment: &PathSegment, sibling_count: usize) -> String {
    if sibling_count > 1 {
        format!("{}[{}]", segment.name, segment.index)
    } else {
        segment.name.clone()
    }
}

/// Every attribute below `root` with its path, in document order.
///
/// Element segments carry `[k]` only where same-named siblings exist.
pub fn flatten(root: &MetadataElement) -> Vec<(String, &MetadataAttribute)> {
    let mut out = Vec::new();
    flatten_into(root, "", &mut out);
    out
}

fn flatten_into<'a>(
    element: &'a MetadataElement,
    prefix: &str,
    out: &mut Vec<(String, &'a MetadataAttribute)>,
) {
    for attribute in &element.attributes {
        out.push((format!("{prefix}{}", attribute.name), attribute));
    }

    let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for child in &element.elements {
        let index = seen.entry(child.name.as_str()).or_insert(0);
        let segment = PathSegment {
            name: child.name.clone(),
            index: *index,
        };
        *index += 1;
        let rendered = render_segment(&segment, element.element_count(&child.name));
        flatten_into(child, &format!("{prefix}{rendered}/"), out);
    }
}
