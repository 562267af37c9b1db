use std::fmt;
use std::sync::Arc;

/// Separator used by [`ServicePath::parse`] and `Display`.
pub const PATH_SEPARATOR: char = '/';

/// Identifies a callable method across nested sub-services.
///
/// The first segment names the root service, the last one names the method,
/// and every segment in between is a sub-service accessor applied to the
/// previous service: `Calculator/Scientific/Pow`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServicePath {
    segments: Arc<[String]>,
}

/// Error for malformed service paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// A path needs at least a service name and a method name.
    TooShort(usize),
    /// A segment is empty (e.g. `Calculator//Add`).
    EmptySegment(usize),
    /// A segment contains the path separator.
    SeparatorInSegment(usize),
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathParseError::TooShort(len) => {
                write!(f, "service path needs at least 2 segments, got {}", len)
            }
            PathParseError::EmptySegment(index) => {
                write!(f, "service path segment {} is empty", index)
            }
            PathParseError::SeparatorInSegment(index) => {
                write!(f, "service path segment {} contains '{}'", index, PATH_SEPARATOR)
            }
        }
    }
}

impl std::error::Error for PathParseError {}

impl ServicePath {
    pub fn new<I, S>(segments: I) -> Result<Self, PathParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.len() < 2 {
            return Err(PathParseError::TooShort(segments.len()));
        }
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(PathParseError::EmptySegment(index));
            }
            if segment.contains(PATH_SEPARATOR) {
                return Err(PathParseError::SeparatorInSegment(index));
            }
        }
        Ok(ServicePath {
            segments: segments.into(),
        })
    }

    /// Parse `Service/Sub/.../Method`.
    pub fn parse(path: &str) -> Result<Self, PathParseError> {
        Self::new(path.split(PATH_SEPARATOR))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a valid path has at least two segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the root service.
    pub fn service_name(&self) -> &str {
        &self.segments[0]
    }

    /// Sub-service accessors between the root service and the method.
    pub fn subservices(&self) -> &[String] {
        &self.segments[1..self.segments.len() - 1]
    }

    pub fn method_name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl fmt::Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ServicePath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
