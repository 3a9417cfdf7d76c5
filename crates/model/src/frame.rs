use serde::{Deserialize, Serialize};

/// One stack location. Frames are deduplicated by structural identity
/// (name + file + line + column) and never mutated after interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Display name (function, method, script entry point).
    pub name: String,
    /// Source file or resource URL, if the format provides one.
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Whether this frame belongs to the profiled application rather than
    /// a runtime, framework, or third-party dependency.
    pub is_application: bool,
}
