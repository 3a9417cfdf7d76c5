pub mod android;
pub mod ios;
pub mod js_self_profile;
pub mod typescript;

use serde::Deserialize;
use serde_json::{Map, Value};
use stackscope_model::{Frame, Profile, SourceFormat};

use crate::error::ImportError;

/// Tag identifying which normalizer handles a raw trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Android,
    Ios,
    JsSelfProfile,
    Typescript,
}

impl FormatTag {
    pub fn source_format(&self) -> SourceFormat {
        match self {
            Self::Android => SourceFormat::Android,
            Self::Ios => SourceFormat::Ios,
            Self::JsSelfProfile => SourceFormat::JsSelfProfile,
            Self::Typescript => SourceFormat::Typescript,
        }
    }
}

type Predicate = fn(&Map<String, Value>) -> bool;

/// Ordered detection table. Predicates are pure and structural; the first
/// match wins. js-self-profile runs before the evented/sampled checks
/// because several formats carry a `samples` array.
const DETECTORS: &[(FormatTag, Predicate)] = &[
    (FormatTag::JsSelfProfile, is_js_self_profile),
    (FormatTag::Android, is_android_trace),
    (FormatTag::Ios, is_ios_trace),
    (FormatTag::Typescript, is_typescript_profile),
];

/// Classify a raw trace by shape alone. `None` means no detector matched;
/// the caller surfaces that as `UnrecognizedFormat` rather than guessing.
pub fn detect_format(value: &Value) -> Option<FormatTag> {
    let obj = value.as_object()?;
    DETECTORS
        .iter()
        .find(|(_, matches)| matches(obj))
        .map(|(tag, _)| *tag)
}

/// JS self-profiling trace: `frames` + `stacks` + `samples`, where
/// samples carry `timestamp` fields.
fn is_js_self_profile(obj: &Map<String, Value>) -> bool {
    let Some(samples) = obj.get("samples").and_then(Value::as_array) else {
        return false;
    };
    obj.get("frames").is_some_and(Value::is_array)
        && obj.get("stacks").is_some_and(Value::is_array)
        && samples.first().is_none_or(|s| s.get("timestamp").is_some())
}

/// Android method trace: an evented open/close stream.
fn is_android_trace(obj: &Map<String, Value>) -> bool {
    if obj.get("type").and_then(Value::as_str) == Some("evented") {
        return true;
    }
    obj.get("events")
        .and_then(Value::as_array)
        .is_some_and(|events| {
            events
                .first()
                .is_some_and(|e| e.get("at").is_some() && e.get("frame").is_some())
        })
}

/// iOS trace: flat stack samples with parallel weights.
fn is_ios_trace(obj: &Map<String, Value>) -> bool {
    if obj.get("type").and_then(Value::as_str) == Some("sampled") {
        return true;
    }
    obj.get("samples").is_some_and(Value::is_array) && obj.get("weights").is_some_and(Value::is_array)
}

/// V8 CPU profile (`tsc --generateCpuProfile`, Node `--cpu-prof`):
/// `nodes` + `samples` + `timeDeltas`.
fn is_typescript_profile(obj: &Map<String, Value>) -> bool {
    obj.get("nodes").is_some_and(Value::is_array)
        && obj.get("samples").is_some_and(Value::is_array)
        && obj.contains_key("timeDeltas")
}

/// Run the normalizer for a detected format.
///
/// `shared_frames` holds the enclosing envelope's frame declarations;
/// bare inputs pass an empty slice.
pub(crate) fn normalize(
    tag: FormatTag,
    value: &Value,
    shared_frames: &[FrameDecl],
) -> Result<Profile, ImportError> {
    match tag {
        FormatTag::Android => android::parse_android(value, shared_frames),
        FormatTag::Ios => ios::parse_ios(value, shared_frames),
        FormatTag::JsSelfProfile => js_self_profile::parse_js_self_profile(value),
        FormatTag::Typescript => typescript::parse_typescript(value),
    }
}

/// A frame declaration as evented/sampled trace envelopes ship them,
/// referenced by index from events and samples.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameDecl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default, alias = "col")]
    pub column: Option<u32>,
    #[serde(default, alias = "in_app", alias = "isApplication")]
    pub is_application: Option<bool>,
}

impl FrameDecl {
    /// Materialize the declaration at `index` into a canonical frame.
    /// Unnamed declarations get a positional placeholder.
    pub(crate) fn to_frame(&self, index: usize) -> Frame {
        Frame {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| format!("frame-{index}")),
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            is_application: self.is_application.unwrap_or(false),
        }
    }
}
