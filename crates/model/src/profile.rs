use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// The original profiling format — informational, not for branching logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Android,
    Ios,
    JsSelfProfile,
    Typescript,
    Unknown,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Android => write!(f, "Android Method Trace"),
            Self::Ios => write!(f, "iOS Sampled Trace"),
            Self::JsSelfProfile => write!(f, "JS Self-Profile"),
            Self::Typescript => write!(f, "V8 CPU Profile"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One point-in-time stack capture.
///
/// The stack holds indices into the owning profile's frame table,
/// leaf first, root last. Timestamps and weights are canonical
/// nanoseconds regardless of the source format's native unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub stack: Vec<u32>,
    pub timestamp_ns: u64,
    pub weight_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Thread, track, or transaction name if the source provides one.
    pub name: Option<String>,
    pub source_format: SourceFormat,
    /// Canonical start of the profile in nanoseconds.
    pub start_ns: u64,
    /// Canonical end of the profile in nanoseconds.
    pub end_ns: u64,
}

/// An ordered sequence of samples for one execution track, plus the frame
/// table those samples index into.
///
/// Invariant: every index in every sample's stack resolves in `frames`.
/// Normalizers reject input that would break this (`MalformedProfile`);
/// consumers never need to handle dangling references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub metadata: ProfileMetadata,
    pub frames: Vec<Frame>,
    pub samples: Vec<Sample>,
}

impl Profile {
    pub fn duration_ns(&self) -> u64 {
        self.metadata.end_ns.saturating_sub(self.metadata.start_ns)
    }

    /// Look up a frame by table index.
    pub fn frame(&self, index: u32) -> Option<&Frame> {
        self.frames.get(index as usize)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> Profile {
        Profile {
            metadata: ProfileMetadata {
                name: Some("main".into()),
                source_format: SourceFormat::Ios,
                start_ns: 1_000,
                end_ns: 5_000,
            },
            frames: vec![
                Frame {
                    name: "main".into(),
                    file: Some("main.swift".into()),
                    line: Some(10),
                    column: None,
                    is_application: true,
                },
                Frame {
                    name: "render".into(),
                    file: None,
                    line: None,
                    column: None,
                    is_application: false,
                },
            ],
            samples: vec![Sample {
                stack: vec![1, 0],
                timestamp_ns: 1_000,
                weight_ns: 4_000,
            }],
        }
    }

    #[test]
    fn duration_from_metadata() {
        assert_eq!(test_profile().duration_ns(), 4_000);
    }

    #[test]
    fn duration_saturates_on_inverted_range() {
        let mut profile = test_profile();
        profile.metadata.end_ns = 0;
        assert_eq!(profile.duration_ns(), 0);
    }

    #[test]
    fn frame_lookup() {
        let profile = test_profile();
        assert_eq!(profile.frame(0).map(|f| f.name.as_str()), Some("main"));
        assert!(profile.frame(7).is_none());
    }

    #[test]
    fn source_format_display() {
        assert_eq!(SourceFormat::Android.to_string(), "Android Method Trace");
        assert_eq!(SourceFormat::JsSelfProfile.to_string(), "JS Self-Profile");
    }
}
