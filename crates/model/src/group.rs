use serde::{Deserialize, Serialize};

use crate::profile::{Profile, SourceFormat};

/// The import result every profiling format normalizes into.
///
/// ```text
///   android ───┐
///   ios        ├──▶ Profile (canonical samples) ──▶ ProfileGroup ──▶ renderer
///   js-self    ├──▶ Profile                     ──▶   (this)
///   typescript ┘
/// ```
///
/// A group is created once per import and replaced wholesale on
/// re-import; nothing mutates it incrementally. Constituent profiles
/// that failed normalization are recorded in `failed` rather than
/// aborting the import — but a group with zero surviving profiles is
/// never constructed (the importer fails with `EmptyProfileGroup`
/// instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileGroup {
    /// Display name (transaction or interaction name).
    pub name: String,
    /// Identifier of the trace all profiles in the group belong to.
    pub trace_id: String,
    /// Which profile the display layer should present first.
    /// Always a valid index into `profiles`.
    pub active_profile_index: usize,
    pub profiles: Vec<Profile>,
    /// Constituents of the raw input that did not survive normalization.
    pub failed: Vec<FailedProfile>,
}

/// Record of one constituent profile that was skipped during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedProfile {
    /// Position of the constituent in the raw input.
    pub index: usize,
    /// Detected format, `Unknown` if detection itself failed.
    pub format: SourceFormat,
    pub reason: String,
}

impl ProfileGroup {
    pub fn active_profile(&self) -> Option<&Profile> {
        self.profiles.get(self.active_profile_index)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileMetadata;

    fn group_with(profiles: Vec<Profile>, active: usize) -> ProfileGroup {
        ProfileGroup {
            name: "checkout".into(),
            trace_id: "ab12".into(),
            active_profile_index: active,
            profiles,
            failed: Vec::new(),
        }
    }

    fn empty_profile(name: &str) -> Profile {
        Profile {
            metadata: ProfileMetadata {
                name: Some(name.into()),
                source_format: SourceFormat::Android,
                start_ns: 0,
                end_ns: 0,
            },
            frames: Vec::new(),
            samples: Vec::new(),
        }
    }

    #[test]
    fn active_profile_follows_index() {
        let group = group_with(vec![empty_profile("a"), empty_profile("b")], 1);
        let active = group.active_profile().expect("index in range");
        assert_eq!(active.metadata.name.as_deref(), Some("b"));
    }

    #[test]
    fn serialization_roundtrip() {
        let group = group_with(vec![empty_profile("a")], 0);
        let json = serde_json::to_string(&group).expect("serialize");
        let back: ProfileGroup = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, group);
    }
}
