use serde_json::Value;
use stackscope_model::{FailedProfile, ProfileGroup, SourceFormat};

use crate::error::ImportError;
use crate::formats::{FrameDecl, detect_format, normalize};

/// Caller-side knobs for group assembly.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Preferred active profile, as an index into the surviving profiles.
    /// Takes precedence over any hint the raw input carries; out-of-range
    /// preferences fall through to the input hint.
    pub active_profile_index: Option<usize>,
}

/// Import a raw trace into a `ProfileGroup`.
///
/// Accepts either a group envelope (an object with a `profiles` array,
/// optionally `shared.frames` declarations, a name, a trace id, and an
/// active-profile hint) or a bare profile in any detected format, which
/// is wrapped as a one-profile group.
///
/// Synchronous and side-effect-free: no I/O, no shared state between
/// imports. Constituents that fail detection or normalization are
/// skipped and recorded on the group; only a fully failed input is an
/// error.
pub fn import_profile(raw: &Value, trace_id: Option<&str>) -> Result<ProfileGroup, ImportError> {
    import_profile_with_options(raw, trace_id, &ImportOptions::default())
}

pub fn import_profile_with_options(
    raw: &Value,
    trace_id: Option<&str>,
    options: &ImportOptions,
) -> Result<ProfileGroup, ImportError> {
    if raw.get("profiles").is_some_and(Value::is_array) {
        import_group(raw, trace_id, options)
    } else {
        import_single(raw, trace_id, options)
    }
}

/// Byte-level convenience over [`import_profile`] for callers holding an
/// undecoded response body or file drop.
pub fn import_profile_from_slice(
    data: &[u8],
    trace_id: Option<&str>,
) -> Result<ProfileGroup, ImportError> {
    let raw: Value = serde_json::from_slice(data)?;
    import_profile(&raw, trace_id)
}

fn import_single(
    raw: &Value,
    trace_id: Option<&str>,
    options: &ImportOptions,
) -> Result<ProfileGroup, ImportError> {
    let tag = detect_format(raw).ok_or(ImportError::UnrecognizedFormat)?;
    let profile = normalize(tag, raw, &[])?;

    Ok(ProfileGroup {
        name: profile.metadata.name.clone().unwrap_or_default(),
        trace_id: trace_id.unwrap_or_default().to_string(),
        active_profile_index: resolve_active_index(options.active_profile_index, None, 1),
        profiles: vec![profile],
        failed: Vec::new(),
    })
}

fn import_group(
    raw: &Value,
    trace_id: Option<&str>,
    options: &ImportOptions,
) -> Result<ProfileGroup, ImportError> {
    // Envelope scalars are all optional; constituents are decoded
    // individually below so one bad entry cannot poison the rest.
    let envelope_name = raw
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| raw.get("transactionName").and_then(Value::as_str));
    let envelope_trace_id = raw.get("traceID").and_then(Value::as_str);
    let hint = raw
        .get("activeProfileIndex")
        .and_then(Value::as_u64)
        .map(|v| v as usize);
    let shared_frames = shared_frame_decls(raw)?;

    let entries = raw
        .get("profiles")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::malformed("profiles"))?;

    let mut profiles = Vec::with_capacity(entries.len());
    let mut failed = Vec::new();
    // Surviving position of each input constituent, for hint remapping.
    let mut survivors: Vec<Option<usize>> = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match detect_format(entry) {
            None => {
                failed.push(FailedProfile {
                    index,
                    format: SourceFormat::Unknown,
                    reason: ImportError::UnrecognizedFormat.to_string(),
                });
                survivors.push(None);
            }
            Some(tag) => match normalize(tag, entry, &shared_frames) {
                Ok(profile) => {
                    survivors.push(Some(profiles.len()));
                    profiles.push(profile);
                }
                Err(err) => {
                    failed.push(FailedProfile {
                        index,
                        format: tag.source_format(),
                        reason: err.to_string(),
                    });
                    survivors.push(None);
                }
            },
        }
    }

    if profiles.is_empty() {
        return Err(ImportError::EmptyProfileGroup {
            failed: failed.len(),
        });
    }

    // The envelope hint indexes the raw input; remap it to the surviving
    // profile's position. A hint pointing at a failed constituent is lost.
    let remapped_hint = hint.and_then(|h| survivors.get(h).copied().flatten());

    let name = envelope_name
        .map(ToOwned::to_owned)
        .or_else(|| profiles.first().and_then(|p| p.metadata.name.clone()))
        .unwrap_or_default();

    Ok(ProfileGroup {
        name,
        trace_id: trace_id
            .or(envelope_trace_id)
            .unwrap_or_default()
            .to_string(),
        active_profile_index: resolve_active_index(
            options.active_profile_index,
            remapped_hint,
            profiles.len(),
        ),
        profiles,
        failed,
    })
}

fn shared_frame_decls(raw: &Value) -> Result<Vec<FrameDecl>, ImportError> {
    use serde::Deserialize;

    let Some(shared) = raw.get("shared") else {
        return Ok(Vec::new());
    };
    let frames = shared
        .get("frames")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::malformed("shared.frames"))?;
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            FrameDecl::deserialize(frame)
                .map_err(|_| ImportError::malformed(format!("shared.frames[{i}]")))
        })
        .collect()
}

/// Active-profile precedence: caller preference, then the input's hint,
/// then the first profile. The caller's preference and the hint are both
/// discarded when out of range, never clamped.
fn resolve_active_index(caller: Option<usize>, hint: Option<usize>, len: usize) -> usize {
    caller
        .filter(|&i| i < len)
        .or_else(|| hint.filter(|&i| i < len))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: &str) -> Value {
        serde_json::from_str(json).expect("valid test JSON")
    }

    fn mixed_group() -> Value {
        value(
            r#"{
                "name": "app.startup",
                "traceID": "4b25c4a0",
                "activeProfileIndex": 2,
                "shared": {
                    "frames": [
                        {"name": "main", "in_app": true},
                        {"name": "render"}
                    ]
                },
                "profiles": [
                    {
                        "type": "evented",
                        "name": "main thread",
                        "startValue": 0,
                        "endValue": 100,
                        "events": [
                            {"type": "O", "at": 0, "frame": 0},
                            {"type": "C", "at": 100, "frame": 0}
                        ]
                    },
                    {
                        "type": "sampled",
                        "startValue": 0
                    },
                    {
                        "type": "sampled",
                        "name": "render thread",
                        "startValue": 0,
                        "samples": [[0, 1]],
                        "weights": [50]
                    }
                ]
            }"#,
        )
    }

    #[test]
    fn group_with_one_bad_constituent_imports_the_rest() {
        let group = import_profile(&mixed_group(), None).expect("partial import");
        assert_eq!(group.name, "app.startup");
        assert_eq!(group.trace_id, "4b25c4a0");
        assert_eq!(group.profile_count(), 2);

        assert_eq!(group.failed.len(), 1);
        assert_eq!(group.failed[0].index, 1);
        assert_eq!(group.failed[0].format, SourceFormat::Ios);
        assert!(group.failed[0].reason.contains("samples"));
    }

    #[test]
    fn envelope_hint_is_remapped_around_failures() {
        // Hint 2 points at the render-thread profile, which survives as
        // index 1 after the malformed constituent is skipped.
        let group = import_profile(&mixed_group(), None).expect("partial import");
        assert_eq!(group.active_profile_index, 1);
        let active = group.active_profile().expect("in range");
        assert_eq!(active.metadata.name.as_deref(), Some("render thread"));
    }

    #[test]
    fn caller_preference_wins_over_envelope_hint() {
        let options = ImportOptions {
            active_profile_index: Some(0),
        };
        let group = import_profile_with_options(&mixed_group(), None, &options)
            .expect("partial import");
        assert_eq!(group.active_profile_index, 0);
    }

    #[test]
    fn out_of_range_caller_preference_falls_through_to_hint() {
        let options = ImportOptions {
            active_profile_index: Some(9),
        };
        let group = import_profile_with_options(&mixed_group(), None, &options)
            .expect("partial import");
        assert_eq!(group.active_profile_index, 1);
    }

    #[test]
    fn hint_pointing_at_failed_constituent_falls_back_to_zero() {
        let mut raw = mixed_group();
        raw["activeProfileIndex"] = Value::from(1);
        let group = import_profile(&raw, None).expect("partial import");
        assert_eq!(group.active_profile_index, 0);
    }

    #[test]
    fn caller_trace_id_wins_over_envelope() {
        let group = import_profile(&mixed_group(), Some("deadbeef")).expect("import");
        assert_eq!(group.trace_id, "deadbeef");
    }

    #[test]
    fn all_constituents_failing_is_an_empty_group() {
        let raw = value(
            r#"{
                "profiles": [
                    {"type": "sampled", "startValue": 0},
                    {"lorem": "ipsum"}
                ]
            }"#,
        );
        match import_profile(&raw, None) {
            Err(ImportError::EmptyProfileGroup { failed }) => assert_eq!(failed, 2),
            other => panic!("expected EmptyProfileGroup, got {other:?}"),
        }
    }

    #[test]
    fn empty_profiles_array_is_an_empty_group() {
        let raw = value(r#"{"profiles": []}"#);
        match import_profile(&raw, None) {
            Err(ImportError::EmptyProfileGroup { failed }) => assert_eq!(failed, 0),
            other => panic!("expected EmptyProfileGroup, got {other:?}"),
        }
    }

    #[test]
    fn bare_profile_wraps_into_a_group_of_one() {
        let raw = value(
            r#"{
                "frames": [{"name": "tick"}],
                "stacks": [{"frameId": 0}],
                "samples": [{"stackId": 0, "timestamp": 5.0}]
            }"#,
        );
        let group = import_profile(&raw, Some("cafe")).expect("import");
        assert_eq!(group.profile_count(), 1);
        assert_eq!(group.active_profile_index, 0);
        assert_eq!(group.trace_id, "cafe");
        assert!(group.failed.is_empty());
    }

    #[test]
    fn undetectable_bare_input_is_unrecognized() {
        let raw = value(r#"{"hello": "world"}"#);
        match import_profile(&raw, None) {
            Err(ImportError::UnrecognizedFormat) => {}
            other => panic!("expected UnrecognizedFormat, got {other:?}"),
        }
    }

    #[test]
    fn import_is_idempotent() {
        let raw = mixed_group();
        let first = import_profile(&raw, Some("t1")).expect("import");
        let second = import_profile(&raw, Some("t1")).expect("import");
        assert_eq!(first, second);
    }

    #[test]
    fn from_slice_rejects_invalid_json() {
        assert!(matches!(
            import_profile_from_slice(b"not json", None),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn from_slice_imports_bytes() {
        let data = br#"{
            "frames": [{"name": "tick"}],
            "stacks": [{"frameId": 0}],
            "samples": [{"stackId": 0, "timestamp": 5.0}]
        }"#;
        let group = import_profile_from_slice(data, None).expect("import");
        assert_eq!(group.profile_count(), 1);
    }
}
