use serde::Deserialize;
use serde_json::Value;
use stackscope_model::{Profile, ProfileMetadata, Sample, SourceFormat, TimeUnit};

use crate::error::ImportError;
use crate::formats::FrameDecl;
use crate::frame_table::FrameTable;

/// Android method trace: an evented stream of method enter/exit records.
///
/// Native unit is nanoseconds (the ART method tracer's clock) unless the
/// trace declares a `unit` label. Events must be chronological; the
/// stream is replayed against a stack, and every interval during which
/// the stack is non-empty becomes one canonical sample.
#[derive(Debug, Deserialize)]
struct EventedTrace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, rename = "startValue")]
    start_value: Option<f64>,
    #[serde(default, rename = "endValue")]
    end_value: Option<f64>,
    #[serde(default)]
    events: Option<Vec<Value>>,
    /// Inline frame declarations; envelope-shared frames are used when absent.
    #[serde(default)]
    frames: Option<Vec<FrameDecl>>,
}

#[derive(Debug, Deserialize)]
struct TraceEvent {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    at: Option<f64>,
    #[serde(default)]
    frame: Option<u64>,
}

pub fn parse_android(value: &Value, shared_frames: &[FrameDecl]) -> Result<Profile, ImportError> {
    let trace =
        EventedTrace::deserialize(value).map_err(|_| ImportError::malformed("profile"))?;

    let unit = match trace.unit.as_deref() {
        Some(label) => TimeUnit::from_label(label).ok_or_else(|| ImportError::malformed("unit"))?,
        None => TimeUnit::Nanoseconds,
    };

    let start_value = trace
        .start_value
        .ok_or_else(|| ImportError::malformed("startValue"))?;
    let end_value = trace
        .end_value
        .ok_or_else(|| ImportError::malformed("endValue"))?;
    let start_ns = unit
        .to_nanos(start_value)
        .ok_or_else(|| ImportError::malformed("startValue"))?;
    let end_ns = unit
        .to_nanos(end_value)
        .ok_or_else(|| ImportError::malformed("endValue"))?;

    let events = trace
        .events
        .as_ref()
        .ok_or_else(|| ImportError::malformed("events"))?;
    let frame_decls = trace.frames.as_deref().unwrap_or(shared_frames);

    let mut table = FrameTable::new();
    let mut samples: Vec<Sample> = Vec::new();

    // Open frames, outermost first; snapshot is reversed to leaf-first.
    let mut open: Vec<u32> = Vec::new();
    let mut last_ns = start_ns;

    for (i, raw_event) in events.iter().enumerate() {
        let event = TraceEvent::deserialize(raw_event)
            .map_err(|_| ImportError::malformed(format!("events[{i}]")))?;
        let kind = event
            .kind
            .ok_or_else(|| ImportError::malformed(format!("events[{i}].type")))?;
        let at = event
            .at
            .ok_or_else(|| ImportError::malformed(format!("events[{i}].at")))?;
        let at_ns = unit
            .to_nanos(at)
            .ok_or_else(|| ImportError::malformed(format!("events[{i}].at")))?;
        if at_ns < last_ns {
            return Err(ImportError::malformed(format!("events[{i}].at")));
        }

        // Close out the interval preceding this event.
        if !open.is_empty() && at_ns > last_ns {
            samples.push(Sample {
                stack: open.iter().rev().copied().collect(),
                timestamp_ns: last_ns,
                weight_ns: at_ns - last_ns,
            });
        }
        last_ns = at_ns;

        match kind.as_str() {
            "O" => {
                let frame = event
                    .frame
                    .ok_or_else(|| ImportError::malformed(format!("events[{i}].frame")))?
                    as usize;
                let decl = frame_decls
                    .get(frame)
                    .ok_or_else(|| ImportError::malformed(format!("events[{i}].frame")))?;
                open.push(table.intern(decl.to_frame(frame)));
            }
            "C" => {
                // Unbalanced closes are ignored.
                open.pop();
            }
            _ => {
                return Err(ImportError::malformed(format!("events[{i}].type")));
            }
        }
    }

    // Frames still open at the end of the trace run to its declared end.
    let end_ns = end_ns.max(last_ns);
    if !open.is_empty() && end_ns > last_ns {
        samples.push(Sample {
            stack: open.iter().rev().copied().collect(),
            timestamp_ns: last_ns,
            weight_ns: end_ns - last_ns,
        });
    }

    Ok(Profile {
        metadata: ProfileMetadata {
            name: trace.name,
            source_format: SourceFormat::Android,
            start_ns,
            end_ns,
        },
        frames: table.into_frames(),
        samples,
    })
}
