use serde::Deserialize;
use serde_json::Value;
use stackscope_model::{Profile, ProfileMetadata, Sample, SourceFormat, TimeUnit};

use crate::error::ImportError;
use crate::formats::FrameDecl;
use crate::frame_table::FrameTable;

/// iOS trace: flat stack samples with a parallel weights array.
///
/// Stacks arrive root-first and are reversed to the canonical leaf-first
/// order. Native unit is nanoseconds (`mach_absolute_time` weights)
/// unless the trace declares a `unit` label; timestamps are the running
/// sum of weights from `startValue`.
#[derive(Debug, Deserialize)]
struct SampledTrace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, rename = "startValue")]
    start_value: Option<f64>,
    #[serde(default, rename = "endValue")]
    end_value: Option<f64>,
    #[serde(default)]
    samples: Option<Vec<Value>>,
    #[serde(default)]
    weights: Option<Vec<Value>>,
    /// Inline frame declarations; envelope-shared frames are used when absent.
    #[serde(default)]
    frames: Option<Vec<FrameDecl>>,
}

pub fn parse_ios(value: &Value, shared_frames: &[FrameDecl]) -> Result<Profile, ImportError> {
    let trace =
        SampledTrace::deserialize(value).map_err(|_| ImportError::malformed("profile"))?;

    let unit = match trace.unit.as_deref() {
        Some(label) => TimeUnit::from_label(label).ok_or_else(|| ImportError::malformed("unit"))?,
        None => TimeUnit::Nanoseconds,
    };

    let start_value = trace
        .start_value
        .ok_or_else(|| ImportError::malformed("startValue"))?;
    let start_ns = unit
        .to_nanos(start_value)
        .ok_or_else(|| ImportError::malformed("startValue"))?;

    let raw_samples = trace
        .samples
        .as_ref()
        .ok_or_else(|| ImportError::malformed("samples"))?;
    let raw_weights = trace
        .weights
        .as_ref()
        .ok_or_else(|| ImportError::malformed("weights"))?;
    if raw_samples.len() != raw_weights.len() {
        return Err(ImportError::malformed("weights"));
    }

    let frame_decls = trace.frames.as_deref().unwrap_or(shared_frames);

    let mut table = FrameTable::new();
    let mut samples: Vec<Sample> = Vec::with_capacity(raw_samples.len());
    let mut cursor_ns = start_ns;

    for (i, raw_stack) in raw_samples.iter().enumerate() {
        let stack_decl_indices: Vec<u64> = Vec::deserialize(raw_stack)
            .map_err(|_| ImportError::malformed(format!("samples[{i}]")))?;
        let weight = raw_weights[i]
            .as_f64()
            .ok_or_else(|| ImportError::malformed(format!("weights[{i}]")))?;
        let weight_ns = unit
            .to_nanos(weight)
            .ok_or_else(|| ImportError::malformed(format!("weights[{i}]")))?;

        // Source order is root-first; canonical order is leaf-first.
        let mut stack = Vec::with_capacity(stack_decl_indices.len());
        for (j, &decl_idx) in stack_decl_indices.iter().enumerate().rev() {
            let decl = frame_decls
                .get(decl_idx as usize)
                .ok_or_else(|| ImportError::malformed(format!("samples[{i}][{j}]")))?;
            stack.push(table.intern(decl.to_frame(decl_idx as usize)));
        }

        samples.push(Sample {
            stack,
            timestamp_ns: cursor_ns,
            weight_ns,
        });
        cursor_ns += weight_ns;
    }

    let end_ns = match trace.end_value {
        Some(v) => unit
            .to_nanos(v)
            .ok_or_else(|| ImportError::malformed("endValue"))?
            .max(cursor_ns),
        None => cursor_ns,
    };

    Ok(Profile {
        metadata: ProfileMetadata {
            name: trace.name,
            source_format: SourceFormat::Ios,
            start_ns,
            end_ns,
        },
        frames: table.into_frames(),
        samples,
    })
}
