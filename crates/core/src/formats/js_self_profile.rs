use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use stackscope_model::{Frame, Profile, ProfileMetadata, Sample, SourceFormat, TimeUnit};

use crate::error::ImportError;
use crate::frame_table::FrameTable;

/// JS self-profiling trace (the W3C `Profiler` API).
///
/// Stacks are a table of linked nodes: each node names a frame and
/// points at its parent, and each sample references the leaf node of the
/// stack it captured — unwinding the parent chain yields the canonical
/// leaf-first order directly. Timestamps are `performance.now()`
/// milliseconds; a sample's weight is the delta to the next sample.
#[derive(Debug, Deserialize)]
struct SelfProfile {
    #[serde(default)]
    frames: Option<Vec<Value>>,
    #[serde(default)]
    stacks: Option<Vec<Value>>,
    #[serde(default)]
    samples: Option<Vec<Value>>,
    #[serde(default)]
    resources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SelfProfileFrame {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "resourceId")]
    resource_id: Option<u64>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StackNode {
    #[serde(default, rename = "frameId")]
    frame_id: Option<u64>,
    #[serde(default, rename = "parentId")]
    parent_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SelfProfileSample {
    #[serde(default, rename = "stackId")]
    stack_id: Option<u64>,
    #[serde(default)]
    timestamp: Option<f64>,
}

pub fn parse_js_self_profile(value: &Value) -> Result<Profile, ImportError> {
    let trace =
        SelfProfile::deserialize(value).map_err(|_| ImportError::malformed("profile"))?;

    let raw_frames = trace
        .frames
        .as_ref()
        .ok_or_else(|| ImportError::malformed("frames"))?;
    let raw_stacks = trace
        .stacks
        .as_ref()
        .ok_or_else(|| ImportError::malformed("stacks"))?;
    let raw_samples = trace
        .samples
        .as_ref()
        .ok_or_else(|| ImportError::malformed("samples"))?;

    // Decode frame declarations; a frame is application code when it
    // resolves to a resource (runtime-internal frames carry none).
    let mut frame_decls: Vec<Frame> = Vec::with_capacity(raw_frames.len());
    for (i, raw) in raw_frames.iter().enumerate() {
        let decl = SelfProfileFrame::deserialize(raw)
            .map_err(|_| ImportError::malformed(format!("frames[{i}]")))?;
        let name = decl
            .name
            .ok_or_else(|| ImportError::malformed(format!("frames[{i}].name")))?;
        let file = match decl.resource_id {
            Some(rid) => Some(
                trace
                    .resources
                    .get(rid as usize)
                    .cloned()
                    .ok_or_else(|| ImportError::malformed(format!("frames[{i}].resourceId")))?,
            ),
            None => None,
        };
        frame_decls.push(Frame {
            name,
            is_application: file.is_some(),
            file,
            line: decl.line,
            column: decl.column,
        });
    }

    let mut stack_nodes: Vec<StackNode> = Vec::with_capacity(raw_stacks.len());
    for (i, raw) in raw_stacks.iter().enumerate() {
        let node = StackNode::deserialize(raw)
            .map_err(|_| ImportError::malformed(format!("stacks[{i}]")))?;
        if node.frame_id.is_none() {
            return Err(ImportError::malformed(format!("stacks[{i}].frameId")));
        }
        stack_nodes.push(node);
    }

    // First pass: timestamps, validated chronological.
    let mut timestamps_ns: Vec<u64> = Vec::with_capacity(raw_samples.len());
    let mut stack_ids: Vec<Option<u64>> = Vec::with_capacity(raw_samples.len());
    for (i, raw) in raw_samples.iter().enumerate() {
        let sample = SelfProfileSample::deserialize(raw)
            .map_err(|_| ImportError::malformed(format!("samples[{i}]")))?;
        let timestamp = sample
            .timestamp
            .ok_or_else(|| ImportError::malformed(format!("samples[{i}].timestamp")))?;
        let ts_ns = TimeUnit::Milliseconds
            .to_nanos(timestamp)
            .ok_or_else(|| ImportError::malformed(format!("samples[{i}].timestamp")))?;
        if timestamps_ns.last().is_some_and(|&prev| ts_ns < prev) {
            return Err(ImportError::malformed(format!("samples[{i}].timestamp")));
        }
        timestamps_ns.push(ts_ns);
        stack_ids.push(sample.stack_id);
    }

    let mut table = FrameTable::new();
    let mut interned: HashMap<u64, u32> = HashMap::new();
    let mut samples: Vec<Sample> = Vec::with_capacity(raw_samples.len());

    for (i, stack_id) in stack_ids.iter().enumerate() {
        let stack = match stack_id {
            // Idle capture: the profiler saw no JS on the stack.
            None => Vec::new(),
            Some(leaf) => unwind(
                *leaf,
                i,
                &stack_nodes,
                &frame_decls,
                &mut table,
                &mut interned,
            )?,
        };
        let weight_ns = match timestamps_ns.get(i + 1) {
            Some(&next) => next - timestamps_ns[i],
            None => 0,
        };
        samples.push(Sample {
            stack,
            timestamp_ns: timestamps_ns[i],
            weight_ns,
        });
    }

    let start_ns = timestamps_ns.first().copied().unwrap_or(0);
    let end_ns = timestamps_ns.last().copied().unwrap_or(0);

    Ok(Profile {
        metadata: ProfileMetadata {
            name: None,
            source_format: SourceFormat::JsSelfProfile,
            start_ns,
            end_ns,
        },
        frames: table.into_frames(),
        samples,
    })
}

/// Walk the parent chain from a sample's leaf node, interning frames as
/// they are first referenced. The walk is bounded by the table size so a
/// cyclic `parentId` chain is a format error, not a hang.
fn unwind(
    leaf: u64,
    sample_idx: usize,
    stack_nodes: &[StackNode],
    frame_decls: &[Frame],
    table: &mut FrameTable,
    interned: &mut HashMap<u64, u32>,
) -> Result<Vec<u32>, ImportError> {
    let mut stack = Vec::new();
    let mut cursor = Some(leaf);
    let mut hops = 0usize;

    while let Some(node_id) = cursor {
        if hops > stack_nodes.len() {
            return Err(ImportError::malformed("stacks"));
        }
        hops += 1;

        let node = stack_nodes.get(node_id as usize).ok_or_else(|| {
            if hops == 1 {
                ImportError::malformed(format!("samples[{sample_idx}].stackId"))
            } else {
                ImportError::malformed(format!("stacks[{node_id}]"))
            }
        })?;
        let frame_id = node.frame_id.unwrap_or_default();

        let table_idx = match interned.get(&frame_id) {
            Some(&idx) => idx,
            None => {
                let decl = frame_decls
                    .get(frame_id as usize)
                    .ok_or_else(|| ImportError::malformed(format!("stacks[{node_id}].frameId")))?;
                let idx = table.intern(decl.clone());
                interned.insert(frame_id, idx);
                idx
            }
        };
        stack.push(table_idx);
        cursor = node.parent_id;
    }

    Ok(stack)
}
