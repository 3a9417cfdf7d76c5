use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use stackscope_model::{Frame, Profile, ProfileMetadata, Sample, SourceFormat, TimeUnit};

use crate::error::ImportError;
use crate::frame_table::FrameTable;

/// V8 CPU profile (`.cpuprofile`), the output of `tsc --generateCpuProfile`
/// and Node's `--cpu-prof`.
///
/// Native unit is microseconds: `startTime`/`endTime` are absolute and
/// `timeDeltas[i]` is the gap preceding sample `i`. Each sample names the
/// node it caught on-stack; unwinding the node's parent chain yields the
/// canonical leaf-first stack.
#[derive(Debug, Deserialize)]
struct CpuProfile {
    #[serde(default)]
    nodes: Option<Vec<Value>>,
    #[serde(default, rename = "startTime")]
    start_time: Option<f64>,
    #[serde(default, rename = "endTime")]
    end_time: Option<f64>,
    #[serde(default)]
    samples: Option<Vec<Value>>,
    #[serde(default, rename = "timeDeltas")]
    time_deltas: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ProfileNode {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default, rename = "callFrame")]
    call_frame: Option<CallFrame>,
    #[serde(default)]
    children: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct CallFrame {
    #[serde(default, rename = "functionName")]
    function_name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "lineNumber")]
    line_number: Option<i64>,
    #[serde(default, rename = "columnNumber")]
    column_number: Option<i64>,
}

impl CallFrame {
    fn to_frame(&self) -> Frame {
        let name = if self.function_name.is_empty() {
            "(anonymous)".to_string()
        } else {
            self.function_name.clone()
        };
        let url = self.url.as_deref().filter(|u| !u.is_empty());
        // Compiler-internal and runtime frames have no URL; dependency
        // frames resolve under node_modules.
        let is_application = url.is_some_and(|u| !u.contains("node_modules"));
        Frame {
            name,
            file: url.map(ToOwned::to_owned),
            line: self.line_number.and_then(|l| u32::try_from(l).ok()),
            column: self.column_number.and_then(|c| u32::try_from(c).ok()),
            is_application,
        }
    }
}

pub fn parse_typescript(value: &Value) -> Result<Profile, ImportError> {
    let profile =
        CpuProfile::deserialize(value).map_err(|_| ImportError::malformed("profile"))?;

    let raw_nodes = profile
        .nodes
        .as_ref()
        .filter(|nodes| !nodes.is_empty())
        .ok_or_else(|| ImportError::malformed("nodes"))?;
    let start_time = profile
        .start_time
        .ok_or_else(|| ImportError::malformed("startTime"))?;
    let end_time = profile
        .end_time
        .ok_or_else(|| ImportError::malformed("endTime"))?;
    let raw_samples = profile
        .samples
        .as_ref()
        .ok_or_else(|| ImportError::malformed("samples"))?;
    let raw_deltas = profile
        .time_deltas
        .as_ref()
        .ok_or_else(|| ImportError::malformed("timeDeltas"))?;
    if raw_samples.len() != raw_deltas.len() {
        return Err(ImportError::malformed("timeDeltas"));
    }

    let start_ns = TimeUnit::Microseconds
        .to_nanos(start_time)
        .ok_or_else(|| ImportError::malformed("startTime"))?;
    let end_ns = TimeUnit::Microseconds
        .to_nanos(end_time)
        .ok_or_else(|| ImportError::malformed("endTime"))?;

    // Node tree: id lookup plus child -> parent edges.
    let mut nodes: HashMap<u64, ProfileNode> = HashMap::with_capacity(raw_nodes.len());
    let mut parents: HashMap<u64, u64> = HashMap::new();
    for (i, raw) in raw_nodes.iter().enumerate() {
        let node = ProfileNode::deserialize(raw)
            .map_err(|_| ImportError::malformed(format!("nodes[{i}]")))?;
        let id = node
            .id
            .ok_or_else(|| ImportError::malformed(format!("nodes[{i}].id")))?;
        if node.call_frame.is_none() {
            return Err(ImportError::malformed(format!("nodes[{i}].callFrame")));
        }
        for &child in &node.children {
            parents.insert(child, id);
        }
        nodes.insert(id, node);
    }

    // Timestamps: running sum of deltas from startTime. Real V8 output
    // contains occasional negative jitter deltas; the cursor is clamped
    // so canonical time stays monotonic.
    let mut timestamps_ns: Vec<u64> = Vec::with_capacity(raw_samples.len());
    let mut cursor = start_time;
    for (i, raw) in raw_deltas.iter().enumerate() {
        let delta = raw
            .as_f64()
            .ok_or_else(|| ImportError::malformed(format!("timeDeltas[{i}]")))?;
        cursor += delta;
        let clamped = cursor.max(start_time);
        let ts_ns = TimeUnit::Microseconds
            .to_nanos(clamped)
            .ok_or_else(|| ImportError::malformed(format!("timeDeltas[{i}]")))?;
        let ts_ns = timestamps_ns.last().map_or(ts_ns, |&prev| ts_ns.max(prev));
        timestamps_ns.push(ts_ns);
    }

    let mut table = FrameTable::new();
    let mut interned: HashMap<u64, u32> = HashMap::new();
    let mut samples: Vec<Sample> = Vec::with_capacity(raw_samples.len());

    for (i, raw) in raw_samples.iter().enumerate() {
        let node_id = raw
            .as_u64()
            .ok_or_else(|| ImportError::malformed(format!("samples[{i}]")))?;
        if !nodes.contains_key(&node_id) {
            return Err(ImportError::malformed(format!("samples[{i}]")));
        }

        // Leaf-first walk up the parent chain, bounded to catch cycles.
        let mut stack = Vec::new();
        let mut cursor_id = Some(node_id);
        let mut hops = 0usize;
        while let Some(id) = cursor_id {
            if hops > nodes.len() {
                return Err(ImportError::malformed("nodes"));
            }
            hops += 1;
            let Some(node) = nodes.get(&id) else { break };
            let table_idx = match interned.get(&id) {
                Some(&idx) => idx,
                None => {
                    let Some(call_frame) = node.call_frame.as_ref() else {
                        break;
                    };
                    let idx = table.intern(call_frame.to_frame());
                    interned.insert(id, idx);
                    idx
                }
            };
            stack.push(table_idx);
            cursor_id = parents.get(&id).copied();
        }

        let timestamp_ns = timestamps_ns[i];
        let weight_ns = match timestamps_ns.get(i + 1) {
            Some(&next) => next - timestamp_ns,
            None => end_ns.saturating_sub(timestamp_ns),
        };
        samples.push(Sample {
            stack,
            timestamp_ns,
            weight_ns,
        });
    }

    Ok(Profile {
        metadata: ProfileMetadata {
            name: None,
            source_format: SourceFormat::Typescript,
            start_ns,
            end_ns: end_ns.max(timestamps_ns.last().copied().unwrap_or(0)),
        },
        frames: table.into_frames(),
        samples,
    })
}
