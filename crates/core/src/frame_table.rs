use std::collections::HashMap;

use stackscope_model::Frame;

/// Deduplicating frame table builder.
///
/// Frames are interned by structural identity (name + file + line +
/// column) so two samples capturing the same logical location resolve to
/// the same index — downstream aggregation merges call paths by index.
/// Indices are assigned in first-seen order, so interning the same
/// normalized stream twice yields an identical table.
#[derive(Debug, Default)]
pub struct FrameTable {
    frames: Vec<Frame>,
    index: HashMap<FrameKey, u32>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct FrameKey {
    name: String,
    file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a frame, returning its table index.
    ///
    /// Identity excludes `is_application`: the first declaration of a
    /// location wins.
    pub fn intern(&mut self, frame: Frame) -> u32 {
        let key = FrameKey {
            name: frame.name.clone(),
            file: frame.file.clone(),
            line: frame.line,
            column: frame.column,
        };
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let idx = self.frames.len() as u32;
        self.frames.push(frame);
        self.index.insert(key, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Consume the builder, yielding the final frame table.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, file: Option<&str>, line: Option<u32>) -> Frame {
        Frame {
            name: name.into(),
            file: file.map(Into::into),
            line,
            column: None,
            is_application: false,
        }
    }

    #[test]
    fn identical_frames_share_an_index() {
        let mut table = FrameTable::new();
        let a = table.intern(frame("work", Some("app.js"), Some(3)));
        let b = table.intern(frame("work", Some("app.js"), Some(3)));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn location_is_part_of_identity() {
        let mut table = FrameTable::new();
        let a = table.intern(frame("work", Some("app.js"), Some(3)));
        let b = table.intern(frame("work", Some("app.js"), Some(9)));
        let c = table.intern(frame("work", None, Some(3)));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn application_flag_is_not_identity() {
        let mut table = FrameTable::new();
        let mut first = frame("work", None, None);
        first.is_application = true;
        let a = table.intern(first);
        let b = table.intern(frame("work", None, None));
        assert_eq!(a, b);
        // First declaration wins.
        assert!(table.into_frames()[a as usize].is_application);
    }

    #[test]
    fn indices_follow_first_seen_order() {
        let mut table = FrameTable::new();
        assert_eq!(table.intern(frame("a", None, None)), 0);
        assert_eq!(table.intern(frame("b", None, None)), 1);
        assert_eq!(table.intern(frame("a", None, None)), 0);
        assert_eq!(
            table
                .into_frames()
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
