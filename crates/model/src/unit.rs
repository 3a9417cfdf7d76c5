use serde::{Deserialize, Serialize};

/// Time unit a source format natively reports in.
///
/// Every normalizer converts to canonical nanoseconds on import; the
/// conversion factor is fixed per unit so the mapping is deterministic
/// and reversible within rounding tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Resolve a unit label as declared by evented/sampled trace envelopes.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "nanoseconds" | "ns" => Some(Self::Nanoseconds),
            "microseconds" | "us" | "µs" => Some(Self::Microseconds),
            "milliseconds" | "ms" => Some(Self::Milliseconds),
            "seconds" | "s" => Some(Self::Seconds),
            _ => None,
        }
    }

    /// How many nanoseconds one native unit spans.
    pub fn nanos_per_unit(&self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1_000.0,
            Self::Milliseconds => 1_000_000.0,
            Self::Seconds => 1_000_000_000.0,
        }
    }

    /// Convert a native value to canonical nanoseconds.
    ///
    /// Returns `None` for non-finite or negative input — timestamps and
    /// weights are forward-only in every supported format.
    pub fn to_nanos(&self, value: f64) -> Option<u64> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some((value * self.nanos_per_unit()).round() as u64)
    }

    /// Convert canonical nanoseconds back to this unit.
    pub fn from_nanos(&self, nanos: u64) -> f64 {
        nanos as f64 / self.nanos_per_unit()
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nanoseconds => write!(f, "nanoseconds"),
            Self::Microseconds => write!(f, "microseconds"),
            Self::Milliseconds => write!(f, "milliseconds"),
            Self::Seconds => write!(f, "seconds"),
        }
    }
}
