//! Recorded sensor ticks in JSONL format.
//!
//! One JSON object per line, each holding every hand observed during one
//! tick of the frame source. Lines starting with `#` are comments.

use serde::{Deserialize, Serialize};

use handwave_common::clock::TimestampMs;
use handwave_common::error::{HandwaveError, HandwaveResult};

use crate::landmark::LandmarkFrame;

/// All hand observations delivered in one tick of the frame source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTick {
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,

    #[serde(default)]
    pub hands: Vec<LandmarkFrame>,
}

impl FrameTick {
    pub fn new(timestamp_ms: TimestampMs, hands: Vec<LandmarkFrame>) -> Self {
        Self {
            timestamp_ms,
            hands,
        }
    }

    /// A tick with no hands in view.
    pub fn empty(timestamp_ms: TimestampMs) -> Self {
        Self::new(timestamp_ms, Vec::new())
    }
}

/// Parse ticks from JSONL content, reporting the 1-based line of any error.
pub fn parse_ticks(jsonl: &str) -> HandwaveResult<Vec<FrameTick>> {
    let mut ticks = Vec::new();
    let mut last_ts = None;
    for (index, line) in jsonl.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tick: FrameTick = serde_json::from_str(line)
            .map_err(|e| HandwaveError::frame_log(index + 1, e.to_string()))?;
        if let Some(prev) = last_ts {
            if tick.timestamp_ms < prev {
                return Err(HandwaveError::frame_log(
                    index + 1,
                    format!("timestamp {} goes backwards (previous {prev})", tick.timestamp_ms),
                ));
            }
        }
        last_ts = Some(tick.timestamp_ms);
        ticks.push(tick);
    }
    Ok(ticks)
}

/// Serialize ticks to JSONL format.
pub fn serialize_ticks(ticks: &[FrameTick]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for tick in ticks {
        output.push_str(&serde_json::to_string(tick)?);
        output.push('\n');
    }
    Ok(output)
}
