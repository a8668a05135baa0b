use proptest::prelude::*;

use handwave_common::error::HandwaveError;
use handwave_model::frame_log::{parse_ticks, serialize_ticks, FrameTick};
use handwave_model::landmark::{Handedness, Landmark, LandmarkFrame, LANDMARK_COUNT};

// dyadic values survive a JSON trip exactly
fn coord() -> impl Strategy<Value = f64> {
    (0u32..1024).prop_map(|k| f64::from(k) / 1024.0)
}

fn landmark() -> impl Strategy<Value = Landmark> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Landmark::new(x, y, z - 0.5))
}

fn hand(t: u64) -> impl Strategy<Value = LandmarkFrame> {
    (
        prop::collection::vec(landmark(), LANDMARK_COUNT),
        any::<bool>(),
        coord(),
    )
        .prop_map(move |(landmarks, right, confidence)| {
            let handedness = if right {
                Handedness::Right
            } else {
                Handedness::Left
            };
            LandmarkFrame::new(landmarks, handedness, confidence, t)
        })
}

fn timestamps() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..100, 1..20).prop_map(|gaps| {
        gaps.iter()
            .scan(0u64, |t, gap| {
                *t += gap;
                Some(*t)
            })
            .collect()
    })
}

fn log() -> impl Strategy<Value = Vec<FrameTick>> {
    timestamps().prop_flat_map(|stamps| {
        stamps
            .into_iter()
            .map(|t| prop::collection::vec(hand(t), 0..3).prop_map(move |h| FrameTick::new(t, h)))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn recorded_log_reads_back_with_comments(ticks in log(), every in 1usize..4) {
        let jsonl = serialize_ticks(&ticks).unwrap();
        let mut annotated = String::from("# recorded by handwave synth\n");
        for (i, line) in jsonl.lines().enumerate() {
            if i % every == 0 {
                annotated.push_str("\n# tick\n");
            }
            annotated.push_str(line);
            annotated.push('\n');
        }
        prop_assert_eq!(parse_ticks(&annotated).unwrap(), ticks);
    }

    #[test]
    fn backwards_timestamp_is_reported_at_its_line(
        stamps in timestamps().prop_filter("needs two ticks", |s| s.len() >= 2),
        pick in any::<prop::sample::Index>(),
    ) {
        let bad = 1 + pick.index(stamps.len() - 1);
        let mut ticks: Vec<FrameTick> = stamps.iter().map(|&t| FrameTick::empty(t + 1)).collect();
        ticks[bad].timestamp_ms = ticks[bad - 1].timestamp_ms - 1;
        let jsonl = serialize_ticks(&ticks).unwrap();

        match parse_ticks(&jsonl) {
            Err(HandwaveError::FrameLog { line, .. }) => prop_assert_eq!(line, bad + 1),
            other => prop_assert!(false, "expected a frame log error, got {:?}", other),
        }
    }
}
