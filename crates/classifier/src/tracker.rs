//! Physical hand association across frames.
//!
//! Detections are matched to existing tracks by palm-centre proximity,
//! independent of the detector's handedness label, so a label flip between
//! frames does not split one hand into two gesture histories.

use std::collections::BTreeMap;

use handwave_common::clock::TimestampMs;
use handwave_common::config::TrackingConfig;
use handwave_model::gesture::TrackId;
use handwave_model::geometry::Point2D;
use handwave_model::landmark::Handedness;

/// Last known whereabouts of one tracked hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub position: Point2D,
    pub handedness: Handedness,
    pub last_seen_ms: TimestampMs,
}

/// Greedy nearest-neighbour hand tracker.
#[derive(Debug, Clone)]
pub struct HandTracker {
    config: TrackingConfig,
    tracks: BTreeMap<TrackId, Track>,
    next_id: u64,
}

impl HandTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn set_config(&mut self, config: TrackingConfig) {
        self.config = config;
    }

    /// Assign a track to each detection, in input order.
    ///
    /// Pairs are taken closest-first; a detection farther than
    /// `max_association_distance` from every free track opens a new one.
    /// Two detections in the same tick never share a track.
    pub fn associate(
        &mut self,
        detections: &[(Point2D, Handedness)],
        now_ms: TimestampMs,
    ) -> Vec<TrackId> {
        let mut candidates: Vec<(f64, usize, TrackId)> = Vec::new();
        for (index, (position, _)) in detections.iter().enumerate() {
            for track in self.tracks.values() {
                let distance = position.distance_to(&track.position);
                if distance <= self.config.max_association_distance {
                    candidates.push((distance, index, track.id));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.2.cmp(&b.2)));

        let mut assigned: Vec<Option<TrackId>> = vec![None; detections.len()];
        let mut taken: Vec<TrackId> = Vec::new();
        for (_, index, track_id) in candidates {
            if assigned[index].is_some() || taken.contains(&track_id) {
                continue;
            }
            assigned[index] = Some(track_id);
            taken.push(track_id);
        }

        assigned
            .into_iter()
            .zip(detections)
            .map(|(slot, (position, handedness))| {
                let id = slot.unwrap_or_else(|| self.open_track());
                if let Some(track) = self.tracks.get(&id) {
                    if track.handedness != *handedness {
                        tracing::debug!(
                            track = %id,
                            from = track.handedness.as_str(),
                            to = handedness.as_str(),
                            "Handedness label changed on tracked hand"
                        );
                    }
                }
                self.tracks.insert(
                    id,
                    Track {
                        id,
                        position: *position,
                        handedness: *handedness,
                        last_seen_ms: now_ms,
                    },
                );
                id
            })
            .collect()
    }

    fn open_track(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drop tracks unseen for longer than `track_ttl_ms`.
    pub fn expire(&mut self, now_ms: TimestampMs) -> Vec<TrackId> {
        let ttl = self.config.track_ttl_ms;
        let stale: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|t| now_ms.saturating_sub(t.last_seen_ms) > ttl)
            .map(|t| t.id)
            .collect();
        for id in &stale {
            self.tracks.remove(id);
        }
        stale
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> HandTracker {
        HandTracker::new(TrackingConfig::default())
    }

    #[test]
    fn test_new_detections_open_tracks() {
        let mut t = tracker();
        let ids = t.associate(
            &[
                (Point2D::new(0.2, 0.5), Handedness::Left),
                (Point2D::new(0.8, 0.5), Handedness::Right),
            ],
            0,
        );
        assert_eq!(ids, vec![TrackId(0), TrackId(1)]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_label_flip_keeps_track() {
        let mut t = tracker();
        let first = t.associate(&[(Point2D::new(0.5, 0.5), Handedness::Right)], 0);
        let second = t.associate(&[(Point2D::new(0.52, 0.5), Handedness::Left)], 33);
        assert_eq!(first, second);
        assert_eq!(t.track(first[0]).unwrap().handedness, Handedness::Left);
    }

    #[test]
    fn test_closest_pairs_win() {
        let mut t = tracker();
        let ids = t.associate(
            &[
                (Point2D::new(0.3, 0.5), Handedness::Left),
                (Point2D::new(0.6, 0.5), Handedness::Right),
            ],
            0,
        );
        // hands swapped order in the detector output and moved a bit
        let next = t.associate(
            &[
                (Point2D::new(0.62, 0.5), Handedness::Right),
                (Point2D::new(0.31, 0.5), Handedness::Left),
            ],
            33,
        );
        assert_eq!(next, vec![ids[1], ids[0]]);
    }

    #[test]
    fn test_far_jump_opens_new_track() {
        let mut t = tracker();
        let first = t.associate(&[(Point2D::new(0.1, 0.1), Handedness::Right)], 0);
        let second = t.associate(&[(Point2D::new(0.9, 0.9), Handedness::Right)], 33);
        assert_ne!(first, second);
    }

    #[test]
    fn test_expire_drops_stale_tracks() {
        let mut t = tracker();
        let ids = t.associate(&[(Point2D::new(0.5, 0.5), Handedness::Right)], 0);
        assert!(t.expire(1_000).is_empty());
        assert_eq!(t.expire(1_001), ids);
        assert!(t.is_empty());
    }
}
