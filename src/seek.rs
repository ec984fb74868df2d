//! Cue-based seek resolution.

use crate::metadata::CuePoint;

/// Cue point to start from when seeking to `target_ticks`.
///
/// Picks the last cue at or before the target. Targets before the first
/// cue resolve to the first cue. `cues` must be sorted by time.
pub fn resolve_cue(cues: &[CuePoint], target_ticks: u64) -> Option<&CuePoint> {
    let after = cues.partition_point(|cue| cue.cue_time_ticks <= target_ticks);
    cues.get(after.saturating_sub(1))
}

/// Segment-relative cluster offset to jump to for `target_ticks`.
///
/// Uses the cue position of `track` when the chosen cue has one, otherwise
/// the cue's first position.
pub fn resolve_cluster_offset(cues: &[CuePoint], target_ticks: u64, track: Option<u64>) -> Option<u64> {
    let cue = resolve_cue(cues, target_ticks)?;
    let position = track
        .and_then(|t| cue.positions.iter().find(|p| p.track_number == t))
        .or_else(|| cue.positions.first())?;
    Some(position.cluster_offset)
}
