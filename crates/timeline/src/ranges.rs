//! Range timelines: fixed-size statistics for Digest, collapsed phases for
//! the Ultra profiles.

use crate::segment::top_terms;
use handoff_core::{CognitiveDay, MacroPhase, Message, Role, TimelineEntry};
use handoff_extract::Corpus;

const PHASE_KEYWORDS: usize = 3;

/// Per-range message counts and timestamp bounds. Carries no content.
pub fn range_timeline(messages: &[Message], range_size: usize) -> Vec<TimelineEntry> {
    let range_size = range_size.max(1);
    messages
        .chunks(range_size)
        .enumerate()
        .map(|(i, chunk)| {
            let start = i * range_size;
            let user_messages = chunk.iter().filter(|m| m.role == Role::User).count();
            TimelineEntry {
                range: [start, start + chunk.len() - 1],
                user_messages,
                assistant_messages: chunk.len() - user_messages,
                first_timestamp: chunk.iter().find_map(|m| m.timestamp),
                last_timestamp: chunk.iter().rev().find_map(|m| m.timestamp),
            }
        })
        .collect()
}

/// Collapse cognitive days into at most `max_phases` contiguous phases by
/// repeatedly merging the smallest adjacent pair. Keywords are the most
/// frequent tokens inside each phase.
pub fn macro_timeline(
    corpus: &Corpus,
    days: &[CognitiveDay],
    max_phases: usize,
) -> Vec<MacroPhase> {
    if corpus.is_empty() {
        return Vec::new();
    }
    let max_phases = max_phases.max(1);

    let mut ranges: Vec<[usize; 2]> = if days.is_empty() {
        vec![[0, corpus.len() - 1]]
    } else {
        days.iter().map(|d| d.range).collect()
    };

    while ranges.len() > max_phases {
        let Some(i) = (0..ranges.len() - 1).min_by_key(|&i| ranges[i + 1][1] - ranges[i][0]) else {
            break;
        };
        ranges[i][1] = ranges[i + 1][1];
        ranges.remove(i + 1);
    }

    ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| MacroPhase {
            phase: i + 1,
            range,
            message_count: range[1] - range[0] + 1,
            keywords: top_terms(corpus.range(range[0], range[1]), PHASE_KEYWORDS),
        })
        .collect()
}
