//! Peak-current range check of a finished (or aborted) run.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    sequencer::Recording,
    types::{ChannelId, ChannelSpec, ExpectedRange, Verdict},
};

/// How many of the most recent current samples the peak is taken over.
pub const PEAK_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelOutcome {
    Measured {
        peak: f64,
        range: ExpectedRange,
        verdict: Verdict,
    },
    /// Nothing was sampled for this channel; always abnormal.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCheck {
    pub channel: ChannelId,
    pub outcome: ChannelOutcome,
}

impl ChannelCheck {
    pub fn verdict(&self) -> Verdict {
        match self.outcome {
            ChannelOutcome::Measured { verdict, .. } => verdict,
            ChannelOutcome::NoData => Verdict::Abnormal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeReport {
    /// In plan order.
    pub channels: Vec<ChannelCheck>,
}

impl RangeReport {
    /// Normal only if every channel is normal.
    pub fn overall(&self) -> Verdict {
        match self.channels.iter().all(|c| c.verdict().is_normal()) {
            true => Verdict::Normal,
            false => Verdict::Abnormal,
        }
    }
}

/// Largest of the last [PEAK_WINDOW] samples, `None` when there are none.
pub fn settled_peak(samples: &[f64]) -> Option<f64> {
    let window = &samples[samples.len().saturating_sub(PEAK_WINDOW)..];
    window.iter().copied().reduce(f64::max)
}

pub fn classify(peak: f64, range: ExpectedRange) -> Verdict {
    match range.contains(peak) {
        true => Verdict::Normal,
        false => Verdict::Abnormal,
    }
}

/// Check every channel of `plan` against its expected range.
///
/// Channels missing from `ranges` are checked against [ExpectedRange::PERMISSIVE].
/// A channel listed more than once in `plan` is reported once.
pub fn check_ranges(
    plan: &[ChannelSpec],
    recording: &Recording,
    ranges: &BTreeMap<ChannelId, ExpectedRange>,
) -> RangeReport {
    let mut seen = BTreeSet::new();
    let channels = plan
        .iter()
        .filter(|spec| seen.insert(spec.channel))
        .map(|spec| {
            let peak = recording
                .trace(spec.channel)
                .and_then(|trace| settled_peak(&trace.current));
            let outcome = match peak {
                Some(peak) => {
                    let range = ranges
                        .get(&spec.channel)
                        .copied()
                        .unwrap_or(ExpectedRange::PERMISSIVE);
                    let verdict = classify(peak, range);
                    if !verdict.is_normal() {
                        log::warn!(
                            "{} peak current {peak:.4} A outside {:.4}-{:.4} A",
                            spec.channel,
                            range.min,
                            range.max
                        );
                    }
                    ChannelOutcome::Measured {
                        peak,
                        range,
                        verdict,
                    }
                }
                None => {
                    log::warn!("{} has no current samples", spec.channel);
                    ChannelOutcome::NoData
                }
            };
            ChannelCheck {
                channel: spec.channel,
                outcome,
            }
        })
        .collect();
    RangeReport { channels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ChannelTrace;

    fn ch(n: u8) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    fn plan() -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::new(ch(1), 2.3, 0.5),
            ChannelSpec::new(ch(2), 1.6, 0.5),
            ChannelSpec::new(ch(3), 6.0, 1.0),
        ]
    }

    fn ranges() -> BTreeMap<ChannelId, ExpectedRange> {
        BTreeMap::from([
            (ch(1), ExpectedRange::new(0.15, 0.2)),
            (ch(2), ExpectedRange::new(0.0, 0.001)),
            (ch(3), ExpectedRange::new(0.25, 0.35)),
        ])
    }

    fn recording_with_currents(currents: &[(u8, Vec<f64>)]) -> Recording {
        let len = currents.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        Recording {
            timestamps: (0..len).map(|i| i as f64 * 0.1).collect(),
            channels: currents
                .iter()
                .map(|(n, current)| ChannelTrace {
                    channel: ch(*n),
                    voltage: vec![0.0; current.len()],
                    current: current.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn peak_uses_last_five_samples() {
        assert_eq!(settled_peak(&[9.0, 1.0, 2.0, 3.0, 4.0, 5.0]), Some(5.0));
        assert_eq!(settled_peak(&[0.3, 0.1]), Some(0.3));
        assert_eq!(settled_peak(&[]), None);
    }

    #[test]
    fn classification_is_boundary_inclusive() {
        let range = ExpectedRange::new(0.25, 0.35);
        let eps = 1e-6;
        assert_eq!(classify(0.25, range), Verdict::Normal);
        assert_eq!(classify(0.35, range), Verdict::Normal);
        assert_eq!(classify(0.25 - eps, range), Verdict::Abnormal);
        assert_eq!(classify(0.35 + eps, range), Verdict::Abnormal);
    }

    #[test]
    fn three_channel_example() {
        let recording = recording_with_currents(&[
            (1, vec![0.0, 0.17, 0.18]),
            (2, vec![0.0, 0.0004, 0.0005]),
            (3, vec![0.0, 0.38, 0.40]),
        ]);
        let report = check_ranges(&plan(), &recording, &ranges());

        let verdicts: Vec<Verdict> = report.channels.iter().map(ChannelCheck::verdict).collect();
        assert_eq!(verdicts, [Verdict::Normal, Verdict::Normal, Verdict::Abnormal]);
        assert_eq!(report.overall(), Verdict::Abnormal);
        assert_eq!(
            report.channels[2].outcome,
            ChannelOutcome::Measured {
                peak: 0.40,
                range: ExpectedRange::new(0.25, 0.35),
                verdict: Verdict::Abnormal
            }
        );
    }

    #[test]
    fn all_in_range_is_normal() {
        let recording = recording_with_currents(&[
            (1, vec![0.18]),
            (2, vec![0.0]),
            (3, vec![0.3]),
        ]);
        assert_eq!(
            check_ranges(&plan(), &recording, &ranges()).overall(),
            Verdict::Normal
        );
    }

    #[test]
    fn channel_without_samples_is_abnormal() {
        let recording = recording_with_currents(&[(1, vec![0.18]), (2, vec![]), (3, vec![0.3])]);
        let report = check_ranges(&plan(), &recording, &ranges());
        assert_eq!(report.channels[1].outcome, ChannelOutcome::NoData);
        assert_eq!(report.overall(), Verdict::Abnormal);
    }

    #[test]
    fn unranged_channel_uses_permissive_range() {
        let recording = recording_with_currents(&[(1, vec![2.5])]);
        let plan = [ChannelSpec::new(ch(1), 5.0, 3.0)];
        let report = check_ranges(&plan, &recording, &BTreeMap::new());
        assert_eq!(report.overall(), Verdict::Normal);
    }

    #[test]
    fn repeated_plan_channel_is_reported_once() {
        let recording = recording_with_currents(&[(1, vec![0.18]), (2, vec![0.0])]);
        let plan = [
            ChannelSpec::new(ch(1), 2.3, 0.5),
            ChannelSpec::new(ch(2), 1.6, 0.5),
            ChannelSpec::new(ch(1), 2.5, 0.5),
        ];
        let report = check_ranges(&plan, &recording, &ranges());
        let channels: Vec<ChannelId> = report.channels.iter().map(|c| c.channel).collect();
        assert_eq!(channels, [ch(1), ch(2)]);
        assert_eq!(report.overall(), Verdict::Normal);
    }
}
