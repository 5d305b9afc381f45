use serde::{Deserialize, Serialize};

use crate::audio::analysis::beat_grid::BeatGrid;
use crate::audio::analysis::compatibility::{self, CamelotKey, ScoredTrack};
use crate::audio::config::AutoMixConfig;
use crate::audio::track::{SectionKind, Track};
use crate::audio::types::CurveStyle;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TransitionStyle {
    HarmonicBlend,
    EchoOut,
    EnergyBoost,
    QuickCut,
}

impl TransitionStyle {
    /// Ordering from the gentlest (0) to the most abrupt transition.
    pub fn harshness(self) -> u8 {
        match self {
            TransitionStyle::HarmonicBlend => 0,
            TransitionStyle::EchoOut => 1,
            TransitionStyle::EnergyBoost => 2,
            TransitionStyle::QuickCut => 3,
        }
    }

    pub fn curve_style(self) -> CurveStyle {
        match self {
            TransitionStyle::HarmonicBlend => CurveStyle::Smooth,
            TransitionStyle::EchoOut => CurveStyle::Linear,
            TransitionStyle::EnergyBoost => CurveStyle::Fast,
            TransitionStyle::QuickCut => CurveStyle::Fast,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RequestedStyle {
    #[default]
    Auto,
    Fixed(TransitionStyle),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum MixingIntensity {
    Smooth,
    #[default]
    Balanced,
    Energetic,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPlan {
    pub style: TransitionStyle,
    pub duration_seconds: f64,
    /// Where the incoming track starts playing.
    pub entry_point_seconds: f64,
    pub curve_style: CurveStyle,
    /// Playhead on the outgoing track at which the transition should begin.
    pub trigger_seconds: Option<f64>,
    pub score: u8,
}

/// Pair facts the style heuristic looks at besides the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleContext {
    /// At least one of key or tempo is known on both tracks.
    pub has_comparable_data: bool,
    /// Both tempos known and neither directly nor double/half-time compatible.
    pub tempo_clash: bool,
    /// Incoming energy minus outgoing energy.
    pub energy_delta: Option<i16>,
    pub long_tail: bool,
}

pub struct TransitionPlanner {
    config: AutoMixConfig,
}

impl TransitionPlanner {
    pub fn new(config: AutoMixConfig) -> Self {
        TransitionPlanner {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &AutoMixConfig {
        &self.config
    }

    /// Tracks that mix with `seed` at all, for general listings.
    pub fn compatible_tracks(&self, seed: &Track, candidates: &[Track], limit: usize) -> Vec<ScoredTrack> {
        compatibility::rank_compatible(seed, candidates, limit, self.config.compatible_min_score)
    }

    /// Stricter cut of `compatible_tracks` used when filling the auto-mix queue.
    pub fn queue_candidates(&self, seed: &Track, candidates: &[Track], limit: usize) -> Vec<ScoredTrack> {
        compatibility::rank_compatible(seed, candidates, limit, self.config.auto_queue_min_score)
    }

    pub fn plan(
        &self,
        current: &Track,
        incoming: &Track,
        requested: RequestedStyle,
        intensity: MixingIntensity,
    ) -> TransitionPlan {
        let score = compatibility::score(current, incoming);
        let style = match requested {
            RequestedStyle::Auto => self.choose_style(score, &self.style_context(current, incoming)),
            RequestedStyle::Fixed(style) => style,
        };
        let duration_seconds = self.transition_duration(style, intensity, current);
        let plan = TransitionPlan {
            style,
            duration_seconds,
            entry_point_seconds: self.entry_point(incoming),
            curve_style: style.curve_style(),
            trigger_seconds: self.trigger_time(current, duration_seconds),
            score,
        };
        log::debug!(
            "Planner: '{}' -> '{}' score {} => {:?} over {:.1}s, entry {:.1}s, trigger {:?}",
            current.id,
            incoming.id,
            score,
            plan.style,
            plan.duration_seconds,
            plan.entry_point_seconds,
            plan.trigger_seconds
        );
        plan
    }

    /// Plan for an immediate cut to `incoming`, used when skipping with nothing armed.
    pub fn cut_plan(&self, current: Option<&Track>, incoming: &Track) -> TransitionPlan {
        TransitionPlan {
            style: TransitionStyle::QuickCut,
            duration_seconds: self.config.min_transition_seconds,
            entry_point_seconds: self.entry_point(incoming),
            curve_style: TransitionStyle::QuickCut.curve_style(),
            trigger_seconds: None,
            score: current.map_or(0, |current| compatibility::score(current, incoming)),
        }
    }

    pub fn style_context(&self, current: &Track, incoming: &Track) -> StyleContext {
        let keys_known = current
            .camelot_key
            .as_deref()
            .and_then(CamelotKey::parse)
            .zip(incoming.camelot_key.as_deref().and_then(CamelotKey::parse))
            .is_some();
        let tempos = current.bpm.zip(incoming.bpm);
        let long_tail = current
            .structure
            .outro
            .is_some_and(|outro| outro.length() >= self.config.long_tail_seconds)
            || incoming
                .structure
                .intro
                .is_some_and(|intro| intro.length() >= self.config.long_tail_seconds);

        StyleContext {
            has_comparable_data: keys_known || tempos.is_some(),
            tempo_clash: tempos.is_some_and(|(a, b)| !compatibility::tempo_compatible(a, b)),
            energy_delta: current
                .energy
                .zip(incoming.energy)
                .map(|(from, to)| to as i16 - from as i16),
            long_tail,
        }
    }

    /// Picks a style for `score`. Raising the score never yields a harsher style.
    pub fn choose_style(&self, score: u8, context: &StyleContext) -> TransitionStyle {
        let config = &self.config;
        if !context.has_comparable_data || score < config.quick_cut_below_score || context.tempo_clash {
            return TransitionStyle::QuickCut;
        }
        if context
            .energy_delta
            .is_some_and(|delta| delta >= config.energy_boost_min_jump as i16)
        {
            return TransitionStyle::EnergyBoost;
        }
        let similar_energy = context
            .energy_delta
            .is_none_or(|delta| delta.unsigned_abs() <= config.similar_energy_max_diff as u16);
        if score >= config.blend_min_score && similar_energy {
            return TransitionStyle::HarmonicBlend;
        }
        if context.long_tail {
            return TransitionStyle::EchoOut;
        }
        if score >= config.blend_fallback_min_score {
            return TransitionStyle::HarmonicBlend;
        }
        TransitionStyle::QuickCut
    }

    pub fn transition_duration(&self, style: TransitionStyle, intensity: MixingIntensity, current: &Track) -> f64 {
        let range = self.config.duration_range(intensity);
        let seconds = match style {
            TransitionStyle::HarmonicBlend => range.max,
            TransitionStyle::EnergyBoost => range.min,
            TransitionStyle::EchoOut => current
                .structure
                .outro
                .map_or(range.max, |outro| outro.length().min(range.max)),
            TransitionStyle::QuickCut => (range.min / 2.0).min(self.config.quick_cut_max_seconds),
        };
        seconds.clamp(self.config.min_transition_seconds, self.config.max_transition_seconds)
    }

    /// First musical section after the intro, or the top of the track.
    pub fn entry_point(&self, incoming: &Track) -> f64 {
        let structure = &incoming.structure;
        let intro_end = structure.intro.map_or(0.0, |intro| intro.end);
        structure
            .sections()
            .into_iter()
            .filter(|(kind, _)| !matches!(kind, SectionKind::Intro | SectionKind::Outro))
            .map(|(_, section)| section.start)
            .find(|start| *start >= intro_end)
            .filter(|start| incoming.duration_seconds.is_none_or(|duration| *start < duration))
            .unwrap_or(0.0)
    }

    /// Playhead on `current` at which a transition of `transition_seconds` should start.
    ///
    /// `None` when neither the duration nor an outro is known.
    pub fn trigger_time(&self, current: &Track, transition_seconds: f64) -> Option<f64> {
        let structure = &current.structure;
        let trigger = match current.duration_seconds {
            Some(duration) => {
                let latest = (duration - transition_seconds).max(0.0);
                let exit_section = structure.outro.or_else(|| {
                    structure
                        .breakdowns
                        .iter()
                        .rev()
                        .find(|breakdown| breakdown.start >= duration / 2.0)
                        .copied()
                });
                exit_section.map_or(latest, |section| section.start.min(latest))
            }
            None => structure.outro?.start,
        };

        Some(match BeatGrid::for_track(current) {
            Some(grid) => grid.bar_at_or_before(trigger),
            None => trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::crossfade;
    use crate::audio::track::Section;

    fn planner() -> TransitionPlanner {
        TransitionPlanner::new(AutoMixConfig::default())
    }

    fn section(kind: SectionKind, start: f64, end: f64) -> (SectionKind, Section) {
        (kind, Section::new(start, end).unwrap())
    }

    fn full_track(id: &str) -> Track {
        Track::new(id, "Title", "Artist")
            .with_bpm(124.0)
            .with_camelot_key("8A")
            .with_energy(6)
            .with_genre("House", Some("Deep House"))
            .with_duration(300.0)
    }

    fn context() -> StyleContext {
        StyleContext {
            has_comparable_data: true,
            tempo_clash: false,
            energy_delta: Some(0),
            long_tail: false,
        }
    }

    #[test]
    fn test_trigger_from_duration() {
        let track = Track::new("t", "T", "A").with_duration(180.0);
        assert_eq!(planner().trigger_time(&track, 20.0), Some(160.0));
    }

    #[test]
    fn test_trigger_moves_to_outro() {
        let track = Track::new("t", "T", "A")
            .with_duration(180.0)
            .with_sections([section(SectionKind::Outro, 150.0, 180.0)]);
        assert_eq!(planner().trigger_time(&track, 20.0), Some(150.0));

        // A late outro never delays the trigger past duration - transition
        let late = Track::new("t", "T", "A")
            .with_duration(180.0)
            .with_sections([section(SectionKind::Outro, 170.0, 180.0)]);
        assert_eq!(planner().trigger_time(&late, 20.0), Some(160.0));
    }

    #[test]
    fn test_trigger_uses_late_breakdown_without_outro() {
        let track = Track::new("t", "T", "A").with_duration(200.0).with_sections([
            section(SectionKind::Breakdown, 40.0, 60.0),
            section(SectionKind::Breakdown, 140.0, 160.0),
        ]);
        assert_eq!(planner().trigger_time(&track, 16.0), Some(140.0));

        let early_only = Track::new("t", "T", "A")
            .with_duration(200.0)
            .with_sections([section(SectionKind::Breakdown, 40.0, 60.0)]);
        assert_eq!(planner().trigger_time(&early_only, 16.0), Some(184.0));
    }

    #[test]
    fn test_trigger_snaps_to_bar() {
        // 120 bpm: two-second bars starting at 0.5s
        let track = Track::new("t", "T", "A")
            .with_duration(180.0)
            .with_bpm(120.0)
            .with_first_beat(0.5);
        assert_eq!(planner().trigger_time(&track, 20.0), Some(158.5));
    }

    #[test]
    fn test_trigger_without_duration() {
        let bare = Track::new("t", "T", "A");
        assert_eq!(planner().trigger_time(&bare, 20.0), None);

        let with_outro = bare.with_sections([section(SectionKind::Outro, 200.0, 230.0)]);
        assert_eq!(planner().trigger_time(&with_outro, 20.0), Some(200.0));
    }

    #[test]
    fn test_trigger_never_negative() {
        let short = Track::new("t", "T", "A").with_duration(10.0);
        assert_eq!(planner().trigger_time(&short, 24.0), Some(0.0));
    }

    #[test]
    fn test_entry_point_skips_intro() {
        let planner = planner();
        let incoming = Track::new("n", "N", "A").with_duration(240.0).with_sections([
            section(SectionKind::Intro, 0.0, 32.0),
            section(SectionKind::Verse, 32.0, 64.0),
            section(SectionKind::Chorus, 64.0, 96.0),
        ]);
        assert_eq!(planner.entry_point(&incoming), 32.0);

        let no_structure = Track::new("n", "N", "A");
        assert_eq!(planner.entry_point(&no_structure), 0.0);

        let intro_only = Track::new("n", "N", "A")
            .with_sections([section(SectionKind::Intro, 0.0, 16.0)]);
        assert_eq!(planner.entry_point(&intro_only), 0.0);
    }

    #[test]
    fn test_choose_style_fallbacks() {
        let planner = planner();
        let no_data = StyleContext {
            has_comparable_data: false,
            ..context()
        };
        assert_eq!(planner.choose_style(100, &no_data), TransitionStyle::QuickCut);

        let clash = StyleContext {
            tempo_clash: true,
            ..context()
        };
        assert_eq!(planner.choose_style(90, &clash), TransitionStyle::QuickCut);
        assert_eq!(planner.choose_style(39, &context()), TransitionStyle::QuickCut);
        assert_eq!(planner.choose_style(45, &context()), TransitionStyle::QuickCut);
    }

    #[test]
    fn test_choose_style_rules() {
        let planner = planner();
        let boost = StyleContext {
            energy_delta: Some(3),
            ..context()
        };
        assert_eq!(planner.choose_style(80, &boost), TransitionStyle::EnergyBoost);

        assert_eq!(planner.choose_style(75, &context()), TransitionStyle::HarmonicBlend);
        assert_eq!(planner.choose_style(60, &context()), TransitionStyle::HarmonicBlend);

        let tail = StyleContext {
            long_tail: true,
            ..context()
        };
        assert_eq!(planner.choose_style(60, &tail), TransitionStyle::EchoOut);
        assert_eq!(planner.choose_style(75, &tail), TransitionStyle::HarmonicBlend);

        // Energy dropping sharply is not "similar", so a high score does not force a blend
        let drop = StyleContext {
            energy_delta: Some(-4),
            long_tail: true,
            ..context()
        };
        assert_eq!(planner.choose_style(90, &drop), TransitionStyle::EchoOut);
    }

    #[test]
    fn test_style_is_monotonic_in_score() {
        let planner = planner();
        let contexts = [
            context(),
            StyleContext {
                long_tail: true,
                ..context()
            },
            StyleContext {
                energy_delta: Some(5),
                ..context()
            },
            StyleContext {
                energy_delta: Some(-5),
                ..context()
            },
            StyleContext {
                energy_delta: None,
                long_tail: true,
                ..context()
            },
            StyleContext {
                has_comparable_data: false,
                ..context()
            },
        ];
        for ctx in contexts {
            let mut previous = TransitionStyle::QuickCut.harshness();
            for score in 0..=100u8 {
                let harshness = planner.choose_style(score, &ctx).harshness();
                assert!(
                    harshness <= previous,
                    "score {} got harsher ({} > {}) for {:?}",
                    score,
                    harshness,
                    previous,
                    ctx
                );
                previous = harshness;
            }
        }
    }

    #[test]
    fn test_durations_per_style_and_intensity() {
        let planner = planner();
        let track = full_track("a");
        let d = |style, intensity| planner.transition_duration(style, intensity, &track);

        assert_eq!(d(TransitionStyle::HarmonicBlend, MixingIntensity::Smooth), 32.0);
        assert_eq!(d(TransitionStyle::HarmonicBlend, MixingIntensity::Balanced), 24.0);
        assert_eq!(d(TransitionStyle::EnergyBoost, MixingIntensity::Energetic), 8.0);
        assert_eq!(d(TransitionStyle::EchoOut, MixingIntensity::Balanced), 24.0);
        assert_eq!(d(TransitionStyle::QuickCut, MixingIntensity::Smooth), 8.0);
        assert_eq!(d(TransitionStyle::QuickCut, MixingIntensity::Energetic), 4.0);

        let short_outro = full_track("b").with_sections([section(SectionKind::Outro, 290.0, 300.0)]);
        assert_eq!(
            planner.transition_duration(TransitionStyle::EchoOut, MixingIntensity::Smooth, &short_outro),
            10.0
        );
    }

    #[test]
    fn test_durations_are_bounded() {
        let config = AutoMixConfig {
            smooth_duration: crate::audio::config::DurationRange { min: 40.0, max: 60.0 },
            ..AutoMixConfig::default()
        };
        let planner = TransitionPlanner::new(config);
        let track = Track::new("t", "T", "A");
        for style in [
            TransitionStyle::HarmonicBlend,
            TransitionStyle::EchoOut,
            TransitionStyle::EnergyBoost,
            TransitionStyle::QuickCut,
        ] {
            let seconds = planner.transition_duration(style, MixingIntensity::Smooth, &track);
            assert!((4.0..=32.0).contains(&seconds), "{:?} gave {}", style, seconds);
        }
    }

    #[test]
    fn test_plan_for_matching_tracks() {
        let planner = planner();
        let current = full_track("a").with_sections([section(SectionKind::Outro, 270.0, 300.0)]);
        let incoming = full_track("b").with_sections([
            section(SectionKind::Intro, 0.0, 16.0),
            section(SectionKind::Drop, 16.0, 48.0),
        ]);
        let plan = planner.plan(&current, &incoming, RequestedStyle::Auto, MixingIntensity::Balanced);

        assert_eq!(plan.score, 100);
        assert_eq!(plan.style, TransitionStyle::HarmonicBlend);
        assert_eq!(plan.curve_style, CurveStyle::Smooth);
        assert_eq!(plan.duration_seconds, 24.0);
        assert_eq!(plan.entry_point_seconds, 16.0);
        assert_eq!(plan.trigger_seconds, Some(270.0));
    }

    #[test]
    fn test_plan_with_missing_metadata_falls_back_to_cut() {
        let planner = planner();
        let a = Track::new("a", "A", "A");
        let b = Track::new("b", "B", "B");
        let plan = planner.plan(&a, &b, RequestedStyle::Auto, MixingIntensity::Smooth);
        assert_eq!(plan.score, 0);
        assert_eq!(plan.style, TransitionStyle::QuickCut);
        assert_eq!(plan.curve_style, CurveStyle::Fast);
        assert_eq!(plan.trigger_seconds, None);
    }

    #[test]
    fn test_fixed_style_overrides_heuristic() {
        let planner = planner();
        let a = Track::new("a", "A", "A").with_duration(200.0);
        let b = Track::new("b", "B", "B");
        let plan = planner.plan(
            &a,
            &b,
            RequestedStyle::Fixed(TransitionStyle::EchoOut),
            MixingIntensity::Energetic,
        );
        assert_eq!(plan.style, TransitionStyle::EchoOut);
        assert_eq!(plan.curve_style, CurveStyle::Linear);
        assert_eq!(plan.duration_seconds, 16.0);
        assert_eq!(plan.trigger_seconds, Some(184.0));
    }

    #[test]
    fn test_every_style_keeps_a_deck_audible() {
        let steps = AutoMixConfig::default().curve_steps;
        for style in [
            TransitionStyle::HarmonicBlend,
            TransitionStyle::EchoOut,
            TransitionStyle::EnergyBoost,
            TransitionStyle::QuickCut,
        ] {
            for step in 0..=steps {
                let gains = crossfade::curve(step as f32 / steps as f32, style.curve_style());
                assert!(
                    gains.fade_out + gains.fade_in > 0.0,
                    "{:?} silent at step {}",
                    style,
                    step
                );
            }
        }
    }

    #[test]
    fn test_tempo_clash_context() {
        let planner = planner();
        let a = full_track("a").with_bpm(128.0);
        let b = full_track("b").with_bpm(100.0);
        let ctx = planner.style_context(&a, &b);
        assert!(ctx.tempo_clash);
        assert!(ctx.has_comparable_data);
        assert_eq!(ctx.energy_delta, Some(0));

        let plan = planner.plan(&a, &b, RequestedStyle::Auto, MixingIntensity::Balanced);
        assert_eq!(plan.style, TransitionStyle::QuickCut);
    }

    #[test]
    fn test_listing_and_queue_thresholds_differ() {
        let planner = planner();
        let seed = full_track("seed");
        // key 0, tempo 30, genre 0, energy 5: listed but not queued
        let borderline = Track::new("borderline", "B", "A")
            .with_bpm(124.0)
            .with_camelot_key("2B")
            .with_energy(1);
        let strong = full_track("strong");
        let candidates = vec![borderline, strong, full_track("seed")];

        let listed: Vec<_> = planner
            .compatible_tracks(&seed, &candidates, 10)
            .into_iter()
            .map(|scored| (scored.track.id, scored.score))
            .collect();
        assert_eq!(
            listed,
            vec![("strong".to_string(), 100), ("borderline".to_string(), 35)]
        );

        let queued = planner.queue_candidates(&seed, &candidates, 10);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].track.id, "strong");
    }
}
