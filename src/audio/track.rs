use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Sections ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Intro,
    Verse,
    Chorus,
    Breakdown,
    Drop,
    Bridge,
    Outro,
}

impl SectionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "intro" => Some(SectionKind::Intro),
            "verse" | "verses" => Some(SectionKind::Verse),
            "chorus" | "choruses" => Some(SectionKind::Chorus),
            "breakdown" | "breakdowns" => Some(SectionKind::Breakdown),
            "drop" | "drops" => Some(SectionKind::Drop),
            "bridge" | "bridges" => Some(SectionKind::Bridge),
            "outro" => Some(SectionKind::Outro),
            _ => None,
        }
    }
}

/// Half-open `[start, end)` span in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub start: f64,
    pub end: f64,
}

impl Section {
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && start >= 0.0 && end > start {
            Some(Section { start, end })
        } else {
            None
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    fn overlaps(&self, other: &Section) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Validated section layout of a track.
///
/// Sections never overlap and always lie within the track's duration when one is known.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackStructure {
    pub intro: Option<Section>,
    pub outro: Option<Section>,
    pub verses: Vec<Section>,
    pub choruses: Vec<Section>,
    pub breakdowns: Vec<Section>,
    pub drops: Vec<Section>,
    pub bridges: Vec<Section>,
}

impl TrackStructure {
    /// Builds a structure from candidate sections, dropping anything invalid,
    /// out of range or overlapping an earlier-starting section.
    pub fn from_sections<I>(sections: I, duration_seconds: Option<f64>) -> Self
    where
        I: IntoIterator<Item = (SectionKind, Section)>,
    {
        let mut candidates: Vec<(SectionKind, Section)> = sections
            .into_iter()
            .filter(|(kind, section)| {
                let in_range = Section::new(section.start, section.end).is_some()
                    && duration_seconds.is_none_or(|d| section.end <= d);
                if !in_range {
                    log::debug!(
                        "Track structure: dropping {:?} section [{}, {}) outside track bounds",
                        kind,
                        section.start,
                        section.end
                    );
                }
                in_range
            })
            .collect();
        candidates.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));

        let mut accepted: Vec<(SectionKind, Section)> = Vec::with_capacity(candidates.len());
        for (kind, section) in candidates {
            if accepted.iter().any(|(_, kept)| kept.overlaps(&section)) {
                log::debug!(
                    "Track structure: dropping overlapping {:?} section [{}, {})",
                    kind,
                    section.start,
                    section.end
                );
                continue;
            }
            accepted.push((kind, section));
        }

        let mut structure = TrackStructure::default();
        for (kind, section) in accepted {
            match kind {
                SectionKind::Intro => {
                    // Only the earliest intro counts
                    if structure.intro.is_none() {
                        structure.intro = Some(section);
                    }
                }
                // Sorted by start, so the last outro wins
                SectionKind::Outro => structure.outro = Some(section),
                SectionKind::Verse => structure.verses.push(section),
                SectionKind::Chorus => structure.choruses.push(section),
                SectionKind::Breakdown => structure.breakdowns.push(section),
                SectionKind::Drop => structure.drops.push(section),
                SectionKind::Bridge => structure.bridges.push(section),
            }
        }
        structure
    }

    /// Parses a loosely-typed catalog map such as
    /// `{"intro": [0, 16], "chorus": [[30, 45], {"start": 90, "end": 105}]}`.
    pub fn from_raw(raw: &Value, duration_seconds: Option<f64>) -> Self {
        let Some(map) = raw.as_object() else {
            return TrackStructure::default();
        };
        let mut sections = Vec::new();
        for (name, value) in map {
            let Some(kind) = SectionKind::from_name(name) else {
                log::debug!("Track structure: ignoring unknown section '{}'", name);
                continue;
            };
            collect_raw_sections(kind, value, &mut sections);
        }
        Self::from_sections(sections, duration_seconds)
    }

    pub fn is_empty(&self) -> bool {
        self.intro.is_none()
            && self.outro.is_none()
            && self.verses.is_empty()
            && self.choruses.is_empty()
            && self.breakdowns.is_empty()
            && self.drops.is_empty()
            && self.bridges.is_empty()
    }

    /// All sections ordered by start time.
    pub fn sections(&self) -> Vec<(SectionKind, Section)> {
        let mut all: Vec<(SectionKind, Section)> = Vec::new();
        all.extend(self.intro.map(|s| (SectionKind::Intro, s)));
        all.extend(self.verses.iter().map(|s| (SectionKind::Verse, *s)));
        all.extend(self.choruses.iter().map(|s| (SectionKind::Chorus, *s)));
        all.extend(self.breakdowns.iter().map(|s| (SectionKind::Breakdown, *s)));
        all.extend(self.drops.iter().map(|s| (SectionKind::Drop, *s)));
        all.extend(self.bridges.iter().map(|s| (SectionKind::Bridge, *s)));
        all.extend(self.outro.map(|s| (SectionKind::Outro, s)));
        all.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
        all
    }
}

fn collect_raw_sections(kind: SectionKind, value: &Value, out: &mut Vec<(SectionKind, Section)>) {
    if let Some(section) = raw_section(value) {
        out.push((kind, section));
        return;
    }
    if let Some(items) = value.as_array() {
        for item in items {
            match raw_section(item) {
                Some(section) => out.push((kind, section)),
                None => log::debug!("Track structure: malformed {:?} entry {}", kind, item),
            }
        }
    }
}

fn raw_section(value: &Value) -> Option<Section> {
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            let start = lenient_number(Some(&pair[0]))?;
            let end = lenient_number(Some(&pair[1]))?;
            Some(Section { start, end })
        }
        Value::Object(map) => {
            let start = lenient_number(map.get("start"))?;
            let end = lenient_number(map.get("end"))?;
            Some(Section { start, end })
        }
        _ => None,
    }
}

/// Numbers and numeric strings; everything else (and non-finite values) reads as absent.
fn lenient_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn lenient_text(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// --- Track ---

/// Immutable metadata snapshot of a catalog track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "TrackRecord")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub bpm: Option<f64>,
    pub musical_key: Option<String>,
    pub camelot_key: Option<String>,
    pub energy: Option<u8>,
    pub genre: Option<String>,
    pub sub_genre: Option<String>,
    pub duration_seconds: Option<f64>,
    pub first_beat_seconds: Option<f64>,
    pub structure: TrackStructure,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Track {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            bpm: None,
            musical_key: None,
            camelot_key: None,
            energy: None,
            genre: None,
            sub_genre: None,
            duration_seconds: None,
            first_beat_seconds: None,
            structure: TrackStructure::default(),
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = valid_bpm(bpm);
        self
    }

    pub fn with_camelot_key(mut self, key: impl Into<String>) -> Self {
        self.camelot_key = Some(key.into());
        self
    }

    pub fn with_musical_key(mut self, key: impl Into<String>) -> Self {
        self.musical_key = Some(key.into());
        self
    }

    pub fn with_energy(mut self, energy: u8) -> Self {
        self.energy = (1..=10).contains(&energy).then_some(energy);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>, sub_genre: Option<&str>) -> Self {
        self.genre = Some(genre.into());
        self.sub_genre = sub_genre.map(str::to_string);
        self
    }

    /// Sets the duration and re-validates any structure already attached.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = (seconds.is_finite() && seconds > 0.0).then_some(seconds);
        self.structure =
            TrackStructure::from_sections(self.structure.sections(), self.duration_seconds);
        self
    }

    pub fn with_first_beat(mut self, seconds: f64) -> Self {
        self.first_beat_seconds = (seconds.is_finite() && seconds >= 0.0).then_some(seconds);
        self
    }

    pub fn with_sections<I>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = (SectionKind, Section)>,
    {
        self.structure = TrackStructure::from_sections(sections, self.duration_seconds);
        self
    }
}

fn valid_bpm(bpm: f64) -> Option<f64> {
    (bpm.is_finite() && bpm > 0.0).then_some(bpm)
}

/// Catalog record as stored upstream, before validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackRecord {
    id: String,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    artist: Option<Value>,
    #[serde(default)]
    bpm: Option<Value>,
    #[serde(default)]
    musical_key: Option<Value>,
    #[serde(default)]
    camelot_key: Option<Value>,
    #[serde(default)]
    energy: Option<Value>,
    #[serde(default)]
    genre: Option<Value>,
    #[serde(default)]
    sub_genre: Option<Value>,
    #[serde(default)]
    duration_seconds: Option<Value>,
    #[serde(default)]
    first_beat_seconds: Option<Value>,
    #[serde(default)]
    structure: Option<Value>,
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        let duration_seconds =
            lenient_number(record.duration_seconds.as_ref()).filter(|d| *d > 0.0);
        let energy = lenient_number(record.energy.as_ref())
            .map(f64::round)
            .filter(|e| (1.0..=10.0).contains(e))
            .map(|e| e as u8);
        let structure = record
            .structure
            .as_ref()
            .map(|raw| TrackStructure::from_raw(raw, duration_seconds))
            .unwrap_or_default();

        Track {
            id: record.id,
            title: lenient_text(record.title.as_ref()).unwrap_or_default(),
            artist: lenient_text(record.artist.as_ref()).unwrap_or_default(),
            bpm: lenient_number(record.bpm.as_ref()).and_then(valid_bpm),
            musical_key: lenient_text(record.musical_key.as_ref()),
            camelot_key: lenient_text(record.camelot_key.as_ref()),
            energy,
            genre: lenient_text(record.genre.as_ref()),
            sub_genre: lenient_text(record.sub_genre.as_ref()),
            duration_seconds,
            first_beat_seconds: lenient_number(record.first_beat_seconds.as_ref())
                .filter(|s| *s >= 0.0),
            structure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(start: f64, end: f64) -> Section {
        Section { start, end }
    }

    #[test]
    fn test_lenient_record_ingestion() {
        let track: Track = serde_json::from_value(json!({
            "id": "t1",
            "title": "Night Drive",
            "bpm": "124.5",
            "camelotKey": "8A",
            "energy": 14,
            "genre": 7,
            "durationSeconds": 200
        }))
        .unwrap();

        assert_eq!(track.id, "t1");
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.artist, "");
        assert_eq!(track.bpm, Some(124.5));
        assert_eq!(track.camelot_key.as_deref(), Some("8A"));
        assert_eq!(track.energy, None, "energy outside 1-10 is absent");
        assert_eq!(track.genre, None, "non-string genre is absent");
        assert_eq!(track.duration_seconds, Some(200.0));
    }

    #[test]
    fn test_non_numeric_and_negative_bpm_are_absent() {
        let words: Track = serde_json::from_value(json!({ "id": "a", "bpm": "fast" })).unwrap();
        let negative: Track = serde_json::from_value(json!({ "id": "b", "bpm": -120 })).unwrap();
        assert_eq!(words.bpm, None);
        assert_eq!(negative.bpm, None);
    }

    #[test]
    fn test_structure_accepts_pairs_objects_and_lists() {
        let track: Track = serde_json::from_value(json!({
            "id": "t2",
            "durationSeconds": 180,
            "structure": {
                "intro": [0, 16],
                "chorus": [[30, 45], { "start": 90, "end": 105 }],
                "outro": { "start": 150, "end": 180 },
                "mystery": [1, 2]
            }
        }))
        .unwrap();

        assert_eq!(track.structure.intro, Some(section(0.0, 16.0)));
        assert_eq!(track.structure.choruses, vec![section(30.0, 45.0), section(90.0, 105.0)]);
        assert_eq!(track.structure.outro, Some(section(150.0, 180.0)));
    }

    #[test]
    fn test_invalid_sections_are_dropped() {
        let structure = TrackStructure::from_sections(
            [
                (SectionKind::Intro, section(0.0, 16.0)),
                // overlaps the intro
                (SectionKind::Verse, section(10.0, 40.0)),
                // negative length
                (SectionKind::Chorus, section(60.0, 50.0)),
                // beyond duration
                (SectionKind::Outro, section(170.0, 200.0)),
                (SectionKind::Breakdown, section(100.0, 120.0)),
                (SectionKind::Drop, section(f64::NAN, 130.0)),
            ],
            Some(180.0),
        );

        assert_eq!(structure.intro, Some(section(0.0, 16.0)));
        assert!(structure.verses.is_empty());
        assert!(structure.choruses.is_empty());
        assert_eq!(structure.outro, None);
        assert_eq!(structure.breakdowns, vec![section(100.0, 120.0)]);
        assert!(structure.drops.is_empty());
    }

    #[test]
    fn test_sections_are_non_overlapping_and_ordered() {
        let structure = TrackStructure::from_sections(
            [
                (SectionKind::Chorus, section(60.0, 90.0)),
                (SectionKind::Verse, section(20.0, 60.0)),
                (SectionKind::Drop, section(80.0, 100.0)),
                (SectionKind::Intro, section(0.0, 20.0)),
            ],
            None,
        );
        let sections = structure.sections();
        assert_eq!(sections.len(), 3);
        for pair in sections.windows(2) {
            assert!(pair[0].1.end <= pair[1].1.start);
        }
        assert_eq!(sections[0].0, SectionKind::Intro);
    }

    #[test]
    fn test_with_duration_revalidates_structure() {
        let track = Track::new("t3", "Loop", "Someone")
            .with_sections([(SectionKind::Outro, section(150.0, 200.0))])
            .with_duration(180.0);
        assert!(track.structure.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let track = Track::new("t4", "", "").with_bpm(0.0).with_energy(11).with_first_beat(-1.0);
        assert_eq!(track.bpm, None);
        assert_eq!(track.energy, None);
        assert_eq!(track.first_beat_seconds, None);
    }
}
