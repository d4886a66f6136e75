// MusicXML encoding - one fixed-duration note-or-rest per step
// A JSON metadata blob inside direction/words carries everything the notation
// layer cannot: root note, row configs and the raw on/off flags

use crate::pitch::{pitch_class_from_name, Pitch};
use crate::score::ScoreError;
use crate::sequencer::pattern::{Pattern, RowConfig, MAX_ROWS};
use crate::sequencer::pools;
use crate::sequencer::timeline::{Tempo, TimeSignature};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The non-schema metadata blob embedded in the document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternMetadata {
    #[serde(rename = "rootNote")]
    root_note: String,
    #[serde(rename = "rootOctave")]
    root_octave: String,
    #[serde(rename = "rowData")]
    row_data: Vec<RowData>,
    #[serde(rename = "patternStateBase64")]
    pattern_state_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RowData {
    semitones: i8,
    #[serde(rename = "notePool")]
    note_pool: String,
}

/// Result of decoding an interchange document
#[derive(Debug)]
pub struct LoadedPattern {
    pub pattern: Pattern,
    /// Tempo hint from the document, when present and sane
    pub tempo: Option<Tempo>,
}

/// Spelling of a chromatic class as a MusicXML step letter plus alteration
const STEP_SPELLINGS: [(&str, i8); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

// --- Encoding ---

/// Encode a pattern as a MusicXML string
pub fn encode(pattern: &Pattern, tempo: Tempo) -> Result<String, ScoreError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut score = BytesStart::new("score-partwise");
    score.push_attribute(("version", "4.0"));
    writer.write_event(Event::Start(score))?;

    writer.write_event(Event::Start(BytesStart::new("part-list")))?;
    let mut score_part = BytesStart::new("score-part");
    score_part.push_attribute(("id", "P1"));
    writer.write_event(Event::Start(score_part))?;
    write_text_element(
        &mut writer,
        "part-name",
        &format!("Steps: {}", pattern.total_steps()),
    )?;
    writer.write_event(Event::End(BytesEnd::new("score-part")))?;
    writer.write_event(Event::End(BytesEnd::new("part-list")))?;

    let mut part = BytesStart::new("part");
    part.push_attribute(("id", "P1"));
    writer.write_event(Event::Start(part))?;

    // Metadata rides in a direction so notation software ignores it
    writer.write_event(Event::Start(BytesStart::new("direction")))?;
    writer.write_event(Event::Start(BytesStart::new("direction-type")))?;
    write_text_element(&mut writer, "words", &metadata_json(pattern)?)?;
    writer.write_event(Event::End(BytesEnd::new("direction-type")))?;
    writer.write_event(Event::End(BytesEnd::new("direction")))?;

    let row_length = pattern.steps_per_row();
    let ts = pattern.time_signature();
    for row in 0..pattern.num_rows() {
        let mut measure = BytesStart::new("measure");
        measure.push_attribute(("number", (row + 1).to_string().as_str()));
        writer.write_event(Event::Start(measure))?;

        if row == 0 {
            writer.write_event(Event::Start(BytesStart::new("attributes")))?;
            write_text_element(&mut writer, "divisions", "4")?;
            writer.write_event(Event::Start(BytesStart::new("time")))?;
            write_text_element(&mut writer, "beats", &ts.numerator.to_string())?;
            write_text_element(&mut writer, "beat-type", &ts.denominator.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("time")))?;
            writer.write_event(Event::End(BytesEnd::new("attributes")))?;

            let mut sound = BytesStart::new("sound");
            sound.push_attribute(("tempo", tempo.bpm().to_string().as_str()));
            writer.write_event(Event::Empty(sound))?;
        }

        for index in row * row_length..(row + 1) * row_length {
            write_step_note(&mut writer, pattern, index)?;
        }

        writer.write_event(Event::End(BytesEnd::new("measure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("part")))?;
    writer.write_event(Event::End(BytesEnd::new("score-partwise")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| ScoreError::InvalidFile(format!("non-UTF8 output: {}", e)))
}

fn metadata_json(pattern: &Pattern) -> Result<String, ScoreError> {
    let (class, octave) = pattern.root();
    let flags_json = serde_json::to_string(pattern.active_flags())?;

    let metadata = PatternMetadata {
        root_note: crate::pitch::PITCH_CLASS_NAMES[class as usize].to_string(),
        root_octave: octave.to_string(),
        row_data: pattern
            .rows()
            .iter()
            .map(|row| RowData {
                semitones: row.transpose_semitones,
                note_pool: row.pool.to_string(),
            })
            .collect(),
        pattern_state_base64: BASE64.encode(flags_json.as_bytes()),
    };

    Ok(serde_json::to_string(&metadata)?)
}

fn write_step_note(
    writer: &mut Writer<Vec<u8>>,
    pattern: &Pattern,
    index: usize,
) -> Result<(), ScoreError> {
    writer.write_event(Event::Start(BytesStart::new("note")))?;

    match pattern.pitch(index).filter(|_| pattern.is_active(index)) {
        Some(pitch) => {
            let (step, alter) = STEP_SPELLINGS[pitch.class() as usize];
            writer.write_event(Event::Start(BytesStart::new("pitch")))?;
            write_text_element(writer, "step", step)?;
            if alter != 0 {
                write_text_element(writer, "alter", &alter.to_string())?;
            }
            write_text_element(writer, "octave", &pitch.octave().to_string())?;
            writer.write_event(Event::End(BytesEnd::new("pitch")))?;
        }
        None => {
            writer.write_event(Event::Empty(BytesStart::new("rest")))?;
        }
    }

    write_text_element(writer, "duration", "1")?;
    write_text_element(writer, "type", "16th")?;
    writer.write_event(Event::End(BytesEnd::new("note")))?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), ScoreError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

// --- Decoding ---

/// One note-or-rest event as read from the document
#[derive(Debug, Default, Clone)]
struct RawNote {
    rest: bool,
    step: Option<String>,
    alter: i8,
    octave: Option<i32>,
}

impl RawNote {
    /// The encoded pitch, if the position carries a usable one
    fn pitch(&self) -> Option<Pitch> {
        let step = self.step.as_deref()?;
        let octave = self.octave?;
        let class = pitch_class_from_name(step).ok()? as i32 + self.alter as i32;
        Pitch::from_midi((octave + 1) * 12 + class).ok()
    }
}

#[derive(Debug, Default)]
struct RawDocument {
    beats: Option<String>,
    beat_type: Option<String>,
    tempo: Option<f64>,
    words: Option<String>,
    notes: Vec<RawNote>,
}

/// Decode a MusicXML string into a fresh pattern
///
/// The live model is never touched: callers swap in the returned pattern only
/// on success. A missing or malformed metadata blob falls back to rest-derived
/// flags and regenerated pitches; a malformed document is one `InvalidFile`.
pub fn decode<R: Rng + ?Sized>(xml: &str, rng: &mut R) -> Result<LoadedPattern, ScoreError> {
    let doc = parse_document(xml)?;

    if doc.notes.is_empty() {
        return Err(ScoreError::InvalidFile("document contains no steps".into()));
    }

    let ts = match (&doc.beats, &doc.beat_type) {
        (Some(beats), Some(beat_type)) => {
            let numerator: u8 = beats
                .trim()
                .parse()
                .map_err(|_| ScoreError::InvalidFile(format!("bad beats value '{}'", beats)))?;
            let denominator: u8 = beat_type.trim().parse().map_err(|_| {
                ScoreError::InvalidFile(format!("bad beat-type value '{}'", beat_type))
            })?;
            TimeSignature::try_new(numerator, denominator).ok_or_else(|| {
                ScoreError::InvalidFile(format!(
                    "unsupported time signature {}/{}",
                    numerator, denominator
                ))
            })?
        }
        _ => TimeSignature::default(),
    };

    let row_length = ts.steps_per_row();
    let num_rows = doc.notes.len().div_ceil(row_length).clamp(1, MAX_ROWS);
    let mut pattern = Pattern::new(ts, num_rows);

    // The metadata blob is best-effort: any parse failure just drops it
    let metadata: Option<PatternMetadata> = doc
        .words
        .as_deref()
        .and_then(|words| serde_json::from_str(words).ok());

    if let Some(meta) = &metadata {
        for (row, data) in meta.row_data.iter().take(num_rows).enumerate() {
            let config = RowConfig {
                transpose_semitones: data.semitones.clamp(-12, 12),
                pool: pools::lookup_or_default(&data.note_pool).id,
            };
            // Row index is bounded by take(num_rows)
            let _ = pattern.set_row_config(row, config);
        }
        if let (Ok(class), Ok(octave)) = (
            pitch_class_from_name(&meta.root_note),
            meta.root_octave.trim().parse::<i8>(),
        ) {
            pattern.set_root(class, octave, rng);
        }
    }

    let flags = metadata
        .as_ref()
        .and_then(|meta| decode_flags(&meta.pattern_state_base64));

    for (index, raw) in doc.notes.iter().enumerate().take(pattern.total_steps()) {
        let active = flags
            .as_ref()
            .and_then(|f| f.get(index).copied())
            .unwrap_or(!raw.rest);
        // Index is bounded by take(total_steps)
        let _ = pattern.set_step(index, active, raw.pitch());
    }

    // Active steps the document gave no usable pitch fall back to the generator
    for index in 0..pattern.total_steps() {
        if pattern.is_active(index) && pattern.pitch(index).is_none() {
            pattern.generate_step(index, rng);
        }
    }

    Ok(LoadedPattern {
        pattern,
        tempo: doc.tempo.map(Tempo::clamped),
    })
}

fn decode_flags(encoded: &str) -> Option<Vec<bool>> {
    let bytes = BASE64.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn parse_document(xml: &str) -> Result<RawDocument, ScoreError> {
    let mut reader = Reader::from_str(xml);
    let mut doc = RawDocument::default();
    let mut current_note: Option<RawNote> = None;
    let mut text_target: Option<Vec<u8>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ScoreError::InvalidFile(format!("XML parse error: {}", e)))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"note" => current_note = Some(RawNote::default()),
                b"rest" => {
                    if let Some(note) = current_note.as_mut() {
                        note.rest = true;
                    }
                }
                b"sound" => doc.tempo = read_tempo_attribute(&e).or(doc.tempo),
                tag @ (b"beats" | b"beat-type" | b"step" | b"alter" | b"octave" | b"words") => {
                    text_target = Some(tag.to_vec());
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"rest" => {
                    if let Some(note) = current_note.as_mut() {
                        note.rest = true;
                    }
                }
                b"sound" => doc.tempo = read_tempo_attribute(&e).or(doc.tempo),
                _ => {}
            },
            Event::Text(t) => {
                let Some(target) = text_target.as_deref() else {
                    continue;
                };
                let text = t
                    .unescape()
                    .map_err(|e| ScoreError::InvalidFile(format!("bad XML text: {}", e)))?
                    .into_owned();
                apply_text(&mut doc, current_note.as_mut(), target, text);
            }
            Event::End(e) => {
                if e.name().as_ref() == b"note" {
                    if let Some(note) = current_note.take() {
                        doc.notes.push(note);
                    }
                }
                text_target = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

fn apply_text(doc: &mut RawDocument, note: Option<&mut RawNote>, target: &[u8], text: String) {
    match target {
        b"beats" => doc.beats = Some(text),
        b"beat-type" => doc.beat_type = Some(text),
        b"words" => doc.words = Some(text),
        b"step" => {
            if let Some(note) = note {
                note.step = Some(text.trim().to_string());
            }
        }
        b"alter" => {
            if let Some(note) = note {
                note.alter = text.trim().parse().unwrap_or(0);
            }
        }
        b"octave" => {
            if let Some(note) = note {
                note.octave = text.trim().parse().ok();
            }
        }
        _ => {}
    }
}

fn read_tempo_attribute(e: &BytesStart<'_>) -> Option<f64> {
    let attribute = e.try_get_attribute("tempo").ok()??;
    let value = attribute.unescape_value().ok()?;
    value.trim().parse().ok()
}
