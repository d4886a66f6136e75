// Transport scheduler - The periodic clock that advances steps and fires notes
// One clock thread; note-offs go through a min-heap delay queue polled by the same loop

use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::Notification;
use crate::midi::event::{MidiEvent, DEFAULT_VELOCITY, NOTE_DURATION_MS};
use crate::output::{MidiSender, OutputMode, OutputSelector, ToneGenerator};
use crate::pitch::Pitch;
use crate::sequencer::metronome::{self, ClickType};
use crate::sequencer::pattern::Pattern;
use crate::sequencer::transport::SharedTransportState;
use ringbuf::traits::Producer;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Length of a synth-path step note as a fraction of a whole note (a sixteenth)
const STEP_NOTE_FRACTION: f64 = 1.0 / 16.0;

/// Everything one tick resolves from the pattern, before any output happens
///
/// The three actions (note, click, highlight) are independent; a silent step
/// still clicks and highlights.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TickPlan {
    pub step: usize,
    pub metro_slot: usize,
    pub note: Option<Pitch>,
    pub click: Option<ClickType>,
}

pub(crate) fn plan_tick(pattern: &Pattern, step: usize) -> TickPlan {
    let metro_slot = step % pattern.steps_per_row();
    let note = if pattern.is_active(step) {
        pattern.pitch(step)
    } else {
        None
    };
    let click = metronome::click_for(metro_slot, pattern.time_signature().metronome_interval());

    TickPlan {
        step,
        metro_slot,
        note,
        click,
    }
}

/// A note-off waiting in the delay queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingNoteOff {
    due: Instant,
    note: u8,
}

impl Ord for PendingNoteOff {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due.cmp(&other.due).then(self.note.cmp(&other.note))
    }
}

impl PartialOrd for PendingNoteOff {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Shared handles the clock thread works with
struct ClockShared {
    pattern: Arc<Mutex<Pattern>>,
    transport: Arc<SharedTransportState>,
    selector: Arc<OutputSelector>,
    tone: Arc<Mutex<Box<dyn ToneGenerator>>>,
    midi: Arc<Mutex<Option<Box<dyn MidiSender>>>>,
    notifications: Arc<Mutex<NotificationProducer>>,
}

/// The playback scheduler
///
/// `start` spawns one clock thread ticking at 60/(bpm*4) seconds; `stop`
/// clears the playing flag and joins the thread, so no tick is in flight once
/// it returns. Pattern access from the clock thread goes through the same
/// mutex the UI-side mutations use.
pub struct Scheduler {
    shared: ClockShared,
    handle: Option<thread::JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        pattern: Arc<Mutex<Pattern>>,
        transport: Arc<SharedTransportState>,
        selector: Arc<OutputSelector>,
        tone: Box<dyn ToneGenerator>,
        notifications: Arc<Mutex<NotificationProducer>>,
    ) -> Self {
        Self {
            shared: ClockShared {
                pattern,
                transport,
                selector,
                tone: Arc::new(Mutex::new(tone)),
                midi: Arc::new(Mutex::new(None)),
                notifications,
            },
            handle: None,
        }
    }

    /// Replace the bound MIDI sender (None unbinds)
    pub fn set_midi_sender(&self, sender: Option<Box<dyn MidiSender>>) {
        *lock_ignoring_poison(&self.shared.midi) = sender;
    }

    /// Start playback from step 0
    ///
    /// No-op while already playing.
    pub fn start(&mut self) {
        if self.shared.transport.is_playing() {
            return;
        }
        // A previous clock thread may still be winding down
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.shared.transport.start();
        log::debug!("transport started");

        let shared = ClockShared {
            pattern: Arc::clone(&self.shared.pattern),
            transport: Arc::clone(&self.shared.transport),
            selector: Arc::clone(&self.shared.selector),
            tone: Arc::clone(&self.shared.tone),
            midi: Arc::clone(&self.shared.midi),
            notifications: Arc::clone(&self.shared.notifications),
        };
        self.handle = Some(thread::spawn(move || clock_loop(shared)));
    }

    /// Stop playback
    ///
    /// Idempotent; joins the clock thread so no further output is scheduled
    /// after this returns. Pending note-offs are flushed, not cancelled.
    pub fn stop(&mut self) {
        self.shared.transport.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        log::debug!("transport stopped");
    }

    pub fn is_playing(&self) -> bool {
        self.shared.transport.is_playing()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lock a mutex, recovering the data from a poisoned lock
fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn clock_loop(shared: ClockShared) {
    let mut pending: BinaryHeap<Reverse<PendingNoteOff>> = BinaryHeap::new();
    let mut next_tick = Instant::now();

    while shared.transport.is_playing() {
        let now = Instant::now();
        flush_due_note_offs(&shared, &mut pending, now);

        if now >= next_tick {
            run_tick(&shared, &mut pending, now);

            next_tick += shared.transport.tempo().tick_duration();
            if next_tick < now {
                // Fell behind (e.g. after a tempo jump); don't burst-catch-up
                next_tick = now + shared.transport.tempo().tick_duration();
            }
        }

        thread::sleep(Duration::from_millis(1));
    }

    // Let every scheduled note end rather than leaving it hanging
    let mut midi = lock_ignoring_poison(&shared.midi);
    if let Some(sender) = midi.as_mut() {
        while let Some(Reverse(off)) = pending.pop() {
            let _ = sender.send(&MidiEvent::NoteOff { note: off.note }.to_bytes());
        }
    }
}

fn run_tick(shared: &ClockShared, pending: &mut BinaryHeap<Reverse<PendingNoteOff>>, now: Instant) {
    let (plan, total_steps) = {
        let pattern = lock_ignoring_poison(&shared.pattern);
        let plan = plan_tick(&pattern, shared.transport.current_step());
        (plan, pattern.total_steps())
    };

    if let Some(pitch) = plan.note {
        match shared.selector.mode() {
            OutputMode::Midi => {
                let mut midi = lock_ignoring_poison(&shared.midi);
                if let Some(sender) = midi.as_mut() {
                    let on = MidiEvent::NoteOn {
                        note: pitch.midi(),
                        velocity: DEFAULT_VELOCITY,
                    };
                    if let Err(e) = sender.send(&on.to_bytes()) {
                        log::warn!("MIDI note-on failed: {}", e);
                    } else {
                        pending.push(Reverse(PendingNoteOff {
                            due: now + Duration::from_millis(NOTE_DURATION_MS),
                            note: pitch.midi(),
                        }));
                    }
                }
            }
            OutputMode::Synth => {
                lock_ignoring_poison(&shared.tone).trigger_note(pitch, STEP_NOTE_FRACTION);
            }
        }
    }

    // Metronome rides the internal synth capability in both output modes
    if let Some(click) = plan.click {
        lock_ignoring_poison(&shared.tone).trigger_click(click.velocity());
    }

    let _ = lock_ignoring_poison(&shared.notifications).try_push(Notification::StepHighlight {
        step: plan.step,
        metro_slot: plan.metro_slot,
    });

    shared.transport.advance_step(total_steps);
}

fn flush_due_note_offs(
    shared: &ClockShared,
    pending: &mut BinaryHeap<Reverse<PendingNoteOff>>,
    now: Instant,
) {
    while pending.peek().is_some_and(|Reverse(p)| p.due <= now) {
        let Some(Reverse(off)) = pending.pop() else {
            break;
        };
        let mut midi = lock_ignoring_poison(&shared.midi);
        if let Some(sender) = midi.as_mut() {
            if let Err(e) = sender.send(&MidiEvent::NoteOff { note: off.note }.to_bytes()) {
                log::warn!("MIDI note-off failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_notification_channel;
    use crate::sequencer::timeline::{Tempo, TimeSignature};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ringbuf::traits::Consumer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTone {
        notes: Arc<AtomicUsize>,
        clicks: Arc<AtomicUsize>,
    }

    impl ToneGenerator for CountingTone {
        fn trigger_note(&mut self, _pitch: Pitch, _duration_fraction: f64) {
            self.notes.fetch_add(1, Ordering::Relaxed);
        }

        fn trigger_click(&mut self, _velocity: f32) {
            self.clicks.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct RecordingMidi(Arc<Mutex<Vec<[u8; 3]>>>);

    impl MidiSender for RecordingMidi {
        fn send(&mut self, message: &[u8]) -> Result<(), crate::midi::MidiError> {
            let mut bytes = [0u8; 3];
            bytes.copy_from_slice(message);
            self.0.lock().unwrap().push(bytes);
            Ok(())
        }
    }

    fn pattern_with_active_steps(steps: &[usize]) -> Pattern {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pattern = Pattern::new(TimeSignature::four_four(), 1);
        for step in steps {
            pattern.toggle_step(*step, &mut rng).unwrap();
        }
        pattern
    }

    #[test]
    fn test_plan_silent_step_still_clicks_and_highlights() {
        let pattern = pattern_with_active_steps(&[]);
        let plan = plan_tick(&pattern, 0);
        assert_eq!(plan.note, None);
        assert_eq!(plan.click, Some(ClickType::Accent));
        assert_eq!(plan.step, 0);
        assert_eq!(plan.metro_slot, 0);
    }

    #[test]
    fn test_plan_active_step_carries_pitch() {
        let pattern = pattern_with_active_steps(&[5]);
        let plan = plan_tick(&pattern, 5);
        assert_eq!(plan.note, pattern.pitch(5));
        assert_eq!(plan.click, None);
    }

    #[test]
    fn test_plan_metro_slot_wraps_across_rows() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pattern = Pattern::new(TimeSignature::four_four(), 2);
        pattern.toggle_step(20, &mut rng).unwrap();

        let plan = plan_tick(&pattern, 20);
        assert_eq!(plan.metro_slot, 4);
        assert_eq!(plan.click, Some(ClickType::Regular));
    }

    #[test]
    fn test_plan_six_eight_downbeats() {
        let pattern = Pattern::new(TimeSignature::six_eight(), 1);
        assert_eq!(plan_tick(&pattern, 0).click, Some(ClickType::Accent));
        assert_eq!(plan_tick(&pattern, 6).click, Some(ClickType::Regular));
        assert_eq!(plan_tick(&pattern, 3).click, None);
    }

    fn make_scheduler(
        pattern: Pattern,
        tone: CountingTone,
    ) -> (Scheduler, crate::messaging::NotificationConsumer) {
        let (tx, rx) = create_notification_channel(256);
        let transport = SharedTransportState::new();
        transport.set_tempo(Tempo::new(999.0));
        let scheduler = Scheduler::new(
            Arc::new(Mutex::new(pattern)),
            transport,
            OutputSelector::new(OutputMode::Synth),
            Box::new(tone),
            Arc::new(Mutex::new(tx)),
        );
        (scheduler, rx)
    }

    #[test]
    fn test_clock_ticks_and_stops() {
        let tone = CountingTone::default();
        let clicks = Arc::clone(&tone.clicks);
        let notes = Arc::clone(&tone.notes);

        let (mut scheduler, mut rx) = make_scheduler(pattern_with_active_steps(&[0]), tone);
        scheduler.start();
        assert!(scheduler.is_playing());
        // ~15ms per tick at 999 BPM; give it plenty of room
        thread::sleep(Duration::from_millis(300));
        scheduler.stop();
        assert!(!scheduler.is_playing());

        assert!(clicks.load(Ordering::Relaxed) > 0);
        assert!(notes.load(Ordering::Relaxed) > 0);

        let first = rx.try_pop();
        assert_eq!(
            first,
            Some(Notification::StepHighlight {
                step: 0,
                metro_slot: 0
            })
        );

        // Stop is idempotent
        scheduler.stop();
    }

    #[test]
    fn test_midi_path_sends_note_on_and_off() {
        let tone = CountingTone::default();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let (mut scheduler, _rx) = make_scheduler(pattern_with_active_steps(&[0, 1, 2, 3]), tone);
        scheduler.shared.selector.set_mode(OutputMode::Midi);
        scheduler.set_midi_sender(Some(Box::new(RecordingMidi(Arc::clone(&sent)))));

        scheduler.start();
        thread::sleep(Duration::from_millis(300));
        scheduler.stop();

        let sent = sent.lock().unwrap();
        let ons = sent.iter().filter(|m| m[0] == 0x90).count();
        let offs = sent.iter().filter(|m| m[0] == 0x80).count();
        assert!(ons > 0);
        // Every note-on is matched by a note-off, flushed at the latest on stop
        assert_eq!(ons, offs);
    }

    #[test]
    fn test_restart_resets_cursor() {
        let tone = CountingTone::default();
        let (mut scheduler, mut rx) = make_scheduler(pattern_with_active_steps(&[]), tone);

        scheduler.start();
        thread::sleep(Duration::from_millis(100));
        scheduler.stop();
        while rx.try_pop().is_some() {}

        scheduler.start();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();

        // First highlight after a restart is step 0 again
        assert!(matches!(
            rx.try_pop(),
            Some(Notification::StepHighlight { step: 0, .. })
        ));
    }
}
