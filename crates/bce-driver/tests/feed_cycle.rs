//! Feed-loop handshake tests
//!
//! Runs the feeder engine against a scripted in-memory register mock that
//! models the hardware handshake: `fifo_ctl` self-clears after a reset and
//! `fifo_select` echoes the requested channel mask.

use bce_driver::{
    EmuRegisters, FeederError, FeederOptions, FeederState, FifoChannel, Frame, FrameFeeder,
    FrameSet, BC_EMU_RTL_ID,
};
use std::cell::Cell;
use std::time::Duration;

/// Every register access the engine performs, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Reset(u32),
    ContMode(u32),
    NshotLimit(u32),
    Push(usize, u32),
    Select(u32),
}

/// Scripted BC_EMU: resets clear after one polled read, switches echo
/// immediately.
#[derive(Debug)]
struct ScriptedEmu {
    rtl_id: u32,
    events: Vec<Event>,
    ctl: Cell<u32>,
    select: u32,
    /// When set, `fifo_ctl` never clears (models unresponsive hardware)
    ctl_stuck: bool,
}

impl ScriptedEmu {
    fn new() -> Self {
        Self {
            rtl_id: BC_EMU_RTL_ID,
            events: Vec::new(),
            ctl: Cell::new(0),
            select: 0,
            ctl_stuck: false,
        }
    }
}

impl EmuRegisters for ScriptedEmu {
    fn rtl_id(&self) -> u32 {
        self.rtl_id
    }

    fn push_word(&mut self, channel: FifoChannel, word: u32) {
        self.events.push(Event::Push(channel.index(), word));
    }

    fn write_fifo_ctl(&mut self, mask: u32) {
        self.events.push(Event::Reset(mask));
        self.ctl.set(mask);
    }

    fn read_fifo_ctl(&self) -> u32 {
        if self.ctl_stuck {
            return self.ctl.get();
        }
        // One read observes the pending reset, then it completes
        self.ctl.replace(0)
    }

    fn write_fifo_select(&mut self, mask: u32) {
        self.events.push(Event::Select(mask));
        self.select = mask;
    }

    fn read_fifo_select(&self) -> u32 {
        self.select
    }

    fn set_cont_mode(&mut self, value: u32) {
        self.events.push(Event::ContMode(value));
    }

    fn set_nshot_limit(&mut self, value: u32) {
        self.events.push(Event::NshotLimit(value));
    }
}

fn fast_options(repeat_factor: u32) -> FeederOptions {
    FeederOptions {
        repeat_factor,
        poll_interval: Duration::ZERO,
        poll_timeout: Duration::from_millis(50),
        word_delay: Duration::ZERO,
    }
}

fn frame_set(frames: &[&[u32]]) -> FrameSet {
    FrameSet::new(frames.iter().map(|w| Frame::new(w.to_vec())).collect())
}

fn run_to_events(frames: &[&[u32]], repeat_factor: u32) -> Vec<Event> {
    let mut feeder = FrameFeeder::new(
        ScriptedEmu::new(),
        frame_set(frames),
        fast_options(repeat_factor),
    )
    .expect("feeder construction");

    feeder.run().expect("feed run");
    assert_eq!(feeder.state(), FeederState::Done);
    feeder.into_regs().events
}

#[test]
fn repeat_two_alternates_channels_per_spec_order() {
    let events = run_to_events(&[&[1, 2], &[3]], 2);

    let expected = vec![
        // Startup: both channels reset, continuous mode (4 load cycles)
        Event::Reset(0b11),
        Event::ContMode(1),
        // F0 -> ch0, F0 -> ch1, F1 -> ch0, F1 -> ch1
        Event::Reset(0b01),
        Event::Push(0, 1),
        Event::Push(0, 2),
        Event::Select(0b01),
        Event::Reset(0b10),
        Event::Push(1, 1),
        Event::Push(1, 2),
        Event::Select(0b10),
        Event::Reset(0b01),
        Event::Push(0, 3),
        Event::Select(0b01),
        Event::Reset(0b10),
        Event::Push(1, 3),
        Event::Select(0b10),
        // Exhausted: one more channel reset, then drain
        Event::Reset(0b01),
        Event::Select(0),
    ];
    assert_eq!(events, expected);
}

#[test]
fn single_load_uses_one_shot_mode() {
    let events = run_to_events(&[&[7]], 1);

    let expected = vec![
        Event::Reset(0b11),
        Event::ContMode(0),
        Event::NshotLimit(1),
        Event::Reset(0b01),
        Event::Push(0, 7),
        Event::Select(0b01),
        Event::Reset(0b10),
        Event::Select(0),
    ];
    assert_eq!(events, expected);
}

#[test]
fn load_cycle_count_is_frames_times_repeat() {
    for (n, r) in [(1usize, 1u32), (3, 1), (2, 3), (4, 2)] {
        let frames: Vec<Vec<u32>> = (0..n).map(|i| vec![i as u32]).collect();
        let frames: Vec<&[u32]> = frames.iter().map(Vec::as_slice).collect();
        let events = run_to_events(&frames, r);

        let selects = events
            .iter()
            .filter(|e| matches!(e, Event::Select(m) if *m != 0))
            .count();
        assert_eq!(selects, n * r as usize, "N={n} R={r}");

        // Channel strictly alternates between consecutive loads
        let channels: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                Event::Select(m) if *m != 0 => Some(*m),
                _ => None,
            })
            .collect();
        for pair in channels.windows(2) {
            assert_ne!(pair[0], pair[1], "N={n} R={r}: {channels:?}");
        }
    }
}

#[test]
fn identity_mismatch_is_fatal_before_any_fifo_write() {
    let mut emu = ScriptedEmu::new();
    emu.rtl_id = 0xdead_beef;

    let mut feeder = FrameFeeder::new(emu, frame_set(&[&[1]]), fast_options(1)).unwrap();
    let err = feeder.run().unwrap_err();

    assert!(matches!(err, FeederError::Hardware { .. }), "got {err}");
    assert!(
        feeder.into_regs().events.is_empty(),
        "no register may be written after an identity mismatch"
    );
}

#[test]
fn stuck_fifo_ctl_times_out() {
    let mut emu = ScriptedEmu::new();
    emu.ctl_stuck = true;

    let mut feeder = FrameFeeder::new(emu, frame_set(&[&[1]]), fast_options(1)).unwrap();
    let err = feeder.run().unwrap_err();

    assert!(matches!(err, FeederError::Timeout { .. }), "got {err}");
}
