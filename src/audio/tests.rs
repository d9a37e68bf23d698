use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::error::LoadError;
use crate::playlist::{Playlist, Track};

use super::buffer::{BufferLoader, Generation, LoadRequest, TrackBuffer};
use super::transport::{Tick, Transport};
use super::types::{AudioCmd, LoadFailurePolicy, TransportOptions, TransportState};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Load(usize),
    Start(&'static str, f64),
    Stop(&'static str),
    Volume(&'static str, f32),
    Dispose(&'static str),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct FakeLoader {
    log: Log,
    requests: Vec<LoadRequest>,
}

impl BufferLoader for FakeLoader {
    type Buffer = FakeBuffer;

    fn load(&mut self, request: LoadRequest) {
        self.log.borrow_mut().push(Event::Load(request.index));
        self.requests.push(request);
    }
}

struct FakeBuffer {
    name: &'static str,
    duration: f64,
    drained: bool,
    log: Log,
}

impl TrackBuffer for FakeBuffer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn start(&mut self, offset: f64) {
        self.log.borrow_mut().push(Event::Start(self.name, offset));
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(Event::Stop(self.name));
    }

    fn set_volume(&mut self, gain: f32) {
        self.log.borrow_mut().push(Event::Volume(self.name, gain));
    }

    fn finished(&self) -> bool {
        self.drained
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().push(Event::Dispose(self.name));
    }
}

struct Harness {
    transport: Transport<FakeLoader>,
    log: Log,
    t0: Instant,
}

impl Harness {
    fn new(urls: &[&str], options: TransportOptions) -> Self {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let loader = FakeLoader {
            log: log.clone(),
            requests: Vec::new(),
        };
        let mut transport = Transport::new(loader, options);
        let tracks: Vec<Track> = urls
            .iter()
            .map(|u| Track {
                url: format!("https://example.test/{u}.mp3"),
                title: Some(u.to_string()),
            })
            .collect();
        transport.set_playlist(Playlist::from(tracks));
        Self {
            transport,
            log,
            t0: Instant::now(),
        }
    }

    fn at(&self, secs: f64) -> Instant {
        self.t0 + Duration::from_secs_f64(secs)
    }

    fn buffer(&self, name: &'static str, duration: f64) -> FakeBuffer {
        FakeBuffer {
            name,
            duration,
            drained: false,
            log: self.log.clone(),
        }
    }

    fn last_request(&self) -> LoadRequest {
        self.transport
            .loader()
            .requests
            .last()
            .cloned()
            .expect("a load was requested")
    }

    /// Complete the most recent load with a buffer of `duration` seconds.
    fn finish_load(&mut self, name: &'static str, duration: f64, now: f64) {
        let generation = self.last_request().generation;
        let buffer = self.buffer(name, duration);
        let at = self.at(now);
        self.transport.load_finished(generation, Ok(buffer), at);
    }

    fn fail_load(&mut self, now: f64) {
        let generation = self.last_request().generation;
        let at = self.at(now);
        self.transport
            .load_finished(generation, Err(LoadError::Decode("bad".into())), at);
    }

    fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    fn clear_events(&self) {
        self.log.borrow_mut().clear();
    }

    fn starts(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Start(..)))
            .collect()
    }
}

fn opts() -> TransportOptions {
    TransportOptions {
        tick_interval: Duration::from_millis(100),
        end_epsilon: 0.1,
        failure_policy: LoadFailurePolicy::Stay,
        volume_db: 0.0,
        autoplay: false,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn set_playlist_loads_first_track_paused() {
    let mut h = Harness::new(&["a", "b", "c"], opts());
    assert_eq!(h.transport.state(), TransportState::Loading);
    assert_eq!(h.events(), vec![Event::Load(0)]);

    h.finish_load("a", 10.0, 0.0);
    assert_eq!(h.transport.state(), TransportState::Paused);
    assert!(close(h.transport.duration(), 10.0));
    assert!(h.starts().is_empty());
    assert!(!h.transport.ticker_armed());
}

#[test]
fn autoplay_starts_once_loaded() {
    let mut h = Harness::new(&["a"], TransportOptions {
        autoplay: true,
        ..opts()
    });
    assert!(h.transport.is_playing());
    h.finish_load("a", 10.0, 0.0);
    assert_eq!(h.transport.state(), TransportState::Playing);
    assert_eq!(h.starts(), vec![Event::Start("a", 0.0)]);
    assert!(h.transport.ticker_armed());
}

#[test]
fn empty_playlist_ignores_every_intent() {
    let mut h = Harness::new(&[], opts());
    let now = h.at(0.0);
    assert_eq!(h.transport.state(), TransportState::Empty);

    for cmd in [
        AudioCmd::Play,
        AudioCmd::TogglePause,
        AudioCmd::Next,
        AudioCmd::Prev,
        AudioCmd::Pick(0),
        AudioCmd::Seek(3.0),
    ] {
        h.transport.apply(cmd, now);
    }

    assert_eq!(h.transport.state(), TransportState::Empty);
    assert!(!h.transport.is_playing());
    assert!(h.events().is_empty());
    assert!(h.transport.snapshot(now).fetched);
}

#[test]
fn next_and_previous_wrap_around() {
    let mut h = Harness::new(&["a", "b", "c"], opts());
    h.transport.previous();
    assert_eq!(h.transport.active_index(), 2);
    h.transport.next();
    assert_eq!(h.transport.active_index(), 0);
    h.transport.next();
    h.transport.next();
    h.transport.next();
    assert_eq!(h.transport.active_index(), 0);
    assert_eq!(h.last_request().index, 0);
}

#[test]
fn pause_and_resume_keep_position() {
    let mut h = Harness::new(&["a"], opts());
    h.finish_load("a", 60.0, 0.0);

    let t = h.at(1.0);
    h.transport.play(t);
    let t = h.at(4.0);
    h.transport.pause(t);
    assert!(close(h.transport.offset(), 3.0));
    assert_eq!(h.transport.state(), TransportState::Paused);
    assert!(!h.transport.ticker_armed());

    // Time spent paused does not count.
    let t = h.at(30.0);
    assert!(close(h.transport.position(t), 3.0));
    h.transport.play(t);
    let t = h.at(32.5);
    assert!(close(h.transport.position(t), 5.5));
    assert_eq!(h.starts(), vec![Event::Start("a", 0.0), Event::Start("a", 3.0)]);
}

#[test]
fn seek_clamps_into_track() {
    let mut h = Harness::new(&["a"], opts());
    let now = h.at(0.0);

    // Before the buffer is ready seeks are dropped.
    h.transport.seek(5.0, now);
    assert!(close(h.transport.offset(), 0.0));

    h.finish_load("a", 10.0, 0.0);
    h.transport.seek(-4.0, now);
    assert!(close(h.transport.offset(), 0.0));
    h.transport.seek(25.0, now);
    assert!(close(h.transport.offset(), 10.0));
    h.transport.seek(f64::NAN, now);
    assert!(close(h.transport.offset(), 10.0));
    h.transport.seek(4.25, now);
    assert!(close(h.transport.position(now), 4.25));
    assert!(h.starts().is_empty());
}

#[test]
fn seek_while_playing_restarts_output() {
    let mut h = Harness::new(&["a"], opts());
    h.finish_load("a", 10.0, 0.0);
    let t = h.at(0.0);
    h.transport.play(t);
    h.clear_events();

    let t = h.at(2.0);
    h.transport.seek_by(3.0, t);
    assert_eq!(h.events(), vec![Event::Stop("a"), Event::Start("a", 5.0)]);
    let t = h.at(3.0);
    assert!(close(h.transport.position(t), 6.0));
}

#[test]
fn end_of_track_advances_and_keeps_playing() {
    let mut h = Harness::new(&["a", "b"], opts());
    h.finish_load("a", 10.0, 0.0);
    let t = h.at(0.0);
    h.transport.play(t);
    h.transport.seek(9.95, t);

    let t = h.at(0.2);
    assert!(h.transport.tick_due(t));
    assert_eq!(h.transport.tick(t), Tick::Advanced { from: 0, to: 1 });
    assert_eq!(h.transport.active_index(), 1);
    assert_eq!(h.transport.state(), TransportState::Loading);
    assert!(h.transport.is_playing());

    h.finish_load("b", 8.0, 0.3);
    assert_eq!(h.transport.state(), TransportState::Playing);
    assert!(close(h.transport.offset(), 0.0));
    assert_eq!(h.starts().last(), Some(&Event::Start("b", 0.0)));
    assert!(h.events().contains(&Event::Dispose("a")));
}

#[test]
fn advance_happens_once_per_track_end() {
    let mut h = Harness::new(&["a", "b", "c"], opts());
    h.finish_load("a", 1.0, 0.0);
    let t = h.at(0.0);
    h.transport.play(t);

    let t = h.at(5.0);
    assert_eq!(h.transport.tick(t), Tick::Advanced { from: 0, to: 1 });
    // Until the next buffer is ready nothing else moves.
    let t = h.at(5.1);
    assert_eq!(h.transport.tick(t), Tick::Idle);
    let t = h.at(9.0);
    assert_eq!(h.transport.tick(t), Tick::Idle);
    assert_eq!(h.transport.active_index(), 1);
}

#[test]
fn drained_buffer_counts_as_track_end() {
    let mut h = Harness::new(&["a", "b"], opts());
    let generation = h.last_request().generation;
    let mut buffer = h.buffer("a", 0.0);
    buffer.drained = true;
    let t = h.at(0.0);
    h.transport.load_finished(generation, Ok(buffer), t);
    h.transport.play(t);

    let t = h.at(0.1);
    assert_eq!(h.transport.tick(t), Tick::Advanced { from: 0, to: 1 });
}

#[test]
fn single_track_playlist_reloads_itself() {
    let mut h = Harness::new(&["a"], opts());
    h.finish_load("a", 2.0, 0.0);
    let t = h.at(0.0);
    h.transport.play(t);

    let t = h.at(3.0);
    assert_eq!(h.transport.tick(t), Tick::Advanced { from: 0, to: 0 });
    let loads: Vec<_> = h
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Load(_)))
        .collect();
    assert_eq!(loads, vec![Event::Load(0), Event::Load(0)]);
}

#[test]
fn tick_reports_position_while_playing() {
    let mut h = Harness::new(&["a"], opts());
    h.finish_load("a", 10.0, 0.0);

    let t = h.at(0.0);
    assert_eq!(h.transport.tick(t), Tick::Idle);
    h.transport.play(t);
    let t = h.at(1.5);
    assert_eq!(h.transport.tick(t), Tick::Position(1.5));
}

#[test]
fn stale_load_is_disposed_and_ignored() {
    let mut h = Harness::new(&["a", "b", "c"], opts());
    let stale = h.last_request().generation;

    h.transport.next();
    assert_eq!(h.transport.active_index(), 1);

    let late = h.buffer("a", 10.0);
    let t = h.at(0.5);
    h.transport.load_finished(stale, Ok(late), t);
    assert_eq!(h.transport.state(), TransportState::Loading);
    assert!(h.events().contains(&Event::Dispose("a")));

    // A failure from the stale request is ignored as well.
    h.transport.load_finished(stale, Err(LoadError::Empty), t);
    assert_eq!(h.transport.state(), TransportState::Loading);
    assert!(!h.transport.snapshot(t).load_failed);

    h.finish_load("b", 8.0, 0.6);
    assert_eq!(h.transport.state(), TransportState::Paused);
    assert!(close(h.transport.duration(), 8.0));
}

#[test]
fn duplicate_completion_is_ignored() {
    let mut h = Harness::new(&["a"], opts());
    let generation = h.last_request().generation;
    h.finish_load("a", 10.0, 0.0);

    let dup = h.buffer("dup", 3.0);
    let t = h.at(0.1);
    h.transport.load_finished(generation, Ok(dup), t);
    assert!(close(h.transport.duration(), 10.0));
    assert!(h.events().contains(&Event::Dispose("dup")));
}

#[test]
fn generation_bumps_on_every_switch() {
    let mut h = Harness::new(&["a", "b"], opts());
    let first = h.transport.generation();
    h.transport.next();
    let second = h.transport.generation();
    assert!(second > first);
    h.transport.shutdown();
    assert!(h.transport.generation() > second);
    assert_ne!(first, Generation::default());
}

#[test]
fn pick_active_toggles_without_reloading() {
    let mut h = Harness::new(&["a", "b"], opts());
    h.finish_load("a", 10.0, 0.0);
    h.clear_events();

    let t = h.at(1.0);
    h.transport.pick(0, t);
    assert_eq!(h.transport.state(), TransportState::Playing);
    assert_eq!(h.events(), vec![Event::Start("a", 0.0)]);

    let t = h.at(2.0);
    h.transport.pick(0, t);
    assert_eq!(h.transport.state(), TransportState::Paused);
    assert!(close(h.transport.offset(), 1.0));
}

#[test]
fn pick_other_loads_it_and_out_of_range_is_ignored() {
    let mut h = Harness::new(&["a", "b", "c"], opts());
    h.finish_load("a", 10.0, 0.0);
    let t = h.at(0.0);

    h.transport.pick(7, t);
    assert_eq!(h.transport.active_index(), 0);
    assert_eq!(h.transport.state(), TransportState::Paused);

    h.transport.pick(2, t);
    assert_eq!(h.transport.active_index(), 2);
    assert_eq!(h.last_request().index, 2);
    assert_eq!(h.transport.state(), TransportState::Loading);
}

#[test]
fn play_during_load_is_remembered() {
    let mut h = Harness::new(&["a"], opts());
    let t = h.at(0.0);
    h.transport.play(t);
    assert_eq!(h.transport.state(), TransportState::Loading);
    h.finish_load("a", 10.0, 0.5);
    assert_eq!(h.transport.state(), TransportState::Playing);

    // Pausing mid-load cancels the intent.
    let mut h = Harness::new(&["a"], opts());
    h.transport.play(t);
    h.transport.pause(t);
    h.finish_load("a", 10.0, 0.5);
    assert_eq!(h.transport.state(), TransportState::Paused);
}

#[test]
fn failed_load_stays_put_by_default() {
    let mut h = Harness::new(&["a", "b"], opts());
    h.fail_load(0.0);

    let t = h.at(0.1);
    let snap = h.transport.snapshot(t);
    assert!(snap.load_failed);
    assert_eq!(snap.state, TransportState::Loading);
    assert_eq!(h.transport.active_index(), 0);

    h.transport.play(t);
    assert!(!h.transport.is_playing());

    // Navigation still works.
    h.transport.next();
    assert_eq!(h.transport.active_index(), 1);
    assert!(!h.transport.snapshot(t).load_failed);
}

#[test]
fn failed_load_skips_when_configured() {
    let mut h = Harness::new(&["a", "b", "c"], TransportOptions {
        failure_policy: LoadFailurePolicy::Skip,
        autoplay: true,
        ..opts()
    });
    h.fail_load(0.0);
    assert_eq!(h.transport.active_index(), 1);
    assert!(h.transport.is_playing());

    h.finish_load("b", 5.0, 0.2);
    assert_eq!(h.transport.state(), TransportState::Playing);
}

#[test]
fn skip_policy_gives_up_after_a_full_lap() {
    let mut h = Harness::new(&["a", "b"], TransportOptions {
        failure_policy: LoadFailurePolicy::Skip,
        ..opts()
    });
    h.fail_load(0.0);
    assert_eq!(h.transport.active_index(), 1);
    h.fail_load(0.1);

    let loads = h
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Load(_)))
        .count();
    // Every track failed once: no further skipping.
    assert_eq!(loads, 2);
    assert_eq!(h.transport.active_index(), 1);
    assert!(h.transport.snapshot(h.at(0.3)).load_failed);

    // A manual skip starts over.
    h.transport.next();
    assert_eq!(h.transport.active_index(), 0);
}

#[test]
fn volume_is_clamped_and_applied() {
    let mut h = Harness::new(&["a"], opts());
    h.finish_load("a", 10.0, 0.0);
    h.clear_events();

    h.transport.set_volume_db(40.0);
    assert_eq!(h.transport.volume_db(), 6.0);
    h.transport.set_volume_db(-100.0);
    assert_eq!(h.transport.volume_db(), -30.0);
    h.transport.set_volume_db(f32::NAN);
    assert_eq!(h.transport.volume_db(), -30.0);

    h.transport.set_volume_db(0.0);
    assert_eq!(h.events().last(), Some(&Event::Volume("a", 1.0)));
}

#[test]
fn shutdown_releases_buffer_and_drops_pending_load() {
    let mut h = Harness::new(&["a", "b"], opts());
    h.finish_load("a", 10.0, 0.0);
    let t = h.at(0.0);
    h.transport.play(t);
    h.transport.next();
    let pending = h.last_request().generation;

    h.transport.shutdown();
    assert!(!h.transport.is_playing());
    assert!(!h.transport.ticker_armed());

    let late = h.buffer("b", 8.0);
    h.transport.load_finished(pending, Ok(late), t);
    assert!(!h.transport.is_loaded());
    assert!(h.events().contains(&Event::Dispose("b")));
}

#[test]
fn next_wakeup_follows_ticker() {
    let mut h = Harness::new(&["a"], opts());
    let idle = Duration::from_secs(1);
    let t = h.at(0.0);
    assert_eq!(h.transport.next_wakeup(t, idle), idle);

    h.finish_load("a", 10.0, 0.0);
    h.transport.play(t);
    let t = h.at(0.04);
    let wait = h.transport.next_wakeup(t, idle);
    assert!(wait <= Duration::from_millis(60));
}
