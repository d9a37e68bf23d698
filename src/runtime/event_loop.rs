use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::App;
use crate::audio::{AudioCmd, AudioPlayer, TransportState};
use crate::config;
use crate::mpris::ControlCmd;
use crate::mpris::MprisHandle;
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Last-known active index as emitted to MPRIS.
    pub last_mpris_index: Option<usize>,
    /// Last-known transport state as emitted to MPRIS.
    pub last_mpris_state: TransportState,
    /// Last-known duration as emitted to MPRIS.
    pub last_mpris_duration: f64,
}

/// What the loop should do after a key press.
#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Continue,
    Quit,
    Send(AudioCmd),
}

/// Main terminal event loop: handles input, UI drawing, sync with the audio
/// thread and MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    mpris: &MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let fade_out = Duration::from_millis(settings.audio.quit_fade_out_ms);

    loop {
        // Sync playback state from audio thread; the cursor follows if enabled.
        app.refresh();

        // Keep MPRIS in sync even when playback changes come from media keys or auto-advance.
        if app.active_index() != state.last_mpris_index
            || app.info.state != state.last_mpris_state
            || app.info.duration != state.last_mpris_duration
        {
            update_mpris(mpris, app);
            state.last_mpris_index = app.active_index();
            state.last_mpris_state = app.info.state;
            state.last_mpris_duration = app.info.duration;
        } else {
            mpris.set_position(app.info.position);
        }

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = control_rx.try_recv() {
            debug!(?cmd, "MPRIS control");
            if cmd == ControlCmd::Quit {
                audio_player.quit_softly(fade_out);
                return Ok(());
            }
            for audio_cmd in control_intents(&cmd) {
                let _ = audio_player.send(audio_cmd);
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key_event(key, settings, app, state) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Send(cmd) => {
                        let _ = audio_player.send(cmd);
                    }
                    KeyOutcome::Quit => {
                        audio_player.quit_softly(fade_out);
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Map an MPRIS control onto transport intents. `Quit` is handled by the loop.
pub fn control_intents(cmd: &ControlCmd) -> Vec<AudioCmd> {
    match cmd {
        ControlCmd::Quit => Vec::new(),
        ControlCmd::Play => vec![AudioCmd::Play],
        ControlCmd::Pause => vec![AudioCmd::Pause],
        ControlCmd::PlayPause => vec![AudioCmd::TogglePause],
        ControlCmd::Stop => vec![AudioCmd::Pause, AudioCmd::Seek(0.0)],
        ControlCmd::Next => vec![AudioCmd::Next],
        ControlCmd::Prev => vec![AudioCmd::Prev],
    }
}

pub fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    state: &mut EventLoopState,
) -> KeyOutcome {
    let gg_prefix = state.pending_gg;
    state.pending_gg = false;

    match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('g') => {
            if gg_prefix {
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Char('z') => app.follow_playback_on(),
        KeyCode::Enter => {
            if let Some(i) = app.pick_selected() {
                return KeyOutcome::Send(AudioCmd::Pick(i));
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            return KeyOutcome::Send(AudioCmd::TogglePause);
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            return KeyOutcome::Send(AudioCmd::Next);
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            return KeyOutcome::Send(AudioCmd::Prev);
        }
        KeyCode::Char('L') => {
            return KeyOutcome::Send(AudioCmd::SeekBy(settings.controls.seek_seconds as f64));
        }
        KeyCode::Char('H') => {
            return KeyOutcome::Send(AudioCmd::SeekBy(-(settings.controls.seek_seconds as f64)));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let db = app.info.volume_db + settings.controls.volume_step_db;
            return KeyOutcome::Send(AudioCmd::SetVolume(db));
        }
        KeyCode::Char('-') => {
            let db = app.info.volume_db - settings.controls.volume_step_db;
            return KeyOutcome::Send(AudioCmd::SetVolume(db));
        }
        _ => {}
    }

    KeyOutcome::Continue
}
