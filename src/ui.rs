//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::App;
use crate::audio::TransportState;
use crate::config::{ControlsSettings, UiSettings};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play selected song");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next song");
    // H/L is filled dynamically from config.
    map.insert("+/-", "volume");
    map.insert("z", "jump to playing");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating seek seconds.
fn controls_text(seek_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = ["j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "+/-", "z", "q"];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] seek -/+{}s", seek_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format seconds as `m:ss`, flooring partial seconds.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Fraction of the track already played, in `[0, 1]`.
fn progress_ratio(position: f64, duration: f64) -> f64 {
    if duration > 0.0 && position.is_finite() {
        (position / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Title line for the now-playing box.
fn now_playing_text(app: &App) -> String {
    let info = &app.info;
    if info.output_error.is_some() {
        return "audio output unavailable".to_string();
    }
    match info.state {
        TransportState::Empty if !info.fetched => "fetching playlist...".to_string(),
        TransportState::Empty => "no tracks available".to_string(),
        TransportState::Loading if !info.load_failed => {
            format!("{} (Loading...)", app.label(info.index))
        }
        _ => app.label(info.index),
    }
}

fn time_text(app: &App) -> String {
    let info = &app.info;
    if !info.loaded {
        return "-:-- / -:--".to_string();
    }
    format!(
        "{} / {}",
        format_time(info.position),
        format_time(info.duration)
    )
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" encore ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Now playing
    let status = {
        let info = &app.info;
        let mut parts: Vec<String> = vec![app.state_label().to_string()];
        if app.has_tracks() {
            parts.push(time_text(app));
            parts.push(format!("Track {}/{}", info.index + 1, info.playlist.len()));
        }
        parts.push(format!("Vol: {:+.0} dB", info.volume_db));
        if app.follow_playback {
            parts.push("CURSOR: Follow".to_string());
        } else {
            parts.push("CURSOR: Free-roam".to_string());
        }
        format!("{}\n{}", now_playing_text(app), parts.join(" • "))
    };

    let mut status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" now playing "),
        )
        .wrap(Wrap { trim: true });
    if !app.has_tracks() {
        status_par = status_par.dim();
    }
    frame.render_widget(status_par, chunks[1]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().add_modifier(Modifier::BOLD))
        .ratio(progress_ratio(app.info.position, app.info.duration))
        .label(time_text(app));
    frame.render_widget(gauge, chunks[2]);

    // Main list
    {
        let active = app.active_index();
        let total = app.playlist().len();
        let list_height = chunks[3].height.saturating_sub(2) as usize;

        // Center the selected item when possible by creating a visible window.
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = (start..end)
            .map(|i| {
                let marker = if Some(i) == active {
                    if app.info.playing { "▶ " } else { "‖ " }
                } else {
                    "  "
                };
                let item = ListItem::new(format!("{}{}", marker, app.label(i)));
                if Some(i) == active {
                    item.bold()
                } else {
                    item
                }
            })
            .collect();

        let title = if total == 0 {
            " tracks ".to_string()
        } else {
            format!(" tracks ({}) ", total)
        };
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    let footer_text = controls_text(controls_settings.seek_seconds);
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlaybackInfo;
    use crate::playlist::{Playlist, Track};

    #[test]
    fn format_time_floors_and_pads() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-2.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_ratio(5.0, 10.0), 0.5);
        assert_eq!(progress_ratio(12.0, 10.0), 1.0);
        assert_eq!(progress_ratio(3.0, 0.0), 0.0);
    }

    #[test]
    fn controls_text_mentions_seek_step() {
        let text = controls_text(7);
        assert!(text.contains("[H/L] seek -/+7s"));
        assert!(text.starts_with("[j/k] up/down"));
    }

    #[test]
    fn now_playing_covers_empty_states() {
        let mut app = App::new();
        assert_eq!(now_playing_text(&app), "fetching playlist...");

        app.apply_snapshot(PlaybackInfo {
            fetched: true,
            ..PlaybackInfo::default()
        });
        assert_eq!(now_playing_text(&app), "no tracks available");

        app.apply_snapshot(PlaybackInfo {
            fetched: true,
            playlist: Playlist::from(vec![Track {
                url: "https://a.test/a.mp3".into(),
                title: None,
            }]),
            state: TransportState::Loading,
            ..PlaybackInfo::default()
        });
        assert_eq!(now_playing_text(&app), "Track 1 (Loading...)");
        assert_eq!(time_text(&app), "-:-- / -:--");
    }
}
