use crate::app::App;
use crate::mpris::{MprisHandle, MprisStatus};

/// Push the active track and transport state to MPRIS.
pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    let active = app.active_index();
    let track = active.and_then(|i| app.playlist().get(i));
    mpris.set_track_metadata(active, track, app.info.duration);
    mpris.set_status(MprisStatus::from_transport(app.info.state));
    mpris.set_position(app.info.position);
}
