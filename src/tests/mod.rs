pub mod test_catalog;
pub mod test_policy;
pub mod test_reward;

use crate::types::{ClassTelemetry, NetworkState};

/// Telemetry triple as (users, demand Mbps, satisfaction %) per class
pub(crate) fn state(web: (u32, f32, f32), audio: (u32, f32, f32), video: (u32, f32, f32)) -> NetworkState {
    NetworkState::new(
        ClassTelemetry::new(web.0, web.1, web.2),
        ClassTelemetry::new(audio.0, audio.1, audio.2),
        ClassTelemetry::new(video.0, video.1, video.2),
    )
    .unwrap()
}
