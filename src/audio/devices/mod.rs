use serde::{Deserialize, Serialize};

use crate::audio::errors::PlaybackError;
use crate::audio::graph::GraphRenderer;

// Backend for hosts that pull rendered audio themselves
pub mod pull;

pub use pull::PullBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendState {
    Suspended,
    Running,
    Closed,
}

/// Audio output device the signal graph renders into.
///
/// The engine never opens hardware itself: a backend reports its state and sample
/// rate, and receives the render half of the graph once the device is running.
pub trait AudioBackend: Send {
    /// Stable identifier of the master/cue output pair.
    fn device_id(&self) -> &str;

    fn state(&self) -> BackendState;

    fn sample_rate(&self) -> f32;

    /// Takes ownership of the renderer. Called at most once per built graph.
    fn attach(&mut self, renderer: GraphRenderer) -> Result<(), PlaybackError>;
}
