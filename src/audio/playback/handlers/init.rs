use super::*;
use crate::audio::graph::GraphStatus;

/// Builds the signal graph on the backend. Also handles `BackendResumed`, which
/// retries a graph left pending by a suspended backend.
pub(crate) fn audio_thread_handle_init_graph(engine: &mut MixEngine) -> Result<(), PlaybackError> {
    match engine.graph.connect(engine.backend.as_mut()) {
        Ok(GraphStatus::Built) => {
            log::info!(
                "Audio Thread: Signal graph live on '{}'",
                engine.backend.device_id()
            );
            Ok(())
        }
        Ok(GraphStatus::AlreadyBuilt) => Ok(()),
        Ok(GraphStatus::Pending) => {
            log::info!("Audio Thread: Backend suspended, graph build deferred");
            Ok(())
        }
        Err(e) => {
            log::error!("Audio Thread: Failed to build signal graph: {}", e);
            emit_error_event(engine.events.as_ref(), None, ErrorKind::Device, &e.to_string());
            Err(e)
        }
    }
}
