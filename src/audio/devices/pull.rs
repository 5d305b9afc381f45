use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use super::{AudioBackend, BackendState};
use crate::audio::errors::PlaybackError;
use crate::audio::graph::GraphRenderer;

const STATE_SUSPENDED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Shared slot holding the renderer handed over by the engine.
pub type RendererSlot = Arc<Mutex<Option<GraphRenderer>>>;

/// Backend for hosts that drive rendering from their own audio callback.
///
/// The engine parks the renderer in a shared slot; the host locks the slot from its
/// callback and calls `GraphRenderer::render`. Clones share state, so the host can keep
/// one to resume or suspend the device after the engine took ownership of another.
#[derive(Clone)]
pub struct PullBackend {
    device_id: String,
    sample_rate: f32,
    state: Arc<AtomicU8>,
    slot: RendererSlot,
}

impl PullBackend {
    /// Starts suspended, as browser-style audio contexts do until user interaction.
    pub fn new(device_id: impl Into<String>, sample_rate: f32) -> Self {
        PullBackend {
            device_id: device_id.into(),
            sample_rate,
            state: Arc::new(AtomicU8::new(STATE_SUSPENDED)),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn renderer_slot(&self) -> RendererSlot {
        Arc::clone(&self.slot)
    }

    pub fn resume(&self) {
        log::info!("PullBackend '{}': resumed", self.device_id);
        self.state.store(STATE_RUNNING, Ordering::Release);
    }

    pub fn suspend(&self) {
        log::info!("PullBackend '{}': suspended", self.device_id);
        self.state.store(STATE_SUSPENDED, Ordering::Release);
    }

    pub fn close(&self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
        if let Ok(mut slot) = self.slot.lock() {
            slot.take();
        }
    }

    /// Renders one block if a renderer is attached; otherwise writes silence.
    pub fn render(&self, deck_a: &[f32], deck_b: &[f32], master_out: &mut [f32], cue_out: &mut [f32]) {
        let rendered = match self.slot.try_lock() {
            Ok(mut slot) => match slot.as_mut() {
                Some(renderer) if self.state() == BackendState::Running => {
                    renderer.render(deck_a, deck_b, master_out, cue_out);
                    true
                }
                _ => false,
            },
            Err(_) => false,
        };
        if !rendered {
            master_out.fill(0.0);
            cue_out.fill(0.0);
        }
    }
}

impl AudioBackend for PullBackend {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn state(&self) -> BackendState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => BackendState::Running,
            STATE_CLOSED => BackendState::Closed,
            _ => BackendState::Suspended,
        }
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn attach(&mut self, renderer: GraphRenderer) -> Result<(), PlaybackError> {
        let mut slot = self.slot.lock().map_err(|_| PlaybackError::GraphAttachError {
            device_id: self.device_id.clone(),
            reason: "renderer slot mutex poisoned".to_string(),
        })?;
        if slot.replace(renderer).is_some() {
            log::info!("PullBackend '{}': replaced previous renderer", self.device_id);
        }
        Ok(())
    }
}
