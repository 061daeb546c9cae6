pub mod chime;

use chime::Chime;

use anyhow::{anyhow, Result};
use log::warn;
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

enum AudioCommand {
    PlayChime,
    Stop,
}

/// Handle to the audio thread. The output stream is not `Send`, so it lives
/// on its own thread and is driven through a channel.
#[derive(Clone)]
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    volume: Arc<Mutex<f32>>,
}

impl AudioEngineHandle {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            volume: Arc::new(Mutex::new(volume.clamp(0.0, 1.0))),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut slot = self.tx.lock().map_err(|e| anyhow!(e.to_string()))?;
        if let Some(tx) = slot.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = Arc::clone(&self.volume);

        thread::Builder::new()
            .name("audio-chime".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayChime => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                // No device: the card is still shown, just silently.
                                warn!("{err}");
                                continue;
                            }
                            let level = volume.lock().map(|v| *v).unwrap_or(1.0);
                            if let Some(ref s) = sink {
                                s.append(Chime::new(level));
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })?;

        *slot = Some(tx.clone());
        Ok(tx)
    }

    pub fn play_chime(&self) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PlayChime)
            .map_err(|e| anyhow!("audio thread gone: {e}"))
    }

    /// Silence anything still playing. Does not spin up the audio thread.
    pub fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }
}
