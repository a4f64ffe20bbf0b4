use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use story_soundboard_core::{AudioBackend, BackendVoice, Result, SoundboardError};

/// Audio backend over rodio: one output stream for the process, one `Sink`
/// per voice so fires can overlap freely.
pub struct RodioBackend {
    // The stream must stay alive for its sinks to keep playing.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sinks: HashMap<u64, Sink>,
    next_voice: u64,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| SoundboardError::Backend(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
            sinks: HashMap::new(),
            next_voice: 0,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn play(&mut self, path: &Path, volume: f32) -> Result<BackendVoice> {
        let file = BufReader::new(File::open(path)?);
        let source = Decoder::new(file).map_err(|e| SoundboardError::Backend(e.to_string()))?;
        let sink =
            Sink::try_new(&self.handle).map_err(|e| SoundboardError::Backend(e.to_string()))?;
        sink.set_volume(volume);
        sink.append(source);

        let voice = BackendVoice(self.next_voice);
        self.next_voice += 1;
        self.sinks.insert(voice.0, sink);
        Ok(voice)
    }

    fn stop(&mut self, voice: BackendVoice) {
        if let Some(sink) = self.sinks.remove(&voice.0) {
            sink.stop();
        }
    }

    fn is_finished(&self, voice: BackendVoice) -> bool {
        self.sinks.get(&voice.0).map_or(true, |sink| sink.empty())
    }
}
