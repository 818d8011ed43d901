//! Live microphone input.
//!
//! `cpal::Stream` is not `Send`, so the stream is built and kept alive on a
//! dedicated capture thread; samples reach the caller over a channel.

use crate::{CommandSource, Endpointer, EndpointerConfig, Recognizer, Result, Transcript, VoiceError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHUNK_SAMPLES: usize = 2048;

/// Mono 16-bit capture from the default input device.
pub struct MicCapture {
    rx: Receiver<Vec<i16>>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    sample_rate_hz: u32,
}

impl MicCapture {
    pub fn start_default() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();

        let handle = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match open_default_stream(tx) {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Block until asked to stop or the owner goes away.
                let _ = stop_rx.recv();
                drop(stream);
                debug!("microphone stream closed");
            })?;

        let sample_rate_hz = ready_rx
            .recv()
            .map_err(|_| VoiceError::Audio("capture thread exited during setup".into()))??;
        info!("microphone open at {} Hz", sample_rate_hz);

        Ok(Self {
            rx,
            stop_tx,
            handle: Some(handle),
            sample_rate_hz,
        })
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Next chunk of samples; `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<i16>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(VoiceError::Audio("microphone stream ended".into()))
            }
        }
    }

    /// Discard audio captured so far.
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn open_default_stream(tx: Sender<Vec<i16>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| VoiceError::Audio("no default input device".into()))?;
    let config = device
        .default_input_config()
        .map_err(|e| VoiceError::Audio(format!("input config: {e}")))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    let format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();

    let stream = match format {
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, channels, tx)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, channels, tx)?,
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, channels, tx)?,
        other => {
            return Err(VoiceError::Audio(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };
    stream
        .play()
        .map_err(|e| VoiceError::Audio(format!("stream play: {e}")))?;
    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    tx: Sender<Vec<i16>>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = usize::from(channels.max(1));
    let mut buf = Vec::<i16>::with_capacity(CHUNK_SAMPLES * 2);
    device
        .build_input_stream(
            config,
            move |data: &[T], _| {
                // First channel only.
                buf.extend(data.chunks_exact(channels).map(|f| f[0].to_sample::<i16>()));
                if buf.len() >= CHUNK_SAMPLES {
                    let _ = tx.send(std::mem::take(&mut buf));
                }
            },
            |err| warn!("input stream error: {err}"),
            None,
        )
        .map_err(|e| VoiceError::Audio(format!("build input stream: {e}")))
}

/// Microphone + endpointer + recognizer as a [`CommandSource`].
pub struct MicSource<R> {
    capture: MicCapture,
    endpointer: Endpointer,
    recognizer: R,
    language: String,
}

impl<R: Recognizer> MicSource<R> {
    pub fn new(
        capture: MicCapture,
        endpointer: EndpointerConfig,
        recognizer: R,
        language: &str,
    ) -> Self {
        let sample_rate = capture.sample_rate_hz();
        Self {
            capture,
            endpointer: Endpointer::new(endpointer, sample_rate),
            recognizer,
            language: language.to_string(),
        }
    }

    /// Recognize one utterance, then start listening afresh: audio captured
    /// while the recognizer ran is dropped.
    fn transcribe(&mut self, pcm: &[i16]) -> Result<Option<Transcript>> {
        debug!("utterance of {} samples", pcm.len());
        let text = self
            .recognizer
            .recognize(pcm, self.endpointer.sample_rate_hz(), &self.language);
        self.capture.drain();
        self.endpointer.reset();
        let text = text?;
        if text.trim().is_empty() {
            return Err(VoiceError::NotUnderstood);
        }
        Ok(Some(Transcript::new(&text, &self.language)))
    }
}

impl<R: Recognizer> CommandSource for MicSource<R> {
    fn next_utterance(&mut self) -> Result<Option<Transcript>> {
        loop {
            if let Some(utterance) = self.endpointer.poll() {
                return self.transcribe(&utterance);
            }
            match self.capture.recv_timeout(Duration::from_millis(200)) {
                Ok(Some(chunk)) => {
                    if let Some(utterance) = self.endpointer.push(&chunk) {
                        return self.transcribe(&utterance);
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    return match self.endpointer.flush() {
                        Some(utterance) => self.transcribe(&utterance),
                        None => {
                            warn!("{}", e);
                            Ok(None)
                        }
                    };
                }
            }
        }
    }

    fn name(&self) -> &str {
        "mic"
    }
}
