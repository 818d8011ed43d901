use anyhow::Result;
use flight_control::{CommandExecutor, CommandId, PilotMetrics};
use intent_matcher::{CommandMatcher, DroneCommand, Intent, NegationPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use voice_input::{CommandSource, Transcript, Translator, VoiceError};

/// Consecutive read failures after which the source is considered dead.
const MAX_IO_ERRORS: u32 = 5;

/// What became of one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Dispatched {
        command: DroneCommand,
        id: CommandId,
    },
    /// A negation under the `ignore` policy
    Negated,
    Unrecognized,
    /// Translation, matching or dispatch failed, or the pilot is shutting down
    Skipped,
}

/// Transcript → English → command → executor.
pub struct Pipeline {
    source: Box<dyn CommandSource>,
    translator: Box<dyn Translator>,
    matcher: Box<dyn CommandMatcher>,
    executor: Arc<CommandExecutor>,
    metrics: Arc<PilotMetrics>,
    negation: NegationPolicy,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn CommandSource>,
        translator: Box<dyn Translator>,
        matcher: Box<dyn CommandMatcher>,
        executor: Arc<CommandExecutor>,
        metrics: Arc<PilotMetrics>,
        negation: NegationPolicy,
    ) -> Self {
        Self {
            source,
            translator,
            matcher,
            executor,
            metrics,
            negation,
            poll_interval: Duration::from_millis(100),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Setting this flag ends [`Pipeline::run`] and blocks further dispatches.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Read and act on utterances until the source runs dry or the stop flag
    /// is set. Returns the number of utterances handled.
    pub fn run(&mut self) -> Result<usize> {
        info!(
            "voice pilot ready: source={}, matcher={}, translator={}",
            self.source.name(),
            self.matcher.name(),
            self.translator.name()
        );
        let mut handled = 0usize;
        let mut io_errors = 0u32;
        while !self.stopping() {
            info!("listening for command...");
            let next = self.source.next_utterance();
            if !matches!(next, Err(VoiceError::Io(_))) {
                io_errors = 0;
            }
            match next {
                Ok(Some(transcript)) => {
                    self.handle(&transcript);
                    handled += 1;
                }
                Ok(None) => {
                    info!("voice source exhausted");
                    break;
                }
                Err(VoiceError::NotUnderstood) => {
                    info!("could not understand the audio");
                }
                Err(e @ VoiceError::Io(_)) => {
                    io_errors += 1;
                    warn!("reading voice source: {}", e);
                    if io_errors >= MAX_IO_ERRORS {
                        return Err(e.into());
                    }
                }
                Err(e) => warn!("voice source: {}", e),
            }
            std::thread::sleep(self.poll_interval);
        }
        Ok(handled)
    }

    pub fn handle(&self, transcript: &Transcript) -> Handled {
        let timer = Instant::now();
        self.metrics.utterances.inc();
        info!("transcribed: {:?} [{}]", transcript.text, transcript.language);

        let english = match self.translator.translate(&transcript.text, &transcript.language) {
            Ok(text) => text,
            Err(e) => {
                warn!("translation failed, skipping utterance: {}", e);
                return Handled::Skipped;
            }
        };
        if english != transcript.text {
            info!("translated: {:?}", english);
        }

        let classification = match self.matcher.classify(&english) {
            Ok(Some(c)) => c,
            Ok(None) => {
                self.metrics.unrecognized.inc();
                info!("command not recognized: {:?}", english);
                debug!("time taken: {:.3}s", timer.elapsed().as_secs_f64());
                return Handled::Unrecognized;
            }
            Err(e) => {
                warn!("{} matcher failed: {}", self.matcher.name(), e);
                return Handled::Skipped;
            }
        };

        let command = match classification.intent {
            Intent::Command(cmd) => {
                self.metrics.recognized.inc();
                info!(
                    "mapped {:?} to {} (confidence {:.2})",
                    classification.text, cmd, classification.confidence
                );
                cmd
            }
            Intent::Negation => {
                self.metrics.negations.inc();
                match self.negation {
                    NegationPolicy::Stop => {
                        info!("negation detected, stopping");
                        DroneCommand::Stop
                    }
                    NegationPolicy::Ignore => {
                        info!("negation detected, command skipped");
                        return Handled::Negated;
                    }
                }
            }
        };

        if self.stopping() {
            info!("shutting down, {} not dispatched", command);
            return Handled::Skipped;
        }
        match self.executor.dispatch(command) {
            Ok(id) => {
                let elapsed = timer.elapsed();
                self.metrics.latency.observe(elapsed.as_secs_f64());
                info!("time taken: {:.3}s", elapsed.as_secs_f64());
                Handled::Dispatched { command, id }
            }
            Err(e) => {
                error!("dispatching {}: {}", command, e);
                Handled::Skipped
            }
        }
    }
}
