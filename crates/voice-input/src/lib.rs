//! voice-input: where spoken drone commands come from
//!
//! A [`CommandSource`] yields one lowercased [`Transcript`] per utterance.
//! Sources range from scripted phrase lists (mock) and typed lines to live
//! microphone capture, which is segmented by the energy-based [`Endpointer`]
//! and transcribed by a [`Recognizer`]. A [`Translator`] brings transcripts
//! into English before they reach a command matcher.

mod types;
pub use types::{EndpointerConfig, RecognizerConfig, Transcript, TranslatorConfig, TranslatorKind};

mod error;
pub use error::{Result, VoiceError};

mod traits;
pub use traits::{CommandSource, Recognizer, Translator};

mod endpoint;
pub use endpoint::{rms, Endpointer};

mod source;
pub use source::LineSource;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::ScriptedSource;

mod translate;
pub use translate::Passthrough;
#[cfg(feature = "http")]
pub use translate::HttpTranslator;

#[cfg(feature = "http")]
mod recognizer;
#[cfg(feature = "http")]
pub use recognizer::{encode_wav, HttpRecognizer};

#[cfg(feature = "audio")]
pub mod mic;

pub mod plugin;
