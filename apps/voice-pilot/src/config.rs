use anyhow::{bail, Context, Result};
use flight_control::MotionProfile;
use intent_matcher::{MatcherConfig, MatcherKind};
use serde::{Deserialize, Serialize};
use sim_client::MockConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use voice_input::plugin::{SourceKind, SourceOptions};
use voice_input::{EndpointerConfig, RecognizerConfig, TranslatorConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotConfig {
    /// Language the operator speaks, e.g. `en`, `hi`, `es`
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Replaces the matcher's preset motion profile
    #[serde(default)]
    pub motion: Option<MotionProfile>,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
    /// Pause between utterances
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub mock: MockSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    #[serde(default)]
    pub endpointer: EndpointerConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
}

/// In-process simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSettings {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    #[serde(default = "default_takeoff_altitude_m")]
    pub takeoff_altitude_m: f32,
}

fn default_language() -> String {
    "en".to_string()
}
fn default_capture_dir() -> PathBuf {
    PathBuf::from("captures")
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_tick_ms() -> u64 {
    20
}
fn default_time_scale() -> f32 {
    1.0
}
fn default_takeoff_altitude_m() -> f32 {
    3.0
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            time_scale: default_time_scale(),
            takeoff_altitude_m: default_takeoff_altitude_m(),
        }
    }
}

impl MockSettings {
    pub fn to_mock_config(&self) -> MockConfig {
        MockConfig {
            tick: Duration::from_millis(self.tick_ms),
            time_scale: self.time_scale,
            takeoff_altitude_m: self.takeoff_altitude_m,
            ..MockConfig::default()
        }
    }
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            matcher: MatcherConfig::default(),
            motion: None,
            voice: VoiceConfig::default(),
            capture_dir: default_capture_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            mock: MockSettings::default(),
        }
    }
}

impl PilotConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON (`.json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config: Self = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing yaml: {}", path.display()))?,
            Some("json") => serde_json::from_str(&raw)
                .with_context(|| format!("parsing json: {}", path.display()))?,
            _ => bail!("unsupported config format: {}", path.display()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            bail!("language must not be empty");
        }
        if let Some(motion) = &self.motion {
            motion.validate().context("motion profile")?;
        }
        Ok(())
    }

    /// Motion profile for the given matcher: the configured override or its preset.
    pub fn profile(&self, kind: MatcherKind) -> MotionProfile {
        self.motion
            .clone()
            .unwrap_or_else(|| MotionProfile::for_matcher(kind))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            language: self.language.clone(),
            script_path: self.voice.script_path.clone(),
            phrases: Vec::new(),
            endpointer: self.voice.endpointer.clone(),
            recognizer: self.voice.recognizer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_matcher::{MatchMode, NegationPolicy};

    #[test]
    fn yaml_sections_override_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pilot.yaml");
        fs::write(
            &path,
            "language: hi\n\
             matcher:\n  kind: zero-shot\n  match_mode: word_boundary\n  negation: stop\n\
             voice:\n  source: script\n  endpointer:\n    pause_ms: 500\n  recognizer:\n    token: abc\n\
             mock:\n  time_scale: 10.0\n",
        )?;
        let config = PilotConfig::load(&path)?;
        assert_eq!(config.language, "hi");
        assert_eq!(config.matcher.kind, MatcherKind::ZeroShot);
        assert_eq!(config.matcher.match_mode, MatchMode::WordBoundary);
        assert_eq!(
            config.matcher.negation_policy(MatcherKind::ZeroShot),
            NegationPolicy::Stop
        );
        assert_eq!(config.voice.source, SourceKind::Script);
        assert_eq!(config.voice.endpointer.pause_ms, 500);
        assert_eq!(config.voice.endpointer.energy_threshold, 300.0);
        assert_eq!(config.voice.recognizer.token.as_deref(), Some("abc"));
        assert!(config.voice.recognizer.endpoint.is_empty());
        assert_eq!(config.voice.recognizer.timeout_ms, 10_000);
        assert_eq!(config.mock.time_scale, 10.0);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.profile(MatcherKind::ZeroShot).horizontal_step_m, 50.0);
        Ok(())
    }

    #[test]
    fn json_motion_override() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pilot.json");
        fs::write(
            &path,
            r#"{"motion": {"horizontal_step_m": 2, "vertical_step_m": 1, "speed_m_s": 1,
                "yaw_rate_deg_s": 15, "rotate_duration_s": 2, "movement": "interruptible"}}"#,
        )?;
        let config = PilotConfig::load(&path)?;
        let p = config.profile(MatcherKind::Keyword);
        assert_eq!(p.horizontal_step_m, 2.0);
        assert_eq!(p.stop_brake_s, 1.0);
        Ok(())
    }

    #[test]
    fn unknown_extension_and_bad_values_fail() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let toml = dir.path().join("pilot.toml");
        fs::write(&toml, "language = 'en'")?;
        assert!(PilotConfig::load(&toml).is_err());

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "language: ''\n")?;
        assert!(PilotConfig::load(&bad).is_err());
        Ok(())
    }
}
