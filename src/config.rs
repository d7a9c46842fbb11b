//! Story configuration
//!
//! Timings, music rules, audio tables and section cues. Every group has a
//! `Default` reproducing the shipped experience, and every field may be omitted
//! from a JSON config file.

use crate::scene::AnimationCue;
use crate::types::dialogue::duration_millis;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable that enables debug mode at startup
pub const DEBUG_ENV_VAR: &str = "STORYSCROLL_DEBUG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Delays and bounded waits
    pub timing: TimingConfig,
    /// Automatic music changes
    pub music: MusicConfig,
    /// Bus volumes and asset tables
    pub audio: AudioConfig,
    /// Decorative object animations triggered on arrival at a section index
    pub section_cues: Vec<SectionCue>,
    /// Start with developer shortcuts enabled
    pub debug_mode: bool,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            music: MusicConfig::default(),
            audio: AudioConfig::default(),
            section_cues: vec![
                SectionCue::new(2, "chapeu", AnimationCue::Section(2)),
                SectionCue::new(3, "chapeu", AnimationCue::Section(3)),
                SectionCue::new(4, "chapeu", AnimationCue::Section(4)),
            ],
            debug_mode: std::env::var(DEBUG_ENV_VAR).is_ok(),
        }
    }
}

impl StoryConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(source: &str) -> anyhow::Result<Self> {
        serde_json::from_str(source).context("Failed to parse story configuration")
    }

    /// Load a JSON configuration file
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&source)
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

/// Delays used by the progression controller, dialogue presenter and puzzles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Nominal duration of a programmatic scroll
    #[serde(with = "duration_millis")]
    pub scroll_duration: Duration,
    /// Extra time granted to a scroll before it is considered settled anyway
    #[serde(with = "duration_millis")]
    pub scroll_settle_margin: Duration,
    /// Delay before the arrow appears after arriving at a section
    #[serde(with = "duration_millis")]
    pub arrow_delay: Duration,
    /// Delay before the arrow appears after a challenge unlocks scrolling
    #[serde(with = "duration_millis")]
    pub unlock_arrow_delay: Duration,
    /// How often the controller checks whether dialogue has finished
    #[serde(with = "duration_millis")]
    pub dialogue_poll_interval: Duration,
    /// Upper bound on waiting for dialogue after an unlock
    #[serde(with = "duration_millis")]
    pub unlock_wait_timeout: Duration,
    /// Dialogue box fade in/out
    #[serde(with = "duration_millis")]
    pub dialogue_fade: Duration,
    /// Delay between a batch's last line appearing and its callback
    #[serde(with = "duration_millis")]
    pub dialogue_callback_delay: Duration,
    /// When puzzle hints reveal themselves
    #[serde(with = "duration_millis")]
    pub hint_reveal: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scroll_duration: Duration::from_millis(1200),
            scroll_settle_margin: Duration::from_millis(500),
            arrow_delay: Duration::from_millis(800),
            unlock_arrow_delay: Duration::from_millis(500),
            dialogue_poll_interval: Duration::from_millis(100),
            unlock_wait_timeout: Duration::from_secs(10),
            dialogue_fade: Duration::from_millis(300),
            dialogue_callback_delay: Duration::from_millis(100),
            hint_reveal: Duration::from_secs(120),
        }
    }
}

/// Chapter-keyed music rules of the progression controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Chapters above this keep whatever track is already playing
    pub last_auto_chapter: u32,
    /// Challenges that switch to the battle track when they block progress
    pub battle_challenges: Vec<String>,
    pub battle_track: String,
    #[serde(with = "duration_millis")]
    pub chapter_fade_out: Duration,
    #[serde(with = "duration_millis")]
    pub chapter_fade_in: Duration,
    #[serde(with = "duration_millis")]
    pub battle_fade_out: Duration,
    #[serde(with = "duration_millis")]
    pub battle_fade_in: Duration,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            last_auto_chapter: 7,
            battle_challenges: vec!["lumos".into(), "protego".into(), "maze".into()],
            battle_track: "cap7_batalha".into(),
            chapter_fade_out: Duration::from_millis(500),
            chapter_fade_in: Duration::from_millis(800),
            battle_fade_out: Duration::from_millis(400),
            battle_fade_in: Duration::from_millis(600),
        }
    }
}

/// One entry of the effect table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectAsset {
    pub path: String,
    #[serde(default)]
    pub looping: bool,
}

impl EffectAsset {
    fn once(path: &str) -> Self {
        Self {
            path: path.to_string(),
            looping: false,
        }
    }
}

/// Bus volumes and asset tables of the sound capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub master_volume: f32,
    pub narration_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    /// Narration voice line
    pub narration: String,
    /// Effect name to asset
    pub effects: BTreeMap<String, EffectAsset>,
    /// Track name to looping asset
    pub tracks: BTreeMap<String, String>,
    /// Chapter key (`"3"`, `"7_batalha"`, ...) to track name
    pub chapter_tracks: BTreeMap<String, String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        const SFX: &str = "assets/audio/sfx";
        const MUSIC: &str = "assets/audio/music";

        let mut effects: BTreeMap<String, EffectAsset> = [
            ("coruja", "coruja.mp3"),
            ("clique", "click.mp3"),
            ("progresso", "progresso.mp3"),
            ("tenteNovamente", "erro.mp3"),
            ("trovao", "trovao.mp3"),
            ("voo", "voo.mp3"),
            ("fenix", "fenix.mp3"),
            ("sucesso", "sucesso.mp3"),
            ("erro", "erro.mp3"),
            ("expecto-patronum", "expecto-patronum.mp3"),
            ("luz", "luz.mp3"),
            ("avada-kedavra", "avada-kedavra.mp3"),
            ("whoosh", "whoosh.mp3"),
            ("pagina", "pagina.mp3"),
            ("bau", "bau.mp3"),
            ("penseira", "penseira.mp3"),
        ]
        .into_iter()
        .map(|(name, file)| (name.to_string(), EffectAsset::once(&format!("{SFX}/{file}"))))
        .collect();
        effects.insert(
            "chuva".into(),
            EffectAsset {
                path: format!("{SFX}/chuva.mp3"),
                looping: true,
            },
        );

        let tracks = [
            ("inicio", "intro.mp3"),
            ("cap1", "cap1.mp3"),
            ("cap3", "cap3.mp3"),
            ("cap4", "cap4.mp3"),
            ("cap5", "cap5.mp3"),
            ("cap6", "cap6.mp3"),
            ("cap7_pre", "cap7_pre.mp3"),
            ("cap7_patronus", "cap7_patronus.mp3"),
            ("cap7_batalha", "cap7_batalha.mp3"),
            ("triste", "triste.mp3"),
            ("alegre", "alegre.mp3"),
        ]
        .into_iter()
        .map(|(name, file)| (name.to_string(), format!("{MUSIC}/{file}")))
        .collect();

        let chapter_tracks = [
            ("0", "inicio"),
            ("1", "cap1"),
            ("2", "cap1"),
            ("3", "cap3"),
            ("4", "cap4"),
            ("5", "cap5"),
            ("6", "cap6"),
            ("7", "cap7_pre"),
            ("7_patronus", "cap7_patronus"),
            ("7_batalha", "cap7_batalha"),
            ("8", "triste"),
            ("8_alegre", "alegre"),
        ]
        .into_iter()
        .map(|(chapter, track)| (chapter.to_string(), track.to_string()))
        .collect();

        Self {
            master_volume: 1.0,
            narration_volume: 1.0,
            music_volume: 0.6,
            sfx_volume: 0.8,
            narration: "assets/audio/voice/hat-phase0-voice-0.mp3".into(),
            effects,
            tracks,
            chapter_tracks,
        }
    }
}

/// A decorative object animation fired when a section index is entered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCue {
    pub index: usize,
    pub object: String,
    pub cue: AnimationCue,
}

impl SectionCue {
    pub fn new(index: usize, object: impl Into<String>, cue: AnimationCue) -> Self {
        Self {
            index,
            object: object.into(),
            cue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_timings() {
        let config = StoryConfig::default();
        assert_eq!(config.timing.scroll_duration, Duration::from_millis(1200));
        assert_eq!(config.timing.hint_reveal, Duration::from_secs(120));
        assert_eq!(config.music.last_auto_chapter, 7);
        assert_eq!(config.audio.music_volume, 0.6);
        assert_eq!(config.section_cues.len(), 3);
    }

    #[test]
    fn asset_tables_are_distinct() {
        let audio = AudioConfig::default();
        assert_eq!(audio.effects.len(), 17);
        assert!(audio.effects["chuva"].looping);
        assert_ne!(audio.tracks["cap1"], audio.tracks["cap3"]);
        assert_eq!(audio.chapter_tracks["2"], "cap1");
        assert_eq!(audio.chapter_tracks["8_alegre"], "alegre");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = StoryConfig::from_json(
            r#"{ "timing": { "arrow_delay": 50 }, "debug_mode": true }"#,
        )
        .unwrap();
        assert_eq!(config.timing.arrow_delay, Duration::from_millis(50));
        assert_eq!(config.timing.scroll_duration, Duration::from_millis(1200));
        assert!(config.debug_mode);
        assert_eq!(config.audio.sfx_volume, 0.8);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(StoryConfig::from_json("{ not json").is_err());
    }
}
