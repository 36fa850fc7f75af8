//! Background sound started alongside the first session.

use crate::config::AudioConfig;

/// One looping sound the host should start.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub src: String,
    /// 0.0 to 1.0
    pub volume: f32,
    pub looping: bool,
}

impl Track {
    fn looping(src: &str, volume: f32) -> Self {
        Self { src: src.to_string(), volume: volume.clamp(0.0, 1.0), looping: true }
    }
}

/// Ambience first, then the soundtrack.
pub fn soundscape(config: &AudioConfig) -> Vec<Track> {
    if config.muted {
        return Vec::new();
    }
    vec![
        Track::looping(&config.ambience, config.ambience_volume),
        Track::looping(&config.soundtrack, config.soundtrack_volume),
    ]
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use tracing::{debug, warn};
    use web_sys::HtmlAudioElement;

    use super::Track;

    /// Start every track. A blocked or missing file is logged and skipped.
    pub fn play_all(tracks: &[Track]) {
        for track in tracks {
            let audio = match HtmlAudioElement::new_with_src(&track.src) {
                Ok(audio) => audio,
                Err(e) => {
                    warn!(src = %track.src, error = ?e, "cannot create audio element");
                    continue;
                }
            };
            audio.set_loop(track.looping);
            audio.set_volume(track.volume as f64);
            if let Err(e) = audio.play() {
                warn!(src = %track.src, error = ?e, "audio playback refused");
                continue;
            }
            debug!(src = %track.src, "audio started");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_soundscape_is_quiet_and_looping() {
        let tracks = soundscape(&AudioConfig::default());
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].src.ends_with("ambience.mp3"));
        assert_eq!(tracks[0].volume, 0.25);
        assert_eq!(tracks[1].volume, 0.09);
        assert!(tracks.iter().all(|t| t.looping));
    }

    #[test]
    fn muted_plays_nothing() {
        let config = AudioConfig { muted: true, ..Default::default() };
        assert!(soundscape(&config).is_empty());
    }
}
