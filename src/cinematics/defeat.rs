use super::{ms, pause, Cinematics, DEFEAT, FINALE_TRIGGER};
use crate::errors::SequencerError;
use log::warn;
use std::time::Duration;

const LOST_CHALLENGE: &str = "maze";
const AVADA_VFX: &str = "cap7-avada-vfx";
const CURSE: &str = "avada-kedavra-vfx";
const DEFEAT_SECTION: &str = "cap7-derrota";
const PORTRAIT: &str = "imagem-voldemort-final";
const DEFEAT_TEXT: &str = "cap7-derrota-texto";
const CURSE_GREEN: &str = "#00ff66";

impl Cinematics {
    /// The killing curse after the lost chase, the defeat scene, then the
    /// aftermath section where the finale takes over
    pub async fn defeat(&self) -> Result<(), SequencerError> {
        let ticket = self.guard.acquire(DEFEAT)?;
        self.store.complete_challenge(LOST_CHALLENGE);
        self.store.lock_scroll();
        self.progression.hide_arrow();

        self.show(AVADA_VFX, Duration::ZERO);
        self.scroll_to(AVADA_VFX, ms(1000));
        self.effect("avada-kedavra");
        pause(1000).await;
        self.music("8", ms(1000), ms(2000));

        self.show(CURSE, Duration::ZERO);
        pause(2000).await;
        self.hide(CURSE, Duration::ZERO);
        self.surface.flash(CURSE_GREEN, ms(300), ms(500));
        pause(800).await;

        self.hide(AVADA_VFX, Duration::ZERO);
        self.show(DEFEAT_SECTION, ms(2000));
        self.scroll_to(DEFEAT_SECTION, ms(1500));
        self.show(PORTRAIT, ms(2000));
        pause(2000).await;
        self.show(DEFEAT_TEXT, ms(1500));
        pause(5000).await;

        self.hide(PORTRAIT, ms(1500));
        self.hide(DEFEAT_TEXT, ms(1500));
        pause(1500).await;
        self.hide(DEFEAT_SECTION, ms(2000));
        pause(2000).await;

        // Arriving while the ticket is held keeps the arrival hook quiet
        self.show(FINALE_TRIGGER, ms(2000));
        match self.progression.index_of(FINALE_TRIGGER) {
            Some(index) => {
                if let Err(err) = self.progression.go_to_section(index, ms(2000)).await {
                    warn!("[Cinematic] {}", err);
                }
            }
            None => warn!("[Cinematic] section '{}' not found, scroll skipped", FINALE_TRIGGER),
        }
        drop(ticket);
        self.finale().await
    }
}
