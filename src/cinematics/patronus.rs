use super::{ms, pause, Cinematics, PATRONUS};
use crate::errors::SequencerError;
use log::warn;
use std::time::Duration;

const VFX: &str = "cap7-patronus-vfx";
const SPHERE: &str = "patronus-sphere";
const BACKGROUND: &str = "patronus-background";
const PRE_BATTLE: &str = "cap7-pre-batalha";
const FIRST_CHALLENGE: &str = "desafio-lumos";
const SCROLL: Duration = Duration::from_millis(1200);

impl Cinematics {
    /// Expecto Patronum: the sphere of light, the flash, the revealed
    /// Patronus, then battle music and the first battle challenge
    pub async fn patronus(&self) -> Result<(), SequencerError> {
        let _ticket = self.guard.acquire(PATRONUS)?;

        pause(2000).await;
        self.effect("expecto-patronum");
        self.music("7_patronus", ms(1000), ms(2000));
        pause(1000).await;

        self.show(VFX, Duration::ZERO);
        self.show(SPHERE, ms(500));
        pause(4500).await;
        // the sphere expands to fill the screen
        pause(1500).await;
        self.surface.flash("#ffffff", ms(300), ms(1000));
        pause(1000).await;

        self.hide(SPHERE, Duration::ZERO);
        self.show(BACKGROUND, ms(1000));
        pause(3000).await;
        self.hide(VFX, ms(1000));
        pause(1000).await;

        self.show(PRE_BATTLE, ms(1500));
        pause(2000).await;
        self.music("7_batalha", ms(1000), ms(2000));
        pause(3000).await;

        match self.progression.index_of(FIRST_CHALLENGE) {
            Some(index) => {
                if let Err(err) = self.progression.go_to_section(index, SCROLL).await {
                    warn!("[Cinematic] {}", err);
                }
            }
            None => warn!("[Cinematic] section '{}' not found, scroll skipped", FIRST_CHALLENGE),
        }
        Ok(())
    }
}
