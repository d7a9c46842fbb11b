//! Chapter 8: the aftermath scenes, the Resurrection Stone and the
//! post-credits epilogue it unlocks

use super::{ms, pause, Cinematics, FINALE, POST_CREDITS};
use crate::errors::SequencerError;
use crate::lock;
use log::{debug, info};
use std::time::Duration;

/// State of the Resurrection Stone prop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stone {
    Hidden,
    /// Shown and clickable
    Ready,
    Used,
}

struct Scene {
    section: &'static str,
    image: Option<&'static str>,
}

const SCENES: [Scene; 4] = [
    Scene {
        section: "cap8-pos-derrota",
        image: None,
    },
    Scene {
        section: "cap8-revelacao",
        image: Some("cap8-revelacao-imagem"),
    },
    Scene {
        section: "cap8-sacrificio",
        image: Some("cap8-sacrificio-imagem"),
    },
    Scene {
        section: "cap8-vitoria",
        image: None,
    },
];

const STONE_SECTION: &str = "cap8-pedra";
const STONE_BUTTON: &str = "btn-pedra-ressurreicao";
const POST_CREDITS_SECTION: &str = "cap8-pos-creditos";
const EPILOGUE: &str = "texto-epilogo";
const EPILOGUE_LINES: [&str; 4] = [
    "Você chegou até aqui.",
    "Não porque acertou tudo.",
    "Nem porque foi forte o bastante.",
    "Mas porque permaneceu.",
];
const VERSE: &str = "texto-vida-nova";
const VERSE_LINES: [&str; 2] = ["Apocalipse 21:5", "\"Eis que faço novas todas as coisas.\""];
const CLOSING_IMAGE: &str = "imagem-pos-creditos";

/// Paragraph `n` of a section
pub fn paragraph(section: &str, n: usize) -> String {
    format!("{section}-texto-{n}")
}

impl Cinematics {
    pub fn stone(&self) -> Stone {
        *lock(&self.stone)
    }

    /// The four aftermath scenes, then the stone
    pub async fn finale(&self) -> Result<(), SequencerError> {
        let ticket = self.guard.acquire(FINALE)?;
        self.store.lock_scroll();
        self.progression.hide_arrow();

        for scene in &SCENES {
            self.play_scene(scene).await;
        }

        self.show(STONE_SECTION, ms(2000));
        self.reveal_paragraphs(STONE_SECTION, ms(1500), 2000).await;
        self.show(STONE_BUTTON, ms(2000));

        drop(ticket);
        *lock(&self.stone) = Stone::Ready;
        info!("[Cinematic] the stone is waiting");
        Ok(())
    }

    async fn play_scene(&self, scene: &Scene) {
        debug!("[Cinematic] scene '{}'", scene.section);
        if let Some(image) = scene.image {
            if self.show(image, ms(1500)) {
                pause(2000).await;
            }
        }
        self.show(scene.section, ms(1500));
        self.reveal_paragraphs(scene.section, ms(1000), 2000).await;
        pause(4000).await;
        self.hide(scene.section, ms(1500));
        pause(1500).await;
    }

    /// Fade paragraphs in one by one until the next one is missing
    async fn reveal_paragraphs(&self, section: &str, fade: Duration, hold: u64) {
        for n in 0.. {
            let id = paragraph(section, n);
            if self.surface.set_element_visible(&id, true, fade).is_err() {
                debug!("[Cinematic] '{}' has {} paragraphs", section, n);
                return;
            }
            pause(hold).await;
        }
    }

    /// Click on the stone; false unless it is showing and unused
    pub async fn use_stone(&self) -> Result<bool, SequencerError> {
        {
            let mut stone = lock(&self.stone);
            if *stone != Stone::Ready {
                debug!("[Cinematic] stone is {:?}, click ignored", *stone);
                return Ok(false);
            }
            *stone = Stone::Used;
        }
        self.post_credits().await?;
        Ok(true)
    }

    async fn post_credits(&self) -> Result<(), SequencerError> {
        let _ticket = self.guard.acquire(POST_CREDITS)?;
        self.effect("luz");
        self.music("8_alegre", ms(2000), ms(3000));
        self.audio.stop_effect("chuva");

        self.hide(STONE_SECTION, ms(1000));
        pause(1000).await;
        self.show(POST_CREDITS_SECTION, ms(2000));
        pause(2500).await;

        self.unfold(EPILOGUE, &EPILOGUE_LINES, 3000).await;
        self.unfold(VERSE, &VERSE_LINES, 4000).await;

        self.show(CLOSING_IMAGE, ms(2500));
        pause(3000).await;
        info!("[Cinematic] the end");
        Ok(())
    }

    /// Grow a text block a line per second, hold it, then fade it away
    async fn unfold(&self, id: &str, lines: &[&str], hold: u64) {
        self.show(id, ms(2000));
        for shown in 1..=lines.len() {
            pause(1000).await;
            self.set_text(id, &lines[..shown].join("\n"));
        }
        pause(hold).await;
        self.hide(id, ms(1500));
        pause(2000).await;
    }
}
