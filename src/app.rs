//! Application entrypoint
//!
//! [`Journey`] builds every story service once and hands them to each other
//! by reference. The capabilities it is given are the only way the story
//! touches the outside world.

use crate::audio::{AudioBackend, AudioManager};
use crate::cinematics::Cinematics;
use crate::config::StoryConfig;
use crate::debug::DebugConsole;
use crate::dialogue::DialoguePresenter;
use crate::progression::ProgressionController;
use crate::puzzles::{
    CardSelectionPuzzle, ChallengeContext, ChaseGame, CodeWordPuzzle, DefenseGame, FlightGame,
    JigsawPuzzle, LightSequenceGame, LimitPuzzle, OrderingPuzzle, QualitiesPuzzle, QuizPuzzle,
    RiddikulusPuzzle, SlidingPuzzle,
};
use crate::scene::{AnimationCue, Renderer, SceneManager, TimelineObject};
use crate::lock;
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use crate::surface::{DialogueSurface, PresentationSurface};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const START_BUTTON: &str = "btn-iniciar";
const NARRATOR: &str = "chapeu";

/// What the host provides
#[derive(Clone)]
pub struct Capabilities {
    pub surface: Arc<dyn PresentationSurface>,
    pub dialogue: Arc<dyn DialogueSurface>,
    pub audio: Arc<dyn AudioBackend>,
    pub renderer: Arc<dyn Renderer>,
}

/// Every challenge handler of the story
pub struct Puzzles {
    pub codigo: CodeWordPuzzle,
    pub obliviate: CodeWordPuzzle,
    pub aruossav: CodeWordPuzzle,
    pub ordenar_frase: OrderingPuzzle,
    pub qualidades: QualitiesPuzzle,
    pub riddikulus: RiddikulusPuzzle,
    pub memorias_cronologia: OrderingPuzzle,
    pub memoria: Arc<CardSelectionPuzzle>,
    pub escolha: Arc<QuizPuzzle>,
    pub ortografia: Arc<QuizPuzzle>,
    pub expecto_patronum: Arc<QuizPuzzle>,
    pub wingardium_leviosa: Arc<QuizPuzzle>,
    pub pai_nosso_1: Arc<QuizPuzzle>,
    pub pai_nosso_2: Arc<QuizPuzzle>,
    pub memorias_quiz: Arc<QuizPuzzle>,
    pub sliding: Arc<SlidingPuzzle>,
    pub jigsaw: Arc<JigsawPuzzle>,
    pub limit: Arc<LimitPuzzle>,
    pub lumos: Arc<LightSequenceGame>,
    pub protego: Arc<DefenseGame>,
    pub flight: Arc<FlightGame>,
    pub maze: Arc<ChaseGame>,
}

impl Puzzles {
    fn new(ctx: &Arc<ChallengeContext>) -> Self {
        Self {
            codigo: CodeWordPuzzle::codigo(ctx.clone()),
            obliviate: CodeWordPuzzle::obliviate(ctx.clone()),
            aruossav: CodeWordPuzzle::aruossav(ctx.clone()),
            ordenar_frase: OrderingPuzzle::ordenar_frase(ctx.clone()),
            qualidades: QualitiesPuzzle::new(ctx.clone()),
            riddikulus: RiddikulusPuzzle::new(ctx.clone()),
            memorias_cronologia: OrderingPuzzle::memorias_cronologia(ctx.clone()),
            memoria: CardSelectionPuzzle::memoria(ctx.clone()),
            escolha: QuizPuzzle::escolha(ctx.clone()),
            ortografia: QuizPuzzle::ortografia(ctx.clone()),
            expecto_patronum: QuizPuzzle::expecto_patronum(ctx.clone()),
            wingardium_leviosa: QuizPuzzle::wingardium_leviosa(ctx.clone()),
            pai_nosso_1: QuizPuzzle::pai_nosso_1(ctx.clone()),
            pai_nosso_2: QuizPuzzle::pai_nosso_2(ctx.clone()),
            memorias_quiz: QuizPuzzle::memorias_quiz(ctx.clone()),
            sliding: SlidingPuzzle::new(ctx.clone()),
            jigsaw: JigsawPuzzle::new(ctx.clone()),
            limit: LimitPuzzle::new(ctx.clone()),
            lumos: LightSequenceGame::new(ctx.clone()),
            protego: DefenseGame::new(ctx.clone()),
            flight: FlightGame::new(ctx.clone()),
            maze: ChaseGame::new(ctx.clone()),
        }
    }

    pub fn code_word(&self, challenge: &str) -> Option<&CodeWordPuzzle> {
        [&self.codigo, &self.obliviate, &self.aruossav]
            .into_iter()
            .find(|p| p.id() == challenge)
    }

    pub fn quiz(&self, challenge: &str) -> Option<&Arc<QuizPuzzle>> {
        [
            &self.escolha,
            &self.ortografia,
            &self.expecto_patronum,
            &self.wingardium_leviosa,
            &self.pai_nosso_1,
            &self.pai_nosso_2,
            &self.memorias_quiz,
        ]
        .into_iter()
        .find(|q| q.id() == challenge)
    }

    /// The challenge's section came into view
    fn presented(&self, challenge: &str) {
        if let Some(puzzle) = self.code_word(challenge) {
            puzzle.start();
        }
    }
}

pub struct Journey {
    config: StoryConfig,
    capabilities: Capabilities,
    pub store: Arc<StateStore>,
    pub scheduler: Arc<Scheduler>,
    pub audio: Arc<AudioManager>,
    pub dialogue: Arc<DialoguePresenter>,
    pub scene: Arc<SceneManager>,
    pub progression: Arc<ProgressionController>,
    pub cinematics: Arc<Cinematics>,
    challenges: Arc<ChallengeContext>,
    /// Swapped for fresh handlers on reset; shared with the arrival hook
    puzzles: Arc<Mutex<Arc<Puzzles>>>,
    pub debug: DebugConsole,
    initialized: AtomicBool,
    started: AtomicBool,
}

impl Journey {
    pub fn new(config: StoryConfig, capabilities: Capabilities) -> Self {
        let scheduler = Arc::new(Scheduler::new());
        let store = Arc::new(StateStore::new(config.debug_mode));
        let audio = Arc::new(AudioManager::new(
            capabilities.audio.clone(),
            config.audio.clone(),
            store.clone(),
            scheduler.clone(),
        ));
        let dialogue = DialoguePresenter::new(
            capabilities.dialogue.clone(),
            audio.clone(),
            scheduler.clone(),
            &config.timing,
        );
        let scene = Arc::new(SceneManager::new(store.clone(), scheduler.clone()));
        let progression = ProgressionController::new(
            capabilities.surface.clone(),
            store.clone(),
            audio.clone(),
            dialogue.clone(),
            scene.clone(),
            scheduler.clone(),
            config.timing.clone(),
            config.music.clone(),
            config.section_cues.clone(),
        );
        let cinematics = Cinematics::new(
            capabilities.surface.clone(),
            audio.clone(),
            store.clone(),
            progression.clone(),
            scheduler.clone(),
        );
        let challenges = ChallengeContext::new(
            store.clone(),
            audio.clone(),
            dialogue.clone(),
            capabilities.surface.clone(),
            scheduler.clone(),
            &config.timing,
        );
        let puzzles = Arc::new(Mutex::new(Arc::new(Puzzles::new(&challenges))));
        let debug = DebugConsole::new(
            store.clone(),
            progression.clone(),
            audio.clone(),
            config.music.clone(),
        );

        Self {
            config,
            capabilities,
            store,
            scheduler,
            audio,
            dialogue,
            scene,
            progression,
            cinematics,
            challenges,
            puzzles,
            debug,
            initialized: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// The challenge handlers of the current run
    pub fn puzzles(&self) -> Arc<Puzzles> {
        lock(&self.puzzles).clone()
    }

    /// Register the props hidden, prepare the dialogue box and wire the
    /// sequences that follow section arrivals and the lost chase; only the
    /// first call does anything
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("[Journey] already initialized");
            return;
        }
        let renderer = &self.capabilities.renderer;
        for object in [
            TimelineObject::hat(renderer.clone()),
            TimelineObject::chest(renderer.clone()),
            TimelineObject::pensieve(renderer.clone()),
            TimelineObject::wand(renderer.clone()),
            TimelineObject::phoenix(renderer.clone()),
        ] {
            self.scene.add(Arc::new(object));
        }
        self.scene.hide_all();
        self.capabilities.dialogue.set_box_visible(false);

        self.cinematics.attach();
        let store = self.store.clone();
        let puzzles = Arc::downgrade(&self.puzzles);
        self.progression.on_arrival(move |_, section| {
            let Some(challenge) = section.requires.as_deref() else {
                return;
            };
            if store.is_challenge_complete(challenge) {
                return;
            }
            store.set_current_challenge(Some(challenge));
            if let Some(puzzles) = puzzles.upgrade() {
                let current = lock(&puzzles).clone();
                current.presented(challenge);
            }
        });
        self.wire_defeat();
        info!("[Journey] initialized");
    }

    fn wire_defeat(&self) {
        let cinematics = Arc::downgrade(&self.cinematics);
        self.puzzles().maze.on_caught(move || {
            if let Some(cinematics) = cinematics.upgrade() {
                cinematics.spawn(|c| async move { c.defeat().await });
            }
        });
    }

    /// "Start Journey"; false when already started
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("[Journey] already started");
            return false;
        }
        info!("[Journey] starting");
        if let Err(err) = self.capabilities.surface.set_element_visible(
            START_BUTTON,
            false,
            Duration::from_millis(500),
        ) {
            debug!("[Journey] {}", err);
        }
        if let Err(err) = self
            .audio
            .switch_track("inicio", Duration::ZERO, Duration::from_millis(2000))
        {
            debug!("[Journey] {}", err);
        }
        if let Err(err) = self.progression.initialize() {
            error!("[Journey] {}", err);
            return true;
        }

        let progression = self.progression.clone();
        let scroll = self.config.timing.scroll_duration;
        match self.scene.get(NARRATOR) {
            Some(_) => {
                self.scene.show(NARRATOR);
                self.audio.play_narration(None);
                let entrance = self.scene.animate(NARRATOR, AnimationCue::Entrance);
                let scene = self.scene.clone();
                self.scheduler.spawn(async move {
                    if let Some(entrance) = entrance {
                        if !entrance.finished().await {
                            debug!("[Journey] entrance interrupted");
                        }
                    }
                    scene.animate(NARRATOR, AnimationCue::Section(1));
                    if let Err(err) = progression.go_to_section(1, scroll).await {
                        warn!("[Journey] {}", err);
                    }
                });
            }
            None => {
                warn!("[Journey] narrator '{}' missing, skipping the entrance", NARRATOR);
                self.scheduler.spawn(async move {
                    if let Err(err) = progression.go_to_section(1, scroll).await {
                        warn!("[Journey] {}", err);
                    }
                });
            }
        }
        self.store.set_current_chapter(1);
        true
    }

    /// Back to the state before "Start Journey". Running games stop with the
    /// scheduler and every challenge handler is replaced by a fresh one.
    pub fn reset(&self) {
        info!("[Journey] reset");
        self.audio.stop_all();
        self.progression.destroy();
        self.scene.hide_all();
        self.dialogue.clear();
        self.scheduler.abort_all();
        self.store.reset();
        self.cinematics.reset();
        *lock(&self.puzzles) = Arc::new(Puzzles::new(&self.challenges));
        self.wire_defeat();
        self.started.store(false, Ordering::SeqCst);
    }
}
