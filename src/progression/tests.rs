//! Tests for the progression controller

use super::*;
use crate::audio::AudioBackend;
use crate::config::{AudioConfig, StoryConfig};
use crate::infrastructure::memory::{
    MemoryAudioBackend, MemoryDialogueSurface, MemoryRenderer, MemorySurface, SurfaceEvent,
};
use crate::scene::TimelineObject;
use crate::types::DialogueOptions;

struct Rig {
    controller: Arc<ProgressionController>,
    surface: Arc<MemorySurface>,
    store: Arc<StateStore>,
    backend: Arc<MemoryAudioBackend>,
    dialogue: Arc<DialoguePresenter>,
    renderer: Arc<MemoryRenderer>,
}

fn rig_with(surface: MemorySurface) -> Rig {
    let config = StoryConfig::default();
    let scheduler = Arc::new(Scheduler::new());
    let store = Arc::new(StateStore::default());
    let backend = Arc::new(MemoryAudioBackend::default());
    let audio = Arc::new(AudioManager::new(
        backend.clone(),
        AudioConfig::default(),
        store.clone(),
        scheduler.clone(),
    ));
    let dialogue = DialoguePresenter::new(
        Arc::new(MemoryDialogueSurface::default()),
        audio.clone(),
        scheduler.clone(),
        &config.timing,
    );
    let renderer = Arc::new(MemoryRenderer::default());
    let scene = Arc::new(SceneManager::new(store.clone(), scheduler.clone()));
    scene.add(Arc::new(TimelineObject::hat(renderer.clone())));
    let surface = Arc::new(surface);
    let controller = ProgressionController::new(
        surface.clone(),
        store.clone(),
        audio,
        dialogue.clone(),
        scene,
        scheduler,
        config.timing,
        config.music,
        config.section_cues,
    );
    Rig {
        controller,
        surface,
        store,
        backend,
        dialogue,
        renderer,
    }
}

fn rig(sections: Vec<Section>) -> Rig {
    let rig = rig_with(MemorySurface::new(sections));
    rig.controller.initialize().unwrap();
    rig
}

fn plain(ids: &[&str]) -> Vec<Section> {
    ids.iter().map(|id| Section::new(*id)).collect()
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test(start_paused = true)]
async fn initialize_requires_sections() {
    let rig = rig_with(MemorySurface::new(Vec::new()));
    assert_eq!(rig.controller.initialize(), Err(ProgressError::NoSections));
    assert_eq!(rig.controller.phase(), Phase::Idle);
    assert_eq!(
        rig.controller.attempt_advance().await,
        Err(ProgressError::NotInitialized)
    );
}

#[tokio::test(start_paused = true)]
async fn initialize_prepares_the_surface() {
    let rig = rig(plain(&["inicio", "cap1"]));
    assert_eq!(rig.controller.phase(), Phase::AtSection(0));
    assert!(!rig.surface.native_scroll());
    assert_eq!(rig.surface.arrow_visible(), Some(false));
    assert_eq!(rig.surface.active_contents(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn arrival_deactivates_earlier_sections_and_shows_arrow_later() {
    let rig = rig(plain(&["a", "b", "c"]));
    assert_eq!(rig.controller.attempt_advance().await, Ok(Advance::Moved(1)));
    assert_eq!(rig.surface.active_contents(), vec![1]);
    assert_eq!(rig.surface.position(), 1);
    assert!(!rig.surface.native_scroll());
    assert!(!rig.controller.arrow_visible());

    tokio::time::sleep(ms(801)).await;
    assert!(rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn content_activates_before_the_scroll() {
    let rig = rig(plain(&["a", "b"]));
    rig.surface.clear_events();
    rig.controller.go_to_section(1, ms(1200)).await.unwrap();
    let events = rig.surface.events();
    let activate = events
        .iter()
        .position(|e| *e == SurfaceEvent::ContentActive { index: 1, active: true })
        .unwrap();
    let scroll = events
        .iter()
        .position(|e| *e == SurfaceEvent::ScrollTo(1))
        .unwrap();
    assert!(activate < scroll);
}

#[tokio::test(start_paused = true)]
async fn last_section_never_shows_the_arrow() {
    let rig = rig(plain(&["a", "b"]));
    rig.controller.attempt_advance().await.unwrap();
    tokio::time::sleep(ms(2000)).await;
    assert!(!rig.controller.arrow_visible());
    assert_eq!(rig.controller.attempt_advance().await, Ok(Advance::End));
    assert_eq!(rig.controller.current_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_index_is_rejected_without_side_effects() {
    let rig = rig(plain(&["a", "b"]));
    rig.surface.clear_events();
    assert_eq!(
        rig.controller.go_to_section(2, ms(1200)).await,
        Err(ProgressError::InvalidIndex { index: 2, count: 2 })
    );
    assert_eq!(rig.controller.current_index(), 0);
    assert_eq!(rig.controller.phase(), Phase::AtSection(0));
    assert!(rig.surface.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn blocked_advance_only_shakes() {
    let rig = rig(vec![Section::new("a").requiring("codigo"), Section::new("b")]);
    assert_eq!(
        rig.controller.attempt_advance().await,
        Ok(Advance::Blocked("codigo".into()))
    );
    for _ in 0..3 {
        assert_eq!(rig.controller.attempt_advance().await, Ok(Advance::Refused));
    }
    assert_eq!(rig.controller.current_index(), 0);
    assert_eq!(rig.surface.shakes(), 3);
    assert!(rig.store.scroll_locked());
    assert_eq!(rig.store.current_challenge().as_deref(), Some("codigo"));
    assert!(!rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn scroll_that_never_settles_is_bounded() {
    let rig = rig_with(MemorySurface::new(plain(&["a", "b", "c"])).never_settling());
    rig.controller.initialize().unwrap();

    let started = tokio::time::Instant::now();
    rig.controller.go_to_section(1, ms(1200)).await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= ms(1700) && elapsed < ms(1710), "{elapsed:?}");
    assert_eq!(rig.controller.phase(), Phase::AtSection(1));
    assert!(!rig.surface.native_scroll());
}

#[tokio::test(start_paused = true)]
async fn chapter_tags_drive_the_music() {
    let rig = rig(vec![
        Section::new("inicio"),
        Section::new("cap3").with_chapter(3),
        Section::new("cap3-b").with_chapter(3),
        Section::new("cap8").with_chapter(8),
        Section::new("fim"),
    ]);
    rig.controller.attempt_advance().await.unwrap();
    assert_eq!(rig.store.current_chapter(), 3);
    assert_eq!(rig.store.current_music_track().as_deref(), Some("cap3"));

    rig.backend.clear_events();
    rig.controller.attempt_advance().await.unwrap();
    assert!(rig.backend.events().is_empty());

    rig.controller.attempt_advance().await.unwrap();
    assert_eq!(rig.store.current_chapter(), 8);
    assert!(rig.store.is_unlocked(8));
    assert_eq!(rig.store.current_music_track().as_deref(), Some("cap3"));
}

#[tokio::test(start_paused = true)]
async fn battle_challenges_switch_to_the_battle_track() {
    let rig = rig(vec![
        Section::new("cap7").with_chapter(7),
        Section::new("desafio-lumos").requiring("lumos"),
        Section::new("fim"),
    ]);
    rig.controller.attempt_advance().await.unwrap();
    assert_eq!(rig.controller.phase(), Phase::Blocked(1));
    assert_eq!(rig.store.current_music_track().as_deref(), Some("cap7_batalha"));
}

#[tokio::test(start_paused = true)]
async fn unlock_waits_for_dialogue_before_the_arrow() {
    let rig = rig(vec![
        Section::new("a"),
        Section::new("b").requiring("codigo"),
        Section::new("c"),
    ]);
    rig.controller.attempt_advance().await.unwrap();
    assert!(rig.controller.is_blocked());

    rig.dialogue.say("Correto!", DialogueOptions::default().silent());
    rig.store.complete_challenge("codigo");
    rig.store.unlock_scroll();
    assert_eq!(rig.controller.phase(), Phase::AtSection(1));

    tokio::time::sleep(ms(3000)).await;
    assert!(!rig.controller.arrow_visible());

    rig.dialogue.advance();
    // next poll within 100ms, then 500ms
    tokio::time::sleep(ms(601)).await;
    assert!(rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn unlock_gives_up_waiting_after_the_bound() {
    let rig = rig(vec![
        Section::new("a").requiring("codigo"),
        Section::new("b"),
    ]);
    rig.controller.attempt_advance().await.unwrap();
    rig.dialogue.say("...", DialogueOptions::default().silent());
    rig.store.unlock_scroll();

    tokio::time::sleep(ms(10_000)).await;
    assert!(!rig.controller.arrow_visible());
    tokio::time::sleep(ms(600)).await;
    assert!(rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn arrival_while_dialogue_is_active_defers_the_arrow() {
    let rig = rig(plain(&["a", "b", "c"]));
    rig.dialogue.say("...", DialogueOptions::default().silent());
    rig.controller.attempt_advance().await.unwrap();

    tokio::time::sleep(ms(2000)).await;
    assert!(!rig.controller.arrow_visible());
    rig.dialogue.advance();
    tokio::time::sleep(ms(1000)).await;
    assert!(rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn arrival_effects_play_once() {
    let rig = rig(plain(&["a", "cap4", "b"]));
    rig.controller.attempt_advance().await.unwrap();
    rig.controller.go_to_section(0, ms(100)).await.unwrap();
    rig.controller.go_to_section(1, ms(100)).await.unwrap();
    let pensieve = rig
        .backend
        .played()
        .iter()
        .filter(|asset| asset.ends_with("penseira.mp3"))
        .count();
    assert_eq!(pensieve, 1);
}

#[tokio::test(start_paused = true)]
async fn rain_follows_the_post_defeat_section() {
    let rig = rig(plain(&["a", "cap8-pos-derrota", "cap8-revelacao"]));
    let rain = "assets/audio/sfx/chuva.mp3";
    rig.controller.attempt_advance().await.unwrap();
    assert!(rig.backend.is_playing(rain));
    rig.controller.go_to_section(2, ms(100)).await.unwrap();
    assert!(!rig.backend.is_playing(rain));
}

#[tokio::test(start_paused = true)]
async fn section_cues_animate_the_hat() {
    let rig = rig(plain(&["a", "b", "c", "d"]));
    rig.controller.go_to_section(2, ms(100)).await.unwrap();
    tokio::time::sleep(ms(1300)).await;
    let hat = rig.renderer.last_transform("chapeu").unwrap();
    assert!((hat.position[0] - -0.65).abs() < 1e-4);
}

#[tokio::test(start_paused = true)]
async fn jump_requires_debug_mode() {
    let rig = rig(plain(&["a", "b", "c"]));
    assert_eq!(
        rig.controller.jump_to(2).await,
        Err(ProgressError::DebugModeRequired)
    );
    rig.store.toggle_debug();
    rig.controller.jump_to(2).await.unwrap();
    assert_eq!(rig.controller.current_index(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_unlock_shows_the_arrow() {
    let rig = rig(vec![Section::new("a").requiring("limite"), Section::new("b")]);
    rig.controller.attempt_advance().await.unwrap();
    rig.controller.unlock_and_show_arrow();
    assert!(rig.controller.arrow_visible());
    assert!(!rig.store.scroll_locked());
    assert_eq!(rig.controller.phase(), Phase::AtSection(0));
}

#[tokio::test(start_paused = true)]
async fn destroy_restores_scrolling_and_stops_listening() {
    let rig = rig(vec![Section::new("a").requiring("codigo"), Section::new("b")]);
    rig.controller.attempt_advance().await.unwrap();
    rig.controller.destroy();

    assert!(rig.surface.native_scroll());
    assert_eq!(rig.surface.arrow_visible(), None);
    assert_eq!(rig.controller.phase(), Phase::Idle);

    rig.store.unlock_scroll();
    tokio::time::sleep(ms(2000)).await;
    assert!(!rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn arrival_hooks_see_settled_sections() {
    let rig = rig(plain(&["a", "b", "c"]));
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let seen = arrivals.clone();
    rig.controller
        .on_arrival(move |index, section| lock(&seen).push((index, section.id.clone())));

    rig.controller.go_to_section(2, ms(100)).await.unwrap();
    rig.controller.go_to_section(1, ms(100)).await.unwrap();
    assert_eq!(
        *lock(&arrivals),
        vec![(2, "c".to_string()), (1, "b".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn challenge_completed_beforehand_does_not_block() {
    let rig = rig(vec![
        Section::new("inicio"),
        Section::new("cap1").with_chapter(1).requiring("lumos"),
        Section::new("fim"),
    ]);
    rig.store.complete_challenge("lumos");

    assert_eq!(rig.controller.attempt_advance().await, Ok(Advance::Moved(1)));
    assert_eq!(rig.controller.phase(), Phase::AtSection(1));
    assert!(!rig.store.scroll_locked());
    assert_eq!(rig.store.current_challenge(), None);

    tokio::time::sleep(ms(799)).await;
    assert!(!rig.controller.arrow_visible());
    tokio::time::sleep(ms(2)).await;
    assert!(rig.controller.arrow_visible());
}

#[tokio::test(start_paused = true)]
async fn arrivals_during_one_dialogue_share_the_arrow_reveal() {
    let rig = rig(plain(&["s0", "s1", "s2", "s3"]));
    rig.dialogue.say("long line", DialogueOptions::default().silent());
    rig.controller.go_to_section(1, ms(100)).await.unwrap();
    rig.controller.go_to_section(2, ms(100)).await.unwrap();
    assert!(!rig.controller.arrow_visible());

    rig.dialogue.advance();
    assert!(!rig.dialogue.is_active());
    tokio::time::sleep(ms(20_000)).await;
    assert_eq!(rig.controller.phase(), Phase::AtSection(2));
    assert!(rig.controller.arrow_visible());
}
