//! Dialogue presenter
//!
//! A FIFO of narrative lines shown one at a time. A line may play the
//! narration voice, show a continue button, and advance by itself. The
//! completion callback of an entry fires shortly after it is displayed, and
//! only when no other line is waiting behind it at that moment, so a batch
//! enqueued together reports completion once.

use crate::audio::AudioManager;
use crate::config::TimingConfig;
use crate::lock;
use crate::scheduler::Scheduler;
use crate::surface::DialogueSurface;
use crate::types::{Callback, ChoiceOption, DialogueEntry, DialogueOptions, ToastKind};
use log::{debug, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Receives the chosen option index and its value (the index when it has none)
pub type ChoiceCallback = Box<dyn FnOnce(usize, Value) + Send + 'static>;

struct PendingChoice {
    options: Vec<ChoiceOption>,
    callback: ChoiceCallback,
}

#[derive(Default)]
struct Queue {
    entries: VecDeque<DialogueEntry>,
    processing: bool,
    /// The box is faded in
    open: bool,
    /// Bumped on every displayed line and on close; stale timers compare it
    generation: u64,
    choice: Option<PendingChoice>,
    next_toast: u64,
}

pub struct DialoguePresenter {
    me: Weak<DialoguePresenter>,
    surface: Arc<dyn DialogueSurface>,
    audio: Arc<AudioManager>,
    scheduler: Arc<Scheduler>,
    fade: Duration,
    callback_delay: Duration,
    queue: Mutex<Queue>,
}

impl DialoguePresenter {
    pub fn new(
        surface: Arc<dyn DialogueSurface>,
        audio: Arc<AudioManager>,
        scheduler: Arc<Scheduler>,
        timing: &TimingConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            surface,
            audio,
            scheduler,
            fade: timing.dialogue_fade,
            callback_delay: timing.dialogue_callback_delay,
            queue: Mutex::new(Queue::default()),
        })
    }

    /// Queue a line; starts processing when idle
    pub fn enqueue(&self, entry: DialogueEntry) {
        let start = {
            let mut queue = lock(&self.queue);
            queue.entries.push_back(entry);
            !queue.processing
        };
        if start {
            self.process_next();
        }
    }

    pub fn say(&self, text: impl Into<String>, options: DialogueOptions) {
        self.enqueue(DialogueEntry::new(text, options));
    }

    /// Queue several lines sharing options; `on_complete` rides on the last one
    pub fn enqueue_sequence<I, S>(&self, lines: I, options: DialogueOptions, on_complete: Option<Callback>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines: Vec<DialogueEntry> = lines
            .into_iter()
            .map(|text| DialogueEntry::new(text, options))
            .collect();
        match lines.last_mut() {
            Some(last) => last.on_complete = on_complete,
            None => {
                if let Some(callback) = on_complete {
                    callback();
                }
                return;
            }
        }
        for entry in lines {
            self.enqueue(entry);
        }
    }

    fn process_next(&self) {
        let (entry, was_open, generation) = {
            let mut queue = lock(&self.queue);
            let Some(entry) = queue.entries.pop_front() else {
                queue.processing = false;
                return;
            };
            queue.processing = true;
            queue.generation += 1;
            let was_open = std::mem::replace(&mut queue.open, false);
            (entry, was_open, queue.generation)
        };

        if was_open {
            self.surface.set_box_visible(false);
            let me = self.me.clone();
            self.scheduler.after(self.fade, move || {
                if let Some(presenter) = me.upgrade() {
                    presenter.display(entry, generation);
                }
            });
        } else {
            self.display(entry, generation);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.queue).generation == generation
    }

    fn display(&self, entry: DialogueEntry, generation: u64) {
        if !self.is_current(generation) {
            debug!("[Dialogue] dropped '{}' after close", entry.text);
            return;
        }
        let DialogueEntry {
            text,
            options,
            on_complete,
        } = entry;
        debug!("[Dialogue] {}", text);
        self.surface.show_line(&text, options.show_advance_button);

        if options.play_audio {
            let on_end: Option<Callback> = options.auto_advance.then(|| {
                let me = self.me.clone();
                let delay = options.auto_advance_delay;
                Box::new(move || {
                    if let Some(presenter) = me.upgrade() {
                        presenter.advance_later(generation, delay);
                    }
                }) as Callback
            });
            self.audio.play_narration(on_end);
        }

        let last_in_queue = {
            let mut queue = lock(&self.queue);
            queue.open = true;
            queue.entries.is_empty()
        };
        self.surface.set_box_visible(true);

        if options.auto_advance && !options.play_audio {
            self.advance_later(generation, options.auto_advance_delay);
        }

        if let Some(callback) = on_complete {
            if last_in_queue {
                self.scheduler.after(self.callback_delay, callback);
            }
        }
    }

    /// Advance after `delay` unless the line was replaced in the meantime
    fn advance_later(&self, generation: u64, delay: Duration) {
        let me = self.me.clone();
        self.scheduler.after(delay, move || {
            if let Some(presenter) = me.upgrade() {
                if presenter.is_current(generation) {
                    presenter.advance();
                }
            }
        });
    }

    /// Continue button: next line, or close when the queue is empty
    pub fn advance(&self) {
        let has_next = !lock(&self.queue).entries.is_empty();
        if has_next {
            self.process_next();
        } else {
            self.close();
        }
    }

    /// Fade out, drop the queue and stop narration
    pub fn close(&self) {
        {
            let mut queue = lock(&self.queue);
            queue.entries.clear();
            queue.processing = false;
            queue.open = false;
            queue.generation += 1;
        }
        self.surface.set_box_visible(false);
        self.audio.stop_narration();
    }

    /// Show a prompt with option buttons, outside the line queue
    pub fn present_choice(
        &self,
        prompt: &str,
        options: Vec<ChoiceOption>,
        callback: impl FnOnce(usize, Value) + Send + 'static,
    ) {
        self.surface.show_choice(prompt, &options);
        lock(&self.queue).choice = Some(PendingChoice {
            options,
            callback: Box::new(callback),
        });
        self.surface.set_box_visible(true);
    }

    /// Click on a choice button; false when no such option is on screen
    pub fn choose(&self, index: usize) -> bool {
        let pending = {
            let mut queue = lock(&self.queue);
            match &queue.choice {
                Some(choice) if index < choice.options.len() => queue.choice.take(),
                _ => None,
            }
        };
        let Some(PendingChoice { options, callback }) = pending else {
            warn!("[Dialogue] no choice option {}", index);
            return false;
        };
        if let Err(err) = self.audio.play_effect("clique") {
            debug!("[Dialogue] {}", err);
        }
        self.close();
        let value = options[index].value.clone().unwrap_or_else(|| Value::from(index));
        callback(index, value);
        true
    }

    pub fn has_choice(&self) -> bool {
        lock(&self.queue).choice.is_some()
    }

    /// A line is on screen or waiting
    pub fn is_active(&self) -> bool {
        let queue = lock(&self.queue);
        queue.processing || !queue.entries.is_empty()
    }

    pub fn queued(&self) -> usize {
        lock(&self.queue).entries.len()
    }

    /// Reset: empty queue, no choice, box closed
    pub fn clear(&self) {
        lock(&self.queue).choice = None;
        self.close();
    }

    /// Ephemeral message removed after `duration` plus the fade
    pub fn toast(&self, text: &str, duration: Duration, kind: ToastKind) {
        let id = {
            let mut queue = lock(&self.queue);
            queue.next_toast += 1;
            queue.next_toast
        };
        self.surface.show_toast(id, text, kind);
        let surface = self.surface.clone();
        self.scheduler
            .after(duration + self.fade, move || surface.remove_toast(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::infrastructure::memory::{MemoryAudioBackend, MemoryDialogueSurface};
    use crate::store::StateStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        presenter: Arc<DialoguePresenter>,
        surface: Arc<MemoryDialogueSurface>,
        backend: Arc<MemoryAudioBackend>,
    }

    fn fixture() -> Fixture {
        let scheduler = Arc::new(Scheduler::new());
        let backend = Arc::new(MemoryAudioBackend::new(Duration::from_secs(1)));
        let audio = Arc::new(AudioManager::new(
            backend.clone(),
            AudioConfig::default(),
            Arc::new(StateStore::default()),
            scheduler.clone(),
        ));
        let surface = Arc::new(MemoryDialogueSurface::default());
        let presenter = DialoguePresenter::new(
            surface.clone(),
            audio,
            scheduler,
            &TimingConfig::default(),
        );
        Fixture {
            presenter,
            surface,
            backend,
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[tokio::test(start_paused = true)]
    async fn first_line_shows_immediately() {
        let f = fixture();
        f.presenter.say("Bem-vindo", DialogueOptions::default());
        assert_eq!(f.surface.current().as_deref(), Some("Bem-vindo"));
        assert!(f.surface.box_visible());
        assert!(f.surface.advance_button());
        assert!(f.presenter.is_active());
        assert_eq!(f.backend.played().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_fades_between_lines() {
        let f = fixture();
        let silent = DialogueOptions::default().silent();
        f.presenter.say("one", silent);
        f.presenter.say("two", silent);

        f.presenter.advance();
        assert!(!f.surface.box_visible());
        assert_eq!(f.surface.current().as_deref(), Some("one"));

        tokio::time::sleep(ms(301)).await;
        assert_eq!(f.surface.current().as_deref(), Some("two"));
        assert!(f.surface.box_visible());

        f.presenter.advance();
        assert!(!f.presenter.is_active());
        assert!(!f.surface.box_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_auto_advance_uses_the_delay() {
        let f = fixture();
        let auto = DialogueOptions::default().silent().auto_advance(ms(1000));
        f.presenter.say("one", auto);
        f.presenter.say("two", auto);

        tokio::time::sleep(ms(999)).await;
        assert_eq!(f.surface.lines(), vec!["one"]);
        tokio::time::sleep(ms(302)).await;
        assert_eq!(f.surface.lines(), vec!["one", "two"]);
        tokio::time::sleep(ms(1001)).await;
        assert!(!f.presenter.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn narration_end_auto_advances() {
        let f = fixture();
        let auto = DialogueOptions::default().auto_advance(ms(200));
        f.presenter.say("one", auto);
        f.presenter.say("two", DialogueOptions::default());

        // narration lasts one second, then the delay, then the fade
        tokio::time::sleep(ms(1199)).await;
        assert_eq!(f.surface.lines(), vec!["one"]);
        tokio::time::sleep(ms(302)).await;
        assert_eq!(f.surface.lines(), vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_auto_advance_is_ignored() {
        let f = fixture();
        let auto = DialogueOptions::default().silent().auto_advance(ms(1000));
        f.presenter.say("one", auto);
        f.presenter.say("two", DialogueOptions::default().silent());
        f.presenter.say("three", DialogueOptions::default().silent());

        // user skips ahead before the timer of "one" fires
        f.presenter.advance();
        tokio::time::sleep(ms(2000)).await;
        assert_eq!(f.surface.lines(), vec!["one", "two"]);
        assert_eq!(f.presenter.queued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_callback_fires_once_on_last_line() {
        let f = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        f.presenter.enqueue_sequence(
            ["a", "b"],
            DialogueOptions::default().silent(),
            Some(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        );
        tokio::time::sleep(ms(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        f.presenter.advance();
        tokio::time::sleep(ms(399)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(ms(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_on_the_third_of_three_lines_fires_once() {
        let f = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let silent = DialogueOptions::default().silent();
        f.presenter.enqueue(DialogueEntry::new("um", silent));
        f.presenter.enqueue(DialogueEntry::new("dois", silent));
        f.presenter.enqueue(DialogueEntry::new("três", silent).on_complete(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        f.presenter.advance();
        tokio::time::sleep(ms(1000)).await;
        assert_eq!(f.surface.current().as_deref(), Some("dois"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        f.presenter.advance();
        tokio::time::sleep(ms(301)).await;
        assert_eq!(f.surface.current().as_deref(), Some("três"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(ms(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        f.presenter.advance();
        tokio::time::sleep(ms(1000)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(f.surface.lines(), vec!["um", "dois", "três"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sequence_completes_immediately() {
        let f = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        f.presenter.enqueue_sequence(
            Vec::<String>::new(),
            DialogueOptions::default(),
            Some(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!f.presenter.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn choice_returns_value_or_index() {
        let f = fixture();
        let picked = Arc::new(Mutex::new(None));
        let p = picked.clone();
        f.presenter.present_choice(
            "Qual caminho?",
            vec![
                ChoiceOption::new("Esquerda"),
                ChoiceOption::new("Direita").with_value("dir"),
            ],
            move |index, value| *p.lock().unwrap() = Some((index, value)),
        );
        assert!(f.surface.choice().is_some());
        assert!(!f.presenter.choose(5));
        assert!(f.presenter.choose(1));

        assert_eq!(*picked.lock().unwrap(), Some((1, Value::from("dir"))));
        assert!(!f.surface.box_visible());
        assert!(f.backend.played().iter().any(|a| a.ends_with("click.mp3")));
        assert!(!f.presenter.choose(0));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_pending_lines() {
        let f = fixture();
        let silent = DialogueOptions::default().silent();
        f.presenter.say("one", silent);
        f.presenter.say("two", silent);
        f.presenter.advance();
        f.presenter.clear();

        tokio::time::sleep(ms(1000)).await;
        assert_eq!(f.surface.lines(), vec!["one"]);
        assert!(!f.presenter.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn toasts_expire_after_fade() {
        let f = fixture();
        f.presenter.toast("Tente novamente", ms(2000), ToastKind::Error);
        assert_eq!(f.surface.open_toasts(), vec!["Tente novamente"]);
        tokio::time::sleep(ms(2299)).await;
        assert_eq!(f.surface.open_toasts().len(), 1);
        tokio::time::sleep(ms(2)).await;
        assert!(f.surface.open_toasts().is_empty());
    }
}
