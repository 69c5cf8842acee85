//! Main application UI and state management.
//! Handles deck management, practice sessions and the speech loop around them.

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use lingua_review::config::Config;
use lingua_review::database::{ReviewStore, SqliteStore};
use lingua_review::export::json::{export_json_to_path, import_json};
use lingua_review::feedback::FeedbackPhrases;
use lingua_review::models::deck::item_id;
use lingua_review::models::{Attempt, Deck, DeckSet, PracticeSession, ReviewItem, SessionError, SessionStats, Stage, Strategy};
use lingua_review::speech::{CaptureError, SequencerEvent, SpeechSequencer, TextOnlyOutput, TypedInput};
use std::time::{Duration, Instant};

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Practice,
}

/// Main application state
pub struct ReviewApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    all_decks: DeckSet,
    selected_deck_index: Option<usize>,
    current_front: String,
    current_back: String,
    new_deck_name: String,
    new_deck_language: String,
    store: SqliteStore,
    config: Config,
    current_date: DateTime<Utc>,

    current_screen: AppScreen,
    session: Option<PracticeSession>,

    output: TextOnlyOutput,
    input: TypedInput,
    sequencer: SpeechSequencer,
    typed_answer: String,
    feedback_message: Option<String>,
    capture_error: Option<CaptureError>,
    save_error: Option<String>,
    feedback_seed: u64,

    show_export_dialog: bool,
    show_import_result_dialog: bool,
    import_result_message: String,
}

/// Formats a timestamp as YYYY-MM-DD in local time
fn format_date(time: DateTime<Utc>) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d").to_string()
}

fn stage_label(item: &ReviewItem) -> String {
    match item.stage() {
        Stage::New => "new".to_string(),
        Stage::Learning(count) => format!("learning {count}"),
        Stage::Mastered => "mastered".to_string(),
    }
}

impl eframe::App for ReviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_speech();
        if !self.sequencer.is_idle() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Practice => self.render_practice_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    if self.session.as_ref().is_some_and(PracticeSession::has_unsaved_answer) {
                        ui.colored_label(egui::Color32::RED, "Your last answer has not been saved.");
                    }
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if self.show_export_dialog {
            let mut export_deck_index: Option<usize> = None;
            let mut should_cancel = false;

            egui::Window::new("Export Deck")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Select a deck to export:");
                    ui.separator();

                    for (i, deck) in self.all_decks.decks.iter().enumerate() {
                        if ui
                            .button(format!("{} ({} items)", deck.name, deck.items.len()))
                            .clicked()
                        {
                            export_deck_index = Some(i);
                        }
                    }

                    ui.separator();

                    if ui.button("Cancel").clicked() {
                        should_cancel = true;
                    }
                });

            if let Some(i) = export_deck_index {
                self.handle_export(i);
            }
            if should_cancel {
                self.show_export_dialog = false;
            }
        }

        if self.show_import_result_dialog {
            egui::Window::new("Import/Export Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.import_result_message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_import_result_dialog = false;
                    }
                });
        }
    }
}

impl ReviewApp {
    /// Creates a new application instance with decks loaded from the database
    pub fn new(deck_set: DeckSet, store: SqliteStore, config: Config) -> Self {
        let current_date = store.current_date().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read simulated date, using today");
            Utc::now()
        });
        let mut sequencer = SpeechSequencer::new(config.study.listen_timeout());
        sequencer.set_text_only(!config.speech.enabled);
        let has_decks = !deck_set.decks.is_empty();

        Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            all_decks: deck_set,
            selected_deck_index: if has_decks { Some(0) } else { None },
            current_front: String::new(),
            current_back: String::new(),
            new_deck_name: String::new(),
            new_deck_language: "es-ES".to_string(),
            store,
            config,
            current_date,
            current_screen: AppScreen::Main,
            session: None,
            output: TextOnlyOutput::new(),
            input: TypedInput::new(),
            sequencer,
            typed_answer: String::new(),
            feedback_message: None,
            capture_error: None,
            save_error: None,
            feedback_seed: 0,
            show_export_dialog: false,
            show_import_result_dialog: false,
            import_result_message: String::new(),
        }
    }

    fn reload_decks(&mut self) {
        match self.store.load_all_decks() {
            Ok(decks) => self.all_decks = decks,
            Err(e) => tracing::warn!(error = %e, "could not reload decks"),
        }
    }

    /// Renders the main screen with deck management interface
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format_date(self.current_date));

                if ui.button("Next Day").clicked() {
                    match self.store.advance_day() {
                        Ok(date) => self.current_date = date,
                        Err(e) => tracing::warn!(error = %e, "could not advance date"),
                    }
                }

                let mut smart_review = self.config.study.default_strategy == Strategy::DueOnly;
                if ui.checkbox(&mut smart_review, "Smart review").changed() {
                    self.config.study.default_strategy = if smart_review {
                        Strategy::DueOnly
                    } else {
                        Strategy::All
                    };
                    self.save_config();
                }

                if ui.checkbox(&mut self.config.speech.enabled, "Speech").changed() {
                    self.sequencer.set_text_only(!self.config.speech.enabled);
                    self.save_config();
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Export Deck").clicked() {
                    self.show_export_dialog = true;
                }
                if ui.button("Import Deck").clicked() {
                    self.handle_import();
                }
            });

            ui.separator();

            ui.heading("Create New Deck");
            ui.horizontal(|ui| {
                ui.label("Deck name:");
                ui.text_edit_singleline(&mut self.new_deck_name);
            });
            ui.horizontal(|ui| {
                ui.label("Language tag:");
                ui.text_edit_singleline(&mut self.new_deck_language);
                if ui.button("Create Deck").clicked() && !self.new_deck_name.is_empty() {
                    match self.store.create_deck(&self.new_deck_name, &self.new_deck_language) {
                        Ok(()) => {
                            self.all_decks
                                .decks
                                .push(Deck::new(self.new_deck_name.clone(), self.new_deck_language.clone()));
                            self.new_deck_name.clear();
                        }
                        Err(e) => {
                            self.import_result_message = format!("Failed to create deck: {e}");
                            self.show_import_result_dialog = true;
                        }
                    }
                }
            });

            ui.separator();

            ui.heading(format!("Decks ({})", self.all_decks.decks.len()));

            // Actions are applied after rendering to avoid borrowing conflicts
            let mut action_select: Option<usize> = None;
            let mut action_learn: Option<usize> = None;
            let mut action_reset: Option<usize> = None;
            let now = self.current_date;

            egui::ScrollArea::vertical()
                .id_salt("decks_list")
                .max_height(180.0)
                .show(ui, |ui| {
                    for (i, deck) in self.all_decks.decks.iter().enumerate() {
                        let is_selected = self.selected_deck_index == Some(i);
                        let stats = SessionStats::from_items(&deck.items, now);

                        ui.horizontal(|ui| {
                            if ui
                                .selectable_label(is_selected, format!("{}. {} [{}]", i + 1, deck.name, deck.language_tag))
                                .clicked()
                            {
                                action_select = Some(i);
                            }
                            if ui.button("Learn").clicked() {
                                action_learn = Some(i);
                            }
                            if ui.button("Reset progress").clicked() {
                                action_reset = Some(i);
                            }
                        });
                        ui.small(stats.summary());
                    }
                });

            if let Some(i) = action_select {
                self.selected_deck_index = Some(i);
            }
            if let Some(i) = action_learn {
                self.start_session(i);
            }
            if let Some(i) = action_reset {
                self.reset_deck(i);
            }

            ui.separator();

            if let Some(deck_index) = self.selected_deck_index {
                self.render_deck_editor(ui, deck_index);
            } else {
                ui.label("Select a deck to add items");
            }
        });
    }

    fn render_deck_editor(&mut self, ui: &mut egui::Ui, deck_index: usize) {
        let Some(current_deck) = self.all_decks.decks.get_mut(deck_index) else {
            return;
        };
        ui.heading(format!("Selected Deck: {}", current_deck.name));

        ui.horizontal(|ui| {
            ui.label("Front:");
            ui.text_edit_singleline(&mut self.current_front);
        });
        ui.horizontal(|ui| {
            ui.label("Back:");
            ui.text_edit_singleline(&mut self.current_back);
        });

        if ui.button("Add Item").clicked() && !self.current_front.is_empty() && !self.current_back.is_empty() {
            match item_id(&self.current_front) {
                Some(id) => {
                    let item = ReviewItem::new(id, self.current_front.clone(), self.current_back.clone());
                    match self.store.add_item(&current_deck.name, &item) {
                        Ok(true) => {
                            current_deck.items.push(item);
                            self.current_front.clear();
                            self.current_back.clear();
                        }
                        Ok(false) => {
                            self.import_result_message =
                                format!("'{}' is already in this deck.", self.current_front);
                            self.show_import_result_dialog = true;
                        }
                        Err(e) => {
                            self.import_result_message = format!("Failed to add item: {e}");
                            self.show_import_result_dialog = true;
                        }
                    }
                }
                None => {
                    self.import_result_message =
                        format!("'{}' needs at least one letter or digit.", self.current_front);
                    self.show_import_result_dialog = true;
                }
            }
        }

        ui.separator();

        ui.heading(format!("Items ({})", current_deck.items.len()));

        egui::ScrollArea::vertical()
            .id_salt("items_list")
            .max_height(220.0)
            .show(ui, |ui| {
                for (i, item) in current_deck.items.iter().enumerate() {
                    ui.group(|ui| {
                        ui.label(format!("{}. {} = {}", i + 1, item.front_text, item.back_text));
                        let due = item
                            .next_due_at
                            .map(format_date)
                            .unwrap_or_else(|| "now".to_string());
                        ui.small(format!("{}, due {}", stage_label(item), due));
                    });
                }
            });
    }

    /// Renders the practice screen with the review interface
    fn render_practice_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_none() {
                self.current_screen = AppScreen::Main;
                return;
            }
            let Some(session) = &self.session else {
                return;
            };

            ui.heading(format!("Practice: {}", session.deck_name));
            ui.label(session.phase_message());
            let (done, total) = session.progress();
            ui.label(format!(
                "Progress: {done}/{total} cards, {} answered, {} correct",
                session.answered_count(),
                session.correct_count()
            ));

            ui.add_space(20.0);

            if session.is_completed() {
                let stats = session.stats(self.current_date);
                ui.heading("Session complete!");
                ui.label(stats.summary());
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    self.leave_session();
                }
                return;
            }

            let Some(card) = session.current() else {
                return;
            };
            let show_answer = session.show_answer();
            let unsaved = session.has_unsaved_answer();
            let front = card.front_text.clone();
            let back = card.back_text.clone();
            let language_tag = session.language_tag.clone();

            ui.group(|ui| {
                ui.set_min_height(180.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.heading(front.as_str());
                    ui.add_space(20.0);
                    if show_answer {
                        ui.label(&back);
                    } else {
                        ui.label("(Reveal the answer or answer by voice)");
                    }
                    ui.add_space(20.0);
                });
            });

            if let Some(message) = &self.feedback_message {
                ui.label(message);
            }

            ui.add_space(10.0);

            let mut action_pronounce = false;
            let mut action_reveal = false;
            let mut action_grade: Option<bool> = None;
            let mut action_listen = false;
            let mut action_submit = false;
            let mut action_retry_save = false;
            let mut action_discard = false;
            let mut action_back = false;

            if let Some(error) = &self.save_error {
                ui.colored_label(egui::Color32::RED, error.as_str());
                ui.horizontal(|ui| {
                    action_retry_save = ui.button("Retry save").clicked();
                    action_discard = ui.button("Discard answer").clicked();
                });
            } else if !unsaved {
                ui.horizontal(|ui| {
                    action_pronounce = ui.button("Pronounce").clicked();
                    if !show_answer {
                        action_reveal = ui.button("Show Answer").clicked();
                    }
                    if !self.sequencer.is_listening() {
                        action_listen = ui.button("Answer by voice").clicked();
                    }
                });

                if self.sequencer.is_listening() {
                    ui.horizontal(|ui| {
                        ui.label("Say it:");
                        let response = ui.text_edit_singleline(&mut self.typed_answer);
                        let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        action_submit = ui.button("Done").clicked() || entered;
                    });
                }

                if let Some(error) = &self.capture_error {
                    ui.colored_label(egui::Color32::YELLOW, error.hint());
                    action_listen |= ui.button("Try again").clicked();
                }

                if show_answer {
                    ui.horizontal(|ui| {
                        if ui.button("I knew it").clicked() {
                            action_grade = Some(true);
                        }
                        if ui.button("I didn't know it").clicked() {
                            action_grade = Some(false);
                        }
                    });
                }
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }

            if action_pronounce {
                self.sequencer.say(front, language_tag.clone());
            }
            if action_reveal {
                if let Some(session) = &mut self.session {
                    session.reveal();
                }
            }
            if action_listen {
                self.capture_error = None;
                self.typed_answer.clear();
                self.sequencer.interrupt(&mut self.output, &mut self.input);
                self.sequencer.listen(self.config.speech.native_language_tag.clone());
            }
            if action_submit {
                self.input.submit(&self.typed_answer);
                self.typed_answer.clear();
            }
            if let Some(was_correct) = action_grade {
                self.grade(was_correct);
            }
            if action_retry_save {
                self.retry_save();
            }
            if action_discard {
                if let Some(session) = &mut self.session {
                    session.discard_unsaved();
                }
                self.save_error = None;
            }
            if action_back {
                self.leave_session();
            }
        });
    }

    /// Starts a practice session over the deck using the configured strategy
    fn start_session(&mut self, deck_index: usize) {
        let Some(deck) = self.all_decks.decks.get(deck_index) else {
            return;
        };
        let strategy = self.config.study.default_strategy;

        match PracticeSession::from_store(&deck.name, &deck.language_tag, &self.store, self.current_date, strategy) {
            Ok(session) if session.total_count() > 0 => {
                self.session = Some(session);
                self.feedback_message = None;
                self.capture_error = None;
                self.save_error = None;
                self.current_screen = AppScreen::Practice;
            }
            Ok(_) => {
                self.import_result_message = format!("Nothing is due in '{}'. Come back later!", deck.name);
                self.show_import_result_dialog = true;
            }
            Err(e) => {
                self.import_result_message = format!("Could not load '{}': {e}", deck.name);
                self.show_import_result_dialog = true;
            }
        }
    }

    fn leave_session(&mut self) {
        self.sequencer.interrupt(&mut self.output, &mut self.input);
        self.session = None;
        self.save_error = None;
        self.current_screen = AppScreen::Main;
        self.reload_decks();
    }

    fn reset_deck(&mut self, deck_index: usize) {
        let Some(name) = self.all_decks.decks.get(deck_index).map(|d| d.name.clone()) else {
            return;
        };
        match self.store.reset_progress(&name) {
            Ok(_) => self.reload_decks(),
            Err(e) => {
                self.import_result_message = format!("Could not reset '{name}': {e}");
                self.show_import_result_dialog = true;
            }
        }
    }

    fn grade(&mut self, was_correct: bool) {
        let Some(session) = &mut self.session else {
            return;
        };
        let result = session.answer(was_correct, self.current_date, &mut self.store);
        self.after_answer(result.map(|attempt| (None, attempt)));
    }

    fn grade_spoken(&mut self, transcript: &str) {
        let Some(session) = &mut self.session else {
            return;
        };
        let result = session.answer_with_text(transcript, self.current_date, &mut self.store);
        self.after_answer(result.map(|(verdict, attempt)| (Some(verdict), attempt)));
    }

    fn retry_save(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        let result = session.retry_save(&mut self.store);
        self.after_answer(result.map(|attempt| (None, attempt)));
    }

    fn after_answer(
        &mut self,
        result: Result<(Option<lingua_review::feedback::Verdict>, Attempt), SessionError>,
    ) {
        match result {
            Ok((verdict, attempt)) => {
                self.save_error = None;
                if let Some(verdict) = verdict {
                    self.feedback_seed = self.feedback_seed.wrapping_add(1);
                    let phrase = FeedbackPhrases::pick(verdict, self.feedback_seed);
                    let text = format!("{phrase} ({} = {})", attempt.item.front_text, attempt.item.back_text);
                    self.sequencer.say(text, self.config.speech.native_language_tag.clone());
                }
                if attempt.newly_mastered {
                    self.feedback_message = Some(format!("'{}' mastered!", attempt.item.front_text));
                }
                if let Some(deck) = self
                    .session
                    .as_ref()
                    .and_then(|s| self.all_decks.get_mut(&s.deck_name))
                {
                    deck.replace(attempt.item);
                }
            }
            Err(SessionError::Save(e)) => {
                self.save_error = Some(format!("Could not save your answer: {e}"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "answer rejected");
                self.feedback_message = Some(e.to_string());
            }
        }
    }

    /// Feeds speech events into the session
    fn pump_speech(&mut self) {
        let events = self
            .sequencer
            .pump(&mut self.output, &mut self.input, Instant::now());

        for event in events {
            match event {
                SequencerEvent::Spoke(text) | SequencerEvent::Shown(text) => {
                    self.feedback_message = Some(text);
                }
                SequencerEvent::PlaybackFailed(e) => {
                    tracing::warn!(error = %e, "speech output unavailable");
                }
                SequencerEvent::Heard(transcript) => self.grade_spoken(&transcript),
                SequencerEvent::CaptureFailed(e) => self.capture_error = Some(e),
                SequencerEvent::TimedOut => self.capture_error = Some(CaptureError::NoSpeechDetected),
                SequencerEvent::Stopped | SequencerEvent::Finished => {}
            }
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            tracing::warn!(error = %e, "could not save config");
        }
    }

    /// Handles deck export to JSON file
    fn handle_export(&mut self, deck_index: usize) {
        if let Some(deck) = self.all_decks.decks.get(deck_index) {
            if let Some(path) = rfd::FileDialog::new()
                .set_file_name(format!("{}.json", deck.name))
                .add_filter("JSON files", &["json"])
                .save_file()
            {
                self.import_result_message = match export_json_to_path(deck, &path) {
                    Ok(()) => format!("Deck '{}' exported successfully!", deck.name),
                    Err(e) => format!("Export failed: {e}"),
                };
                self.show_import_result_dialog = true;
            }
        }
        self.show_export_dialog = false;
    }

    /// Handles deck import from JSON file
    fn handle_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        self.import_result_message = match import_json(&path) {
            Ok(deck) if self.all_decks.get(&deck.name).is_some() => format!(
                "Deck '{}' already exists! Please rename it in the JSON file.",
                deck.name
            ),
            Ok(deck) => match self.store.insert_deck(&deck) {
                Ok(()) => {
                    let message = format!(
                        "Deck '{}' imported successfully with {} items!",
                        deck.name,
                        deck.items.len()
                    );
                    self.all_decks.decks.push(deck);
                    message
                }
                Err(e) => format!("Failed to import deck: {e}"),
            },
            Err(e) => format!(
                "Import failed: {e}\n\nPlease check if the file has correct structure:\n{{\n  \"name\": \"Deck Name\",\n  \"languageTag\": \"es-ES\",\n  \"items\": [...]\n}}"
            ),
        };
        self.show_import_result_dialog = true;
    }
}
