//! Perch Desktop: egui app state and UI.

use eframe::egui;
use perch_core::bootstrap;
use perch_core::config;
use perch_core::dispatch::Wakeup;
use perch_core::relay::LogFeed;
use perch_core::runner::TaskRunner;
use perch_core::session::{SessionController, SubmitOutcome};
use perch_core::tools::ToolCatalog;
use perch_core::transcript::{ChatEntry, ChatRole};

const WELCOME: &str = "Welcome to Perch! Type a question below; type exit to quit.";

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
    Tools,
}

pub struct PerchApp {
    /// Idle/Busy state, chat and log transcripts. Only touched from `update`.
    session: SessionController,
    /// What the agent can call, for the Tools screen.
    catalog: ToolCatalog,
    /// Resolved model name, shown in the status bar.
    model: String,
    /// Current input text for the chat box.
    chat_input: String,
    /// Set when a request finishes so the input gets focus back.
    refocus_input: bool,
    current_screen: Screen,
    /// `ViewportCommand::Close` has gone out.
    close_sent: bool,
}

impl PerchApp {
    /// Space between the main screen title (Chat, Logs, Tools) and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(_cc: &eframe::CreationContext<'_>, wakeup: Wakeup, log_feed: LogFeed) -> Self {
        let (config, config_path) = match config::load_config(None) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("failed to load config, using defaults: {:#}", e);
                (config::Config::default(), config::default_config_path())
            }
        };
        let setup = bootstrap::build_agent(&config, &config_path);
        let mut session = SessionController::new(setup.agent, TaskRunner::new(wakeup))
            .with_log_feed(log_feed, config.logs.max_lines);
        session.announce(WELCOME);

        Self::from_parts(session, setup.catalog, setup.model)
    }

    fn from_parts(session: SessionController, catalog: ToolCatalog, model: String) -> Self {
        Self {
            session,
            catalog,
            model,
            chat_input: String::new(),
            refocus_input: true,
            current_screen: Screen::default(),
            close_sent: false,
        }
    }

    fn send_chat_input(&mut self, ctx: &egui::Context) {
        match self.session.submit(&self.chat_input) {
            SubmitOutcome::Busy => {}
            SubmitOutcome::Started | SubmitOutcome::Empty => self.chat_input.clear(),
            SubmitOutcome::Exit => {
                self.chat_input.clear();
                self.close(ctx);
            }
        }
    }

    fn close(&mut self, ctx: &egui::Context) {
        if !self.close_sent {
            log::info!("desktop: closing window");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            self.close_sent = true;
        }
    }

    /// Renders a single chat message: frame with role-based fill and alignment.
    fn render_chat_message(ui: &mut egui::Ui, m: &ChatEntry) {
        let visuals = ui.style().visuals.clone();
        match m.role {
            ChatRole::System => {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(&m.text).italics().weak());
                });
                return;
            }
            ChatRole::Error => {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(format!("Error: {}", m.text))
                            .color(visuals.error_fg_color),
                    );
                });
                return;
            }
            ChatRole::User | ChatRole::Agent => {}
        }

        let is_user = m.role == ChatRole::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                visuals.extreme_bg_color
            } else {
                visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        let layout = if is_user {
            egui::Layout::top_down(egui::Align::Max)
        } else {
            egui::Layout::top_down(egui::Align::Min)
        };
        ui.with_layout(layout, |ui| {
            frame.show(ui, |ui| {
                ui.set_max_width(ui.available_width() * 0.8);
                if is_user {
                    ui.label(egui::RichText::new(format!("You: {}", m.text)).strong());
                } else {
                    ui.label(format!("AI: {}", m.text));
                }
            });
        });
    }

    /// Messages fill the space with stick-to-bottom; input and Send are fixed at the bottom.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Chat");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let row_height = ui.spacing().interact_size.y + 16.0;
        let scroll_height =
            (ui.available_height() - row_height - Self::SCREEN_FOOTER_SPACING).max(80.0);
        let scroll_to_end = self.session.chat_mut().take_scroll_request();
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for m in self.session.chat().entries() {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
                if scroll_to_end {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });

        ui.add_space(8.0);
        let can_send = self.session.input_enabled();
        let mut send_now = false;
        ui.horizontal(|ui| {
            let button_width = 80.0;
            let input = ui.add_enabled(
                can_send,
                egui::TextEdit::singleline(&mut self.chat_input)
                    .hint_text("Ask a question...")
                    .desired_width(ui.available_width() - button_width - 8.0),
            );
            if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_now = true;
            }
            if can_send && self.refocus_input {
                input.request_focus();
                self.refocus_input = false;
            }
            if ui
                .add_enabled(
                    can_send,
                    egui::Button::new("Send").min_size(egui::vec2(button_width, 0.0)),
                )
                .clicked()
            {
                send_now = true;
            }
        });
        if send_now && can_send {
            let ctx = ui.ctx().clone();
            self.send_chat_input(&ctx);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let scroll_to_end = self.session.logs_mut().take_scroll_request();
        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let logs = self.session.logs();
                for event in logs.entries() {
                    ui.label(
                        egui::RichText::new(event.line()).family(egui::FontFamily::Monospace),
                    );
                }
                if logs.is_empty() {
                    ui.label("No log output yet.");
                }
                if scroll_to_end {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_tools_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Tools");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        if self.catalog.is_empty() {
            ui.label("No tools enabled.");
            return;
        }
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for tool in self.catalog.entries() {
                    ui.label(egui::RichText::new(&tool.name).strong());
                    if !tool.description.is_empty() {
                        ui.label(&tool.description);
                    }
                    ui.add_space(12.0);
                }
            });
    }
}

impl eframe::App for PerchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.poll() {
            self.refocus_input = true;
        }
        if self.session.exit_requested() {
            self.close(ctx);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.heading("Perch");
                    ui.add_space(16.0);
                });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add_space(16.0);
                if self.session.input_enabled() {
                    ui.label(self.session.status().label());
                } else {
                    ui.spinner();
                    ui.label(format!("{}...", self.session.status().label()));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_space(16.0);
                    ui.label(egui::RichText::new(&self.model).weak());
                });
            });
        });

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(140.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui.selectable_label(*current_screen == Screen::Chat, "Chat").clicked() {
                            *current_screen = Screen::Chat;
                        }
                        ui.add_space(12.0);
                        if ui.selectable_label(*current_screen == Screen::Logs, "Logs").clicked() {
                            *current_screen = Screen::Logs;
                        }
                        ui.add_space(12.0);
                        if ui.selectable_label(*current_screen == Screen::Tools, "Tools").clicked() {
                            *current_screen = Screen::Tools;
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Chat => self.ui_chat(ui),
                    Screen::Logs => self.ui_logs_screen(ui),
                    Screen::Tools => self.ui_tools_screen(ui),
                });
        });
    }
}
