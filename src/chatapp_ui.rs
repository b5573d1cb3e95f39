use eframe::egui;
use std::time::Duration;

use crate::chat::ChatMessage;
use crate::chatapp::{ChatApp, Screen, SELECT_MODEL};

const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(51, 51, 51);
const AI_BUBBLE: egui::Color32 = egui::Color32::from_rgb(38, 38, 64);

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_tasks();
        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("screen_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.columns(2, |columns| {
                for (column, (screen, label)) in columns
                    .iter_mut()
                    .zip([(Screen::Chat, "Chat"), (Screen::Settings, "Settings")])
                {
                    let width = column.available_width();
                    let tab = column.add_sized([width, 32.0], egui::SelectableLabel::new(self.screen == screen, label));
                    if tab.clicked() {
                        self.show_screen(screen);
                    }
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.screen {
            Screen::Chat => self.render_chat_screen(ui),
            Screen::Settings => self.render_settings_screen(ui),
        });
    }
}

impl ChatApp {
    fn render_chat_screen(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.is_thinking() {
                ui.spinner();
            }
            ui.label(&self.status_text);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("New Chat").clicked() {
                    self.new_chat();
                }
            });
        });
        ui.separator();

        let input_area_height = 44.0;
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .max_height(ui.available_height() - input_area_height)
            .show(ui, |ui| {
                for message in self.session.messages() {
                    render_bubble(ui, message);
                    ui.add_space(8.0);
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            let send_width = 90.0;
            let input = ui.add_sized(
                [ui.available_width() - send_width - ui.spacing().item_spacing.x, 32.0],
                egui::TextEdit::singleline(&mut self.input).hint_text("Type a message..."),
            );
            let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let send = ui.add_sized([send_width, 32.0], egui::Button::new("Send"));
            if submitted || send.clicked() {
                self.on_send();
                input.request_focus();
            }
        });
    }

    fn render_settings_screen(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            ui.label(egui::RichText::new("NVIDIA / NIM Settings").strong());
            ui.add_space(8.0);

            ui.add(
                egui::TextEdit::singleline(&mut self.base_url_input)
                    .hint_text("Base URL (e.g. https://integrate.api.nvidia.com/v1 OR http://192.168.1.10:8000/v1)")
                    .desired_width(f32::INFINITY),
            );
            ui.add(
                egui::TextEdit::singleline(&mut self.api_key_input)
                    .hint_text("API Key (will be stored locally on device)")
                    .password(true)
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button("Load models").clicked() {
                    self.load_models();
                }
                let selected = if self.settings.model_name.is_empty() {
                    SELECT_MODEL.to_string()
                } else {
                    self.settings.model_name.clone()
                };
                let mut choice = selected.clone();
                egui::ComboBox::from_id_source("model_select")
                    .selected_text(&selected)
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for model in &self.available_models {
                            ui.selectable_value(&mut choice, model.clone(), model);
                        }
                    });
                if choice != selected {
                    self.set_model(&choice);
                }
            });
            ui.add_space(8.0);

            ui.label("System prompt (persona)");
            ui.add_sized(
                [ui.available_width(), 160.0],
                egui::TextEdit::multiline(&mut self.system_prompt_input).hint_text(
                    "Example: You are a warm, playful companion. Keep responses respectful and non-explicit.",
                ),
            );
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    self.save_settings();
                }
                if ui.button("Test /v1/health/ready").clicked() {
                    self.test_health();
                }
            });

            ui.add_space(4.0);
            ui.label(&self.status_text);
            ui.label(
                egui::RichText::new(format!("Settings file: {}", self.config_path.display()))
                    .small()
                    .color(egui::Color32::GRAY),
            );
        });
    }
}

fn render_bubble(ui: &mut egui::Ui, message: &ChatMessage) {
    let (prefix, fill) = if message.is_user() {
        ("[You]", USER_BUBBLE)
    } else {
        ("[AI]", AI_BUBBLE)
    };
    egui::Frame::none()
        .fill(fill)
        .rounding(10.0)
        .inner_margin(egui::style::Margin::symmetric(10.0, 7.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.add(egui::Label::new(format!("{} {}", prefix, message.content)).wrap(true));
        });
}
