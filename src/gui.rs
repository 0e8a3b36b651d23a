use crate::config::{Settings, SharedEndpoint};
use crate::lifecycle::RequestManager;
use crate::log::{Entry, Role};
use crate::transport::{FilePart, Payload, WebhookTransport};
use anyhow::{anyhow, Result};
use eframe::egui::{self, Align, Align2, Button, Color32, Frame, Layout, RichText, ScrollArea};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const WINDOW_BG: Color32 = Color32::from_rgb(32, 33, 35);
const PANEL_BG: Color32 = Color32::from_rgb(52, 53, 65);
const INPUT_BG: Color32 = Color32::from_rgb(64, 65, 79);
const USER_BUBBLE: Color32 = Color32::from_rgb(52, 53, 65);
const AGENT_BUBBLE: Color32 = Color32::from_rgb(68, 70, 84);
const ERROR_BUBBLE: Color32 = Color32::from_rgb(139, 58, 58);
const ACCENT: Color32 = Color32::from_rgb(16, 163, 127);
const TEXT_DIM: Color32 = Color32::from_gray(170);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Settings,
    Chat,
    Upload,
}

pub fn run_gui(config_path: PathBuf) -> Result<()> {
    let settings = Settings::load(&config_path);
    let endpoint = SharedEndpoint::new(settings.webhook_url.clone());
    let transport = WebhookTransport::new()?;
    let manager = RequestManager::new(transport, endpoint.clone());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 520.0])
            .with_min_inner_size([520.0, 360.0])
            .with_title("Client Webhook"),
        ..Default::default()
    };

    eframe::run_native(
        "Client Webhook",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(WebhookApp::new(
                manager,
                endpoint,
                settings,
                config_path,
            )))
        }),
    )
    .map_err(|err| anyhow!("Impossible de lancer l'interface graphique: {err}"))
}

fn configure_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.visuals = egui::Visuals::dark();
    style.visuals.panel_fill = WINDOW_BG;
    style.visuals.window_fill = PANEL_BG;
    style.visuals.extreme_bg_color = INPUT_BG;
    style.visuals.selection.bg_fill = ACCENT;
    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style
        .text_styles
        .insert(egui::TextStyle::Heading, egui::FontId::proportional(18.0));
    style
        .text_styles
        .insert(egui::TextStyle::Body, egui::FontId::proportional(14.0));
    style
        .text_styles
        .insert(egui::TextStyle::Button, egui::FontId::proportional(14.0));
    ctx.set_style(style);
}

pub struct WebhookApp {
    manager: RequestManager<WebhookTransport>,
    endpoint: SharedEndpoint,
    config_path: PathBuf,
    active_tab: Tab,
    webhook_input: String,
    chat_input: String,
    staged_files: Vec<FilePart>,
    status: String,
    save_error: Option<String>,
}

impl WebhookApp {
    fn new(
        manager: RequestManager<WebhookTransport>,
        endpoint: SharedEndpoint,
        settings: Settings,
        config_path: PathBuf,
    ) -> Self {
        let active_tab = if settings.webhook_url.is_empty() {
            Tab::Settings
        } else {
            Tab::Chat
        };

        Self {
            manager,
            endpoint,
            config_path,
            active_tab,
            webhook_input: settings.webhook_url,
            chat_input: String::new(),
            staged_files: Vec::new(),
            status: "Pret".to_string(),
            save_error: None,
        }
    }

    fn send_chat_message(&mut self) {
        let body = self.chat_input.trim().to_string();
        if body.is_empty() {
            return;
        }

        if self.manager.submit(Payload::Text { body }) {
            self.chat_input.clear();
            self.status = "Envoi en cours...".to_string();
        }
    }

    fn send_file_batch(&mut self) {
        if self.staged_files.is_empty() {
            return;
        }

        let files = std::mem::take(&mut self.staged_files);
        let count = files.len();
        if self.manager.submit(Payload::FileBatch { files }) {
            self.status = format!("Envoi de {count} fichier(s)...");
        }
    }

    fn pick_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new().pick_files() else {
            return;
        };

        for path in paths {
            match FilePart::from_path(&path) {
                Ok(part) => self.staged_files.push(part),
                Err(err) => self.status = format!("{err:#}"),
            }
        }
    }

    fn save_settings(&mut self) {
        let url = self.webhook_input.trim().to_string();
        let settings = Settings {
            webhook_url: url.clone(),
        };

        match settings.save(&self.config_path) {
            Ok(()) => {
                self.endpoint.set(url);
                self.status = "Configuration sauvegardee".to_string();
                info!(path = %self.config_path.display(), "configuration sauvegardee");
            }
            Err(err) => {
                // Notification bloquante; l'etat du gestionnaire de
                // requetes n'est pas affecte.
                self.save_error = Some(format!("{err:#}"));
            }
        }
    }

    fn render_entry(ui: &mut egui::Ui, entry: &Entry) -> egui::Rect {
        let (label, fill, is_user) = match entry.role {
            Role::User => ("Vous", USER_BUBBLE, true),
            Role::Agent => ("Agent", AGENT_BUBBLE, false),
            Role::Error => ("Erreur", ERROR_BUBBLE, false),
        };
        let max_bubble_width = (ui.available_width() * 0.82).clamp(220.0, 640.0);
        let row_layout = if is_user {
            Layout::right_to_left(Align::TOP)
        } else {
            Layout::left_to_right(Align::TOP)
        };

        let mut bubble_rect = egui::Rect::NOTHING;
        ui.horizontal(|ui| {
            ui.set_width(ui.available_width());
            ui.with_layout(row_layout, |ui| {
                bubble_rect = ui
                    .scope(|ui| {
                        ui.set_max_width(max_bubble_width);
                        Frame::default()
                            .fill(fill)
                            .corner_radius(egui::CornerRadius::same(10))
                            .inner_margin(egui::Margin::symmetric(12, 8))
                            .show(ui, |ui| {
                                ui.label(RichText::new(label).small().color(TEXT_DIM));
                                ui.add(egui::Label::new(entry.text.as_str()).wrap());
                            })
                            .response
                            .rect
                    })
                    .inner;
            });
        });

        bubble_rect
    }

    fn render_tab_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for (tab, title) in [
                (Tab::Settings, "Parametres"),
                (Tab::Chat, "Chat"),
                (Tab::Upload, "Upload"),
            ] {
                if ui.selectable_label(self.active_tab == tab, title).clicked() {
                    self.active_tab = tab;
                }
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(RichText::new(self.status.as_str()).small().color(TEXT_DIM));
            });
        });
    }

    fn render_settings_tab(&mut self, ui: &mut egui::Ui) {
        ui.label("URL du webhook utilisee pour tous les envois:");
        ui.add(
            egui::TextEdit::singleline(&mut self.webhook_input)
                .hint_text("https://exemple.com/webhook")
                .desired_width(f32::INFINITY),
        );
        if ui.button("Sauvegarder").clicked() {
            self.save_settings();
        }
        ui.label(
            RichText::new(
                "L'URL est relue a chaque envoi: un changement prend effet au message suivant.",
            )
            .small()
            .color(TEXT_DIM),
        );
    }

    fn render_chat_tab(&mut self, ui: &mut egui::Ui) {
        let input_enabled = self.manager.input_enabled();
        let input_height = 44.0;
        let list_height = (ui.available_height() - input_height - 12.0).max(120.0);

        ui.allocate_ui_with_layout(
            egui::vec2(ui.available_width(), list_height),
            Layout::top_down(Align::LEFT),
            |ui| {
                Frame::default()
                    .fill(PANEL_BG)
                    .corner_radius(egui::CornerRadius::same(8))
                    .inner_margin(egui::Margin::same(8))
                    .show(ui, |ui| {
                        ui.set_min_height(list_height - 16.0);
                        ScrollArea::vertical()
                            .id_salt("chat_scroll")
                            .stick_to_bottom(true)
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                for entry in self.manager.log().entries() {
                                    Self::render_entry(ui, entry);
                                    ui.add_space(6.0);
                                }
                            });
                    });
            },
        );

        ui.horizontal(|ui| {
            let send_width = 90.0;
            let input_width = (ui.available_width() - send_width - 16.0).max(120.0);
            let response = ui.add_enabled(
                input_enabled,
                egui::TextEdit::singleline(&mut self.chat_input)
                    .hint_text("Ecrire un message...")
                    .desired_width(input_width),
            );
            let enter_pressed =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            if ui
                .add_enabled(
                    input_enabled,
                    Button::new("Envoyer").min_size(egui::vec2(send_width, 28.0)),
                )
                .clicked()
                || enter_pressed
            {
                self.send_chat_message();
            }
        });
    }

    fn render_upload_tab(&mut self, ui: &mut egui::Ui) {
        let input_enabled = self.manager.input_enabled();

        ui.label("Fichiers a envoyer au webhook sous forme de multipart:");
        ui.horizontal(|ui| {
            if ui
                .add_enabled(input_enabled, Button::new("Choisir des fichiers"))
                .clicked()
            {
                self.pick_files();
            }
            if self.staged_files.is_empty() {
                ui.label(RichText::new("Aucun fichier selectionne").color(TEXT_DIM));
            }
        });

        let mut removed: Option<usize> = None;
        for (index, file) in self.staged_files.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{} ({} octets, {})",
                    file.name,
                    file.bytes.len(),
                    file.mime_type
                ));
                if ui.small_button("Retirer").clicked() {
                    removed = Some(index);
                }
            });
        }
        if let Some(index) = removed {
            self.staged_files.remove(index);
        }

        ui.add_space(4.0);
        if ui
            .add_enabled(
                input_enabled && !self.staged_files.is_empty(),
                Button::new("Envoyer"),
            )
            .clicked()
        {
            self.send_file_batch();
        }

        ui.add_space(8.0);
        ui.separator();
        ui.label(RichText::new("Resultats").small().color(TEXT_DIM));
        ScrollArea::vertical()
            .id_salt("upload_scroll")
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for entry in self.manager.log().entries() {
                    Self::render_entry(ui, entry);
                    ui.add_space(6.0);
                }
            });
    }

    fn render_save_error_modal(&mut self, ctx: &egui::Context) {
        let Some(message) = self.save_error.clone() else {
            return;
        };

        egui::Window::new("Erreur de configuration")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.save_error = None;
                }
            });
    }
}

impl eframe::App for WebhookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Les resultats du worker sont draines ici, sur le contexte qui
        // possede le journal, avant tout rendu.
        self.manager.poll();

        if self.manager.input_enabled() && self.status.starts_with("Envoi") {
            self.status = "Pret".to_string();
        }

        self.render_save_error_modal(ctx);
        let modal_open = self.save_error.is_some();

        egui::TopBottomPanel::top("tab_bar")
            .frame(
                Frame::default()
                    .fill(PANEL_BG)
                    .inner_margin(egui::Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| {
                    self.render_tab_bar(ui);
                });
            });

        egui::CentralPanel::default()
            .frame(
                Frame::default()
                    .fill(WINDOW_BG)
                    .inner_margin(egui::Margin::same(12)),
            )
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| match self.active_tab {
                    Tab::Settings => self.render_settings_tab(ui),
                    Tab::Chat => self.render_chat_tab(ui),
                    Tab::Upload => self.render_upload_tab(ui),
                });
            });

        // Tant qu'une requete est en vol, le canal de completion doit etre
        // draine meme sans interaction utilisateur.
        if !self.manager.input_enabled() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_rect_for_entry(entry: Entry, available_width: f32) -> egui::Rect {
        let ctx = egui::Context::default();
        let mut rendered_rect = None;

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.allocate_ui_with_layout(
                    egui::vec2(available_width, 400.0),
                    Layout::top_down(Align::LEFT),
                    |ui| {
                        rendered_rect = Some(WebhookApp::render_entry(ui, &entry));
                    },
                );
            });
        });

        rendered_rect.expect("entry should be rendered")
    }

    #[test]
    fn render_entry_long_text_stays_within_expected_width() {
        let entry = Entry {
            role: Role::Agent,
            text: "mot assez long ".repeat(120),
            sequence: 0,
        };
        let available_width = 420.0;
        let expected_max_width = (available_width * 0.82f32).clamp(220.0, 640.0);

        let rect = render_rect_for_entry(entry, available_width);

        assert!(
            rect.width() <= expected_max_width + 1.0,
            "bubble width {} exceeded max {}",
            rect.width(),
            expected_max_width
        );
    }
}
