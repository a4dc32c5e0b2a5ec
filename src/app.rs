//! texsnip floating widget — egui/eframe application.
//!
//! # Architecture
//!
//! [`TexsnipApp`] is the top-level [`eframe::App`].  It owns the single UI
//! context: every window (floating widget, selection overlays, QR prompt,
//! editor) is rendered from `update`, and all session state is mutated here
//! after consulting the [`SessionOrchestrator`].
//!
//! Inputs arrive over channels and are drained non-blocking each frame:
//!
//! * `trigger_rx` — hotkeys and phone uploads from the event bridge.
//! * `worker_rx`  — init and recognition events from the inference worker.
//!
//! The orchestrator answers each input with an [`Action`]; `apply_action`
//! performs the side effects (open a viewport, submit to the worker, copy to
//! the clipboard).
//!
//! # Widget states
//!
//! | State | Visual |
//! |-------|--------|
//! | `Idle` | Hotkey hints — dim gray |
//! | `CaptureActive` | Source-specific status line |
//! | `Processing` | Spinner + "Recognizing..." |
//! | `Displaying` | LaTeX result — green, Copy / Close buttons |
//! | `Error` | Error message — orange, Close button |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::bridge::{TriggerEvent, TriggerReceiver};
use crate::capture::{region, CaptureOutcome, OverlaySession};
use crate::config::AppConfig;
use crate::engine::{WorkerCommand, WorkerEvent};
use crate::mobile::{qr_color_image, MobileSource, MobileStart};
use crate::session::{Action, EngineStatus, SessionOrchestrator, SessionState, SourceKind};

const EDITOR_VIEWPORT: &str = "upload-editor";
const QR_VIEWPORT: &str = "qr-prompt";

const SELECTION_BORDER: egui::Color32 = egui::Color32::from_rgb(0, 120, 215);

// ---------------------------------------------------------------------------
// QrPrompt
// ---------------------------------------------------------------------------

/// State of the QR prompt window while a bridge session awaits an upload.
struct QrPrompt {
    url: String,
    /// QR side length in pixels, kept for window sizing after the image has
    /// been consumed into the texture.
    side: f32,
    image: Option<egui::ColorImage>,
    texture: Option<egui::TextureHandle>,
}

// ---------------------------------------------------------------------------
// TexsnipApp
// ---------------------------------------------------------------------------

/// eframe application — the floating capture widget.
pub struct TexsnipApp {
    // ── Session state ─────────────────────────────────────────────────────
    orchestrator: SessionOrchestrator,

    // ── Channels ──────────────────────────────────────────────────────────
    /// Hotkey and upload events from the bridge.
    trigger_rx: TriggerReceiver,
    /// Commands to the inference worker.
    worker_tx: mpsc::Sender<WorkerCommand>,
    /// Events from the inference worker.
    worker_rx: mpsc::Receiver<WorkerEvent>,

    // ── Capture sources ───────────────────────────────────────────────────
    /// Live screen capture, if any.  Dropping it closes every overlay.
    overlay: Option<OverlaySession>,
    /// Phone source: upload server plus the open editor, if any.
    mobile: MobileSource,
    qr: Option<QrPrompt>,

    // ── Editor view state ─────────────────────────────────────────────────
    editor_texture: Option<egui::TextureHandle>,
    editor_drag_start: Option<egui::Pos2>,
    /// Focus the editor viewport on its next frame.
    refocus_editor: bool,

    // ── Result display ────────────────────────────────────────────────────
    result_text: Option<String>,
    error_message: Option<String>,

    // ── UI state ──────────────────────────────────────────────────────────
    spinner_phase: f32,
    /// Widget position observed last frame, persisted on exit.
    window_position: Option<(f32, f32)>,

    // ── Configuration ─────────────────────────────────────────────────────
    config: AppConfig,
}

impl TexsnipApp {
    pub fn new(
        trigger_rx: TriggerReceiver,
        worker_tx: mpsc::Sender<WorkerCommand>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
        mobile: MobileSource,
        config: AppConfig,
    ) -> Self {
        Self {
            orchestrator: SessionOrchestrator::new(),
            trigger_rx,
            worker_tx,
            worker_rx,
            overlay: None,
            mobile,
            qr: None,
            editor_texture: None,
            editor_drag_start: None,
            refocus_editor: false,
            result_text: None,
            error_message: None,
            spinner_phase: 0.0,
            window_position: config.ui.window_position,
            config,
        }
    }

    // ── Channel polling ───────────────────────────────────────────────────

    /// Drain all pending bridge events (non-blocking).
    fn poll_triggers(&mut self) {
        while let Ok(event) = self.trigger_rx.try_recv() {
            let action = match event {
                TriggerEvent::ScreenSnip => self.orchestrator.handle_trigger(SourceKind::Screen),
                TriggerEvent::MobileBridge => {
                    self.orchestrator.handle_trigger(SourceKind::Mobile)
                }
                TriggerEvent::MobileUpload(bytes) => self.orchestrator.on_upload_received(bytes),
            };
            self.apply_action(action);
        }
    }

    /// Drain all pending worker events (non-blocking).
    fn poll_worker(&mut self) {
        while let Ok(event) = self.worker_rx.try_recv() {
            let action = self.orchestrator.on_worker_event(event);
            self.apply_action(action);
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────

    /// Execute the side effects the orchestrator asked for.
    fn apply_action(&mut self, action: Action) {
        match action {
            Action::StartScreenCapture => {
                match OverlaySession::start(self.config.capture.min_selection_px) {
                    Ok(session) => {
                        log::info!("ui: overlay up on {} display(s)", session.pane_count());
                        self.overlay = Some(session);
                    }
                    Err(e) => {
                        let follow_up = self.orchestrator.on_capture_failed(e.to_string());
                        self.apply_action(follow_up);
                    }
                }
            }
            Action::StartMobileBridge => match self.mobile.start() {
                Ok(MobileStart::ShowQr(url)) => self.show_qr_prompt(url),
                Ok(MobileStart::RefocusEditor) => self.refocus_editor = true,
                Err(e) => {
                    let follow_up = self.orchestrator.on_capture_failed(e.to_string());
                    self.apply_action(follow_up);
                }
            },
            Action::RefocusEditor => self.refocus_editor = true,
            Action::OpenEditor(bytes) => {
                self.qr = None;
                match self
                    .mobile
                    .open_editor(&bytes, self.config.capture.min_selection_px)
                {
                    Ok(()) => {
                        self.editor_texture = None;
                        self.editor_drag_start = None;
                        self.refocus_editor = true;
                    }
                    Err(e) => {
                        let follow_up = self.orchestrator.on_capture_failed(e.to_string());
                        self.apply_action(follow_up);
                    }
                }
            }
            Action::Submit(bytes) => {
                if self.worker_tx.try_send(WorkerCommand::Submit(bytes)).is_err() {
                    log::error!("ui: worker channel unavailable");
                    let follow_up = self
                        .orchestrator
                        .on_capture_failed("recognition worker unavailable".into());
                    self.apply_action(follow_up);
                }
            }
            Action::ShowResult(latex) => {
                self.error_message = None;
                if self.config.ui.auto_copy {
                    self.copy_to_clipboard(&latex);
                }
                self.result_text = Some(latex);
            }
            Action::ShowError(message) => {
                self.result_text = None;
                self.error_message = Some(message);
            }
            Action::DismissCapture => {
                self.overlay = None;
                self.qr = None;
                self.mobile.close_editor();
                self.editor_texture = None;
                self.editor_drag_start = None;
            }
            Action::None => {}
        }
    }

    fn show_qr_prompt(&mut self, url: String) {
        match qr_color_image(&url) {
            Ok(image) => {
                self.qr = Some(QrPrompt {
                    url,
                    side: image.size[0] as f32,
                    image: Some(image),
                    texture: None,
                });
            }
            Err(e) => {
                let follow_up = self.orchestrator.on_capture_failed(e.to_string());
                self.apply_action(follow_up);
            }
        }
    }

    fn copy_to_clipboard(&self, text: &str) {
        match arboard::Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(text.to_string()) {
                    log::warn!("ui: clipboard write failed: {e}");
                } else {
                    log::info!("ui: result copied to clipboard");
                }
            }
            Err(e) => log::warn!("ui: clipboard unavailable: {e}"),
        }
    }

    // ── Capture windows ───────────────────────────────────────────────────

    /// Drive the overlay session; resolve it on the first outcome from any
    /// display.
    fn show_overlay(&mut self, ctx: &egui::Context) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };

        if let Some(outcome) = overlay.show(ctx) {
            // Dropping the session closes every overlay this frame.
            self.overlay = None;
            let action = match outcome {
                CaptureOutcome::Captured(bytes) => self.orchestrator.on_captured(bytes),
                CaptureOutcome::Cancelled => self.orchestrator.on_capture_cancelled(),
            };
            self.apply_action(action);
        }
    }

    /// QR prompt viewport, shown while a bridge session awaits an upload.
    fn show_qr(&mut self, ctx: &egui::Context) {
        let Some(qr) = self.qr.as_mut() else {
            return;
        };

        let side = qr.side;
        let builder = egui::ViewportBuilder::default()
            .with_title("Scan to upload")
            .with_inner_size(egui::Vec2::new(side.max(258.0) + 32.0, side + 110.0))
            .with_resizable(false)
            .with_always_on_top();

        let mut cancelled = false;
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of(QR_VIEWPORT),
            builder,
            |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    if qr.texture.is_none() {
                        if let Some(image) = qr.image.take() {
                            qr.texture = Some(ctx.load_texture(
                                "qr-code",
                                image,
                                egui::TextureOptions::NEAREST,
                            ));
                        }
                    }

                    ui.vertical_centered(|ui| {
                        ui.add_space(4.0);
                        ui.label("Scan with your phone, then send a photo:");
                        ui.add_space(4.0);
                        if let Some(texture) = &qr.texture {
                            ui.image(texture);
                        }
                        ui.add_space(4.0);
                        ui.monospace(&qr.url);
                        ui.add_space(6.0);
                        if ui.button("Cancel").clicked() {
                            cancelled = true;
                        }
                    });
                });

                if ctx.input(|i| {
                    i.key_pressed(egui::Key::Escape) || i.viewport().close_requested()
                }) {
                    cancelled = true;
                }
            },
        );

        if cancelled {
            let action = self.orchestrator.on_capture_cancelled();
            self.apply_action(action);
        }
    }

    /// Editor viewport for an uploaded photo: crop, rotate, confirm.
    fn show_editor(&mut self, ctx: &egui::Context) {
        if !self.mobile.editor_open() {
            return;
        }

        let viewport_id = egui::ViewportId::from_hash_of(EDITOR_VIEWPORT);
        if std::mem::take(&mut self.refocus_editor) {
            ctx.send_viewport_cmd_to(viewport_id, egui::ViewportCommand::Focus);
        }

        let builder = egui::ViewportBuilder::default()
            .with_title("Adjust upload")
            .with_inner_size(egui::Vec2::new(900.0, 700.0))
            .with_min_inner_size(egui::Vec2::new(400.0, 300.0));

        // Collected inside the viewport closure, handled after it returns so
        // the editor borrow has ended.
        enum EditorExit {
            Confirm(Result<Vec<u8>, crate::capture::CaptureError>),
            Cancel,
        }
        let mut exit: Option<EditorExit> = None;
        let mut rebuild_texture = self.editor_texture.is_none();
        let mut drag_start = self.editor_drag_start;

        {
            let texture_slot = &mut self.editor_texture;
            let Some(editor) = self.mobile.editor() else {
                return;
            };

            ctx.show_viewport_immediate(viewport_id, builder, |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    // The crop needs the letterbox mapping, which is only
                    // known once the image area below has been laid out.
                    let mut confirm = false;

                    // Toolbar
                    ui.horizontal(|ui| {
                        if ui.button("Rotate 90°").clicked() {
                            editor.rotate_cw();
                            rebuild_texture = true;
                            drag_start = None;
                        }
                        if ui.button("Reset selection").clicked() {
                            editor.reset_selection();
                            drag_start = None;
                        }
                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui.button("Recognize").clicked() {
                                    confirm = true;
                                }
                                if ui.button("Cancel").clicked() {
                                    exit = Some(EditorExit::Cancel);
                                }
                                ui.label(
                                    egui::RichText::new("drag to crop · Enter to confirm")
                                        .size(11.0)
                                        .color(egui::Color32::GRAY),
                                );
                            },
                        );
                    });
                    ui.separator();

                    if rebuild_texture {
                        let rgba = editor.rotated().to_rgba8();
                        let size = [rgba.width() as usize, rgba.height() as usize];
                        *texture_slot = Some(ctx.load_texture(
                            "upload-editor-image",
                            egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()),
                            egui::TextureOptions::LINEAR,
                        ));
                        rebuild_texture = false;
                    }

                    // Letterbox the rotated image into the remaining area.
                    let area = ui.available_rect_before_wrap();
                    let (img_w, img_h) = editor.dimensions();
                    let (scaled, mapping) = region::fit_into(img_w, img_h, area.size());
                    let image_rect = egui::Rect::from_min_size(
                        area.min + mapping.offset,
                        scaled,
                    );

                    if let Some(texture) = texture_slot.as_ref() {
                        ui.painter().image(
                            texture.id(),
                            image_rect,
                            egui::Rect::from_min_max(
                                egui::Pos2::ZERO,
                                egui::Pos2::new(1.0, 1.0),
                            ),
                            egui::Color32::WHITE,
                        );
                    }

                    // Drag selection, stored in area-local coordinates so the
                    // mapping applies directly.
                    let response =
                        ui.interact(area, ui.id().with("crop"), egui::Sense::click_and_drag());
                    if response.drag_started() {
                        drag_start = response.interact_pointer_pos().map(|p| p - area.min.to_vec2());
                    } else if response.dragged() || response.drag_stopped() {
                        if let (Some(start), Some(pos)) =
                            (drag_start, response.interact_pointer_pos())
                        {
                            let current = pos - area.min.to_vec2();
                            editor.set_selection(egui::Rect::from_two_pos(start, current));
                        }
                        if response.drag_stopped() {
                            drag_start = None;
                        }
                    }

                    if let Some(selection) = editor.selection() {
                        ui.painter().rect_stroke(
                            selection.translate(area.min.to_vec2()),
                            0.0,
                            egui::Stroke::new(2.0, SELECTION_BORDER),
                            egui::StrokeKind::Outside,
                        );
                    }

                    // Keyboard shortcuts share the button paths.
                    if ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter)) {
                        confirm = true;
                    }
                    if confirm && exit.is_none() {
                        exit = Some(EditorExit::Confirm(editor.finalize(&mapping)));
                    }
                    if exit.is_none() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                        exit = Some(EditorExit::Cancel);
                    }
                });

                if ctx.input(|i| i.viewport().close_requested()) && exit.is_none() {
                    exit = Some(EditorExit::Cancel);
                }
            });
        }

        self.editor_drag_start = drag_start;

        match exit {
            Some(EditorExit::Confirm(Ok(png))) => {
                let action = self.orchestrator.on_captured(png);
                self.apply_action(Action::DismissCapture);
                self.apply_action(action);
            }
            Some(EditorExit::Confirm(Err(e))) => {
                let action = self.orchestrator.on_capture_failed(e.to_string());
                self.apply_action(Action::DismissCapture);
                self.apply_action(action);
            }
            Some(EditorExit::Cancel) => {
                let action = self.orchestrator.on_capture_cancelled();
                self.apply_action(action);
            }
            None => {}
        }
    }

    // ── Widget rendering ──────────────────────────────────────────────────

    fn update_window_size(&self, ctx: &egui::Context) {
        let size = match self.orchestrator.state() {
            SessionState::Idle => egui::vec2(280.0, 64.0),
            SessionState::CaptureActive(_) => egui::vec2(280.0, 56.0),
            SessionState::Processing => egui::vec2(280.0, 56.0),
            SessionState::Displaying => egui::vec2(320.0, 110.0),
            SessionState::Error => egui::vec2(320.0, 90.0),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
    }

    fn draw_title_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(self.status_icon()).color(self.state_color()),
            );

            let title_resp = ui.label(
                egui::RichText::new("texsnip")
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
            if title_resp.is_pointer_button_down_on() {
                if let Some(outer_rect) = ctx.input(|i| i.viewport().outer_rect) {
                    let delta = ctx.input(|i| i.pointer.delta());
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                        outer_rect.min + delta,
                    ));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("x")
                                .color(egui::Color32::from_rgb(200, 100, 100))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }

                if self.orchestrator.engine_status() == EngineStatus::Offline {
                    ui.label(
                        egui::RichText::new("engine offline")
                            .color(egui::Color32::from_rgb(255, 136, 68))
                            .size(10.0),
                    );
                }
            });
        });
    }

    fn draw_idle(&self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(format!(
                "{}  snip a region",
                self.config.hotkey.snip_key
            ))
            .color(egui::Color32::from_rgb(120, 120, 120))
            .size(12.0),
        );
        ui.label(
            egui::RichText::new(format!(
                "{}  upload from phone",
                self.config.hotkey.mobile_key
            ))
            .color(egui::Color32::from_rgb(120, 120, 120))
            .size(12.0),
        );
    }

    fn draw_capture_active(&self, ui: &mut egui::Ui, source: SourceKind) {
        let hint = match source {
            SourceKind::Screen => "drag a region · Esc to cancel",
            SourceKind::Mobile => "scan the QR with your phone",
        };
        ui.add_space(6.0);
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new(hint)
                    .color(egui::Color32::from_rgb(68, 136, 255))
                    .size(12.0),
            );
        });
    }

    fn draw_processing(&self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new(format!("{} Recognizing...", self.spinner_char()))
                    .color(egui::Color32::from_rgb(68, 136, 255))
                    .size(13.0),
            );
        });
    }

    fn draw_result(&mut self, ui: &mut egui::Ui) {
        let text = self.result_text.clone().unwrap_or_default();

        ui.add_space(4.0);
        egui::ScrollArea::vertical().max_height(48.0).show(ui, |ui| {
            ui.label(
                egui::RichText::new(text.as_str())
                    .monospace()
                    .color(egui::Color32::from_rgb(80, 200, 120))
                    .size(13.0),
            );
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui
                .add(egui::Button::new(egui::RichText::new("Copy").size(11.0)))
                .clicked()
            {
                self.copy_to_clipboard(&text);
            }
            if ui
                .add(egui::Button::new(egui::RichText::new("Close").size(11.0)))
                .clicked()
            {
                self.orchestrator.dismiss();
                self.result_text = None;
            }
        });
    }

    fn draw_error(&mut self, ui: &mut egui::Ui) {
        let message = self
            .error_message
            .clone()
            .unwrap_or_else(|| "unknown error".into());

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(message.as_str())
                .color(egui::Color32::from_rgb(255, 136, 68))
                .size(12.0),
        );

        ui.add_space(4.0);
        if ui
            .add(egui::Button::new(egui::RichText::new("Close").size(11.0)))
            .clicked()
        {
            self.orchestrator.dismiss();
            self.error_message = None;
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        chars[(self.spinner_phase as usize) % chars.len()]
    }

    fn status_icon(&self) -> &'static str {
        match self.orchestrator.state() {
            SessionState::Idle => "  ",
            SessionState::CaptureActive(_) => "* ",
            SessionState::Processing => ". ",
            SessionState::Displaying => "OK",
            SessionState::Error => "! ",
        }
    }

    fn state_color(&self) -> egui::Color32 {
        match self.orchestrator.state() {
            SessionState::Idle => egui::Color32::from_rgb(100, 100, 100),
            SessionState::CaptureActive(_) => egui::Color32::from_rgb(255, 68, 68),
            SessionState::Processing => egui::Color32::from_rgb(68, 136, 255),
            SessionState::Displaying => egui::Color32::from_rgb(80, 200, 120),
            SessionState::Error => egui::Color32::from_rgb(255, 136, 68),
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for TexsnipApp {
    /// Called every frame.  Drains channels, drives capture windows, then
    /// renders the widget.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_triggers();
        self.poll_worker();

        // --- Capture windows ------------------------------------------------
        self.show_overlay(ctx);
        self.show_qr(ctx);
        self.show_editor(ctx);

        // --- Spinner --------------------------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Schedule repaints so channels keep getting drained -------------
        let repaint_after = match self.orchestrator.state() {
            SessionState::Processing => Duration::from_millis(66),
            SessionState::CaptureActive(_) => Duration::from_millis(50),
            _ => Duration::from_millis(150),
        };
        ctx.request_repaint_after(repaint_after);

        // --- Remember widget position for persistence ------------------------
        if let Some(outer_rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.window_position = Some((outer_rect.min.x, outer_rect.min.y));
        }

        // --- Resize window to match state ------------------------------------
        self.update_window_size(ctx);

        // --- Dark transparent background frame --------------------------------
        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 220))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, ctx);
            ui.separator();

            match self.orchestrator.state().clone() {
                SessionState::Idle => self.draw_idle(ui),
                SessionState::CaptureActive(source) => self.draw_capture_active(ui, source),
                SessionState::Processing => self.draw_processing(ui),
                SessionState::Displaying => self.draw_result(ui),
                SessionState::Error => self.draw_error(ui),
            }
        });
    }

    /// Persist the widget position on exit (best-effort).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.config.ui.window_position = self.window_position;
        if let Err(e) = self.config.save() {
            log::warn!("ui: failed to persist settings: {e}");
        }
        log::info!("texsnip closing");
    }
}
