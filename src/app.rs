//! Application shell — toolbar, canvas widget, overlay rendering, and the
//! background recognition pipeline.
//!
//! Layout: a fixed toolbar across the top (Reset, color swatches, Run,
//! status), with the drawing canvas filling everything below it.  Recognized
//! results float above the canvas as draggable overlays.

use crate::bounds::ContentBounds;
use crate::recognition::{RecognitionClient, RecognizedItem};
use crate::session::Session;
use crate::typeset::{ScreenTypesetter, Typesetter};
use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, TextureHandle, TextureOptions, vec2};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

/// Stroke colors offered in the toolbar.  White first — the default ink on
/// the dark board.
const SWATCHES: [Color32; 8] = [
    Color32::WHITE,
    Color32::from_rgb(238, 70, 70),   // red
    Color32::from_rgb(64, 192, 87),   // green
    Color32::from_rgb(77, 171, 247),  // blue
    Color32::from_rgb(252, 196, 25),  // yellow
    Color32::from_rgb(255, 146, 43),  // orange
    Color32::from_rgb(190, 75, 219),  // purple
    Color32::from_rgb(230, 73, 128),  // pink
];

const BOARD_FILL: Color32 = Color32::BLACK;

// ============================================================================
// ASYNC RECOGNITION PIPELINE — background request with channel completion
// ============================================================================

/// Outcome delivered from a background recognition thread.
pub enum RunOutcome {
    /// The service answered; carries the whole parsed batch.
    Completed(Vec<RecognizedItem>),
    /// The request failed; the run is dropped whole.
    Failed(String),
}

pub struct MathBoardApp {
    // Session state (surface + bindings + overlays)
    session: Session,

    // Recognition client, shared with worker threads.  None when the HTTP
    // client could not be built — Run reports the problem instead.
    client: Option<Arc<RecognitionClient>>,

    // Typesetting bridge (injectable capability)
    typesetter: Box<dyn Typesetter>,

    // Async recognition pipeline
    run_sender: mpsc::Sender<RunOutcome>,
    run_receiver: mpsc::Receiver<RunOutcome>,
    /// True while a request is in flight; the Run control is disabled.
    run_in_flight: bool,

    // Status / error line shown at the right end of the toolbar
    status: String,

    // Display cache for the pixel buffer
    canvas_texture: Option<TextureHandle>,
    surface_dirty: bool,
    /// Canvas widget rect from the last frame; overlay positions are
    /// canvas-relative and offset by this rect's origin.
    last_canvas_rect: Option<Rect>,
}

impl MathBoardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, base_url: String) -> Self {
        let (run_sender, run_receiver) = mpsc::channel();
        let client = match RecognitionClient::new(base_url) {
            Ok(c) => Some(Arc::new(c)),
            Err(e) => {
                crate::log_err!("{}", e);
                None
            }
        };
        Self {
            // Sized on first layout; zero-sized surfaces ignore strokes
            session: Session::new(0, 0),
            client,
            typesetter: Box::new(ScreenTypesetter),
            run_sender,
            run_receiver,
            run_in_flight: false,
            status: String::new(),
            canvas_texture: None,
            surface_dirty: false,
            last_canvas_rect: None,
        }
    }

    // ---- run pipeline ---------------------------------------------------

    /// Snapshot → bounding box → submit, on a worker thread.
    fn start_run(&mut self, ctx: &egui::Context) {
        let client = match &self.client {
            Some(c) => Arc::clone(c),
            None => {
                self.status = "Recognition client unavailable".to_string();
                return;
            }
        };

        // Empty-canvas guard: a degenerate bounding box means there is
        // nothing to recognize and no meaningful anchor.
        let bounds = ContentBounds::scan(self.session.surface.pixels());
        if bounds.is_empty() {
            self.status = "Nothing to recognize — draw something first".to_string();
            crate::log_warn!("run skipped: blank canvas");
            return;
        }
        self.session.overlays.set_anchor(bounds.center());

        let snapshot = match self.session.surface.snapshot_data_url() {
            Ok(s) => s,
            Err(e) => {
                self.status = format!("Snapshot failed: {}", e);
                crate::log_err!("snapshot failed: {}", e);
                return;
            }
        };
        // Bindings travel as they exist *now*; assignments that land while
        // the request is in flight do not affect it.
        let bindings = self.session.bindings.snapshot();

        self.run_in_flight = true;
        self.status = "Recognizing…".to_string();
        crate::log_info!(
            "run submitted: {}x{} snapshot, {} binding(s), anchor {:?}",
            self.session.surface.width(),
            self.session.surface.height(),
            bindings.len(),
            bounds.center()
        );

        let sender = self.run_sender.clone();
        let repaint_ctx = ctx.clone();
        std::thread::spawn(move || {
            let outcome = match client.submit(&snapshot, &bindings) {
                Ok(items) => RunOutcome::Completed(items),
                Err(e) => RunOutcome::Failed(e),
            };
            let _ = sender.send(outcome);
            repaint_ctx.request_repaint();
        });
    }

    /// Drain completed recognition requests from the channel.
    fn poll_run_outcomes(&mut self) {
        while let Ok(outcome) = self.run_receiver.try_recv() {
            self.run_in_flight = false;
            match outcome {
                RunOutcome::Completed(batch) => {
                    crate::log_info!("run completed: {} item(s)", batch.len());
                    self.status = match batch.len() {
                        0 => "No expressions recognized".to_string(),
                        1 => "1 result".to_string(),
                        n => format!("{} results", n),
                    };
                    // Pass 1 (assignments) then pass 2 (display scheduling)
                    self.session.apply_batch(&batch, Instant::now());
                }
                RunOutcome::Failed(e) => {
                    // Dropped whole: no bindings applied, no overlays placed
                    crate::log_err!("run failed: {}", e);
                    self.status = e;
                }
            }
        }
    }

    /// Materialize overlays whose reveal delay has elapsed.
    fn reveal_due_overlays(&mut self) {
        let created = self.session.overlays.reveal_due(Instant::now());
        if created > 0 {
            // The drawn expression is replaced by its typeset overlay
            self.session.surface.clear();
            self.surface_dirty = true;
            self.typesetter.content_changed();
        }
    }

    // ---- toolbar --------------------------------------------------------

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 8.0;

                if ui.button("Reset").clicked() {
                    self.session.reset();
                    self.status.clear();
                    self.surface_dirty = true;
                    self.typesetter.content_changed();
                }

                ui.separator();
                for color in SWATCHES {
                    self.swatch(ui, color);
                }
                ui.separator();

                let run = ui.add_enabled(!self.run_in_flight, egui::Button::new("Run"));
                if run.clicked() {
                    self.start_run(ctx);
                }
                if self.run_in_flight {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.status.is_empty() {
                        ui.label(&self.status);
                    }
                    if !self.session.bindings.is_empty() {
                        ui.weak(format!("{} bound", self.session.bindings.len()));
                    }
                });
            });
        });
    }

    /// One clickable color square; the active color gets a highlight ring.
    fn swatch(&mut self, ui: &mut egui::Ui, color: Color32) {
        let (rect, response) = ui.allocate_exact_size(vec2(18.0, 18.0), egui::Sense::click());
        let painter = ui.painter();
        painter.rect_filled(rect, 3.0, color);
        if self.session.surface.active_color() == color {
            painter.rect_stroke(rect.expand(2.0), 4.0, egui::Stroke::new(2.0, Color32::GRAY));
        }
        if response.clicked() {
            self.session.surface.set_color(color);
        }
    }

    // ---- canvas ---------------------------------------------------------

    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BOARD_FILL))
            .show(ctx, |ui| {
                let size = ui.available_size();
                let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
                let canvas_rect = response.rect;
                self.last_canvas_rect = Some(canvas_rect);

                // Keep the buffer matched to the widget (content is dropped
                // on a real size change; same-size calls are no-ops).
                let (w, h) = (canvas_rect.width() as u32, canvas_rect.height() as u32);
                if (w, h) != (self.session.surface.width(), self.session.surface.height()) {
                    self.session.surface.resize(w, h);
                    self.canvas_texture = None;
                    self.surface_dirty = true;
                }

                // Pointer → stroke state machine, in canvas coordinates
                if let Some(pointer) = response.interact_pointer_pos() {
                    let local = pointer - canvas_rect.min.to_vec2();
                    if response.drag_started() {
                        self.session.surface.begin_stroke(local);
                        self.surface_dirty = true;
                    } else if response.dragged() {
                        self.session.surface.extend_stroke(local);
                        self.surface_dirty = true;
                    }
                }
                if response.drag_released() {
                    self.session.surface.end_stroke();
                }

                // Upload the pixel buffer when it changed
                if self.surface_dirty && w > 0 && h > 0 {
                    let pixels = self.session.surface.pixels();
                    let img = ColorImage::from_rgba_unmultiplied(
                        [w as usize, h as usize],
                        pixels.as_raw(),
                    );
                    self.canvas_texture =
                        Some(ctx.load_texture("board", img, TextureOptions::NEAREST));
                    self.surface_dirty = false;
                }

                painter.rect_filled(canvas_rect, 0.0, BOARD_FILL);
                if let Some(texture) = &self.canvas_texture {
                    painter.image(
                        texture.id(),
                        canvas_rect,
                        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
            });
    }

    // ---- overlays -------------------------------------------------------

    fn show_overlays(&mut self, ctx: &egui::Context) {
        let origin = match self.last_canvas_rect {
            Some(rect) => rect.min,
            None => return,
        };

        // Snapshot positions/content up front; drags are applied after the
        // loop so one overlay's move never disturbs another's layout.
        let overlays: Vec<(Pos2, String)> = self
            .session
            .overlays
            .items()
            .iter()
            .map(|item| (item.pos, item.content.clone()))
            .collect();

        let mut dragged: Option<(usize, Pos2)> = None;
        for (idx, (pos, content)) in overlays.into_iter().enumerate() {
            let screen_pos = origin + pos.to_vec2();
            let area = egui::Area::new(egui::Id::new(("result_overlay", idx)))
                .order(egui::Order::Foreground)
                .fixed_pos(screen_pos)
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .fill(Color32::from_black_alpha(160))
                        .rounding(4.0)
                        .inner_margin(6.0)
                        .show(ui, |ui| {
                            self.typesetter.typeset(ui, &content);
                        });
                });
            let response = area.response.interact(egui::Sense::drag());
            if response.dragged() {
                dragged = Some((idx, pos + response.drag_delta()));
            }
        }
        if let Some((idx, pos)) = dragged {
            self.session.overlays.drag_to(idx, pos);
        }
    }
}

impl eframe::App for MathBoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_run_outcomes();
        self.reveal_due_overlays();

        // Wake up again when the next scheduled reveal is due
        if let Some(due) = self.session.overlays.next_due() {
            let now = Instant::now();
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }

        self.show_toolbar(ctx);
        self.show_canvas(ctx);
        self.show_overlays(ctx);
    }
}
