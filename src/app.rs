use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use eframe::egui;

use crate::archive::{self, LoadedImage};
use crate::config::Config;
use crate::error::ArchiveError;
use crate::geometry::{fit_to_viewport, Dims, Point, Span};
use crate::render::{DisplayList, DrawCmd};
use crate::session::{CanvasSession, EventQueue, InputEvent, Outcome};
use crate::store::{Annotation, AnnotationId};

pub const TITLE: &str = "Image Labeling App";

type LoadResult = Result<LoadedImage, ArchiveError>;

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Notice {
    text: String,
    is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct LabelApp {
    config: Config,
    session: Option<CanvasSession>,
    texture: Option<egui::TextureHandle>,
    display_list: DisplayList,
    queue: EventQueue,
    pending_load: Option<Receiver<LoadResult>>,

    eraser: bool,
    label_input: String,
    // mirrors the drawing store, in commit order
    labels: Vec<(AnnotationId, Annotation)>,
    notice: Option<Notice>,
}

impl LabelApp {
    pub fn new(config: Config, initial_archive: Option<PathBuf>) -> Self {
        let mut app = Self {
            config,
            session: None,
            texture: None,
            display_list: DisplayList::new(),
            queue: EventQueue::new(),
            pending_load: None,
            eraser: false,
            label_input: String::new(),
            labels: Vec::new(),
            notice: None,
        };
        if let Some(path) = initial_archive {
            app.start_load(path);
        }
        app
    }

    fn pick_archive(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("ZIP archive", &["zip"])
            .pick_file();
        if let Some(path) = picked {
            self.start_load(path);
        }
    }

    /// Extract and decode on a worker thread; the result is picked up by
    /// [`Self::poll_load`] on a later frame.
    fn start_load(&mut self, path: PathBuf) {
        if !archive::is_zip_path(&path) {
            log::warn!("Rejected non-zip upload {:?}", path);
            self.notice = Some(Notice::error(ArchiveError::NotZip.to_string()));
            return;
        }
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            // receiver gone means the app closed
            let _ = tx.send(archive::load_archive_file(&path));
        });
        self.pending_load = Some(rx);
        self.notice = None;
    }

    fn poll_load(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.pending_load else {
            return;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.pending_load = None;
                self.on_loaded(ctx, result);
            }
            Err(TryRecvError::Empty) => ctx.request_repaint(),
            Err(TryRecvError::Disconnected) => {
                self.pending_load = None;
                log::error!("Image loader stopped without a result");
                self.notice = Some(Notice::error("Error reading ZIP file."));
            }
        }
    }

    fn on_loaded(&mut self, ctx: &egui::Context, result: LoadResult) {
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::error!("Upload failed: {}", e);
                self.notice = Some(Notice::error(e.to_string()));
                return;
            }
        };

        let size = [image.pixels.width() as usize, image.pixels.height() as usize];
        let pixels = image.pixels.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture(
            image.name.clone(),
            color_image,
            egui::TextureOptions::LINEAR,
        ));

        let available = ctx.screen_rect().size();
        let display = self.fit_display(image.dims(), available);
        let mut session = CanvasSession::new(
            image,
            display,
            self.config.renderer(),
            self.config.eraser_radius,
            &mut self.display_list,
        );
        session.handle(InputEvent::SetEraser(self.eraser), &mut self.display_list);

        self.session = Some(session);
        self.labels.clear();
        self.label_input.clear();
        self.queue = EventQueue::new();
    }

    fn fit_display(&self, natural: Dims, available: egui::Vec2) -> Dims {
        let padding = self.config.viewport_padding;
        fit_to_viewport(
            natural,
            Dims::new((available.x - padding) as f64, (available.y - padding) as f64),
        )
    }

    /// Feed queued input to the session and mirror what changed.
    fn dispatch(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.queue = EventQueue::new();
            return;
        };
        for outcome in session.dispatch(&mut self.queue, &mut self.display_list) {
            match outcome {
                Outcome::LabelRequested | Outcome::StrokeDiscarded => self.label_input.clear(),
                Outcome::Committed { id, annotation } => {
                    self.labels.push((id, annotation));
                    self.label_input.clear();
                }
                Outcome::Erased(removed) => self
                    .labels
                    .retain(|(id, _)| !removed.iter().any(|(gone, _)| gone == id)),
                Outcome::LabelRejected(e) => log::debug!("Label prompt stays open: {}", e),
            }
        }
    }

    fn export(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let bytes = match session.export() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.notice = Some(Notice::error(format!("Export failed: {}", e)));
                return;
            }
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("ZIP archive", &["zip"])
            .set_file_name(self.config.export_file_name.as_str())
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                log::info!("Exported to {}", path.display());
                self.notice = Some(Notice::info(format!("Exported to {}", path.display())));
            }
            Err(e) => {
                log::error!("Export failed writing {}: {}", path.display(), e);
                self.notice = Some(Notice::error(format!("Export failed: {}", e)));
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.pending_load.is_none(), egui::Button::new("Upload file"))
                .clicked()
            {
                self.pick_archive();
            }
            if ui
                .add_enabled(self.session.is_some(), egui::Button::new("Export"))
                .clicked()
            {
                self.export();
            }
            let eraser_text = if self.eraser {
                "Disable Eraser"
            } else {
                "Enable Eraser"
            };
            if ui.button(eraser_text).clicked() {
                self.eraser = !self.eraser;
                self.queue.push(InputEvent::SetEraser(self.eraser));
                self.dispatch();
            }
            if self.pending_load.is_some() {
                ui.separator();
                ui.spinner();
            }
            if let Some(notice) = &self.notice {
                ui.separator();
                let color = if notice.is_error {
                    ui.visuals().error_fg_color
                } else {
                    ui.visuals().text_color()
                };
                ui.colored_label(color, &notice.text);
                if ui.small_button("✕").clicked() {
                    self.notice = None;
                }
            }
        });
    }

    fn label_list(&self, ui: &mut egui::Ui) {
        ui.heading("Labels:");
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (id, annotation) in &self.labels {
                egui::CollapsingHeader::new(annotation.label())
                    .id_salt(id)
                    .show(ui, |ui| {
                        let points = serde_json::to_string_pretty(annotation.points())
                            .unwrap_or_else(|e| e.to_string());
                        ui.monospace(points);
                    });
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let Some(session) = &self.session else {
            ui.label("Upload a ZIP archive containing a PNG image to start labeling.");
            return;
        };

        let display = self.fit_display(session.image_dims(), ui.available_size());
        if display != session.display() {
            self.queue.push(InputEvent::Resize(display));
            self.dispatch();
        }
        let Some(session) = &self.session else {
            return;
        };
        let prompting = session.is_prompting();
        let size = session.display();

        let (response, painter) = ui.allocate_painter(
            egui::vec2(size.width as f32, size.height as f32),
            egui::Sense::click_and_drag(),
        );
        let canvas_rect = response.rect;

        if !prompting {
            let local = |p: egui::Pos2| {
                Point::new((p.x - canvas_rect.min.x) as f64, (p.y - canvas_rect.min.y) as f64)
            };
            let queue = &mut self.queue;
            ui.input(|i| {
                let inside = |p: &egui::Pos2| canvas_rect.contains(*p);
                if i.pointer.primary_pressed() {
                    if let Some(p) = i.pointer.interact_pos().filter(inside) {
                        queue.push(InputEvent::PointerDown(local(p)));
                    }
                }
                if i.pointer.primary_down() && i.pointer.is_moving() {
                    if let Some(p) = i.pointer.latest_pos().filter(inside) {
                        queue.push(InputEvent::PointerMove(local(p)));
                    }
                }
                if i.pointer.primary_released() {
                    queue.push(InputEvent::PointerUp);
                }
            });
            self.dispatch();
        }

        self.paint(&painter, canvas_rect.min);
        painter.rect_stroke(
            canvas_rect,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::BLACK),
            egui::StrokeKind::Outside,
        );
    }

    /// Replay the recorded display list with the canvas origin at `origin`.
    fn paint(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let at = |p: Point| origin + egui::vec2(p.x as f32, p.y as f32);
        let rect_of = |size: Dims| {
            egui::Rect::from_min_size(origin, egui::vec2(size.width as f32, size.height as f32))
        };

        for cmd in self.display_list.commands() {
            match cmd {
                DrawCmd::Clear(size) => {
                    painter.rect_filled(rect_of(*size), 0.0, egui::Color32::from_gray(40));
                }
                DrawCmd::Image(size) => {
                    if let Some(tex) = &self.texture {
                        painter.image(
                            tex.id(),
                            rect_of(*size),
                            egui::Rect::from_min_max(
                                egui::pos2(0.0, 0.0),
                                egui::pos2(1.0, 1.0),
                            ),
                            egui::Color32::WHITE,
                        );
                    }
                }
                DrawCmd::ClosedPath {
                    outline,
                    fill,
                    style,
                } => {
                    let points: Vec<egui::Pos2> = outline.iter().map(|&p| at(p)).collect();
                    painter.add(egui::Shape::closed_line(
                        points,
                        egui::Stroke::new(style.outline.width, style.outline.color.to_egui()),
                    ));
                    if !fill.is_empty() {
                        painter.add(egui::Shape::mesh(fill_mesh(
                            fill,
                            origin,
                            style.fill.to_egui(),
                        )));
                    }
                }
                DrawCmd::Segment { from, to, style } => {
                    painter.line_segment(
                        [at(*from), at(*to)],
                        egui::Stroke::new(style.width, style.color.to_egui()),
                    );
                }
            }
        }
    }

    fn label_prompt(&mut self, ctx: &egui::Context) {
        let prompting = self
            .session
            .as_ref()
            .is_some_and(|session| session.is_prompting());
        if !prompting {
            return;
        }

        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Enter Label")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let te = ui.add(
                    egui::TextEdit::singleline(&mut self.label_input).hint_text("Enter label"),
                );
                if te.lost_focus() {
                    confirm = ui.input(|i| i.key_pressed(egui::Key::Enter));
                } else {
                    te.request_focus();
                }
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                    if ui.button("OK").clicked() {
                        confirm = true;
                    }
                });
            });
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            cancel = true;
        }

        if cancel {
            self.queue.push(InputEvent::CancelLabel);
        } else if confirm {
            self.queue
                .push(InputEvent::ConfirmLabel(self.label_input.clone()));
        }
        self.dispatch();
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for LabelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        if !self.labels.is_empty() {
            egui::SidePanel::right("labels")
                .resizable(true)
                .default_width(280.0)
                .show(ctx, |ui| {
                    self.label_list(ui);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ui);
        });

        self.label_prompt(ctx);
    }
}

// ── Painting ────────────────────────────────────────────────────────────────

/// Whole polygon fill as one unfeathered mesh; adjacent rows share edges.
fn fill_mesh(spans: &[Span], origin: egui::Pos2, color: egui::Color32) -> egui::Mesh {
    let mut mesh = egui::Mesh::default();
    for span in spans {
        let min = origin + egui::vec2(span.x_start as f32, span.y as f32);
        let max = origin + egui::vec2(span.x_end as f32, span.y as f32 + 1.0);
        mesh.add_colored_rect(egui::Rect::from_min_max(min, max), color);
    }
    mesh
}
