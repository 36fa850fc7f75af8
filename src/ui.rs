use egui::{Align2, Color32, Context, Pos2, RichText, Stroke};

use crate::controller::frame_loop::{Game, LoopState};

const TITLE: &str = "Howling Abyss";

/// What the player asked for through the overlay this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiActions {
    pub play_clicked: bool,
}

/// Raw input for one egui pass over a canvas of the given size, in pixels.
pub fn raw_input(width: u32, height: u32, now_ms: f64, events: Vec<egui::Event>) -> egui::RawInput {
    egui::RawInput {
        time: Some(now_ms / 1000.0),
        screen_rect: Some(egui::Rect::from_min_size(
            Pos2::ZERO,
            egui::vec2(width as f32, height as f32),
        )),
        events,
        ..Default::default()
    }
}

/// Build the overlay and return egui output
pub fn build_ui(egui_ctx: &Context, game: &Game, raw_input: egui::RawInput) -> (egui::FullOutput, UiActions) {
    let mut actions = UiActions::default();
    let output = egui_ctx.run(raw_input, |ctx| {
        if let Some(warning) = &game.warning {
            draw_warning(ctx, warning);
        }
        if game.paused {
            actions.play_clicked = draw_menu(ctx, game);
        } else if game.pointer.captured {
            draw_cursor(ctx, game.pointer.x, game.pointer.y);
        }
        if game.show_debug {
            draw_debug_window(ctx, game);
        }
    });
    (output, actions)
}

fn draw_menu(ctx: &Context, game: &Game) -> bool {
    let mut clicked = false;
    egui::Area::new(egui::Id::new("menu"))
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            egui::Frame::window(&ctx.style()).inner_margin(16.0).show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(RichText::new(TITLE).size(28.0));
                    ui.add_space(12.0);

                    let label = match (game.loaded, game.state()) {
                        (false, _) => "Loading...",
                        (true, LoopState::Running) => "Resume",
                        (true, LoopState::NotStarted) => "Play",
                    };
                    let button = egui::Button::new(RichText::new(label).size(18.0)).min_size(egui::vec2(140.0, 36.0));
                    clicked = ui.add_enabled(game.loaded, button).clicked();

                    ui.add_space(12.0);
                    for line in ["Right click - Move", "Hold Space - Lock camera", "Scroll - Zoom", "Esc - Pause", "F3 - Debug"] {
                        ui.label(RichText::new(line).small());
                    }
                });
            });
        });
    clicked
}

fn draw_warning(ctx: &Context, warning: &str) {
    egui::Area::new(egui::Id::new("warning"))
        .anchor(Align2::CENTER_TOP, [0.0, 8.0])
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(Color32::from_rgba_unmultiplied(120, 30, 30, 220))
                .inner_margin(6.0)
                .show(ui, |ui| {
                    ui.label(RichText::new(warning).color(Color32::WHITE));
                });
        });
}

/// Software cursor while the OS pointer is captured. `x`/`y` are in pixels.
fn draw_cursor(ctx: &Context, x: f32, y: f32) {
    let ppp = ctx.pixels_per_point();
    let (x, y) = (x / ppp, y / ppp);
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("cursor")));
    let tip = Pos2::new(x, y);
    let points = vec![tip, Pos2::new(x, y + 16.0), Pos2::new(x + 4.5, y + 12.0), Pos2::new(x + 11.0, y + 11.0)];
    painter.add(egui::Shape::convex_polygon(points, Color32::from_rgb(240, 220, 140), Stroke::new(1.0, Color32::BLACK)));
}

fn draw_debug_window(ctx: &Context, game: &Game) {
    let cam = &game.camera;
    let player = game.player.model_position;
    let small = |text: String| RichText::new(text).small();

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(small(format!("FPS: {:.0}", game.fps)));
            ui.label(small(format!("Camera: x: {:.2} y: {:.2} z: {:.2}", cam.position.x, cam.position.y, cam.position.z)));
            ui.label(small(format!("Zoom: {:.2}  FOV: {:.1}", cam.zoom(), cam.effective_fov().to_degrees())));
            ui.label(small(format!("Locked: {}", game.camera_controller.locked())));
            ui.separator();
            ui.label(small(format!("Player: x: {:.2} y: {:.2} z: {:.2}", player.x, player.y, player.z)));
            match game.player.target() {
                Some(t) => ui.label(small(format!("Target: x: {:.2} z: {:.2}", t.x, t.z))),
                None => ui.label(small("Target: -".to_string())),
            };
            ui.label(small(format!("Animation: {}", game.player.animation().name())));
            ui.label(small(format!("Pointer: {:.0}, {:.0}{}", game.pointer.x, game.pointer.y, if game.pointer.at_edge { " (edge)" } else { "" })));
            if let Some(click) = game.last_click() {
                ui.label(small(format!("Last click: {click:?}")));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::model::assets::BuiltinAssets;

    fn loaded_game() -> Game {
        let mut g = Game::new(GameConfig::default(), 800, 600).unwrap();
        g.load_assets(&BuiltinAssets::default());
        g
    }

    #[test]
    fn idle_pass_requests_nothing() {
        let ctx = Context::default();
        let game = loaded_game();
        let (_, actions) = build_ui(&ctx, &game, raw_input(800, 600, 0.0, Vec::new()));
        assert_eq!(actions, UiActions::default());
    }

    #[test]
    fn running_hud_with_debug_builds() {
        let ctx = Context::default();
        let mut game = loaded_game();
        game.start().unwrap();
        game.show_debug = true;
        game.pointer.captured = true;
        let (output, actions) = build_ui(&ctx, &game, raw_input(800, 600, 16.0, Vec::new()));
        assert!(!actions.play_clicked);
        assert!(!output.shapes.is_empty());
    }

    #[test]
    fn raw_input_covers_canvas() {
        let input = raw_input(1024, 768, 2500.0, Vec::new());
        assert_eq!(input.time, Some(2.5));
        assert_eq!(input.screen_rect.unwrap().size(), egui::vec2(1024.0, 768.0));
    }
}
