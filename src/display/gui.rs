// src/display/gui.rs
//! egui front end

use crate::{
    error::Result,
    provider::LocationProvider,
    tracker::{
        state::{SUBTITLE, TITLE},
        Control, LocationTracker, StatusTone,
    },
};
use eframe::egui;
use std::time::Duration;

const START_FILL: egui::Color32 = egui::Color32::from_rgb(59, 130, 246);
const STOP_FILL: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);

pub struct TrackerApp<P: LocationProvider> {
    tracker: LocationTracker<P>,
}

impl<P: LocationProvider> TrackerApp<P> {
    pub fn new(tracker: LocationTracker<P>) -> Self {
        Self { tracker }
    }
}

impl<P: LocationProvider> eframe::App for TrackerApp<P> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Callbacks arrive on provider tasks; poll them each frame
        self.tracker.process_pending();
        ctx.request_repaint_after(Duration::from_millis(100));

        let view = self.tracker.view();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.25);
                ui.heading(TITLE);
                ui.label(SUBTITLE);
                ui.add_space(20.0);

                let fill = match view.control {
                    Control::StartTracking => START_FILL,
                    Control::StopTracking => STOP_FILL,
                };
                let button = egui::Button::new(
                    egui::RichText::new(view.control.label()).color(egui::Color32::WHITE),
                )
                .fill(fill)
                .min_size(egui::vec2(140.0, 32.0));

                if ui.add(button).clicked() {
                    self.tracker.toggle();
                }

                ui.add_space(16.0);
                match view.tone {
                    StatusTone::Error => {
                        ui.colored_label(egui::Color32::RED, view.status.as_str());
                    }
                    StatusTone::Normal => {
                        ui.label(view.status.as_str());
                    }
                }
            });
        });
    }
}

/// Open the tracker window and block until it is closed.
///
/// Call with a tokio runtime entered; otherwise gpsd and serial watches
/// report "Location information is unavailable." as soon as they start.
pub fn run<P: LocationProvider + 'static>(tracker: LocationTracker<P>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 320.0])
            .with_min_inner_size([320.0, 240.0])
            .with_title("Location Tracker"),
        ..Default::default()
    };

    eframe::run_native(
        "Location Tracker",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Ok(Box::new(TrackerApp::new(tracker)))
        }),
    )?;

    Ok(())
}
