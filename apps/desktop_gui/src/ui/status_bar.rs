//! Renders a [`StatusBar`] model as an egui progress bar with a label.

use eframe::egui;
use task_core::{StatusBar, StatusTone};

pub fn tone_color(tone: StatusTone) -> egui::Color32 {
    match tone {
        StatusTone::Idle => egui::Color32::from_rgb(120, 124, 134),
        StatusTone::Busy => egui::Color32::from_rgb(88, 101, 242),
        StatusTone::Done => egui::Color32::from_rgb(35, 165, 90),
        StatusTone::Cancelled => egui::Color32::from_rgb(200, 150, 60),
        StatusTone::Error => egui::Color32::from_rgb(175, 96, 96),
    }
}

pub fn show_status_bar(ui: &mut egui::Ui, bar: &StatusBar, animate: bool) {
    ui.horizontal(|ui| {
        if !bar.is_visible() {
            ui.label(egui::RichText::new("Idle").weak());
            return;
        }

        let color = tone_color(bar.tone());
        let width = (ui.available_width() * 0.35).clamp(120.0, 320.0);
        let progress = match bar.fraction() {
            Some(fraction) => egui::ProgressBar::new(fraction).show_percentage(),
            // Indeterminate: keep a moving bar while work continues.
            None => egui::ProgressBar::new(0.0).animate(animate),
        };
        ui.add(progress.desired_width(width).fill(color));
        ui.label(egui::RichText::new(bar.label()).color(color));
    });
}
