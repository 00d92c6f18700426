use std::time::Duration;

use eframe::egui;
use task_core::{DemoKind, StatusBar, ThreadManager};

use crate::{
    backend_bridge::{
        commands::{JobOptions, TaskCommand},
        runtime::WorkerRuntime,
    },
    controller::{
        events::UiError,
        orchestration::{dispatch_task_command, RunHistory},
    },
    ui::status_bar::show_status_bar,
};

pub const SETTINGS_STORAGE_KEY: &str = "task_demo_job_options";

pub struct DesktopGuiApp {
    manager: ThreadManager<StatusBar>,
    // Owns the blocking pool the manager dispatches to.
    _runtime: WorkerRuntime,
    options: JobOptions,
    history: RunHistory,
    status: String,
    pending: Vec<TaskCommand>,
}

impl DesktopGuiApp {
    pub fn new(
        manager: ThreadManager<StatusBar>,
        runtime: WorkerRuntime,
        persisted_options: Option<JobOptions>,
    ) -> Self {
        Self {
            manager,
            _runtime: runtime,
            options: persisted_options.unwrap_or_default(),
            history: RunHistory::default(),
            status: String::new(),
            pending: Vec::new(),
        }
    }

    fn flush_commands(&mut self) {
        for cmd in std::mem::take(&mut self.pending) {
            dispatch_task_command(
                &mut self.manager,
                cmd,
                &self.options,
                &self.history,
                &mut self.status,
            );
        }
    }

    fn show_jobs(&mut self, ui: &mut egui::Ui) {
        let active = self.manager.active_task();
        let busy = active.is_some();
        let can_cancel = active.as_ref().is_some_and(|task| !task.cancel_requested);

        ui.heading("Background jobs");
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            for kind in DemoKind::ALL {
                let label = match kind {
                    DemoKind::Scan => "Scan folders",
                    DemoKind::Copy => "Copy files",
                    DemoKind::Import => "Import records",
                };
                if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                    self.pending.push(TaskCommand::Start(kind));
                }
            }
            ui.separator();
            if ui.add_enabled(can_cancel, egui::Button::new("Cancel")).clicked() {
                self.pending.push(TaskCommand::Cancel);
            }
        });

        ui.separator();
        ui.add_enabled_ui(!busy, |ui| {
            ui.add(egui::Slider::new(&mut self.options.steps, 1..=200).text("steps"));
            ui.add(
                egui::Slider::new(&mut self.options.step_delay_ms, 0..=500)
                    .text("delay per step (ms)"),
            );
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.options.inject_failure, "Fail at step");
                ui.add_enabled(
                    self.options.inject_failure,
                    egui::DragValue::new(&mut self.options.fail_at).range(1..=self.options.steps),
                );
            });
        });

        if let Some(active) = active {
            ui.add_space(6.0);
            let elapsed = active.started_at.elapsed().as_secs_f32();
            let note = if active.cancel_requested {
                format!("{} ({}): stopping after {elapsed:.1}s", active.task_name, active.run_id)
            } else {
                format!("{} ({}): running for {elapsed:.1}s", active.task_name, active.run_id)
            };
            ui.label(egui::RichText::new(note).weak());
        }
    }

    fn show_error_banner(&mut self, ui: &mut egui::Ui) {
        let Some(failure) = self.manager.last_error() else {
            return;
        };
        let error = UiError::from_failure(failure);

        egui::Frame::new()
            .fill(egui::Color32::from_rgb(111, 53, 53))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    let text = format!("{} failed: {}", error.task_name(), error.message());
                    ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
                    if ui.small_button("Dismiss").clicked() {
                        self.pending.push(TaskCommand::ClearError);
                    }
                });
                ui.small(egui::RichText::new(error.hint()).color(egui::Color32::LIGHT_GRAY));
            });
    }

    fn show_history(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Finished runs").strong());
        let history = self.history.borrow();
        if history.is_empty() {
            ui.label(egui::RichText::new("Nothing finished yet").weak());
            return;
        }
        egui::ScrollArea::vertical().max_height(220.0).show(ui, |ui| {
            for line in history.iter().rev() {
                ui.monospace(line);
            }
        });
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.manager.process_events();

        let busy = self.manager.is_busy();
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            show_status_bar(ui, self.manager.display(), busy);
            if !self.status.is_empty() {
                ui.small(egui::RichText::new(&self.status).weak());
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_error_banner(ui);
            ui.add_space(8.0);
            self.show_jobs(ui);
            ui.add_space(12.0);
            self.show_history(ui);
        });

        self.flush_commands();

        // Keep pumping while a run is active or a dwell timer is pending.
        if busy || self.manager.display().is_visible() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(serialized) = serde_json::to_string(&self.options) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
