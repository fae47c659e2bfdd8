use eframe::egui::Context;

use crate::graph::ViewPhase;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        const FPS_SAMPLE_WINDOW: usize = 120;

        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps_bar || self.fps_samples.is_empty() {
            return None;
        }

        let avg = self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32;
        let mut text = format!("FPS {:.0} | avg {avg:.1}", self.fps_current);
        if let Some(low) = self.fps_samples.iter().copied().reduce(f32::min) {
            text.push_str(&format!(" | low {low:.0}"));
        }
        Some(text)
    }

    pub(in crate::app) fn graph_status_text(&self) -> String {
        let phase = match self.view.phase() {
            ViewPhase::Uninitialized => "waiting for canvas",
            ViewPhase::Built => "built",
            ViewPhase::Settling => "settling",
            ViewPhase::Settled => "settled",
        };
        let mut text = format!(
            "{} nodes / {} links, {phase}",
            self.view.node_count(),
            self.view.link_count()
        );

        // The first build reports every node as new.
        let diff = self.view.last_diff();
        if self.view.rebuild_count() > 1 && !diff.is_empty() {
            text.push_str(&format!(
                " | last change +{} / {} tier / -{}",
                diff.new_node_ids.len(),
                diff.updated_node_ids.len(),
                diff.removed_node_ids.len()
            ));
        }
        text
    }
}
