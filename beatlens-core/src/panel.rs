//! The analysis panel as seen by its host
//!
//! [`AnalysisPanel`] lives on the UI context and ties the session, the
//! result store, the render loop and the configuration together. The host
//! forwards track changes, menu picks and render ticks to it.

use crate::config::Config;
use crate::display::{DisplaySink, DisplayState, MenuAction};
use crate::form::{ConfigForm, FormResponse};
use crate::host::{PlaybackHost, Track};
use crate::job::{completion_channel, Completion, Executor, ThreadExecutor};
use crate::render::{RenderLoop, TickOutcome};
use crate::session::Session;
use crate::store::ResultStore;
use beatlens_analysis::{Extractor, NativeExtractor};
use crossbeam_channel::Receiver;
use std::sync::Arc;

pub struct AnalysisPanel {
    config: Config,
    session: Session,
    render: RenderLoop,
    labels: DisplayState,
    completions: Receiver<Completion>,
    form: Option<ConfigForm>,
}

impl AnalysisPanel {
    pub fn new(config: Config, executor: Arc<dyn Executor>, extractor: Arc<dyn Extractor>) -> Self {
        let (tx, rx) = completion_channel();
        let store = Arc::new(ResultStore::new());
        Self {
            config,
            session: Session::new(store, executor, extractor, tx),
            render: RenderLoop::new(),
            labels: DisplayState::default(),
            completions: rx,
            form: None,
        }
    }

    /// Panel running the native extractor on one worker thread per job
    pub fn native(config: Config) -> Self {
        Self::new(config, Arc::new(ThreadExecutor), Arc::new(NativeExtractor::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn labels(&self) -> &DisplayState {
        &self.labels
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render
    }

    pub fn store(&self) -> &ResultStore {
        self.session.store()
    }

    /// Host notification; sent on track changes and seeks alike
    pub fn on_track_changed(&mut self, host: &dyn PlaybackHost) {
        self.render.reset_beat();
        let track = Track::current(host);
        if self
            .session
            .on_source_change(track, &self.config, &mut self.labels)
        {
            self.render.clear();
        }
    }

    pub fn menu(&mut self, action: MenuAction) {
        match action {
            MenuAction::Configure => {
                self.form = Some(ConfigForm::new(&self.config));
            }
            MenuAction::Recalculate => {
                if self.session.recalculate(&self.config, &mut self.labels) {
                    self.render.clear();
                }
            }
        }
    }

    /// Open settings form, if any
    pub fn form(&self) -> Option<&ConfigForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ConfigForm> {
        self.form.as_mut()
    }

    /// Close or commit the settings form
    pub fn respond_form(&mut self, response: FormResponse) {
        let Some(form) = &self.form else {
            return;
        };
        if let Some(config) = form.respond(response) {
            self.apply_config(config);
        }
        if response != FormResponse::Apply {
            self.form = None;
        }
    }

    /// Replace the configuration; it takes effect from the next tick
    pub fn apply_config(&mut self, config: Config) {
        tracing::info!(
            "configuration applied ({} fps, tempo={}, key={}, chords={})",
            config.update_fps,
            config.bpm_enable,
            config.key_enable,
            config.chords_enable
        );
        self.config = config;
        self.render.mark_config_changed();
    }

    /// Apply every completion delivered since the last call
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        // Chained jobs may enqueue more completions while draining
        while let Ok(completion) = self.completions.try_recv() {
            if self
                .session
                .apply_completion(completion, &self.config, &mut self.labels)
            {
                applied += 1;
            }
        }
        applied
    }

    pub fn tick(&mut self, position: f32, sink: &mut dyn DisplaySink) -> TickOutcome {
        self.render.tick(
            &self.config,
            position,
            self.session.store(),
            &mut self.labels,
            sink,
        )
    }
}
