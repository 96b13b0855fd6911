//! Session coordinator
//!
//! Owns the notion of "the current round". A round starts on every source
//! change and on every forced recalculation: the result store is reset, the
//! display shows placeholders and one job per enabled channel is submitted.
//! Completions come back on the UI context and are applied here, where stale
//! ones are dropped and a successful beat grid may launch the chord job.

use crate::channel::{Channel, Ticket};
use crate::config::Config;
use crate::display::{DisplayState, CALCULATING, IDLE, WAITING};
use crate::host::Track;
use crate::job::{dispatch, AnalysisJob, Completion, Executor, JobRequest, JobResult};
use crate::store::{Outcome, ResultStore};
use beatlens_analysis::{Extractor, TempoAnalysis};
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Round {
    ticket: Ticket,
    path: PathBuf,
    /// Chords wait for this round's beat grid
    chords_deferred: bool,
}

pub struct Session {
    store: Arc<ResultStore>,
    executor: Arc<dyn Executor>,
    extractor: Arc<dyn Extractor>,
    completions: Sender<Completion>,
    current: Option<Round>,
    generation: u64,
    /// Round the chord job has already been submitted for
    chords_launched: Option<Ticket>,
}

impl Session {
    pub fn new(
        store: Arc<ResultStore>,
        executor: Arc<dyn Executor>,
        extractor: Arc<dyn Extractor>,
        completions: Sender<Completion>,
    ) -> Self {
        Self {
            store,
            executor,
            extractor,
            completions,
            current: None,
            generation: 0,
            chords_launched: None,
        }
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn current_ticket(&self) -> Option<&Ticket> {
        self.current.as_ref().map(|r| &r.ticket)
    }

    /// React to the host reporting a (possibly) new source
    ///
    /// Returns true when a new round was started.
    pub fn on_source_change(
        &mut self,
        track: Option<Track>,
        config: &Config,
        display: &mut DisplayState,
    ) -> bool {
        let Some(track) = track else {
            return false;
        };
        if self.current_ticket().map(|t| &t.source) == Some(&track.id) {
            return false;
        }
        self.restart(track, config, display);
        true
    }

    /// Start a new round for the current source, if there is one
    pub fn recalculate(&mut self, config: &Config, display: &mut DisplayState) -> bool {
        let Some(round) = self.current.clone() else {
            tracing::debug!("recalculate requested before any source was seen");
            return false;
        };
        let track = Track {
            id: round.ticket.source,
            path: round.path,
        };
        self.restart(track, config, display);
        true
    }

    /// Reset all channels for `track` and submit the jobs of the new round
    pub fn restart(&mut self, track: Track, config: &Config, display: &mut DisplayState) {
        self.generation += 1;
        let ticket = Ticket {
            source: track.id,
            generation: self.generation,
        };
        tracing::info!("starting analysis round {} ({})", ticket, track.path.display());

        let deferred = config.beat_synced_chords();
        self.store.reset_all(&ticket);
        self.current = Some(Round {
            ticket,
            path: track.path,
            chords_deferred: deferred,
        });
        self.chords_launched = None;

        let placeholder = |enabled: bool| Some(if enabled { CALCULATING } else { IDLE }.to_string());
        display.tempo = placeholder(config.bpm_enable);
        display.key = placeholder(config.key_enable);
        display.chords = if deferred {
            Some(WAITING.to_string())
        } else {
            placeholder(config.chords_enable)
        };

        if config.bpm_enable {
            self.launch(JobRequest::Tempo(config.tempo_params()));
        }
        if config.key_enable {
            self.launch(JobRequest::Key);
        }
        if config.chords_enable && !deferred {
            self.launch(JobRequest::Chords {
                params: config.chord_params(),
                ticks: None,
            });
        }
    }

    /// Apply a finished job on the UI context
    ///
    /// Returns false when the completion belongs to a superseded round and
    /// was dropped.
    pub fn apply_completion(
        &mut self,
        completion: Completion,
        config: &Config,
        display: &mut DisplayState,
    ) -> bool {
        let channel = completion.channel();
        if self.current_ticket() != Some(&completion.ticket) {
            tracing::trace!("dropping stale {} result for {}", channel, completion.ticket);
            return false;
        }
        if let Some(error) = completion.result.error() {
            tracing::warn!("{} analysis of {} failed: {}", channel, completion.ticket, error);
        }

        let Completion { ticket, result } = completion;
        let stored = match result {
            JobResult::Tempo(outcome) => {
                let beats = match &outcome {
                    Outcome::Success(tempo) => Some(Arc::clone(tempo)),
                    _ => None,
                };
                let stored = self.store.tempo.set_outcome(&ticket, outcome);
                let deferred = self.current.as_ref().is_some_and(|r| r.chords_deferred);
                if let (true, true, Some(tempo)) = (stored, deferred, beats) {
                    self.chain_chords(&ticket, &tempo, config, display);
                }
                stored
            }
            JobResult::Key(outcome) => self.store.key.set_outcome(&ticket, outcome),
            JobResult::Chords(outcome) => self.store.chords.set_outcome(&ticket, outcome),
        };

        if stored {
            tracing::debug!("{} result stored for {}", channel, ticket);
        }
        stored
    }

    /// Submit the beat-synchronized chord job for a round's beat grid
    ///
    /// At most one chord job is ever submitted per round.
    pub fn chain_chords(
        &mut self,
        ticket: &Ticket,
        tempo: &TempoAnalysis,
        config: &Config,
        display: &mut DisplayState,
    ) -> bool {
        if self.current_ticket() != Some(ticket) || self.chords_launched.as_ref() == Some(ticket) {
            return false;
        }
        let ticks: Arc<[f32]> = Arc::from(tempo.ticks.as_slice());
        tracing::debug!("chaining chords onto {} beats of {}", ticks.len(), ticket);
        self.launch(JobRequest::Chords {
            params: config.chord_params(),
            ticks: Some(ticks),
        });
        display.chords = Some(CALCULATING.to_string());
        true
    }

    fn launch(&mut self, request: JobRequest) {
        let Some(round) = &self.current else {
            return;
        };
        let job = AnalysisJob {
            ticket: round.ticket.clone(),
            path: round.path.clone(),
            request,
        };
        if job.channel() == Channel::Chords {
            self.chords_launched = Some(round.ticket.clone());
        }
        tracing::info!("launching {} analysis for {}", job.channel(), job.ticket);
        dispatch(
            self.executor.as_ref(),
            Arc::clone(&self.extractor),
            job,
            self.completions.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::completion_channel;
    use crate::job::testing::{FakeExtractor, ManualExecutor};
    use crossbeam_channel::Receiver;
    use std::sync::atomic::Ordering;

    struct Harness {
        session: Session,
        executor: Arc<ManualExecutor>,
        extractor: Arc<FakeExtractor>,
        rx: Receiver<Completion>,
        display: DisplayState,
        config: Config,
    }

    impl Harness {
        fn new(config: Config) -> Self {
            let executor = Arc::new(ManualExecutor::default());
            let extractor = Arc::new(FakeExtractor::default());
            let (tx, rx) = completion_channel();
            let session = Session::new(
                Arc::new(ResultStore::new()),
                executor.clone(),
                extractor.clone(),
                tx,
            );
            Self {
                session,
                executor,
                extractor,
                rx,
                display: DisplayState::default(),
                config,
            }
        }

        fn switch(&mut self, name: &str) -> bool {
            let track = Track::new(name, format!("/music/{}.flac", name));
            self.session
                .on_source_change(Some(track), &self.config, &mut self.display)
        }

        /// Run one queued job and apply its completion
        fn finish(&mut self, channel: &str) -> bool {
            assert!(self.executor.run(channel), "no queued {} job", channel);
            let completion = self.rx.try_recv().unwrap();
            self.session
                .apply_completion(completion, &self.config, &mut self.display)
        }

        fn chords_text(&self) -> Option<&str> {
            self.display.chords.as_deref()
        }
    }

    fn following() -> Config {
        Config {
            chords_follow_the_rhythm: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_source_change_launches_enabled_channels() {
        let mut h = Harness::new(Config::default());
        assert!(h.switch("a"));
        assert_eq!(h.executor.pending(), vec!["tempo", "key", "chords"]);
        assert_eq!(h.display.tempo.as_deref(), Some(CALCULATING));
        assert_eq!(h.chords_text(), Some(CALCULATING));
        assert!(h.session.store().key.snapshot().outcome.is_pending());
    }

    #[test]
    fn test_same_or_missing_source_is_ignored() {
        let mut h = Harness::new(Config::default());
        assert!(h.switch("a"));
        assert!(!h.switch("a"));
        assert!(!h
            .session
            .on_source_change(None, &h.config.clone(), &mut h.display));
        assert_eq!(h.executor.pending().len(), 3);
    }

    #[test]
    fn test_disabled_channels_are_idle() {
        let mut h = Harness::new(Config {
            key_enable: false,
            chords_enable: false,
            ..Default::default()
        });
        h.switch("a");
        assert_eq!(h.executor.pending(), vec!["tempo"]);
        assert_eq!(h.display.key.as_deref(), Some(IDLE));
        assert_eq!(h.chords_text(), Some(IDLE));
    }

    #[test]
    fn test_chords_chain_onto_tempo_success() {
        let mut h = Harness::new(following());
        h.switch("a");
        assert_eq!(h.executor.pending(), vec!["tempo", "key"]);
        assert_eq!(h.chords_text(), Some(WAITING));

        assert!(h.finish("tempo"));
        assert_eq!(h.executor.pending(), vec!["key", "chords"]);
        assert_eq!(h.chords_text(), Some(CALCULATING));

        assert!(h.finish("chords"));
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 1);
        match h.session.store().chords.snapshot().outcome {
            Outcome::Success(c) => assert_eq!(c.chords.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chords_never_chained_twice() {
        let mut h = Harness::new(following());
        h.switch("a");
        assert!(h.executor.run("tempo"));
        let completion = h.rx.try_recv().unwrap();

        assert!(h
            .session
            .apply_completion(completion.clone(), &h.config.clone(), &mut h.display));
        assert!(h
            .session
            .apply_completion(completion, &h.config.clone(), &mut h.display));
        assert_eq!(h.executor.pending(), vec!["key", "chords"]);
    }

    #[test]
    fn test_no_chain_when_free_running() {
        let mut h = Harness::new(Config::default());
        h.switch("a");
        h.finish("chords");
        h.finish("tempo");
        assert_eq!(h.executor.pending(), vec!["key"]);
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_follow_without_tempo_runs_free() {
        let mut h = Harness::new(Config {
            chords_follow_the_rhythm: true,
            bpm_enable: false,
            ..Default::default()
        });
        h.switch("a");
        assert_eq!(h.executor.pending(), vec!["key", "chords"]);
        h.finish("chords");
        assert_eq!(h.extractor.chord_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tempo_failure_leaves_chords_waiting() {
        let mut h = Harness::new(following());
        h.switch("bad");
        assert!(h.finish("tempo"));
        assert!(h.session.store().tempo.snapshot().outcome.is_failure());
        assert_eq!(h.chords_text(), Some(WAITING));
        assert_eq!(h.executor.pending(), vec!["key"]);
        assert_eq!(h.extractor.chord_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chords_wait_again_after_failure_then_recover() {
        let mut h = Harness::new(following());
        h.switch("bad");
        assert!(h.finish("tempo"));
        assert_eq!(h.chords_text(), Some(WAITING));

        // Same failing source: a manual recalculate waits again
        assert!(h.session.recalculate(&h.config.clone(), &mut h.display));
        assert_eq!(h.chords_text(), Some(WAITING));
        assert!(h.finish("tempo"));
        assert_eq!(h.extractor.chord_calls.load(Ordering::SeqCst), 0);

        // A good source chains exactly once
        assert!(h.switch("b"));
        assert_eq!(h.chords_text(), Some(WAITING));
        assert!(h.finish("tempo"));
        assert_eq!(h.chords_text(), Some(CALCULATING));
        assert!(h.finish("chords"));
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 1);
        assert!(!h.executor.pending().contains(&"chords".to_string()));
    }

    #[test]
    fn test_recalculate_after_failure_chains_on_success() {
        let mut h = Harness::new(following());
        h.switch("a");
        h.session.store().tempo.set_outcome(
            &h.session.current_ticket().cloned().unwrap(),
            Outcome::Failure("no beats".into()),
        );
        assert!(h.session.recalculate(&h.config.clone(), &mut h.display));
        assert_eq!(h.chords_text(), Some(WAITING));

        // First round's tempo is stale, the recalculated one chains
        assert!(!h.finish("tempo"));
        assert!(h.finish("tempo"));
        assert_eq!(h.chords_text(), Some(CALCULATING));
        assert!(h.finish("chords"));
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_decided_by_round_config() {
        let mut h = Harness::new(following());
        h.switch("a");
        assert_eq!(h.chords_text(), Some(WAITING));

        // Follow-the-rhythm unticked while the beat grid is computed
        h.config = Config::default();
        assert!(h.finish("tempo"));
        assert_eq!(h.chords_text(), Some(CALCULATING));
        assert_eq!(h.executor.pending(), vec!["key", "chords"]);
        assert!(h.finish("chords"));
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_chain_when_follow_ticked_mid_round() {
        let mut h = Harness::new(Config::default());
        h.switch("a");
        h.config = following();
        assert!(h.finish("tempo"));
        assert_eq!(h.executor.pending(), vec!["key", "chords"]);
        assert!(h.finish("chords"));
        assert_eq!(h.extractor.beat_synced_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_switch_while_key_job_runs() {
        let mut h = Harness::new(Config::default());
        h.switch("a");
        h.switch("b");
        let current = h.session.current_ticket().cloned().unwrap();
        assert_eq!(current.source.as_str(), "b");

        // A's key job completes after the switch
        assert!(!h.finish("key"));
        let snap = h.session.store().key.snapshot();
        assert!(snap.outcome.is_pending());
        assert!(!snap.finished);
        assert_eq!(snap.ticket, Some(current));

        // B's key job is the next one queued
        assert!(h.finish("key"));
        match h.session.store().key.snapshot().outcome {
            Outcome::Success(k) => assert_eq!(k.key, "B"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stale_tempo_does_not_chain() {
        let mut h = Harness::new(following());
        h.switch("a");
        h.switch("b");
        assert!(!h.finish("tempo"));
        assert_eq!(h.executor.pending(), vec!["key", "tempo", "key"]);
    }

    #[test]
    fn test_recalculate_supersedes_same_source() {
        let mut h = Harness::new(Config::default());
        assert!(!h
            .session
            .recalculate(&h.config.clone(), &mut h.display));

        h.switch("a");
        let first = h.session.current_ticket().cloned().unwrap();
        assert!(h.session.recalculate(&h.config.clone(), &mut h.display));
        let second = h.session.current_ticket().cloned().unwrap();
        assert_eq!(first.source, second.source);
        assert_ne!(first, second);

        // The first round's tempo result is stale
        assert!(!h.finish("tempo"));
        assert!(h.finish("tempo"));
    }
}
