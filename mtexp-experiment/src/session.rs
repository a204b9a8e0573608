use crate::config::{ExperimentConfig, Identity};
use crate::recorder::ResultRecorder;
use crate::timer::Frame;
use crate::trial::Trial;
use mtexp_core::{Answer, Page, ResultSink, Screen, SinkError, StimulusExport, StimulusKey};
use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

/// Discrete subject and operator inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Start the next trial from the greeting page
    Advance,
    Respond(Answer),
    Shutdown,
}

/// Everything the session tracks between trials
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    page: Page,
    trial_index: u64,
    last_correct: Option<bool>,
    identity: Identity,
}

impl SessionState {
    fn new(identity: Identity) -> Self {
        Self {
            page: Page::Greeting,
            trial_index: 0,
            last_correct: None,
            identity,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Index of the most recently started trial; 0 before the first
    pub fn trial_index(&self) -> u64 {
        self.trial_index
    }

    pub fn last_correct(&self) -> Option<bool> {
        self.last_correct
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Greeting → Trial → Response → Greeting loop over back-to-back trials.
///
/// The host calls [`handle`](Self::handle) for each input event and
/// [`poll`](Self::poll) once per tick. Neither blocks, except for the sink
/// call made when a response is recorded.
pub struct SessionFlow<S, R> {
    state: SessionState,
    config: ExperimentConfig,
    current: Option<Trial>,
    recorder: ResultRecorder<S>,
    exporter: Option<Box<dyn StimulusExport>>,
    rng: R,
}

impl<S, R> SessionFlow<S, R>
where
    S: ResultSink,
    R: Rng,
{
    pub fn new(config: ExperimentConfig, identity: Identity, sink: S, rng: R) -> Self {
        info!(
            epoch = identity.epoch,
            experiment_id = %identity.experiment_id,
            "session created"
        );
        Self {
            state: SessionState::new(identity),
            config,
            current: None,
            recorder: ResultRecorder::new(sink),
            exporter: None,
            rng,
        }
    }

    pub fn with_exporter(mut self, exporter: Box<dyn StimulusExport>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Applies one input. Returns whether the current page accepted it;
    /// inputs that do not apply are ignored. A sink failure while recording
    /// a response is returned as is and must end the run.
    pub fn handle(&mut self, input: Input) -> Result<bool, SinkError> {
        match (self.state.page, input) {
            (Page::Done, _) => Ok(false),
            (_, Input::Shutdown) => {
                self.set_page(Page::Done);
                Ok(true)
            }
            (Page::Greeting, Input::Advance) => {
                self.start_trial();
                Ok(true)
            }
            (Page::Response, Input::Respond(answer)) => self.record_response(answer),
            _ => Ok(false),
        }
    }

    /// Advances the running trial to `now` and describes this tick's frame
    pub fn poll(&mut self, now: Instant) -> Screen<'_> {
        let mut frame = Frame::Blank;
        if self.state.page == Page::Trial {
            let finished = self.current.as_mut().map(|trial| {
                frame = trial.poll(now);
                trial.is_done()
            });
            match finished {
                Some(true) => self.set_page(Page::Response),
                Some(false) => {}
                None => self.set_page(Page::Greeting),
            }
        }

        match (self.state.page, self.current.as_ref()) {
            (Page::Greeting, _) => Screen::Greeting {
                last_correct: self.state.last_correct,
            },
            (Page::Trial, Some(trial)) if frame == Frame::Stimulus => Screen::Stimulus {
                trial_index: trial.index,
                grid: trial.grid(),
            },
            (Page::Response, Some(trial)) => Screen::Response {
                trial_index: trial.index,
                question: trial.question(),
            },
            (Page::Done, _) => Screen::Done,
            _ => Screen::Blank,
        }
    }

    fn start_trial(&mut self) {
        self.state.trial_index += 1;
        let index = self.state.trial_index;
        let place_target = self.rng.random_range(1..=2) == 1;
        let trial = Trial::generate(index, &self.config, place_target, &mut self.rng);
        info!(trial = index, target = place_target, "trial started");

        if let Some(exporter) = self.exporter.as_mut() {
            let key = StimulusKey {
                experiment_id: self.state.identity.experiment_id.clone(),
                epoch: self.state.identity.epoch,
                trial_index: index,
            };
            if let Err(e) = exporter.export(&key, trial.grid()) {
                warn!(trial = index, "stimulus export failed: {e}");
            }
        }

        self.current = Some(trial);
        self.set_page(Page::Trial);
    }

    fn record_response(&mut self, response: Answer) -> Result<bool, SinkError> {
        let Some(trial) = self.current.as_ref() else {
            return Ok(false);
        };

        let measured = trial.measured_display_time().unwrap_or_default();
        let record = self.recorder.emit(
            &self.state.identity,
            trial.index,
            trial.expected(),
            response,
            measured,
        )?;

        // Feedback only for trials that were persisted
        self.state.last_correct = Some(record.is_correct());
        self.set_page(Page::Greeting);
        Ok(true)
    }

    fn set_page(&mut self, page: Page) {
        if self.state.page != page {
            info!("page changed {} -> {}", self.state.page, page);
            self.state.page = page;
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn page(&self) -> Page {
        self.state.page
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.current.as_ref()
    }

    pub fn recorder(&self) -> &ResultRecorder<S> {
        &self.recorder
    }

    pub fn is_done(&self) -> bool {
        self.state.page == Page::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtexp_core::{ExportError, Grid, ResultRecord};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Flow = SessionFlow<Vec<ResultRecord>, StdRng>;

    fn flow() -> Flow {
        SessionFlow::new(
            ExperimentConfig::default(),
            Identity::new("pilot", 1_700_000_000),
            Vec::new(),
            StdRng::seed_from_u64(9),
        )
    }

    fn run_to_response(flow: &mut Flow, t0: Instant) -> Instant {
        let mut now = t0;
        while flow.page() == Page::Trial {
            flow.poll(now);
            now += Duration::from_millis(16);
        }
        now
    }

    #[test]
    fn first_greeting_shows_no_feedback() {
        let mut flow = flow();
        assert_eq!(
            flow.poll(Instant::now()),
            Screen::Greeting { last_correct: None }
        );
        assert_eq!(flow.state().trial_index(), 0);
    }

    #[test]
    fn advance_starts_numbered_trial() {
        let mut flow = flow();
        assert!(flow.handle(Input::Advance).expect("advance"));
        assert_eq!(flow.page(), Page::Trial);
        assert_eq!(flow.state().trial_index(), 1);
        assert_eq!(flow.current_trial().map(|t| t.index), Some(1));
    }

    #[test]
    fn inputs_outside_their_page_are_ignored() {
        let mut flow = flow();
        assert!(!flow.handle(Input::Respond(Answer::Yes)).expect("handle"));
        flow.handle(Input::Advance).expect("advance");
        assert!(!flow.handle(Input::Advance).expect("handle"));
        assert!(!flow.handle(Input::Respond(Answer::No)).expect("handle"));
        assert_eq!(flow.state().trial_index(), 1);
        assert_eq!(flow.recorder().emitted(), 0);
    }

    #[test]
    fn response_scores_records_and_returns_to_greeting() {
        let mut flow = flow();
        flow.handle(Input::Advance).expect("advance");
        let now = run_to_response(&mut flow, Instant::now());
        assert_eq!(flow.page(), Page::Response);

        let expected = flow.current_trial().expect("trial").expected_answer();
        assert!(flow.handle(Input::Respond(expected)).expect("respond"));
        assert!(!flow.handle(Input::Respond(expected)).expect("second response"));

        assert_eq!(
            flow.poll(now),
            Screen::Greeting {
                last_correct: Some(true)
            }
        );
        let records = flow.recorder().sink();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trial_index, 1);
        assert_eq!(records[0].expected, expected);
        assert!(records[0].display_time >= Duration::from_millis(90));
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut flow = flow();
        flow.handle(Input::Advance).expect("advance");
        assert!(flow.handle(Input::Shutdown).expect("shutdown"));
        assert!(flow.is_done());
        assert_eq!(flow.poll(Instant::now()), Screen::Done);
        assert!(!flow.handle(Input::Advance).expect("advance"));
        assert!(!flow.handle(Input::Shutdown).expect("shutdown"));
    }

    #[derive(Default, Clone)]
    struct Exports(Rc<RefCell<Vec<(StimulusKey, Grid)>>>);

    impl StimulusExport for Exports {
        fn export(&mut self, key: &StimulusKey, grid: &Grid) -> Result<(), ExportError> {
            self.0.borrow_mut().push((key.clone(), grid.clone()));
            Ok(())
        }
    }

    struct BrokenExport;

    impl StimulusExport for BrokenExport {
        fn export(&mut self, _key: &StimulusKey, _grid: &Grid) -> Result<(), ExportError> {
            Err(ExportError::Render("no canvas".into()))
        }
    }

    #[test]
    fn each_trial_is_exported_once_with_its_key() {
        let exports = Exports::default();
        let mut flow = flow().with_exporter(Box::new(exports.clone()));

        for _ in 0..3 {
            flow.handle(Input::Advance).expect("advance");
            run_to_response(&mut flow, Instant::now());
            flow.handle(Input::Respond(Answer::Yes)).expect("respond");
        }

        let exported = exports.0.borrow();
        let indices: Vec<u64> = exported.iter().map(|(k, _)| k.trial_index).collect();
        assert_eq!(indices, [1, 2, 3]);
        assert!(exported.iter().all(|(k, _)| k.experiment_id == "pilot"));
        assert!(exported.iter().all(|(k, _)| k.epoch == 1_700_000_000));
    }

    #[test]
    fn export_failure_does_not_stop_the_trial() {
        let mut flow = flow().with_exporter(Box::new(BrokenExport));
        assert!(flow.handle(Input::Advance).expect("advance"));
        assert_eq!(flow.page(), Page::Trial);
    }
}
