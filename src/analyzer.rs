use bounded_integer::BoundedUsize;
use tracing::{debug, error, instrument, trace};

use crate::{
	analysis::{AnalysisResult, ExplanationOutput, GapsResult, PartOfSpeechResult, RuleExplanation},
	client::CompletionClient,
	normalize::Normalizer,
	request::{AnalysisRequest, GenerationOptions, Mode, Task, MAX_OPTIONS},
	types::{AnalyzerError, AuthError, ValidationError},
	Result,
};

/// Index of one of the four option inputs (A to D).
pub type OptionSlot = BoundedUsize<0, { MAX_OPTIONS - 1 }>;

/// The user's input fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisForm {
	pub mode: Mode,
	/// Sentence for [`Mode::PartOfSpeech`].
	pub sentence: String,
	/// Question for [`Mode::FillInTheGaps`].
	pub question: String,
	pub options: [String; MAX_OPTIONS],
}

impl AnalysisForm {
	pub fn option(&self, slot: OptionSlot) -> &str {
		&self.options[slot.get()]
	}

	pub fn set_option(&mut self, slot: OptionSlot, value: impl Into<String>) {
		self.options[slot.get()] = value.into();
	}

	/// The request described by the fields of the current mode.
	pub fn to_request(&self) -> AnalysisRequest {
		match self.mode {
			Mode::PartOfSpeech => AnalysisRequest::part_of_speech(self.sentence.clone()),
			Mode::FillInTheGaps =>
				AnalysisRequest::fill_in_the_gaps(self.question.clone(), self.options.clone()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
	/// Something went wrong with the attempt.
	Destructive,
	/// The user has to configure something, e.g. an API key, before retrying.
	Configuration,
}

/// A transient, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub kind: NotificationKind,
	pub title: String,
	pub description: String,
	pub raised_at: String,
}

impl Notification {
	fn new(kind: NotificationKind, title: &str, description: impl Into<String>) -> Self {
		Self {
			kind,
			title: title.to_string(),
			description: description.into(),
			raised_at: chrono::Utc::now().to_rfc3339(),
		}
	}

	/// User facing message for `err`. `input` names the field the user typed into.
	pub fn for_error(err: &AnalyzerError, input: &str) -> Self {
		use NotificationKind::*;

		match err {
			AnalyzerError::Validation(ValidationError::EmptyInput) =>
				Self::new(Destructive, "Input required", format!("Please enter a {}.", input)),
			AnalyzerError::Validation(ValidationError::MissingGapMarker) => Self::new(
				Destructive,
				"Invalid question",
				"The question must contain a '_' or '-' for the gap.",
			),
			AnalyzerError::Validation(ValidationError::TooManyOptions(_)) => Self::new(
				Destructive,
				"Invalid options",
				format!("At most {} options can be given.", MAX_OPTIONS),
			),
			AnalyzerError::Auth(AuthError::MissingApiKey { .. }) => Self::new(
				Configuration,
				"API key required",
				"No API key is configured. Add your API key and try again.",
			),
			AnalyzerError::Auth(AuthError::InvalidApiKey { .. }) => Self::new(
				Configuration,
				"Invalid API key",
				"The API key was rejected. Check your API key and try again.",
			),
			AnalyzerError::Busy => Self::new(
				Destructive,
				"Analysis in progress",
				"Please wait for the current analysis to finish.",
			),
			AnalyzerError::Transport(_) | AnalyzerError::Parse(_) => Self::new(
				Destructive,
				"Analysis Failed",
				"Something went wrong. Please try again.",
			),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnalysisState {
	#[default]
	Idle,
	Loading,
	Success,
	Failed(Notification),
}

/// What the presentation layer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
	Empty,
	Loading,
	Result(&'a AnalysisResult),
	Failed { notification: &'a Notification, result: Option<&'a AnalysisResult> },
}

/// Drives one analysis at a time from user input to a typed result.
///
/// Every operation builds a [`Task`], sends it through the [`CompletionClient`] and
/// normalizes the response, moving through [`AnalysisState`] on the way.
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Idle
///     Idle --> Loading: run_analysis / run_extensive_explanation / run_rule_explanation
///     Success --> Loading: run_*
///     Failed --> Loading: run_*
///     Loading --> Success: completion parsed
///     Loading --> Failed: transport, auth or parse error
///     Idle --> Failed: validation error
///     Success --> Failed: validation error
///     Failed --> Idle: dismiss_notification
///     Loading --> Idle: clear
///     Success --> Idle: clear
///     Failed --> Idle: clear
/// ```
///
/// While `Loading` the trigger is disabled: further `run_*` calls fail with
/// [`AnalyzerError::Busy`] and change nothing. Requests in flight are never cancelled; a
/// dropped future leaves the analyzer `Loading` until [`Analyzer::clear`] is called.
#[derive(Debug)]
pub struct Analyzer<C: CompletionClient> {
	client: C,
	normalizer: Normalizer,
	generation: GenerationOptions,
	form: AnalysisForm,
	state: AnalysisState,
	result: Option<AnalysisResult>,
	/// The primary task that produced `result`.
	origin: Option<Task>,
}

impl<C: CompletionClient> Analyzer<C> {
	pub fn new(client: C, generation: GenerationOptions) -> Self {
		Self {
			normalizer: Normalizer::new(client.provider()),
			client,
			generation,
			form: AnalysisForm::default(),
			state: AnalysisState::Idle,
			result: None,
			origin: None,
		}
	}

	pub fn client(&self) -> &C {
		&self.client
	}

	pub fn form(&self) -> &AnalysisForm {
		&self.form
	}

	pub fn form_mut(&mut self) -> &mut AnalysisForm {
		&mut self.form
	}

	pub fn state(&self) -> &AnalysisState {
		&self.state
	}

	pub fn result(&self) -> Option<&AnalysisResult> {
		self.result.as_ref()
	}

	/// False while a request is in flight.
	pub fn is_trigger_enabled(&self) -> bool {
		self.state != AnalysisState::Loading
	}

	pub fn view(&self) -> View<'_> {
		match (&self.state, &self.result) {
			(AnalysisState::Loading, _) => View::Loading,
			(AnalysisState::Failed(notification), result) =>
				View::Failed { notification, result: result.as_ref() },
			(_, Some(result)) => View::Result(result),
			(_, None) => View::Empty,
		}
	}

	/// Run the analysis described by the form.
	pub async fn submit(&mut self) -> Result<&AnalysisResult> {
		let request = self.form.to_request();
		self.run_analysis(request).await
	}

	/// Validate `request`, query the model and store the typed result.
	///
	/// The previous result is discarded as soon as the run starts. Invalid input fails with
	/// [`AnalyzerError::Validation`] without contacting the model.
	#[instrument(skip(self))]
	pub async fn run_analysis(&mut self, request: AnalysisRequest) -> Result<&AnalysisResult> {
		self.ensure_trigger_enabled()?;

		self.result = None;
		self.origin = None;

		let input = match request.mode {
			Mode::PartOfSpeech => "sentence",
			Mode::FillInTheGaps => "question",
		};

		let task = Task::try_from(&request).map_err(|e| self.fail(e.into(), input))?;

		self.execute(task, input).await
	}

	/// Fetch the extensive explanation for the current fill-in-the-gaps result and merge it in.
	///
	/// Returns `Ok(None)` without doing anything when there is no fill-in-the-gaps result or it
	/// already carries an extensive explanation. If the call fails the existing result is kept.
	#[instrument(skip(self))]
	pub async fn run_extensive_explanation(&mut self) -> Result<Option<&AnalysisResult>> {
		self.ensure_trigger_enabled()?;

		let Some(gaps) = self
			.result
			.as_ref()
			.and_then(AnalysisResult::as_gaps)
			.filter(|gaps| !gaps.has_extensive_explanation())
		else {
			trace!("No fill-in-the-gaps result awaiting an extensive explanation");
			return Ok(None)
		};

		let options = match &self.origin {
			Some(Task::FillInTheGaps { options, .. }) => options.clone(),
			_ => vec![],
		};

		let task = Task::extensive_explanation(&gaps.question, &options, &gaps.correct_answer)
			.map_err(|e| self.fail(e.into(), "question"))?;

		self.execute(task, "question").await.map(Some)
	}

	/// Explain in Bangla the grammar rule behind a fill-in-the-gaps sentence.
	#[instrument(skip(self))]
	pub async fn run_rule_explanation(&mut self, sentence: &str) -> Result<&AnalysisResult> {
		self.ensure_trigger_enabled()?;

		self.result = None;
		self.origin = None;

		let task = Task::grammar_rule(sentence).map_err(|e| self.fail(e.into(), "sentence"))?;

		self.execute(task, "sentence").await
	}

	/// Reset the form, the result and the state.
	pub fn clear(&mut self) {
		debug!("Clearing analyzer");

		self.form = AnalysisForm::default();
		self.state = AnalysisState::Idle;
		self.result = None;
		self.origin = None;
	}

	/// Dismiss the failure notification, if any.
	pub fn dismiss_notification(&mut self) {
		if let AnalysisState::Failed(_) = self.state {
			self.state = AnalysisState::Idle;
		}
	}

	fn ensure_trigger_enabled(&self) -> Result<()> {
		if !self.is_trigger_enabled() {
			debug!("Rejecting trigger while an analysis is in flight");
			return Err(AnalyzerError::Busy)
		}
		Ok(())
	}

	async fn execute(&mut self, task: Task, input: &str) -> Result<&AnalysisResult> {
		self.state = AnalysisState::Loading;

		debug!("Running {} task", task.name());

		match self.complete(&task).await {
			Ok(result) => {
				if !matches!(task, Task::ExtensiveExplanation { .. }) {
					self.origin = Some(task);
				}
				self.state = AnalysisState::Success;
				Ok(&*self.result.insert(result))
			},
			Err(e) => Err(self.fail(e, input)),
		}
	}

	/// One completion cycle: payload, send, normalize.
	async fn complete(&self, task: &Task) -> Result<AnalysisResult> {
		let raw = self.client.send(&task.payload(&self.generation)).await?;

		let result = match task {
			Task::PartOfSpeech { .. } => self.normalizer.parse::<PartOfSpeechResult>(&raw)?.into(),
			Task::FillInTheGaps { question, .. } => {
				let gaps = self.normalizer.parse::<GapsResult>(&raw)?;
				// The rendered answer is substituted into the question as it was asked.
				GapsResult {
					question: question.clone(),
					correct_answer: gaps.correct_answer,
					explanation: gaps.explanation,
					extensive_explanation: None,
				}
				.into()
			},
			Task::ExtensiveExplanation { question, correct_answer, .. } => {
				let output = self.normalizer.parse::<ExplanationOutput>(&raw)?;
				let mut gaps = self
					.result
					.as_ref()
					.and_then(AnalysisResult::as_gaps)
					.cloned()
					.unwrap_or_else(|| GapsResult {
						question: question.clone(),
						correct_answer: correct_answer.clone(),
						..Default::default()
					});
				gaps.extensive_explanation = Some(output.explanation);
				gaps.into()
			},
			Task::GrammarRule { sentence } => RuleExplanation {
				sentence: sentence.clone(),
				explanation: self.normalizer.parse::<ExplanationOutput>(&raw)?.explanation,
			}
			.into(),
		};

		Ok(result)
	}

	fn fail(&mut self, err: AnalyzerError, input: &str) -> AnalyzerError {
		match &err {
			AnalyzerError::Validation(e) => debug!("Rejected input: {}", e),
			e => error!("Analysis failed: {}", e),
		}

		self.state = AnalysisState::Failed(Notification::for_error(&err, input));
		err
	}
}
