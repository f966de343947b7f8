//! Turns user input into prompts and [`CompletionPayload`]s.
//!
//! Everything in here is a pure transformation. Validation happens when an
//! [`AnalysisRequest`] is converted into a [`Task`], so a [`Task`] always holds input that is
//! safe to send.

use async_openai::types::Role;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{ValidationError, WrapperRole};

/// Characters that mark the blank in a fill-in-the-gaps question.
pub const GAP_MARKERS: [char; 2] = ['_', '-'];

/// Maximum number of answer options a question may carry.
pub const MAX_OPTIONS: usize = 4;

const TUTOR_PERSONA: &str = "You are an expert English grammar tutor.";
const LINGUIST_PERSONA: &str = "You are an expert linguist.";

/// Which analysis the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
	#[default]
	#[serde(rename = "pos")]
	PartOfSpeech,
	#[serde(rename = "gaps")]
	FillInTheGaps,
}

/// Raw user input for a primary analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
	pub mode: Mode,
	/// The sentence in [`Mode::PartOfSpeech`], the question in [`Mode::FillInTheGaps`].
	pub sentence_or_question: String,
	/// Up to [`MAX_OPTIONS`] answer options. Blank entries are allowed and ignored.
	pub options: Vec<String>,
}

impl AnalysisRequest {
	pub fn part_of_speech(sentence: impl Into<String>) -> Self {
		Self { mode: Mode::PartOfSpeech, sentence_or_question: sentence.into(), options: vec![] }
	}

	pub fn fill_in_the_gaps<I, S>(question: impl Into<String>, options: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			mode: Mode::FillInTheGaps,
			sentence_or_question: question.into(),
			options: options.into_iter().map(Into::into).collect(),
		}
	}

	/// Options with blank entries removed, trimmed.
	pub fn filled_options(&self) -> Vec<String> {
		filled_options(&self.options)
	}
}

fn filled_options(options: &[String]) -> Vec<String> {
	options
		.iter()
		.map(|option| option.trim())
		.filter(|option| !option.is_empty())
		.map(str::to_string)
		.collect()
}

fn require_text(input: &str) -> Result<String, ValidationError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::EmptyInput)
	}
	Ok(trimmed.to_string())
}

pub fn has_gap_marker(question: &str) -> bool {
	question.contains(GAP_MARKERS)
}

/// A validated unit of work for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
	PartOfSpeech { sentence: String },
	FillInTheGaps { question: String, options: Vec<String> },
	ExtensiveExplanation { question: String, options: Vec<String>, correct_answer: String },
	GrammarRule { sentence: String },
}

impl TryFrom<&AnalysisRequest> for Task {
	type Error = ValidationError;

	fn try_from(request: &AnalysisRequest) -> Result<Self, Self::Error> {
		let text = require_text(&request.sentence_or_question)?;

		match request.mode {
			Mode::PartOfSpeech => Ok(Self::PartOfSpeech { sentence: text }),
			Mode::FillInTheGaps => {
				if !has_gap_marker(&text) {
					return Err(ValidationError::MissingGapMarker)
				}
				if request.options.len() > MAX_OPTIONS {
					return Err(ValidationError::TooManyOptions(request.options.len()))
				}
				Ok(Self::FillInTheGaps { question: text, options: request.filled_options() })
			},
		}
	}
}

impl Task {
	/// Follow-up request for a richer explanation of an answered question.
	pub fn extensive_explanation(
		question: &str,
		options: &[String],
		correct_answer: &str,
	) -> Result<Self, ValidationError> {
		Ok(Self::ExtensiveExplanation {
			question: require_text(question)?,
			options: filled_options(options),
			correct_answer: require_text(correct_answer)?,
		})
	}

	pub fn grammar_rule(sentence: &str) -> Result<Self, ValidationError> {
		Ok(Self::GrammarRule { sentence: require_text(sentence)? })
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::PartOfSpeech { .. } => "pos",
			Self::FillInTheGaps { .. } => "gaps",
			Self::ExtensiveExplanation { .. } => "extensive",
			Self::GrammarRule { .. } => "rule",
		}
	}

	fn persona(&self) -> &'static str {
		match self {
			Self::PartOfSpeech { .. } => LINGUIST_PERSONA,
			_ => TUTOR_PERSONA,
		}
	}

	/// The task prompt. Deterministic for a given task.
	pub fn prompt(&self) -> String {
		match self {
			Self::PartOfSpeech { sentence } => format!(
				"Analyze every word of the following sentence and label its part of speech.\n\
				 \n\
				 Use these categories, with the sub-type in parentheses where it applies:\n\
				 - Noun (common, proper, collective, abstract)\n\
				 - Pronoun (personal, possessive, reflexive, relative, demonstrative)\n\
				 - Verb (main, auxiliary, modal, linking)\n\
				 - Verbal (infinitive, gerund, present participle, past participle)\n\
				 - Adjective\n\
				 - Adverb\n\
				 - Preposition\n\
				 - Conjunction (coordinating, subordinating)\n\
				 - Determiner (article, demonstrative, quantifier)\n\
				 - Interjection\n\
				 \n\
				 Do not label punctuation. Do not provide any intro or conclusion.\n\
				 Respond only with JSON of the form \
				 {{\"analysis\": [{{\"word\": \"...\", \"partOfSpeech\": \"...\"}}]}}.\n\
				 \n\
				 Sentence: {sentence}"
			),
			Self::FillInTheGaps { question, options } => {
				let mut prompt = format!(
					"You will be given a sentence with a blank indicated by an underscore \"_\" or \
					 a hyphen \"-\". You may also be given a list of options.\n\
					 \n\
					 Your task is to:\n\
					 1. Determine the correct word or phrase to fill in the blank. If options are \
					 provided, choose the correct one.\n\
					 2. Provide a brief explanation in Bangla of the grammar rule that applies to \
					 the sentence.\n\
					 3. Repeat the question exactly as given.\n\
					 \n\
					 Respond only with JSON of the form \
					 {{\"question\": \"...\", \"correctAnswer\": \"...\", \"explanation\": \"...\"}}.\n\
					 \n\
					 Question: {question}\n"
				);
				if !options.is_empty() {
					prompt.push_str("\nOptions:\n");
					options.iter().for_each(|option| prompt.push_str(&format!("- {option}\n")));
				}
				prompt
			},
			Self::ExtensiveExplanation { question, options, correct_answer } => {
				let options =
					if options.is_empty() { "(none provided)".to_string() } else { options.join(", ") };
				format!(
					"You will be given a sentence with a blank, the options provided, and the \
					 correct answer.\n\
					 \n\
					 Provide a detailed explanation in Bangla. The explanation should cover:\n\
					 1. Why the correct answer is the right fit for the sentence, explaining the \
					 relevant grammar rule in detail.\n\
					 2. Why each of the other provided options is incorrect, explaining the \
					 grammatical error for each case.\n\
					 \n\
					 Separate each example block with a line containing only \"---\".\n\
					 Respond only with JSON of the form {{\"explanation\": \"...\"}}.\n\
					 \n\
					 Question: {question}\n\
					 Options: {options}\n\
					 Correct Answer: {correct_answer}\n"
				)
			},
			Self::GrammarRule { sentence } => format!(
				"Explain the grammar rule used in the following fill-in-the-gaps sentence in \
				 Bangla using markdown format, so the user can understand the grammatical \
				 principle behind the correct answer.\n\
				 Respond only with JSON of the form {{\"explanation\": \"...\"}}.\n\
				 \n\
				 Sentence: {sentence}"
			),
		}
	}

	/// Build the wire-independent request for this task.
	pub fn payload(&self, options: &GenerationOptions) -> CompletionPayload {
		let prompt = self.prompt();
		trace!("Built {} prompt: {}", self.name(), prompt);

		CompletionPayload {
			model: options.model.clone(),
			messages: vec![
				Message::new(Role::System, self.persona()),
				Message::new(Role::User, prompt),
			],
			generation_config: GenerationConfig { json_mode: true, temperature: options.temperature },
		}
	}
}

/// Model settings applied to every payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
	pub model: String,
	pub temperature: Option<f32>,
}

impl GenerationOptions {
	pub fn new(model: impl Into<String>) -> Self {
		Self { model: model.into(), temperature: None }
	}

	pub fn with_temperature(mut self, temperature: f32) -> Self {
		self.temperature = Some(temperature);
		self
	}
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	pub role: WrapperRole,
	pub content: String,
}

impl Message {
	pub fn new(role: Role, content: impl Into<String>) -> Self {
		Self { role: role.into(), content: content.into() }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationConfig {
	/// Ask the provider to constrain its output to JSON.
	pub json_mode: bool,
	pub temperature: Option<f32>,
}

/// Provider independent completion request.
///
/// Providers encode this into their own wire format, see [`crate::provider::WireFormat`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPayload {
	pub model: String,
	pub messages: Vec<Message>,
	pub generation_config: GenerationConfig,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_input_is_rejected() {
		let request = AnalysisRequest::part_of_speech("   \n\t");
		assert_eq!(Task::try_from(&request), Err(ValidationError::EmptyInput));

		let request = AnalysisRequest::fill_in_the_gaps("", ["on"]);
		assert_eq!(Task::try_from(&request), Err(ValidationError::EmptyInput));
	}

	#[test]
	fn gaps_question_requires_marker() {
		let request = AnalysisRequest::fill_in_the_gaps("The cat sat on the mat.", ["on"]);
		assert_eq!(Task::try_from(&request), Err(ValidationError::MissingGapMarker));

		let request = AnalysisRequest::fill_in_the_gaps("The cat sat - the mat.", Vec::<String>::new());
		assert!(Task::try_from(&request).is_ok());
	}

	#[test]
	fn part_of_speech_does_not_require_marker() {
		let request = AnalysisRequest::part_of_speech("  The cat sat on the mat.  ");
		assert_eq!(
			Task::try_from(&request),
			Ok(Task::PartOfSpeech { sentence: "The cat sat on the mat.".to_string() })
		);
	}

	#[test]
	fn blank_options_are_filtered() {
		let request = AnalysisRequest::fill_in_the_gaps("I _ here.", ["am", " ", "", " is "]);
		assert_eq!(
			Task::try_from(&request),
			Ok(Task::FillInTheGaps {
				question: "I _ here.".to_string(),
				options: vec!["am".to_string(), "is".to_string()],
			})
		);
	}

	#[test]
	fn more_than_four_options_are_rejected() {
		let request = AnalysisRequest::fill_in_the_gaps("I _ here.", ["a", "b", "c", "d", "e"]);
		assert_eq!(Task::try_from(&request), Err(ValidationError::TooManyOptions(5)));
	}

	#[test]
	fn gaps_prompt_lists_options_only_when_present() {
		let with_options = Task::FillInTheGaps {
			question: "The cat sat _ the mat.".to_string(),
			options: vec!["on".to_string(), "in".to_string()],
		};
		let prompt = with_options.prompt();
		assert!(prompt.contains("Question: The cat sat _ the mat."));
		assert!(prompt.contains("Options:\n- on\n- in\n"));
		assert!(prompt.contains("\"correctAnswer\""));
		assert!(prompt.contains("Bangla"));

		let without_options =
			Task::FillInTheGaps { question: "The cat sat _ the mat.".to_string(), options: vec![] };
		assert!(!without_options.prompt().contains("Options:"));
	}

	#[test]
	fn part_of_speech_prompt_enumerates_categories() {
		let prompt = Task::PartOfSpeech { sentence: "Birds can fly.".to_string() }.prompt();

		for category in ["Noun", "Pronoun", "Verb (main, auxiliary, modal", "Preposition"] {
			assert!(prompt.contains(category), "missing {category}");
		}
		assert!(prompt.ends_with("Sentence: Birds can fly."));
		assert!(prompt.contains("\"partOfSpeech\""));
	}

	#[test]
	fn extensive_prompt_joins_options() {
		let task = Task::extensive_explanation(
			"The cat sat _ the mat.",
			&["on".to_string(), "".to_string(), "in".to_string()],
			"on",
		)
		.unwrap();

		let prompt = task.prompt();
		assert!(prompt.contains("Options: on, in\n"));
		assert!(prompt.contains("Correct Answer: on\n"));
		assert!(prompt.contains("---"));
	}

	#[test]
	fn prompts_are_deterministic() {
		let task = Task::grammar_rule("He has _ apple.").unwrap();
		assert_eq!(task.prompt(), task.prompt());
	}

	#[test]
	fn payload_carries_system_and_user_messages() {
		let task = Task::PartOfSpeech { sentence: "Run!".to_string() };
		let payload = task.payload(&GenerationOptions::new("gemini-1.5-flash-latest").with_temperature(0.2));

		assert_eq!(payload.model, "gemini-1.5-flash-latest");
		assert_eq!(payload.messages.len(), 2);
		assert!(payload.messages[0].role.is_system());
		assert_eq!(payload.messages[1].role.as_str(), "user");
		assert_eq!(payload.messages[1].content, task.prompt());
		assert!(payload.generation_config.json_mode);
		assert_eq!(payload.generation_config.temperature, Some(0.2));
	}
}
