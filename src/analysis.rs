//! Typed results returned by the model.
//!
//! Field names follow the JSON the prompts ask the model to produce, so the structs can be
//! deserialized straight from the normalized model output.

use serde::{Deserialize, Serialize};

/// A single annotated word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
	pub word: String,
	pub part_of_speech: String,
}

/// Output of a part-of-speech analysis.
///
/// Entries are in display order, which is whatever order the model chose and not necessarily
/// the order of the words in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOfSpeechResult {
	pub analysis: Vec<WordAnalysis>,
}

/// Output of a fill-in-the-gaps analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapsResult {
	/// The question as it was asked, gap marker included.
	pub question: String,
	pub correct_answer: String,
	/// Brief explanation in Bangla.
	pub explanation: String,
	/// Set once the follow-up extensive explanation has been fetched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensive_explanation: Option<String>,
}

impl GapsResult {
	pub fn has_extensive_explanation(&self) -> bool {
		self.extensive_explanation.is_some()
	}
}

/// Output of a grammar-rule explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExplanation {
	pub sentence: String,
	/// Markdown, in Bangla.
	pub explanation: String,
}

/// The `{"explanation": ...}` object returned by the extensive explanation and grammar-rule
/// prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationOutput {
	pub explanation: String,
}

/// Any result the analyzer can hold.
///
/// The discriminant is fixed when the result is constructed and serialized as `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisResult {
	PartOfSpeech(PartOfSpeechResult),
	FillInTheGaps(GapsResult),
	GrammarRule(RuleExplanation),
}

impl AnalysisResult {
	pub fn as_gaps(&self) -> Option<&GapsResult> {
		match self {
			Self::FillInTheGaps(gaps) => Some(gaps),
			_ => None,
		}
	}

	pub fn as_part_of_speech(&self) -> Option<&PartOfSpeechResult> {
		match self {
			Self::PartOfSpeech(pos) => Some(pos),
			_ => None,
		}
	}
}

impl From<PartOfSpeechResult> for AnalysisResult {
	fn from(result: PartOfSpeechResult) -> Self {
		Self::PartOfSpeech(result)
	}
}

impl From<GapsResult> for AnalysisResult {
	fn from(result: GapsResult) -> Self {
		Self::FillInTheGaps(result)
	}
}

impl From<RuleExplanation> for AnalysisResult {
	fn from(result: RuleExplanation) -> Self {
		Self::GrammarRule(result)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gaps_result_uses_camel_case_fields() {
		let gaps: GapsResult = serde_json::from_str(
			r#"{"question":"She _ to school.","correctAnswer":"goes","explanation":"ব্যাখ্যা"}"#,
		)
		.unwrap();

		assert_eq!(gaps.correct_answer, "goes");
		assert!(!gaps.has_extensive_explanation());

		let json = serde_json::to_value(&gaps).unwrap();
		assert!(json.get("extensiveExplanation").is_none());
	}

	#[test]
	fn analysis_result_carries_explicit_kind() {
		let result = AnalysisResult::from(PartOfSpeechResult {
			analysis: vec![WordAnalysis {
				word: "cat".to_string(),
				part_of_speech: "Noun (common)".to_string(),
			}],
		});

		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["kind"], "partOfSpeech");
		assert_eq!(json["analysis"][0]["partOfSpeech"], "Noun (common)");

		let back: AnalysisResult = serde_json::from_value(json).unwrap();
		assert_eq!(back, result);
		assert!(back.as_gaps().is_none());
	}
}
