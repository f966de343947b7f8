//! Markdown rendering of analyzer views for the terminal.

use std::ops::Range;

use crate::{
	analysis::{AnalysisResult, GapsResult, PartOfSpeechResult, RuleExplanation},
	analyzer::{Notification, NotificationKind, View},
	request::GAP_MARKERS,
};

/// Visual separator replacing `---` lines in extensive explanations.
pub const SEPARATOR: &str = "────────────────────────────────────────";

const SKELETON: &str = "\
░░░░░░░░░░░░░░░░
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
░░░░░░░░░░░░░░░░░░░░░░░░";

pub fn render(view: View<'_>) -> String {
	match view {
		View::Empty => String::new(),
		View::Loading => render_skeleton().to_string(),
		View::Result(result) => render_result(result),
		View::Failed { notification, result } => {
			let notice = render_notification(notification);
			match result {
				Some(result) => format!("{}\n\n{}", render_result(result), notice),
				None => notice,
			}
		},
	}
}

pub fn render_skeleton() -> &'static str {
	SKELETON
}

pub fn render_notification(notification: &Notification) -> String {
	let marker = match notification.kind {
		NotificationKind::Destructive => "✗",
		NotificationKind::Configuration => "⚙",
	};
	format!("{} {}: {}", marker, notification.title, notification.description)
}

pub fn render_result(result: &AnalysisResult) -> String {
	match result {
		AnalysisResult::PartOfSpeech(pos) => render_part_of_speech(pos),
		AnalysisResult::FillInTheGaps(gaps) => render_gaps(gaps),
		AnalysisResult::GrammarRule(rule) => render_rule(rule),
	}
}

fn render_part_of_speech(pos: &PartOfSpeechResult) -> String {
	let width = pos.analysis.iter().map(|item| item.word.chars().count()).max().unwrap_or(0);

	let rows = pos
		.analysis
		.iter()
		.map(|item| {
			let padding = width - item.word.chars().count();
			format!("**{}**{} : {}", item.word, " ".repeat(padding), item.part_of_speech)
		})
		.collect::<Vec<_>>();

	format!("## Part of Speech Analysis\n\n{}", rows.join("\n\n---\n\n"))
}

fn render_gaps(gaps: &GapsResult) -> String {
	let mut out = format!(
		"### Answer\n\n{}\n\n### Simple Explanation\n\n{}",
		render_answered_question(&gaps.question, &gaps.correct_answer),
		gaps.explanation
	);

	if let Some(extensive) = &gaps.extensive_explanation {
		out.push_str(&format!(
			"\n\n{}\n\n### Extensive Explanation\n\n{}",
			SEPARATOR,
			render_separators(extensive)
		));
	}

	out
}

fn render_rule(rule: &RuleExplanation) -> String {
	format!("### Grammar Rule\n\n> {}\n\n{}", rule.sentence, rule.explanation)
}

/// The question with its blank replaced by the bold answer.
///
/// See [`find_blank`]. Text around the blank is left untouched. Without a blank the question is
/// returned unchanged.
pub fn render_answered_question(question: &str, answer: &str) -> String {
	let Some(blank) = find_blank(question) else { return question.to_string() };

	format!("{}**{}**{}", &question[..blank.start], answer, &question[blank.end..])
}

/// Byte range of the blank in `question`.
///
/// The first run of `_` wins. Without one, the first standalone run of `-` is used: preceded by
/// whitespace or the start of the text and not followed by a letter or digit, so hyphenated
/// words like "well-known" are never taken for a blank.
pub fn find_blank(question: &str) -> Option<Range<usize>> {
	let [underscore, hyphen] = GAP_MARKERS;

	marker_runs(question, underscore)
		.next()
		.or_else(|| marker_runs(question, hyphen).find(|run| is_standalone(question, run)))
}

fn marker_runs(text: &str, marker: char) -> impl Iterator<Item = Range<usize>> + '_ {
	let mut chars = text.char_indices().peekable();

	std::iter::from_fn(move || {
		let (start, _) = chars.find(|(_, c)| *c == marker)?;
		let mut end = start + marker.len_utf8();
		while let Some((i, _)) = chars.next_if(|(_, c)| *c == marker) {
			end = i + marker.len_utf8();
		}
		Some(start..end)
	})
}

fn is_standalone(text: &str, run: &Range<usize>) -> bool {
	let before = text[..run.start].chars().next_back();
	let after = text[run.end..].chars().next();

	before.map_or(true, char::is_whitespace) && after.map_or(true, |c| !c.is_alphanumeric())
}

/// Replace every line consisting only of `---` with [`SEPARATOR`].
pub fn render_separators(text: &str) -> String {
	text.lines()
		.map(|line| if line.trim() == "---" { SEPARATOR } else { line })
		.collect::<Vec<_>>()
		.join("\n")
}
