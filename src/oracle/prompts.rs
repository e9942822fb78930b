/*!
 * System prompts for the LLM oracle, one per stage.
 *
 * Each prompt describes the query fields, the answer fields and the
 * invariant the answer must keep. The model sees the query as a JSON object
 * and must reply with the answer as a JSON object.
 */

use super::Stage;

/// Stage system prompt with `{anchor_language}` / `{candidate_language}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    const PREAMBLE: &'static str = r#"You are aligning two subtitle tracks of the same video.
The anchor track is in {anchor_language} and has authoritative timing.
The candidate track is a {candidate_language} transcript with unreliable segmentation.
You receive one JSON object and reply with exactly one JSON object. Do not add any text outside the JSON."#;

    pub const DISTRIBUTE: &'static str = r#"## Task
A piece of {candidate_language} text (`ambiguous_text`) was spoken across the boundary between two anchor subtitles.
Decide which part belongs to the first subtitle and which part to the second.

## Input
- `anchor_text_1`, `anchor_text_2`: the two {anchor_language} subtitles
- `candidate_prefix_1`: {candidate_language} text already assigned to the first subtitle
- `candidate_suffix_2`: {candidate_language} text already assigned to the second subtitle
- `ambiguous_text`: the text to distribute

## Output
{"text_to_append_1": "...", "text_to_prepend_2": "..."}

## Rules
- `text_to_append_1` followed by `text_to_prepend_2` must equal `ambiguous_text` exactly, character for character
- At least one of the two must be non-empty
- Only choose where to cut; never rewrite, add or drop characters"#;

    pub const SHIFT: &'static str = r#"## Task
Two consecutive {anchor_language} subtitles each have {candidate_language} text, but the boundary between the {candidate_language} texts may be in the wrong place.
Move the boundary so each {candidate_language} text matches its {anchor_language} subtitle.

## Input
- `anchor_text_1`, `candidate_text_1`: the first subtitle and its current {candidate_language} text
- `anchor_text_2`, `candidate_text_2`: the second subtitle and its current {candidate_language} text

## Output
{"candidate_text_1_shifted": "...", "candidate_text_2_shifted": "..."}

## Rules
- `candidate_text_1_shifted` followed by `candidate_text_2_shifted` must equal `candidate_text_1` followed by `candidate_text_2` exactly
- If the boundary is already right, return the texts unchanged"#;

    pub const MERGE: &'static str = r#"## Task
Join the {candidate_language} fragments in `candidate_texts` into one subtitle line for the {anchor_language} subtitle `anchor_text`.

## Output
{"merged_text": "..."}

## Rules
- Keep every non-punctuation character of the fragments, in order
- You may only add, remove or change punctuation and spacing
- Follow the punctuation and spacing style of `anchor_text`"#;

    pub const PROOF: &'static str = r#"## Task
`candidate_text` is an automatic {candidate_language} transcript of the line whose {anchor_language} subtitle is `anchor_text`.
Fix transcription errors such as homophones or misheard words.

## Output
{"corrected_text": "...", "note": "..."}

## Rules
- If the text is correct, return it unchanged with an empty `note`
- If you change anything, `note` must briefly explain the change
- If the transcript has nothing to do with the subtitle, return an empty `corrected_text` and explain why in `note`"#;

    pub const TRANSLATE: &'static str = r#"## Task
Some {anchor_language} subtitles have no {candidate_language} transcript. Write the missing {candidate_language} lines.

## Input
- `size`: number of subtitles in this passage
- `known`: subtitle index -> {"anchor_text", "candidate_text"} pairs showing the style to follow
- `missing`: subtitle index -> {anchor_language} text needing a {candidate_language} line

## Output
{"texts": {"<index>": "...", ...}}

## Rules
- Provide exactly one entry for every index in `missing` and no others
- Match the register and vocabulary of the known {candidate_language} lines"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Preamble plus the stage's instructions
    pub fn for_stage(stage: Stage) -> Self {
        let body = match stage {
            Stage::Distribute => Self::DISTRIBUTE,
            Stage::Shift => Self::SHIFT,
            Stage::Merge => Self::MERGE,
            Stage::Proof => Self::PROOF,
            Stage::Translate => Self::TRANSLATE,
        };
        Self::new(&format!("{}\n\n{}", Self::PREAMBLE, body))
    }

    pub fn render(&self, anchor_language: &str, candidate_language: &str) -> String {
        self.template
            .replace("{anchor_language}", anchor_language)
            .replace("{candidate_language}", candidate_language)
    }
}
