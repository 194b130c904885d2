/*!
 * Instruction sent to the analyzer for each cue.
 *
 * The instruction is fixed apart from the sentence appended at the end, so
 * the same cue text always produces the same prompt.
 */

/// Fixed part of the word-segmentation instruction
pub const SEGMENTATION_INSTRUCTION: &str = r#"During this conversation, analyze the Japanese sentence or phrase I give you as follows:

* Split the sentence into wakachigaki (分かち書き): basic units such as content words, particles and auxiliaries.
* For each unit give:
  1. orthography: the unit exactly as written in the input (kanji, kana or mixed)
  2. ruby_html: HTML ruby with furigana, e.g. `<ruby>漢字<rt>かんじ</rt></ruby>`, or `null` when no reading is needed
* Return the whole result as JSON inside a single ```json fenced block.
* Do not add etymology, frequency notes or syntax trees.

### Example

```json
{
  "input": "昨日、彼が私に本をくれた。",
  "wakachigaki": ["昨日", "彼", "が", "私", "に", "本", "を", "くれた"],
  "words": [
    { "orthography": "昨日", "ruby_html": "<ruby>昨日<rt>きのう</rt></ruby>" },
    { "orthography": "彼", "ruby_html": "<ruby>彼<rt>かれ</rt></ruby>" },
    { "orthography": "が", "ruby_html": null },
    { "orthography": "私", "ruby_html": "<ruby>私<rt>わたし</rt></ruby>" },
    { "orthography": "に", "ruby_html": null },
    { "orthography": "本", "ruby_html": "<ruby>本<rt>ほん</rt></ruby>" },
    { "orthography": "を", "ruby_html": null },
    { "orthography": "くれた", "ruby_html": null }
  ]
}
```
---"#;

/// Introduces the cue text at the end of the instruction
pub const SENTENCE_PREFIX: &str = "My sentence to analyze is: ";

/// Build the full analyzer instruction for `source_text`
pub fn build_instruction(source_text: &str) -> String {
    format!("{}\n{}{}\n", SEGMENTATION_INSTRUCTION, SENTENCE_PREFIX, source_text)
}

/// The cue text an instruction was built for
pub fn sentence_of(instruction: &str) -> Option<&str> {
    instruction
        .rsplit_once(SENTENCE_PREFIX)
        .map(|(_, sentence)| sentence.strip_suffix('\n').unwrap_or(sentence))
}
