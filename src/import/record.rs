use serde_json::Value;

use super::format::RecordStyle;
use super::parse::RawRecord;
use crate::error::{Error, Result};
use crate::models::{Mapping, McqOption, NewQuestion, QuestionBody, QuestionType};

/// Column caps of the tabular layout.
const MAX_OPTIONS: usize = 4;
const MAX_BLANKS: usize = 5;
const MAX_MATCH_ITEMS: usize = 5;

/// Converts and validates one raw record. `record` is the 1-based position
/// used in error messages.
pub fn to_question(style: RecordStyle, record: usize, raw: &RawRecord) -> Result<NewQuestion> {
    let question = match style {
        RecordStyle::Structured => structured(raw),
        RecordStyle::Tabular => tabular(raw),
    }
    .and_then(|q| q.validate().map(|()| q));

    question.map_err(|e| e.at_record(record))
}

// ---------------------------------------------------------------------------
// Structured records
// ---------------------------------------------------------------------------

fn structured(raw: &RawRecord) -> Result<NewQuestion> {
    let question_type = match raw.get("questionType") {
        None | Some(Value::Null) => QuestionType::Mcq,
        Some(Value::String(tag)) => tag.parse()?,
        Some(_) => return Err(Error::parse("questionType must be a string")),
    };

    let question_text = match raw.get("questionText") {
        Some(Value::String(text)) => text.trim().to_string(),
        _ => return Err(Error::validation("questionText is required")),
    };

    let body = match question_type {
        QuestionType::Mcq => {
            let options = array(raw, "options")
                .ok_or_else(|| Error::validation("mcq questions must have an options array"))?;
            let options = options
                .iter()
                .enumerate()
                .map(|(idx, option)| {
                    let option_text = option
                        .get("optionText")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            Error::validation(format!("mcq option {} is missing optionText", idx + 1))
                        })?;
                    Ok(McqOption {
                        option_text: option_text.trim().to_string(),
                        is_correct: option.get("isCorrect").is_some_and(truthy),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            QuestionBody::Mcq { options }
        }
        QuestionType::TrueFalse => match raw.get("correctAnswer") {
            Some(Value::Bool(correct_answer)) => QuestionBody::TrueFalse {
                correct_answer: *correct_answer,
            },
            _ => {
                return Err(Error::validation(
                    "truefalse questions must have a boolean correctAnswer",
                ))
            }
        },
        QuestionType::FillBlanks => QuestionBody::FillBlanks {
            blanks: strings(raw, "blanks").ok_or_else(|| {
                Error::validation("fillblanks questions must have a blanks array of strings")
            })?,
        },
        QuestionType::MatchFollowing => {
            let (Some(left_items), Some(right_items)) =
                (strings(raw, "leftItems"), strings(raw, "rightItems"))
            else {
                return Err(Error::validation(
                    "matchfollowing questions must have leftItems and rightItems arrays",
                ));
            };
            let correct_mappings = match raw.get("correctMappings") {
                None | Some(Value::Null) => Vec::new(),
                Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                    Error::validation(format!("correctMappings is malformed: {e}"))
                })?,
            };
            QuestionBody::MatchFollowing {
                left_items,
                right_items,
                correct_mappings,
            }
        }
    };

    Ok(NewQuestion {
        question_text,
        body,
    })
}

fn array<'a>(raw: &'a RawRecord, key: &str) -> Option<&'a Vec<Value>> {
    raw.get(key).and_then(Value::as_array)
}

fn strings(raw: &RawRecord, key: &str) -> Option<Vec<String>> {
    array(raw, key)?
        .iter()
        .map(|v| v.as_str().map(|s| s.trim().to_string()))
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tabular records
// ---------------------------------------------------------------------------

fn tabular(raw: &RawRecord) -> Result<NewQuestion> {
    let question_type: QuestionType = cell(raw, "questionType").unwrap_or_default().parse()?;

    let question_text = cell(raw, "questionText")
        .ok_or_else(|| Error::validation("questionText is required"))?
        .to_string();

    let body = match question_type {
        QuestionType::Mcq => QuestionBody::Mcq {
            options: (1..=MAX_OPTIONS)
                .filter_map(|i| {
                    cell(raw, &format!("option{i}")).map(|text| McqOption {
                        option_text: text.to_string(),
                        is_correct: cell(raw, &format!("isCorrect{i}"))
                            .is_some_and(|c| c.eq_ignore_ascii_case("true")),
                    })
                })
                .collect(),
        },
        QuestionType::TrueFalse => QuestionBody::TrueFalse {
            correct_answer: cell(raw, "correctAnswer")
                .ok_or_else(|| {
                    Error::validation("truefalse questions must have a correctAnswer column")
                })?
                .eq_ignore_ascii_case("true"),
        },
        QuestionType::FillBlanks => QuestionBody::FillBlanks {
            blanks: numbered(raw, "blank", MAX_BLANKS),
        },
        QuestionType::MatchFollowing => QuestionBody::MatchFollowing {
            left_items: numbered(raw, "leftItem", MAX_MATCH_ITEMS),
            right_items: numbered(raw, "rightItem", MAX_MATCH_ITEMS),
            correct_mappings: cell(raw, "correctMappings")
                .map(parse_mappings)
                .unwrap_or_default(),
        },
    };

    Ok(NewQuestion {
        question_text,
        body,
    })
}

/// Trimmed, non-blank string cell.
fn cell<'a>(raw: &'a RawRecord, column: &str) -> Option<&'a str> {
    raw.get(column)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Non-blank cells of `{prefix}1..={cap}`, in column order.
fn numbered(raw: &RawRecord, prefix: &str, cap: usize) -> Vec<String> {
    (1..=cap)
        .filter_map(|i| cell(raw, &format!("{prefix}{i}")).map(str::to_string))
        .collect()
}

/// Parses `"left:right,left:right"`. Pairs with a missing or non-numeric
/// side are skipped.
pub fn parse_mappings(pairs: &str) -> Vec<Mapping> {
    pairs.split(',')
        .filter_map(|pair| {
            let parsed = pair.split_once(':').and_then(|(left, right)| {
                Some(Mapping {
                    left_index: left.trim().parse().ok()?,
                    right_index: right.trim().parse().ok()?,
                })
            });
            if parsed.is_none() {
                tracing::debug!(pair, "skipping malformed match mapping");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn mapping(left_index: i64, right_index: i64) -> Mapping {
        Mapping {
            left_index,
            right_index,
        }
    }

    #[test]
    fn mappings_parse_in_order() {
        assert_eq!(
            parse_mappings("0:2,1:0,2:1"),
            vec![mapping(0, 2), mapping(1, 0), mapping(2, 1)]
        );
    }

    #[test]
    fn malformed_mapping_pairs_are_skipped() {
        assert_eq!(
            parse_mappings("0:2,badpair,1:0"),
            vec![mapping(0, 2), mapping(1, 0)]
        );
        assert_eq!(parse_mappings(":1, 2: ,3:x, 4 : 5"), vec![mapping(4, 5)]);
        assert!(parse_mappings("").is_empty());
    }

    #[test]
    fn structured_type_defaults_to_mcq() {
        let raw = record(json!({
            "questionText": "Capital of France?",
            "options": [
                {"optionText": "Paris", "isCorrect": true},
                {"optionText": "Rome"}
            ]
        }));
        let q = to_question(RecordStyle::Structured, 1, &raw).unwrap();
        assert_eq!(
            q.body,
            QuestionBody::Mcq {
                options: vec![
                    McqOption {
                        option_text: "Paris".to_string(),
                        is_correct: true
                    },
                    McqOption {
                        option_text: "Rome".to_string(),
                        is_correct: false
                    },
                ]
            }
        );
    }

    #[test]
    fn structured_mcq_without_options_names_record() {
        let raw = record(json!({"questionText": "Q", "questionType": "mcq"}));
        let err = to_question(RecordStyle::Structured, 3, &raw).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("record 3"));
        assert!(err.to_string().contains("options"));
    }

    #[test]
    fn structured_truefalse_requires_boolean() {
        let raw = record(json!({
            "questionText": "Sky is blue",
            "questionType": "truefalse",
            "correctAnswer": "true"
        }));
        assert!(to_question(RecordStyle::Structured, 1, &raw).is_err());

        let raw = record(json!({
            "questionText": "Sky is blue",
            "questionType": "truefalse",
            "correctAnswer": false
        }));
        let q = to_question(RecordStyle::Structured, 1, &raw).unwrap();
        assert_eq!(
            q.body,
            QuestionBody::TrueFalse {
                correct_answer: false
            }
        );
    }

    #[test]
    fn structured_matchfollowing_mappings_default_to_empty() {
        let raw = record(json!({
            "questionText": "Match",
            "questionType": "matchfollowing",
            "leftItems": ["a", "b"],
            "rightItems": ["1", "2"]
        }));
        let q = to_question(RecordStyle::Structured, 1, &raw).unwrap();
        assert!(matches!(
            q.body,
            QuestionBody::MatchFollowing { ref correct_mappings, .. } if correct_mappings.is_empty()
        ));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let raw = record(json!({"questionText": "Q", "questionType": "essay"}));
        let err = to_question(RecordStyle::Structured, 2, &raw).unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("record 2"));
    }

    #[test]
    fn tabular_mcq_reads_numbered_columns() {
        let raw = record(json!({
            "questionText": " 2 + 2 ",
            "questionType": "",
            "option1": "3",
            "isCorrect1": "false",
            "option2": "4",
            "isCorrect2": "TRUE",
            "option3": "",
            "option5": "ignored",
            "isCorrect5": "true"
        }));
        let q = to_question(RecordStyle::Tabular, 1, &raw).unwrap();
        assert_eq!(q.question_text, "2 + 2");
        let QuestionBody::Mcq { options } = q.body else {
            panic!("expected mcq");
        };
        assert_eq!(options.len(), 2);
        assert!(!options[0].is_correct);
        assert!(options[1].is_correct);
    }

    #[test]
    fn tabular_matchfollowing_skips_bad_pairs() {
        let raw = record(json!({
            "questionText": "Match",
            "questionType": "MatchFollowing",
            "leftItem1": "a", "leftItem2": "b", "leftItem3": "c",
            "rightItem1": "x", "rightItem2": "y", "rightItem3": "z",
            "correctMappings": "0:2,badpair,1:0"
        }));
        let q = to_question(RecordStyle::Tabular, 1, &raw).unwrap();
        let QuestionBody::MatchFollowing {
            left_items,
            correct_mappings,
            ..
        } = q.body
        else {
            panic!("expected matchfollowing");
        };
        assert_eq!(left_items, vec!["a", "b", "c"]);
        assert_eq!(correct_mappings, vec![mapping(0, 2), mapping(1, 0)]);
    }

    #[test]
    fn tabular_fillblanks_caps_at_five_columns() {
        let raw = record(json!({
            "questionText": "Fill",
            "questionType": "fillblanks",
            "blank1": "a", "blank2": "b", "blank3": "c",
            "blank4": "d", "blank5": "e", "blank6": "f"
        }));
        let q = to_question(RecordStyle::Tabular, 1, &raw).unwrap();
        assert!(matches!(q.body, QuestionBody::FillBlanks { ref blanks } if blanks.len() == 5));
    }

    #[test]
    fn tabular_truefalse_requires_column() {
        let raw = record(json!({"questionText": "T?", "questionType": "truefalse"}));
        assert_eq!(
            to_question(RecordStyle::Tabular, 4, &raw).unwrap_err().kind(),
            "validation"
        );

        let raw = record(json!({
            "questionText": "T?",
            "questionType": "truefalse",
            "correctAnswer": "yes"
        }));
        let q = to_question(RecordStyle::Tabular, 1, &raw).unwrap();
        assert_eq!(
            q.body,
            QuestionBody::TrueFalse {
                correct_answer: false
            }
        );
    }

    #[test]
    fn tabular_missing_question_text_fails() {
        let raw = record(json!({"option1": "a"}));
        let err = to_question(RecordStyle::Tabular, 5, &raw).unwrap_err();
        assert!(err.to_string().contains("record 5: questionText is required"));
    }
}
