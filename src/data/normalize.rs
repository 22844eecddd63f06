//! Turns whatever the question service sends into a `Vec<Question>`.
//!
//! The service has shipped several payload shapes over time: bare arrays,
//! arrays wrapped under `questions`/`questoes`/`data`, and objects keyed by
//! question number. Field names drift as well, most notably the correct
//! answer marker (`correta`, `altCorreta`, `certa`). Everything is mapped here
//! so the session only ever sees option keys.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::SourceError;
use crate::models::{AnswerKey, AnswerOption, DEFAULT_TIMING_SECS, GroupId, Question, QuestionId};

const LIST_FIELDS: [&str; 4] = ["questions", "questoes", "perguntas", "data"];
const TITLE_FIELDS: [&str; 4] = ["title", "titulo", "pergunta", "enunciado"];
const OPTION_FIELDS: [&str; 3] = ["alternativas", "options", "alternatives"];
const MARKER_FIELDS: [&str; 5] = ["correta", "altCorreta", "certa", "correct", "resposta_correta"];
const TIMING_FIELDS: [&str; 2] = ["timing", "tempo"];
const GROUP_FIELDS: [&str; 4] = ["turma_id", "turmaId", "group", "turma"];
const OPTION_TEXT_FIELDS: [&str; 4] = ["text", "texto", "descricao", "label"];
const OPTION_KEY_FIELDS: [&str; 2] = ["key", "id"];

/// Normalize a decoded response body.
///
/// Records that cannot be turned into a question are skipped, and so is any
/// record repeating an id seen earlier in the payload. If every record was
/// skipped the payload is reported as malformed instead of empty.
pub fn questions_from_value(value: Value) -> Result<Vec<Question>, SourceError> {
    let records = extract_records(value)?;
    let received = records.len();

    let mut seen = HashSet::with_capacity(received);
    let mut questions = Vec::with_capacity(received);
    for (hint, record) in &records {
        match question_from_record(hint.as_deref(), record) {
            Ok(question) if !seen.insert(question.id.clone()) => {
                warn!(question = %question.id, "skipping question with duplicate id");
            }
            Ok(question) => questions.push(question),
            Err(reason) => {
                warn!(record = hint.as_deref().unwrap_or("?"), %reason, "skipping question record");
            }
        }
    }

    if received > 0 && questions.is_empty() {
        return Err(SourceError::Malformed(format!(
            "none of the {received} question records were usable"
        )));
    }

    Ok(questions)
}

/// Records paired with the key they were stored under, when keyed.
fn extract_records(value: Value) -> Result<Vec<(Option<String>, Value)>, SourceError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.into_iter().map(|item| (None, item)).collect()),
        Value::Object(mut object) => {
            if let Some(inner) = LIST_FIELDS.iter().find_map(|field| object.remove(*field)) {
                return extract_records(inner);
            }
            if !object.is_empty() && object.keys().all(|key| key.parse::<u64>().is_ok()) {
                let mut entries: Vec<(String, Value)> = object.into_iter().collect();
                entries.sort_by_key(|(key, _)| key.parse::<u64>().unwrap_or(u64::MAX));
                return Ok(entries.into_iter().map(|(key, value)| (Some(key), value)).collect());
            }
            if object.contains_key("status") || object.is_empty() {
                return Ok(Vec::new());
            }
            Err(SourceError::Malformed(
                "response has no recognizable question list".to_string(),
            ))
        }
        other => Err(SourceError::Malformed(format!(
            "expected a question list, got {other}"
        ))),
    }
}

fn question_from_record(hint: Option<&str>, record: &Value) -> Result<Question, String> {
    let record = record.as_object().ok_or("record is not an object")?;

    let id = first(record, &["id"])
        .and_then(scalar_string)
        .or_else(|| hint.map(str::to_string))
        .ok_or("missing id")?;

    let title = first(record, &TITLE_FIELDS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or("missing title")?
        .to_string();

    let options = options_from_record(record);
    if options.len() < 2 {
        return Err(format!("needs at least two options, found {}", options.len()));
    }

    let raw_marker = first(record, &MARKER_FIELDS)
        .and_then(scalar_string)
        .ok_or("missing correct answer marker")?;
    let correct = resolve_marker(&raw_marker, &options)
        .ok_or_else(|| format!("correct marker {raw_marker:?} matches no option"))?;

    let timing = first(record, &TIMING_FIELDS)
        .and_then(scalar_string)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TIMING_SECS);

    let group = first(record, &GROUP_FIELDS)
        .and_then(|value| match value {
            Value::Object(turma) => turma.get("id").and_then(scalar_string),
            other => scalar_string(other),
        })
        .map(GroupId::new);

    Ok(Question {
        id: QuestionId::new(id),
        title,
        options,
        correct,
        timing,
        group,
    })
}

fn options_from_record(record: &Map<String, Value>) -> Vec<AnswerOption> {
    match first(record, &OPTION_FIELDS) {
        Some(Value::Object(map)) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            });
            entries
                .into_iter()
                .filter_map(|(key, value)| {
                    option_text(value).map(|text| AnswerOption::new(key.as_str(), text))
                })
                .collect()
        }
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let key = item
                    .as_object()
                    .and_then(|object| first(object, &OPTION_KEY_FIELDS))
                    .and_then(scalar_string)
                    .unwrap_or_else(|| (position + 1).to_string());
                option_text(item).map(|text| AnswerOption::new(key, text))
            })
            .collect(),
        _ => (1..)
            .map_while(|n: usize| {
                record
                    .get(&format!("alt{n}"))
                    .and_then(option_text)
                    .map(|text| AnswerOption::new(n, text))
            })
            .collect(),
    }
}

fn option_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Object(object) => first(object, &OPTION_TEXT_FIELDS).and_then(scalar_string),
        other => scalar_string(other),
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Map a raw marker onto one of the option keys: by key, then by 1-based
/// position, then by option text.
fn resolve_marker(raw: &str, options: &[AnswerOption]) -> Option<AnswerKey> {
    let marker = AnswerKey::new(raw);
    let canonical = marker.canonical();
    if canonical.is_empty() {
        return None;
    }

    if let Some(option) = options.iter().find(|o| o.key.canonical() == canonical) {
        return Some(option.key.clone());
    }

    if let Ok(position) = canonical.parse::<usize>() {
        if let Some(option) = position.checked_sub(1).and_then(|i| options.get(i)) {
            return Some(option.key.clone());
        }
    }

    let wanted = raw.trim().to_lowercase();
    options
        .iter()
        .find(|o| o.text.trim().to_lowercase() == wanted)
        .map(|o| o.key.clone())
}

fn first<'a>(record: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| record.get(*field).filter(|value| !value.is_null()))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
