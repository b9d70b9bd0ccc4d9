//! Template answer engine.
//!
//! A questionnaire template is a fixed-shape tree of items; each leaf
//! declares exactly one answer value kind (string, date, integer or
//! coded). Patching only ever overwrites the declared slot or removes an
//! item — it never introduces a new linkId or changes a declared kind.
//! All operations are pure: they consume a tree and return a new one.

use serde::{Deserialize, Serialize};

/// A node in the questionnaire-response tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub link_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<Answer>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<Item>>,
}

impl Item {
    /// Leaf item declaring its answer kind through the placeholder.
    pub fn leaf(link_id: impl Into<String>, placeholder: Answer) -> Self {
        Self {
            link_id: link_id.into(),
            answer: Some(vec![placeholder]),
            item: None,
        }
    }

    /// Group item holding nested items.
    pub fn group(link_id: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            link_id: link_id.into(),
            answer: None,
            item: Some(items),
        }
    }
}

/// One answer with exactly one populated value slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,
}

impl Answer {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value_string: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self {
            value_date: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            value_integer: Some(value),
            ..Default::default()
        }
    }

    pub fn coding(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            value_coding: Some(Coding {
                system: Some(system.into()),
                code: code.into(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub code: String,
}

/// A value being written into a declared slot.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Text(String),
    Integer(i64),
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl AnswerValue {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
        }
    }
}

/// Overwrite the declared slot of the item with the given linkId, or
/// remove the item when no value is supplied. Unknown linkIds are a
/// deliberate no-op so one extraction table can serve template variants.
pub fn set_answer(items: Vec<Item>, link_id: &str, value: Option<AnswerValue>) -> Vec<Item> {
    match value {
        None => items.into_iter().filter(|i| i.link_id != link_id).collect(),
        Some(value) => items
            .into_iter()
            .map(|mut item| {
                if item.link_id == link_id {
                    if let Some(first) = item.answer.as_mut().and_then(|a| a.first_mut()) {
                        apply_value(first, &value);
                    }
                }
                item
            })
            .collect(),
    }
}

/// Patch a child item inside the named group; when the group's nested
/// list becomes empty the group itself is removed, so the emitted
/// document carries no empty placeholder groups.
pub fn set_nested_answer(
    items: Vec<Item>,
    parent_link_id: &str,
    value: Option<AnswerValue>,
    child_link_id: &str,
) -> Vec<Item> {
    with_nested_items(items, parent_link_id, |children| {
        set_answer(children, child_link_id, value)
    })
}

/// Map the named group's nested items through `f`, pruning the group when
/// the result is empty. Building block for deeper nesting (e.g. a
/// validity period inside a vaccination details group).
pub fn with_nested_items(
    items: Vec<Item>,
    link_id: &str,
    f: impl FnOnce(Vec<Item>) -> Vec<Item>,
) -> Vec<Item> {
    let mut f = Some(f);
    items
        .into_iter()
        .filter_map(|mut parent| {
            if parent.link_id == link_id {
                if let (Some(children), Some(f)) = (parent.item.take(), f.take()) {
                    let children = f(children);
                    if children.is_empty() {
                        return None;
                    }
                    parent.item = Some(children);
                }
            }
            Some(parent)
        })
        .collect()
}

fn apply_value(answer: &mut Answer, value: &AnswerValue) {
    if answer.value_string.is_some() {
        answer.value_string = Some(value.as_text());
    } else if answer.value_date.is_some() {
        answer.value_date = Some(value.as_text());
    } else if answer.value_integer.is_some() {
        if let Some(int) = match value {
            AnswerValue::Integer(i) => Some(*i),
            AnswerValue::Text(s) => s.parse().ok(),
        } {
            answer.value_integer = Some(int);
        }
    } else if let Some(coding) = answer.value_coding.as_mut() {
        coding.code = value.as_text();
    }
}
