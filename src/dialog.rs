//! Form-based option editing.
//!
//! Value types describe the options they want edited as a [`Form`] and hand it
//! to an injected [`Dialog`]. The dialog resolves with the submitted field
//! values, or with `None` when the user dismisses it. How the form is shown is
//! entirely up to the dialog; [`TerminalDialog`] is the line-oriented one used
//! by the command line.

use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    io::{BufRead, Write},
};

use async_trait::async_trait;

use crate::error::{Result, ValueTypeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Color,
    TextArea,
    /// Radio-style choice between `(value, label)` pairs.
    Choice(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
    pub enabled: bool,
}

impl FormField {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            value: value.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.enabled = !disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub class_suffix: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn new(title: impl Into<String>, class_suffix: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            class_suffix: class_suffix.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Submitted field values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormResponse {
    values: BTreeMap<String, String>,
}

impl FormResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Field value parsed as a float; unparsable input yields NaN.
    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name)
            .map(|raw| raw.trim().parse::<f64>().unwrap_or(f64::NAN))
    }

    /// Fills every field the form declares but the response omits with the
    /// form's current value, as a submitted form would.
    pub fn completed_from(mut self, form: &Form) -> Self {
        for field in &form.fields {
            self.values
                .entry(field.name.clone())
                .or_insert_with(|| field.value.clone());
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Saved,
    Cancelled,
}

#[async_trait(?Send)]
pub trait Dialog {
    /// Shows `form` and waits for the user. `Ok(None)` means dismissed.
    async fn prompt(&self, form: Form) -> Result<Option<FormResponse>>;
}

/// Dialog that answers prompts from a queue of prepared responses. A `None`
/// entry, or an exhausted queue, dismisses the form.
#[derive(Debug, Default)]
pub struct ScriptedDialog {
    responses: RefCell<VecDeque<Option<FormResponse>>>,
    shown: RefCell<Vec<Form>>,
}

impl ScriptedDialog {
    pub fn new(responses: impl IntoIterator<Item = Option<FormResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            shown: RefCell::new(Vec::new()),
        }
    }

    /// Forms shown so far, in order.
    pub fn shown(&self) -> Vec<Form> {
        self.shown.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Dialog for ScriptedDialog {
    async fn prompt(&self, form: Form) -> Result<Option<FormResponse>> {
        let next = self.responses.borrow_mut().pop_front().flatten();
        let response = next.map(|response| response.completed_from(&form));
        self.shown.borrow_mut().push(form);
        Ok(response)
    }
}

/// Line-oriented dialog over a reader/writer pair.
///
/// Each enabled field is prompted with its current value; an empty line keeps
/// it. Text areas are read line by line until a single `.`. Answering `q` at
/// any prompt dismisses the form.
pub struct TerminalDialog<I, O> {
    input: RefCell<I>,
    output: RefCell<O>,
}

impl<I: BufRead, O: Write> TerminalDialog<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    fn read_line(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .borrow_mut()
            .read_line(&mut line)
            .map_err(|err| ValueTypeError::Dialog(err.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn say(&self, text: &str) -> Result<()> {
        let mut output = self.output.borrow_mut();
        write!(output, "{text}")
            .and_then(|_| output.flush())
            .map_err(|err| ValueTypeError::Dialog(err.to_string()))
    }

    fn ask(&self, field: &FormField) -> Result<Option<String>> {
        match &field.kind {
            FieldKind::TextArea => {
                self.say(&format!(
                    "{} (one entry per line, '.' to finish, empty to keep):\n",
                    field.label
                ))?;
                for line in field.value.lines() {
                    self.say(&format!("  | {line}\n"))?;
                }
                let mut lines = Vec::new();
                loop {
                    let Some(line) = self.read_line()? else {
                        break;
                    };
                    if line == "q" && lines.is_empty() {
                        return Ok(None);
                    }
                    if line == "." || (line.is_empty() && lines.is_empty()) {
                        break;
                    }
                    lines.push(line);
                }
                if lines.is_empty() {
                    Ok(Some(field.value.clone()))
                } else {
                    Ok(Some(lines.join("\n")))
                }
            }
            FieldKind::Choice(choices) => {
                self.say(&format!("{}:\n", field.label))?;
                for (idx, (value, label)) in choices.iter().enumerate() {
                    let marker = if *value == field.value { "*" } else { " " };
                    self.say(&format!(" {marker} {}) {label}\n", idx + 1))?;
                }
                self.say("> ")?;
                let Some(line) = self.read_line()? else {
                    return Ok(Some(field.value.clone()));
                };
                let answer = line.trim();
                if answer == "q" {
                    return Ok(None);
                }
                if answer.is_empty() {
                    return Ok(Some(field.value.clone()));
                }
                let picked = answer
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| choices.get(idx))
                    .map(|(value, _)| value.clone())
                    .or_else(|| {
                        choices
                            .iter()
                            .find(|(value, _)| value == answer)
                            .map(|(value, _)| value.clone())
                    });
                Ok(Some(picked.unwrap_or_else(|| field.value.clone())))
            }
            _ => {
                self.say(&format!("{} [{}]: ", field.label, field.value))?;
                let Some(line) = self.read_line()? else {
                    return Ok(Some(field.value.clone()));
                };
                if line.trim() == "q" {
                    return Ok(None);
                }
                if line.trim().is_empty() {
                    Ok(Some(field.value.clone()))
                } else {
                    Ok(Some(line.trim().to_string()))
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl<I: BufRead, O: Write> Dialog for TerminalDialog<I, O> {
    async fn prompt(&self, form: Form) -> Result<Option<FormResponse>> {
        self.say(&format!("== {} ==\n", form.title))?;
        let mut response = FormResponse::new();
        let mut regex_enabled = None;
        for field in &form.fields {
            // regex inputs follow the conversion choice made earlier in the same form
            let enabled = match (&field.name[..], regex_enabled) {
                ("regexFrom" | "regexTo", Some(enabled)) => enabled,
                _ => field.enabled,
            };
            if !enabled {
                response.set(field.name.clone(), field.value.clone());
                continue;
            }
            let Some(answer) = self.ask(field)? else {
                self.say("cancelled\n")?;
                return Ok(None);
            };
            if field.name == "string-convert" {
                regex_enabled = Some(answer == "regex");
            }
            response.set(field.name.clone(), answer);
        }
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::io::Cursor;

    fn range_form() -> Form {
        Form::new("Edit Numerical Range", "numerical")
            .field(FormField::new(
                "numerical-min",
                "Minimum Value",
                FieldKind::Number,
                "0",
            ))
            .field(FormField::new(
                "numerical-max",
                "Maximum Value",
                FieldKind::Number,
                "100",
            ))
    }

    #[test]
    fn terminal_dialog_keeps_defaults_on_empty_input() {
        let dialog = TerminalDialog::new(Cursor::new("\n250\n"), Vec::new());
        let response = block_on(dialog.prompt(range_form()))
            .expect("prompt")
            .expect("submitted");
        assert_eq!(response.get("numerical-min"), Some("0"));
        assert_eq!(response.float("numerical-max"), Some(250.0));
    }

    #[test]
    fn terminal_dialog_cancels_on_q() {
        let dialog = TerminalDialog::new(Cursor::new("q\n"), Vec::new());
        let response = block_on(dialog.prompt(range_form())).expect("prompt");
        assert!(response.is_none());
    }

    #[test]
    fn terminal_dialog_reads_text_areas_until_dot() {
        let form = Form::new("Edit Categories", "categorical").field(FormField::new(
            "categories",
            "Categories",
            FieldKind::TextArea,
            "",
        ));
        let dialog = TerminalDialog::new(Cursor::new("a\tred\nb\n.\n"), Vec::new());
        let response = block_on(dialog.prompt(form))
            .expect("prompt")
            .expect("submitted");
        assert_eq!(response.get("categories"), Some("a\tred\nb"));
    }

    #[test]
    fn scripted_dialog_completes_missing_fields_and_records_forms() {
        let dialog = ScriptedDialog::new([Some(FormResponse::new().with("numerical-max", "7")), None]);
        let first = block_on(dialog.prompt(range_form()))
            .expect("prompt")
            .expect("submitted");
        assert_eq!(first.get("numerical-min"), Some("0"));
        assert_eq!(first.get("numerical-max"), Some("7"));
        assert!(block_on(dialog.prompt(range_form())).expect("prompt").is_none());
        assert_eq!(dialog.shown().len(), 2);
    }

    #[test]
    fn float_yields_nan_for_garbage() {
        let response = FormResponse::new().with("x", "abc");
        assert!(response.float("x").expect("present").is_nan());
        assert!(response.float("y").is_none());
    }
}
