//! Prompt compilation: turns stored messages into the list sent to the model.
//!
//! Compilation never mutates the message store. Each run copies the stored
//! messages, strips HTML comments, injects the variable declaration block and
//! the formatting rules block, and reports the resulting system prompt.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::message::{MessageStore, Role};
use crate::ports::llm::ChatMessage;

const RULE: &str = "======================================================================";

/// Insertion-ordered variables injected into the system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    entries: Vec<(String, String)>,
}

impl Variables {
    /// Sets `name` to `value`. An existing name keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns `true` if no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output-format instructions appended to the system prompt.
///
/// Example and schema are mutually exclusive: setting one replaces the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FormatHint {
    /// No formatting rules.
    #[default]
    None,
    /// An example object the response should look like.
    Example(Value),
    /// A JSON schema the response should follow.
    Schema(Value),
}

impl FormatHint {
    /// Returns `true` if this hint contributes a formatting block.
    ///
    /// Empty objects, arrays and strings count as unset.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            FormatHint::None => false,
            FormatHint::Example(value) | FormatHint::Schema(value) => !is_empty_json(value),
        }
    }

    fn describe(&self) -> Option<(&'static str, &Value)> {
        match self {
            FormatHint::None => None,
            FormatHint::Example(value) => Some((
                "Below is the example json format that must be used for the assistant response.",
                value,
            )),
            FormatHint::Schema(value) => Some((
                "Below is the json schema that must be used for formatting assistant response.",
                value,
            )),
        }
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Result of compiling a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    /// Messages in submission order.
    pub messages: Vec<ChatMessage>,
    /// Final system message content, or empty when there is none.
    pub system_prompt: String,
}

fn comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<!--.*?-->\s*").expect("comment pattern is valid"))
}

/// Removes `<!-- ... -->` blocks and the whitespace that follows each.
#[must_use]
pub fn strip_html_comments(content: &str) -> String {
    comment_pattern().replace_all(content, "").into_owned()
}

/// Renders the variable declaration block, or `None` when there are no variables.
#[must_use]
pub fn render_variables(vars: &Variables) -> Option<String> {
    if vars.is_empty() {
        return None;
    }
    let mut block = format!(
        "\n{RULE}\nSTART OF VARIABLE DECLARATION SECTION\n\
         Below are the texts with headlines. Use the headline as a variable name \
         and the text underneath it as the value.\n{RULE}\n"
    );
    for (name, value) in vars.iter() {
        block.push_str(&format!("# {name}\n{value}\n"));
    }
    block.push_str(&format!("\n{RULE}\nEND OF VARIABLE DECLARATION SECTION\n{RULE}\n"));
    Some(block)
}

/// Renders the formatting rules block, or `None` when the hint is inactive.
#[must_use]
pub fn render_format_rules(hint: &FormatHint) -> Option<String> {
    if !hint.is_active() {
        return None;
    }
    let (instruction, value) = hint.describe()?;
    Some(format!(
        "\n{RULE}\nSTART OF FORMATTING RULES SECTION\n{instruction}\n{RULE}\n{value}\
         \n{RULE}\nEND OF FORMATTING RULES SECTION\n{RULE}\n"
    ))
}

/// Builds the message list for submission from the stored state.
#[must_use]
pub fn compile(messages: &MessageStore, vars: &Variables, hint: &FormatHint) -> CompiledPrompt {
    let mut compiled: Vec<ChatMessage> = messages
        .iter()
        .map(|(role, content)| ChatMessage::new(role, strip_html_comments(content).trim()))
        .collect();

    if let Some(block) = render_variables(vars) {
        for message in compiled.iter_mut().filter(|m| m.role == Role::System) {
            message.content = format!("{block}\n\n{}", message.content);
        }
    }

    if let Some(block) = render_format_rules(hint) {
        let mut found = false;
        for message in compiled.iter_mut().filter(|m| m.role == Role::System) {
            message.content = format!("{}\n\n{block}", message.content);
            found = true;
        }
        if !found {
            compiled.push(ChatMessage::new(Role::System, block));
        }
    }

    let system_prompt = compiled
        .iter()
        .rev()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.clone())
        .unwrap_or_default();

    CompiledPrompt { messages: compiled, system_prompt }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(entries: &[(Role, &str)]) -> MessageStore {
        let mut store = MessageStore::new();
        for (role, content) in entries {
            store.insert(*role, (*content).to_string());
        }
        store
    }

    #[test]
    fn strips_comments_and_trailing_whitespace() {
        let input = "Keep <!-- drop\nthis -->  \n\nthis";
        assert_eq!(strip_html_comments(input), "Keep this");
    }

    #[test]
    fn comment_stripping_is_idempotent() {
        let inputs = [
            "plain",
            "<!-- a --> b <!-- c -->",
            "x<!--\nmulti\nline\n-->\n\ny",
            "<!-- unterminated",
            "<!-- <!-- nested --> -->",
        ];
        for input in inputs {
            let once = strip_html_comments(input);
            assert_eq!(strip_html_comments(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn no_variable_block_without_variables() {
        let compiled = compile(
            &store(&[(Role::System, "Be brief.")]),
            &Variables::default(),
            &FormatHint::None,
        );
        assert_eq!(compiled.messages[0].content, "Be brief.");
        assert!(!compiled.system_prompt.contains("VARIABLE DECLARATION"));
    }

    #[test]
    fn variable_block_lists_variables_in_insertion_order() {
        let mut vars = Variables::default();
        vars.set("topic", "rust");
        vars.set("tone", "dry");
        vars.set("topic", "ownership");

        let block = render_variables(&vars).unwrap();
        assert_eq!(block.matches("START OF VARIABLE DECLARATION SECTION").count(), 1);
        assert_eq!(block.matches("END OF VARIABLE DECLARATION SECTION").count(), 1);
        let topic = block.find("# topic\nownership\n").unwrap();
        let tone = block.find("# tone\ndry\n").unwrap();
        assert!(topic < tone);
        assert!(block.starts_with(&format!("\n{RULE}\nSTART")));
        assert!(block.ends_with(&format!("END OF VARIABLE DECLARATION SECTION\n{RULE}\n")));
    }

    #[test]
    fn variables_are_prepended_to_system_message() {
        let mut vars = Variables::default();
        vars.set("name", "Ada");
        let compiled = compile(
            &store(&[(Role::System, "Greet {name}."), (Role::User, "hi")]),
            &vars,
            &FormatHint::None,
        );
        let expected = format!("{}\n\nGreet {{name}}.", render_variables(&vars).unwrap());
        assert_eq!(compiled.messages[0].content, expected);
        assert_eq!(compiled.messages[1].content, "hi");
        assert_eq!(compiled.system_prompt, expected);
    }

    #[test]
    fn variables_skipped_without_system_message() {
        let mut vars = Variables::default();
        vars.set("name", "Ada");
        let compiled = compile(&store(&[(Role::User, "hi")]), &vars, &FormatHint::None);
        assert_eq!(compiled.messages, vec![ChatMessage::new(Role::User, "hi")]);
        assert_eq!(compiled.system_prompt, "");
    }

    #[test]
    fn schema_block_appended_to_system_message() {
        let schema = json!({"type": "object"});
        let compiled = compile(
            &store(&[(Role::System, "Answer.")]),
            &Variables::default(),
            &FormatHint::Schema(schema.clone()),
        );
        let content = &compiled.messages[0].content;
        assert!(content.starts_with("Answer.\n\n"));
        assert!(content.contains("json schema"));
        assert!(content.contains(&schema.to_string()));
        assert_eq!(content.matches("START OF FORMATTING RULES SECTION").count(), 1);
    }

    #[test]
    fn format_block_becomes_new_system_message_when_missing() {
        let compiled = compile(
            &store(&[(Role::User, "hi")]),
            &Variables::default(),
            &FormatHint::Example(json!({"answer": "..."})),
        );
        assert_eq!(compiled.messages.len(), 2);
        assert_eq!(compiled.messages[1].role, Role::System);
        assert!(compiled.messages[1].content.contains("example json format"));
        assert_eq!(compiled.system_prompt, compiled.messages[1].content);
    }

    #[test]
    fn empty_example_adds_nothing() {
        let compiled = compile(
            &store(&[(Role::System, "S")]),
            &Variables::default(),
            &FormatHint::Example(json!({})),
        );
        assert_eq!(compiled.messages[0].content, "S");
    }

    #[test]
    fn comments_removed_before_injection() {
        let compiled = compile(
            &store(&[(Role::System, "  <!-- note -->\nYou are helpful.  ")]),
            &Variables::default(),
            &FormatHint::None,
        );
        assert_eq!(compiled.messages[0].content, "You are helpful.");
    }

    #[test]
    fn compile_leaves_store_untouched() {
        let stored = store(&[(Role::System, "<!-- x -->S")]);
        let mut vars = Variables::default();
        vars.set("a", "b");
        let _ = compile(&stored, &vars, &FormatHint::None);
        assert_eq!(stored.get(Role::System), Some("<!-- x -->S"));
    }
}
