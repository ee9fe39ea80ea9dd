//! The console itself: command dispatch, validation and rendering.

use std::io::Write;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;
use tracing::warn;

use crate::literal;
use crate::model::{ModelKind, Record};
use crate::parser::{self, Command, MethodCall};
use crate::storage::{FileStore, StoreError, StoreRecord};

const PROMPT: &str = "(hbnb) ";

const CLASS_MISSING: &str = "** class name missing **";
const CLASS_UNKNOWN: &str = "** class doesn't exist **";
const ID_MISSING: &str = "** instance id missing **";
const NO_INSTANCE: &str = "** no instance found **";
const ATTR_MISSING: &str = "** attribute name missing **";
const VALUE_MISSING: &str = "** value missing **";
const BAD_MAPPING: &str = "** invalid dictionary representation **";

/// The interactive console. It owns no storage itself; every command
/// drives the store it was given.
pub struct Interpreter<'s> {
    store: &'s mut FileStore,
    should_exit: bool,
}

impl<'s> Interpreter<'s> {
    pub fn new(store: &'s mut FileStore) -> Interpreter<'s> {
        Interpreter {
            store,
            should_exit: false,
        }
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Executes one input line, writing any output to `out`.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        match parser::parse(line) {
            Command::Empty => Ok(()),
            Command::Quit => {
                self.should_exit = true;
                Ok(())
            }
            Command::Create { kind } => self.cmd_create(kind, out),
            Command::Show { kind, id } => self.cmd_show(kind, id, out),
            Command::Destroy { kind, id } => self.cmd_destroy(kind, id, out),
            Command::All { kind } => self.cmd_all(kind, out),
            Command::Update {
                kind,
                id,
                field,
                value,
            } => self.cmd_update(kind, id, field, value, out),
            Command::Method { kind, call } => self.cmd_method(kind, call, line, out),
            Command::Unknown => write_unknown_syntax(line, out),
        }
    }

    /// Reads lines from the terminal until `quit`, `EOF` or end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();
        while !self.should_exit {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    editor.add_history_entry(line.as_str())?;
                    self.execute(&line, &mut stdout)?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn cmd_create(&mut self, kind: Option<String>, out: &mut dyn Write) -> Result<()> {
        let Some(kind) = kind else {
            writeln!(out, "{}", CLASS_MISSING)?;
            return Ok(());
        };
        let Some(kind) = ModelKind::from_tag(&kind) else {
            writeln!(out, "{}", CLASS_UNKNOWN)?;
            return Ok(());
        };
        let record = Record::new(kind);
        self.store.register(&record);
        if let Err(err) = self.store.persist() {
            return self.report_storage(err, out);
        }
        writeln!(out, "{}", record.id)?;
        Ok(())
    }

    fn cmd_show(
        &mut self,
        kind: Option<String>,
        id: Option<String>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(kind) = kind else {
            writeln!(out, "{}", CLASS_MISSING)?;
            return Ok(());
        };
        let Some(id) = id else {
            writeln!(out, "{}", ID_MISSING)?;
            return Ok(());
        };
        let Some(kind) = ModelKind::from_tag(&kind) else {
            writeln!(out, "{}", CLASS_UNKNOWN)?;
            return Ok(());
        };
        self.show_record(kind, &id, out)
    }

    fn cmd_destroy(
        &mut self,
        kind: Option<String>,
        id: Option<String>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(kind) = kind else {
            writeln!(out, "{}", CLASS_MISSING)?;
            return Ok(());
        };
        let Some(id) = id else {
            writeln!(out, "{}", ID_MISSING)?;
            return Ok(());
        };
        let Some(kind) = ModelKind::from_tag(&kind) else {
            writeln!(out, "{}", CLASS_UNKNOWN)?;
            return Ok(());
        };
        self.destroy_record(kind, &id, out)
    }

    /// `all` over the raw store records, in their stored spelling.
    fn cmd_all(&mut self, kind: Option<String>, out: &mut dyn Write) -> Result<()> {
        let filter = match kind {
            Some(tag) => match ModelKind::from_tag(&tag) {
                Some(kind) => Some(kind),
                None => {
                    writeln!(out, "{}", CLASS_UNKNOWN)?;
                    return Ok(());
                }
            },
            None => None,
        };
        if let Err(err) = self.store.reload() {
            return self.report_storage(err, out);
        }
        let prefix = filter.map(|kind| format!("{}.", kind.tag()));
        let mut rendered = Vec::new();
        for (key, stored) in self.store.records() {
            if let Some(prefix) = &prefix {
                if !key.starts_with(prefix) {
                    continue;
                }
            }
            rendered.push(quote_double(&render_store_entry(key, stored)));
        }
        writeln!(out, "[{}]", rendered.join(", "))?;
        Ok(())
    }

    fn cmd_update(
        &mut self,
        kind: Option<String>,
        id: Option<String>,
        field: Option<String>,
        value: Option<String>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(kind) = kind else {
            writeln!(out, "{}", CLASS_MISSING)?;
            return Ok(());
        };
        let Some(id) = id else {
            writeln!(out, "{}", ID_MISSING)?;
            return Ok(());
        };
        let Some(field) = field else {
            writeln!(out, "{}", ATTR_MISSING)?;
            return Ok(());
        };
        let Some(value) = value else {
            writeln!(out, "{}", VALUE_MISSING)?;
            return Ok(());
        };
        let Some(kind) = ModelKind::from_tag(&kind) else {
            writeln!(out, "{}", CLASS_UNKNOWN)?;
            return Ok(());
        };
        self.apply_scalar_update(kind, &id, &field, &value, out)
    }

    fn cmd_method(
        &mut self,
        kind: String,
        call: MethodCall,
        line: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(kind) = ModelKind::from_tag(&kind) else {
            writeln!(out, "{}", CLASS_UNKNOWN)?;
            return Ok(());
        };
        match call {
            MethodCall::All => self.method_all(kind, out),
            MethodCall::Count => self.method_count(kind, out),
            MethodCall::Show { id } => match id {
                Some(id) => self.show_record(kind, &id, out),
                None => {
                    writeln!(out, "{}", ID_MISSING)?;
                    Ok(())
                }
            },
            MethodCall::Destroy { id } => match id {
                Some(id) => self.destroy_record(kind, &id, out),
                None => {
                    writeln!(out, "{}", ID_MISSING)?;
                    Ok(())
                }
            },
            MethodCall::Update { id, field, value } => {
                let Some(id) = id else {
                    writeln!(out, "{}", ID_MISSING)?;
                    return Ok(());
                };
                let Some(field) = field else {
                    writeln!(out, "{}", ATTR_MISSING)?;
                    return Ok(());
                };
                let Some(value) = value else {
                    writeln!(out, "{}", VALUE_MISSING)?;
                    return Ok(());
                };
                self.apply_scalar_update(kind, &id, &field, &value, out)
            }
            MethodCall::UpdateMap { id, literal } => {
                let Some(id) = id else {
                    writeln!(out, "{}", ID_MISSING)?;
                    return Ok(());
                };
                self.apply_mapping_update(kind, &id, &literal, out)
            }
            MethodCall::Unrecognized => write_unknown_syntax(line, out),
        }
    }

    /// `<Kind>.all()` over rebuilt records, in their display spelling.
    fn method_all(&mut self, kind: ModelKind, out: &mut dyn Write) -> Result<()> {
        let records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        let prefix = format!("{}.", kind.tag());
        let rendered: Vec<String> = records
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, record)| record.to_string())
            .collect();
        writeln!(out, "[{}]", rendered.join(", "))?;
        Ok(())
    }

    fn method_count(&mut self, kind: ModelKind, out: &mut dyn Write) -> Result<()> {
        let records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        let prefix = format!("{}.", kind.tag());
        let count = records.keys().filter(|key| key.starts_with(&prefix)).count();
        writeln!(out, "{}", count)?;
        Ok(())
    }

    fn show_record(&mut self, kind: ModelKind, id: &str, out: &mut dyn Write) -> Result<()> {
        let records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        match records.get(&record_key(kind, id)) {
            Some(record) => writeln!(out, "{}", record)?,
            None => writeln!(out, "{}", NO_INSTANCE)?,
        }
        Ok(())
    }

    fn destroy_record(&mut self, kind: ModelKind, id: &str, out: &mut dyn Write) -> Result<()> {
        let records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        let key = record_key(kind, id);
        if !records.contains_key(&key) {
            writeln!(out, "{}", NO_INSTANCE)?;
            return Ok(());
        }
        self.store.delete(&key);
        if let Err(err) = self.store.persist() {
            return self.report_storage(err, out);
        }
        Ok(())
    }

    fn apply_scalar_update(
        &mut self,
        kind: ModelKind,
        id: &str,
        field: &str,
        raw_value: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        let Some(record) = records.get_mut(&record_key(kind, id)) else {
            writeln!(out, "{}", NO_INSTANCE)?;
            return Ok(());
        };
        record.set_field(field, scalar_value(raw_value));
        record.touch();
        self.store.register(record);
        if let Err(err) = self.store.persist() {
            return self.report_storage(err, out);
        }
        Ok(())
    }

    /// Mapping updates look the record up first; a bad literal is only
    /// reported when the record exists.
    fn apply_mapping_update(
        &mut self,
        kind: ModelKind,
        id: &str,
        literal_text: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut records = match self.store.all() {
            Ok(records) => records,
            Err(err) => return self.report_storage(err, out),
        };
        let Some(record) = records.get_mut(&record_key(kind, id)) else {
            writeln!(out, "{}", NO_INSTANCE)?;
            return Ok(());
        };
        let mapping = match literal::parse_mapping(literal_text) {
            Ok(mapping) => mapping,
            Err(_) => {
                writeln!(out, "{}", BAD_MAPPING)?;
                return Ok(());
            }
        };
        for (name, value) in mapping {
            record.set_field(&name, value);
        }
        record.touch();
        self.store.register(record);
        if let Err(err) = self.store.persist() {
            return self.report_storage(err, out);
        }
        Ok(())
    }

    fn report_storage(&self, err: StoreError, out: &mut dyn Write) -> Result<()> {
        warn!(error = %err, "storage operation failed");
        writeln!(out, "** storage error: {} **", err)?;
        Ok(())
    }
}

fn write_unknown_syntax(line: &str, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "*** Unknown syntax: {} ***", line.trim())?;
    Ok(())
}

fn record_key(kind: ModelKind, id: &str) -> String {
    format!("{}.{}", kind.tag(), id)
}

/// Structured parse first; text that is not valid JSON stays a string.
fn scalar_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// One element of the `all` listing: the store key mapped to its record.
fn render_store_entry(key: &str, stored: &StoreRecord) -> String {
    format!(
        "{{{}: {}}}",
        literal::render_string(key),
        render_store_record(stored)
    )
}

fn render_store_record(stored: &StoreRecord) -> String {
    let mut parts = vec![
        format!(
            "{}: {}",
            literal::render_string("__class__"),
            literal::render_string(&stored.class)
        ),
        format!(
            "{}: {}",
            literal::render_string("id"),
            literal::render_string(&stored.id)
        ),
        format!(
            "{}: {}",
            literal::render_string("created_at"),
            literal::render_string(&stored.created_at)
        ),
        format!(
            "{}: {}",
            literal::render_string("updated_at"),
            literal::render_string(&stored.updated_at)
        ),
    ];
    for (name, value) in &stored.fields {
        parts.push(format!(
            "{}: {}",
            literal::render_string(name),
            literal::render_value(value)
        ));
    }
    format!("{{{}}}", parts.join(", "))
}

fn quote_double(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run(console: &mut Interpreter, line: &str) -> String {
        let mut sink = Vec::new();
        console.execute(line, &mut sink).unwrap();
        String::from_utf8(sink).unwrap()
    }

    #[test]
    fn create_prints_the_new_id_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = FileStore::new(&path);
        let mut console = Interpreter::new(&mut store);

        let id = run(&mut console, "create BaseModel");
        let id = id.trim();
        assert!(!id.is_empty());
        assert!(path.exists());

        let shown = run(&mut console, &format!("show BaseModel {id}"));
        assert!(shown.starts_with(&format!("[BaseModel] ({id}) ")));
    }

    #[test]
    fn missing_arguments_come_before_the_kind_check() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("store.json"));
        let mut console = Interpreter::new(&mut store);

        assert_eq!(run(&mut console, "show"), "** class name missing **\n");
        assert_eq!(run(&mut console, "show Spaceship"), "** instance id missing **\n");
        assert_eq!(
            run(&mut console, "show Spaceship 1234"),
            "** class doesn't exist **\n"
        );
        assert_eq!(
            run(&mut console, "update User 1234 age"),
            "** value missing **\n"
        );
    }

    #[test]
    fn unknown_lines_echo_back_trimmed() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("store.json"));
        let mut console = Interpreter::new(&mut store);

        assert_eq!(
            run(&mut console, "  launch User  "),
            "*** Unknown syntax: launch User ***\n"
        );
        assert_eq!(
            run(&mut console, "User.fly()"),
            "*** Unknown syntax: User.fly() ***\n"
        );
    }

    #[test]
    fn quit_raises_the_exit_flag_silently() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("store.json"));
        let mut console = Interpreter::new(&mut store);

        assert!(!console.should_exit());
        assert_eq!(run(&mut console, "quit"), "");
        assert!(console.should_exit());
    }

    #[test]
    fn storage_failures_are_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("no/such/dir/store.json"));
        let mut console = Interpreter::new(&mut store);

        let output = run(&mut console, "create User");
        assert!(output.starts_with("** storage error: "));
        assert!(output.trim_end().ends_with("**"));
    }
}
