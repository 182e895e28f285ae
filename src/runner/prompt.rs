//! Interactive input collection
//!
//! Tasks may declare fields that are asked for right before their commands
//! run. Answers are substituted into commands as `$field`.

use crate::config::Prompt;
use crate::error::{ExecutionError, ExecutionResult};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

struct PromptIo {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

/// Asks the operator for interactive field values
///
/// Input and output sit behind one lock, so tasks that reach their prompts
/// concurrently are asked one after another instead of interleaving.
pub struct PromptCollector {
    io: Mutex<PromptIo>,
}

impl PromptCollector {
    /// Prompt on stdout, read answers from stdin
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }

    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        PromptCollector {
            io: Mutex::new(PromptIo {
                input: Box::new(input),
                output: Box::new(output),
            }),
        }
    }

    /// Ask for every field of `task_name`, in declaration order
    pub fn collect(
        &self,
        task_name: &str,
        fields: &[(String, Prompt)],
    ) -> ExecutionResult<HashMap<String, String>> {
        let mut answers = HashMap::with_capacity(fields.len());
        if fields.is_empty() {
            return Ok(answers);
        }

        let mut guard = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let PromptIo { input, output } = &mut *guard;

        writeln!(output, "Task '{}' requires interactive input:", task_name)
            .map_err(|error| prompt_io(task_name, error))?;

        for (name, prompt) in fields {
            let value = ask(&mut **input, &mut **output, name, prompt)?;
            debug!(task = task_name, field = %name, "collected interactive input");
            writeln!(output, "  {}: {}", name, value).map_err(|error| prompt_io(name, error))?;
            answers.insert(name.clone(), value);
        }

        writeln!(output).map_err(|error| prompt_io(task_name, error))?;
        Ok(answers)
    }
}

fn ask(
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    name: &str,
    prompt: &Prompt,
) -> ExecutionResult<String> {
    let mut line = prompt_line(name, prompt);
    line.push_str(": ");
    output
        .write_all(line.as_bytes())
        .and_then(|_| output.flush())
        .map_err(|error| prompt_io(name, error))?;

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .map_err(|error| prompt_io(name, error))?;
    if read == 0 {
        return Err(ExecutionError::InputClosed(name.to_string()));
    }

    let mut value = answer.trim().to_string();
    if value.is_empty() {
        if let Some(default) = prompt.default_value() {
            value = default.to_string();
        }
    }

    if value.is_empty() && prompt.required {
        return Err(ExecutionError::MissingInput(name.to_string()));
    }

    Ok(value)
}

/// `message [default] (required)`, falling back to the field name
fn prompt_line(name: &str, prompt: &Prompt) -> String {
    let mut line = if prompt.message.is_empty() {
        name.to_string()
    } else {
        prompt.message.clone()
    };
    if let Some(default) = prompt.default_value() {
        line.push_str(&format!(" [{}]", default));
    }
    if prompt.required {
        line.push_str(" (required)");
    }
    line
}

fn prompt_io(field: &str, error: io::Error) -> ExecutionError {
    ExecutionError::PromptIo {
        field: field.to_string(),
        error,
    }
}
