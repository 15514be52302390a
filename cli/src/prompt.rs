//! Line-based terminal form for editing metadata.

use colored::Colorize;
use coreprops::edit::DESCRIPTION_CHAR_LIMIT;
use coreprops::{EditOutcome, FormInput, MetadataEditor, MetadataRecord, FIXED_CATEGORY};
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

/// Typing this at any prompt cancels the edit.
const CANCEL: &str = ":q";

/// Prompts for each editable field on a line-oriented terminal.
///
/// Enter keeps the value shown in brackets. End of input cancels.
pub struct PromptEditor<R, W> {
    input: R,
    output: W,
}

impl PromptEditor<StdinLock<'static>, Stdout> {
    /// Editor bound to the process stdin and stdout.
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptEditor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for one value. `None` means the user cancelled.
    fn ask(&mut self, label: &str, hint: &str, current: &str) -> io::Result<Option<String>> {
        writeln!(self.output, "{} {}", label.magenta().bold(), hint.dimmed())?;
        if current.is_empty() {
            write!(self.output, "{} ", ">".cyan())?;
        } else {
            write!(self.output, "{} {} ", format!("[{}]", current).green().italic(), ">".cyan())?;
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer == CANCEL {
            return Ok(None);
        }
        writeln!(self.output)?;
        Ok(Some(if answer.is_empty() {
            current.to_string()
        } else {
            answer.to_string()
        }))
    }

    fn run_form(&mut self, form: &mut FormInput) -> io::Result<bool> {
        writeln!(self.output, "{}", "Dublin Core Metadata Editor".cyan().bold())?;
        writeln!(
            self.output,
            "{}",
            format!("Enter: keep value • {}: cancel", CANCEL).dimmed()
        )?;
        writeln!(self.output)?;

        let fields: [(&str, &str, &mut String); 4] = [
            ("DC: Title", "e.g. Senior Backend Developer", &mut form.title),
            ("DC: Creator", "(comma-separated)", &mut form.creators),
            ("CP: Keywords", "(comma-separated)", &mut form.keywords),
            ("CP: Description", "(max 200 characters)", &mut form.description),
        ];
        for (label, hint, value) in fields {
            match self.ask(label, hint, value)? {
                Some(answer) => *value = answer,
                None => return Ok(false),
            }
        }
        if form.description.chars().count() > DESCRIPTION_CHAR_LIMIT {
            writeln!(
                self.output,
                "{} description truncated to {} characters",
                "!".yellow().bold(),
                DESCRIPTION_CHAR_LIMIT
            )?;
        }

        writeln!(self.output, "{}", "CP: Category".magenta().bold())?;
        writeln!(self.output, "{} (fixed value)\n", FIXED_CATEGORY)?;

        write!(self.output, "{} ", "Submit changes? [Y/n]".bold())?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        let answer = line.trim().to_lowercase();
        Ok(answer.is_empty() || answer == "y" || answer == "yes")
    }
}

impl<R: BufRead, W: Write> MetadataEditor for PromptEditor<R, W> {
    fn edit(&mut self, record: &MetadataRecord) -> coreprops::Result<EditOutcome> {
        let mut form = FormInput::from_record(record);
        if !self.run_form(&mut form)? {
            return Ok(EditOutcome::Cancelled);
        }

        let mut updated = record.clone();
        form.apply(&mut updated);
        Ok(EditOutcome::Submitted(updated))
    }
}
