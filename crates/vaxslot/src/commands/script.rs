use std::io::Read;

use super::{parse_command, Command, CommandError};

/// One non-empty script line, already split into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: u64,
    pub tokens: Vec<String>,
}

impl ScriptLine {
    pub fn parse(&self) -> Result<Command, CommandError> {
        let tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        parse_command(&tokens)
    }
}

/// Splits a command script into lines of tokens. Blank lines and lines starting with `#`
/// are skipped; double quotes group a token containing spaces.
pub fn read_script<R: Read>(reader: R) -> Result<Vec<ScriptLine>, CommandError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut lines = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| CommandError::Script(err.to_string()))?;
        let tokens: Vec<String> = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            continue;
        }
        let line = record.position().map_or(0, |position| position.line());
        lines.push(ScriptLine { line, tokens });
    }
    Ok(lines)
}
