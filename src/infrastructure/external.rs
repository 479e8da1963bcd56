//! External collaborators reached through configured commands.

use std::io;
use std::process::Output;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::SearchResult;
use crate::infrastructure::traits::{CommandRunner, GenerationBudget, SearchProvider, TextGenerator};

fn check_status(command: &str, output: Output) -> io::Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{command} exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    max_output_tokens: u32,
    temperature: f32,
}

/// Text generator that pipes a JSON request to a command and reads its stdout.
pub struct CommandGenerator {
    cmd: Arc<dyn CommandRunner>,
    command: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(cmd: Arc<dyn CommandRunner>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd,
            command: command.into(),
            args,
        }
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, budget: &GenerationBudget) -> io::Result<String> {
        let request = serde_json::to_string(&GenerationRequest {
            prompt,
            max_output_tokens: budget.max_output_tokens,
            temperature: budget.temperature,
        })
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        debug!("running generator {} ({} byte request)", self.command, request.len());
        let output = self.cmd.run_with_stdin(&self.command, &args, &request)?;
        check_status(&self.command, output)
    }
}

/// Stand-in when no generator is configured; every call fails.
#[derive(Debug, Default)]
pub struct UnavailableGenerator;

impl TextGenerator for UnavailableGenerator {
    fn generate(&self, _prompt: &str, _budget: &GenerationBudget) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no generator command configured",
        ))
    }
}

/// Search provider that runs a command with the query as last argument and
/// parses a JSON array of `{title, url, description}` from stdout.
pub struct CommandSearchProvider {
    cmd: Arc<dyn CommandRunner>,
    command: String,
    args: Vec<String>,
}

impl CommandSearchProvider {
    pub fn new(cmd: Arc<dyn CommandRunner>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd,
            command: command.into(),
            args,
        }
    }
}

impl SearchProvider for CommandSearchProvider {
    fn search(&self, query: &str, count: usize) -> io::Result<Vec<SearchResult>> {
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(query);

        let output = self.cmd.run(&self.command, &args)?;
        let stdout = check_status(&self.command, output)?;
        let mut results: Vec<SearchResult> = serde_json::from_str(&stdout)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        results.truncate(count);
        Ok(results)
    }
}

/// Search provider used when none is configured: always empty.
#[derive(Debug, Default)]
pub struct NoSearch;

impl SearchProvider for NoSearch {
    fn search(&self, _query: &str, _count: usize) -> io::Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
}
