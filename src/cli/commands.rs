//! Command dispatch and handlers

use std::io;
use std::path::Path;

use clap::CommandFactory;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::application::services::{Session, Step};
use crate::application::IoResultExt;
use crate::cli::args::{CacheCommands, Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::render::ToTreeString;
use crate::config::{global_config_path, Settings};
use crate::domain::{
    collect_all, compute_max_depth, navigate, parse_payload, summarize, validate_and_fix, Answers,
    DomainError, Navigation, Node, Procedure,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{
    FileSystem, RealFileSystem, SelectionItem, Selector, SkimSelector,
};
use crate::infrastructure::InfraError;

/// Execute the parsed command line.
pub fn execute(cli: Cli) -> CliResult<()> {
    let Some(command) = cli.command else {
        return Err(CliError::Usage(
            "no command given, run with --help for usage".to_string(),
        ));
    };
    let fs = RealFileSystem;

    match command {
        Commands::Completion { shell } => {
            cmd_completion(shell);
            Ok(())
        }
        Commands::Config { command } => cmd_config(command, cli.config.as_deref()),
        Commands::Navigate {
            tree,
            answers,
            json,
        } => cmd_navigate(&fs, &tree, &answers, json),
        Commands::Repair { tree, output } => cmd_repair(&fs, &tree, output.as_deref()),
        Commands::Procedures {
            tree,
            selected,
            json,
        } => cmd_procedures(&fs, &tree, &selected, json),
        Commands::Tree { tree } => cmd_tree(&fs, &tree),
        Commands::Ask { query } => {
            let container = container(cli.config.as_deref())?;
            cmd_ask(&container, &SkimSelector, &query)
        }
        Commands::Start { query, json, save } => {
            let container = container(cli.config.as_deref())?;
            cmd_start(&container, &query, json, save.as_deref())
        }
        Commands::Cache { command } => {
            let container = container(cli.config.as_deref())?;
            cmd_cache(&container, command)
        }
    }
}

fn container(config: Option<&Path>) -> CliResult<ServiceContainer> {
    let settings = Settings::load(config)?;
    Ok(ServiceContainer::new(settings)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DomainError::Unserializable(e.to_string()).into())
}

/// Read a tree file and bring it into a navigable shape.
///
/// The file may be raw generator output; the embedded object is extracted.
fn load_tree(fs: &dyn FileSystem, path: &Path) -> CliResult<Node> {
    let content = fs.read_to_string(path).with_path_context("read tree", path)?;
    let raw = parse_payload(&content)?;
    let outcome = validate_and_fix(&raw);
    if !outcome.fixes.is_empty() {
        output::warning(&format!(
            "{}: {} fix(es) applied, run `procguide repair` for details",
            path.display(),
            outcome.fixes.len()
        ));
    }
    Ok(outcome.tree)
}

fn write_file(fs: &dyn FileSystem, path: &Path, content: &str) -> CliResult<()> {
    fs.ensure_parent(path)
        .and_then(|()| fs.write(path, content))
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    Ok(())
}

/// Parse `key=value` pairs; the first `=` separates.
fn parse_answers(pairs: &[String]) -> CliResult<Answers> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| CliError::InvalidArgs(format!("expected KEY=VALUE, got '{pair}'")))
        })
        .collect()
}

fn print_step(step: &Step) {
    match step {
        Step::Question {
            question,
            key,
            options,
            answered,
            ..
        } => {
            output::header(&format!("{question} [{key}]"));
            for option in options {
                output::detail(option);
            }
            debug!("{answered} question(s) answered so far");
        }
        Step::Final {
            procedures,
            related_procedures,
            ..
        } => {
            if procedures.is_empty() {
                output::info("No specific procedures for these answers.");
            }
            output::procedures("Procedures", procedures);
            output::procedures("Related procedures", related_procedures);
        }
    }
}

// ============================================================
// Questionnaire Commands
// ============================================================

#[instrument(level = "debug", skip(container, selector))]
fn cmd_ask(container: &ServiceContainer, selector: &dyn Selector, query: &str) -> CliResult<()> {
    let mut session = container.questionnaire.start(query)?;
    let mut step = session.current_step();

    while let Step::Question {
        question, options, ..
    } = &step
    {
        let items: Vec<SelectionItem> = options
            .iter()
            .map(|o| SelectionItem {
                display: o.clone(),
                value: o.clone(),
            })
            .collect();
        let choice = selector
            .select_one(&items, &format!("{question} > "))
            .map_err(|message| InfraError::Selector { message })?;

        let Some(choice) = choice else {
            output::warning("cancelled");
            return Ok(());
        };
        output::action(question, &choice.value);
        step = session.answer(&choice.value)?;
    }

    print_step(&step);
    output::sources(session.sources());
    Ok(())
}

fn start_report(session: &Session) -> Value {
    json!({
        "query": session.query(),
        "source": session.source(),
        "step": session.current_step(),
        "sources": session.sources(),
    })
}

#[instrument(level = "debug", skip(container))]
fn cmd_start(
    container: &ServiceContainer,
    query: &str,
    json: bool,
    save: Option<&Path>,
) -> CliResult<()> {
    let session = match container.questionnaire.start(query) {
        Ok(session) => session,
        Err(e) => {
            let err = CliError::from(e);
            if json {
                if let Some(response) = err.response() {
                    output::info(&to_json(&response)?);
                }
            }
            return Err(err);
        }
    };

    if let Some(path) = save {
        write_file(container.fs.as_ref(), path, &to_json(session.tree())?)?;
        output::action("Saved tree", &path.display());
    }

    if json {
        output::info(&to_json(&start_report(&session))?);
    } else {
        output::action("Tree", session.source());
        print_step(&session.current_step());
    }
    Ok(())
}

// ============================================================
// Tree File Commands
// ============================================================

fn cmd_navigate(fs: &dyn FileSystem, path: &Path, pairs: &[String], json: bool) -> CliResult<()> {
    let tree = load_tree(fs, path)?;
    let answers = parse_answers(pairs)?;
    let navigation = navigate(&tree, &answers);

    if json {
        output::info(&to_json(&navigation)?);
        return Ok(());
    }
    match navigation {
        Navigation::Question {
            question,
            key,
            options,
            ..
        } => {
            output::header(&format!("{question} [{key}]"));
            for option in &options {
                output::detail(option);
            }
        }
        Navigation::Final { procedures } => {
            let summary = summarize(&tree, &procedures, &[]);
            print_step(&Step::Final {
                procedures: summary.procedures,
                related_procedures: summary.related_procedures,
                all_procedures: summary.all_procedures,
            });
        }
    }
    Ok(())
}

fn cmd_repair(fs: &dyn FileSystem, path: &Path, out: Option<&Path>) -> CliResult<()> {
    if let Some(rendered) = repair_tree(fs, path, out)? {
        output::info(&rendered);
    }
    Ok(())
}

/// Report on stderr and return the corrected tree when it belongs on stdout.
fn repair_tree(
    fs: &dyn FileSystem,
    path: &Path,
    out: Option<&Path>,
) -> CliResult<Option<String>> {
    let content = fs.read_to_string(path).with_path_context("read tree", path)?;
    let raw = parse_payload(&content)?;
    let outcome = validate_and_fix(&raw);

    for e in &outcome.errors {
        output::failure(e);
    }
    for f in &outcome.fixes {
        output::fix(f);
    }
    for w in &outcome.warnings {
        output::warning(w);
    }
    if outcome.is_valid {
        output::status("tree was already valid");
    }

    let rendered = to_json(&outcome.tree)?;
    match out {
        Some(target) => {
            write_file(fs, target, &rendered)?;
            output::status(&format!("wrote {}", target.display()));
            Ok(None)
        }
        None => Ok(Some(rendered)),
    }
}

fn cmd_procedures(
    fs: &dyn FileSystem,
    path: &Path,
    selected_ids: &[String],
    json: bool,
) -> CliResult<()> {
    let tree = load_tree(fs, path)?;
    let all = collect_all(&tree);

    let selected: Vec<Procedure> = selected_ids
        .iter()
        .filter_map(|id| {
            let found = all.iter().find(|p| &p.procedure_id == id).cloned();
            if found.is_none() {
                output::warning(&format!("no procedure with id '{id}' in tree"));
            }
            found
        })
        .collect();
    let summary = summarize(&tree, &selected, &all);
    let depth = compute_max_depth(&tree);

    if json {
        output::info(&to_json(&json!({ "summary": summary, "max_depth": depth }))?);
    } else {
        output::procedures("Selected", &summary.procedures);
        output::procedures("Related", &summary.related_procedures);
        if selected_ids.is_empty() {
            output::procedures("All", &summary.all_procedures);
        }
        output::action("Depth", &depth);
    }
    Ok(())
}

fn cmd_tree(fs: &dyn FileSystem, path: &Path) -> CliResult<()> {
    let tree = load_tree(fs, path)?;
    output::info(&tree.to_tree_string());
    Ok(())
}

// ============================================================
// Cache Commands
// ============================================================

fn cmd_cache(container: &ServiceContainer, command: CacheCommands) -> CliResult<()> {
    match command {
        CacheCommands::Stats { json } => {
            let report = container.cache.stats().report();
            if json {
                output::info(&to_json(&report)?);
            } else {
                let s = &report.stats;
                output::header("Cache");
                output::detail(&format!("entries:          {}", s.entries));
                output::detail(&format!("durable tier:     {}", s.durable_connected));
                output::detail(&format!("requests:         {}", s.total_requests));
                output::detail(&format!(
                    "memory hit rate:  {}% ({} hits, {} misses)",
                    report.hit_rates.memory, s.memory_hits, s.memory_misses
                ));
                output::detail(&format!(
                    "durable hit rate: {}% ({} hits, {} misses)",
                    report.hit_rates.durable, s.durable_hits, s.durable_misses
                ));
                output::detail(&format!("overall hit rate: {}%", report.hit_rates.overall));
            }
        }
        CacheCommands::Clear => {
            container.cache.clear();
            output::success("cache cleared");
        }
    }
    Ok(())
}

// ============================================================
// Config Commands
// ============================================================

fn cmd_config(command: ConfigCommands, local: Option<&Path>) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no config directory on this platform"),
            }
            if let Some(path) = local {
                output::action("Local", &path.display());
            }
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn cmd_completion(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::infrastructure::external::{NoSearch, UnavailableGenerator};

    /// Always picks the first offered item, or cancels.
    struct ScriptedSelector {
        cancel: bool,
    }

    impl Selector for ScriptedSelector {
        fn select_one(
            &self,
            items: &[SelectionItem],
            _prompt: &str,
        ) -> Result<Option<SelectionItem>, String> {
            Ok(if self.cancel { None } else { items.first().cloned() })
        }
    }

    fn offline_container() -> ServiceContainer {
        let mut settings = Settings::default();
        settings.search.delay_ms = 0;
        ServiceContainer::with_collaborators(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(UnavailableGenerator),
            Arc::new(NoSearch),
        )
        .unwrap()
    }

    #[test]
    fn given_selector_when_asking_then_walks_to_final_step() {
        let container = offline_container();

        let result = cmd_ask(
            &container,
            &ScriptedSelector { cancel: false },
            "construction business license",
        );

        assert!(result.is_ok());
    }

    #[test]
    fn given_cancelled_selection_when_asking_then_stops_quietly() {
        let container = offline_container();

        let result = cmd_ask(
            &container,
            &ScriptedSelector { cancel: true },
            "construction business license",
        );

        assert!(result.is_ok());
    }

    #[test]
    fn given_unrelated_query_when_asking_then_data_error() {
        let container = offline_container();

        let err = cmd_ask(&container, &ScriptedSelector { cancel: false }, "weather tomorrow")
            .unwrap_err();

        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_pairs_when_parsing_answers_then_splits_on_first_equals() {
        let answers = parse_answers(&["k=a=b".to_string(), "j=".to_string()]).unwrap();

        assert_eq!(answers.get("k"), Some("a=b"));
        assert_eq!(answers.get("j"), None);
    }

    #[test]
    fn given_missing_equals_when_parsing_answers_then_invalid_args() {
        let err = parse_answers(&["oops".to_string()]).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgs(_)));
    }

    #[test]
    fn given_valid_tree_without_output_when_repairing_then_stdout_is_only_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let raw = r#"{"question":"Q?","key":"k","options":["a"],"children":[{"procedureList":[]}]}"#;
        std::fs::write(&path, raw).unwrap();

        let stdout = repair_tree(&RealFileSystem, &path, None).unwrap().unwrap();

        let parsed: Node = serde_json::from_str(&stdout).unwrap();
        assert_eq!(parsed, serde_json::from_str::<Node>(raw).unwrap());
    }

    #[test]
    fn given_output_path_when_repairing_then_nothing_goes_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let target = dir.path().join("out/fixed.json");
        std::fs::write(&path, r#"{"question":"Q?","key":"k","options":["a","b"],"children":[]}"#)
            .unwrap();

        let stdout = repair_tree(&RealFileSystem, &path, Some(&target)).unwrap();

        assert!(stdout.is_none());
        let written = std::fs::read_to_string(&target).unwrap();
        assert!(serde_json::from_str::<Node>(&written).is_ok());
    }

    #[test]
    fn given_raw_model_output_when_loading_tree_then_extracts_and_repairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.txt");
        std::fs::write(
            &path,
            "Here you go:\n```json\n{\"question\":\"Q?\",\"key\":\"k\",\"options\":[\"a\",\"b\"],\
             \"children\":[{\"procedureList\":[]}]}\n```",
        )
        .unwrap();

        let tree = load_tree(&RealFileSystem, &path).unwrap();

        let q = tree.as_question().unwrap();
        assert_eq!(q.options.len(), q.children.len());
    }
}
