//! Minimal CLI: grammar AST → (declarations | inspect)
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use peggy_typegen::{EmitOptions, Grammar};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive TypeScript declarations for the values each rule of a peggy grammar produces
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the declaration text (one type per rule, plus action helpers)
    Declarations(DeclarationsOut),
    /// print a JSON debug view of what was synthesized for each rule
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more grammar AST JSON files (`peggy --ast`). May be literal paths,
    /// quoted glob patterns, or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct EmitSettings {
    /// skip the ambient `text()`/`offset()`/`range()`/... declarations
    #[arg(long, default_value_t = false)]
    no_preamble: bool,

    /// skip the grammar's initializer code blocks
    #[arg(long, default_value_t = false)]
    no_initializers: bool,

    /// character classes with more members than this are typed as `string`
    #[arg(long, default_value_t = peggy_typegen::synth::CLASS_EXPANSION_LIMIT)]
    class_limit: usize,
}

#[derive(clap::Parser, Debug)]
struct DeclarationsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    emit_settings: EmitSettings,

    /// output .ts file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    emit_settings: EmitSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Decoded grammars in input order, each with a label for messages.
    fn load_grammars(&self) -> Result<Vec<(String, Grammar)>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut grammars = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            let (label, source) = if source_path == Path::new("-") {
                let mut source = String::new();
                std::io::stdin()
                    .read_to_string(&mut source)
                    .context("failed to read grammar AST from stdin")?;
                ("<stdin>".to_string(), source)
            } else {
                let label = source_path.to_string_lossy().to_string();
                let source = std::fs::read_to_string(&source_path)
                    .with_context(|| format!("failed to read source file ({label})"))?;
                (label, source)
            };
            let grammar = Grammar::from_json(&source)
                .with_context(|| format!("failed to decode grammar AST ({label})"))?;
            log::debug!("loaded {label}: {} rules", grammar.rules.len());
            grammars.push((label, grammar));
        }
        Ok(grammars)
    }
}

impl EmitSettings {
    fn options(&self) -> EmitOptions {
        EmitOptions {
            preamble: !self.no_preamble,
            initializers: !self.no_initializers,
            class_expansion_limit: self.class_limit,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Declarations(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let options = target.emit_settings.options();
                let mut ts_src = String::new();
                for (label, grammar) in target.input_settings.load_grammars()? {
                    let declarations = peggy_typegen::generate(&grammar, &options)
                        .with_context(|| format!("failed to derive types ({label})"))?;
                    ts_src.push_str(&declarations);
                }
                write_output(target.out.as_deref(), &ts_src)
            }
            Command::Inspect(target) => {
                let options = target.emit_settings.options();
                let mut reports = Vec::new();
                for (label, grammar) in target.input_settings.load_grammars()? {
                    let rules = peggy_typegen::emit::inspect_grammar(&grammar, &options)
                        .with_context(|| format!("failed to derive types ({label})"))?;
                    reports.push(serde_json::json!({ "source": label, "rules": rules }));
                }
                let mut report_src = serde_json::to_string_pretty(&reports)?;
                report_src.push('\n');
                write_output(target.out.as_deref(), &report_src)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => write_to(&mut std::io::stdout().lock(), src),
    }
}

/// Writes `src` as is; declaration text already ends with a newline.
fn write_to(writer: &mut impl Write, src: &str) -> Result<()> {
    writer.write_all(src.as_bytes()).context("failed to write output")?;
    writer.flush().context("failed to flush output")
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            // Literal path, or '-' for stdin
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"{ "rules": [
        { "name": "Word", "expression": { "type": "text", "expression": {
            "type": "one_or_more", "expression": { "type": "class", "parts": [["a", "z"]], "inverted": false }
        }}}
    ]}"#;

    #[test]
    fn glob_patterns_resolve_and_literals_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), TINY).unwrap();
        std::fs::write(dir.path().join("b.json"), TINY).unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let mut found = resolve_file_path_patterns([pattern.as_str(), "-"]).unwrap();
        assert_eq!(found.pop(), Some(PathBuf::from("-")));
        found.sort();
        assert_eq!(found, [dir.path().join("a.json"), dir.path().join("b.json")]);
    }

    #[test]
    fn glob_matching_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let err = resolve_file_path_patterns([pattern]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn declarations_command_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("word.json");
        let out = dir.path().join("gen/word.ts");
        std::fs::write(&input, TINY).unwrap();

        let cli = CommandLineInterface::try_parse_from([
            "peggy-typegen", "declarations", "--no-preamble",
            "-i", input.to_str().unwrap(),
            "--out", out.to_str().unwrap(),
        ]).unwrap();
        cli.run().unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "export type Word = string;\n");
    }

    #[test]
    fn inspect_command_reports_rules() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("word.json");
        let out = dir.path().join("word.inspect.json");
        std::fs::write(&input, TINY).unwrap();

        let cli = CommandLineInterface::try_parse_from([
            "peggy-typegen", "inspect", "-i", input.to_str().unwrap(), "--out", out.to_str().unwrap(),
        ]).unwrap();
        cli.run().unwrap();

        let report_src = std::fs::read_to_string(&out).unwrap();
        assert!(report_src.ends_with("}\n]\n"));
        let report: serde_json::Value = serde_json::from_str(&report_src).unwrap();
        assert_eq!(report[0]["rules"][0]["name"], "Word");
        assert_eq!(report[0]["rules"][0]["exported_type"], "string");
        assert_eq!(report[0]["rules"][0]["action"], false);
    }

    #[test]
    fn stdout_output_adds_no_trailing_blank_line() {
        let mut buffer = Vec::new();
        write_to(&mut buffer, "export type Word = string;\n").unwrap();
        assert_eq!(buffer, b"export type Word = string;\n");
    }

    #[test]
    fn unreadable_input_is_reported_with_its_path() {
        let cli = CommandLineInterface::try_parse_from([
            "peggy-typegen", "declarations", "-i", "/definitely/not/here.json",
        ]).unwrap();
        let err = cli.run().unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
