use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use crate::tutor::types::Message;

const USAGE: &str =
    "usage: mathsage [--config <path>] --transcript <path> [--problem <text>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub transcript_path: PathBuf,
    pub problem: Option<String>,
}

pub fn args_from_env() -> Result<CliArgs> {
    let cwd = env::current_dir()?;
    parse_args(env::args().skip(1), &cwd)
}

pub fn parse_args(args: impl IntoIterator<Item = String>, cwd: &Path) -> Result<CliArgs> {
    let mut config_path = None;
    let mut transcript_path = None;
    let mut problem = None;

    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| anyhow!("missing value for {flag}. {USAGE}"))
        };
        match flag.as_str() {
            "--config" => config_path = Some(PathBuf::from(value()?)),
            "--transcript" => transcript_path = Some(PathBuf::from(value()?)),
            "--problem" => problem = Some(value()?),
            other => return Err(anyhow!("unexpected argument '{other}'. {USAGE}")),
        }
    }

    Ok(CliArgs {
        config_path: config_path.unwrap_or_else(|| cwd.join("mathsage.jsonc")),
        transcript_path: transcript_path
            .ok_or_else(|| anyhow!("--transcript is required. {USAGE}"))?,
        problem,
    })
}

/// Reads a JSON array of `{role, content}` messages.
pub fn load_transcript(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse transcript {}", path.display()))
}
