// ABOUTME: Command-line argument parsing for the sitetree binary
// ABOUTME: Flags select config, snapshot directory, and verbosity; the first free word is the command

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

pub const HELP: &str = "
USAGE:
    sitetree [FLAGS] <COMMAND> [ARGS]...

COMMANDS:
    projects                  Lists configured projects and whether their tree loaded
    tree [ROUTE]              Prints the sidebar for ROUTE (default: first project's root)
    search <QUERY>            Searches every loaded project by page name or title
    find <PROJECT> <PATH>     Prints one page as JSON
    users <QUERY>             Looks up owners and reviewers in users.json

FLAGS:
    -h, --help                Prints help information
    -V, --version             Prints version information
    -c, --config <file>       Specifies a file to use for configuration
    -d, --snapshots <dir>     Directory holding <project>.json snapshots (default: .)
    -v                        Increases logging verbosity each use for up to 3 times
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Projects,
    Tree { route: Option<String> },
    Search { query: String },
    Find { project: String, path: String },
    Users { query: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub display_help: bool,
    pub display_version: bool,
    pub config_file: Option<PathBuf>,
    pub snapshot_dir: PathBuf,
    pub verbosity: u64,
    pub command: Option<Command>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            display_help: false,
            display_version: false,
            config_file: None,
            snapshot_dir: PathBuf::from("."),
            verbosity: 0,
            command: None,
        }
    }
}

impl Args {
    pub fn parse_args() -> Result<Self> {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut words = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.display_help = true,
                "-V" | "--version" => parsed.display_version = true,
                "-c" | "--config" => {
                    let file = args.next().context("--config needs a file")?;
                    parsed.config_file = Some(PathBuf::from(file));
                }
                "-d" | "--snapshots" => {
                    let dir = args.next().context("--snapshots needs a directory")?;
                    parsed.snapshot_dir = PathBuf::from(dir);
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    if flag.chars().skip(1).all(|c| c == 'v') {
                        parsed.verbosity += (flag.len() - 1) as u64;
                    } else {
                        bail!("unexpected flag '{flag}'");
                    }
                }
                _ => words.push(arg),
            }
        }

        parsed.command = Self::command(words)?;
        Ok(parsed)
    }

    fn command(words: Vec<String>) -> Result<Option<Command>> {
        let mut words = words.into_iter();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<String> = words.collect();

        let command = match (name.as_str(), rest.as_slice()) {
            ("projects", []) => Command::Projects,
            ("tree", []) => Command::Tree { route: None },
            ("tree", [route]) => Command::Tree {
                route: Some(route.clone()),
            },
            ("search", [_, ..]) => Command::Search {
                query: rest.join(" "),
            },
            ("find", [project, path]) => Command::Find {
                project: project.clone(),
                path: path.clone(),
            },
            ("users", [query]) => Command::Users {
                query: query.clone(),
            },
            (name, _) => bail!("unknown command or wrong arguments: '{name}', see --help"),
        };
        Ok(Some(command))
    }
}
