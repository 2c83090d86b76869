//! The interactive navigator: one command per line from any reader.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;

use drift_session::render::{
    export_candidates, render_children, render_lineage, render_stack, render_tree,
};
use drift_session::{ContentHash, NavOutcome, PruneOutcome, Session};

const PROMPT: &str = "drift> ";

const HELP: &str = "\
query TEXT              run a query and start a new graph
diffuse [IDX] [RATE]    diffuse candidate IDX of the active document
upscale [IDX]           upscale candidate IDX of the active document
up | down [IDX]         move along the tree
back | forward | prev   move along the navigation stack
root | goto POS         jump to a stack position
prune                   remove the active document and its subtree
reset                   drop the whole graph
save                    save the active document as a query
start POS|HASH          start a new graph from a saved query
graph | stack | children | path
export DIR              write the active candidates to DIR
save-session [-f] NAME  save the session (-f replaces an existing one)
load-session NAME       replace the current session with a saved one
status | help | quit";

/// A saved artifact named by its position in the query list or its hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocRef {
    Position(usize),
    Hash(ContentHash),
}

impl FromStr for DocRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 {
            return Ok(Self::Hash(ContentHash::from_hex(s)?));
        }
        s.parse()
            .map(Self::Position)
            .map_err(|_| anyhow!("expected a query position or a 64-character hash, got {s:?}"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShellCommand {
    Query(String),
    Diffuse { index: usize, skip_rate: Option<f32> },
    Upscale { index: usize },
    Up,
    Down { index: usize },
    Back,
    Forward,
    Prev,
    Root,
    Goto { position: usize },
    Prune,
    Reset,
    Save,
    Start(DocRef),
    Graph,
    Stack,
    Children,
    Path,
    Export { dir: PathBuf },
    SaveSession { name: String, replace: bool },
    LoadSession { name: String },
    Status,
    Help,
    Quit,
}

fn optional<T: FromStr>(args: &[&str], i: usize, what: &str) -> anyhow::Result<Option<T>> {
    args.get(i)
        .map(|s| s.parse().map_err(|_| anyhow!("invalid {what}: {s:?}")))
        .transpose()
}

fn required<T: FromStr>(args: &[&str], i: usize, what: &str) -> anyhow::Result<T> {
    optional(args, i, what)?.ok_or_else(|| anyhow!("missing {what}"))
}

impl ShellCommand {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let cmd = match word {
            "query" | "q" => {
                if rest.is_empty() {
                    bail!("query needs some text");
                }
                Self::Query(rest.to_string())
            }
            "diffuse" | "d" => Self::Diffuse {
                index: optional(&args, 0, "candidate index")?.unwrap_or(0),
                skip_rate: optional(&args, 1, "skip rate")?,
            },
            "upscale" | "u" => Self::Upscale {
                index: optional(&args, 0, "candidate index")?.unwrap_or(0),
            },
            "up" => Self::Up,
            "down" => Self::Down {
                index: optional(&args, 0, "child index")?.unwrap_or(0),
            },
            "back" | "b" => Self::Back,
            "forward" | "f" => Self::Forward,
            "prev" | "p" => Self::Prev,
            "root" => Self::Root,
            "goto" => Self::Goto {
                position: required(&args, 0, "stack position")?,
            },
            "prune" => Self::Prune,
            "reset" => Self::Reset,
            "save" => Self::Save,
            "start" => Self::Start(required(&args, 0, "query position or hash")?),
            "graph" => Self::Graph,
            "stack" => Self::Stack,
            "children" => Self::Children,
            "path" => Self::Path,
            "export" => Self::Export {
                dir: required(&args, 0, "directory")?,
            },
            "save-session" => match args.as_slice() {
                ["-f", name] => Self::SaveSession {
                    name: name.to_string(),
                    replace: true,
                },
                [name] => Self::SaveSession {
                    name: name.to_string(),
                    replace: false,
                },
                _ => bail!("usage: save-session [-f] NAME"),
            },
            "load-session" => Self::LoadSession {
                name: required(&args, 0, "session name")?,
            },
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command {other:?}, try `help`"),
        };
        Ok(Some(cmd))
    }
}

pub struct Shell<W: Write> {
    session: Session,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(session: Session, out: W) -> Self {
        Self { session, out }
    }

    /// Read and execute commands until `quit` or end of input.
    ///
    /// A failing command is reported and the loop continues.
    pub fn run(&mut self, mut input: impl BufRead) -> anyhow::Result<()> {
        let mut line = String::new();
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                break;
            }
            let keep_going = match ShellCommand::parse(&line) {
                Ok(None) => true,
                Ok(Some(cmd)) => match self.execute(cmd) {
                    Ok(keep_going) => keep_going,
                    Err(e) => {
                        writeln!(self.out, "{} {e:#}", "error:".red().bold())?;
                        true
                    }
                },
                Err(e) => {
                    writeln!(self.out, "{} {e}", "error:".red().bold())?;
                    true
                }
            };
            if !keep_going {
                break;
            }
        }
        if self.session.is_unsaved() {
            writeln!(self.out, "{} leaving with unsaved changes", "!".yellow().bold())?;
        }
        Ok(())
    }

    /// Run one command. Returns `false` when the shell should exit.
    pub fn execute(&mut self, cmd: ShellCommand) -> anyhow::Result<bool> {
        match cmd {
            ShellCommand::Query(text) => {
                self.session.query(&text)?;
                self.show_active()?;
            }
            ShellCommand::Diffuse { index, skip_rate } => {
                let rate = skip_rate.unwrap_or(self.session.defaults().skip_rate);
                self.session.diffuse(rate, index)?;
                self.show_active()?;
            }
            ShellCommand::Upscale { index } => {
                self.session.upscale(index)?;
                self.show_active()?;
            }
            ShellCommand::Up => {
                let outcome = self.session.up()?;
                self.show_outcome(outcome)?;
            }
            ShellCommand::Down { index } => {
                let outcome = self.session.down(index)?;
                self.show_outcome(outcome)?;
            }
            ShellCommand::Back => {
                let outcome = self.session.back()?;
                self.show_outcome(outcome)?;
            }
            ShellCommand::Forward => {
                let outcome = self.session.forward()?;
                self.show_outcome(outcome)?;
            }
            ShellCommand::Prev => {
                let outcome = self.session.prev()?;
                self.show_outcome(outcome)?;
            }
            ShellCommand::Root => {
                self.session.goto_root()?;
                self.show_active()?;
            }
            ShellCommand::Goto { position } => {
                self.session.set_stack_position(position)?;
                self.show_active()?;
            }
            ShellCommand::Prune => match self.session.prune_current_document()? {
                PruneOutcome::Pruned {
                    nodes,
                    stack_entries,
                } => {
                    writeln!(
                        self.out,
                        "{} Pruned {nodes} documents from the graph and {stack_entries} from the stack",
                        "✓".green()
                    )?;
                    self.show_active()?;
                }
                PruneOutcome::Refused(reason) => writeln!(self.out, "{}", reason.yellow())?,
            },
            ShellCommand::Reset => {
                self.session.reset_graph();
                writeln!(self.out, "Graph cleared.")?;
            }
            ShellCommand::Save => {
                let hash = self.session.save_current()?;
                writeln!(self.out, "{} Saved as {}", "✓".green(), hash.short_hex().yellow())?;
            }
            ShellCommand::Start(doc) => {
                let hash = match doc {
                    DocRef::Position(p) => self.session.catalog().query_hash_at(p)?,
                    DocRef::Hash(h) => h,
                };
                self.session.start_from_doc(&hash)?;
                self.show_active()?;
            }
            ShellCommand::Graph => write!(self.out, "{}", render_tree(&self.session))?,
            ShellCommand::Stack => {
                let text = render_stack(&self.session);
                if text.is_empty() {
                    writeln!(self.out, "Stack is empty.")?;
                } else {
                    write!(self.out, "{text}")?;
                }
            }
            ShellCommand::Children => {
                let text = render_children(&self.session)?;
                writeln!(self.out, "{}", text.trim_end())?;
            }
            ShellCommand::Path => write!(self.out, "{}", render_lineage(&self.session)?)?,
            ShellCommand::Export { dir } => {
                let node = self
                    .session
                    .active_node()
                    .context("no document is active, run a query first")?;
                for path in export_candidates(node.artifact(), &dir)? {
                    writeln!(self.out, "  {}", path.display())?;
                }
            }
            ShellCommand::SaveSession { name, replace } => {
                let hash = if replace {
                    self.session.replace_saved(&name)?
                } else {
                    self.session.save_as(&name)?
                };
                writeln!(
                    self.out,
                    "{} Saved session {} ({})",
                    "✓".green(),
                    name.yellow(),
                    hash.short_hex().dimmed()
                )?;
            }
            ShellCommand::LoadSession { name } => {
                if self.session.is_unsaved() {
                    writeln!(self.out, "{} discarding unsaved changes", "!".yellow().bold())?;
                }
                let (session, report) = Session::load(
                    &name,
                    self.session.backend().clone(),
                    self.session.catalog().clone(),
                    self.session.defaults(),
                )?;
                self.session = session;
                writeln!(
                    self.out,
                    "Loaded session {} ({} documents)",
                    name.yellow(),
                    self.session.graph().len()
                )?;
                for (position, hash) in &report.missing {
                    writeln!(
                        self.out,
                        "{} stack entry {position} ({}) not found",
                        "!".yellow().bold(),
                        hash.short_hex()
                    )?;
                }
            }
            ShellCommand::Status => self.show_status()?,
            ShellCommand::Help => writeln!(self.out, "{HELP}")?,
            ShellCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn show_active(&mut self) -> anyhow::Result<()> {
        match self.session.active_node() {
            Some(node) => writeln!(
                self.out,
                "Active Document: {}\n  {} candidates, {}",
                node.text().bold(),
                node.artifact().len(),
                node.hash().short_hex().dimmed()
            )?,
            None => writeln!(self.out, "No active document.")?,
        }
        Ok(())
    }

    fn show_outcome(&mut self, outcome: NavOutcome) -> anyhow::Result<()> {
        match outcome {
            NavOutcome::Moved(_) => self.show_active(),
            NavOutcome::Unchanged(reason) => {
                writeln!(self.out, "{}", reason.yellow())?;
                Ok(())
            }
        }
    }

    fn show_status(&mut self) -> anyhow::Result<()> {
        let s = &self.session;
        let active = s.active_node().map(|n| n.text().to_string());
        let position = s
            .stack()
            .index()
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        writeln!(self.out, "Backend: {}", s.backend().describe().cyan())?;
        writeln!(self.out, "Active: {}", active.as_deref().unwrap_or("(none)"))?;
        writeln!(
            self.out,
            "Stack: position {position} of {}, graph: {} documents",
            s.stack().len(),
            s.graph().len()
        )?;
        if s.is_desynchronized() {
            writeln!(self.out, "{}", "active document is off the stack position".yellow())?;
        }
        if s.is_unsaved() {
            writeln!(self.out, "{}", "unsaved changes".yellow())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use drift_session::{Catalog, GenerationDefaults, SyntheticBackend};

    fn shell() -> Shell<Vec<u8>> {
        colored::control::set_override(false);
        let session = Session::new(
            Arc::new(SyntheticBackend::new(2)),
            Arc::new(Catalog::in_memory()),
            GenerationDefaults {
                query_candidates: 3,
                diffuse_candidates: 2,
                skip_rate: 0.5,
            },
        );
        Shell::new(session, Vec::new())
    }

    fn run(shell: &mut Shell<Vec<u8>>, script: &str) -> String {
        shell.out.clear();
        shell.run(Cursor::new(script.to_string())).unwrap();
        String::from_utf8(shell.out.clone()).unwrap()
    }

    #[test]
    fn parse_basic_commands() {
        assert_eq!(
            ShellCommand::parse("query a blue  heron").unwrap(),
            Some(ShellCommand::Query("a blue  heron".into()))
        );
        assert_eq!(
            ShellCommand::parse("diffuse 2 0.25").unwrap(),
            Some(ShellCommand::Diffuse {
                index: 2,
                skip_rate: Some(0.25)
            })
        );
        assert_eq!(
            ShellCommand::parse("d").unwrap(),
            Some(ShellCommand::Diffuse {
                index: 0,
                skip_rate: None
            })
        );
        assert_eq!(
            ShellCommand::parse("goto 3").unwrap(),
            Some(ShellCommand::Goto { position: 3 })
        );
        assert_eq!(
            ShellCommand::parse("save-session -f night").unwrap(),
            Some(ShellCommand::SaveSession {
                name: "night".into(),
                replace: true
            })
        );
        assert_eq!(ShellCommand::parse("exit").unwrap(), Some(ShellCommand::Quit));
    }

    #[test]
    fn parse_ignores_blank_and_comment_lines() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert_eq!(ShellCommand::parse("# note").unwrap(), None);
    }

    #[test]
    fn parse_rejects_bad_input() {
        for line in ["query", "goto", "goto x", "diffuse 1 fast", "teleport", "save-session"] {
            assert!(ShellCommand::parse(line).is_err(), "{line}");
        }
    }

    #[test]
    fn parse_start_by_position_or_hash() {
        let hash = ContentHash::of(b"doc");
        assert_eq!(
            ShellCommand::parse(&format!("start {}", hash.to_hex())).unwrap(),
            Some(ShellCommand::Start(DocRef::Hash(hash)))
        );
        assert_eq!(
            ShellCommand::parse("start 4").unwrap(),
            Some(ShellCommand::Start(DocRef::Position(4)))
        );
    }

    #[test]
    fn scripted_session_builds_a_tree() {
        let mut sh = shell();
        let out = run(
            &mut sh,
            "query ember fields\ndiffuse 1\nupscale 0\nback\nstack\nquit\n",
        );
        assert!(out.contains("Active Document: ember fields"));
        assert!(out.contains("> 1 ember fields -- diffuse item[1] sr[0.5]"));
        assert_eq!(sh.session.stack().len(), 3);
        assert_eq!(sh.session.stack().index(), Some(1));
        assert!(out.contains("leaving with unsaved changes"));
    }

    #[test]
    fn errors_do_not_stop_the_loop() {
        let mut sh = shell();
        let out = run(&mut sh, "diffuse\nbogus\nquery owl\nupscale 7\nstatus\n");
        assert!(out.contains("error: invalid state"));
        assert!(out.contains("error: unknown command"));
        assert!(out.contains("candidate index 7 out of range"));
        assert!(out.contains("graph: 1 documents"));
    }

    #[test]
    fn clamped_moves_are_reported() {
        let mut sh = shell();
        let out = run(&mut sh, "query owl\nback\nup\nchildren\n");
        assert!(out.contains("already at the start of the stack"));
        assert!(out.contains("already at the root"));
        assert!(out.contains("No children to display"));
    }

    #[test]
    fn sessions_save_and_load_through_the_shell() {
        let mut sh = shell();
        run(&mut sh, "query tide pools\ndiffuse 0\nsave-session pools\n");
        assert!(!sh.session.is_unsaved());

        let out = run(&mut sh, "reset\nload-session pools\nstatus\n");
        assert!(out.contains("Loaded session pools (2 documents)"));
        assert_eq!(sh.session.graph().len(), 2);

        let out = run(&mut sh, "save-session pools\n");
        assert!(out.contains("already registered"));
    }

    #[test]
    fn saved_queries_seed_new_graphs() {
        let mut sh = shell();
        let out = run(&mut sh, "query dunes\ndiffuse 2 0.1\nsave\nstart 0\ngraph\n");
        assert!(out.contains("Saved as"));
        assert_eq!(sh.session.graph().len(), 1);
        assert!(sh
            .session
            .active_node()
            .unwrap()
            .text()
            .starts_with("dunes -- diffuse item[2]"));
    }

    #[test]
    fn export_writes_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell();
        let script = format!("query lanterns\nexport {}\n", dir.path().display());
        run(&mut sh, &script);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
