//! Line-oriented command shell over a [`MemoryManager`]
//!
//! The `memsim` binary feeds stdin through [`Shell::run_line`]. Parsing and
//! execution live here so they can be driven from tests without a terminal.

use crate::core::error::{MemError, Result};
use crate::core::manager::MemoryManager;
use crate::core::source::{FileMode, FsSource, PayloadSource};
use std::fmt::Write as _;
use tracing::{error, warn};

pub const HELP: &str = "\
Commands:
  load-text <name>             load a text file
  load-bin <name>              load a binary file
  delete <id>                  delete a block by id
  delete-at <address>          delete the block starting at address
  overwrite <id> <content>     replace a block's content
  overwrite-at <address> <content>
  read <id>                    print a block's content
  list                         list resident blocks
  defrag                       compact the address space
  stats                        print usage statistics as JSON
  save <name>                  write <name>.unis
  help                         show this text
  exit                         quit";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load { name: String, mode: FileMode },
    Delete { id: String },
    DeleteAt { address: u64 },
    Overwrite { id: String, content: String },
    OverwriteAt { address: u64, content: String },
    Read { id: String },
    List,
    Defrag,
    Stats,
    Save { name: String },
    Help,
    Exit,
}

impl Command {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for blank lines. Content arguments take the rest
    /// of the line verbatim, spaces included.
    pub fn parse(line: &str) -> std::result::Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim_start()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "load-text" => Command::Load {
                name: single_arg(verb, rest)?,
                mode: FileMode::Text,
            },
            "load-bin" => Command::Load {
                name: single_arg(verb, rest)?,
                mode: FileMode::Binary,
            },
            "delete" => Command::Delete {
                id: single_arg(verb, rest)?,
            },
            "delete-at" => Command::DeleteAt {
                address: parse_address(&single_arg(verb, rest)?)?,
            },
            "overwrite" => {
                let (id, content) = split_content(verb, rest)?;
                Command::Overwrite { id, content }
            }
            "overwrite-at" => {
                let (address, content) = split_content(verb, rest)?;
                Command::OverwriteAt {
                    address: parse_address(&address)?,
                    content,
                }
            }
            "read" => Command::Read {
                id: single_arg(verb, rest)?,
            },
            "list" => no_args(verb, rest, Command::List)?,
            "defrag" => no_args(verb, rest, Command::Defrag)?,
            "stats" => no_args(verb, rest, Command::Stats)?,
            "save" => Command::Save {
                name: single_arg(verb, rest)?,
            },
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => return Err(format!("Unknown command '{}'. Type 'help' for a list.", verb)),
        };

        Ok(Some(command))
    }
}

fn single_arg(verb: &str, rest: &str) -> std::result::Result<String, String> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg.to_string()),
        (None, _) => Err(format!("'{}' needs an argument", verb)),
        (Some(_), Some(_)) => Err(format!("'{}' takes exactly one argument", verb)),
    }
}

fn split_content(verb: &str, rest: &str) -> std::result::Result<(String, String), String> {
    match rest.split_once(char::is_whitespace) {
        Some((target, content)) if !content.trim().is_empty() => {
            Ok((target.to_string(), content.trim_start().to_string()))
        }
        _ => Err(format!("'{}' needs a target and new content", verb)),
    }
}

fn no_args(verb: &str, rest: &str, command: Command) -> std::result::Result<Command, String> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(format!("'{}' takes no arguments", verb))
    }
}

fn parse_address(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("Invalid address '{}'", s))
}

/// What the driver should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Exit,
}

/// A manager plus the payload source its loads read from
pub struct Shell<S: PayloadSource = FsSource> {
    manager: MemoryManager,
    source: S,
}

impl<S: PayloadSource> Shell<S> {
    pub fn new(manager: MemoryManager, source: S) -> Self {
        Shell { manager, source }
    }

    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }

    /// Parse and execute one line, turning every failure into output
    ///
    /// Contract violations are logged at error level; the shell keeps going
    /// either way.
    pub fn run_line(&mut self, line: &str) -> Reply {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Reply::Output(String::new()),
            Err(message) => return Reply::Output(message),
        };

        match self.execute(command) {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_contract_violation() {
                    error!("Internal error: {}", err);
                } else {
                    warn!("{}", err);
                }
                Reply::Output(format!("Error: {}", err))
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        let output = match command {
            Command::Load { name, mode } => {
                let outcome = self.manager.load_from(&self.source, &name, mode)?;
                let mut out = format!(
                    "Loaded {} at {} ({} bytes)",
                    outcome.id, outcome.start_address, outcome.size
                );
                for victim in &outcome.evicted {
                    let _ = write!(out, "\nEvicted {}", victim);
                }
                if let Some(report) = outcome.compaction {
                    let _ = write!(out, "\nCompacted {} blocks", report.blocks_moved);
                }
                out
            }
            Command::Delete { id } => {
                let block = self.manager.delete(&id)?;
                format!("Deleted {}", block.id)
            }
            Command::DeleteAt { address } => {
                let block = self.manager.delete_at(address)?;
                format!("Deleted {} at {}", block.id, address)
            }
            Command::Overwrite { id, content } => {
                self.manager.overwrite(&id, content.into_bytes())?;
                format!("Overwrote {}", id)
            }
            Command::OverwriteAt { address, content } => {
                self.manager.overwrite_at(address, content.into_bytes())?;
                format!("Overwrote block at {}", address)
            }
            Command::Read { id } => String::from_utf8_lossy(self.manager.read(&id)?).into_owned(),
            Command::List => self.render_list(),
            Command::Defrag => {
                let report = self.manager.defragment()?;
                format!(
                    "Moved {} blocks ({} bytes)",
                    report.blocks_moved, report.bytes_moved
                )
            }
            Command::Stats => serde_json::to_string_pretty(&self.manager.stats())
                .map_err(|e| MemError::Io(std::io::Error::other(e)))?,
            Command::Save { name } => {
                let path = self.manager.save_unis(&name)?;
                format!("Saved to {}", path.display())
            }
            Command::Help => HELP.to_string(),
            Command::Exit => return Ok(Reply::Exit),
        };

        Ok(Reply::Output(output))
    }

    fn render_list(&self) -> String {
        let blocks = self.manager.list();
        if blocks.is_empty() {
            return "(empty)".to_string();
        }

        let mut out = format!("{:>8} {:>8} {:>8}  id", "start", "size", "used");
        for block in blocks {
            let _ = write!(
                out,
                "\n{:>8} {:>8} {:>8}  {}",
                block.start_address,
                block.size,
                block.payload.len(),
                block.id
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replacement::ReplacementPolicy;
    use tempfile::TempDir;

    fn shell(dir: &TempDir) -> Shell {
        let manager = MemoryManager::builder()
            .replacement(ReplacementPolicy::Fifo)
            .build()
            .unwrap();
        Shell::new(manager, FsSource::new(dir.path()))
    }

    fn output(reply: Reply) -> String {
        match reply {
            Reply::Output(s) => s,
            Reply::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("load-text notes.txt").unwrap(),
            Some(Command::Load {
                name: "notes.txt".into(),
                mode: FileMode::Text
            })
        );
        assert_eq!(
            Command::parse("  overwrite a.txt new content here ").unwrap(),
            Some(Command::Overwrite {
                id: "a.txt".into(),
                content: "new content here".into()
            })
        );
        assert_eq!(
            Command::parse("delete-at 0x80").unwrap(),
            Some(Command::DeleteAt { address: 128 })
        );
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("EXIT").unwrap(), Some(Command::Exit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("load-text").is_err());
        assert!(Command::parse("delete a b").is_err());
        assert!(Command::parse("delete-at twelve").is_err());
        assert!(Command::parse("overwrite a").is_err());
        assert!(Command::parse("list now").is_err());
        assert!(Command::parse("format c:").is_err());
    }

    #[test]
    fn test_session() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("b.bin"), [0u8; 100]).unwrap();
        let mut sh = shell(&dir);

        assert_eq!(output(sh.run_line("load-text a.txt")), "Loaded a.txt at 0 (64 bytes)");
        assert_eq!(output(sh.run_line("load-bin b.bin")), "Loaded b.bin at 64 (128 bytes)");
        assert_eq!(output(sh.run_line("read a.txt")), "alpha");

        assert_eq!(output(sh.run_line("overwrite a.txt beta gamma")), "Overwrote a.txt");
        assert_eq!(output(sh.run_line("read a.txt")), "beta gamma");

        let listing = output(sh.run_line("list"));
        assert!(listing.contains("a.txt"));
        assert!(listing.contains("b.bin"));

        assert_eq!(output(sh.run_line("delete-at 0")), "Deleted a.txt at 0");
        assert!(output(sh.run_line("read a.txt")).starts_with("Error: Block not found"));

        assert_eq!(output(sh.run_line("defrag")), "Moved 1 blocks (128 bytes)");
        assert_eq!(sh.run_line("exit"), Reply::Exit);
    }

    #[test]
    fn test_missing_source_reported() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);

        let out = output(sh.run_line("load-text nope.txt"));
        assert!(out.starts_with("Error: Payload source unavailable: nope.txt"));
        assert!(sh.manager().list().is_empty());
    }

    #[test]
    fn test_stats_and_save() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let mut sh = shell(&dir);
        sh.run_line("load-text a.txt");

        let stats: serde_json::Value = serde_json::from_str(&output(sh.run_line("stats"))).unwrap();
        assert_eq!(stats["resident_blocks"], 1);
        assert_eq!(stats["replacement"], "fifo");

        let target = dir.path().join("memory");
        let out = output(sh.run_line(&format!("save {}", target.display())));
        assert!(out.ends_with("memory.unis"));
        assert!(dir.path().join("memory.unis").exists());
    }
}
