use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use rasp::{
  disassemble, Assembler, AssemblerError, Assembly, DecodeError, Machine, MachineError, Word
};

/// Assemble and run programs for a Random-Access Stored-Program machine.
#[derive(Parser, Debug)]
#[command(name = "rasp", version, about)]
struct Cli {
  /// Log more: `-v` for debug, `-vv` for every executed instruction. `RUST_LOG` overrides this.
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Translate assembly into encoded words, one per line.
  Assemble {
    file: PathBuf,
    /// Print a table of words, instructions, labels, and variables instead.
    #[arg(long)]
    listing: bool,
  },
  /// Load a program and run it until it halts.
  Run {
    file: PathBuf,
    /// The file holds encoded words, one per line, rather than assembly.
    #[arg(long)]
    binary: bool,
    /// Initial register contents placed right after the program, e.g. `--registers 3,4,0`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    registers: Vec<Word>,
    /// Zeroed registers appended after the initial registers.
    #[arg(long, default_value_t = 0)]
    blank: usize,
    /// Give up after this many instructions.
    #[arg(long)]
    max_steps: Option<u64>,
    /// Print the whole machine state when done.
    #[arg(long)]
    dump: bool,
  },
  /// Translate encoded words, one per line, back into assembly.
  Disassemble {
    file: PathBuf,
  },
}

#[derive(Error, Debug)]
enum CliError {
  #[error("could not read {}: {}", .path.display(), .source)]
  Io { path: PathBuf, #[source] source: std::io::Error },
  #[error("{}:{}: `{}` is not a word", .path.display(), .line, .text)]
  NotAWord { path: PathBuf, line: usize, text: String },
  #[error(transparent)]
  Assembler(#[from] AssemblerError),
  #[error(transparent)]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  Machine(#[from] MachineError),
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match execute(cli.command) {
    Ok(())     => ExitCode::SUCCESS,
    Err(error) => {
      eprintln!("error: {}", error);
      ExitCode::FAILURE
    }
  }
}

fn init_logging(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace"
  };
  let filter = EnvFilter::try_from_default_env()
                 .unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn execute(command: Command) -> Result<(), CliError> {
  match command {

    Command::Assemble { file, listing } => {
      let assembly = assemble_file(&file)?;
      match listing {
        true  => println!("{}", assembly),
        false => {
          for word in &assembly.words {
            println!("{}", word);
          }
        }
      }
    }

    Command::Run { file, binary, registers, blank, max_steps, dump } => {
      let (words, variables) = match binary {
        true  => (read_words(&file)?, None),
        false => {
          let assembly = assemble_file(&file)?;
          (assembly.words, Some(assembly.variables))
        }
      };

      let mut machine = Machine::with_program(&words, &registers, blank);
      match max_steps {
        Some(limit) => machine.run_with_limit(limit)?,
        None        => machine.run()?
      }

      match dump {
        true  => println!("{}", machine),
        false => {
          println!("acc = {}", machine.acc());
          println!("pc  = {}", machine.pc());
          println!("steps = {}", machine.steps());
          for (address, value) in machine.registers().iter().enumerate().skip(words.len()) {
            let name = variables.as_ref()
                                .and_then(|table| table.get_symbol(address as Word))
                                .map_or_else(String::new, |name| format!(" ({})", name));
            println!("R[{}]{} = {}", address, name, value);
          }
        }
      }
    }

    Command::Disassemble { file } => {
      for instruction in disassemble(&read_words(&file)?)? {
        println!("{}", instruction);
      }
    }

  }
  Ok(())
}

fn read_source(path: &Path) -> Result<String, CliError> {
  fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

fn assemble_file(path: &Path) -> Result<Assembly, CliError> {
  let text = read_source(path)?;
  Ok(Assembler::new().assemble_listing(&text)?)
}

fn read_words(path: &Path) -> Result<Vec<Word>, CliError> {
  parse_words(path, &read_source(path)?)
}

/// One decimal word per line; blank lines are skipped. `path` only labels errors.
fn parse_words(path: &Path, text: &str) -> Result<Vec<Word>, CliError> {
  text.lines()
      .enumerate()
      .map(|(index, line)| (index + 1, line.trim()))
      .filter(|(_, line)| !line.is_empty())
      .map(|(line, text)| {
        text.parse::<Word>()
            .map_err(|_| CliError::NotAWord {
              path: path.to_path_buf(),
              line,
              text: text.to_string()
            })
      })
      .collect()
}


#[cfg(test)]
mod tests {
  use clap::CommandFactory;
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn command_line_is_well_formed() {
    Cli::command().debug_assert();
  }

  #[test]
  fn words_skip_blank_lines() {
    let words = parse_words(Path::new("program.words"), "262157\n\n  0  \r\n\n").unwrap();
    assert_eq!(words, vec![262_157, 0]);
  }

  #[test]
  fn words_report_the_offending_line() {
    let error = parse_words(Path::new("program.words"), "262157\n\nLDA #5\n0").unwrap_err();
    match error {
      CliError::NotAWord { path, line, text } => {
        assert_eq!(path, PathBuf::from("program.words"));
        assert_eq!(line, 3);
        assert_eq!(text, "LDA #5");
      }
      other => panic!("unexpected error: {}", other),
    }
  }

  #[test]
  fn missing_file() {
    let error = read_words(Path::new("/nonexistent/program.words")).unwrap_err();
    assert!(matches!(error, CliError::Io { .. }));
  }

  #[test]
  fn run_arguments() {
    let cli = Cli::try_parse_from([
      "rasp", "run", "multiply.rasp", "--registers", "3,-4,0", "--blank", "2", "--max-steps", "100"
    ]).unwrap();

    match cli.command {
      Command::Run { file, binary, registers, blank, max_steps, dump } => {
        assert_eq!(file, PathBuf::from("multiply.rasp"));
        assert!(!binary);
        assert_eq!(registers, vec![3, -4, 0]);
        assert_eq!(blank, 2);
        assert_eq!(max_steps, Some(100));
        assert!(!dump);
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn run_defaults() {
    let cli = Cli::try_parse_from(["rasp", "-vv", "run", "program.words", "--binary"]).unwrap();
    assert_eq!(cli.verbose, 2);
    match cli.command {
      Command::Run { binary, registers, blank, max_steps, .. } => {
        assert!(binary);
        assert!(registers.is_empty());
        assert_eq!(blank, 0);
        assert_eq!(max_steps, None);
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

}
