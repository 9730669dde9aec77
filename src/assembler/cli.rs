// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use clap::Parser;

use crate::core::assembler::error::CliError;

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "Two-pass assembler for a 14-bit word-addressed machine.

Each FILE is a base name: the source is read from FILE.as and outputs are
written next to it as FILE.ob, FILE.ent and FILE.ext. The entry and extern
listings are only written when non-empty. The exit status is nonzero when
any input fails to assemble; the remaining inputs are still processed.";

#[derive(Parser, Debug)]
#[command(
    name = "asm14",
    version = VERSION,
    about = "Two-pass assembler for a 14-bit word-addressed machine",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Source file base names; `.as` is appended to locate each input.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,
}

/// Reject base names that already carry the source extension, which would
/// silently look for `name.as.as`.
pub fn validate_cli(cli: &Cli) -> Result<(), CliError> {
    for base in &cli.files {
        if base.ends_with(".as") {
            return Err(CliError::new(format!(
                "Pass the base name without the .as extension: {base}"
            )));
        }
    }
    Ok(())
}

pub fn input_path(base: &str) -> String {
    format!("{base}.as")
}

pub fn output_path(base: &str, extension: &str) -> String {
    format!("{base}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::{input_path, output_path, validate_cli, Cli};
    use clap::Parser;

    #[test]
    fn cli_parses_multiple_base_names() {
        let cli = Cli::parse_from(["asm14", "prog", "other"]);
        assert_eq!(cli.files, vec!["prog".to_string(), "other".to_string()]);
    }

    #[test]
    fn cli_requires_at_least_one_input() {
        assert!(Cli::try_parse_from(["asm14"]).is_err());
    }

    #[test]
    fn validate_rejects_source_extension() {
        let cli = Cli::parse_from(["asm14", "prog.as"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pass the base name without the .as extension: prog.as"
        );
    }

    #[test]
    fn paths_append_extensions() {
        assert_eq!(input_path("prog"), "prog.as");
        assert_eq!(output_path("prog", "ob"), "prog.ob");
        assert_eq!(output_path("dir/prog", "ent"), "dir/prog.ent");
    }
}
