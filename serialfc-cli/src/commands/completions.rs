//! Shell completion generation.

use {
    clap::CommandFactory,
    clap_complete::{Shell, generate},
    std::io::{self, Write},
};

use crate::Cli;

/// Write the completion script for `shell` to `out`.
pub(crate) fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd
        .get_name()
        .to_string();
    generate(shell, &mut cmd, name, out);
}

/// Generate shell completions to stdout.
pub(crate) fn cmd_completions(shell: Shell) {
    write_completions(shell, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_bash_completions_name_subcommands() {
        let out = script(Shell::Bash);
        assert!(out.contains("serialfc"));
        assert!(out.contains("apply"));
        assert!(out.contains("--dry-run"));
    }

    #[test]
    fn test_every_shell_generates() {
        for shell in [
            Shell::Bash,
            Shell::Zsh,
            Shell::Fish,
            Shell::PowerShell,
            Shell::Elvish,
        ] {
            assert!(!script(shell).is_empty(), "{shell:?}");
        }
    }
}
