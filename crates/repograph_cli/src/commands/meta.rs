//! `repograph completions` and `repograph man`.

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::Cli;

const BIN_NAME: &str = "repograph";

fn write_completions(shell: Shell, out: &mut impl Write) {
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
}

fn write_man_page(out: &mut impl Write) -> io::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(out)
}

/// One page for the binary and one per subcommand.
fn write_man_pages(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)
}

pub(crate) fn handle_completions(shell: Shell) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = output {
        write_man_pages(&dir)?;
        println!("Wrote man pages to {}", dir.display());
    } else {
        write_man_page(&mut io::stdout().lock())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn zsh_completions_cover_fetch_subcommands() {
        let mut script = Vec::new();
        write_completions(Shell::Zsh, &mut script);
        let script = String::from_utf8(script).unwrap();
        assert!(script.contains("#compdef repograph"));
        assert!(script.contains("contributors"));
        assert!(script.contains("graphql"));
    }

    #[test]
    fn man_page_documents_results_dir() {
        let mut page = Vec::new();
        write_man_page(&mut page).unwrap();
        let page = String::from_utf8(page).unwrap();
        assert!(page.to_lowercase().contains(".th repograph"));
        assert!(page.contains("results"));
    }

    #[test]
    fn man_pages_include_subcommands() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("man1");
        handle_man(Some(dir.clone())).unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"repograph.1".to_string()));
        assert!(names.iter().any(|n| n.starts_with("repograph-clean")));
    }
}
