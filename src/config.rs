//! Assembly-time settings

use std::path::PathBuf;

/// Environment variable enabling grammar dumps, see [`Config::dump_grammar`]
pub const DUMP_GRAMMAR_VAR: &str = "LANGKIT_DUMP_GRAMMAR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Where to dump the compiled grammar, its first and follow sets and the parse table of
    /// every assembled language. `"1"` dumps to stderr, anything else is a directory to write
    /// `<start type>.grammar` files to.
    pub dump_grammar: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            dump_grammar: std::env::var(DUMP_GRAMMAR_VAR).ok(),
        }
    }

    pub fn with_dump_grammar(self, target: impl Into<String>) -> Config {
        Config {
            dump_grammar: Some(target.into()),
        }
    }
}

/// Writes a grammar dump. Failures are reported on stderr and otherwise ignored.
pub(crate) fn write_dump(dump: &str, language_name: &str, target: &str) {
    if target == "1" {
        eprintln!("info: {}: grammar of `{}`", DUMP_GRAMMAR_VAR, language_name);
        eprint!("{}", dump);
        return;
    }

    let dir = PathBuf::from(target);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!(
            "warning: {}: failed to create directory {:?}: {}",
            DUMP_GRAMMAR_VAR, dir, e
        );
        return;
    }

    let path = dir.join(format!("{}.grammar", language_name));
    match std::fs::write(&path, dump) {
        Ok(()) => eprintln!("info: {}: wrote {}", DUMP_GRAMMAR_VAR, path.display()),
        Err(e) => eprintln!(
            "warning: {}: failed to write {:?}: {}",
            DUMP_GRAMMAR_VAR, path, e
        ),
    }
}

#[test]
fn dump_to_directory() {
    let dir = std::env::temp_dir().join(format!("langkit-dump-{}", std::process::id()));
    let config = Config::default().with_dump_grammar(dir.to_string_lossy());
    let types = crate::test_grammars::arithmetic_types();
    crate::Language::with_config(&types, config).unwrap();

    let dump = std::fs::read_to_string(dir.join("Expr.grammar")).unwrap();
    assert!(dump.contains("Expr#atom"));
    assert!(dump.contains("FOLLOW"));
    let _ = std::fs::remove_dir_all(&dir);
}
