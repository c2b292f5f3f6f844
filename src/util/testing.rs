//! Shared test setup: logging and a small sample catalog

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::Package;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = ["skim", "tuikit"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Two tops: `03` with a mid (`03B`) and a direct bottom, `05` with one bottom.
pub const SAMPLE_TAXONOMY_JSON: &str = r#"[
  {
    "short_name": "Mathematical logic and foundations",
    "code": "03",
    "classifications": [
      {"name": "General logic", "code": "03A"}
    ],
    "subclassifications": [
      {
        "name": "General logic",
        "code": "03B",
        "classifications": [
          {"name": "Mechanization of proofs", "code": "03B35"},
          {"name": "Higher-order logic", "code": "03B15"}
        ]
      }
    ]
  },
  {
    "short_name": "Combinatorics",
    "code": "05",
    "classifications": [
      {"name": "Graph theory", "code": "05C"}
    ],
    "subclassifications": []
  }
]"#;

pub const SAMPLE_LIBRARY_INDEX_CSV: &str = "name,section,file,url\n\
Isabelle,AFP,afp.csv,https://www.isa-afp.org\n\
Coq,Opam,coq.csv,https://coq.inria.fr/opam\n";

pub const SAMPLE_AFP_CSV: &str = "package,description,url,authors,category,msc,verified\n\
Graph_Theory,Directed graphs,https://www.isa-afp.org/entries/Graph_Theory.html,Lars Noschinski,Mathematics,05C,True\n\
Incompleteness,Goedel's theorems,https://www.isa-afp.org/entries/Incompleteness.html,Lawrence C. Paulson,Logic,03B35,True\n\
Orphan,Unknown area,https://www.isa-afp.org/entries/Orphan.html,Someone,Misc,99Z,False\n";

pub const SAMPLE_COQ_CSV: &str = "package,description,url,authors,category,msc,verified\n\
coq-graph-theory,Graph theory library,https://github.com/coq-community/graph-theory,Christian Doczkal,Mathematics,05c,False\n\
coq-hol-light,HOL Light in Coq,https://github.com/coq-community/hol-light,Someone,Logic,03b,False\n";

/// Write the sample catalog (taxonomy, index, two libraries) into `root`.
pub fn write_sample_data_dir(root: &Path) -> io::Result<()> {
    fs::write(root.join("msc.json"), SAMPLE_TAXONOMY_JSON)?;
    fs::write(root.join("libraries.csv"), SAMPLE_LIBRARY_INDEX_CSV)?;
    let library_dir = root.join("library_data");
    fs::create_dir_all(&library_dir)?;
    fs::write(library_dir.join("afp.csv"), SAMPLE_AFP_CSV)?;
    fs::write(library_dir.join("coq.csv"), SAMPLE_COQ_CSV)?;
    Ok(())
}

/// Package tagged with `code`; the other fields derive from `name`.
pub fn package(name: &str, code: &str, verified: bool) -> Package {
    Package {
        name: name.to_string(),
        url: format!("https://example.org/{name}"),
        description: format!("{name} description"),
        authors: "A. Author".to_string(),
        verified,
        classification_code: code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Taxonomy;

    #[test]
    fn given_sample_taxonomy_when_parsing_then_has_two_tops() {
        init_test_setup();
        let taxonomy: Taxonomy = serde_json::from_str(SAMPLE_TAXONOMY_JSON).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.tops[0].subclassifications[0].classifications.len(), 2);
    }
}
