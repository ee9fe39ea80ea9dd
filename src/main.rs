use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use hbnb_console::{FileStore, Interpreter};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive console over a file-backed object store.
struct Args {
    /// path of the JSON backing file
    #[argh(option, default = "PathBuf::from(\"file.json\")")]
    file: PathBuf,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args: Args = argh::from_env();

    let mut store = FileStore::new(args.file);
    if let Err(err) = store.reload() {
        warn!(
            path = %store.path().display(),
            error = %err,
            "could not read the backing file, starting empty"
        );
    }

    Interpreter::new(&mut store).repl()
}
