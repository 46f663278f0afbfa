/* 📖 # Why is the CLI minimal and hardcoded?

The CLI takes a single optional command and no flags:

- `routebook` or `routebook markdown`: print the Markdown documentation
- `routebook json`: print the JSON route list
- `routebook save [file]`: write the Markdown documentation (default `SAMPLE_DOCS.md`)
- `routebook serve`: serve the demo service until the process is killed

Settings come from `routebook.toml` in the current directory when it exists.

Exit codes:
- 0: Success
- 1: Error (unknown command, invalid config, I/O or bind failure)
*/

mod widgets;

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use routebook_base::http::serve;
use routebook_base::tracing::init_tracing;
use routebook_base::{ErrorKind, RoutebookError, RoutebookResult, err};
use routebook_engine::{ServeConfig, ServiceRegistry, json_document, load_config, markdown, write_markdown};
use tracing::info;

use crate::widgets::{WidgetStore, widget_service};

const CONFIG_FILE: &str = "routebook.toml";
const DEFAULT_DOCS_FILE: &str = "SAMPLE_DOCS.md";

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("markdown");
    let rest = args.get(1..).unwrap_or_default();

    if let Err(e) = run(command, rest) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: &str, rest: &[String]) -> RoutebookResult<()> {
    let config = load_config(CONFIG_FILE)?;
    let store = WidgetStore::new();
    let service = widget_service(&config.root, &store)?;

    match command {
        "markdown" => print!("{}", markdown(&service)),
        "json" => println!("{}", json_document(&service)),
        "save" => {
            let path = PathBuf::from(rest.first().map(String::as_str).unwrap_or(DEFAULT_DOCS_FILE));
            save(&service, path)?;
        }
        "serve" => serve_forever(service, &config)?,
        other => {
            return Err(err!(
                "Unknown command '{}', expected one of: markdown, json, save, serve",
                other
            ));
        }
    }
    Ok(())
}

fn save(service: &ServiceRegistry, path: PathBuf) -> RoutebookResult<()> {
    let file = match File::create(&path) {
        Ok(file) => file,
        Err(source) => {
            return Err(Box::new(RoutebookError::new(ErrorKind::FileError { path, source })));
        }
    };
    write_markdown(service, BufWriter::new(file))?;
    println!("Documentation written to {}", path.display());
    Ok(())
}

fn serve_forever(service: ServiceRegistry, config: &ServeConfig) -> RoutebookResult<()> {
    let router = service.dispatch_table();
    let handle = serve(Arc::new(router), config.server_config())?;
    info!(routes = service.routes().len(), root = %service.root_path(), "Serving widget service");
    println!("Serving on http://{}", handle.address(&config.host));
    handle.wait();
    Ok(())
}
