use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use keytree_engine::Document;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keytree")]
#[command(about = "Inspect and edit keytree files", long_about = None)]
struct Args {
    /// The keytree file to operate on (created if absent)
    #[arg(long, short = 'f', value_name = "FILE", global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the serialized form of the file
    Print,
    /// Print the value stored at a path
    Get {
        /// Path segments, outermost first
        #[arg(value_name = "KEY", required = true)]
        path: Vec<String>,
    },
    /// Set the value at a path, creating sections as needed
    Set {
        /// The value to store
        #[arg(long, short = 'v')]
        value: String,
        #[arg(value_name = "KEY", required = true)]
        path: Vec<String>,
    },
    /// Rename the section at a path (moves it below its siblings)
    Rename {
        /// The new key
        #[arg(long)]
        to: String,
        #[arg(value_name = "KEY", required = true)]
        path: Vec<String>,
    },
    /// Remove the section at a path, and its whole subtree
    Remove {
        #[arg(value_name = "KEY", required = true)]
        path: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let Some(file) = args.file else {
        bail!("no file given; pass --file");
    };
    let mut doc = Document::open(&file);

    match args.command {
        Command::Print => {
            println!("{doc}");
        }
        Command::Get { path } => {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            match doc.get_str(&segments) {
                Some(value) => println!("{value}"),
                None => bail!("no section at {} in {}", path.join("/"), file.display()),
            }
        }
        Command::Set { value, path } => {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            doc.set(&value, &segments);
            save(&doc)?;
        }
        Command::Rename { to, path } => {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            if !doc.section_exists(&segments) {
                bail!("no section at {} in {}", path.join("/"), file.display());
            }
            doc.rename(&to, &segments);
            save(&doc)?;
        }
        Command::Remove { path } => {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            if !doc.section_exists(&segments) {
                bail!("no section at {} in {}", path.join("/"), file.display());
            }
            doc.remove(&segments);
            save(&doc)?;
        }
    }
    Ok(())
}

fn save(doc: &Document) -> Result<()> {
    if !doc.save() {
        bail!("failed to write {}", doc.file().display());
    }
    Ok(())
}
