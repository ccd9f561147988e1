use anyhow::{Context, Result};
use clap::Parser;
use class_archive::{Archive, ArchiveBuilder};
use class_archive::cli::{Cli, Commands, OutputFormat};
use class_archive::config::resolve_options;
use class_archive::decode::decode;
use class_archive::digest::{digest_archive, hash_content};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.clone() {
        Commands::List {
            root,
            base_package,
            format,
        } => {
            let archive = open_archive(&cli, &root, base_package.as_deref())?;
            let result = list_classes(&archive);
            write_list_output(&result, format)?;
        }
        Commands::Fetch {
            root,
            class_name,
            base_package,
            output,
        } => {
            let archive = open_archive(&cli, &root, base_package.as_deref())?;
            let result = fetch_class(&archive, &class_name, output.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Digest { root, base_package } => {
            let archive = open_archive(&cli, &root, base_package.as_deref())?;
            let digests = digest_archive(&archive);
            println!("{}", serde_json::to_string_pretty(&digests)?);
        }
        Commands::Decode { path } => {
            let decoded = decode(&path).with_context(|| format!("Failed to decode {path}"))?;
            println!("{decoded}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_archive(cli: &Cli, root: &str, base_package: Option<&str>) -> Result<Archive> {
    let options = resolve_options(cli, base_package)?;
    let builder = ArchiveBuilder::from_location(root)
        .with_context(|| format!("Invalid archive root: {root}"))?;
    Ok(builder.options(options).build())
}

#[derive(Debug, Serialize)]
struct ListedClass {
    class_name: String,
    overlay: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResult {
    root: String,
    multi_release: bool,
    class_count: usize,
    duration_ms: u64,
    classes: Vec<ListedClass>,
}

#[derive(Debug, Serialize)]
struct FetchResult {
    class_name: String,
    resource: String,
    size: usize,
    sha256: String,
    output: Option<String>,
}

fn list_classes(archive: &Archive) -> ListResult {
    let start = Instant::now();
    let mut classes: Vec<ListedClass> = archive
        .iter()
        .map(|entry| ListedClass {
            class_name: entry.name().to_string(),
            overlay: archive.overlay_source(entry.name()).map(str::to_string),
        })
        .collect();
    classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));

    ListResult {
        root: archive.dir().to_string_lossy().to_string(),
        multi_release: archive.is_multi_release(),
        class_count: classes.len(),
        duration_ms: start.elapsed().as_millis() as u64,
        classes,
    }
}

fn fetch_class(archive: &Archive, class_name: &str, output: Option<&Path>) -> Result<FetchResult> {
    let bytes = archive
        .read_bytecode(class_name)
        .with_context(|| format!("Failed to read class {class_name} from {}", archive.dir().display()))?;

    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(FetchResult {
        class_name: class_name.to_string(),
        resource: archive.resource_path(class_name),
        size: bytes.len(),
        sha256: hash_content(&bytes),
        output: output.map(|p| p.to_string_lossy().to_string()),
    })
}

fn write_list_output(result: &ListResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("root: {}\n", result.root));
            out.push_str(&format!("multi_release: {}\n", result.multi_release));
            out.push_str(&format!("class_count: {}\n", result.class_count));
            for c in &result.classes {
                match &c.overlay {
                    Some(source) => out.push_str(&format!("{} -> {source}\n", c.class_name)),
                    None => out.push_str(&format!("{}\n", c.class_name)),
                }
            }
            print!("{out}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn list_classes_sorts_and_reports_overlays() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "META-INF/MANIFEST.MF", b"Multi-Release: true\n");
        touch(tmp.path(), "z/Last.class", b"");
        touch(tmp.path(), "a/First.class", b"");
        touch(tmp.path(), "META-INF/versions/9/a/First.class", b"");

        let archive = Archive::open(tmp.path());
        let result = list_classes(&archive);
        assert!(result.multi_release);
        assert_eq!(result.class_count, 2);
        assert_eq!(result.classes[0].class_name, "a.First");
        assert_eq!(
            result.classes[0].overlay.as_deref(),
            Some("META-INF/versions/9/a/First")
        );
        assert_eq!(result.classes[1].class_name, "z.Last");
        assert!(result.classes[1].overlay.is_none());
    }

    #[test]
    fn fetch_class_writes_output_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        touch(tmp.path(), "classes/a/C.class", b"\xCA\xFE\xBA\xBE");
        let out = tmp.path().join("out/C.class");

        let archive = Archive::open(tmp.path().join("classes"));
        let result = fetch_class(&archive, "a.C", Some(&out))?;
        assert_eq!(result.size, 4);
        assert_eq!(result.resource, "a/C.class");
        assert_eq!(std::fs::read(&out)?, b"\xCA\xFE\xBA\xBE");
        Ok(())
    }
}
