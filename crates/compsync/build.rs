use std::fs;
use std::path::Path;

use clap::CommandFactory;

// cli.rs only depends on clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

const MANUAL: &str = "compsync Manual";

/// Hand-written EXAMPLES sections, keyed by man page name.
const EXAMPLES: &[(&str, &str)] = &[
    (
        "compsync",
        "compsync diff -i inventory.json -d sw1 -k interface\n\
         compsync sync -i inventory.json -d sw1 -k interface --all --write --yes",
    ),
    (
        "compsync-diff",
        "compsync diff -i inventory.yaml -d sw1 -k consoleport --changed-only\n\
         compsync -o json diff -i inventory.yaml -d 7 -k poweroutlet",
    ),
    (
        "compsync-sync",
        "compsync sync -i inventory.json -d sw1 -k interface --add-missing\n\
         compsync sync -i inventory.json -d sw1 -k interface --rename 12=Gi0/1 --write",
    ),
];

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo");
    let man_dir = Path::new(&out_dir).join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");

    let source = format!("compsync {}", env!("CARGO_PKG_VERSION"));
    write_pages(&cli::Cli::command(), &man_dir, &source);
}

/// Section-1 page per visible command, named `compsync-<sub>` below the root.
fn write_pages(cmd: &clap::Command, dir: &Path, source: &str) {
    let name = cmd.get_name().to_owned();
    let path = dir.join(format!("{name}.1"));

    let mut page = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .section("1")
        .manual(MANUAL)
        .source(source.to_owned())
        .render(&mut page)
        .unwrap_or_else(|e| panic!("failed to render man page for `{name}`: {e}"));
    if let Some((_, examples)) = EXAMPLES.iter().find(|(page_name, _)| *page_name == name) {
        page.extend_from_slice(b".SH EXAMPLES\n");
        for line in examples.lines() {
            page.extend_from_slice(format!(".PP\n{}\n", line.trim()).as_bytes());
        }
    }
    fs::write(&path, page).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let sub = sub.clone().name(format!("{name}-{}", sub.get_name()));
        write_pages(&sub, dir, source);
    }
}
