use anyhow::{bail, Context, Result};
use ragepad_lib::models::HierarchyEntry;
use ragepad_lib::spl::mutate::{move_category, move_sound, rename_sound};
use ragepad_lib::spl::tree::CategoryNode;
use ragepad_lib::spl::{document::resolve_title, Soundlist};
use std::env;
use std::fs;

const USAGE: &str = "Usage:
  spl_inspect <soundlist.spl> tree
  spl_inspect <soundlist.spl> rename <player_index> <title>
  spl_inspect <soundlist.spl> move-sound <player_index> <category> <position>
  spl_inspect <soundlist.spl> move-category <name> <position>

Edits are printed to stdout; the file is never written.";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("{}", USAGE);
        return Ok(());
    }

    let path = &args[1];
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;

    match args[2].as_str() {
        "tree" => print_tree(&text),
        "rename" => {
            let [index, title] = rest::<2>(&args)?;
            let updated = rename_sound(&text, parse_index(index)?, title)?;
            print!("{}", updated);
        }
        "move-sound" => {
            let [index, category, position] = rest::<3>(&args)?;
            let updated = move_sound(&text, parse_index(index)?, category, parse_index(position)?)?;
            print!("{}", updated);
        }
        "move-category" => {
            let [name, position] = rest::<2>(&args)?;
            let updated = move_category(&text, name, parse_index(position)?)?;
            print!("{}", updated);
        }
        other => bail!("Unknown command {:?}\n\n{}", other, USAGE),
    }
    Ok(())
}

fn rest<const N: usize>(args: &[String]) -> Result<[&str; N]> {
    let extra: Vec<&str> = args.iter().skip(3).map(String::as_str).collect();
    extra
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected {} arguments\n\n{}", N, USAGE))
}

fn parse_index(raw: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("{:?} is not a non-negative number", raw))
}

fn print_tree(text: &str) {
    let doc = Soundlist::parse(text);
    println!("{} sound definitions", doc.definitions.len());
    for (spl_id, definition) in doc.definitions.iter().enumerate() {
        println!(
            "  #{:<4} {}",
            spl_id + 1,
            resolve_title(&definition.attrs, spl_id + 1)
        );
    }

    if doc.categories_section.is_none() {
        println!("No <Categories> section");
        return;
    }
    println!("Categories:");
    for node in &doc.categories {
        print_category(node, 1);
    }

    let index = doc.hierarchy_index();
    println!("Placed sounds: {}/{}", index.len(), doc.definitions.len());
    for player_index in 1..=doc.definitions.len() {
        if let Some(HierarchyEntry { category_path, category_index, .. }) = index.get(player_index) {
            println!("  #{:<4} {} [{}]", player_index, category_path.join(" > "), category_index);
        }
    }
}

fn print_category(node: &CategoryNode, depth: usize) {
    let marker = if node.hidden { " (hidden)" } else { "" };
    let ids: Vec<String> = node
        .sounds
        .iter()
        .map(|s| s.id.map(|id| id.to_string()).unwrap_or_else(|| "?".into()))
        .collect();
    println!(
        "{}{}{} [{}]",
        "  ".repeat(depth),
        node.name,
        marker,
        ids.join(", ")
    );
    for child in &node.children {
        print_category(child, depth + 1);
    }
}
