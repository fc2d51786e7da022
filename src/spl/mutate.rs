//! Text transforms over the soundlist. Each one parses the text it is given,
//! describes its change as splices and hands them to `edit::apply`. No I/O.

use super::document::Soundlist;
use super::edit::{self, whole_line, Splice};
use super::scanner::{escape_attr, find_close_tag, line_indent, Tag};
use super::tree::{preorder, CategoryNode, Element};
use crate::error::{PlayerError, Result};

fn reference(spl_id: usize) -> String {
    format!(r#"<Sound id="{}"/>"#, spl_id)
}

fn definition<'d>(doc: &'d Soundlist, player_index: usize) -> Result<&'d Tag> {
    let count = doc.definitions.len();
    if player_index == 0 || player_index > count {
        return Err(PlayerError::IndexOutOfRange {
            index: player_index,
            count,
        });
    }
    Ok(&doc.definitions[player_index - 1])
}

/// Set `customTag` on the definition at `player_index` (1-based).
pub fn rename_sound(text: &str, player_index: usize, title: &str) -> Result<String> {
    let doc = Soundlist::parse(text);
    let tag = definition(&doc, player_index)?;
    let value = escape_attr(title);

    let splice = match tag.attrs.find("customTag") {
        Some(attr) => Splice::replace(attr.span.clone(), format!(r#"customTag="{}""#, value)),
        None => Splice::insert(tag.content_end(text), format!(r#" customTag="{}""#, value)),
    };
    edit::apply(text, vec![splice])
}

/// A sound file already sitting in its permanent location.
#[derive(Debug, Clone, Default)]
pub struct NewSound {
    pub url: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<String>,
    pub added_on: Option<String>,
}

impl NewSound {
    fn to_definition(&self) -> String {
        let mut out = format!(r#"<Sound url="{}""#, escape_attr(&self.url));
        let optional = [
            ("artist", &self.artist),
            ("title", &self.title),
            ("duration", &self.duration),
            ("addedOn", &self.added_on),
        ];
        for (name, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                out.push_str(&format!(r#" {}="{}""#, name, escape_attr(v)));
            }
        }
        out.push_str("/>");
        out
    }
}

#[derive(Debug, Clone)]
pub struct AddedSound {
    pub document: String,
    pub spl_id: usize,
}

impl AddedSound {
    pub fn player_index(&self) -> usize {
        self.spl_id + 1
    }
}

/// Append a definition and, when `category` is given, a reference to it in
/// the last visible category of that name.
pub fn add_sound(text: &str, sound: &NewSound, category: Option<&str>) -> Result<AddedSound> {
    let doc = Soundlist::parse(text);
    let spl_id = doc.definitions.len();
    let mut splices = vec![insert_definition(text, &doc, &sound.to_definition())];

    if let Some(name) = category {
        if doc.categories_section.is_none() {
            return Err(PlayerError::malformed("no <Categories> section to add into"));
        }
        let target = doc
            .find_category(name, true)
            .ok_or_else(|| PlayerError::not_found("Category", name))?;
        splices.push(append_reference(text, target, spl_id));
    }

    let document = edit::apply(text, splices)?;
    log::debug!("Added definition splId {} ({})", spl_id, sound.url);
    Ok(AddedSound { document, spl_id })
}

fn insert_definition(text: &str, doc: &Soundlist, definition: &str) -> Splice {
    let anchor = match &doc.categories_section {
        Some(section) => Some(section.span.start),
        None => find_close_tag(text, 0, text.len(), "Soundlist").map(|r| r.start),
    };
    let Some(anchor) = anchor else {
        return Splice::insert(text.len(), definition);
    };

    match line_indent(text, anchor) {
        Some(indent) => Splice::insert(anchor, format!("{}\n{}", definition, indent)),
        None => Splice::insert(anchor, definition),
    }
}

/// `<Category .../>` becomes `<Category ...><Sound id="N"/></Category>`.
fn expand_self_closing(text: &str, element: &Element, spl_id: usize) -> Splice {
    Splice::replace(
        element.tag.content_end(text)..element.span.end,
        format!(">{}</{}>", reference(spl_id), element.tag.name),
    )
}

/// Reference placed just before the category's closing tag.
fn append_reference(text: &str, category: &CategoryNode, spl_id: usize) -> Splice {
    let element = &category.element;
    if element.is_self_closing() {
        return expand_self_closing(text, element, spl_id);
    }

    let close = element.inner.end;
    match line_indent(text, close) {
        Some(indent) => {
            let child_indent = category
                .sounds
                .last()
                .and_then(|s| line_indent(text, s.element.span.start))
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}  ", indent));
            Splice::insert(
                close - indent.len(),
                format!("{}{}\n", child_indent, reference(spl_id)),
            )
        }
        None => Splice::insert(close, reference(spl_id)),
    }
}

/// Move the reference for `player_index` into `category` at `position`
/// among its direct references. References in hidden categories stay put.
pub fn move_sound(text: &str, player_index: usize, category: &str, position: usize) -> Result<String> {
    let doc = Soundlist::parse(text);
    if doc.categories_section.is_none() {
        return Err(PlayerError::malformed("no <Categories> section"));
    }
    definition(&doc, player_index)?;
    let spl_id = player_index - 1;

    let target = doc
        .find_category(category, true)
        .ok_or_else(|| PlayerError::not_found("Category", category))?;

    let mut splices: Vec<Splice> = preorder(&doc.categories, true)
        .into_iter()
        .flat_map(|c| c.sounds.iter())
        .filter(|s| s.id == Some(spl_id))
        .map(|s| Splice::remove(whole_line(text, s.element.span.clone())))
        .collect();
    if splices.is_empty() {
        log::warn!(
            "No reference to splId {} found while moving it to {:?}",
            spl_id,
            category
        );
    }

    let remaining: Vec<&Element> = target
        .sounds
        .iter()
        .filter(|s| s.id != Some(spl_id))
        .map(|s| &s.element)
        .collect();

    let insert = if target.element.is_self_closing() {
        expand_self_closing(text, &target.element, spl_id)
    } else if position == 0 || remaining.is_empty() {
        Splice::insert(target.element.tag.span.end, reference(spl_id))
    } else if let Some(anchor) = remaining.get(position) {
        let at = anchor.span.start;
        match line_indent(text, at) {
            Some(indent) => Splice::insert(at, format!("{}\n{}", reference(spl_id), indent)),
            None => Splice::insert(at, reference(spl_id)),
        }
    } else {
        // Past the end: after the last remaining direct reference
        let last = remaining[remaining.len() - 1];
        match line_indent(text, last.span.start) {
            Some(indent) => Splice::insert(last.span.end, format!("\n{}{}", indent, reference(spl_id))),
            None => Splice::insert(last.span.end, reference(spl_id)),
        }
    };
    splices.push(insert);

    edit::apply(text, splices)
}

/// Reorder visible top-level categories. `position` is clamped into range;
/// moving a category onto its own slot returns the text unchanged.
pub fn move_category(text: &str, name: &str, position: usize) -> Result<String> {
    let doc = Soundlist::parse(text);
    if doc.categories_section.is_none() {
        return Err(PlayerError::malformed("no <Categories> section"));
    }

    let slots = doc.visible_categories();
    let from = slots
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| PlayerError::not_found("Category", name))?;
    let to = position.min(slots.len() - 1);
    if from == to {
        return Ok(text.to_string());
    }

    let mut order = slots.clone();
    let moved = order.remove(from);
    order.insert(to, moved);

    // Every slot keeps its place in the text; only its content changes
    let splices = slots
        .iter()
        .zip(&order)
        .filter(|(slot, node)| slot.element.span != node.element.span)
        .map(|(slot, node)| Splice::replace(slot.element.span.clone(), &text[node.element.span.clone()]))
        .collect();

    edit::apply(text, splices)
}
