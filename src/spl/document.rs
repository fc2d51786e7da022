use super::scanner::{scan_tags, Attributes, Tag};
use super::tree::{category_tree, find_element, preorder, top_level_elements, CategoryNode, Element};
use crate::models::{CategoryInfo, HierarchyEntry, Sound};
use std::collections::{HashMap, HashSet};

/// Parsed view over one read of the soundlist. Borrowed from the text and
/// dropped after the request that read it.
#[derive(Debug)]
pub struct Soundlist<'a> {
    text: &'a str,
    /// Every `<Sound>` bearing a `url`, in document order. Position is the splId.
    pub definitions: Vec<Tag>,
    pub categories_section: Option<Element>,
    /// Top-level categories inside the categories section
    pub categories: Vec<CategoryNode>,
}

impl<'a> Soundlist<'a> {
    pub fn parse(text: &'a str) -> Self {
        let definitions = scan_tags(text, 0..text.len(), "Sound")
            .into_iter()
            .filter(|tag| tag.attrs.find("url").is_some())
            .collect();

        let categories_section = find_element(text, 0..text.len(), "Categories");
        let categories = categories_section
            .as_ref()
            .map(|section| category_tree(text, section.inner.clone()))
            .unwrap_or_default();

        Self {
            text,
            definitions,
            categories_section,
            categories,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Named, non-hidden top-level categories: the reorderable ones.
    pub fn visible_categories(&self) -> Vec<&CategoryNode> {
        self.categories.iter().filter(|c| c.is_visible()).collect()
    }

    /// The last category called `name` in document order. Sub-categories
    /// may share a name with an ancestor; the last one is the most specific.
    pub fn find_category(&self, name: &str, skip_hidden: bool) -> Option<&CategoryNode> {
        preorder(&self.categories, skip_hidden)
            .into_iter()
            .rev()
            .find(|c| c.name == name)
    }

    pub fn hierarchy_index(&self) -> HierarchyIndex {
        let mut entries = HashMap::new();
        let count = self.definitions.len();
        for root in &self.categories {
            index_category(root, &mut Vec::new(), count, &mut entries);
        }

        let urls = self
            .definitions
            .iter()
            .map(|d| d.attrs.get("url").unwrap_or_default().to_string())
            .collect();

        HierarchyIndex { entries, urls }
    }

    /// Visible category tree for listing.
    pub fn category_infos(&self) -> Vec<CategoryInfo> {
        fn info(node: &CategoryNode) -> CategoryInfo {
            CategoryInfo {
                name: node.name.clone(),
                icon: node.icon(),
                sound_ids: node.sounds.iter().filter_map(|s| s.id).collect(),
                children: node
                    .children
                    .iter()
                    .filter(|c| !c.hidden)
                    .map(info)
                    .collect(),
            }
        }
        self.visible_categories().into_iter().map(info).collect()
    }
}

fn index_category(
    node: &CategoryNode,
    path: &mut Vec<String>,
    definition_count: usize,
    entries: &mut HashMap<usize, HierarchyEntry>,
) {
    if node.hidden {
        return;
    }
    path.push(node.name.clone());

    let parent = path.len().checked_sub(2).map(|i| path[i].clone());
    for (position, sound) in node.sounds.iter().enumerate() {
        let Some(spl_id) = sound.id else { continue };
        if spl_id >= definition_count {
            log::debug!("Category {:?} references unknown splId {}", node.name, spl_id);
            continue;
        }
        entries.entry(spl_id + 1).or_insert_with(|| HierarchyEntry {
            category: node.name.clone(),
            parent_category: parent.clone(),
            category_index: position,
            category_path: path.clone(),
        });
    }

    for child in &node.children {
        index_category(child, path, definition_count, entries);
    }
    path.pop();
}

/// Player index (1-based) → placement in the on-disk category tree.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    entries: HashMap<usize, HierarchyEntry>,
    /// Definition urls by splId
    urls: Vec<String>,
}

impl HierarchyIndex {
    pub fn get(&self, player_index: usize) -> Option<&HierarchyEntry> {
        self.entries.get(&player_index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// splId for a live sound. `playerIndex - 1` is checked against the
    /// definition's url and replaced by a url lookup when they disagree.
    pub fn resolve_spl_id(&self, sound: &Sound) -> Option<usize> {
        let expected = sound.player_index.checked_sub(1)?;
        if sound.url.is_empty() {
            return (expected < self.urls.len()).then_some(expected);
        }
        if self.urls.get(expected).is_some_and(|u| same_path(u, &sound.url)) {
            return Some(expected);
        }
        match self.urls.iter().position(|u| same_path(u, &sound.url)) {
            Some(found) => {
                log::warn!(
                    "Sound {} ({}) sits at splId {} on disk, not {}",
                    sound.player_index,
                    sound.url,
                    found,
                    expected
                );
                Some(found)
            }
            None => (expected < self.urls.len()).then_some(expected),
        }
    }

    /// Overlay hierarchy fields onto the live list. Sounds without a mapping
    /// keep their live-derived category.
    pub fn enrich(&self, sounds: &mut [Sound]) {
        for sound in sounds.iter_mut() {
            let Some(spl_id) = self.resolve_spl_id(sound) else { continue };
            sound.spl_id = Some(spl_id);
            if let Some(entry) = self.entries.get(&(spl_id + 1)) {
                sound.category = Some(entry.category.clone());
                sound.parent_category = entry.parent_category.clone();
                sound.category_index = Some(entry.category_index);
                sound.category_path = entry.category_path.clone();
            }
        }
    }
}

fn same_path(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.trim().replace('/', "\\").to_lowercase();
    norm(a) == norm(b)
}

/// Hierarchy index of a soundlist text.
pub fn build_hierarchy_index(text: &str) -> HierarchyIndex {
    Soundlist::parse(text).hierarchy_index()
}

/// Parse the live list returned over the control channel. Category nesting,
/// when present, is walked recursively; otherwise every sound is scraped flat
/// and its category guessed from the containing folder.
pub fn parse_flat_list(response: &str) -> Vec<Sound> {
    let mut sounds = Vec::new();
    let mut seen = HashSet::new();

    let roots = category_tree(response, 0..response.len());
    for root in &roots {
        collect_live(response, root, &mut Vec::new(), &mut sounds, &mut seen);
    }

    // Anything not placed by a category, or the whole list when there are none
    for (position, tag) in scan_tags(response, 0..response.len(), "Sound")
        .iter()
        .enumerate()
    {
        let player_index = live_index(&tag.attrs).unwrap_or(position + 1);
        if !seen.insert(player_index) {
            continue;
        }
        let mut sound = sound_from_attrs(&tag.attrs, player_index);
        sound.category = folder_category(&sound.url);
        sound.category_path = sound.category.iter().cloned().collect();
        sounds.push(sound);
    }

    sounds.sort_by_key(|s| s.player_index);
    sounds
}

fn collect_live(
    text: &str,
    node: &CategoryNode,
    path: &mut Vec<String>,
    sounds: &mut Vec<Sound>,
    seen: &mut HashSet<usize>,
) {
    if node.hidden {
        return;
    }
    path.push(node.name.clone());
    let image = node.icon();

    // Live references carry the full attribute set, not just an id
    let direct: Vec<Element> = top_level_elements(text, node.element.inner.clone(), "Sound")
        .into_iter()
        .filter(|s| {
            !node
                .children
                .iter()
                .any(|c| c.element.span.start <= s.span.start && s.span.end <= c.element.span.end)
        })
        .collect();

    for (position, element) in direct.iter().enumerate() {
        let Some(player_index) = live_index(&element.tag.attrs) else { continue };
        if !seen.insert(player_index) {
            continue;
        }
        let mut sound = sound_from_attrs(&element.tag.attrs, player_index);
        sound.category = Some(node.name.clone());
        sound.parent_category = path.len().checked_sub(2).map(|i| path[i].clone());
        sound.category_path = path.clone();
        sound.category_index = Some(position);
        sound.category_image = image.clone();
        sounds.push(sound);
    }

    for child in &node.children {
        collect_live(text, child, path, sounds, seen);
    }
    path.pop();
}

fn live_index(attrs: &Attributes) -> Option<usize> {
    attrs
        .non_empty("index")
        .and_then(|v| v.parse().ok())
        .or_else(|| {
            attrs
                .non_empty("id")
                .and_then(|v| v.parse::<usize>().ok())
                .map(|id| id + 1)
        })
}

fn sound_from_attrs(attrs: &Attributes, player_index: usize) -> Sound {
    Sound {
        player_index,
        spl_id: None,
        title: resolve_title(attrs, player_index),
        url: attrs.get("url").unwrap_or_default().to_string(),
        artist: attrs.non_empty("artist").map(str::to_string),
        duration: attrs.non_empty("duration").map(str::to_string),
        added_on: attrs.non_empty("addedOn").map(str::to_string),
        last_played_on: attrs.non_empty("lastPlayedOn").map(str::to_string),
        play_count: attrs
            .non_empty("playCount")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        ..Default::default()
    }
}

/// customTag, then title, then name, then a placeholder.
pub fn resolve_title(attrs: &Attributes, player_index: usize) -> String {
    ["customTag", "title", "name"]
        .iter()
        .find_map(|key| attrs.non_empty(key))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Sound {}", player_index))
}

/// Containing folder of a sound file, skipping drive roots like `C:`.
pub fn folder_category(url: &str) -> Option<String> {
    let mut segments: Vec<&str> = url.split(['/', '\\']).collect();
    segments.pop(); // file name
    segments
        .into_iter()
        .rev()
        .map(str::trim)
        .find(|s| !s.is_empty() && !is_drive_root(s))
        .map(str::to_string)
}

fn is_drive_root(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Convenience for callers that want both halves at once.
pub fn enrich_live_list(live_response: &str, document: Option<&str>) -> Vec<Sound> {
    let mut sounds = parse_flat_list(live_response);
    if let Some(text) = document {
        build_hierarchy_index(text).enrich(&mut sounds);
    }
    sounds
}
