//! Collection registry and relation-field classification.
//!
//! Collections declare their dependencies explicitly; the seed order is the
//! topological order of that graph, so adding a collection means declaring
//! what it references rather than editing a hand-maintained sequence.

use std::fmt;

/// A named group of documents in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Media,
    Forms,
    Pages,
    Divisions,
    Chapters,
    Projects,
}

impl Collection {
    /// All known collections, in declaration order.
    pub const ALL: [Collection; 6] = [
        Collection::Media,
        Collection::Forms,
        Collection::Pages,
        Collection::Divisions,
        Collection::Chapters,
        Collection::Projects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Media => "media",
            Collection::Forms => "forms",
            Collection::Pages => "pages",
            Collection::Divisions => "divisions",
            Collection::Chapters => "chapters",
            Collection::Projects => "projects",
        }
    }

    pub fn parse(s: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == s)
    }

    /// Collections that must be seeded before this one so that its relation
    /// references can be resolved against the ID map.
    pub fn depends_on(&self) -> &'static [Collection] {
        match self {
            Collection::Media => &[],
            Collection::Forms => &[Collection::Media],
            Collection::Pages => &[Collection::Media],
            Collection::Divisions => &[Collection::Media],
            Collection::Chapters => &[Collection::Media],
            Collection::Projects => {
                &[Collection::Media, Collection::Chapters, Collection::Forms]
            }
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topological order of [`Collection::ALL`], stable with respect to
/// declaration order among collections whose dependencies are satisfied.
pub fn seed_order() -> Vec<Collection> {
    let mut order: Vec<Collection> = Vec::with_capacity(Collection::ALL.len());
    while order.len() < Collection::ALL.len() {
        let before = order.len();
        for c in Collection::ALL {
            if order.contains(&c) {
                continue;
            }
            if c.depends_on().iter().all(|d| order.contains(d)) {
                order.push(c);
            }
        }
        // The declared graph is a DAG; a full sweep always places something.
        debug_assert!(order.len() > before, "collection dependency cycle");
    }
    order
}

/// The relation-field groups the remapper recognizes. A numeric field whose
/// name falls in one of these groups is treated as a foreign reference into
/// the corresponding ID-map group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationGroup {
    Media,
    Chapters,
    Forms,
}

impl RelationGroup {
    /// Key of this group inside the persisted ID map.
    pub fn map_key(&self) -> &'static str {
        match self {
            RelationGroup::Media => "media",
            RelationGroup::Chapters => "chapters",
            RelationGroup::Forms => "forms",
        }
    }

    /// Classifies a document field name, if it names a known relation.
    pub fn of_field(key: &str) -> Option<RelationGroup> {
        const MEDIA_FIELDS: &[&str] = &[
            "image",
            "logo",
            "logoDark",
            "logoLight",
            "icon",
            "cover",
            "thumbnail",
            "photo",
            "banner",
            "heroImage",
            "backgroundImage",
            "media",
        ];
        const CHAPTER_FIELDS: &[&str] = &["chapter", "parentChapter"];
        const FORM_FIELDS: &[&str] = &["form", "contactForm"];

        if MEDIA_FIELDS.contains(&key) {
            Some(RelationGroup::Media)
        } else if CHAPTER_FIELDS.contains(&key) {
            Some(RelationGroup::Chapters)
        } else if FORM_FIELDS.contains(&key) {
            Some(RelationGroup::Forms)
        } else {
            None
        }
    }
}
