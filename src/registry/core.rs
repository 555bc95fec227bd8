use std::collections::{HashMap, HashSet};

use blake3::Hash;

use crate::error::{Result, ZoneError};

use super::zone::{ZoneDefinition, ZoneDraft, ZoneEdit, ZoneId, clamp_opacity};

#[derive(Debug, Clone)]
struct ZoneEntry {
    definition: ZoneDefinition,
    predicate_hash: Hash,
}

impl ZoneEntry {
    fn new(id: ZoneId, draft: ZoneDraft) -> Self {
        let predicate_hash = blake3::hash(draft.predicate_text.as_bytes());
        Self {
            definition: ZoneDefinition {
                id,
                name: draft.name,
                zone_type: draft.zone_type,
                color: draft.color.unwrap_or(draft.zone_type.default_color()),
                predicate_text: draft.predicate_text,
                fill_opacity: clamp_opacity(draft.fill_opacity),
                version: 1,
                revision: 1,
            },
            predicate_hash,
        }
    }

    fn update_predicate(&mut self, text: String) -> bool {
        let new_hash = blake3::hash(text.as_bytes());
        if new_hash == self.predicate_hash {
            return false;
        }
        self.definition.predicate_text = text;
        self.predicate_hash = new_hash;
        self.definition.version += 1;
        true
    }
}

/// What an applied edit touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub geometry_changed: bool,
    pub style_changed: bool,
}

impl EditOutcome {
    pub fn changed(&self) -> bool {
        self.geometry_changed || self.style_changed
    }
}

/// Ordered, id-unique collection of zone definitions.
///
/// The registry only mutates data. It tracks which zones had their geometry
/// touched since the last `take_dirty`, but never recomputes anything itself.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    order: Vec<ZoneId>,
    entries: HashMap<ZoneId, ZoneEntry>,
    dirty: HashSet<ZoneId>,
    next_seq: u64,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from drafts, failing on the first duplicate id.
    ///
    /// Explicit ids are reserved up front, so a generated `zone-N` never
    /// collides with an id that appears later in the same batch.
    pub fn from_drafts(drafts: impl IntoIterator<Item = ZoneDraft>) -> Result<Self> {
        let drafts: Vec<ZoneDraft> = drafts.into_iter().collect();
        let reserved: HashSet<ZoneId> = drafts.iter().filter_map(|d| d.id.clone()).collect();
        let mut registry = Self::new();
        for mut draft in drafts {
            if draft.id.is_none() {
                draft.id = Some(registry.next_id_avoiding(&reserved));
            }
            registry.add(draft)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, mut draft: ZoneDraft) -> Result<&ZoneDefinition> {
        let id = match draft.id.take() {
            Some(id) => {
                if self.entries.contains_key(&id) {
                    return Err(ZoneError::DuplicateZone(id));
                }
                id
            }
            None => self.next_id(),
        };
        self.order.push(id.clone());
        self.dirty.insert(id.clone());
        let entry = self
            .entries
            .entry(id.clone())
            .or_insert_with(|| ZoneEntry::new(id, draft));
        Ok(&entry.definition)
    }

    pub fn edit(&mut self, zone_id: &str, edit: ZoneEdit) -> Result<EditOutcome> {
        let entry = self
            .entries
            .get_mut(zone_id)
            .ok_or_else(|| ZoneError::NotFound(zone_id.to_string()))?;

        let mut outcome = EditOutcome::default();
        if let Some(text) = edit.predicate_text {
            outcome.geometry_changed = entry.update_predicate(text);
        }

        let def = &mut entry.definition;
        if let Some(name) = edit.name {
            if def.name != name {
                def.name = name;
                outcome.style_changed = true;
            }
        }
        if let Some(zone_type) = edit.zone_type {
            if def.zone_type != zone_type {
                if edit.color.is_none() && def.color == def.zone_type.default_color() {
                    def.color = zone_type.default_color();
                }
                def.zone_type = zone_type;
                outcome.style_changed = true;
            }
        }
        if let Some(color) = edit.color {
            if def.color != color {
                def.color = color;
                outcome.style_changed = true;
            }
        }
        if let Some(opacity) = edit.fill_opacity {
            let opacity = clamp_opacity(opacity);
            if def.fill_opacity != opacity {
                def.fill_opacity = opacity;
                outcome.style_changed = true;
            }
        }

        if outcome.changed() {
            def.revision += 1;
        }
        if outcome.geometry_changed {
            self.dirty.insert(zone_id.to_string());
        }
        Ok(outcome)
    }

    pub fn remove(&mut self, zone_id: &str) -> Result<ZoneDefinition> {
        let entry = self
            .entries
            .remove(zone_id)
            .ok_or_else(|| ZoneError::NotFound(zone_id.to_string()))?;
        self.order.retain(|id| id != zone_id);
        self.dirty.remove(zone_id);
        Ok(entry.definition)
    }

    /// Swap in a whole new zone set. On error the current contents are kept.
    pub fn replace_all(&mut self, drafts: impl IntoIterator<Item = ZoneDraft>) -> Result<()> {
        let mut fresh = Self::from_drafts(drafts)?;
        fresh.next_seq = fresh.next_seq.max(self.next_seq);
        *self = fresh;
        Ok(())
    }

    pub fn get(&self, zone_id: &str) -> Option<&ZoneDefinition> {
        self.entries.get(zone_id).map(|entry| &entry.definition)
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.entries.contains_key(zone_id)
    }

    /// Definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneDefinition> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.definition))
    }

    pub fn ids(&self) -> &[ZoneId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current geometry version of a zone.
    pub fn version_of(&self, zone_id: &str) -> Option<u64> {
        self.get(zone_id).map(|def| def.version)
    }

    /// Fresh `zone-N` id not used in this registry.
    pub fn next_id(&mut self) -> ZoneId {
        self.next_id_avoiding(&HashSet::new())
    }

    fn next_id_avoiding(&mut self, reserved: &HashSet<ZoneId>) -> ZoneId {
        loop {
            self.next_seq += 1;
            let candidate = format!("zone-{}", self.next_seq);
            if !self.entries.contains_key(&candidate) && !reserved.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Zones whose geometry changed since the last call, in registry order.
    pub fn take_dirty(&mut self) -> Vec<ZoneId> {
        let dirty = std::mem::take(&mut self.dirty);
        self.order
            .iter()
            .filter(|id| dirty.contains(*id))
            .cloned()
            .collect()
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Color, ZoneType};

    fn registry() -> ZoneRegistry {
        ZoneRegistry::from_drafts([
            ZoneDraft::new("Red parking", "x >= 30 && y <= -24.7")
                .with_id("red-parking")
                .with_type(ZoneType::Parking),
            ZoneDraft::new("Loading", "y <= -47 && x >= 47").with_id("loading"),
        ])
        .unwrap()
    }

    #[test]
    fn add_assigns_defaults_and_flags_new_zones_dirty() {
        let mut registry = registry();
        let def = registry.get("red-parking").unwrap();
        assert_eq!(def.color, ZoneType::Parking.default_color());
        assert_eq!(def.version, 1);
        assert_eq!(def.fill_opacity, 0.3);
        assert_eq!(registry.take_dirty(), vec!["red-parking", "loading"]);
        assert!(!registry.has_dirty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = registry();
        let err = registry
            .add(ZoneDraft::new("Again", "x > 0").with_id("loading"))
            .unwrap_err();
        assert!(matches!(err, ZoneError::DuplicateZone(ref id) if id == "loading"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn generated_ids_skip_taken_ones() {
        let mut registry = ZoneRegistry::new();
        registry
            .add(ZoneDraft::new("Taken", "x > 0").with_id("zone-1"))
            .unwrap();
        let id = registry.add(ZoneDraft::new("Next", "x < 0")).unwrap().id.clone();
        assert_eq!(id, "zone-2");
    }

    #[test]
    fn generated_ids_skip_explicit_ids_later_in_the_batch() {
        let mut registry = registry();
        registry
            .replace_all([
                ZoneDraft::new("Unnamed", "x > 0"),
                ZoneDraft::new("Pinned", "y > 0").with_id("zone-1"),
            ])
            .unwrap();
        assert_eq!(registry.ids(), ["zone-2".to_string(), "zone-1".to_string()]);
        assert_eq!(registry.get("zone-1").unwrap().name, "Pinned");
        assert_eq!(registry.get("zone-2").unwrap().name, "Unnamed");
    }

    #[test]
    fn predicate_edit_bumps_version_and_marks_dirty() {
        let mut registry = registry();
        registry.take_dirty();

        let outcome = registry
            .edit("loading", ZoneEdit::predicate("y >= 47 && x >= 47"))
            .unwrap();
        assert!(outcome.geometry_changed);
        let def = registry.get("loading").unwrap();
        assert_eq!(def.version, 2);
        assert_eq!(def.revision, 2);
        assert_eq!(registry.take_dirty(), vec!["loading"]);

        // identical text hashes the same and changes nothing
        let outcome = registry
            .edit("loading", ZoneEdit::predicate("y >= 47 && x >= 47"))
            .unwrap();
        assert!(!outcome.changed());
        assert_eq!(registry.get("loading").unwrap().revision, 2);
        assert!(registry.take_dirty().is_empty());
    }

    #[test]
    fn style_edit_keeps_geometry_version() {
        let mut registry = registry();
        registry.take_dirty();
        let outcome = registry
            .edit(
                "red-parking",
                ZoneEdit::style(Some(Color::rgb(1, 2, 3)), Some(0.8)),
            )
            .unwrap();
        assert!(outcome.style_changed && !outcome.geometry_changed);
        let def = registry.get("red-parking").unwrap();
        assert_eq!(def.version, 1);
        assert_eq!(def.revision, 2);
        assert_eq!(def.color, Color::rgb(1, 2, 3));
        assert!(!registry.has_dirty());
    }

    #[test]
    fn type_change_recolors_only_default_colored_zones() {
        let mut registry = registry();
        registry
            .edit(
                "red-parking",
                ZoneEdit {
                    zone_type: Some(ZoneType::RedAlliance),
                    ..ZoneEdit::default()
                },
            )
            .unwrap();
        assert_eq!(
            registry.get("red-parking").unwrap().color,
            ZoneType::RedAlliance.default_color()
        );

        registry
            .edit("loading", ZoneEdit::style(Some(Color::rgb(9, 9, 9)), None))
            .unwrap();
        registry
            .edit(
                "loading",
                ZoneEdit {
                    zone_type: Some(ZoneType::Loading),
                    ..ZoneEdit::default()
                },
            )
            .unwrap();
        assert_eq!(registry.get("loading").unwrap().color, Color::rgb(9, 9, 9));
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let mut registry = registry();
        assert!(matches!(
            registry.edit("nope", ZoneEdit::predicate("x > 0")),
            Err(ZoneError::NotFound(_))
        ));
        assert!(matches!(registry.remove("nope"), Err(ZoneError::NotFound(_))));
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut registry = registry();
        registry
            .add(ZoneDraft::new("Third", "x > 0").with_id("third"))
            .unwrap();
        registry.remove("loading").unwrap();
        let names: Vec<_> = registry.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(names, vec!["red-parking", "third"]);
    }

    #[test]
    fn replace_all_is_atomic_on_error() {
        let mut registry = registry();
        let err = registry.replace_all([
            ZoneDraft::new("A", "x > 0").with_id("dup"),
            ZoneDraft::new("B", "x < 0").with_id("dup"),
        ]);
        assert!(err.is_err());
        assert_eq!(registry.len(), 2);

        registry
            .replace_all([ZoneDraft::new("Only", "x > 0").with_id("only")])
            .unwrap();
        assert_eq!(registry.ids(), ["only".to_string()]);
        assert!(registry.get("loading").is_none());
    }
}
