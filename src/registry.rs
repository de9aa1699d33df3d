use crate::jitter::JitterPositioner;
use crate::presentation::Presentation;
use crate::types::{Category, MarkerEntry, MarkerId, Record};
use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::BTreeMap;
use tracing::{debug, info};

// Wrapper for RTree indexing
struct MarkerPoint {
    id: MarkerId,
    xy: [f64; 2],
}

impl RTreeObject for MarkerPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xy)
    }
}

impl PointDistance for MarkerPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.xy[0] - point[0];
        let dy = self.xy[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Every rendered marker, partitioned by category.
///
/// The bucket map is total over `C::ALL`: a category with no records still
/// has an (empty) list.
pub struct MarkerRegistry<C: Category> {
    entries: Vec<MarkerEntry<C>>,
    by_category: BTreeMap<C, Vec<MarkerId>>,
    tree: RTree<MarkerPoint>,
}

impl<C: Category> MarkerRegistry<C> {
    pub fn build(records: Vec<Record<C>>, positioner: &mut JitterPositioner) -> Self {
        let mut by_category: BTreeMap<C, Vec<MarkerId>> =
            C::ALL.iter().map(|c| (*c, Vec::new())).collect();
        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for record in records {
            let Some(position) = positioner.position_for(&record) else {
                debug!("Skipping {:?}: no usable coordinate", record.name);
                skipped += 1;
                continue;
            };
            if record.category.is_unclassified() {
                debug!("{:?} has no known {}, using fallback bucket", record.name, C::FIELD);
            }

            let id = MarkerId(entries.len());
            by_category.entry(record.category).or_default().push(id);
            entries.push(MarkerEntry {
                id,
                record,
                position,
                visible: true,
            });
        }

        let tree = RTree::bulk_load(
            entries
                .iter()
                .map(|e| MarkerPoint {
                    id: e.id,
                    xy: [e.position.x(), e.position.y()],
                })
                .collect(),
        );

        info!(
            "Built {} {} markers ({} records without coordinates skipped)",
            entries.len(),
            C::SCHEME,
            skipped
        );

        Self {
            entries,
            by_category,
            tree,
        }
    }

    /// Categories that received at least one marker, in enumeration order.
    pub fn categories(&self) -> Vec<C> {
        self.by_category
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn entries_in(&self, category: C) -> impl Iterator<Item = &MarkerEntry<C>> + '_ {
        self.ids_in(category).iter().map(move |id| &self.entries[id.0])
    }

    pub fn ids_in(&self, category: C) -> &[MarkerId] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerEntry<C>> {
        self.entries.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerEntry<C>> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets one marker's flag. Returns whether it changed; the presentation
    /// only hears about real changes.
    pub fn set_visible(
        &mut self,
        id: MarkerId,
        visible: bool,
        presentation: &mut dyn Presentation,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(id.0) else {
            return false;
        };
        if entry.visible == visible {
            return false;
        }
        entry.visible = visible;
        presentation.marker_visibility_changed(id, visible);
        true
    }

    /// Closest visible marker to `point` (lon/lat), for popups.
    pub fn nearest_visible(&self, point: Point<f64>) -> Option<&MarkerEntry<C>> {
        self.tree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .map(|p| &self.entries[p.id.0])
            .find(|e| e.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::testing::Recorder;
    use crate::types::{Cluster, Coordinate, Tier};

    fn record<C>(name: &str, category: C, coordinate: Option<(f64, f64)>) -> Record<C> {
        Record {
            name: name.to_string(),
            coordinate: coordinate.map(|(lat, lon)| Coordinate { lat, lon }),
            category,
            attributes: serde_json::Map::new(),
        }
    }

    fn seeded() -> JitterPositioner {
        JitterPositioner::new(0.0003, Some(5))
    }

    #[test]
    fn partition_is_total_and_skips_unpositionable() {
        let records = vec![
            record("a", Tier::Large, Some((44.0, -79.0))),
            record("b", Tier::Large, None),
            record("c", Tier::Micro, Some((44.1, -79.1))),
            record("d", Tier::Unclassified, Some((44.2, -79.2))),
            record("e", Tier::Micro, Some((44.3, -79.3))),
        ];
        let registry = MarkerRegistry::build(records, &mut seeded());

        assert_eq!(registry.len(), 4);
        let total: usize = Tier::ALL.iter().map(|t| registry.entries_in(*t).count()).sum();
        assert_eq!(total, 4);
        assert_eq!(registry.entries_in(Tier::Strategic).count(), 0);
        assert_eq!(
            registry.categories(),
            vec![Tier::Large, Tier::Micro, Tier::Unclassified]
        );
        assert!(registry.iter().all(|e| e.record.name != "b"));
    }

    #[test]
    fn entries_keep_input_order() {
        let records = vec![
            record("first", Cluster::Potential, Some((43.0, -79.0))),
            record("other", Cluster::DoNotContact, Some((43.0, -79.0))),
            record("second", Cluster::Potential, Some((43.0, -79.0))),
        ];
        let registry = MarkerRegistry::build(records, &mut seeded());
        let names: Vec<_> = registry
            .entries_in(Cluster::Potential)
            .map(|e| e.record.name.as_str())
            .collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn all_markers_start_visible() {
        let records = vec![
            record("a", Tier::Small, Some((44.0, -79.0))),
            record("b", Tier::Medium, Some((44.0, -79.0))),
        ];
        let registry = MarkerRegistry::build(records, &mut seeded());
        assert!(registry.iter().all(|e| e.is_visible()));
    }

    #[test]
    fn set_visible_is_idempotent() {
        let records = vec![record("a", Tier::Small, Some((44.0, -79.0)))];
        let mut registry = MarkerRegistry::build(records, &mut seeded());
        let mut recorder = Recorder::default();

        assert!(!registry.set_visible(MarkerId(0), true, &mut recorder));
        assert!(registry.set_visible(MarkerId(0), false, &mut recorder));
        assert!(!registry.set_visible(MarkerId(0), false, &mut recorder));
        assert_eq!(recorder.marker_events(), 1);
        assert!(!registry.get(MarkerId(0)).unwrap().is_visible());

        assert!(!registry.set_visible(MarkerId(9), false, &mut recorder));
    }

    #[test]
    fn nearest_skips_hidden_markers() {
        let records = vec![
            record("near", Tier::Small, Some((44.0, -79.0))),
            record("far", Tier::Large, Some((45.0, -80.0))),
        ];
        let mut registry = MarkerRegistry::build(records, &mut JitterPositioner::new(0.0, None));
        let click = Point::new(-79.01, 44.01);

        assert_eq!(registry.nearest_visible(click).unwrap().record.name, "near");
        registry.set_visible(MarkerId(0), false, &mut Recorder::default());
        assert_eq!(registry.nearest_visible(click).unwrap().record.name, "far");
        registry.set_visible(MarkerId(1), false, &mut Recorder::default());
        assert!(registry.nearest_visible(click).is_none());
    }

    #[test]
    fn empty_registry_has_every_bucket() {
        let registry = MarkerRegistry::<Cluster>::build(Vec::new(), &mut seeded());
        assert!(registry.is_empty());
        assert!(registry.categories().is_empty());
        for c in Cluster::ALL {
            assert_eq!(registry.entries_in(*c).count(), 0);
        }
    }
}
