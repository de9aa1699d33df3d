use crate::counter::VisibilityCounter;
use crate::presentation::Presentation;
use crate::registry::MarkerRegistry;
use crate::types::Category;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    Shown,
    Hidden,
}

impl ToggleState {
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            ToggleState::Shown
        } else {
            ToggleState::Hidden
        }
    }
}

/// The show/hide switch for one category.
#[derive(Debug, Clone)]
pub struct CategoryToggleController<C> {
    category: C,
    state: ToggleState,
}

impl<C: Category> CategoryToggleController<C> {
    fn new(category: C) -> Self {
        Self {
            category,
            state: ToggleState::Shown,
        }
    }

    pub fn category(&self) -> C {
        self.category
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Applies `checked` to every marker of the category, then recounts.
    pub fn on_toggle(
        &mut self,
        checked: bool,
        registry: &mut MarkerRegistry<C>,
        counter: &VisibilityCounter,
        presentation: &mut dyn Presentation,
    ) -> usize {
        self.state = ToggleState::from_checked(checked);
        let mut changed = 0usize;
        for id in registry.ids_in(self.category).to_vec() {
            if registry.set_visible(id, checked, &mut *presentation) {
                changed += 1;
            }
        }
        debug!(
            "{} {:?} -> {:?} ({} markers changed)",
            C::SCHEME,
            self.category,
            self.state,
            changed
        );
        counter.recompute(registry, presentation)
    }
}

/// One controller per category of the scheme, including the fallback bucket.
#[derive(Debug, Clone)]
pub struct ToggleBoard<C: Category> {
    controllers: BTreeMap<C, CategoryToggleController<C>>,
}

impl<C: Category> ToggleBoard<C> {
    /// Starts every toggle checked and forces every marker visible to match.
    pub fn new(registry: &mut MarkerRegistry<C>, presentation: &mut dyn Presentation) -> Self {
        let controllers = C::ALL
            .iter()
            .map(|c| (*c, CategoryToggleController::new(*c)))
            .collect();
        for category in C::ALL {
            for id in registry.ids_in(*category).to_vec() {
                registry.set_visible(id, true, &mut *presentation);
            }
        }
        Self { controllers }
    }

    pub fn controller_mut(&mut self, category: C) -> Option<&mut CategoryToggleController<C>> {
        self.controllers.get_mut(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryToggleController<C>> + '_ {
        self.controllers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::JitterPositioner;
    use crate::presentation::testing::Recorder;
    use crate::types::{Cluster, Coordinate, MarkerId, Record};

    fn registry(categories: &[Cluster]) -> MarkerRegistry<Cluster> {
        let records = categories
            .iter()
            .enumerate()
            .map(|(i, c)| Record {
                name: format!("inv{}", i),
                coordinate: Some(Coordinate { lat: 44.0 + i as f64 * 0.01, lon: -79.5 }),
                category: *c,
                attributes: serde_json::Map::new(),
            })
            .collect();
        MarkerRegistry::build(records, &mut JitterPositioner::new(0.0003, Some(11)))
    }

    fn state_of(board: &ToggleBoard<Cluster>, category: Cluster) -> Option<ToggleState> {
        board
            .iter()
            .find(|c| c.category() == category)
            .map(|c| c.state())
    }

    fn flags(registry: &MarkerRegistry<Cluster>) -> Vec<bool> {
        registry.iter().map(|e| e.is_visible()).collect()
    }

    #[test]
    fn board_starts_shown_and_forces_visibility() {
        let mut registry = registry(&[Cluster::Potential, Cluster::Potential]);
        let mut recorder = Recorder::default();
        registry.set_visible(MarkerId(1), false, &mut recorder);

        let board = ToggleBoard::new(&mut registry, &mut recorder);

        assert!(Cluster::ALL
            .iter()
            .all(|c| state_of(&board, *c) == Some(ToggleState::Shown)));
        assert!(registry.iter().all(|e| e.is_visible()));
    }

    #[test]
    fn toggle_flips_only_its_category() {
        let mut registry = registry(&[Cluster::TopPriority, Cluster::DoNotContact, Cluster::TopPriority]);
        let mut recorder = Recorder::default();
        let counter = VisibilityCounter::default();
        let mut board = ToggleBoard::new(&mut registry, &mut recorder);

        let count = board
            .controller_mut(Cluster::TopPriority)
            .unwrap()
            .on_toggle(false, &mut registry, &counter, &mut recorder);

        assert_eq!(count, 1);
        assert_eq!(state_of(&board, Cluster::TopPriority), Some(ToggleState::Hidden));
        assert!(registry.entries_in(Cluster::DoNotContact).all(|e| e.is_visible()));
        assert!(registry.entries_in(Cluster::TopPriority).all(|e| !e.is_visible()));
    }

    #[test]
    fn repeated_toggle_has_no_duplicate_side_effects() {
        let mut registry = registry(&[Cluster::LowPotential, Cluster::LowPotential]);
        let mut recorder = Recorder::default();
        let counter = VisibilityCounter::default();
        let mut board = ToggleBoard::new(&mut registry, &mut recorder);
        let controller = board.controller_mut(Cluster::LowPotential).unwrap();

        controller.on_toggle(false, &mut registry, &counter, &mut recorder);
        controller.on_toggle(false, &mut registry, &counter, &mut recorder);

        assert_eq!(recorder.marker_events(), 2);
        assert_eq!(recorder.last_count(), Some("Visible Investors: 0"));
    }

    #[test]
    fn empty_category_toggle_still_recounts() {
        let mut registry = registry(&[Cluster::Potential]);
        let mut recorder = Recorder::default();
        let counter = VisibilityCounter::default();
        let mut board = ToggleBoard::new(&mut registry, &mut recorder);

        let count = board
            .controller_mut(Cluster::PendingContact)
            .unwrap()
            .on_toggle(false, &mut registry, &counter, &mut recorder);

        assert_eq!(count, 1);
        assert_eq!(recorder.last_count(), Some("Visible Investors: 1"));
        assert_eq!(recorder.marker_events(), 0);
    }

    #[test]
    fn final_state_does_not_depend_on_toggle_order() {
        let layout = [
            Cluster::TopPriority,
            Cluster::Potential,
            Cluster::DoNotContact,
            Cluster::TopPriority,
            Cluster::Unclassified,
            Cluster::LowPotential,
            Cluster::Potential,
            Cluster::DoNotContact,
        ];
        let ops = [
            (Cluster::TopPriority, false),
            (Cluster::Potential, false),
            (Cluster::DoNotContact, true),
            (Cluster::LowPotential, false),
            (Cluster::Unclassified, false),
            (Cluster::PendingContact, false),
        ];
        let counter = VisibilityCounter::default();

        let run = |order: &[(Cluster, bool)]| {
            let mut registry = registry(&layout);
            let mut recorder = Recorder::default();
            let mut board = ToggleBoard::new(&mut registry, &mut recorder);
            let mut count = 0;
            for &(category, checked) in order {
                count = board
                    .controller_mut(category)
                    .unwrap()
                    .on_toggle(checked, &mut registry, &counter, &mut recorder);
            }
            (flags(&registry), count)
        };

        let forward = run(&ops);
        let reversed: Vec<_> = ops.iter().rev().copied().collect();
        let backward = run(&reversed);
        let shuffled = [ops[3], ops[0], ops[5], ops[2], ops[4], ops[1]];

        assert_eq!(forward, backward);
        assert_eq!(forward, run(&shuffled));
        assert_eq!(forward.1, 2);
        assert_eq!(forward.0, [false, false, true, false, false, false, false, true]);
    }

    #[test]
    fn marker_order_within_a_category_does_not_matter() {
        let layout = [Cluster::Potential, Cluster::DoNotContact, Cluster::Potential, Cluster::Potential];
        let counter = VisibilityCounter::default();

        let mut toggled = registry(&layout);
        let mut recorder = Recorder::default();
        let mut board = ToggleBoard::new(&mut toggled, &mut recorder);
        let count = board
            .controller_mut(Cluster::Potential)
            .unwrap()
            .on_toggle(false, &mut toggled, &counter, &mut recorder);

        let mut by_hand = registry(&layout);
        let ids: Vec<_> = by_hand.ids_in(Cluster::Potential).iter().rev().copied().collect();
        for id in ids {
            by_hand.set_visible(id, false, &mut recorder);
        }

        assert_eq!(flags(&toggled), flags(&by_hand));
        assert_eq!(count, counter.count(&by_hand));
    }
}
