use crate::presentation::Presentation;
use crate::registry::MarkerRegistry;
use crate::types::Category;

pub fn readout_text(count: usize) -> String {
    format!("Visible Investors: {}", count)
}

/// Counts visible markers by rescanning the registry on every call.
///
/// There is no running total to patch, so the count cannot drift from the
/// flags no matter how toggles interleave. When disabled the count is still
/// returned but nothing is published.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityCounter {
    enabled: bool,
}

impl VisibilityCounter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn count<C: Category>(&self, registry: &MarkerRegistry<C>) -> usize {
        C::ALL
            .iter()
            .flat_map(|c| registry.entries_in(*c))
            .filter(|e| e.is_visible())
            .count()
    }

    pub fn recompute<C: Category>(
        &self,
        registry: &MarkerRegistry<C>,
        presentation: &mut dyn Presentation,
    ) -> usize {
        let count = self.count(registry);
        if self.enabled {
            presentation.count_published(&readout_text(count));
        }
        count
    }
}

impl Default for VisibilityCounter {
    fn default() -> Self {
        Self::new(true)
    }
}
