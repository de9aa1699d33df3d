use crate::counter::VisibilityCounter;
use crate::data::load_records;
use crate::jitter::JitterPositioner;
use crate::presentation::{CountReadout, Presentation};
use crate::registry::MarkerRegistry;
use crate::toggle::{ToggleBoard, ToggleState};
use crate::types::{Category, MarkerEntry, MarkerId, Record};
use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("No {scheme} toggle named '{name}'")]
    UnknownToggle { scheme: &'static str, name: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleSummary {
    pub category: &'static str,
    pub caption: &'static str,
    pub icon: &'static str,
    pub state: ToggleState,
    pub markers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub icon: &'static str,
}

/// What a marker popup shows.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerDetail {
    pub id: MarkerId,
    pub name: String,
    pub title: String,
    pub category: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub attributes: JsonObject,
}

impl MarkerDetail {
    fn from_entry<C: Category>(entry: &MarkerEntry<C>) -> Self {
        Self {
            id: entry.id,
            name: entry.record.name.clone(),
            title: entry.record.title(),
            category: entry.record.category.label(),
            lat: entry.position.y(),
            lon: entry.position.x(),
            attributes: entry.record.attributes.clone(),
        }
    }
}

/// All mutable state of one investor layer, owned in one place.
///
/// Toggle handlers receive this by `&mut` instead of sharing marker lists
/// and a counter through captured globals.
pub struct InvestorLayer<C: Category, P: Presentation = CountReadout> {
    registry: MarkerRegistry<C>,
    toggles: ToggleBoard<C>,
    counter: VisibilityCounter,
    presentation: P,
}

impl<C: Category, P: Presentation> InvestorLayer<C, P> {
    pub fn build(
        records: Vec<Record<C>>,
        positioner: &mut JitterPositioner,
        live_counter: bool,
        mut presentation: P,
    ) -> Self {
        let mut registry = MarkerRegistry::build(records, positioner);
        let toggles = ToggleBoard::new(&mut registry, &mut presentation);
        let counter = VisibilityCounter::new(live_counter);
        counter.recompute(&registry, &mut presentation);
        Self {
            registry,
            toggles,
            counter,
            presentation,
        }
    }

    /// Loads records and builds the layer. A load failure leaves an empty
    /// layer with a zero count rather than an error.
    pub fn from_source(
        path: &Path,
        positioner: &mut JitterPositioner,
        live_counter: bool,
        presentation: P,
    ) -> Self {
        let records = match load_records::<C>(path) {
            Ok(records) => records,
            Err(e) => {
                warn!("{} layer will be empty: {}", C::SCHEME, e);
                Vec::new()
            }
        };
        Self::build(records, positioner, live_counter, presentation)
    }

    pub fn toggle(&mut self, category: C, checked: bool) -> usize {
        match self.toggles.controller_mut(category) {
            Some(controller) => controller.on_toggle(
                checked,
                &mut self.registry,
                &self.counter,
                &mut self.presentation,
            ),
            None => self.counter.recompute(&self.registry, &mut self.presentation),
        }
    }

    pub fn toggle_label(&mut self, name: &str, checked: bool) -> Result<usize, LayerError> {
        let category = C::from_toggle_name(name).ok_or_else(|| LayerError::UnknownToggle {
            scheme: C::SCHEME,
            name: name.to_string(),
        })?;
        let count = self.toggle(category, checked);
        info!("{} '{}' set to {} -> {} visible", C::SCHEME, category.short_name(), checked, count);
        Ok(count)
    }

    pub fn visible_count(&self) -> usize {
        self.counter.count(&self.registry)
    }

    pub fn registry(&self) -> &MarkerRegistry<C> {
        &self.registry
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn toggle_states(&self) -> Vec<ToggleSummary> {
        self.toggles
            .iter()
            .map(|t| {
                let category = t.category();
                ToggleSummary {
                    category: category.label(),
                    caption: category.short_name(),
                    icon: category.icon(),
                    state: t.state(),
                    markers: self.registry.ids_in(category).len(),
                }
            })
            .collect()
    }

    /// Legend rows: every named category, plus the fallback only if used.
    pub fn legend(&self) -> Vec<LegendEntry> {
        C::ALL
            .iter()
            .filter(|c| !c.is_unclassified() || !self.registry.ids_in(**c).is_empty())
            .map(|c| LegendEntry {
                label: c.label(),
                icon: c.icon(),
            })
            .collect()
    }

    pub fn marker_detail(&self, id: MarkerId) -> Option<MarkerDetail> {
        self.registry.get(id).map(MarkerDetail::from_entry)
    }

    pub fn nearest(&self, lat: f64, lon: f64) -> Option<MarkerDetail> {
        self.registry
            .nearest_visible(Point::new(lon, lat))
            .map(MarkerDetail::from_entry)
    }

    pub fn markers_geojson(&self) -> FeatureCollection {
        let features = self
            .registry
            .iter()
            .map(|entry| {
                let mut properties = JsonObject::new();
                properties.insert("id".into(), entry.id.0.into());
                properties.insert("name".into(), entry.record.name.clone().into());
                properties.insert("title".into(), entry.record.title().into());
                properties.insert(C::FIELD.into(), entry.record.category.label().into());
                properties.insert("icon".into(), entry.record.category.icon().into());
                properties.insert("visible".into(), entry.is_visible().into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&entry.position))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Scheme-erased view of a layer, so tier and cluster layers can sit side by
/// side behind one API.
pub trait LayerView: Send {
    fn scheme(&self) -> &'static str;
    fn visible_count(&self) -> usize;
    /// `None` when the live counter is switched off for this layer.
    fn readout(&self) -> Option<String>;
    fn toggle_label(&mut self, name: &str, checked: bool) -> Result<usize, LayerError>;
    fn toggle_states(&self) -> Vec<ToggleSummary>;
    fn legend(&self) -> Vec<LegendEntry>;
    fn markers_geojson(&self) -> FeatureCollection;
    fn nearest(&self, lat: f64, lon: f64) -> Option<MarkerDetail>;
    fn marker_detail(&self, id: MarkerId) -> Option<MarkerDetail>;
}

impl<C: Category> LayerView for InvestorLayer<C, CountReadout> {
    fn scheme(&self) -> &'static str {
        C::SCHEME
    }

    fn visible_count(&self) -> usize {
        InvestorLayer::visible_count(self)
    }

    fn readout(&self) -> Option<String> {
        self.presentation.text().map(str::to_string)
    }

    fn toggle_label(&mut self, name: &str, checked: bool) -> Result<usize, LayerError> {
        InvestorLayer::toggle_label(self, name, checked)
    }

    fn toggle_states(&self) -> Vec<ToggleSummary> {
        InvestorLayer::toggle_states(self)
    }

    fn legend(&self) -> Vec<LegendEntry> {
        InvestorLayer::legend(self)
    }

    fn markers_geojson(&self) -> FeatureCollection {
        InvestorLayer::markers_geojson(self)
    }

    fn nearest(&self, lat: f64, lon: f64) -> Option<MarkerDetail> {
        InvestorLayer::nearest(self, lat, lon)
    }

    fn marker_detail(&self, id: MarkerId) -> Option<MarkerDetail> {
        InvestorLayer::marker_detail(self, id)
    }
}
