use std::collections::BTreeMap;

use crate::error::CodestreamError;

/// The tier a resolved value was taken from, narrowest last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecScope {
    Default,
    ComponentDefault,
    TileDefault,
    TileComponent,
}

/// A value per tile and component with default overlays.
///
/// Lookups for a (tile, component) cell prefer a value set for that exact
/// cell, then the tile default, then the component default, then the global
/// default. Only the values actually set are stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Spec<T> {
    num_tiles: usize,
    num_components: usize,
    default: Option<T>,
    tile_defaults: BTreeMap<usize, T>,
    component_defaults: BTreeMap<usize, T>,
    tile_components: BTreeMap<(usize, usize), T>,
}

impl<T> Spec<T> {
    pub fn new(num_tiles: usize, num_components: usize) -> Spec<T> {
        Spec {
            num_tiles,
            num_components,
            default: None,
            tile_defaults: BTreeMap::new(),
            component_defaults: BTreeMap::new(),
            tile_components: BTreeMap::new(),
        }
    }

    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    fn check_tile(&self, tile: usize) -> Result<(), CodestreamError> {
        if tile >= self.num_tiles {
            return Err(CodestreamError::IndexOutOfRange {
                what: "tile",
                index: tile,
                count: self.num_tiles,
            });
        }
        Ok(())
    }

    fn check_component(&self, component: usize) -> Result<(), CodestreamError> {
        if component >= self.num_components {
            return Err(CodestreamError::IndexOutOfRange {
                what: "component",
                index: component,
                count: self.num_components,
            });
        }
        Ok(())
    }

    pub fn set_default(&mut self, value: T) {
        self.default = Some(value);
    }

    pub fn set_tile_default(&mut self, tile: usize, value: T) -> Result<(), CodestreamError> {
        self.check_tile(tile)?;
        self.tile_defaults.insert(tile, value);
        Ok(())
    }

    pub fn set_component_default(
        &mut self,
        component: usize,
        value: T,
    ) -> Result<(), CodestreamError> {
        self.check_component(component)?;
        self.component_defaults.insert(component, value);
        Ok(())
    }

    pub fn set_tile_component(
        &mut self,
        tile: usize,
        component: usize,
        value: T,
    ) -> Result<(), CodestreamError> {
        self.check_tile(tile)?;
        self.check_component(component)?;
        self.tile_components.insert((tile, component), value);
        Ok(())
    }

    pub fn default(&self) -> Option<&T> {
        self.default.as_ref()
    }

    /// Value for a tile, ignoring component overrides.
    pub fn tile_default(&self, tile: usize) -> Option<&T> {
        self.tile_defaults.get(&tile).or(self.default.as_ref())
    }

    /// Value for a component, ignoring tile overrides.
    pub fn component_default(&self, component: usize) -> Option<&T> {
        self.component_defaults
            .get(&component)
            .or(self.default.as_ref())
    }

    pub fn resolve(&self, tile: usize, component: usize) -> Option<&T> {
        self.resolve_with_scope(tile, component).map(|(value, _)| value)
    }

    /// Tier the value of a cell comes from, `None` when nothing covers it.
    pub fn scope(&self, tile: usize, component: usize) -> Option<SpecScope> {
        self.resolve_with_scope(tile, component).map(|(_, scope)| scope)
    }

    pub fn resolve_with_scope(&self, tile: usize, component: usize) -> Option<(&T, SpecScope)> {
        if let Some(value) = self.tile_components.get(&(tile, component)) {
            return Some((value, SpecScope::TileComponent));
        }
        if let Some(value) = self.tile_defaults.get(&tile) {
            return Some((value, SpecScope::TileDefault));
        }
        if let Some(value) = self.component_defaults.get(&component) {
            return Some((value, SpecScope::ComponentDefault));
        }
        self.default.as_ref().map(|value| (value, SpecScope::Default))
    }

    /// Whether the tile or any of its components has its own value.
    pub fn is_tile_specified(&self, tile: usize) -> bool {
        self.tile_defaults.contains_key(&tile)
            || self.tile_components.keys().any(|&(t, _)| t == tile)
    }

    /// Every value set at any tier.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.default
            .iter()
            .chain(self.component_defaults.values())
            .chain(self.tile_defaults.values())
            .chain(self.tile_components.values())
    }

    /// True when every (tile, component) cell resolves to a value.
    pub fn is_fully_specified(&self) -> bool {
        if self.default.is_some() {
            return true;
        }
        (0..self.num_tiles).all(|t| {
            self.tile_defaults.contains_key(&t)
                || (0..self.num_components).all(|c| {
                    self.tile_components.contains_key(&(t, c))
                        || self.component_defaults.contains_key(&c)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // Sets the tile-component, tile default and component default tiers of
    // cell (1, 1) according to the flags, with the global default always set.
    fn table(tile_component: bool, tile_default: bool, component_default: bool) -> Spec<&'static str> {
        let mut spec = Spec::new(2, 2);
        spec.set_default("default");
        if component_default {
            spec.set_component_default(1, "component").unwrap();
        }
        if tile_default {
            spec.set_tile_default(1, "tile").unwrap();
        }
        if tile_component {
            spec.set_tile_component(1, 1, "tile-component").unwrap();
        }
        spec
    }

    #[test]
    fn test_tile_component_wins() {
        for (tile_default, component_default) in
            [(false, false), (false, true), (true, false), (true, true)]
        {
            let spec = table(true, tile_default, component_default);
            assert_eq!(spec.resolve(1, 1), Some(&"tile-component"));
            assert_eq!(spec.scope(1, 1), Some(SpecScope::TileComponent));
        }
    }

    #[test]
    fn test_tile_default_over_component_default() {
        let spec = table(false, true, true);
        assert_eq!(spec.resolve(1, 1), Some(&"tile"));
        assert_eq!(spec.scope(1, 1), Some(SpecScope::TileDefault));
        // Other tiles still see the component default.
        assert_eq!(spec.resolve(0, 1), Some(&"component"));
        assert_eq!(spec.resolve(0, 0), Some(&"default"));
    }

    #[test]
    fn test_component_default_over_default() {
        let spec = table(false, false, true);
        assert_eq!(spec.resolve(1, 1), Some(&"component"));
        assert_eq!(spec.scope(1, 1), Some(SpecScope::ComponentDefault));
        assert_eq!(spec.resolve(1, 0), Some(&"default"));
    }

    #[test]
    fn test_default_only() {
        let spec = table(false, false, false);
        assert_eq!(spec.resolve(1, 1), Some(&"default"));
        assert_eq!(spec.scope(1, 1), Some(SpecScope::Default));
        assert_eq!(spec.tile_default(1), Some(&"default"));
        assert!(spec.is_fully_specified());
    }

    #[test]
    fn test_later_override_replaces() {
        let mut spec = Spec::new(1, 3);
        spec.set_component_default(2, 4).unwrap();
        spec.set_component_default(2, 5).unwrap();
        assert_eq!(spec.resolve(0, 2), Some(&5));
        assert_eq!(spec.resolve(0, 1), None);
        assert_eq!(spec.scope(0, 1), None);
    }

    #[test]
    fn test_fully_specified() {
        let mut spec = Spec::new(2, 2);
        assert!(!spec.is_fully_specified());
        spec.set_tile_default(0, 1).unwrap();
        assert!(!spec.is_fully_specified());
        spec.set_component_default(0, 2).unwrap();
        spec.set_tile_component(1, 1, 3).unwrap();
        assert!(spec.is_fully_specified());
        assert!(spec.is_tile_specified(1));
        assert_eq!(spec.values().count(), 3);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut spec = Spec::new(2, 3);
        let error = spec.set_tile_default(2, 0).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfRange);
        let error = spec.set_tile_component(0, 3, 0).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfRange);
        assert!(spec.set_component_default(2, 0).is_ok());
    }
}
