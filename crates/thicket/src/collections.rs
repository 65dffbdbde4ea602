// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::Provider;

/// The value of a set multibinding.
///
/// Elements keep the order in which their contributions were declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set<T> {
    elements: Vec<T>,
}

impl<T> Set<T> {
    /// Returns an empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { elements: Vec::new() }
    }

    /// Starts building a set with room for `capacity` elements.
    #[must_use]
    pub fn builder(capacity: usize) -> SetBuilder<T> {
        SetBuilder {
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the set has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates the elements in contribution order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Returns `true` if `value` is an element of the set.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.elements.contains(value)
    }
}

impl<T> IntoIterator for Set<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Builds a [`Set`] out of individual elements and element collections.
#[derive(Debug)]
pub struct SetBuilder<T> {
    elements: Vec<T>,
}

impl<T> SetBuilder<T> {
    /// Adds one element.
    #[must_use]
    pub fn add(mut self, element: T) -> Self {
        self.elements.push(element);
        self
    }

    /// Adds every element of `elements`.
    #[must_use]
    pub fn add_all(mut self, elements: impl IntoIterator<Item = T>) -> Self {
        self.elements.extend(elements);
        self
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> Set<T> {
        Set { elements: self.elements }
    }
}

/// The value of a map multibinding.
///
/// Entries keep the order in which their contributions were declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Map<K, V> {
    /// Returns an empty map.
    #[must_use]
    pub const fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Starts building a map with room for `capacity` entries.
    #[must_use]
    pub fn builder(capacity: usize) -> MapBuilder<K, V> {
        MapBuilder {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: PartialEq,
    {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates the entries in contribution order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// Builds a [`Map`] one entry at a time.
#[derive(Debug)]
pub struct MapBuilder<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> MapBuilder<K, V>
where
    K: PartialEq + Debug,
{
    /// Adds one entry.
    ///
    /// # Panics
    ///
    /// Panics if `key` was already added.
    #[must_use]
    #[track_caller]
    pub fn put(mut self, key: K, value: V) -> Self {
        assert!(
            self.entries.iter().all(|(existing, _)| *existing != key),
            "duplicate map multibinding key: {key:?}"
        );
        self.entries.push((key, value));
        self
    }

    /// Finishes the map.
    #[must_use]
    pub fn build(self) -> Map<K, V> {
        Map { entries: self.entries }
    }
}

/// A provider of a [`Set`] assembled from contribution providers.
pub struct SetFactory<T> {
    individual: Vec<Arc<dyn Provider<T>>>,
    collections: Vec<Arc<dyn Provider<Set<T>>>>,
}

impl<T> SetFactory<T>
where
    T: Send + Sync + 'static,
{
    /// Starts a factory with no contributions.
    #[must_use]
    pub fn builder() -> Self {
        Self {
            individual: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Adds a provider of one element.
    #[must_use]
    pub fn add_provider(mut self, provider: Arc<dyn Provider<T>>) -> Self {
        self.individual.push(provider);
        self
    }

    /// Adds a provider of several elements.
    #[must_use]
    pub fn add_collection_provider(mut self, provider: Arc<dyn Provider<Set<T>>>) -> Self {
        self.collections.push(provider);
        self
    }

    /// Finishes the factory.
    #[must_use]
    pub fn build(self) -> Arc<dyn Provider<Set<T>>> {
        Arc::new(self)
    }
}

impl<T> Provider<Set<T>> for SetFactory<T>
where
    T: Send + Sync,
{
    fn get(&self) -> Set<T> {
        let mut elements = Vec::with_capacity(self.individual.len());
        elements.extend(self.individual.iter().map(|provider| provider.get()));
        for provider in &self.collections {
            elements.extend(provider.get());
        }
        Set { elements }
    }
}

impl<T> Debug for SetFactory<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetFactory")
            .field("individual", &self.individual.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

/// A provider of a [`Map`] whose values are produced by contribution providers.
pub struct MapFactory<K, V> {
    entries: Vec<(K, Arc<dyn Provider<V>>)>,
}

impl<K, V> MapFactory<K, V>
where
    K: Clone + PartialEq + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Starts a factory with room for `capacity` entries.
    #[must_use]
    pub fn builder(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Adds the provider of the value bound to `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` was already added.
    #[must_use]
    #[track_caller]
    pub fn put(mut self, key: K, provider: Arc<dyn Provider<V>>) -> Self {
        assert!(
            self.entries.iter().all(|(existing, _)| *existing != key),
            "duplicate map multibinding key: {key:?}"
        );
        self.entries.push((key, provider));
        self
    }

    /// Finishes the factory.
    #[must_use]
    pub fn build(self) -> Arc<dyn Provider<Map<K, V>>> {
        Arc::new(self)
    }
}

impl<K, V> Provider<Map<K, V>> for MapFactory<K, V>
where
    K: Clone + Send + Sync,
    V: Send + Sync,
{
    fn get(&self) -> Map<K, V> {
        Map {
            entries: self
                .entries
                .iter()
                .map(|(key, provider)| (key.clone(), provider.get()))
                .collect(),
        }
    }
}

impl<K, V> Debug for MapFactory<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapFactory").field("entries", &self.entries.len()).finish()
    }
}

/// A provider of a [`Map`] whose values are the contribution providers themselves.
pub struct MapProviderFactory<K, V> {
    map: Map<K, Arc<dyn Provider<V>>>,
}

impl<K, V> MapProviderFactory<K, V>
where
    K: Clone + PartialEq + Debug + Send + Sync + 'static,
    V: 'static,
{
    /// Starts a factory with room for `capacity` entries.
    #[must_use]
    pub fn builder(capacity: usize) -> MapProviderFactoryBuilder<K, V> {
        MapProviderFactoryBuilder {
            map: Map::builder(capacity),
        }
    }
}

/// Builds a [`MapProviderFactory`].
pub struct MapProviderFactoryBuilder<K, V> {
    map: MapBuilder<K, Arc<dyn Provider<V>>>,
}

impl<K, V> MapProviderFactoryBuilder<K, V>
where
    K: Clone + PartialEq + Debug + Send + Sync + 'static,
    V: 'static,
{
    /// Adds the provider bound to `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` was already added.
    #[must_use]
    #[track_caller]
    pub fn put(self, key: K, provider: Arc<dyn Provider<V>>) -> Self {
        Self {
            map: self.map.put(key, provider),
        }
    }

    /// Finishes the factory.
    #[must_use]
    pub fn build(self) -> Arc<dyn Provider<Map<K, Arc<dyn Provider<V>>>>> {
        Arc::new(MapProviderFactory { map: self.map.build() })
    }
}

impl<K, V> Debug for MapProviderFactoryBuilder<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapProviderFactoryBuilder").finish_non_exhaustive()
    }
}

impl<K, V> Provider<Map<K, Arc<dyn Provider<V>>>> for MapProviderFactory<K, V>
where
    K: Clone + Send + Sync,
{
    fn get(&self) -> Map<K, Arc<dyn Provider<V>>> {
        Map {
            entries: self
                .map
                .entries
                .iter()
                .map(|(key, provider)| (key.clone(), Arc::clone(provider)))
                .collect(),
        }
    }
}

impl<K, V> Debug for MapProviderFactory<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapProviderFactory")
            .field("entries", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn set_factory_keeps_contribution_order() {
        let factory = SetFactory::builder()
            .add_provider(Arc::new(|| "a"))
            .add_collection_provider(Arc::new(|| Set::builder(2).add("b").add("c").build()))
            .add_provider(Arc::new(|| "d"))
            .build();

        let set = factory.get();

        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec!["a", "d", "b", "c"]);
        assert!(set.contains(&"c"));
    }

    #[test]
    fn map_factory_invokes_value_providers() {
        let factory = MapFactory::builder(2)
            .put("one", Arc::new(|| 1) as Arc<dyn Provider<i32>>)
            .put("two", Arc::new(|| 2) as Arc<dyn Provider<i32>>)
            .build();

        let map = factory.get();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"two"), Some(&2));
        assert_eq!(map.get(&"three"), None);
    }

    #[test]
    fn map_provider_factory_hands_out_providers() {
        let factory = MapProviderFactory::builder(1)
            .put(1_u8, Arc::new(|| "value".to_string()) as Arc<dyn Provider<String>>)
            .build();

        let map = factory.get();
        let provider = map.get(&1).expect("entry should exist");

        assert_eq!(provider.get(), "value");
    }

    #[test]
    #[should_panic]
    fn duplicate_map_keys_panic() {
        let _ = Map::<&str, i32>::builder(2).put("k", 1).put("k", 2);
    }
}
