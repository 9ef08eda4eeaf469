use geo_recommender_shared::geo::{cross_track_to_meridian, haversine_distance, latitude_arc};
use geo_recommender_shared::models::{Neighbor, Person, QueryParams};
use rand::Rng;

use crate::error::StoreError;
use crate::queue::BoundedPriorityQueue;
use crate::storage::{Node, NodeStore};

/// Splitting axis of a tree level. Levels alternate latitude, longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn at_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            Axis::Latitude
        } else {
            Axis::Longitude
        }
    }

    pub fn next(self) -> Self {
        match self {
            Axis::Latitude => Axis::Longitude,
            Axis::Longitude => Axis::Latitude,
        }
    }

    pub fn key(self, latitude: f64, longitude: f64) -> f64 {
        match self {
            Axis::Latitude => latitude,
            Axis::Longitude => longitude,
        }
    }

    fn person_key(self, p: &Person) -> f64 {
        self.key(p.latitude, p.longitude)
    }

    /// Lower bound, in kilometers, on the distance from the query point to
    /// anything on the far side of `splitter`'s plane.
    ///
    /// A longitude region is bounded by the splitting meridian and by the
    /// antimeridian, so both great circles are considered.
    fn plane_distance(self, latitude: f64, longitude: f64, splitter: &Person) -> f64 {
        match self {
            Axis::Latitude => latitude_arc(latitude, splitter.latitude),
            Axis::Longitude => cross_track_to_meridian(latitude, longitude, splitter.longitude)
                .min(cross_track_to_meridian(latitude, longitude, 180.0)),
        }
    }
}

/// How pivots are picked while building the tree.
#[derive(Debug, Clone, Copy)]
pub struct MedianStrategy {
    /// Number of random samples used for approximate medians.
    pub sample_size: usize,
    /// Use the sampled median once a level holds `5 * sample_size` items.
    pub approximate: bool,
}

impl Default for MedianStrategy {
    fn default() -> Self {
        MedianStrategy {
            sample_size: 10_000,
            approximate: true,
        }
    }
}

impl MedianStrategy {
    pub fn exact() -> Self {
        MedianStrategy {
            approximate: false,
            ..Self::default()
        }
    }

    /// Split `items` around their median on `axis`, returning
    /// `(left, right, median)`. Left items have keys <= the median's.
    pub fn split<R: Rng + ?Sized>(
        &self,
        mut items: Vec<Person>,
        axis: Axis,
        rng: &mut R,
    ) -> (Vec<Person>, Vec<Person>, Person) {
        assert!(!items.is_empty(), "cannot take the median of no items");

        if self.approximate && self.sample_size > 0 && items.len() >= self.sample_size * 5 {
            let mut sample: Vec<usize> = (0..self.sample_size)
                .map(|_| rng.gen_range(0..items.len()))
                .collect();
            sample.sort_by(|&a, &b| axis.person_key(&items[a]).total_cmp(&axis.person_key(&items[b])));
            let median_idx = sample[sample.len() / 2];

            let median = items.swap_remove(median_idx);
            let key = axis.person_key(&median);
            let (left, right) = items
                .into_iter()
                .partition(|p| axis.person_key(p) <= key);
            return (left, right, median);
        }

        // Stable sort keeps input order among equal keys
        items.sort_by(|a, b| axis.person_key(a).total_cmp(&axis.person_key(b)));
        let mid = items.len() / 2;
        let right = items.split_off(mid + 1);
        let median = items.remove(mid);
        (items, right, median)
    }
}

/// Two-dimensional k-d tree over people, answering age-filtered k nearest
/// neighbor queries by haversine distance.
pub struct KdTreeStore {
    nodes: Box<dyn NodeStore>,
    strategy: MedianStrategy,
}

impl KdTreeStore {
    pub fn new(nodes: Box<dyn NodeStore>, strategy: MedianStrategy) -> Self {
        KdTreeStore { nodes, strategy }
    }

    pub fn is_built(&self) -> Result<bool, StoreError> {
        Ok(self.nodes.root()?.is_some())
    }

    pub fn len(&self) -> Result<u64, StoreError> {
        self.nodes.count()
    }

    /// Build the index from scratch, replacing any previous contents.
    pub fn build(&mut self, items: Vec<Person>) -> Result<(), StoreError> {
        self.build_with_rng(items, &mut rand::thread_rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(
        &mut self,
        items: Vec<Person>,
        rng: &mut R,
    ) -> Result<(), StoreError> {
        tracing::info!(items = items.len(), "building index from scratch");

        // Construction phase: nodes stay in memory and are flushed in one go
        let mut built = Vec::with_capacity(items.len());
        let root = construct(items, 0, &self.strategy, rng, &mut built);
        if let Some(dup) = first_duplicate(&built) {
            return Err(StoreError::DuplicateId(dup));
        }
        self.nodes.replace_all(built, root)?;

        tracing::info!(nodes = self.nodes.count()?, "finished building index");
        Ok(())
    }

    fn node(&self, id: u64) -> Result<Node, StoreError> {
        self.nodes.get(id)?.ok_or(StoreError::MissingNode(id))
    }

    /// The `k` people nearest to `target` whose age differs by at most
    /// `age_proximity`, nearest first.
    pub fn k_nearest_neighbors(
        &self,
        target: &QueryParams,
        k: usize,
        age_proximity: u32,
    ) -> Result<Vec<Neighbor>, StoreError> {
        let root = self.nodes.root()?.ok_or(StoreError::IndexNotBuilt)?;

        let mut queue = BoundedPriorityQueue::new(k);
        self.search(Some(root), target, Axis::Latitude, age_proximity, &mut queue)?;

        Ok(queue
            .into_sorted_vec()
            .into_iter()
            .map(|(distance, person)| Neighbor::from_person(person, distance))
            .collect())
    }

    fn search(
        &self,
        id: Option<u64>,
        target: &QueryParams,
        axis: Axis,
        age_proximity: u32,
        queue: &mut BoundedPriorityQueue<Person>,
    ) -> Result<(), StoreError> {
        let Some(id) = id else {
            return Ok(());
        };
        let node = self.node(id)?;
        let person = &node.person;

        if target.age.abs_diff(person.age) <= age_proximity {
            let distance = haversine_distance(
                target.latitude,
                target.longitude,
                person.latitude,
                person.longitude,
            );
            queue.push(person.clone(), distance);
        }

        // Descend first towards the target's side of the plane
        let go_left = axis.key(target.latitude, target.longitude) < axis.person_key(person);
        let (near, far) = if go_left {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        self.search(near, target, axis.next(), age_proximity, queue)?;

        // The far side can only help if the current candidate radius crosses the plane
        let must_visit_far = match queue.peek_priority() {
            Some(worst) if queue.is_full() => {
                axis.plane_distance(target.latitude, target.longitude, person) < worst
            }
            _ => true,
        };
        if must_visit_far {
            self.search(far, target, axis.next(), age_proximity, queue)?;
        }
        Ok(())
    }

    /// Attach a person as a new leaf.
    pub fn insert(&mut self, person: Person) -> Result<(), StoreError> {
        let id = person.id;
        if self.nodes.get(id)?.is_some() {
            return Err(StoreError::DuplicateId(id));
        }

        let Some(mut current) = self.nodes.root()? else {
            self.nodes.put(Node::leaf(person))?;
            return self.nodes.set_root(id);
        };

        let mut axis = Axis::Latitude;
        loop {
            let mut node = self.node(current)?;
            let go_left = axis.person_key(&person) < axis.person_key(&node.person);
            let child = if go_left { node.left } else { node.right };
            match child {
                Some(next) => {
                    current = next;
                    axis = axis.next();
                }
                None => {
                    if go_left {
                        node.left = Some(id);
                    } else {
                        node.right = Some(id);
                    }
                    self.nodes.put(Node::leaf(person))?;
                    return self.nodes.put(node);
                }
            }
        }
    }

    /// The person stored at exactly these coordinates, if any.
    ///
    /// Equal keys can land on either side of a splitter, so ties descend both ways.
    pub fn find(&self, latitude: f64, longitude: f64) -> Result<Option<Person>, StoreError> {
        let mut stack: Vec<(u64, Axis)> = self
            .nodes
            .root()?
            .map(|r| (r, Axis::Latitude))
            .into_iter()
            .collect();
        while let Some((id, axis)) = stack.pop() {
            let node = self.node(id)?;
            if node.person.latitude == latitude && node.person.longitude == longitude {
                return Ok(Some(node.person));
            }
            let key = axis.key(latitude, longitude);
            let split = axis.person_key(&node.person);
            if key <= split {
                stack.extend(node.left.map(|l| (l, axis.next())));
            }
            if key >= split {
                stack.extend(node.right.map(|r| (r, axis.next())));
            }
        }
        Ok(None)
    }

    /// Pre-order listing of the tree as `(depth, person)`.
    pub fn dump(&self) -> Result<Vec<(usize, Person)>, StoreError> {
        let mut out = Vec::new();
        let mut stack: Vec<(u64, usize)> = self.nodes.root()?.map(|r| (r, 0)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id)?;
            if let Some(right) = node.right {
                stack.push((right, depth + 1));
            }
            if let Some(left) = node.left {
                stack.push((left, depth + 1));
            }
            out.push((depth, node.person));
        }
        Ok(out)
    }
}

fn construct<R: Rng + ?Sized>(
    items: Vec<Person>,
    depth: usize,
    strategy: &MedianStrategy,
    rng: &mut R,
    out: &mut Vec<Node>,
) -> Option<u64> {
    if items.is_empty() {
        return None;
    }
    let (left, right, median) = strategy.split(items, Axis::at_depth(depth), rng);
    let left = construct(left, depth + 1, strategy, rng, out);
    let right = construct(right, depth + 1, strategy, rng, out);
    let id = median.id;
    out.push(Node {
        person: median,
        left,
        right,
    });
    Some(id)
}

fn first_duplicate(nodes: &[Node]) -> Option<u64> {
    let mut seen = std::collections::HashSet::with_capacity(nodes.len());
    nodes.iter().map(Node::id).find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, RedbStore};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn person(id: u64, name: &str, age: u32, latitude: f64, longitude: f64) -> Person {
        Person {
            id,
            name: name.to_string(),
            age,
            latitude,
            longitude,
        }
    }

    fn fixture() -> Vec<Person> {
        vec![
            person(0, "hamza harkous", 18, 40.3, 13.3),
            person(1, "John Doe", 40, 120.3, -3.3),
            person(2, "Doroles Doe", 80, 89.3, -59.3),
            person(3, "Debby Smith", 35, 120.3, 53.3),
            person(4, "agent smith", 33, 90.3, 43.3),
            person(5, "Jane Smith", 35, 110.3, 53.3),
            person(6, "FLoat Number", 77, 60.3, -13.3),
        ]
    }

    fn names(people: &[Person]) -> Vec<&str> {
        people.iter().map(|p| p.name.as_str()).collect()
    }

    fn memory_store(items: Vec<Person>) -> KdTreeStore {
        let mut store = KdTreeStore::new(Box::new(MemoryStore::default()), MedianStrategy::exact());
        store
            .build_with_rng(items, &mut StdRng::seed_from_u64(1))
            .unwrap();
        store
    }

    fn brute_force(items: &[Person], target: &QueryParams, k: usize, prox: u32) -> Vec<f64> {
        let mut d: Vec<f64> = items
            .iter()
            .filter(|p| target.age.abs_diff(p.age) <= prox)
            .map(|p| haversine_distance(target.latitude, target.longitude, p.latitude, p.longitude))
            .collect();
        d.sort_by(f64::total_cmp);
        d.truncate(k);
        d
    }

    #[test]
    fn test_exact_median_on_fixture() {
        let mut rng = StdRng::seed_from_u64(0);
        let (left, right, median) = MedianStrategy::exact().split(fixture(), Axis::Latitude, &mut rng);
        assert_eq!(median.name, "agent smith");
        assert_eq!(names(&left), vec!["hamza harkous", "FLoat Number", "Doroles Doe"]);
        assert_eq!(names(&right), vec!["Jane Smith", "John Doe", "Debby Smith"]);
    }

    #[test]
    fn test_approximate_median_partitions_everything() {
        let strategy = MedianStrategy {
            sample_size: 4,
            approximate: true,
        };
        let items: Vec<Person> = (0..40)
            .map(|i| person(i, "x", 30, (i as f64) - 20.0, 0.0))
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let (left, right, median) = strategy.split(items, Axis::Latitude, &mut rng);
        assert_eq!(left.len() + right.len(), 39);
        assert!(left.iter().all(|p| p.latitude <= median.latitude));
        assert!(right.iter().all(|p| p.latitude > median.latitude));
        assert!(left.iter().chain(right.iter()).all(|p| p.id != median.id));
    }

    #[test]
    fn test_query_before_build_fails() {
        let store = KdTreeStore::new(Box::new(MemoryStore::default()), MedianStrategy::default());
        let target = QueryParams { latitude: 0.0, longitude: 0.0, age: 20 };
        assert!(matches!(
            store.k_nearest_neighbors(&target, 10, 5),
            Err(StoreError::IndexNotBuilt)
        ));
        assert!(!store.is_built().unwrap());
    }

    #[test]
    fn test_knn_filters_by_age_and_sorts_by_distance() {
        let store = memory_store(fixture());
        let target = QueryParams { latitude: 100.0, longitude: 50.0, age: 34 };
        let result = store.k_nearest_neighbors(&target, 10, 1).unwrap();
        let result_names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(result.len(), 3);
        assert!(result_names.contains(&"agent smith"));
        assert!(result_names.contains(&"Jane Smith"));
        assert!(result_names.contains(&"Debby Smith"));
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_knn_respects_k() {
        let store = memory_store(fixture());
        let target = QueryParams { latitude: 50.0, longitude: 0.0, age: 50 };
        let result = store.k_nearest_neighbors(&target, 2, 100).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "FLoat Number");
    }

    #[test]
    fn test_knn_finds_neighbor_across_antimeridian() {
        let mut items: Vec<Person> = (0..50)
            .map(|i| person(i, "far", 30, (i as f64) - 25.0, (i as f64) * 3.0 - 60.0))
            .collect();
        items.push(person(100, "close", 30, 0.0, -179.9));
        let store = memory_store(items);
        let target = QueryParams { latitude: 0.0, longitude: 179.9, age: 30 };
        let result = store.k_nearest_neighbors(&target, 1, 0).unwrap();
        assert_eq!(result[0].name, "close");
        assert!(result[0].distance.unwrap() < 25.0);
    }

    #[test]
    fn test_insert_and_find() {
        let mut store = KdTreeStore::new(Box::new(MemoryStore::default()), MedianStrategy::exact());
        for p in fixture() {
            store.insert(p).unwrap();
        }
        assert_eq!(store.len().unwrap(), 7);
        let found = store.find(110.3, 53.3).unwrap().unwrap();
        assert_eq!(found.name, "Jane Smith");
        assert!(store.find(1.0, 1.0).unwrap().is_none());

        let target = QueryParams { latitude: 40.0, longitude: 13.0, age: 18 };
        let result = store.k_nearest_neighbors(&target, 1, 0).unwrap();
        assert_eq!(result[0].name, "hamza harkous");
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut store = memory_store(fixture());
        let err = store.insert(person(3, "again", 1, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(3)));
    }

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let mut items = fixture();
        items.push(person(0, "clone", 18, 1.0, 1.0));
        let mut store = KdTreeStore::new(Box::new(MemoryStore::default()), MedianStrategy::exact());
        let err = store.build(items).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(0)));
    }

    #[test]
    fn test_dump_lists_every_node_preorder() {
        let store = memory_store(fixture());
        let dump = store.dump().unwrap();
        assert_eq!(dump.len(), 7);
        assert_eq!(dump[0], (0, fixture()[4].clone()));
        assert!(dump.iter().skip(1).all(|(depth, _)| *depth >= 1));
    }

    #[test]
    fn test_persistent_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.redb");
        {
            let mut store =
                KdTreeStore::new(Box::new(RedbStore::open(&path).unwrap()), MedianStrategy::exact());
            store.build(fixture()).unwrap();
        }
        let store = KdTreeStore::new(Box::new(RedbStore::open(&path).unwrap()), MedianStrategy::exact());
        assert!(store.is_built().unwrap());
        let target = QueryParams { latitude: 90.0, longitude: 43.0, age: 33 };
        let result = store.k_nearest_neighbors(&target, 1, 0).unwrap();
        assert_eq!(result[0].name, "agent smith");
    }

    fn people_strategy() -> impl Strategy<Value = Vec<Person>> {
        proptest::collection::vec((-90.0f64..90.0, -180.0f64..180.0, 18u32..90), 1..120).prop_map(
            |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (lat, lon, age))| person(i as u64, "p", age, lat, lon))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn knn_matches_brute_force(
            items in people_strategy(),
            lat in -90.0f64..90.0,
            lon in -180.0f64..180.0,
            age in 18u32..90,
            k in 1usize..15,
            prox in 0u32..20,
        ) {
            let target = QueryParams { latitude: lat, longitude: lon, age };
            let expected = brute_force(&items, &target, k, prox);
            let store = memory_store(items);
            let got: Vec<f64> = store
                .k_nearest_neighbors(&target, k, prox)
                .unwrap()
                .into_iter()
                .map(|n| n.distance.unwrap())
                .collect();
            prop_assert_eq!(got.len(), expected.len());
            for (g, e) in got.iter().zip(expected.iter()) {
                prop_assert!((g - e).abs() < 1e-9, "got {:?} expected {:?}", got, expected);
            }
        }
    }
}
