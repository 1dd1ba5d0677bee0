//! Nearest-neighbor index over embedding vectors.
//!
//! [`FlatIndex`] is an exact L2 index with dense row storage and a tombstone
//! bitmap for logical deletion. Removing a vector never shifts the slots of the
//! remaining ones, so external ids held by callers stay valid; reclaiming the
//! space of tombstoned rows is an explicit off-hot-path [`compact`](VectorIndex::compact).

/// A hit from a k-nearest-neighbor search: `(slot, l2_distance)`.
pub type Neighbor = (usize, f32);

/// Nearest-neighbor search structure over fixed-dimension vectors.
///
/// Slots are assigned densely at insertion and remain stable until a compaction
/// remaps them; the store layered above owns the slot ↔ record-id mapping.
pub trait VectorIndex: Send + Sync {
    /// Insert a vector, returning its slot. The vector's length must equal
    /// [`dimensions`](Self::dimensions) — the caller validates this.
    fn insert(&mut self, vector: Vec<f32>) -> usize;

    /// Exact k-nearest search over live (non-tombstoned) vectors, ordered by
    /// ascending L2 distance. Returns fewer than `k` hits if fewer live vectors
    /// exist; an empty index yields an empty result, not an error.
    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor>;

    /// Tombstone a slot. Idempotent; unknown slots are ignored.
    fn remove(&mut self, slot: usize);

    /// Number of live vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all vectors and tombstones.
    fn clear(&mut self);

    /// Physically drop tombstoned rows. Returns `(reclaimed_count, remap)` where
    /// `remap[i] = (old_slot, new_slot)` for every surviving vector.
    fn compact(&mut self) -> (usize, Vec<(usize, usize)>);

    fn dimensions(&self) -> usize;
}

/// Exact (brute-force) L2 index, the in-process analog of a flat FAISS index.
pub struct FlatIndex {
    dim: usize,
    rows: Vec<Vec<f32>>,
    tombstones: Vec<bool>,
    live: usize,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: Vec::new(),
            tombstones: Vec::new(),
            live: 0,
        }
    }

    fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum::<f32>()
            .sqrt()
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, vector: Vec<f32>) -> usize {
        debug_assert_eq!(vector.len(), self.dim);
        let slot = self.rows.len();
        self.rows.push(vector);
        self.tombstones.push(false);
        self.live += 1;
        slot
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.live == 0 {
            return Vec::new();
        }

        let mut hits: Vec<Neighbor> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(slot, _)| !self.tombstones[*slot])
            .map(|(slot, row)| (slot, Self::l2_distance(query, row)))
            .collect();

        // Stable total order: distance ascending, slot ascending on exact ties.
        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }

    fn remove(&mut self, slot: usize) {
        if let Some(flag) = self.tombstones.get_mut(slot) {
            if !*flag {
                *flag = true;
                self.live -= 1;
            }
        }
    }

    fn len(&self) -> usize {
        self.live
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.tombstones.clear();
        self.live = 0;
    }

    fn compact(&mut self) -> (usize, Vec<(usize, usize)>) {
        let reclaimed = self.rows.len() - self.live;
        if reclaimed == 0 {
            return (0, Vec::new());
        }

        let mut remap = Vec::with_capacity(self.live);
        let mut kept: Vec<Vec<f32>> = Vec::with_capacity(self.live);
        for (old_slot, row) in std::mem::take(&mut self.rows).into_iter().enumerate() {
            if !self.tombstones[old_slot] {
                remap.push((old_slot, kept.len()));
                kept.push(row);
            }
        }

        self.tombstones = vec![false; kept.len()];
        self.rows = kept;
        (reclaimed, remap)
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}
