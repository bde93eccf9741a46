use sibyl_core::SibylError;

/// Flat, exact nearest-neighbor index over fixed-dimension vectors using
/// squared Euclidean (L2) distance.
///
/// Vectors are append-only: each insert is assigned the next ordinal (its
/// zero-based position), and existing vectors are never reordered or
/// compacted. Among exact-distance ties, `nearest` returns the lowest
/// ordinal, i.e. the first-inserted vector.
#[derive(Debug)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector, assigning it the ordinal `self.len()` prior to the
    /// call. Rejects vectors of the wrong dimension.
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<(), SibylError> {
        if vector.len() != self.dimension {
            return Err(SibylError::Cache(format!(
                "index expects dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Ordinal and squared L2 distance of the stored vector closest to
    /// `query`, or `None` when the index is empty or the query has the
    /// wrong dimension.
    pub fn nearest(&self, query: &[f32]) -> Option<(usize, f32)> {
        if query.len() != self.dimension {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for (ordinal, vector) in self.vectors.iter().enumerate() {
            let distance = squared_l2(query, vector);
            // Strict comparison: the first-inserted vector wins exact ties.
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((ordinal, distance)),
            }
        }
        best
    }

    /// Drop all vectors; the next insert gets ordinal 0 again.
    pub fn reset(&mut self) {
        self.vectors.clear();
    }
}

/// Sum of squared per-dimension differences.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
