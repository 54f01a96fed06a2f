use dmc_core::{DmcError, ErrorInfo, RandomSource};

use crate::ids::PoolId;

/// Arena of records addressed by stable typed ids.
///
/// Freed slots go on a freelist and are reused by later inserts. Alive ids are
/// additionally kept in a dense list with a back-index so that removal and
/// uniform random selection are both O(1).
#[derive(Debug, Clone)]
pub struct Pool<I, T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    alive: Vec<I>,
    position: Vec<usize>,
}

impl<I: PoolId, T> Default for Pool<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PoolId, T> Pool<I, T> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            alive: Vec::new(),
            position: Vec::new(),
        }
    }

    /// Stores `value`, reusing a freed slot when one is available.
    pub fn insert(&mut self, value: T) -> I {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(value);
                index
            }
            None => {
                self.slots.push(Some(value));
                self.position.push(0);
                self.slots.len() - 1
            }
        };
        let id = I::from_index(index);
        self.position[index] = self.alive.len();
        self.alive.push(id);
        id
    }

    /// Removes the record behind `id` and returns it.
    pub fn remove(&mut self, id: I) -> Result<T, DmcError> {
        let index = id.index();
        let value = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| dead_id(id))?;
        let pos = self.position[index];
        self.alive.swap_remove(pos);
        if let Some(&moved) = self.alive.get(pos) {
            self.position[moved.index()] = pos;
        }
        self.free.push(index);
        Ok(value)
    }

    /// Shared access to an alive record.
    pub fn get(&self, id: I) -> Result<&T, DmcError> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| dead_id(id))
    }

    /// Mutable access to an alive record.
    pub fn get_mut(&mut self, id: I) -> Result<&mut T, DmcError> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| dead_id(id))
    }

    /// Whether `id` refers to an alive record.
    pub fn contains(&self, id: I) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    /// Number of alive records.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    /// Whether the pool holds no alive records.
    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Alive ids in pool order.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = I> + '_ {
        self.alive.iter().copied()
    }

    /// Alive records together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.alive.iter().filter_map(move |&id| {
            self.slots[id.index()].as_ref().map(|record| (id, record))
        })
    }

    /// Picks an alive id uniformly with a single integer draw.
    pub fn random_pick<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<I> {
        if self.alive.is_empty() {
            return None;
        }
        let pos = rng.int_in(0, self.alive.len() as i64 - 1);
        self.alive.get(pos as usize).copied()
    }
}

fn dead_id<I: PoolId>(id: I) -> DmcError {
    DmcError::Diagram(
        ErrorInfo::new(format!("unknown-{}", I::KIND), format!("{} is not alive", I::KIND))
            .with_context(I::KIND, id.index().to_string()),
    )
}
