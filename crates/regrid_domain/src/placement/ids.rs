use std::collections::HashSet;

/// Hands out row ids unused by either snapshot.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    in_use: HashSet<i64>,
    next: i64,
}

impl IdAllocator {
    pub fn new(in_use: impl IntoIterator<Item = i64>) -> Self {
        let in_use: HashSet<i64> = in_use.into_iter().collect();
        let next = in_use.iter().copied().max().unwrap_or(0).max(0) + 1;
        Self { in_use, next }
    }

    pub fn allocate(&mut self) -> i64 {
        while self.in_use.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.in_use.insert(id);
        self.next += 1;
        id
    }

    pub fn is_in_use(&self, id: i64) -> bool {
        self.in_use.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::IdAllocator;

    #[test]
    fn allocates_above_every_id_in_use() {
        let mut ids = IdAllocator::new([3, 17, 5]);
        assert_eq!(ids.allocate(), 18);
        assert_eq!(ids.allocate(), 19);
        assert!(ids.is_in_use(18));
        assert!(ids.is_in_use(3));
    }

    #[test]
    fn empty_store_starts_at_one() {
        let mut ids = IdAllocator::new(std::iter::empty());
        assert_eq!(ids.allocate(), 1);
        let mut negative_only = IdAllocator::new([-4]);
        assert_eq!(negative_only.allocate(), 1);
    }
}
