use std::fmt;
use std::sync::atomic::{AtomicIsize, Ordering};

type Current = AtomicIsize;
type Max = AtomicIsize;

/// Gauge that also remembers the highest value it has reached.
pub struct Counter(Current, Max);

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"{{ "count":{}, "max":{} }}"#, self.count(), self.max())
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    #[inline]
    pub fn new() -> Self {
        Counter(AtomicIsize::new(0), AtomicIsize::new(0))
    }

    #[inline]
    pub fn inc(&self) {
        let prev = self.0.fetch_add(1, Ordering::SeqCst);
        self.1.fetch_max(prev + 1, Ordering::SeqCst);
    }

    #[inline]
    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn count(&self) -> isize {
        self.0.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn max(&self) -> isize {
        self.1.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::Counter;

    #[test]
    fn max_tracks_peak() {
        let c = Counter::new();
        c.inc();
        c.inc();
        c.dec();
        c.inc();
        c.inc();
        assert_eq!(c.max(), 3);
        c.dec();
        c.dec();
        c.dec();
        assert_eq!(c.count(), 0);
        assert_eq!(c.max(), 3);
        assert_eq!(format!("{c:?}"), r#"{ "count":0, "max":3 }"#);
    }
}
