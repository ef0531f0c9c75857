//! Change lenses: per-subscription projection with adjacent-duplicate removal.
//!
//! A [`ChangeLens`] turns a stream of full values into a stream of projected
//! parts, forwarding a part only when it differs from the last part it
//! forwarded. Observing `value1` across `(1,12) (1,-8) (7,-8) (7,-8) (3,17)`
//! yields `1, 7, 3`: the other field's changes are invisible.
//!
//! Each lens owns its own previous-value slot, so two subscriptions observing
//! the same part of the same notifier deduplicate independently.
//!
//! A part that was forwarded but never delivered (its queue refused the job)
//! is retracted, so the next equal part is forwarded again.

pub mod key_path;

use std::fmt;

use parking_lot::Mutex;

use crate::notifier::subscription::Stage;

pub use key_path::KeyPath;

type Project<V, T> = Box<dyn Fn(&V) -> T + Send + Sync>;
type Equal<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Last forwarded part, and the one it replaced.
struct Slot<T> {
    previous: Option<T>,
    displaced: Option<T>,
}

/// Stateful projection that suppresses repeats of the previous projected value.
pub struct ChangeLens<V, T> {
    project: Project<V, T>,
    equal: Equal<T>,
    slot: Mutex<Slot<T>>,
}

impl<V, T> ChangeLens<V, T>
where
    T: PartialEq + 'static,
{
    /// Lens over an arbitrary projection, compared with `PartialEq`.
    pub fn new(project: impl Fn(&V) -> T + Send + Sync + 'static) -> Self {
        Self::with_eq(project, |a: &T, b: &T| a == b)
    }
}

impl<V, T> ChangeLens<V, T> {
    /// Lens with a caller-supplied equality check.
    pub fn with_eq(
        project: impl Fn(&V) -> T + Send + Sync + 'static,
        equal: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            project: Box::new(project),
            equal: Box::new(equal),
            slot: Mutex::new(Slot {
                previous: None,
                displaced: None,
            }),
        }
    }

    /// Project `value` and return the part if it differs from the last part
    /// returned. The first call always returns `Some`.
    pub fn apply(&self, value: &V) -> Option<T>
    where
        T: Clone,
    {
        let next = (self.project)(value);
        let mut slot = self.slot.lock();
        if let Some(prev) = slot.previous.as_ref() {
            if (self.equal)(prev, &next) {
                return None;
            }
        }
        slot.displaced = slot.previous.replace(next.clone());
        Some(next)
    }

    /// Undo the forwarding of `part`, restoring the part it replaced.
    ///
    /// Only takes effect while `part` is still the last forwarded part; a
    /// later `apply` that forwarded something else wins.
    pub fn retract(&self, part: &T) {
        let mut slot = self.slot.lock();
        let current = matches!(&slot.previous, Some(prev) if (self.equal)(prev, part));
        if current {
            slot.previous = slot.displaced.take();
        }
    }

    /// The last forwarded part, if any.
    pub fn previous(&self) -> Option<T>
    where
        T: Clone,
    {
        self.slot.lock().previous.clone()
    }

    /// Forget the last forwarded part; the next value is forwarded unconditionally.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        slot.previous = None;
        slot.displaced = None;
    }
}

impl<V, T> From<KeyPath<V, T>> for ChangeLens<V, T>
where
    V: 'static,
    T: Clone + PartialEq + 'static,
{
    fn from(key: KeyPath<V, T>) -> Self {
        Self::new(move |value: &V| key.get(value).clone())
    }
}

impl<V, T> Stage<V, T> for ChangeLens<V, T>
where
    T: Clone + Send,
{
    fn project(&self, value: &V) -> Option<T> {
        self.apply(value)
    }

    fn retracts(&self) -> bool {
        true
    }

    fn retract(&self, part: &T) {
        ChangeLens::retract(self, part);
    }
}

impl<V, T: fmt::Debug> fmt::Debug for ChangeLens<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeLens")
            .field("previous", &self.slot.lock().previous)
            .finish_non_exhaustive()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Clone)]
    struct Pair {
        value1: i32,
        value2: i32,
    }

    const VALUE1: KeyPath<Pair, i32> = KeyPath::new(|p| &p.value1);
    const VALUE2: KeyPath<Pair, i32> = KeyPath::new(|p| &p.value2);

    fn sample() -> Vec<Pair> {
        [(1, 12), (1, -8), (7, -8), (7, -8), (3, 17)]
            .into_iter()
            .map(|(value1, value2)| Pair { value1, value2 })
            .collect()
    }

    fn run<T: Clone>(lens: &ChangeLens<Pair, T>, values: &[Pair]) -> Vec<T> {
        values.iter().filter_map(|v| lens.apply(v)).collect()
    }

    // ── Deduplication ────────────────────────────────────────────────

    #[test]
    fn collapses_adjacent_duplicates() {
        let lens = ChangeLens::from(VALUE1);
        assert_eq!(run(&lens, &sample()), vec![1, 7, 3]);
    }

    #[test]
    fn other_field_is_independent() {
        let lens = ChangeLens::from(VALUE2);
        assert_eq!(run(&lens, &sample()), vec![12, -8, 17]);
    }

    #[test]
    fn non_adjacent_repeats_are_forwarded() {
        let lens = ChangeLens::from(KeyPath::<i32, i32>::identity());
        let got: Vec<i32> = [4, 4, -7, -7, -7, 5, 3, 4]
            .iter()
            .filter_map(|v| lens.apply(v))
            .collect();
        assert_eq!(got, vec![4, -7, 5, 3, 4]);
    }

    #[test]
    fn first_value_is_never_suppressed() {
        let lens = ChangeLens::new(|v: &i32| *v);
        assert_eq!(lens.previous(), None);
        assert_eq!(lens.apply(&0), Some(0));
        assert_eq!(lens.apply(&0), None);
    }

    // ── Custom equality ──────────────────────────────────────────────

    #[test]
    fn custom_equality() {
        // Treat values within the same bucket of ten as equal.
        let lens = ChangeLens::with_eq(|v: &i32| *v, |a: &i32, b: &i32| a / 10 == b / 10);
        let got: Vec<i32> = [1, 5, 9, 12, 18, 31]
            .iter()
            .filter_map(|v| lens.apply(v))
            .collect();
        assert_eq!(got, vec![1, 12, 31]);
    }

    #[test]
    fn suppressed_value_does_not_replace_previous() {
        let lens = ChangeLens::with_eq(|v: &i32| *v, |a: &i32, b: &i32| (a - b).abs() <= 2);
        assert_eq!(lens.apply(&0), Some(0));
        assert_eq!(lens.apply(&2), None);
        // Still compared against 0, not 2.
        assert_eq!(lens.apply(&3), Some(3));
        assert_eq!(lens.previous(), Some(3));
    }

    // ── State ────────────────────────────────────────────────────────

    #[test]
    fn retract_restores_displaced_part() {
        let lens = ChangeLens::new(|v: &i32| *v);
        assert_eq!(lens.apply(&1), Some(1));
        assert_eq!(lens.apply(&2), Some(2));
        lens.retract(&2);
        assert_eq!(lens.previous(), Some(1));
        // 2 was never delivered, so it is forwarded again.
        assert_eq!(lens.apply(&2), Some(2));
    }

    #[test]
    fn retract_of_first_part_clears_previous() {
        let lens = ChangeLens::new(|v: &i32| *v);
        assert_eq!(lens.apply(&7), Some(7));
        lens.retract(&7);
        assert_eq!(lens.previous(), None);
        assert_eq!(lens.apply(&7), Some(7));
    }

    #[test]
    fn retract_ignores_stale_part() {
        let lens = ChangeLens::new(|v: &i32| *v);
        assert_eq!(lens.apply(&1), Some(1));
        assert_eq!(lens.apply(&2), Some(2));
        lens.retract(&1);
        assert_eq!(lens.previous(), Some(2));
    }

    #[test]
    fn reset_forwards_next_value() {
        let lens = ChangeLens::new(|v: &i32| *v);
        assert_eq!(lens.apply(&1), Some(1));
        lens.reset();
        assert_eq!(lens.apply(&1), Some(1));
    }

    #[test]
    fn lenses_do_not_share_state() {
        let a = ChangeLens::from(VALUE1);
        let b = ChangeLens::from(VALUE1);
        let values = sample();
        assert_eq!(a.apply(&values[0]), Some(1));
        assert_eq!(b.apply(&values[0]), Some(1));
        assert_eq!(a.apply(&values[1]), None);
    }

    #[test]
    fn debug_shows_previous() {
        let lens = ChangeLens::new(|v: &i32| *v);
        lens.apply(&9);
        let dbg = format!("{:?}", lens);
        assert!(dbg.contains("ChangeLens"));
        assert!(dbg.contains('9'));
    }
}
