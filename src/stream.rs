use std::rc::Rc;

/// A possibly-infinite lazy sequence: an eager head and a delayed tail.
///
/// Cells are shared through `Rc`, so cloning a stream is O(1) and many
/// consumers can traverse the same prefix.
pub struct Stream<T> {
    cell: Rc<Cell<T>>,
}

enum Cell<T> {
    Empty,
    Cons(T, Delayed<T>),
}

/// A suspended stream. Forcing is **not memoized**: every `force` re-runs
/// the thunk, so producers must be pure. Re-traversal recomputes.
pub struct Delayed<T> {
    thunk: Rc<dyn Fn() -> Stream<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream { cell: self.cell.clone() }
    }
}

impl<T> Clone for Delayed<T> {
    fn clone(&self) -> Self {
        Delayed { thunk: self.thunk.clone() }
    }
}

impl<T: Clone + 'static> Delayed<T> {
    pub fn new(f: impl Fn() -> Stream<T> + 'static) -> Self {
        Delayed { thunk: Rc::new(f) }
    }

    /// A delay around a stream that already exists.
    pub fn ready(s: Stream<T>) -> Self {
        Delayed::new(move || s.clone())
    }

    pub fn force(&self) -> Stream<T> {
        (self.thunk)()
    }
}

impl<T: Clone + 'static> Default for Stream<T> {
    fn default() -> Self {
        Stream::empty()
    }
}

impl<T: Clone + 'static> Stream<T> {
    pub fn empty() -> Stream<T> {
        Stream { cell: Rc::new(Cell::Empty) }
    }

    pub fn cons(head: T, tail: Delayed<T>) -> Stream<T> {
        Stream { cell: Rc::new(Cell::Cons(head, tail)) }
    }

    pub fn singleton(item: T) -> Stream<T> {
        Stream::cons(item, Delayed::new(Stream::empty))
    }

    pub fn is_empty(&self) -> bool {
        matches!(&*self.cell, Cell::Empty)
    }

    /// Head and delayed tail, or `None` on the empty stream.
    pub fn split(&self) -> Option<(T, Delayed<T>)> {
        match &*self.cell {
            Cell::Empty => None,
            Cell::Cons(head, tail) => Some((head.clone(), tail.clone())),
        }
    }

    /// Lazy element-wise map.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        map_shared(self.clone(), Rc::new(f))
    }

    /// Concatenation; the second stream is forced only once this one is
    /// exhausted.
    pub fn append_delayed(&self, rest: Delayed<T>) -> Stream<T> {
        match self.split() {
            None => rest.force(),
            Some((head, tail)) => Stream::cons(
                head,
                Delayed::new(move || tail.force().append_delayed(rest.clone())),
            ),
        }
    }

    /// Fair merge: emits this stream's head, then swaps roles, so both
    /// streams make progress even when one is infinite.
    pub fn interleave_delayed(&self, other: Delayed<T>) -> Stream<T> {
        match self.split() {
            None => other.force(),
            Some((head, tail)) => Stream::cons(
                head,
                Delayed::new(move || other.force().interleave_delayed(tail.clone())),
            ),
        }
    }

    /// Map then flatten, interleaving the inner streams. Interleaving (not
    /// appending) is what keeps compound queries fair when a recursive rule
    /// makes one inner stream infinite.
    pub fn flatmap<U: Clone + 'static>(
        &self,
        f: impl Fn(T) -> Stream<U> + 'static,
    ) -> Stream<U> {
        flatten(self.map(f))
    }

    pub fn iter(&self) -> Iter<T> {
        Iter { cur: self.clone() }
    }

    /// Eagerly materialize a finite stream from an iterator.
    pub fn from_items<I>(items: I) -> Stream<T>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Stream::empty(), |tail, head| {
                Stream::cons(head, Delayed::ready(tail))
            })
    }
}

fn map_shared<T, U>(s: Stream<T>, f: Rc<dyn Fn(T) -> U>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    match s.split() {
        None => Stream::empty(),
        Some((head, tail)) => {
            let mapped = f(head);
            Stream::cons(
                mapped,
                Delayed::new(move || map_shared(tail.force(), f.clone())),
            )
        }
    }
}

fn flatten<U: Clone + 'static>(streams: Stream<Stream<U>>) -> Stream<U> {
    match streams.split() {
        None => Stream::empty(),
        Some((inner, rest)) => {
            inner.interleave_delayed(Delayed::new(move || flatten(rest.force())))
        }
    }
}

pub struct Iter<T> {
    cur: Stream<T>,
}

impl<T: Clone + 'static> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (head, tail) = self.cur.split()?;
        self.cur = tail.force();
        Some(head)
    }
}

impl<T: Clone + 'static> IntoIterator for Stream<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        Iter { cur: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(n: i32) -> Stream<i32> {
        Stream::cons(n, Delayed::new(move || constant(n)))
    }

    fn naturals_from(n: i32) -> Stream<i32> {
        Stream::cons(n, Delayed::new(move || naturals_from(n + 1)))
    }

    #[test]
    fn from_items_preserves_order() {
        let s = Stream::from_items(vec![1, 2, 3]);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn map_is_lazy_over_infinite_streams() {
        let doubled: Vec<i32> = naturals_from(0).map(|n| n * 2).iter().take(5).collect();
        assert_eq!(doubled, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn append_exhausts_first_stream_before_second() {
        let s = Stream::from_items(vec![1, 2]);
        let appended = s.append_delayed(Delayed::ready(Stream::from_items(vec![3, 4])));
        assert_eq!(appended.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn append_never_reaches_past_an_infinite_first_stream() {
        let joined = constant(1).append_delayed(Delayed::ready(Stream::from_items(vec![2])));
        let prefix: Vec<i32> = joined.iter().take(6).collect();
        assert_eq!(prefix, vec![1; 6]);
    }

    #[test]
    fn interleave_is_fair_between_two_infinite_streams() {
        let merged = constant(1).interleave_delayed(Delayed::new(|| constant(2)));
        let prefix: Vec<i32> = merged.iter().take(10).collect();
        let ones = prefix.iter().filter(|&&n| n == 1).count();
        let twos = prefix.iter().filter(|&&n| n == 2).count();
        assert_eq!(ones, 5);
        assert_eq!(twos, 5);
    }

    #[test]
    fn interleave_drains_the_survivor_after_one_side_ends() {
        let merged = Stream::from_items(vec![1, 1])
            .interleave_delayed(Delayed::ready(Stream::from_items(vec![2, 2, 2, 2])));
        assert_eq!(merged.iter().collect::<Vec<_>>(), vec![1, 2, 1, 2, 2, 2]);
    }

    #[test]
    fn flatmap_interleaves_an_infinite_inner_stream() {
        // First inner stream never ends; elements of the second must still
        // appear within a finite prefix.
        let outer = Stream::from_items(vec![0, 1]);
        let flat = outer.flatmap(|n| if n == 0 { constant(0) } else { Stream::singleton(1) });
        let prefix: Vec<i32> = flat.iter().take(4).collect();
        assert!(prefix.contains(&1));
    }

    #[test]
    fn forcing_is_not_memoized_but_pure_producers_agree() {
        let s = naturals_from(10);
        let (_, tail) = s.split().unwrap();
        let first = tail.force().iter().take(3).collect::<Vec<_>>();
        let second = tail.force().iter().take(3).collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}
