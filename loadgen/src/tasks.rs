//! Weighted selection of the next action a simulated user performs.

use anyhow::{Result, bail};
use rand::Rng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;

/// An action of a simulated user, described by its selection weight and tag.
pub trait Task: Copy + Send + 'static {
    /// Every action of the user, in declaration order.
    const ALL: &'static [Self];

    /// Relative selection weight.
    fn weight(self) -> u32;

    /// Tag used to restrict a run to a subset of actions.
    fn tag(self) -> &'static str;
}

/// The actions a user may pick from, with their weight distribution.
#[derive(Debug, Clone)]
pub struct TaskSet<T> {
    tasks: Vec<T>,
    distribution: WeightedIndex<u32>,
}

impl<T: Task> TaskSet<T> {
    /// Creates a set containing every action of `T`.
    pub fn all() -> Result<Self> {
        Self::tagged::<&str>(&[])
    }

    /// Creates a set restricted to actions whose tag is in `tags`.
    ///
    /// An empty `tags` slice selects every action. Fails if no action remains.
    pub fn tagged<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        let tasks: Vec<T> = T::ALL
            .iter()
            .copied()
            .filter(|task| tags.is_empty() || tags.iter().any(|tag| tag.as_ref() == task.tag()))
            .collect();

        if tasks.is_empty() {
            let tags: Vec<_> = tags.iter().map(AsRef::as_ref).collect();
            bail!("no actions match tags {tags:?}");
        }

        let distribution = WeightedIndex::new(tasks.iter().map(|task| task.weight()))?;
        Ok(Self {
            tasks,
            distribution,
        })
    }

    /// Samples the next action according to the weights.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.tasks[self.distribution.sample(rng)]
    }

    /// The actions in this set.
    pub fn tasks(&self) -> &[T] {
        &self.tasks
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    enum Toy {
        Often,
        Rarely,
        Never,
    }

    impl Task for Toy {
        const ALL: &'static [Self] = &[Toy::Often, Toy::Rarely, Toy::Never];

        fn weight(self) -> u32 {
            match self {
                Toy::Often => 9,
                Toy::Rarely => 1,
                Toy::Never => 0,
            }
        }

        fn tag(self) -> &'static str {
            match self {
                Toy::Often => "a",
                Toy::Rarely | Toy::Never => "b",
            }
        }
    }

    #[test]
    fn follows_weights() {
        let set = TaskSet::<Toy>::all().unwrap();
        let mut rng = SmallRng::seed_from_u64(7);

        let mut often = 0;
        for _ in 0..1000 {
            match set.pick(&mut rng) {
                Toy::Often => often += 1,
                Toy::Rarely => {}
                Toy::Never => panic!("picked a zero-weight task"),
            }
        }
        assert!((850..=950).contains(&often), "often picked {often} times");
    }

    #[test]
    fn filters_by_tag() {
        let set = TaskSet::<Toy>::tagged(&["b"]).unwrap();
        assert_eq!(set.tasks(), &[Toy::Rarely, Toy::Never]);

        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(set.pick(&mut rng), Toy::Rarely);
        }
    }

    #[test]
    fn rejects_empty_selection() {
        let err = TaskSet::<Toy>::tagged(&["nope"]).unwrap_err();
        assert_eq!(err.to_string(), r#"no actions match tags ["nope"]"#);
    }
}
